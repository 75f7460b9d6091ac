//! Whole-frame behaviour through the public API, against in-memory hosts.
//!
//! A small engine fills the framebuffer, writes a tone into the PCM ring and
//! reacts to keys. The tests drive it through `Platform::run_frame` and check
//! what reached the display and the audio queue.

use nx_port::audio::{RING_SAMPLES, SUBMIT_BYTES};
use nx_port::input::button;
use nx_port::palette::{PALETTE_BYTES, pack_rgba};
use nx_port::testing::{ManualTicks, MockAudioOut, MockDisplay, ScriptedController};
use nx_port::timing::TICK_HZ;
use nx_port::{
    Engine, EngineKey, EngineParams, FrameContext, KeySink, Platform, PlatformError, VideoSettings,
};

type Host = Platform<MockDisplay, MockAudioOut, ManualTicks, ScriptedController>;

const FRAME_TICKS: u64 = TICK_HZ / 60;

/// Test engine: clears to `fill`, optionally swaps palettes or resolution
/// when asked to by a key.
#[derive(Default)]
struct FillEngine {
    fill: u8,
    palette: Option<[u8; PALETTE_BYTES]>,
    change_resolution: bool,
    write_audio: bool,
}

impl KeySink for FillEngine {
    fn key_event(&mut self, key: EngineKey, pressed: bool) {
        if key == EngineKey::LeftTrigger && pressed {
            self.change_resolution = true;
        }
    }
}

impl Engine for FillEngine {
    fn init(&mut self, _ctx: &mut FrameContext<'_>) -> Result<(), PlatformError> {
        Ok(())
    }

    fn frame(&mut self, ctx: &mut FrameContext<'_>, _delta: f64) -> Result<(), PlatformError> {
        if std::mem::take(&mut self.change_resolution) {
            ctx.video.change_resolution(1.777)?;
        }
        if let Some(palette) = self.palette.take() {
            ctx.video.set_palette(&palette);
        }
        if let Some(fb) = ctx.video.framebuffer_mut() {
            fb.fill(self.fill);
        }
        if self.write_audio {
            if let Some(pcm) = ctx.pcm.as_mut() {
                let start = pcm.dma().sample_pos;
                let square: Vec<i16> = (0..RING_SAMPLES)
                    .map(|i| if i % 64 < 32 { 8_000 } else { -8_000 })
                    .collect();
                pcm.write_samples(start, &square);
            }
        }
        Ok(())
    }
}

fn host(script: Vec<(u64, u64)>, palette: &[u8; PALETTE_BYTES]) -> Host {
    let mut host = Platform::new(
        MockDisplay::new(1280, 720),
        MockAudioOut::default(),
        ManualTicks::new(1_000),
        ScriptedController::new(script),
        EngineParams {
            memsize: 64 * 1024,
            ..EngineParams::default()
        },
    )
    .expect("platform");
    host.init_video(palette, VideoSettings::default()).expect("video");
    host
}

/// Index 0 black, index 255 white, everything else mid grey.
fn black_and_white() -> [u8; PALETTE_BYTES] {
    let mut rgb = [0x80u8; PALETTE_BYTES];
    rgb[..3].fill(0);
    rgb[255 * 3..].fill(0xFF);
    rgb
}

#[test]
fn index_fills_present_through_the_palette() {
    let mut host = host(Vec::new(), &black_and_white());
    let mut engine = FillEngine::default();
    host.init_engine(&mut engine).expect("init");
    host.run_frame(&mut engine).expect("frame");

    let front = host.display().front();
    assert_eq!(front.len(), 1280 * 720);
    assert!(front.iter().all(|&px| px == 0xFF00_0000));

    engine.fill = 255;
    host.run_frame(&mut engine).expect("frame");
    assert!(host.display().front().iter().all(|&px| px == 0xFFFF_FFFF));

    engine.fill = 1;
    host.run_frame(&mut engine).expect("frame");
    assert_eq!(host.display().front()[0], pack_rgba(0x80, 0x80, 0x80));
}

#[test]
fn each_frame_swaps_the_surface_it_acquired() {
    let mut host = host(vec![(0, 0), (button::L, 0), (0, button::L)], &black_and_white());
    let mut engine = FillEngine::default();
    for _ in 0..5 {
        host.ticks().advance(FRAME_TICKS);
        host.run_frame(&mut engine).expect("frame");
    }

    let display = host.display();
    assert_eq!(display.acquisitions, 5);
    assert_eq!(display.swaps, 5);
    assert_eq!(display.unswapped_acquisitions, 0);
}

#[test]
fn palette_set_in_frame_is_used_for_that_frame() {
    let mut host = host(Vec::new(), &[0; PALETTE_BYTES]);
    let mut green = [0u8; PALETTE_BYTES];
    green[9 * 3 + 1] = 200;
    let mut engine = FillEngine {
        fill: 9,
        palette: Some(green),
        ..FillEngine::default()
    };
    host.run_frame(&mut engine).expect("frame");
    assert_eq!(host.display().front()[640 * 360], pack_rgba(0, 200, 0));
}

#[test]
fn one_submission_is_one_block() {
    let mut host = host(Vec::new(), &[0; PALETTE_BYTES]);
    assert!(host.init_audio());
    let mut engine = FillEngine {
        write_audio: true,
        ..FillEngine::default()
    };

    let report = host.run_frame(&mut engine).expect("frame");
    let audio = report.audio.expect("first frame submits");
    assert_eq!(audio.bytes, SUBMIT_BYTES);
    assert!(audio.fresh);

    let blocks = &host.audio().output().blocks;
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].len(), 19_200);
    assert_eq!(i16::from_le_bytes([blocks[0][0], blocks[0][1]]), 8_000);
}

#[test]
fn playback_cursor_advances_with_frames() {
    let mut host = host(Vec::new(), &[0; PALETTE_BYTES]);
    assert!(host.init_audio());
    let mut engine = FillEngine::default();

    let mut last = 0;
    for _ in 0..30 {
        host.ticks().advance(FRAME_TICKS);
        host.run_frame(&mut engine).expect("frame");
        let pos = host.audio().dma().sample_pos;
        assert!(pos >= last);
        last = pos;
    }
    // Half a second at 48 kHz.
    assert_eq!(last, 24_000);
    // Submitted at 0, 9600 and 19200.
    assert_eq!(host.audio().output().blocks.len(), 3);
}

#[test]
fn resolution_change_reallocates_once_and_restores_gamma() {
    let mut host = host(vec![(button::L, 0), (0, button::L)], &[0; PALETTE_BYTES]);
    let mut engine = FillEngine::default();

    host.run_frame(&mut engine).expect("frame");
    let video = host.video().expect("video");
    let stats = video.stats();
    assert_eq!(stats.framebuffer_allocations, 2);
    assert_eq!(stats.framebuffer_releases, 1);
    // Gamma forced during the change came back on present.
    assert!((video.settings().gamma - 1.0).abs() < f32::EPSILON);

    host.run_frame(&mut engine).expect("frame");
    assert_eq!(host.video().expect("video").stats().framebuffer_allocations, 2);
}

#[test]
fn shutdown_releases_and_stops() {
    let mut host = host(Vec::new(), &[0; PALETTE_BYTES]);
    host.init_audio();
    let mut engine = FillEngine::default();
    host.run_frame(&mut engine).expect("frame");
    host.shutdown(&mut engine);

    assert!(host.audio().output().stopped);
    let video = host.video().expect("video");
    assert!(!video.is_initialized());
    assert_eq!(video.stats().framebuffer_releases, 1);
    assert!(matches!(host.run_frame(&mut engine), Err(PlatformError::Video(_))));
}
