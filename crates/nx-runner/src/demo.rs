//! Demo engine core.
//!
//! Stands in for the game engine: scrolls a paletted test pattern, mixes a
//! tone into the PCM ring while A is held, and maps a few keys onto the
//! presenter's runtime controls (resolution change, vsync, palette flash).

use nx_port::audio::RING_SAMPLES;
use nx_port::palette::PALETTE_BYTES;
use nx_port::sys::{file_exists, try_alloc};
use nx_port::video::{RESOLUTIONS, Rect};
use nx_port::{Engine, EngineKey, FrameContext, KeySink, PlatformError};
use tracing::{debug, info, trace};

/// Whole tone periods per pass of the PCM ring; keeps the waveform
/// continuous across the wrap (439.45 Hz at 48 kHz).
pub const TONE_PERIODS: usize = 75;

const TONE_AMPLITUDE: f64 = 6_000.0;

/// Frames a palette flash lasts.
pub const FLASH_FRAMES: u32 = 12;

/// Scroll speed of the test pattern in pixels per second.
const SCROLL_SPEED: f64 = 120.0;

/// Engine config read at start-up if present.
pub const CONFIG_FILE: &str = "id1/config.cfg";

/// Largest config prefix read at start-up.
const CONFIG_READ_LIMIT: u64 = 4096;

/// Base palette: a red ramp against a falling green and a fast blue cycle.
#[must_use]
pub fn ramp_palette() -> [u8; PALETTE_BYTES] {
    let mut rgb = [0u8; PALETTE_BYTES];
    for (i, triple) in rgb.chunks_exact_mut(3).enumerate() {
        let i = i as u8;
        triple.copy_from_slice(&[i, 255 - i, i.wrapping_mul(4)]);
    }
    rgb
}

/// Damage-flash tint of `base`.
#[must_use]
pub fn flash_palette(base: &[u8; PALETTE_BYTES]) -> [u8; PALETTE_BYTES] {
    let mut rgb = *base;
    for triple in rgb.chunks_exact_mut(3) {
        triple[0] = triple[0].saturating_add(96);
        triple[1] /= 2;
        triple[2] /= 2;
    }
    rgb
}

/// `base` with every channel passed through a gamma curve. Values below 1
/// brighten.
#[must_use]
pub fn gamma_palette(base: &[u8; PALETTE_BYTES], gamma: f32) -> [u8; PALETTE_BYTES] {
    let mut rgb = *base;
    if (gamma - 1.0).abs() < f32::EPSILON {
        return rgb;
    }
    let gamma = f64::from(gamma);
    for channel in &mut rgb {
        let level = 255.0 * ((f64::from(*channel) + 0.5) / 255.5).powf(gamma) + 0.5;
        *channel = level.clamp(0.0, 255.0) as u8;
    }
    rgb
}

/// Tone sample at absolute ring position `index`.
#[must_use]
pub fn tone_sample(index: u64) -> i16 {
    let pos = (index % RING_SAMPLES as u64) as f64;
    let phase = pos * TONE_PERIODS as f64 / RING_SAMPLES as f64;
    (f64::sin(std::f64::consts::TAU * phase) * TONE_AMPLITUDE) as i16
}

#[derive(Debug, Default)]
pub struct DemoEngine {
    palette: Option<[u8; PALETTE_BYTES]>,
    mix: Vec<i16>,
    scroll: f64,
    tone: bool,
    flash_frames: u32,
    /// Gamma the current palette was built with.
    gamma: Option<f32>,
    resolution_requested: bool,
    vsync_toggle_requested: bool,
    config_bytes: Option<usize>,
    frames: u64,
}

impl DemoEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the config file read at start-up, if one was found.
    #[must_use]
    pub fn config_bytes(&self) -> Option<usize> {
        self.config_bytes
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn read_config(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), PlatformError> {
        let path = ctx.params.basedir.join(CONFIG_FILE);
        if !file_exists(&path) {
            debug!(path = %path.display(), "no config");
            return Ok(());
        }
        let (handle, len) = ctx.files.open_read(&path)?;
        let size = len.min(CONFIG_READ_LIMIT) as usize;
        let buf = ctx.big_stack.alloc(size, "config")?;
        let read = ctx.files.read(handle, buf)?;
        ctx.big_stack.free(size, "config")?;
        ctx.files.close(handle)?;
        info!(path = %path.display(), bytes = read, "exec config");
        self.config_bytes = Some(read);
        Ok(())
    }

    fn draw(&self, ctx: &mut FrameContext<'_>) -> Result<(), PlatformError> {
        let Some(fb) = ctx.video.framebuffer_mut() else {
            return Ok(());
        };
        let (width, height, stride) = (fb.width(), fb.height(), fb.row_bytes());
        let offset = self.scroll as usize;

        let row = ctx.big_stack.alloc(width, "pattern row")?;
        for (x, px) in row.iter_mut().enumerate() {
            *px = ((x + offset) / 5) as u8;
        }
        let pixels = fb.pixels_mut();
        for y in 0..height {
            let shade = (y / 3) as u8;
            for (dst, &src) in pixels[y * stride..y * stride + width].iter_mut().zip(row.iter()) {
                *dst = src.wrapping_add(shade);
            }
        }
        ctx.big_stack.free(width, "pattern row")?;

        ctx.damage.push(Rect {
            x: 0,
            y: 0,
            width: width as u32,
            height: height as u32,
        });
        Ok(())
    }

    fn mix(&mut self, ctx: &mut FrameContext<'_>) {
        let Some(pcm) = ctx.pcm.as_mut() else {
            return;
        };
        let start = pcm.dma().sample_pos;
        for (i, sample) in self.mix.iter_mut().enumerate() {
            *sample = if self.tone { tone_sample(start + i as u64) } else { 0 };
        }
        pcm.write_samples(start, &self.mix);
    }
}

impl KeySink for DemoEngine {
    fn key_event(&mut self, key: EngineKey, pressed: bool) {
        match (key, pressed) {
            (EngineKey::A, _) => self.tone = pressed,
            (EngineKey::LeftTrigger, true) => self.resolution_requested = true,
            (EngineKey::Start, true) => self.vsync_toggle_requested = true,
            (EngineKey::Select, true) => self.flash_frames = FLASH_FRAMES,
            _ => trace!(?key, pressed, "unbound key"),
        }
    }
}

impl Engine for DemoEngine {
    fn init(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), PlatformError> {
        self.mix = try_alloc(RING_SAMPLES, "demo mix")?;
        let palette = ramp_palette();
        ctx.video.set_palette(&palette);
        self.palette = Some(palette);
        debug!(heap = ctx.heap.len(), args = ?ctx.params.args, "demo engine up");
        self.read_config(ctx)
    }

    fn frame(&mut self, ctx: &mut FrameContext<'_>, delta: f64) -> Result<(), PlatformError> {
        self.scroll += delta * SCROLL_SPEED;

        if std::mem::take(&mut self.resolution_requested) {
            ctx.video.change_resolution(RESOLUTIONS[0].scale)?;
            info!("{}", ctx.video.resolution_text());
        }
        if std::mem::take(&mut self.vsync_toggle_requested) {
            let vsync = !ctx.video.settings().vsync;
            ctx.video.set_vsync(vsync);
            info!(vsync, "vsync toggled");
        }
        let gamma = ctx.video.settings().gamma;
        let regamma = self.gamma.is_none_or(|g| (g - gamma).abs() >= f32::EPSILON);
        if regamma || self.flash_frames > 0 {
            self.flash_frames = self.flash_frames.saturating_sub(1);
            self.gamma = Some(gamma);
            let base = gamma_palette(&self.palette.unwrap_or_else(ramp_palette), gamma);
            let palette = if self.flash_frames == 0 { base } else { flash_palette(&base) };
            ctx.video.shift_palette(&palette);
            trace!(gamma, flash = self.flash_frames, "palette rebuilt");
        }

        self.draw(ctx)?;
        self.mix(ctx);
        self.frames += 1;
        Ok(())
    }

    fn shutdown(&mut self) {
        info!(frames = self.frames, "demo engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nx_port::input::button;
    use nx_port::testing::{ManualTicks, MockAudioOut, MockDisplay, ScriptedController};
    use nx_port::timing::TICK_HZ;
    use nx_port::{EngineParams, Platform, VideoSettings};

    type TestPlatform = Platform<MockDisplay, MockAudioOut, ManualTicks, ScriptedController>;

    fn platform(script: Vec<(u64, u64)>, params: EngineParams) -> TestPlatform {
        let mut platform = Platform::new(
            MockDisplay::new(1280, 720),
            MockAudioOut::default(),
            ManualTicks::new(0),
            ScriptedController::new(script),
            params,
        )
        .expect("platform");
        platform
            .init_video(&[0; PALETTE_BYTES], VideoSettings::default())
            .expect("video");
        platform
    }

    fn small_params() -> EngineParams {
        EngineParams {
            memsize: 1024,
            ..EngineParams::default()
        }
    }

    #[test]
    fn tone_is_continuous_across_the_ring() {
        assert_eq!(tone_sample(0), 0);
        assert_eq!(tone_sample(RING_SAMPLES as u64), tone_sample(0));
        assert_eq!(tone_sample(RING_SAMPLES as u64 + 17), tone_sample(17));
        assert!((1..RING_SAMPLES as u64).any(|i| tone_sample(i) > 5_000));
    }

    #[test]
    fn flash_tints_red() {
        let base = ramp_palette();
        let flash = flash_palette(&base);
        assert_eq!(flash[0], 96);
        assert_eq!(flash[1], 127);
        assert_eq!(flash[255 * 3], 255);
    }

    #[test]
    fn draws_a_pattern_and_reports_damage() {
        let mut platform = platform(Vec::new(), small_params());
        let mut engine = DemoEngine::new();
        platform.init_engine(&mut engine).expect("init");
        platform.run_frame(&mut engine).expect("frame");

        let front = platform.display().front();
        assert_ne!(front[0], front[5 * 10]);
        assert_eq!(engine.frames(), 1);
        assert_eq!(engine.config_bytes(), None);
    }

    #[test]
    fn start_toggles_vsync() {
        let mut platform = platform(vec![(button::PLUS, 0)], small_params());
        let mut engine = DemoEngine::new();
        platform.init_engine(&mut engine).expect("init");
        platform.run_frame(&mut engine).expect("frame");
        assert!(!platform.video().expect("video").settings().vsync);
        assert_eq!(platform.display().vsync_waits, 0);
    }

    #[test]
    fn gamma_curve_brightens_below_one() {
        let base = ramp_palette();
        assert_eq!(gamma_palette(&base, 1.0), base);
        let bright = gamma_palette(&base, 0.1);
        assert_eq!(bright[255 * 3], 255);
        assert!(bright[3] > base[3]);
        assert!(bright.iter().zip(base.iter()).all(|(b, o)| b >= o));
    }

    #[test]
    fn resolution_change_frame_is_drawn_with_forced_gamma() {
        let mut platform = platform(vec![(0, 0), (button::L, 0), (0, button::L)], small_params());
        let mut engine = DemoEngine::new();
        platform.init_engine(&mut engine).expect("init");

        platform.run_frame(&mut engine).expect("frame");
        let normal = platform.display().front()[1];

        platform.run_frame(&mut engine).expect("frame");
        let forced = platform.display().front()[1];
        assert_ne!(forced, normal);
        assert!((platform.video().expect("video").settings().gamma - 1.0).abs() < f32::EPSILON);

        platform.run_frame(&mut engine).expect("frame");
        assert_eq!(platform.display().front()[1], normal);
    }

    #[test]
    fn left_trigger_changes_resolution() {
        let mut platform = platform(vec![(button::L, 0)], small_params());
        let mut engine = DemoEngine::new();
        platform.init_engine(&mut engine).expect("init");
        platform.run_frame(&mut engine).expect("frame");
        let stats = platform.video().expect("video").stats();
        assert_eq!(stats.framebuffer_allocations, 2);
        assert_eq!(stats.framebuffer_releases, 1);
    }

    #[test]
    fn holding_a_plays_the_tone() {
        let mut platform = platform(vec![(0, 0), (button::A, 0)], small_params());
        assert!(platform.init_audio());
        let mut engine = DemoEngine::new();
        platform.init_engine(&mut engine).expect("init");

        // Silent first block.
        platform.run_frame(&mut engine).expect("frame");
        let silent = &platform.audio().output().blocks[0];
        assert!(silent.iter().all(|&b| b == 0));

        // A held from the next frame; the next block is due after 0.2 s.
        platform.ticks().advance(TICK_HZ / 5);
        platform.run_frame(&mut engine).expect("frame");
        let blocks = &platform.audio().output().blocks;
        assert_eq!(blocks.len(), 2);
        assert!(blocks[1].iter().any(|&b| b != 0));
    }

    #[test]
    fn reads_config_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("id1")).expect("id1");
        std::fs::write(dir.path().join(CONFIG_FILE), b"bind x +jump\n").expect("config");

        let mut platform = platform(
            Vec::new(),
            EngineParams {
                basedir: dir.path().to_path_buf(),
                ..small_params()
            },
        );
        let mut engine = DemoEngine::new();
        platform.init_engine(&mut engine).expect("init");
        assert_eq!(engine.config_bytes(), Some(13));
    }
}
