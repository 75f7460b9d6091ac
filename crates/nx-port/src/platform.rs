//! The host loop.
//!
//! [`Platform`] owns every adapter plus the host services and drives one
//! frame at a time: input, timing, the engine's frame, audio submission and
//! presentation. The engine only ever sees a [`FrameContext`].

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::audio::{AudioError, AudioSubmitter, PcmRing, SUBMIT_SAMPLES, SubmitReport};
use crate::host::{AudioOut, Controller, Display, TickSource};
use crate::input::{self, KeySink};
use crate::palette::PALETTE_BYTES;
use crate::sys::{BIG_STACK_SIZE, BigStack, EngineParams, FileTable, SysError};
use crate::timing::{FrameTimer, float_time};
use crate::video::{Rect, VideoError, VideoPresenter, VideoSettings};

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Sys(#[from] SysError),

    #[error("engine: {0}")]
    Engine(String),
}

/// Everything the engine may touch during `init` or `frame`.
pub struct FrameContext<'a> {
    pub video: &'a mut VideoPresenter,
    /// `None` when audio failed to initialize or has been shut down.
    pub pcm: Option<PcmRing<'a>>,
    pub files: &'a mut FileTable,
    pub big_stack: &'a mut BigStack,
    pub heap: &'a mut [u8],
    pub params: &'a EngineParams,
    /// Seconds since the tick counter's epoch.
    pub time: f64,
    /// Regions the engine redrew this frame.
    pub damage: &'a mut Vec<Rect>,
}

/// The game engine as seen by the host loop. Key events arrive through
/// [`KeySink`] before each `frame`.
pub trait Engine: KeySink {
    fn init(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), PlatformError>;

    /// Advance by `delta` seconds and draw into `ctx.video`.
    fn frame(&mut self, ctx: &mut FrameContext<'_>, delta: f64) -> Result<(), PlatformError>;

    fn shutdown(&mut self) {}
}

/// What one call to [`Platform::run_frame`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub delta: f64,
    /// The audio block submitted this frame, if one was due.
    pub audio: Option<SubmitReport>,
}

pub struct Platform<D, A, T, C>
where
    D: Display,
    A: AudioOut,
    T: TickSource,
    C: Controller,
{
    display: D,
    audio: AudioSubmitter<A>,
    ticks: T,
    controller: C,
    video: Option<VideoPresenter>,
    files: FileTable,
    big_stack: BigStack,
    heap: Vec<u8>,
    params: EngineParams,
    timer: FrameTimer,
    damage: Vec<Rect>,
    /// Playback position at which the next block is due.
    next_submit: u64,
    frames: u64,
}

impl<D, A, T, C> Platform<D, A, T, C>
where
    D: Display,
    A: AudioOut,
    T: TickSource,
    C: Controller,
{
    /// Take ownership of the host services and allocate the engine heap and
    /// big stack.
    pub fn new(display: D, audio_out: A, ticks: T, controller: C, params: EngineParams) -> Result<Self, PlatformError> {
        let heap = params.allocate_heap()?;
        let big_stack = BigStack::new(BIG_STACK_SIZE)?;
        let timer = FrameTimer::new(ticks.system_tick());
        info!(
            heap = params.memsize,
            basedir = %params.basedir.display(),
            args = params.args.len(),
            "platform created"
        );
        Ok(Self {
            display,
            audio: AudioSubmitter::new(audio_out),
            ticks,
            controller,
            video: None,
            files: FileTable::new(),
            big_stack,
            heap,
            params,
            timer,
            damage: Vec::new(),
            next_submit: 0,
            frames: 0,
        })
    }

    pub fn init_video(&mut self, palette: &[u8; PALETTE_BYTES], settings: VideoSettings) -> Result<(), PlatformError> {
        self.video = Some(VideoPresenter::initialize(palette, settings)?);
        Ok(())
    }

    /// Bring up audio. Failure is not fatal: the game runs silently.
    pub fn init_audio(&mut self) -> bool {
        match self.audio.initialize(&self.ticks) {
            Ok(()) => {
                self.next_submit = 0;
                true
            }
            Err(e) => {
                warn!("audio unavailable, continuing without sound: {e}");
                false
            }
        }
    }

    /// Hand the engine its context once before the first frame.
    pub fn init_engine<E: Engine + ?Sized>(&mut self, engine: &mut E) -> Result<(), PlatformError> {
        let mut ctx = self.context()?;
        engine.init(&mut ctx)?;
        debug!("engine initialized");
        // The frame timer starts after engine start-up so the first delta
        // does not include it.
        self.timer = FrameTimer::new(self.ticks.system_tick());
        Ok(())
    }

    /// Run one frame: pump input, compute the delta, run the engine, submit
    /// audio if a block is due, then present.
    pub fn run_frame<E: Engine + ?Sized>(&mut self, engine: &mut E) -> Result<FrameReport, PlatformError> {
        input::pump(&mut self.controller, engine);

        let delta = self.timer.delta_seconds(self.ticks.system_tick());
        {
            let mut ctx = self.context()?;
            engine.frame(&mut ctx, delta)?;
        }

        let audio = self.submit_if_due()?;

        let video = self.video.as_mut().ok_or(VideoError::NotInitialized)?;
        video.present(&mut self.display, &self.damage)?;
        self.damage.clear();

        self.frames += 1;
        trace!(frame = self.frames, delta, "frame");
        Ok(FrameReport { delta, audio })
    }

    /// Submit at most one block per frame. If playback has run past several
    /// block boundaries since the last submission, the missed blocks are
    /// dropped and the next one is due at the boundary after `position`.
    fn submit_if_due(&mut self) -> Result<Option<SubmitReport>, PlatformError> {
        if !self.audio.is_running() {
            return Ok(None);
        }
        let position = self.audio.playback_position(&self.ticks);
        if position < self.next_submit {
            return Ok(None);
        }
        let report = self.audio.submit()?;
        let chunk = SUBMIT_SAMPLES as u64;
        self.next_submit = (position / chunk + 1) * chunk;
        Ok(Some(report))
    }

    fn context(&mut self) -> Result<FrameContext<'_>, PlatformError> {
        let video = self
            .video
            .as_mut()
            .filter(|v| v.is_initialized())
            .ok_or(VideoError::NotInitialized)?;
        Ok(FrameContext {
            video,
            pcm: self.audio.pcm_ring(&self.ticks),
            files: &mut self.files,
            big_stack: &mut self.big_stack,
            heap: &mut self.heap,
            params: &self.params,
            time: float_time(self.ticks.system_tick()),
            damage: &mut self.damage,
        })
    }

    /// Shut the engine down, then audio, then video.
    pub fn shutdown<E: Engine + ?Sized>(&mut self, engine: &mut E) {
        engine.shutdown();
        self.audio.shutdown();
        if let Some(video) = self.video.as_mut() {
            video.shutdown();
        }
        info!(frames = self.frames, "platform shut down");
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn video(&self) -> Option<&VideoPresenter> {
        self.video.as_ref()
    }

    #[must_use]
    pub fn audio(&self) -> &AudioSubmitter<A> {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioSubmitter<A> {
        &mut self.audio
    }

    #[must_use]
    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Give the display back, dropping everything else.
    pub fn into_display(self) -> D {
        self.display
    }

    #[must_use]
    pub fn ticks(&self) -> &T {
        &self.ticks
    }

    #[must_use]
    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    #[must_use]
    pub fn params(&self) -> &EngineParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SAMPLE_RATE;
    use crate::input::{EngineKey, KeyEvent, button};
    use crate::testing::{ManualTicks, MockAudioOut, MockDisplay, ScriptedController};
    use crate::timing::TICK_HZ;

    type TestPlatform = Platform<MockDisplay, MockAudioOut, ManualTicks, ScriptedController>;

    #[derive(Default)]
    struct Recorder {
        events: Vec<KeyEvent>,
        inits: u32,
        deltas: Vec<f64>,
        shut_down: bool,
        fail_frame: bool,
    }

    impl KeySink for Recorder {
        fn key_event(&mut self, key: EngineKey, pressed: bool) {
            self.events.push(KeyEvent { key, pressed });
        }
    }

    impl Engine for Recorder {
        fn init(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), PlatformError> {
            self.inits += 1;
            assert_eq!(ctx.heap.len(), ctx.params.memsize);
            Ok(())
        }

        fn frame(&mut self, ctx: &mut FrameContext<'_>, delta: f64) -> Result<(), PlatformError> {
            if self.fail_frame {
                return Err(PlatformError::Engine("demo failure".into()));
            }
            self.deltas.push(delta);
            ctx.damage.push(Rect { x: 0, y: 0, width: 1, height: 1 });
            Ok(())
        }

        fn shutdown(&mut self) {
            self.shut_down = true;
        }
    }

    fn small_params() -> EngineParams {
        EngineParams {
            memsize: 4096,
            ..EngineParams::default()
        }
    }

    fn platform(script: Vec<(u64, u64)>) -> TestPlatform {
        let mut platform = Platform::new(
            MockDisplay::new(1280, 720),
            MockAudioOut::default(),
            ManualTicks::new(0),
            ScriptedController::new(script),
            small_params(),
        )
        .expect("small heap");
        platform
            .init_video(&[0; PALETTE_BYTES], VideoSettings::default())
            .expect("video");
        platform
    }

    #[test]
    fn frame_before_video_is_an_error() {
        let mut platform: TestPlatform = Platform::new(
            MockDisplay::new(4, 4),
            MockAudioOut::default(),
            ManualTicks::new(0),
            ScriptedController::default(),
            small_params(),
        )
        .expect("small heap");
        let mut engine = Recorder::default();
        assert!(matches!(
            platform.run_frame(&mut engine),
            Err(PlatformError::Video(VideoError::NotInitialized))
        ));
    }

    #[test]
    fn frame_runs_input_engine_and_present() {
        let mut platform = platform(vec![(button::PLUS, 0)]);
        let mut engine = Recorder::default();
        platform.init_engine(&mut engine).expect("init");
        assert_eq!(engine.inits, 1);

        platform.ticks().advance(TICK_HZ / 60);
        let report = platform.run_frame(&mut engine).expect("frame");

        assert_eq!(engine.events, [KeyEvent { key: EngineKey::Start, pressed: true }]);
        assert!((report.delta - 1.0 / 60.0).abs() < 1e-9);
        assert_eq!(platform.display().swaps, 1);
        assert_eq!(platform.frames(), 1);
    }

    #[test]
    fn engine_error_skips_present() {
        let mut platform = platform(Vec::new());
        let mut engine = Recorder {
            fail_frame: true,
            ..Recorder::default()
        };
        assert!(matches!(platform.run_frame(&mut engine), Err(PlatformError::Engine(_))));
        assert_eq!(platform.display().swaps, 0);
    }

    #[test]
    fn audio_submits_on_cadence() {
        let mut platform = platform(Vec::new());
        assert!(platform.init_audio());
        let mut engine = Recorder::default();

        // First frame submits straight away.
        let first = platform.run_frame(&mut engine).expect("frame");
        assert!(first.audio.is_some());

        // Less than a block's worth of playback later: nothing due.
        platform.ticks().advance(TICK_HZ / 10);
        assert!(platform.run_frame(&mut engine).expect("frame").audio.is_none());

        // A fifth of a second in: the next block is due.
        platform.ticks().advance(TICK_HZ / 10);
        let report = platform.run_frame(&mut engine).expect("frame");
        assert!(report.audio.is_some());
        assert_eq!(platform.audio().output().blocks.len(), 2);
        assert_eq!(platform.audio().dma().sample_pos, u64::from(SAMPLE_RATE) / 5);
    }

    #[test]
    fn late_frame_submits_once_and_resyncs() {
        let mut platform = platform(Vec::new());
        assert!(platform.init_audio());
        let mut engine = Recorder::default();
        platform.run_frame(&mut engine).expect("frame");

        // Two and a half blocks of playback pass in one frame.
        platform.ticks().advance(TICK_HZ / 2);
        assert!(platform.run_frame(&mut engine).expect("frame").audio.is_some());
        assert_eq!(platform.audio().output().blocks.len(), 2);

        // Next boundary is 28800 samples, not 9600 or 19200.
        platform.ticks().advance(TICK_HZ / 20);
        assert!(platform.run_frame(&mut engine).expect("frame").audio.is_none());
        platform.ticks().advance(TICK_HZ / 10);
        assert!(platform.run_frame(&mut engine).expect("frame").audio.is_some());
        assert_eq!(platform.audio().output().blocks.len(), 3);
    }

    #[test]
    fn failed_audio_runs_silently() {
        let mut platform: TestPlatform = Platform::new(
            MockDisplay::new(1280, 720),
            MockAudioOut::failing(),
            ManualTicks::new(0),
            ScriptedController::default(),
            small_params(),
        )
        .expect("small heap");
        platform
            .init_video(&[0; PALETTE_BYTES], VideoSettings::default())
            .expect("video");
        assert!(!platform.init_audio());

        let mut engine = Recorder::default();
        let report = platform.run_frame(&mut engine).expect("frame");
        assert!(report.audio.is_none());
        assert!(platform.audio().output().blocks.is_empty());
    }

    #[test]
    fn shutdown_order() {
        let mut platform = platform(Vec::new());
        platform.init_audio();
        let mut engine = Recorder::default();
        platform.shutdown(&mut engine);
        assert!(engine.shut_down);
        assert!(platform.audio().output().stopped);
        assert!(!platform.video().expect("presenter kept").is_initialized());
    }
}
