//! Windowed and headless run loops.

use std::sync::Arc;

use nx_port::Platform;
use nx_port::host::{AudioOut, Controller, Display, TickSource};
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::RunnerError;
use crate::audio::CpalAudioOut;
use crate::config::RunnerConfig;
use crate::controller::GilrsController;
use crate::demo::{DemoEngine, ramp_palette};
use crate::display::{HeadlessDisplay, PixelsDisplay, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::ticks::InstantTicks;

/// Frames run by `--headless` without `--frames`.
const DEFAULT_HEADLESS_FRAMES: u64 = 60;

type WindowPlatform = Platform<PixelsDisplay, CpalAudioOut, InstantTicks, GilrsController>;
type HeadlessPlatform = Platform<HeadlessDisplay, CpalAudioOut, InstantTicks, GilrsController>;

/// Bring up video, audio and the engine, in that order.
fn start<D, A, T, C>(
    platform: &mut Platform<D, A, T, C>,
    engine: &mut DemoEngine,
    config: &RunnerConfig,
) -> Result<(), RunnerError>
where
    D: Display,
    A: AudioOut,
    T: TickSource,
    C: Controller,
{
    platform.init_video(&ramp_palette(), config.video_settings())?;
    platform.init_audio();
    platform.init_engine(engine)?;
    Ok(())
}

/// Run the demo engine for a fixed number of frames without a window.
pub fn run_headless(config: &RunnerConfig) -> Result<HeadlessDisplay, RunnerError> {
    let frames = config.frames.unwrap_or(DEFAULT_HEADLESS_FRAMES);
    let mut engine = DemoEngine::new();
    let mut platform: HeadlessPlatform = Platform::new(
        HeadlessDisplay::new(!config.no_vsync),
        CpalAudioOut::new(),
        InstantTicks::new(),
        GilrsController::keyboard_only(),
        config.engine_params(),
    )?;
    start(&mut platform, &mut engine, config)?;

    let result = (0..frames).try_for_each(|_| platform.run_frame(&mut engine).map(|_| ()));
    platform.shutdown(&mut engine);
    result?;

    let headless = platform.into_display();
    info!(frames = headless.frames(), "headless run complete");
    Ok(headless)
}

/// Open a window and run until it is closed, Escape is pressed, or the frame
/// limit is reached.
pub fn run_windowed(config: RunnerConfig) -> Result<(), RunnerError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    app.finish()
}

struct App {
    config: RunnerConfig,
    engine: DemoEngine,
    window: Option<Arc<Window>>,
    platform: Option<WindowPlatform>,
    error: Option<RunnerError>,
}

impl App {
    fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            engine: DemoEngine::new(),
            window: None,
            platform: None,
            error: None,
        }
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RunnerError> {
        let size = LogicalSize::new(
            f64::from(SCREEN_WIDTH) * self.config.scale,
            f64::from(SCREEN_HEIGHT) * self.config.scale,
        );
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(size);
        let window = Arc::new(event_loop.create_window(attrs)?);

        let display = PixelsDisplay::new(Arc::clone(&window))?;
        let mut platform = Platform::new(
            display,
            CpalAudioOut::new(),
            InstantTicks::new(),
            GilrsController::new(),
            self.config.engine_params(),
        )?;
        start(&mut platform, &mut self.engine, &self.config)?;

        self.window = Some(window);
        self.platform = Some(platform);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: RunnerError) {
        error!("{e}");
        self.error.get_or_insert(e);
        event_loop.exit();
    }

    fn finish(mut self) -> Result<(), RunnerError> {
        if let Some(platform) = self.platform.as_mut() {
            platform.shutdown(&mut self.engine);
        }
        self.error.map_or(Ok(()), Err)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.open(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(platform) = self.platform.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                platform.display_mut().resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    let pressed = event.state == ElementState::Pressed;
                    if keycode == KeyCode::Escape && pressed {
                        event_loop.exit();
                        return;
                    }
                    if !event.repeat {
                        platform.controller_mut().set_key(keycode, pressed);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = platform.run_frame(&mut self.engine) {
                    self.fail(event_loop, e.into());
                    return;
                }
                if platform.display().is_lost() {
                    event_loop.exit();
                    return;
                }
                if self.config.frames.is_some_and(|limit| platform.frames() >= limit) {
                    info!(frames = platform.frames(), "frame limit reached");
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
