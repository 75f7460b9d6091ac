//! Desktop host for the console port.
//!
//! Implements the `nx_port` host traits on a desktop: a winit window drawn
//! through `pixels`, cpal audio output, gilrs gamepads plus the keyboard, and
//! an `Instant`-based tick counter. A demo engine core drives the whole frame
//! cycle so the port can be exercised without game data.

pub mod app;
pub mod audio;
pub mod config;
pub mod controller;
pub mod demo;
pub mod display;
pub mod logging;
pub mod ticks;

use std::io;

use nx_port::PlatformError;
use thiserror::Error;

pub use config::RunnerConfig;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("surface: {0}")]
    Pixels(#[from] pixels::Error),

    #[error("log file: {0}")]
    Io(#[from] io::Error),

    #[error("logging already initialised: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}

/// Run with `config`, windowed unless `--headless` was given.
pub fn run(config: RunnerConfig) -> Result<(), RunnerError> {
    if config.headless {
        app::run_headless(&config).map(|_| ())
    } else {
        app::run_windowed(config)
    }
}
