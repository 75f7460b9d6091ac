//! Command-line configuration.

use std::path::PathBuf;

use clap::Parser;
use nx_port::sys::{DEFAULT_LOG_PATH, EngineParams, LogFile};
use nx_port::VideoSettings;

/// Desktop host for the console port.
#[derive(Debug, Clone, Parser)]
#[command(name = "nx-runner", version, about, long_about = None)]
pub struct RunnerConfig {
    /// Window title.
    #[arg(long, default_value = "nx-runner")]
    pub title: String,

    /// Window size relative to the 1280x720 console screen.
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,

    /// Do not wait for vertical blank after each frame.
    #[arg(long)]
    pub no_vsync: bool,

    /// Append-only log for fatal errors (and debug output with --debug-log).
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    pub log: PathBuf,

    /// Also write every log event to the log file.
    #[arg(long)]
    pub debug_log: bool,

    /// Directory the engine resolves game data against.
    #[arg(long, default_value = ".")]
    pub basedir: PathBuf,

    /// Engine heap size in MiB.
    #[arg(long, default_value_t = 16)]
    pub heap_mb: usize,

    /// Stop after this many frames.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Run without a window, presenting into memory.
    #[arg(long)]
    pub headless: bool,

    /// Arguments passed through to the engine.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub engine_args: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            title: "nx-runner".to_string(),
            scale: 1.0,
            no_vsync: false,
            log: PathBuf::from(DEFAULT_LOG_PATH),
            debug_log: false,
            basedir: PathBuf::from("."),
            heap_mb: 16,
            frames: None,
            headless: false,
            engine_args: Vec::new(),
        }
    }
}

impl RunnerConfig {
    #[must_use]
    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            memsize: self.heap_mb.saturating_mul(1024 * 1024),
            basedir: self.basedir.clone(),
            args: self.engine_args.clone(),
        }
    }

    #[must_use]
    pub fn video_settings(&self) -> VideoSettings {
        VideoSettings {
            vsync: !self.no_vsync,
            ..VideoSettings::default()
        }
    }

    #[must_use]
    pub fn log_file(&self) -> LogFile {
        LogFile::new(&self.log)
    }
}
