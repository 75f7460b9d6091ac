//! Subscriber set-up.
//!
//! Events go to stderr, filtered by `RUST_LOG` (default `info`). With
//! `--debug-log` every event is also appended to the log file.

use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::RunnerError;
use crate::config::RunnerConfig;

pub fn init(config: &RunnerConfig) -> Result<(), RunnerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr = fmt::layer().with_writer(std::io::stderr).compact();

    let file = if config.debug_log {
        let file = config.log_file().open_append()?;
        Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()?;
    Ok(())
}
