//! nx-runner binary.
//!
//! Parses the command line, installs logging and runs the port. Any error
//! that escapes is written to the log file and the process exits with
//! status 1.

use clap::Parser;
use nx_port::sys::fatal;
use nx_runner::{RunnerConfig, logging, run};
use tracing::info;

fn main() {
    let config = RunnerConfig::parse();
    let log = config.log_file();

    if let Err(e) = logging::init(&config) {
        fatal(&log, e);
    }
    info!(basedir = %config.basedir.display(), headless = config.headless, "starting");

    if let Err(e) = run(config) {
        fatal(&log, e);
    }
}
