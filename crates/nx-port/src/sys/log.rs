//! Append-only text log and the fatal-error exit path.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::error;

/// Log file written next to the executable.
pub const DEFAULT_LOG_PATH: &str = "./log.txt";

/// One formatted line per call, appended; no structure, no rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    path: PathBuf,
}

impl Default for LogFile {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_PATH)
    }
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the log for appending, creating it if needed.
    pub fn open_append(&self) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(&self.path)
    }

    /// Append `line` followed by a newline.
    pub fn append_line(&self, line: &str) -> io::Result<()> {
        let mut file = self.open_append()?;
        writeln!(file, "{line}")
    }
}

/// Record `message` and terminate the process.
///
/// Nothing else is shut down; the process exits with status 1 as soon as
/// the line is written.
pub fn fatal(log: &LogFile, message: impl fmt::Display) -> ! {
    let line = message.to_string();
    error!("{line}");
    if let Err(e) = log.append_line(&line) {
        error!(path = %log.path().display(), "could not write log: {e}");
    }
    std::process::exit(1)
}
