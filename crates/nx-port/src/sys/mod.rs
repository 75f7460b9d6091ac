//! System shims: fallible allocation, file handles, the big-stack arena,
//! engine start-up parameters and the fatal-error log.

mod bigstack;
mod files;
mod log;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use bigstack::{BIG_STACK_SIZE, BigStack};
pub use files::{FileHandle, FileTable, MAX_HANDLES};
pub use log::{DEFAULT_LOG_PATH, LogFile, fatal};

/// Default size of the engine's zone heap.
pub const DEFAULT_ENGINE_MEMSIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum SysError {
    #[error("{purpose} - failed on {len} bytes")]
    OutOfMemory { purpose: &'static str, len: usize },

    #[error("out of handles")]
    OutOfHandles,

    #[error("invalid file handle {0}")]
    InvalidHandle(usize),

    #[error("error opening {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("big stack: {purpose} - failed on {size} bytes")]
    BigStackOverflow { purpose: &'static str, size: usize },

    #[error("big stack: {purpose} - underflow on {size} bytes")]
    BigStackUnderflow { purpose: &'static str, size: usize },
}

/// Allocate `len` default-initialised elements, reporting failure instead of
/// aborting.
pub fn try_alloc<T: Clone + Default>(len: usize, purpose: &'static str) -> Result<Vec<T>, SysError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| SysError::OutOfMemory {
        purpose,
        len: len.saturating_mul(size_of::<T>()),
    })?;
    buf.resize(len, T::default());
    Ok(buf)
}

/// Whether `path` names a readable file.
#[must_use]
pub fn file_exists(path: &Path) -> bool {
    std::fs::File::open(path).is_ok()
}

/// Create a directory. An existing directory is not an error.
pub fn mkdir(path: &Path) -> Result<(), SysError> {
    match std::fs::create_dir(path) {
        Err(e) if e.kind() != io::ErrorKind::AlreadyExists => Err(e.into()),
        _ => Ok(()),
    }
}

/// Parameters handed to the engine at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineParams {
    /// Size of the engine's zone heap in bytes.
    pub memsize: usize,
    /// Directory the engine resolves game data against.
    pub basedir: PathBuf,
    /// Command-line arguments forwarded to the engine.
    pub args: Vec<String>,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            memsize: DEFAULT_ENGINE_MEMSIZE,
            basedir: PathBuf::from("."),
            args: Vec::new(),
        }
    }
}

impl EngineParams {
    /// Allocate the engine's zone heap.
    pub fn allocate_heap(&self) -> Result<Vec<u8>, SysError> {
        try_alloc(self.memsize, "engine heap")
    }
}
