//! Capacity-bounded file handle table.
//!
//! The engine addresses open files by small integers. Slot 0 is never handed
//! out, so valid handles run from 1 to `MAX_HANDLES - 1`.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use super::SysError;

/// Number of slots in the table, including the reserved slot 0.
pub const MAX_HANDLES: usize = 10;

/// An open file's slot in a [`FileTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(usize);

impl FileHandle {
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

pub struct FileTable {
    slots: [Option<File>; MAX_HANDLES],
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    fn free_slot(&self) -> Result<usize, SysError> {
        (1..MAX_HANDLES)
            .find(|&i| self.slots[i].is_none())
            .ok_or(SysError::OutOfHandles)
    }

    fn file(&mut self, handle: FileHandle) -> Result<&mut File, SysError> {
        self.slots
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .ok_or(SysError::InvalidHandle(handle.0))
    }

    /// Open `path` for reading. Returns the handle and the file's length.
    pub fn open_read(&mut self, path: &Path) -> Result<(FileHandle, u64), SysError> {
        let slot = self.free_slot()?;
        let file = File::open(path).map_err(|source| SysError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let len = file.metadata()?.len();
        self.slots[slot] = Some(file);
        debug!(handle = slot, path = %path.display(), len, "opened for read");
        Ok((FileHandle(slot), len))
    }

    /// Create (or truncate) `path` for writing.
    pub fn open_write(&mut self, path: &Path) -> Result<FileHandle, SysError> {
        let slot = self.free_slot()?;
        let file = File::create(path).map_err(|source| SysError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.slots[slot] = Some(file);
        debug!(handle = slot, path = %path.display(), "opened for write");
        Ok(FileHandle(slot))
    }

    pub fn close(&mut self, handle: FileHandle) -> Result<(), SysError> {
        self.slots
            .get_mut(handle.0)
            .and_then(Option::take)
            .map(drop)
            .ok_or(SysError::InvalidHandle(handle.0))
    }

    /// Move to an absolute byte offset.
    pub fn seek(&mut self, handle: FileHandle, position: u64) -> Result<(), SysError> {
        self.file(handle)?.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    /// Read until `dest` is full or the file ends. Returns the bytes read.
    pub fn read(&mut self, handle: FileHandle, dest: &mut [u8]) -> Result<usize, SysError> {
        let file = self.file(handle)?;
        let mut total = 0;
        while total < dest.len() {
            match file.read(&mut dest[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }

    /// Write all of `data`. Returns the bytes written.
    pub fn write(&mut self, handle: FileHandle, data: &[u8]) -> Result<usize, SysError> {
        self.file(handle)?.write_all(data)?;
        Ok(data.len())
    }

    pub fn file_length(&mut self, handle: FileHandle) -> Result<u64, SysError> {
        Ok(self.file(handle)?.metadata()?.len())
    }

    /// Number of handles currently open.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
