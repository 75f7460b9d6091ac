//! Bump arena for large short-lived engine scratch buffers.
//!
//! Allocations are released in reverse order by size; `rewind` drops
//! everything at once.

use super::{SysError, try_alloc};

/// Default arena capacity.
pub const BIG_STACK_SIZE: usize = 20 * 1024 * 1024;

pub struct BigStack {
    memory: Vec<u8>,
    cursor: usize,
}

impl BigStack {
    pub fn new(capacity: usize) -> Result<Self, SysError> {
        Ok(Self {
            memory: try_alloc(capacity, "big stack")?,
            cursor: 0,
        })
    }

    /// Release every allocation.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Carve `size` bytes off the top of the arena.
    pub fn alloc(&mut self, size: usize, purpose: &'static str) -> Result<&mut [u8], SysError> {
        let end = self
            .cursor
            .checked_add(size)
            .filter(|&end| end <= self.memory.len())
            .ok_or(SysError::BigStackOverflow { purpose, size })?;
        let start = self.cursor;
        self.cursor = end;
        Ok(&mut self.memory[start..end])
    }

    /// Return the top `size` bytes to the arena.
    pub fn free(&mut self, size: usize, purpose: &'static str) -> Result<(), SysError> {
        self.cursor = self
            .cursor
            .checked_sub(size)
            .ok_or(SysError::BigStackUnderflow { purpose, size })?;
        Ok(())
    }

    #[must_use]
    pub fn used(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }
}
