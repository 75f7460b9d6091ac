//! Host SDK seam.
//!
//! The console SDK calls the adapters depend on (display surfaces, the audio
//! output queue, the system tick and the controller) are expressed as traits
//! so the adapters never name a concrete platform. The desktop runner and the
//! test doubles both implement them.

use thiserror::Error;

use crate::timing::Ticks;

/// A failure reported by the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The host's currently acquired back buffer.
///
/// Pixels are packed RGBA: red in the low byte, alpha in the high byte.
/// `pixels` holds at least `width * height` entries, row-major, with a stride
/// of `width`.
pub struct Surface<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a mut [u32],
}

/// Double-buffered display surface.
///
/// Each frame the caller acquires the back buffer with `framebuffer()`,
/// writes it, then calls `flush()` and `swap_buffers()`. A surface that is
/// acquired must be swapped before the next acquisition.
pub trait Display {
    /// Acquire the current back buffer.
    fn framebuffer(&mut self) -> Surface<'_>;

    /// Make CPU writes to the acquired surface visible to the display engine.
    fn flush(&mut self);

    /// Queue the acquired surface for scan-out and rotate to the next buffer.
    fn swap_buffers(&mut self);

    /// Block until the next vertical blank.
    fn wait_for_vsync(&mut self);
}

/// One block handed to the hardware output queue.
#[derive(Debug, Clone, Copy)]
pub struct AudioOutBuffer<'a> {
    /// Interleaved little-endian PCM bytes to play.
    pub data: &'a [u8],
}

/// Identifies a block the hardware has finished playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleasedBuffer {
    pub id: u64,
}

/// Hardware audio output queue.
pub trait AudioOut {
    /// Bring up the audio output service.
    fn initialize(&mut self) -> Result<(), HostError>;

    /// Start the output stream.
    fn start(&mut self) -> Result<(), HostError>;

    /// Append a block to the output queue.
    ///
    /// Returns a block the hardware has released since the previous call, if
    /// any.
    fn play_buffer(&mut self, buffer: &AudioOutBuffer<'_>) -> Option<ReleasedBuffer>;

    /// Samples the hardware has actually consumed since `start()`, when the
    /// platform can report it.
    fn samples_played(&self) -> Option<u64> {
        None
    }

    /// Stop the output stream.
    fn stop(&mut self);
}

/// Monotonic hardware tick counter running at [`crate::timing::TICK_HZ`].
pub trait TickSource {
    fn system_tick(&self) -> Ticks;
}

/// Controller polled once per frame.
///
/// Bitmasks use the layout in [`crate::input::button`].
pub trait Controller {
    /// Latch the current controller state.
    fn scan(&mut self);

    /// Buttons that went down since the previous scan.
    fn keys_down(&self) -> u64;

    /// Buttons that went up since the previous scan.
    fn keys_up(&self) -> u64;
}
