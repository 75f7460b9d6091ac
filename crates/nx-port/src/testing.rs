//! In-memory host doubles.
//!
//! Each double records the calls the adapters make so tests can assert on
//! host traffic without hardware.

use std::cell::Cell;
use std::collections::VecDeque;

use crate::host::{
    AudioOut, AudioOutBuffer, Controller, Display, HostError, ReleasedBuffer, Surface, TickSource,
};
use crate::timing::Ticks;

/// Two-buffer display. `front()` is the most recently swapped surface.
pub struct MockDisplay {
    width: u32,
    height: u32,
    buffers: [Vec<u32>; 2],
    back: usize,
    acquired: bool,
    pub acquisitions: u32,
    /// Acquisitions made while the previous surface was still unswapped.
    pub unswapped_acquisitions: u32,
    pub flushes: u32,
    pub swaps: u32,
    pub vsync_waits: u32,
}

impl MockDisplay {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            buffers: [vec![0; len], vec![0; len]],
            back: 0,
            acquired: false,
            acquisitions: 0,
            unswapped_acquisitions: 0,
            flushes: 0,
            swaps: 0,
            vsync_waits: 0,
        }
    }

    #[must_use]
    pub fn front(&self) -> &[u32] {
        &self.buffers[self.back ^ 1]
    }
}

impl Display for MockDisplay {
    fn framebuffer(&mut self) -> Surface<'_> {
        if self.acquired {
            self.unswapped_acquisitions += 1;
        }
        self.acquired = true;
        self.acquisitions += 1;
        Surface {
            width: self.width,
            height: self.height,
            pixels: &mut self.buffers[self.back],
        }
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }

    fn swap_buffers(&mut self) {
        self.acquired = false;
        self.back ^= 1;
        self.swaps += 1;
    }

    fn wait_for_vsync(&mut self) {
        self.vsync_waits += 1;
    }
}

/// Output queue that keeps a copy of every block.
#[derive(Default)]
pub struct MockAudioOut {
    pub fail_initialize: bool,
    pub initialized: bool,
    pub started: bool,
    pub stopped: bool,
    pub blocks: Vec<Vec<u8>>,
    /// Reported by `samples_played()` when set.
    pub hardware_counter: Option<u64>,
}

impl MockAudioOut {
    /// A host whose audio service refuses to come up.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_initialize: true,
            ..Self::default()
        }
    }
}

impl AudioOut for MockAudioOut {
    fn initialize(&mut self) -> Result<(), HostError> {
        if self.fail_initialize {
            return Err(HostError::new("audout service unavailable"));
        }
        self.initialized = true;
        Ok(())
    }

    fn start(&mut self) -> Result<(), HostError> {
        self.started = true;
        Ok(())
    }

    fn play_buffer(&mut self, buffer: &AudioOutBuffer<'_>) -> Option<ReleasedBuffer> {
        self.blocks.push(buffer.data.to_vec());
        let queued = self.blocks.len() as u64;
        (queued > 1).then(|| ReleasedBuffer { id: queued - 2 })
    }

    fn samples_played(&self) -> Option<u64> {
        self.hardware_counter
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Tick counter the test sets by hand.
#[derive(Debug, Default)]
pub struct ManualTicks {
    now: Cell<u64>,
}

impl ManualTicks {
    #[must_use]
    pub fn new(start: u64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.set(now);
    }

    pub fn advance(&self, ticks: u64) {
        self.now.set(self.now.get() + ticks);
    }
}

impl TickSource for ManualTicks {
    fn system_tick(&self) -> Ticks {
        Ticks::new(self.now.get())
    }
}

/// Replays a fixed list of `(down, up)` edges, one per scan, then reports
/// nothing.
#[derive(Debug, Default)]
pub struct ScriptedController {
    script: VecDeque<(u64, u64)>,
    current: (u64, u64),
    pub scans: u32,
}

impl ScriptedController {
    pub fn new(script: impl IntoIterator<Item = (u64, u64)>) -> Self {
        Self {
            script: script.into_iter().collect(),
            current: (0, 0),
            scans: 0,
        }
    }
}

impl Controller for ScriptedController {
    fn scan(&mut self) {
        self.scans += 1;
        self.current = self.script.pop_front().unwrap_or_default();
    }

    fn keys_down(&self) -> u64 {
        self.current.0
    }

    fn keys_up(&self) -> u64 {
        self.current.1
    }
}
