//! Console-rate tick counter on top of `Instant`.

use std::time::{Duration, Instant};

use nx_port::host::TickSource;
use nx_port::timing::{TICK_HZ, Ticks};

/// Ticks elapsed in `elapsed` at the console's counter rate.
#[must_use]
pub fn ticks_from_duration(elapsed: Duration) -> Ticks {
    Ticks::new((elapsed.as_nanos() * u128::from(TICK_HZ) / 1_000_000_000) as u64)
}

/// Counts from the moment it was created.
#[derive(Debug, Clone, Copy)]
pub struct InstantTicks {
    epoch: Instant,
}

impl InstantTicks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for InstantTicks {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for InstantTicks {
    fn system_tick(&self) -> Ticks {
        ticks_from_duration(self.epoch.elapsed())
    }
}
