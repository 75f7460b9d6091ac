//! Hardware tick arithmetic shared by the video and audio adapters.
//!
//! The console exposes a single monotonic counter running at 19.2 MHz. Every
//! elapsed-time value in this crate derives from differences of that counter.

/// Frequency of the hardware system tick in Hz.
pub const TICK_HZ: u64 = 19_200_000;

/// A reading of the hardware tick counter, or a difference of two readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Ticks elapsed since `earlier`. Saturates at zero if the counter
    /// appears to have gone backwards.
    #[must_use]
    pub const fn since(self, earlier: Self) -> Self {
        Self(self.0.saturating_sub(earlier.0))
    }

    /// This tick count expressed in seconds.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / TICK_HZ as f64
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl core::ops::Sub for Ticks {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.since(rhs)
    }
}

/// Absolute engine clock in seconds for a raw tick reading.
#[must_use]
pub fn float_time(now: Ticks) -> f64 {
    now.as_secs_f64()
}

/// Number of whole samples played at `sample_rate` during `elapsed`.
///
/// Integer arithmetic throughout, so the result is exact and never
/// decreases as `elapsed` grows.
#[must_use]
pub const fn ticks_to_samples(elapsed: Ticks, sample_rate: u32) -> u64 {
    ((elapsed.0 as u128 * sample_rate as u128) / TICK_HZ as u128) as u64
}

/// Tracks the previous frame's tick so the host loop can hand the engine a
/// per-frame delta.
#[derive(Debug, Clone, Copy)]
pub struct FrameTimer {
    last: Ticks,
}

impl FrameTimer {
    #[must_use]
    pub const fn new(now: Ticks) -> Self {
        Self { last: now }
    }

    /// Seconds since the previous call (or since construction).
    pub fn delta_seconds(&mut self, now: Ticks) -> f64 {
        let delta = now.since(self.last);
        self.last = now;
        delta.as_secs_f64()
    }

    #[must_use]
    pub const fn last(&self) -> Ticks {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_second_of_ticks() {
        assert!((Ticks::new(TICK_HZ).as_secs_f64() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sub_saturates() {
        assert_eq!(Ticks::new(5) - Ticks::new(9), Ticks::ZERO);
        assert_eq!(Ticks::new(9) - Ticks::new(5), Ticks::new(4));
    }

    #[test]
    fn one_second_is_one_sample_rate() {
        assert_eq!(ticks_to_samples(Ticks::new(TICK_HZ), 48_000), 48_000);
    }

    #[test]
    fn below_one_sample_period_rounds_down() {
        // 400 ticks per sample at 48 kHz
        assert_eq!(ticks_to_samples(Ticks::new(399), 48_000), 0);
        assert_eq!(ticks_to_samples(Ticks::new(400), 48_000), 1);
    }

    #[test]
    fn large_elapsed_does_not_overflow() {
        // A year of uptime
        let year = Ticks::new(TICK_HZ * 60 * 60 * 24 * 365);
        assert_eq!(ticks_to_samples(year, 48_000), 48_000 * 60 * 60 * 24 * 365);
    }

    #[test]
    fn frame_timer_reports_deltas() {
        let mut timer = FrameTimer::new(Ticks::new(1_000));
        let dt = timer.delta_seconds(Ticks::new(1_000 + TICK_HZ / 60));
        assert!((dt - 1.0 / 60.0).abs() < 1e-9);
        assert_eq!(timer.last(), Ticks::new(1_000 + TICK_HZ / 60));
        assert!(timer.delta_seconds(Ticks::new(1_000 + TICK_HZ / 60)).abs() < f64::EPSILON);
    }
}
