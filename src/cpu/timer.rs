//! Delay and sound timers.
//!
//! Both count down at 60 Hz while non-zero. The rate is tied to wall time,
//! not to how many instructions ran, so run drivers feed elapsed time into a
//! [`Ticker`] and call [`Timers::tick`] once per tick it reports.

use serde::{Serialize, Deserialize};
use std::time::Duration;

/// Timer decrement rate.
pub const TIMER_HZ: u32 = 60;

/// The two countdown timers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// One 60 Hz tick: decrement each non-zero timer.
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }

    /// Whether the host should be driving the buzzer.
    pub fn is_beeping(&self) -> bool {
        self.sound > 0
    }
}

/// Fixed-rate time accumulator.
///
/// Elapsed time is added with [`Ticker::advance`], which returns the number
/// of whole periods that passed and keeps the remainder for next time.
#[derive(Clone, Debug)]
pub struct Ticker {
    period: Duration,
    accumulated: Duration,
}

impl Ticker {
    pub fn new(rate_hz: u32) -> Self {
        Self {
            period: Duration::from_secs(1) / rate_hz.max(1),
            accumulated: Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Add elapsed time; returns how many ticks are due.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulated += elapsed;
        let mut ticks = 0;
        while self.accumulated >= self.period {
            self.accumulated -= self.period;
            ticks += 1;
        }
        ticks
    }

    /// Time until the next tick is due.
    pub fn remaining(&self) -> Duration {
        self.period.saturating_sub(self.accumulated)
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new(TIMER_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_decrements_both() {
        let mut timers = Timers { delay: 2, sound: 1 };
        timers.tick();
        assert_eq!(timers, Timers { delay: 1, sound: 0 });
        assert!(!timers.is_beeping());
    }

    #[test]
    fn test_tick_at_zero_is_idempotent() {
        let mut timers = Timers::new();
        timers.tick();
        timers.tick();
        assert_eq!(timers, Timers { delay: 0, sound: 0 });
    }

    #[test]
    fn test_ticker_carries_remainder() {
        let mut ticker = Ticker::new(60);
        let mut total = 0;
        // 1 second in uneven slices
        for ms in [7u64, 13, 250, 1, 729] {
            total += ticker.advance(Duration::from_millis(ms));
        }
        assert_eq!(total, 60);
    }

    #[test]
    fn test_ticker_no_tick_before_period() {
        let mut ticker = Ticker::new(60);
        assert_eq!(ticker.advance(Duration::from_millis(10)), 0);
        assert_eq!(ticker.advance(Duration::from_millis(10)), 1);
    }
}
