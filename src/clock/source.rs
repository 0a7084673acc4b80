//! Pluggable time sources and the logical tick timer

use chrono::{Local, Timelike};

use super::time::ClockTime;
use crate::consts::CLOCK_TICK_SECS;

/// Where the simulation reads the time of day from.
///
/// `advance` is called once per logical tick, before `now`. Sources that
/// follow the system clock ignore it.
pub trait TimeSource {
    fn now(&self) -> ClockTime;

    fn advance(&mut self, _seconds: u32) {}

    /// True for user-set time that runs independently of the system clock
    fn is_override(&self) -> bool {
        false
    }
}

/// Local wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> ClockTime {
        let now = Local::now();
        ClockTime::from_seconds_of_day(now.num_seconds_from_midnight())
    }
}

/// Override time: starts at a user-set point and advances exactly one
/// simulated second per logical tick.
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    current: ClockTime,
}

impl ManualClock {
    pub fn new(start: ClockTime) -> Self {
        Self { current: start }
    }

    pub fn set(&mut self, time: ClockTime) {
        self.current = time;
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> ClockTime {
        self.current
    }

    fn advance(&mut self, seconds: u32) {
        self.current = self.current.advance_seconds(seconds);
    }

    fn is_override(&self) -> bool {
        true
    }
}

/// Accumulates real frame time and reports due logical ticks.
///
/// Keeps digit recomputation at a fixed rate regardless of frame rate.
#[derive(Debug, Clone)]
pub struct TickTimer {
    period: f32,
    accumulator: f32,
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(CLOCK_TICK_SECS)
    }
}

impl TickTimer {
    pub fn new(period: f32) -> Self {
        Self {
            period: period.max(f32::EPSILON),
            accumulator: 0.0,
        }
    }

    /// Feed elapsed real time, returns how many ticks are due
    pub fn update(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut due = 0;
        while self.accumulator >= self.period {
            self.accumulator -= self.period;
            due += 1;
        }
        due
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_one_second_per_tick() {
        let mut clock = ManualClock::new(ClockTime::new(23, 59, 58).unwrap());
        assert!(clock.is_override());
        clock.advance(1);
        assert_eq!(clock.now().to_string(), "23:59:59");
        clock.advance(1);
        assert_eq!(clock.now(), ClockTime::MIDNIGHT);
    }

    #[test]
    fn test_system_clock_is_in_range() {
        let clock = SystemClock;
        let now = clock.now();
        assert!(now.hour() <= 23 && now.minute() <= 59 && now.second() <= 59);
        assert!(!clock.is_override());
    }

    #[test]
    fn test_tick_timer_decoupled_from_frames() {
        let mut timer = TickTimer::new(1.0);
        let mut ticks = 0;
        // 2.5 seconds at 60 fps
        for _ in 0..150 {
            ticks += timer.update(1.0 / 60.0);
        }
        assert_eq!(ticks, 2);
        // A long stall catches up in one call
        assert_eq!(timer.update(3.0), 3);
    }
}
