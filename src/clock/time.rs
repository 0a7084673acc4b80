//! Validated time-of-day value

use std::fmt;

use crate::error::{Result, SimError};

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// A time of day with hour 0-23, minute 0-59, second 0-59.
///
/// Fields are private so an out-of-range value can never reach the core;
/// malformed override input is rejected by [`ClockTime::new`] / [`ClockTime::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClockTime {
    hour: u8,
    minute: u8,
    second: u8,
}

/// Which clock units wrapped between two readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rollover {
    pub minute: bool,
    pub hour: bool,
    pub day: bool,
}

impl Rollover {
    pub fn any(&self) -> bool {
        self.minute || self.hour || self.day
    }
}

impl ClockTime {
    /// Midnight
    pub const MIDNIGHT: ClockTime = ClockTime {
        hour: 0,
        minute: 0,
        second: 0,
    };

    /// Build a validated time
    pub fn new(hour: u32, minute: u32, second: u32) -> Result<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return Err(SimError::InvalidTimeOverride {
                hour,
                minute,
                second,
            });
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
            second: second as u8,
        })
    }

    /// Parse `HH:MM:SS` (or `HH:MM`, seconds default to 0)
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(SimError::MalformedTime(s.to_string()));
        }
        let mut values = [0u32; 3];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| SimError::MalformedTime(s.to_string()))?;
        }
        Self::new(values[0], values[1], values[2])
    }

    /// Build from seconds since midnight (wraps past one day)
    pub fn from_seconds_of_day(secs: u32) -> Self {
        let secs = secs % SECONDS_PER_DAY;
        Self {
            hour: (secs / 3600) as u8,
            minute: ((secs / 60) % 60) as u8,
            second: (secs % 60) as u8,
        }
    }

    pub fn seconds_of_day(&self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60 + self.second as u32
    }

    #[inline]
    pub fn hour(&self) -> u32 {
        self.hour as u32
    }

    #[inline]
    pub fn minute(&self) -> u32 {
        self.minute as u32
    }

    #[inline]
    pub fn second(&self) -> u32 {
        self.second as u32
    }

    /// Advance by `n` seconds, carrying second → minute → hour → day
    pub fn advance_seconds(&self, n: u32) -> Self {
        Self::from_seconds_of_day(self.seconds_of_day() + n % SECONDS_PER_DAY)
    }

    /// Units that rolled over going from `self` to the later reading `next`
    pub fn rollover_to(&self, next: &ClockTime) -> Rollover {
        let day = next.seconds_of_day() < self.seconds_of_day();
        let hour = day || next.hour != self.hour;
        let minute = hour || next.minute != self.minute;
        Rollover { minute, hour, day }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}
