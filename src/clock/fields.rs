//! Clock fields: named, bounded integers derived from a time of day

use serde::{Deserialize, Serialize};

use super::time::ClockTime;

/// A time component the simulation can map particles to.
///
/// Raw kinds cover the whole quantity (0-59 / 0-23); the `*Tens` / `*Ones`
/// kinds split a two-digit quantity by 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Seconds,
    Minutes,
    Hours,
    SecondsTens,
    SecondsOnes,
    MinutesTens,
    MinutesOnes,
    HoursTens,
    HoursOnes,
}

impl FieldKind {
    pub const ALL: [FieldKind; 9] = [
        FieldKind::Seconds,
        FieldKind::Minutes,
        FieldKind::Hours,
        FieldKind::SecondsTens,
        FieldKind::SecondsOnes,
        FieldKind::MinutesTens,
        FieldKind::MinutesOnes,
        FieldKind::HoursTens,
        FieldKind::HoursOnes,
    ];

    /// Largest value this field can take
    pub fn max(&self) -> u32 {
        match self {
            FieldKind::Seconds | FieldKind::Minutes => 59,
            FieldKind::Hours => 23,
            FieldKind::SecondsTens | FieldKind::MinutesTens => 5,
            FieldKind::HoursTens => 2,
            FieldKind::SecondsOnes | FieldKind::MinutesOnes | FieldKind::HoursOnes => 9,
        }
    }

    /// Number of distinct values (pool size needed to represent every value)
    pub fn range_len(&self) -> usize {
        self.max() as usize + 1
    }

    /// Extract this field's value from a time
    pub fn value(&self, time: &ClockTime) -> u32 {
        match self {
            FieldKind::Seconds => time.second(),
            FieldKind::Minutes => time.minute(),
            FieldKind::Hours => time.hour(),
            FieldKind::SecondsTens => time.second() / 10,
            FieldKind::SecondsOnes => time.second() % 10,
            FieldKind::MinutesTens => time.minute() / 10,
            FieldKind::MinutesOnes => time.minute() % 10,
            FieldKind::HoursTens => time.hour() / 10,
            FieldKind::HoursOnes => time.hour() % 10,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Seconds => "seconds",
            FieldKind::Minutes => "minutes",
            FieldKind::Hours => "hours",
            FieldKind::SecondsTens => "secondsTens",
            FieldKind::SecondsOnes => "secondsOnes",
            FieldKind::MinutesTens => "minutesTens",
            FieldKind::MinutesOnes => "minutesOnes",
            FieldKind::HoursTens => "hoursTens",
            FieldKind::HoursOnes => "hoursOnes",
        }
    }
}

/// One field's value for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockField {
    pub kind: FieldKind,
    pub value: u32,
}

/// Produces a fixed set of fields from a time reading
#[derive(Debug, Clone, Default)]
pub struct DigitMapper {
    kinds: Vec<FieldKind>,
}

impl DigitMapper {
    pub fn new(kinds: impl IntoIterator<Item = FieldKind>) -> Self {
        let mut mapper = Self { kinds: Vec::new() };
        for kind in kinds {
            if !mapper.kinds.contains(&kind) {
                mapper.kinds.push(kind);
            }
        }
        mapper
    }

    pub fn kinds(&self) -> &[FieldKind] {
        &self.kinds
    }

    pub fn map(&self, time: &ClockTime) -> Vec<ClockField> {
        self.kinds
            .iter()
            .map(|&kind| ClockField {
                kind,
                value: kind.value(time),
            })
            .collect()
    }
}
