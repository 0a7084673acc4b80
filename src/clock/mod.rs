//! Time-to-digit mapping
//!
//! Converts wall-clock (or override) time into bounded integer clock fields.
//! Digits are recomputed once per logical tick, never per render frame.

pub mod fields;
pub mod source;
pub mod time;

pub use fields::{ClockField, DigitMapper, FieldKind};
pub use source::{ManualClock, SystemClock, TickTimer, TimeSource};
pub use time::{ClockTime, Rollover};
