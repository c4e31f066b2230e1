//! Utility helpers shared across the crate

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};
