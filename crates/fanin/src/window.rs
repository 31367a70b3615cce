//! Query time window.

use crate::Timestamp;

/// Inclusive time range `[mint, maxt]` a query restricts samples to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    /// Lower bound (inclusive).
    pub mint: Timestamp,
    /// Upper bound (inclusive).
    pub maxt: Timestamp,
}

impl TimeWindow {
    /// Creates a new window.
    pub fn new(mint: Timestamp, maxt: Timestamp) -> Self {
        Self { mint, maxt }
    }

    /// A window covering every representable timestamp.
    pub fn all() -> Self {
        Self::new(Timestamp::MIN, Timestamp::MAX)
    }

    /// Returns true if the timestamp falls inside the window.
    pub fn contains(&self, t: Timestamp) -> bool {
        self.mint <= t && t <= self.maxt
    }

    /// Returns true if `[min_time, max_time]` intersects the window.
    pub fn overlaps(&self, min_time: Timestamp, max_time: Timestamp) -> bool {
        min_time <= self.maxt && max_time >= self.mint
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::all()
    }
}
