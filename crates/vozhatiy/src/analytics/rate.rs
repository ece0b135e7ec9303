//! Percentage arithmetic shared by every attendance summary.

use serde::{Deserialize, Serialize};

/// Integer attendance percentage, `round(present * 100 / total)` rounding half
/// up, clamped to `[0, 100]`. A zero denominator yields 0.
#[must_use]
pub fn attendance_rate(present: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let present = u64::from(present.min(total));
    let total = u64::from(total);
    let rate = (present * 200 + total) / (total * 2);
    // present <= total keeps this within 0..=100
    u32::try_from(rate).unwrap_or(100)
}

/// `round(sum / count)` rounding half up; 0 when `count` is 0.
#[must_use]
pub(crate) fn rounded_mean(sum: u64, count: u64) -> u32 {
    if count == 0 {
        return 0;
    }
    u32::try_from((sum * 2 + count) / (count * 2)).unwrap_or(u32::MAX)
}

/// How the per-day mean of event rates is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayMeanMode {
    /// Sum every event rate of the day and divide once, rounding half up.
    /// The result does not depend on event order.
    #[default]
    Deferred,
    /// Fold each rate into a running mean with integer division at every step:
    /// `mean = (mean * n + rate) / (n + 1)`. Matches reports produced by older
    /// versions but depends on event order.
    Running,
}

impl std::fmt::Display for DayMeanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deferred => write!(f, "deferred"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Accumulates the event rates that fall on one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DayBucket {
    count: u32,
    sum: u64,
    running: u32,
}

impl DayBucket {
    pub(crate) fn push(&mut self, rate: u32) {
        let n = u64::from(self.count);
        let running = (u64::from(self.running) * n + u64::from(rate)) / (n + 1);
        self.running = u32::try_from(running).unwrap_or(u32::MAX);
        self.sum += u64::from(rate);
        self.count += 1;
    }

    pub(crate) fn count(&self) -> u32 {
        self.count
    }

    pub(crate) fn mean(&self, mode: DayMeanMode) -> u32 {
        match mode {
            DayMeanMode::Deferred => rounded_mean(self.sum, u64::from(self.count)),
            DayMeanMode::Running => self.running,
        }
    }
}
