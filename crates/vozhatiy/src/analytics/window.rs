//! The date range a report covers.

use chrono::{DateTime, Duration, NaiveDate};
use serde::Serialize;

use crate::error::{Error, Result};

/// Milliseconds in one calendar day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// A closed `[start, end]` interval in milliseconds covering whole UTC days.
///
/// Both boundary days are inclusive: `start` is moved back to 00:00 of its day
/// and `end` forward to the last millisecond of its day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AggregationWindow {
    start: i64,
    end: i64,
}

impl AggregationWindow {
    /// Build a window from two millisecond timestamps.
    ///
    /// Bounds whose day edges fall outside the `i64` range are clamped to
    /// `i64::MIN` / `i64::MAX`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWindow`] if `start > end`.
    pub fn new(start: i64, end: i64) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidWindow { start, end });
        }
        let start = start
            .div_euclid(MILLIS_PER_DAY)
            .checked_mul(MILLIS_PER_DAY)
            .unwrap_or(i64::MIN);
        let end = end
            .div_euclid(MILLIS_PER_DAY)
            .checked_add(1)
            .and_then(|day| day.checked_mul(MILLIS_PER_DAY))
            .map_or(i64::MAX, |next_day| next_day - 1);
        Ok(Self { start, end })
    }

    /// Build a window spanning the calendar days `from..=to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWindow`] if `from` is after `to`.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        Self::new(date_millis(from)?, date_millis(to)?)
    }

    /// The `days` calendar days ending with (and including) `today`.
    ///
    /// # Errors
    ///
    /// Returns an error if `days` is 0 or the range underflows the calendar.
    pub fn last_days(today: NaiveDate, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(Error::internal("a window must cover at least one day"));
        }
        let from = today
            .checked_sub_signed(Duration::days(i64::from(days) - 1))
            .ok_or_else(|| Error::internal("window start is out of range"))?;
        Self::from_dates(from, today)
    }

    /// First millisecond of the window.
    #[must_use]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Last millisecond of the window.
    #[must_use]
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Whether `timestamp` lies inside the window.
    #[must_use]
    pub fn contains(&self, timestamp: i64) -> bool {
        (self.start..=self.end).contains(&timestamp)
    }

    /// Number of calendar days covered.
    #[must_use]
    pub fn day_count(&self) -> i64 {
        let span = i128::from(self.end) - i128::from(self.start) + 1;
        saturate(span.div_euclid(i128::from(MILLIS_PER_DAY)))
    }

    /// Zero-based day offset of `timestamp` from the window start.
    #[must_use]
    pub fn day_index(&self, timestamp: i64) -> i64 {
        let offset = i128::from(timestamp) - i128::from(self.start);
        saturate(offset.div_euclid(i128::from(MILLIS_PER_DAY)))
    }

    /// Calendar date of a day offset.
    #[must_use]
    pub fn date_of(&self, day_index: i64) -> Option<NaiveDate> {
        let millis = self.start.checked_add(day_index.checked_mul(MILLIS_PER_DAY)?)?;
        DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
    }

    /// Calendar date of the first day.
    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.date_of(0)
    }

    /// Calendar date of the last day.
    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.date_of(self.day_count() - 1)
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

fn date_millis(date: NaiveDate) -> Result<i64> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| Error::internal(format!("cannot take midnight of {date}")))
}
