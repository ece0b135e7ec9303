//! Read-side abstraction over wherever records live.
//!
//! The reporting pipeline only needs these four fetches. [`crate::Storage`]
//! implements them on top of `SQLite`; tests provide their own in-memory or
//! failing sources.

use async_trait::async_trait;

use crate::error::Result;
use crate::records::{AchievementTally, AttendanceRecord, ChildRecord, EventRecord};

/// Source of the records consumed by attendance reports.
///
/// Every method is a one-shot, side-effect-free read, so calls may be issued
/// concurrently.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// All known children.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    async fn fetch_all_children(&self) -> Result<Vec<ChildRecord>>;

    /// Events whose scheduled start lies in `[start, end]` (milliseconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    async fn fetch_events_in_range(&self, start: i64, end: i64) -> Result<Vec<EventRecord>>;

    /// Attendance marks recorded for a single event.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    async fn fetch_attendance_for_event(&self, event_id: i64) -> Result<Vec<AttendanceRecord>>;

    /// Per-child achievement point totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    async fn fetch_achievement_tallies(&self) -> Result<Vec<AchievementTally>>;
}
