//! Attendance and achievement analytics.
//!
//! [`aggregate`] turns a snapshot of children, events, attendance marks and
//! achievement tallies into an immutable [`AttendanceReport`]:
//!
//! - an overall rate over every recorded (child, event) pair,
//! - per-squad, per-event and per-child breakdowns,
//! - a day-by-day series of mean event rates,
//! - an achievement leaderboard.
//!
//! Rates are integer percentages, `round(present * 100 / total)`, and 0 when
//! nothing was recorded. A squad's rate is the mean of its members' rates, not
//! the pooled ratio of its marks.
//!
//! # Example
//!
//! ```
//! use vozhatiy::analytics::{aggregate, AggregationInput, AggregationWindow, DayMeanMode};
//!
//! let window = AggregationWindow::new(0, 0).unwrap();
//! let report = aggregate(&window, &AggregationInput::default(), DayMeanMode::Deferred);
//! assert_eq!(report.overall_rate, 0);
//! assert!(report.is_empty());
//! ```

mod aggregate;
mod rate;
mod view;
mod window;

pub use aggregate::{
    aggregate, leaderboard, AggregationInput, AttendanceReport, ChildAttendanceSummary, DayPoint,
    EventAttendanceSummary, LeaderboardEntry, SquadAttendanceSummary,
};
pub use rate::{attendance_rate, DayMeanMode};
pub use view::{Overview, ReportTab, ReportView};
pub use window::{AggregationWindow, MILLIS_PER_DAY};
