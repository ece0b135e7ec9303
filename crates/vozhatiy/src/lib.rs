//! `vozhatiy` - attendance and activity tracking for a children's camp
//!
//! This library keeps children, squads, events, attendance marks,
//! achievements and notes in a local `SQLite` database, and derives attendance
//! statistics (overall, per squad, per event, per child and per day) for a
//! date window.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod analytics;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod records;
pub mod reminders;
pub mod report;
pub mod source;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use records::{
    Achievement, AchievementTally, AttendanceRecord, ChildRecord, EventRecord, EventStatus, Note,
};
pub use report::{ReportController, ReportOutcome};
pub use source::RecordSource;
pub use storage::{Storage, StorageStats};
