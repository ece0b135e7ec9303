//! Core record types for vozhatiy.
//!
//! These are the persisted entities a counselor works with: children, events,
//! attendance marks, achievements and notes. All timestamps are milliseconds
//! since the Unix epoch (UTC).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a camp event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Planned but not yet announced.
    #[default]
    Draft,
    /// Announced or in progress.
    Active,
    /// Finished.
    Completed,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for EventStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(crate::Error::invalid_record(
                "event",
                format!("unknown status '{other}'"),
            )),
        }
    }
}

/// A child in the counselor's care.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRecord {
    /// Identifier assigned by storage.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Squad (group) label.
    pub squad: String,
    /// Age in years.
    pub age: u32,
}

/// A scheduled camp event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Identifier assigned by storage.
    pub id: i64,
    /// Event title.
    pub title: String,
    /// Scheduled start in milliseconds.
    pub starts_at: i64,
    /// Scheduled end in milliseconds.
    pub ends_at: i64,
    /// Lifecycle state.
    pub status: EventStatus,
}

impl EventRecord {
    /// Scheduled start as a UTC datetime.
    #[must_use]
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.starts_at)
    }
}

/// Presence of one child at one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// The child this mark belongs to.
    pub child_id: i64,
    /// The event this mark belongs to.
    pub event_id: i64,
    /// Whether the child was present.
    pub present: bool,
    /// Optional free-text note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the mark was recorded, in milliseconds.
    pub recorded_at: i64,
}

/// A single award given to a child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    /// Identifier assigned by storage.
    pub id: i64,
    /// The awarded child.
    pub child_id: i64,
    /// What the award was for.
    pub title: String,
    /// Points granted.
    pub points: i64,
    /// When the award was given, in milliseconds.
    pub awarded_at: i64,
}

/// Accumulated achievement points for one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementTally {
    /// The child.
    pub child_id: i64,
    /// Sum of all awarded points.
    pub total_points: i64,
}

/// A free-form note, optionally acting as a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Identifier assigned by storage.
    pub id: i64,
    /// Short title.
    pub title: String,
    /// Note body.
    pub body: String,
    /// Creation time in milliseconds.
    pub created_at: i64,
    /// Trigger time in milliseconds, if this note is a reminder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remind_at: Option<i64>,
}

impl Note {
    /// Whether this note carries a trigger time.
    #[must_use]
    pub fn is_reminder(&self) -> bool {
        self.remind_at.is_some()
    }
}

/// Fields needed to register a child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChild {
    /// Display name.
    pub name: String,
    /// Squad label.
    pub squad: String,
    /// Age in years.
    pub age: u32,
}

impl NewChild {
    /// Check the fields before they are written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRecord`] for blank names or squads.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::invalid_record("child", "name must not be empty"));
        }
        if self.squad.trim().is_empty() {
            return Err(crate::Error::invalid_record("child", "squad must not be empty"));
        }
        Ok(())
    }
}

/// Fields needed to schedule an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Event title.
    pub title: String,
    /// Scheduled start in milliseconds.
    pub starts_at: i64,
    /// Scheduled end in milliseconds.
    pub ends_at: i64,
    /// Initial lifecycle state.
    pub status: EventStatus,
}

impl NewEvent {
    /// Check the fields before they are written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRecord`] for a blank title or an end
    /// before the start.
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(crate::Error::invalid_record("event", "title must not be empty"));
        }
        if self.ends_at < self.starts_at {
            return Err(crate::Error::invalid_record(
                "event",
                "end must not be before start",
            ));
        }
        Ok(())
    }
}

/// Fields needed to write a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    /// Short title.
    pub title: String,
    /// Note body.
    pub body: String,
    /// Optional trigger time in milliseconds.
    pub remind_at: Option<i64>,
}

impl NewNote {
    /// Check the fields before they are written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRecord`] for a blank title.
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(crate::Error::invalid_record("note", "title must not be empty"));
        }
        Ok(())
    }
}

/// Current time in milliseconds since the epoch.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
