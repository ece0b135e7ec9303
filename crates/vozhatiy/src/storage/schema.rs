//! `SQLite` schema definitions for vozhatiy.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the children table.
pub const CREATE_CHILDREN_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS children (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    squad TEXT NOT NULL,
    age INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the events table.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    starts_at INTEGER NOT NULL,
    ends_at INTEGER NOT NULL,
    status TEXT NOT NULL
)
";

/// SQL statement to create the attendance table.
///
/// One mark per (child, event).
pub const CREATE_ATTENDANCE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS attendance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    child_id INTEGER NOT NULL REFERENCES children(id) ON DELETE CASCADE,
    event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    present INTEGER NOT NULL,
    note TEXT,
    recorded_at INTEGER NOT NULL,
    UNIQUE (child_id, event_id)
)
";

/// SQL statement to create the achievements table.
pub const CREATE_ACHIEVEMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS achievements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    child_id INTEGER NOT NULL REFERENCES children(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    points INTEGER NOT NULL,
    awarded_at INTEGER NOT NULL
)
";

/// SQL statement to create the notes table.
pub const CREATE_NOTES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    remind_at INTEGER
)
";

/// SQL statement to create an index on event start for range queries.
pub const CREATE_EVENTS_START_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_events_starts_at ON events(starts_at)
";

/// SQL statement to create an index on `event_id` for per-event attendance.
pub const CREATE_ATTENDANCE_EVENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_attendance_event ON attendance(event_id)
";

/// SQL statement to create an index on `child_id` for tallies.
pub const CREATE_ACHIEVEMENTS_CHILD_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_achievements_child ON achievements(child_id)
";

/// SQL statement to create an index on `remind_at` for reminder lookups.
pub const CREATE_NOTES_REMIND_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_notes_remind_at ON notes(remind_at)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_CHILDREN_TABLE,
    CREATE_EVENTS_TABLE,
    CREATE_ATTENDANCE_TABLE,
    CREATE_ACHIEVEMENTS_TABLE,
    CREATE_NOTES_TABLE,
    CREATE_EVENTS_START_INDEX,
    CREATE_ATTENDANCE_EVENT_INDEX,
    CREATE_ACHIEVEMENTS_CHILD_INDEX,
    CREATE_NOTES_REMIND_INDEX,
    CREATE_METADATA_TABLE,
];
