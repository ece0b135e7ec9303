//! Storage layer for vozhatiy.
//!
//! This module provides `SQLite`-based persistent storage for children, events,
//! attendance marks, achievements and notes, and implements [`RecordSource`]
//! on top of it for the reporting pipeline.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::records::{
    now_millis, Achievement, AchievementTally, AttendanceRecord, ChildRecord, EventRecord,
    EventStatus, NewChild, NewEvent, NewNote, Note,
};
use crate::source::RecordSource;

/// Storage engine for the counselor's journal.
///
/// Wraps a single `SQLite` connection behind a mutex. Cloning is cheap and
/// shares the connection, so statements from every clone are serialized.
#[derive(Debug, Clone)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Arc<Mutex<Connection>>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection mutex poisoned"))
    }

    /// Run a synchronous storage call on tokio's blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || op(&storage))
            .await
            .map_err(|err| Error::internal(format!("storage task failed: {err}")))?
    }

    // === Children ===

    /// Register a child and return the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the database operation fails.
    pub fn insert_child(&self, child: &NewChild) -> Result<ChildRecord> {
        child.validate()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO children (name, squad, age) VALUES (?1, ?2, ?3)",
            params![child.name.trim(), child.squad.trim(), child.age],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Inserted child with id {}", id);
        Ok(ChildRecord {
            id,
            name: child.name.trim().to_string(),
            squad: child.squad.trim().to_string(),
            age: child.age,
        })
    }

    /// Get a child by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_child(&self, id: i64) -> Result<Option<ChildRecord>> {
        let conn = self.conn()?;
        let child = conn
            .query_row(
                "SELECT id, name, squad, age FROM children WHERE id = ?1",
                [id],
                Self::row_to_child,
            )
            .optional()?;
        Ok(child)
    }

    /// All children, ordered by squad then name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_children(&self) -> Result<Vec<ChildRecord>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, squad, age FROM children ORDER BY squad, name, id")?;
        let children = stmt
            .query_map([], Self::row_to_child)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(children)
    }

    /// Delete a child together with their marks and achievements.
    ///
    /// Returns `true` if a child was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_child(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()?
            .execute("DELETE FROM children WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    // === Events ===

    /// Schedule an event and return the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the database operation fails.
    pub fn insert_event(&self, event: &NewEvent) -> Result<EventRecord> {
        event.validate()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO events (title, starts_at, ends_at, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                event.title.trim(),
                event.starts_at,
                event.ends_at,
                event.status.to_string()
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Inserted event with id {}", id);
        Ok(EventRecord {
            id,
            title: event.title.trim().to_string(),
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            status: event.status,
        })
    }

    /// Get an event by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_event(&self, id: i64) -> Result<Option<EventRecord>> {
        let conn = self.conn()?;
        let event = conn
            .query_row(
                "SELECT id, title, starts_at, ends_at, status FROM events WHERE id = ?1",
                [id],
                Self::row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    /// Events starting within `[start, end]`, in schedule order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn events_in_range(&self, start: i64, end: i64) -> Result<Vec<EventRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, title, starts_at, ends_at, status
            FROM events WHERE starts_at >= ?1 AND starts_at <= ?2
            ORDER BY starts_at, id
            ",
        )?;
        let events = stmt
            .query_map(params![start, end], Self::row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// Change an event's lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the event does not exist.
    pub fn set_event_status(&self, id: i64, status: EventStatus) -> Result<()> {
        let affected = self.conn()?.execute(
            "UPDATE events SET status = ?1 WHERE id = ?2",
            params![status.to_string(), id],
        )?;
        if affected == 0 {
            return Err(Error::not_found("event", id));
        }
        Ok(())
    }

    /// Delete an event together with its marks.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_event(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()?
            .execute("DELETE FROM events WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    // === Attendance ===

    /// Record whether a child attended an event.
    ///
    /// Marking the same pair again replaces the previous mark.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the child or event does not exist.
    pub fn mark_attendance(
        &self,
        child_id: i64,
        event_id: i64,
        present: bool,
        note: Option<&str>,
    ) -> Result<AttendanceRecord> {
        if self.get_child(child_id)?.is_none() {
            return Err(Error::not_found("child", child_id));
        }
        if self.get_event(event_id)?.is_none() {
            return Err(Error::not_found("event", event_id));
        }

        let recorded_at = now_millis();
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        self.conn()?.execute(
            r"
            INSERT INTO attendance (child_id, event_id, present, note, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (child_id, event_id) DO UPDATE SET
                present = excluded.present,
                note = excluded.note,
                recorded_at = excluded.recorded_at
            ",
            params![child_id, event_id, present, note, recorded_at],
        )?;
        debug!(child_id, event_id, present, "Marked attendance");

        Ok(AttendanceRecord {
            child_id,
            event_id,
            present,
            note: note.map(ToString::to_string),
            recorded_at,
        })
    }

    /// Marks recorded for one event, in recording order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn attendance_for_event(&self, event_id: i64) -> Result<Vec<AttendanceRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT child_id, event_id, present, note, recorded_at
            FROM attendance WHERE event_id = ?1 ORDER BY id
            ",
        )?;
        let records = stmt
            .query_map([event_id], Self::row_to_attendance)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Marks recorded for one child, in recording order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn attendance_for_child(&self, child_id: i64) -> Result<Vec<AttendanceRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT child_id, event_id, present, note, recorded_at
            FROM attendance WHERE child_id = ?1 ORDER BY id
            ",
        )?;
        let records = stmt
            .query_map([child_id], Self::row_to_attendance)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    // === Achievements ===

    /// Award points to a child.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the child does not exist, or
    /// [`Error::InvalidRecord`] for a blank title.
    pub fn award_achievement(&self, child_id: i64, title: &str, points: i64) -> Result<Achievement> {
        if title.trim().is_empty() {
            return Err(Error::invalid_record(
                "achievement",
                "title must not be empty",
            ));
        }
        if self.get_child(child_id)?.is_none() {
            return Err(Error::not_found("child", child_id));
        }

        let awarded_at = now_millis();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO achievements (child_id, title, points, awarded_at) VALUES (?1, ?2, ?3, ?4)",
            params![child_id, title.trim(), points, awarded_at],
        )?;
        let id = conn.last_insert_rowid();
        debug!(child_id, points, "Awarded achievement {}", id);

        Ok(Achievement {
            id,
            child_id,
            title: title.trim().to_string(),
            points,
            awarded_at,
        })
    }

    /// Awards given to one child, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn achievements_for_child(&self, child_id: i64) -> Result<Vec<Achievement>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, child_id, title, points, awarded_at
            FROM achievements WHERE child_id = ?1
            ORDER BY awarded_at DESC, id DESC
            ",
        )?;
        let achievements = stmt
            .query_map([child_id], |row| {
                Ok(Achievement {
                    id: row.get(0)?,
                    child_id: row.get(1)?,
                    title: row.get(2)?,
                    points: row.get(3)?,
                    awarded_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(achievements)
    }

    /// Point totals per child, highest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn achievement_tallies(&self) -> Result<Vec<AchievementTally>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT child_id, SUM(points) AS total
            FROM achievements GROUP BY child_id
            ORDER BY total DESC, child_id
            ",
        )?;
        let tallies = stmt
            .query_map([], |row| {
                Ok(AchievementTally {
                    child_id: row.get(0)?,
                    total_points: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tallies)
    }

    // === Notes ===

    /// Write a note and return the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the database operation fails.
    pub fn insert_note(&self, note: &NewNote) -> Result<Note> {
        note.validate()?;
        let created_at = now_millis();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO notes (title, body, created_at, remind_at) VALUES (?1, ?2, ?3, ?4)",
            params![note.title.trim(), note.body, created_at, note.remind_at],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Inserted note with id {}", id);
        Ok(Note {
            id,
            title: note.title.trim().to_string(),
            body: note.body.clone(),
            created_at,
            remind_at: note.remind_at,
        })
    }

    /// All notes, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_notes(&self) -> Result<Vec<Note>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, title, body, created_at, remind_at
            FROM notes ORDER BY created_at DESC, id DESC
            ",
        )?;
        let notes = stmt
            .query_map([], Self::row_to_note)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    /// Notes whose reminder fires at or before `until`, earliest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn reminders_until(&self, until: i64) -> Result<Vec<Note>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, title, body, created_at, remind_at
            FROM notes WHERE remind_at IS NOT NULL AND remind_at <= ?1
            ORDER BY remind_at, id
            ",
        )?;
        let notes = stmt
            .query_map([until], Self::row_to_note)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    /// Delete a note by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_note(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()?
            .execute("DELETE FROM notes WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    // === Stats ===

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<i64> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
            Ok(n)
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            children: count("children")?,
            events: count("events")?,
            attendance_records: count("attendance")?,
            achievements: count("achievements")?,
            notes: count("notes")?,
            db_size_bytes,
        })
    }

    fn row_to_child(row: &rusqlite::Row) -> rusqlite::Result<ChildRecord> {
        Ok(ChildRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            squad: row.get(2)?,
            age: row.get(3)?,
        })
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<EventRecord> {
        let status_str: String = row.get(4)?;
        let status = status_str.parse().unwrap_or_else(|_| {
            warn!("Unknown event status: {}, defaulting to draft", status_str);
            EventStatus::Draft
        });

        Ok(EventRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            starts_at: row.get(2)?,
            ends_at: row.get(3)?,
            status,
        })
    }

    fn row_to_attendance(row: &rusqlite::Row) -> rusqlite::Result<AttendanceRecord> {
        Ok(AttendanceRecord {
            child_id: row.get(0)?,
            event_id: row.get(1)?,
            present: row.get(2)?,
            note: row.get(3)?,
            recorded_at: row.get(4)?,
        })
    }

    fn row_to_note(row: &rusqlite::Row) -> rusqlite::Result<Note> {
        Ok(Note {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            created_at: row.get(3)?,
            remind_at: row.get(4)?,
        })
    }
}

#[async_trait]
impl RecordSource for Storage {
    async fn fetch_all_children(&self) -> Result<Vec<ChildRecord>> {
        self.blocking(Self::list_children).await
    }

    async fn fetch_events_in_range(&self, start: i64, end: i64) -> Result<Vec<EventRecord>> {
        self.blocking(move |storage| storage.events_in_range(start, end))
            .await
    }

    async fn fetch_attendance_for_event(&self, event_id: i64) -> Result<Vec<AttendanceRecord>> {
        self.blocking(move |storage| storage.attendance_for_event(event_id))
            .await
    }

    async fn fetch_achievement_tallies(&self) -> Result<Vec<AchievementTally>> {
        self.blocking(Self::achievement_tallies).await
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    /// Registered children.
    pub children: i64,
    /// Scheduled events.
    pub events: i64,
    /// Attendance marks.
    pub attendance_records: i64,
    /// Awards given.
    pub achievements: i64,
    /// Notes and reminders.
    pub notes: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
