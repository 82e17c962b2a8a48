//! SQLite-backed record store.
//!
//! Provides persistent storage for:
//! - Schedules (blocks kept as an ordered JSON array)
//! - Completed session records
//! - Notes and login dates
//! - The per-user active schedule pointer
//! - Key-value store for application state

use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data_dir;
use crate::error::{DatabaseError, Result};
use crate::schedule::{Block, BlockKind, Schedule};

const DATE_FMT: &str = "%Y-%m-%d";

/// Immutable log entry for one finished or skipped block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub schedule_id: String,
    pub block_id: String,
    pub name: String,
    #[serde(default)]
    pub subject: String,
    pub kind: BlockKind,
    pub planned_minutes: u32,
    pub actual_minutes: u32,
    /// Local calendar day at completion.
    pub date: NaiveDate,
    pub completed_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Record for `block` with a fresh id.
    pub fn for_block(
        user_id: &str,
        schedule_id: &str,
        block: &Block,
        actual_minutes: u32,
        date: NaiveDate,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            user_id: user_id.to_string(),
            schedule_id: schedule_id.to_string(),
            block_id: block.id.clone(),
            name: block.name.clone(),
            subject: block.subject.clone(),
            kind: block.kind,
            planned_minutes: block.duration_min,
            actual_minutes,
            date,
            completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub date: NaiveDate,
    /// Local time of day, e.g. "02:15 PM".
    pub time: String,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
}

/// SQLite database for all persisted studyclock records.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/studyclock.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("studyclock.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schedules (
                id          TEXT PRIMARY KEY,
                owner_id    TEXT NOT NULL,
                name        TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                color       TEXT NOT NULL,
                blocks      TEXT NOT NULL DEFAULT '[]',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                schedule_id     TEXT NOT NULL DEFAULT '',
                block_id        TEXT NOT NULL DEFAULT '',
                name            TEXT NOT NULL,
                subject         TEXT NOT NULL DEFAULT '',
                kind            TEXT NOT NULL,
                planned_minutes INTEGER NOT NULL,
                actual_minutes  INTEGER NOT NULL,
                date            TEXT NOT NULL,
                completed_at    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notes (
                id         TEXT PRIMARY KEY,
                user_id    TEXT NOT NULL,
                text       TEXT NOT NULL,
                date       TEXT NOT NULL,
                time       TEXT NOT NULL,
                pinned     INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS logins (
                user_id TEXT NOT NULL,
                date    TEXT NOT NULL,
                PRIMARY KEY (user_id, date)
            );

            CREATE TABLE IF NOT EXISTS active_schedule (
                user_id     TEXT PRIMARY KEY,
                schedule_id TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_schedules_owner ON schedules(owner_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_user_date ON sessions(user_id, date);",
        )?;
        Ok(())
    }

    // === Schedules ===

    pub fn insert_schedule(&self, schedule: &Schedule) -> Result<()> {
        let blocks = serde_json::to_string(&schedule.blocks)?;
        self.conn.execute(
            "INSERT INTO schedules (id, owner_id, name, description, color, blocks, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                schedule.id,
                schedule.owner_id,
                schedule.name,
                schedule.description,
                schedule.color,
                blocks,
                schedule.created_at.to_rfc3339(),
                schedule.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_schedule(&self, id: &str) -> Result<Option<Schedule>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, owner_id, name, description, color, blocks, created_at, updated_at
                 FROM schedules WHERE id = ?1",
                params![id],
                ScheduleRow::from_row,
            )
            .optional()?;
        row.map(ScheduleRow::into_schedule).transpose()
    }

    /// Schedules of one owner in creation order.
    pub fn list_schedules(&self, owner_id: &str) -> Result<Vec<Schedule>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, name, description, color, blocks, created_at, updated_at
             FROM schedules WHERE owner_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![owner_id], ScheduleRow::from_row)?;
        let mut schedules = Vec::new();
        for row in rows {
            schedules.push(row?.into_schedule()?);
        }
        Ok(schedules)
    }

    /// Overwrite a stored schedule. Returns `false` if it does not exist.
    pub fn update_schedule(&self, schedule: &Schedule) -> Result<bool> {
        let blocks = serde_json::to_string(&schedule.blocks)?;
        let changed = self.conn.execute(
            "UPDATE schedules
             SET name = ?2, description = ?3, color = ?4, blocks = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                schedule.id,
                schedule.name,
                schedule.description,
                schedule.color,
                blocks,
                schedule.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_schedule(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM schedules WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // === Active schedule pointer ===

    pub fn active_schedule_id(&self, user_id: &str) -> Result<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT schedule_id FROM active_schedule WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn set_active_schedule_id(&self, user_id: &str, schedule_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO active_schedule (user_id, schedule_id) VALUES (?1, ?2)",
            params![user_id, schedule_id],
        )?;
        Ok(())
    }

    pub fn clear_active_schedule(&self, user_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM active_schedule WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    /// Users whose active pointer names `schedule_id`.
    pub fn users_with_active(&self, schedule_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id FROM active_schedule WHERE schedule_id = ?1")?;
        let rows = stmt.query_map(params![schedule_id], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // === Session records ===

    /// Append a completed session record.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn append_session(&self, record: &SessionRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, schedule_id, block_id, name, subject, kind,
                                   planned_minutes, actual_minutes, date, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id,
                record.user_id,
                record.schedule_id,
                record.block_id,
                record.name,
                record.subject,
                record.kind.as_str(),
                record.planned_minutes,
                record.actual_minutes,
                record.date.format(DATE_FMT).to_string(),
                record.completed_at.to_rfc3339(),
            ],
        )?;
        tracing::debug!(id = %record.id, block = %record.block_id, "session record stored");
        Ok(())
    }

    pub fn sessions_for_user(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        self.query_sessions("WHERE user_id = ?1", params![user_id])
    }

    pub fn sessions_on(&self, user_id: &str, date: NaiveDate) -> Result<Vec<SessionRecord>> {
        self.query_sessions(
            "WHERE user_id = ?1 AND date = ?2",
            params![user_id, date.format(DATE_FMT).to_string()],
        )
    }

    /// Records with `start <= date <= end`.
    pub fn sessions_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SessionRecord>> {
        self.query_sessions(
            "WHERE user_id = ?1 AND date >= ?2 AND date <= ?3",
            params![
                user_id,
                start.format(DATE_FMT).to_string(),
                end.format(DATE_FMT).to_string()
            ],
        )
    }

    fn query_sessions(&self, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<SessionRecord>> {
        let sql = format!(
            "SELECT id, user_id, schedule_id, block_id, name, subject, kind,
                    planned_minutes, actual_minutes, date, completed_at
             FROM sessions {filter} ORDER BY rowid ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok(SessionRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                schedule_id: row.get(2)?,
                block_id: row.get(3)?,
                name: row.get(4)?,
                subject: row.get(5)?,
                kind: row.get(6)?,
                planned_minutes: row.get(7)?,
                actual_minutes: row.get(8)?,
                date: row.get(9)?,
                completed_at: row.get(10)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    // === Notes ===

    pub fn add_note(&self, user_id: &str, text: &str, at: DateTime<Utc>) -> Result<Note> {
        let local = at.with_timezone(&Local);
        let note = Note {
            id: Uuid::new_v4().simple().to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            date: local.date_naive(),
            time: local.format("%I:%M %p").to_string(),
            pinned: false,
            created_at: at,
        };
        self.conn.execute(
            "INSERT INTO notes (id, user_id, text, date, time, pinned, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                note.id,
                note.user_id,
                note.text,
                note.date.format(DATE_FMT).to_string(),
                note.time,
                note.created_at.to_rfc3339(),
            ],
        )?;
        Ok(note)
    }

    /// Notes of a user, pinned first, newest first within each group.
    pub fn list_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, text, date, time, pinned, created_at
             FROM notes WHERE user_id = ?1
             ORDER BY pinned DESC, created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;
        let mut notes = Vec::new();
        for row in rows {
            let (id, user_id, text, date, time, pinned, created_at) = row?;
            notes.push(Note {
                id,
                user_id,
                text,
                date: parse_date("notes", &date)?,
                time,
                pinned,
                created_at: parse_timestamp("notes", &created_at)?,
            });
        }
        Ok(notes)
    }

    pub fn delete_note(&self, id: &str) -> Result<bool> {
        let changed = self.conn.execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Flip the pinned flag. Returns the new value, or `None` for an unknown id.
    pub fn toggle_note_pin(&self, id: &str) -> Result<Option<bool>> {
        let changed = self.conn.execute(
            "UPDATE notes SET pinned = CASE pinned WHEN 0 THEN 1 ELSE 0 END WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        let pinned = self.conn.query_row(
            "SELECT pinned FROM notes WHERE id = ?1",
            params![id],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(Some(pinned))
    }

    // === Login history ===

    /// Record a login day. Returns `true` if the day was new.
    pub fn record_login(&self, user_id: &str, date: NaiveDate) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO logins (user_id, date) VALUES (?1, ?2)",
            params![user_id, date.format(DATE_FMT).to_string()],
        )?;
        Ok(changed > 0)
    }

    pub fn login_dates(&self, user_id: &str) -> Result<Vec<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date FROM logins WHERE user_id = ?1 ORDER BY date ASC")?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
        let mut dates = Vec::new();
        for row in rows {
            dates.push(parse_date("logins", &row?)?);
        }
        Ok(dates)
    }

    // === Key-value ===

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

struct ScheduleRow {
    id: String,
    owner_id: String,
    name: String,
    description: String,
    color: String,
    blocks: String,
    created_at: String,
    updated_at: String,
}

impl ScheduleRow {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            color: row.get(4)?,
            blocks: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_schedule(self) -> Result<Schedule> {
        let blocks: Vec<Block> =
            serde_json::from_str(&self.blocks).map_err(|e| DatabaseError::CorruptRow {
                table: "schedules",
                message: format!("blocks of {}: {e}", self.id),
            })?;
        Ok(Schedule {
            created_at: parse_timestamp("schedules", &self.created_at)?,
            updated_at: parse_timestamp("schedules", &self.updated_at)?,
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            description: self.description,
            color: self.color,
            blocks,
        })
    }
}

struct SessionRow {
    id: String,
    user_id: String,
    schedule_id: String,
    block_id: String,
    name: String,
    subject: String,
    kind: String,
    planned_minutes: u32,
    actual_minutes: u32,
    date: String,
    completed_at: String,
}

impl SessionRow {
    fn into_record(self) -> Result<SessionRecord> {
        let kind = BlockKind::parse(&self.kind).ok_or_else(|| DatabaseError::CorruptRow {
            table: "sessions",
            message: format!("unknown kind '{}'", self.kind),
        })?;
        Ok(SessionRecord {
            date: parse_date("sessions", &self.date)?,
            completed_at: parse_timestamp("sessions", &self.completed_at)?,
            id: self.id,
            user_id: self.user_id,
            schedule_id: self.schedule_id,
            block_id: self.block_id,
            name: self.name,
            subject: self.subject,
            kind,
            planned_minutes: self.planned_minutes,
            actual_minutes: self.actual_minutes,
        })
    }
}

fn parse_date(table: &'static str, s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| DatabaseError::CorruptRow {
        table,
        message: format!("bad date '{s}': {e}"),
    })
}

fn parse_timestamp(table: &'static str, s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            table,
            message: format!("bad timestamp '{s}': {e}"),
        })
}
