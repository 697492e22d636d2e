//! Storage layer for the Trackify time accounting engine.
//!
//! Provides persistence for entries, timers, rules, holidays, workspace
//! memberships, leave balances, monthly reports and encashment records
//! using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization.
//!
//! For multi-threaded access, either:
//! - Use a `Mutex<Database>` to serialize access
//! - Create a connection pool (e.g., with `r2d2`)
//! - Use separate `Database` instances per thread
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g.,
//! `2025-01-15T10:30:00.000Z`), calendar dates as `YYYY-MM-DD`. This format
//! is used by `chrono` serialization and ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Human-readable values in the database
//! - Timezone-aware timestamps (always UTC)
//!
//! ## Derived Rows
//!
//! Monthly report rows and encashment settlements are stored as JSON
//! payloads next to their natural keys. They are derived artifacts: a
//! report regeneration fully replaces the payload (upsert), an encashment
//! only ever appends.

mod ledger;
mod migrations;
mod policy;
mod reports;

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;
use trackify_core::{EngineError, ValidationError};

pub use ledger::EntryPatch;
pub use migrations::MigrationStats;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// An engine error surfaced through a storage operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Failed to parse a stored timestamp or date.
    #[error("invalid timestamp for {record_id}: {timestamp}")]
    TimestampParse {
        record_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored record failed to decode or re-encode.
    #[error("invalid stored record {record_id}: {message}")]
    InvalidRecord { record_id: String, message: String },
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        Self::Engine(err.into())
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            -- Entries table: raw time entries, the ledger's source of truth
            -- start_time/end_time: ISO 8601 UTC; end_time NULL while open
            -- duration_seconds: end - start in whole seconds, 0 while open
            CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                workspace_id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                title TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_seconds INTEGER NOT NULL DEFAULT 0,
                is_billable INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_entries_user_ws_start
                ON entries(user_id, workspace_id, start_time);
            CREATE INDEX IF NOT EXISTS idx_entries_start ON entries(start_time);

            -- Per-user timer singleton; is_running is the serialization point
            -- for start/stop races
            CREATE TABLE IF NOT EXISTS timers (
                user_id TEXT PRIMARY KEY,
                workspace_id TEXT NOT NULL,
                is_running INTEGER NOT NULL DEFAULT 0,
                current_entry_id TEXT,
                FOREIGN KEY (current_entry_id) REFERENCES entries(id) ON DELETE SET NULL
            );

            -- Working-hours rules; week_days is a JSON array of lowercase
            -- day names. The newest active row per workspace wins.
            CREATE TABLE IF NOT EXISTS rules (
                id TEXT PRIMARY KEY,
                workspace_id TEXT NOT NULL,
                working_hours_per_day REAL NOT NULL,
                working_days_per_week INTEGER NOT NULL,
                week_days TEXT NOT NULL,
                is_overtime_enabled INTEGER NOT NULL DEFAULT 1,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_rules_workspace ON rules(workspace_id, is_active);

            CREATE TABLE IF NOT EXISTS holidays (
                id TEXT PRIMARY KEY,
                workspace_id TEXT NOT NULL,
                user_id TEXT,
                date TEXT NOT NULL,
                title TEXT NOT NULL,
                kind TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_holidays_workspace_date
                ON holidays(workspace_id, date);

            CREATE TABLE IF NOT EXISTS memberships (
                user_id TEXT NOT NULL,
                workspace_id TEXT NOT NULL,
                role TEXT NOT NULL,
                PRIMARY KEY (user_id, workspace_id)
            );

            CREATE TABLE IF NOT EXISTS leave_balances (
                user_id TEXT NOT NULL,
                workspace_id TEXT NOT NULL,
                leave_type TEXT NOT NULL,
                available_hours REAL NOT NULL,
                PRIMARY KEY (user_id, workspace_id, leave_type)
            );

            -- Derived artifacts: report rows as JSON keyed by natural key
            CREATE TABLE IF NOT EXISTS monthly_reports (
                workspace_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                month INTEGER NOT NULL,
                year INTEGER NOT NULL,
                ideal_monthly_hours REAL NOT NULL,
                row_json TEXT NOT NULL,
                generated_at TEXT NOT NULL,
                PRIMARY KEY (workspace_id, user_id, month, year)
            );

            -- Append-only encashment history
            CREATE TABLE IF NOT EXISTS leave_encashments (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                workspace_id TEXT NOT NULL,
                record_json TEXT NOT NULL,
                encashed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_encashments_user
                ON leave_encashments(user_id, workspace_id);
            ",
        )?;
        Ok(())
    }
}

pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(timestamp: &str, record_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            record_id: record_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

pub(crate) fn parse_date(date: &str, record_id: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|source| DbError::TimestampParse {
        record_id: record_id.to_string(),
        timestamp: date.to_string(),
        source,
    })
}
