//! Logging service - structured event logging to DuckDB
//!
//! Events go to `logs.duckdb` in the data directory. Only operation names,
//! status codes and error messages are stored; credentials, ticket secrets
//! and response bodies never are.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use duckdb::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;
use crate::ports::EventSink;

const LOG_DB_FILE: &str = "logs.duckdb";

/// Who is using the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Library,
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Library => "library",
        })
    }
}

/// Event names emitted by the services
pub mod events {
    pub const REQUEST_FAILED: &str = "request_failed";
    pub const TRANSPORT_FAILED: &str = "transport_failed";
    pub const DECODE_FAILED: &str = "decode_failed";
    pub const COMMAND_EXECUTED: &str = "command_executed";
}

/// Something worth recording, before the service stamps it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            operation: None,
            status_code: None,
            error_message: None,
            error_details: None,
        }
    }

    /// Facade operation or CLI command the event belongs to
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A stored row of `sys_logs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    /// Unix milliseconds
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub operation: Option<String>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

impl LogEntry {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            timestamp: row.get("timestamp")?,
            entry_point: row.get("entry_point")?,
            app_version: row.get("app_version")?,
            platform: row.get("platform")?,
            event: row.get("event")?,
            operation: row.get("operation")?,
            status_code: row.get("status_code")?,
            error_message: row.get("error_message")?,
            error_details: row.get("error_details")?,
        })
    }
}

enum Selection {
    All,
    Errors,
}

impl Selection {
    fn where_clause(&self) -> &'static str {
        match self {
            Selection::All => "",
            Selection::Errors => "WHERE error_message IS NOT NULL",
        }
    }
}

/// Apply embedded migrations not yet listed in `sys_migrations`
fn migrate(conn: &Connection) -> Result<usize> {
    // 000 only creates the tracking table, so it is safe to run every time
    let (bootstrap, rest) = LOG_MIGRATIONS
        .split_first()
        .ok_or_else(|| anyhow!("No log migrations embedded"))?;
    conn.execute_batch(bootstrap.1)?;
    conn.execute(
        "INSERT INTO sys_migrations (migration_name) VALUES (?) ON CONFLICT DO NOTHING",
        [bootstrap.0],
    )?;

    let mut applied = 0;
    for (name, sql) in rest {
        let done: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sys_migrations WHERE migration_name = ?",
            [name],
            |row| row.get(0),
        )?;
        if done {
            continue;
        }
        conn.execute_batch(sql)
            .with_context(|| format!("Log migration {} failed", name))?;
        conn.execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
        applied += 1;
    }
    Ok(applied)
}

/// Structured event log backed by logs.duckdb
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
}

impl LoggingService {
    /// Open or create logs.duckdb in `data_dir` and run pending migrations
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join(LOG_DB_FILE);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;
        migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Log lock poisoned: {}", e))
    }

    /// Stamp and store an event
    pub fn log(&self, event: LogEvent) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO sys_logs (timestamp, entry_point, app_version, platform, event, \
             operation, status_code, error_message, error_details) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                Utc::now().timestamp_millis(),
                self.entry_point.to_string(),
                &self.app_version,
                std::env::consts::OS,
                &event.event,
                &event.operation,
                &event.status_code,
                &event.error_message,
                &event.error_details,
            ],
        )?;
        Ok(())
    }

    /// Note which CLI command ran
    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new(events::COMMAND_EXECUTED).with_operation(command))
    }

    /// Newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.select(Selection::All, limit)
    }

    /// Newest first, only entries carrying an error message
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.select(Selection::Errors, limit)
    }

    fn select(&self, selection: Selection, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM sys_logs {} ORDER BY timestamp DESC, id DESC LIMIT ?",
            selection.where_clause()
        ))?;
        let rows = stmt.query_map([limit as i64], LogEntry::from_row)?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    pub fn count(&self) -> Result<u64> {
        let count = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_errors(&self) -> Result<u64> {
        let count = self.conn()?.query_row(
            "SELECT COUNT(*) FROM sys_logs WHERE error_message IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Drop entries older than `timestamp_ms`; returns how many went
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl EventSink for LoggingService {
    fn record(&self, event: LogEvent) {
        // a broken log must not fail the operation being logged
        let _ = self.log(event);
    }
}
