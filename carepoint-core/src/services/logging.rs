//! Logging service - structured event logging to DuckDB
//!
//! Events are stored in logs.duckdb next to the session storage. Only
//! categorical context is recorded (auth mode, role tag, clinic id, command);
//! emails, names, passwords and tokens never reach the log.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::domain::{AuthType, Role};
use crate::log_migrations::LOG_MIGRATIONS;

pub const LOG_DB_FILENAME: &str = "logs.duckdb";

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Timestamp in the upper bits, a per-millisecond counter in the lower 16
fn generate_id() -> u64 {
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((now_ms() as u64) << 16) | counter
}

/// Current unix time in milliseconds
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Entry point for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Desktop,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Desktop => "desktop",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            auth_type: None,
            role: None,
            clinic_id: None,
            command: None,
            error_message: None,
            error_details: None,
        }
    }

    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = Some(auth_type.as_str().to_string());
        self
    }

    /// Role tag only, never the person
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role.as_str().to_string());
        self
    }

    pub fn with_clinic(mut self, clinic_id: impl Into<String>) -> Self {
        self.clinic_id = Some(clinic_id.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
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

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub auth_type: Option<String>,
    pub role: Option<String>,
    pub clinic_id: Option<String>,
    pub command: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

/// Number of entries recorded for one event name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCount {
    pub event: String,
    pub count: u64,
}

/// Narrows a log listing; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub errors_only: bool,
    pub event: Option<String>,
    pub auth_type: Option<AuthType>,
    pub role: Option<Role>,
    pub clinic_id: Option<String>,
}

impl LogFilter {
    pub fn errors() -> Self {
        Self {
            errors_only: true,
            ..Self::default()
        }
    }

    /// WHERE clause and its positional parameters
    fn to_sql(&self) -> (String, Vec<String>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        if self.errors_only {
            clauses.push("error_message IS NOT NULL");
        }
        let columns = [
            ("event = ?", self.event.clone()),
            ("auth_type = ?", self.auth_type.map(|t| t.as_str().to_string())),
            ("role = ?", self.role.map(|r| r.as_str().to_string())),
            ("clinic_id = ?", self.clinic_id.clone()),
        ];
        for (clause, value) in columns {
            if let Some(value) = value {
                clauses.push(clause);
                params.push(value);
            }
        }
        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!("WHERE {}", clauses.join(" AND ")), params)
        }
    }
}

/// Activity of one clinic and role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextCount {
    pub clinic_id: String,
    pub role: Option<String>,
    pub count: u64,
    pub errors: u64,
}

const SELECT_ENTRY: &str = r#"
    SELECT id, timestamp, entry_point, app_version, platform,
           event, auth_type, role, clinic_id, command, error_message, error_details
    FROM sys_logs
"#;

fn row_to_entry(row: &duckdb::Row<'_>) -> duckdb::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        entry_point: row.get(2)?,
        app_version: row.get(3)?,
        platform: row.get(4)?,
        event: row.get(5)?,
        auth_type: row.get(6)?,
        role: row.get(7)?,
        clinic_id: row.get(8)?,
        command: row.get(9)?,
        error_message: row.get(10)?,
        error_details: row.get(11)?,
    })
}

/// Service for structured event logging
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open or create logs.duckdb in `data_dir` and run pending migrations
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join(LOG_DB_FILENAME);
        let conn = Connection::open(&db_path)?;

        let service = Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        };

        service.run_migrations()?;

        Ok(service)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !table_exists {
            if let Some((name, sql)) = LOG_MIGRATIONS.iter().find(|(n, _)| *n == "000_migrations.sql")
            {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                    [name],
                )?;
            }
        }

        let mut stmt = conn.prepare("SELECT migration_name FROM sys_migrations")?;
        let applied: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for (name, sql) in LOG_MIGRATIONS.iter() {
            if *name == "000_migrations.sql" || applied.iter().any(|a| a.as_str() == *name) {
                continue;
            }
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                [name],
            )?;
        }

        Ok(())
    }

    /// Record an event; entry point, version and platform are added here
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version, platform, event,
                auth_type, role, clinic_id, command, error_message, error_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.auth_type,
                &event.role,
                &event.clinic_id,
                &event.command,
                &event.error_message,
                &event.error_details,
            ],
        )?;

        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_command(command))
    }

    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let mut log_event = LogEvent::new(event).with_error(message);
        if let Some(d) = details {
            log_event = log_event.with_error_details(d);
        }
        self.log(log_event)
    }

    /// Matching entries, most recent first
    pub fn query(&self, filter: &LogFilter, limit: usize) -> Result<Vec<LogEntry>> {
        let (where_clause, params) = filter.to_sql();
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let mut stmt = conn.prepare(&format!(
            "{} {} ORDER BY timestamp DESC, id DESC LIMIT {}",
            SELECT_ENTRY, where_clause, limit
        ))?;
        let entries = stmt
            .query_map(duckdb::params_from_iter(params), row_to_entry)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    /// Most recent entries first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(&LogFilter::default(), limit)
    }

    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(&LogFilter::errors(), limit)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Entry counts grouped by event name, most frequent first
    pub fn event_counts(&self) -> Result<Vec<EventCount>> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let mut stmt = conn.prepare(
            "SELECT event, COUNT(*) AS n FROM sys_logs GROUP BY event ORDER BY n DESC, event",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok(EventCount {
                    event: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(counts)
    }

    /// Entry and error counts per clinic and role, busiest first
    pub fn context_counts(&self) -> Result<Vec<ContextCount>> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let mut stmt = conn.prepare(
            "SELECT clinic_id, role, COUNT(*) AS n, COUNT(error_message) AS errors
             FROM sys_logs
             WHERE clinic_id IS NOT NULL
             GROUP BY clinic_id, role
             ORDER BY n DESC, clinic_id, role",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok(ContextCount {
                    clinic_id: row.get(0)?,
                    role: row.get(1)?,
                    count: row.get(2)?,
                    errors: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(counts)
    }

    /// Delete logs older than the given unix-ms timestamp
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_logging_service_creation() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();
        assert!(service.db_path().exists());
    }

    #[test]
    fn test_reopen_does_not_rerun_migrations() {
        let dir = tempdir().unwrap();
        {
            let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();
            service.log_event("first").unwrap();
        }
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();
        assert_eq!(service.count().unwrap(), 1);
    }

    #[test]
    fn test_log_with_session_context() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service
            .log(
                LogEvent::new("sign_in")
                    .with_auth_type(AuthType::Local)
                    .with_role(Role::Pharmacist)
                    .with_clinic("clinic-1")
                    .with_command("login"),
            )
            .unwrap();

        let entries = service.get_recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "sign_in");
        assert_eq!(entries[0].auth_type.as_deref(), Some("local"));
        assert_eq!(entries[0].role.as_deref(), Some("pharmacist"));
        assert_eq!(entries[0].clinic_id.as_deref(), Some("clinic-1"));
        assert_eq!(entries[0].entry_point, "cli");
    }

    #[test]
    fn test_log_error() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log_event("sign_out").unwrap();
        service
            .log_error("sign_in_failed", "Invalid login credentials", Some("local"))
            .unwrap();

        let errors = service.get_errors(10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].event, "sign_in_failed");
        assert_eq!(errors[0].error_details.as_deref(), Some("local"));
    }

    #[test]
    fn test_query_filters_by_session_context() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        let event = |clinic: &str, role: Role| {
            LogEvent::new("sign_in")
                .with_auth_type(AuthType::Local)
                .with_role(role)
                .with_clinic(clinic)
        };
        service.log(event("north", Role::Nurse)).unwrap();
        service.log(event("north", Role::Doctor)).unwrap();
        service
            .log(event("south", Role::Nurse).with_error("Invalid login credentials"))
            .unwrap();
        service.log_event("command_failed").unwrap();

        let north = LogFilter {
            clinic_id: Some("north".to_string()),
            ..LogFilter::default()
        };
        assert_eq!(service.query(&north, 10).unwrap().len(), 2);

        let nurses = LogFilter {
            role: Some(Role::Nurse),
            ..LogFilter::default()
        };
        let entries = service.query(&nurses, 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.role.as_deref() == Some("nurse")));

        let failing_nurses = LogFilter {
            errors_only: true,
            ..nurses
        };
        let entries = service.query(&failing_nurses, 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].clinic_id.as_deref(), Some("south"));

        let firebase = LogFilter {
            auth_type: Some(AuthType::Firebase),
            ..LogFilter::default()
        };
        assert!(service.query(&firebase, 10).unwrap().is_empty());
        assert_eq!(service.query(&LogFilter::default(), 2).unwrap().len(), 2);
    }

    #[test]
    fn test_context_counts_group_by_clinic_and_role() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        for _ in 0..2 {
            service
                .log(LogEvent::new("check").with_clinic("north").with_role(Role::Billing))
                .unwrap();
        }
        service
            .log(
                LogEvent::new("check")
                    .with_clinic("north")
                    .with_role(Role::Admin)
                    .with_error("Upgrade required"),
            )
            .unwrap();
        service.log_event("no_clinic").unwrap();

        let counts = service.context_counts().unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].role.as_deref(), Some("billing"));
        assert_eq!((counts[0].count, counts[0].errors), (2, 0));
        assert_eq!(counts[1].role.as_deref(), Some("admin"));
        assert_eq!((counts[1].count, counts[1].errors), (1, 1));
    }

    #[test]
    fn test_counts_and_delete() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log_event("sign_in").unwrap();
        service.log_event("sign_in").unwrap();
        service.log_event("sign_out").unwrap();

        let counts = service.event_counts().unwrap();
        assert_eq!(counts[0].event, "sign_in");
        assert_eq!(counts[0].count, 2);

        let deleted = service.delete_before(now_ms() + 1000).unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(service.count().unwrap(), 0);
    }
}
