//! Logs command - view and manage application logs

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use dialoguer::Confirm;

use super::get_carepoint_dir;
use carepoint_core::services::logging::now_ms;
use carepoint_core::services::{LogEntry, LogFilter};
use carepoint_core::{AuthType, EntryPoint, LoggingService, Role};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Only entries for this clinic id
        #[arg(long)]
        clinic: Option<String>,
        /// Only entries recorded for this role (e.g. nurse, lab_tech)
        #[arg(long)]
        role: Option<Role>,
        /// Only entries recorded in this auth mode (local or firebase)
        #[arg(long)]
        auth_type: Option<AuthType>,
        /// Only entries with this event name
        #[arg(long)]
        event: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics, activity per clinic and role, and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_logging_service() -> Result<LoggingService> {
    let carepoint_dir = get_carepoint_dir();
    std::fs::create_dir_all(&carepoint_dir)?;
    LoggingService::new(&carepoint_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    use chrono::{TimeZone, Utc};
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn entries_table(entries: Vec<LogEntry>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Event", "Mode", "Role", "Clinic", "Command", "Error"]);

    for entry in entries {
        let error = match entry.error_message.as_deref() {
            Some(message) => Cell::new(message).fg(Color::Red),
            None => Cell::new(""),
        };
        table.add_row(vec![
            Cell::new(format_timestamp(entry.timestamp)),
            Cell::new(&entry.event),
            Cell::new(dash(entry.auth_type.as_deref())),
            Cell::new(dash(entry.role.as_deref())),
            Cell::new(dash(entry.clinic_id.as_deref())),
            Cell::new(dash(entry.command.as_deref())),
            error,
        ]);
    }
    table
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::List {
            limit,
            errors,
            clinic,
            role,
            auth_type,
            event,
            json,
        } => {
            let filter = LogFilter {
                errors_only: errors,
                event,
                auth_type,
                role,
                clinic_id: clinic,
            };
            let entries = service.query(&filter, limit)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            println!("{}", entries_table(entries));

            // Failures in the same slice, unless the listing already shows only those
            if !errors {
                let recent_errors = service.query(&LogFilter { errors_only: true, ..filter }, 5)?;
                if !recent_errors.is_empty() {
                    println!();
                    println!("{}", "Recent Errors:".red().bold());
                    for err in recent_errors.iter().take(3) {
                        println!(
                            "  {} [{}] {}: {}",
                            format_timestamp(err.timestamp).dimmed(),
                            dash(err.clinic_id.as_deref()),
                            err.event,
                            err.error_message.as_deref().unwrap_or("Unknown error")
                        );
                    }
                }
            }
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let cutoff_ms = now_ms() - (older_than_days as i64 * DAY_MS);

            if !force && !json {
                if !Confirm::new()
                    .with_prompt(format!("Delete logs older than {} days?", older_than_days))
                    .default(false)
                    .interact()?
                {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = service.delete_before(cutoff_ms)?;

            if json {
                println!("{}", serde_json::json!({"deleted": deleted}));
            } else {
                println!("Deleted {} log entries", deleted);
            }
        }
        LogsCommands::Stats { json } => {
            let total = service.count()?;
            let errors = service.query(&LogFilter::errors(), 1000)?.len();
            let events = service.event_counts()?;
            let contexts = service.context_counts()?;
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "total_entries": total,
                        "error_count": errors,
                        "events": events,
                        "by_clinic_and_role": contexts,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes
                    })
                );
                return Ok(());
            }

            println!("{}", "Log Statistics".bold());
            println!("  Total entries: {}", total);
            println!("  Errors: {}", errors);
            println!("  Database: {}", db_path.display());
            println!("  Size: {} bytes", size_bytes);

            if !contexts.is_empty() {
                println!();
                println!("{}", "Activity by clinic and role".bold());
                let mut table = Table::new();
                table.set_content_arrangement(ContentArrangement::Dynamic);
                table.set_header(vec!["Clinic", "Role", "Entries", "Errors"]);
                for c in &contexts {
                    let role = c
                        .role
                        .as_deref()
                        .and_then(|tag| tag.parse::<Role>().ok())
                        .map(|r| r.label().to_string())
                        .unwrap_or_else(|| "signed out".to_string());
                    let errors = if c.errors > 0 {
                        Cell::new(c.errors).fg(Color::Red)
                    } else {
                        Cell::new(c.errors)
                    };
                    table.add_row(vec![Cell::new(&c.clinic_id), Cell::new(role), Cell::new(c.count), errors]);
                }
                println!("{}", table);
            }

            if !events.is_empty() {
                println!();
                let mut table = Table::new();
                table.set_content_arrangement(ContentArrangement::Dynamic);
                table.set_header(vec!["Event", "Count"]);
                for e in &events {
                    table.add_row(vec![e.event.clone(), e.count.to_string()]);
                }
                println!("{}", table);
            }
        }
    }

    Ok(())
}
