//! CLI command implementations

pub mod accounts;
pub mod auth;
pub mod billing;
pub mod check;
pub mod health;
pub mod limits;
pub mod login;
pub mod logs;
pub mod password;
pub mod profile;
pub mod signup;
pub mod whoami;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use dialoguer::{Input, Password};
use carepoint_core::{CarepointContext, EntryPoint, LogEvent, LoggingService, OperationResult};

/// Environment variable overriding the data directory
pub const CAREPOINT_DIR_ENV: &str = "CAREPOINT_DIR";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let carepoint_dir = get_carepoint_dir();
    std::fs::create_dir_all(&carepoint_dir).ok()?;
    LoggingService::new(&carepoint_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Event stamped with the active auth mode, role and clinic
pub fn session_event(ctx: &CarepointContext, event: &str) -> LogEvent {
    let mut log = LogEvent::new(event)
        .with_auth_type(ctx.auth.auth_type())
        .with_clinic(ctx.config.clinic_id.clone());
    if let Some(user) = ctx.auth.current_user() {
        log = log.with_role(user.role);
    }
    log
}

/// Get the carepoint directory from environment or default
pub fn get_carepoint_dir() -> PathBuf {
    match std::env::var(CAREPOINT_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .map(|home| home.join(".carepoint"))
            .unwrap_or_else(|| PathBuf::from(".carepoint")),
    }
}

/// Get or create carepoint context
pub fn get_context() -> Result<CarepointContext> {
    let carepoint_dir = get_carepoint_dir();
    CarepointContext::new(&carepoint_dir).context("Failed to initialize carepoint context")
}

fn is_interactive() -> bool {
    !atty::isnt(atty::Stream::Stdin)
}

/// Use the given value, or prompt for it when stdin is a terminal
pub fn value_or_prompt(value: Option<String>, prompt: &str, flag: &str) -> Result<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    if !is_interactive() {
        bail!("Missing {}. Pass {} when not running interactively", prompt.to_lowercase(), flag);
    }
    Ok(Input::<String>::new().with_prompt(prompt).interact_text()?)
}

/// Like [`value_or_prompt`] but without echoing the input
pub fn secret_or_prompt(value: Option<String>, prompt: &str, flag: &str) -> Result<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    if !is_interactive() {
        bail!("Missing {}. Pass {} when not running interactively", prompt.to_lowercase(), flag);
    }
    Ok(Password::new().with_prompt(prompt).interact()?)
}

/// Print an operation envelope as JSON; failures exit with status 1
pub fn print_envelope<T: serde::Serialize>(envelope: &OperationResult<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    if !envelope.success {
        std::process::exit(1);
    }
    Ok(())
}
