//! Auth command - inspect and switch the active auth mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use carepoint_core::services::ProviderDiagnostics;
use carepoint_core::{AuthType, OperationResult};

use super::{get_context, get_logger, log_event, print_envelope, session_event};
use crate::output;

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Show the active mode and both providers
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Switch the auth mode (local or firebase)
    Use {
        /// Target mode
        mode: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn provider_row(diag: &ProviderDiagnostics) -> Vec<Cell> {
    let availability = if diag.available {
        Cell::new("available").fg(Color::Green)
    } else {
        Cell::new("not configured").fg(Color::Yellow)
    };
    let session = match (&diag.user_id, &diag.role) {
        (Some(id), Some(role)) => format!("{} ({})", id, role),
        (Some(id), None) => id.clone(),
        _ => "-".to_string(),
    };
    vec![
        Cell::new(diag.auth_type.as_str()),
        if diag.active { Cell::new("*").fg(Color::Green) } else { Cell::new("") },
        availability,
        Cell::new(session),
        match &diag.last_error {
            Some(e) => Cell::new(e).fg(Color::Red),
            None => Cell::new(""),
        },
    ]
}

pub fn run(command: AuthCommands) -> Result<()> {
    let logger = get_logger();
    let mut ctx = get_context()?;

    match command {
        AuthCommands::Status { json } => {
            let diagnostics = ctx.auth.diagnostics();
            let seen = ctx.auth.has_seen_auth_config().unwrap_or(false);

            if json {
                let envelope = OperationResult::ok(diagnostics)
                    .with_context("hasSeenAuthConfig", serde_json::json!(seen));
                return print_envelope(&envelope);
            }

            println!("{}", "Authentication".bold());
            println!("  Mode:   {}", diagnostics.auth_type.to_string().cyan());
            println!("  Source: {:?}", diagnostics.source);
            println!();

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Provider", "Active", "Status", "Session", "Last error"]);
            table.add_row(provider_row(&diagnostics.local));
            table.add_row(provider_row(&diagnostics.firebase));
            println!("{}", table);

            if !seen {
                println!();
                output::info("Choose a mode with `cpt auth use local` or `cpt auth use firebase`");
            }
        }
        AuthCommands::Use { mode, json } => {
            let target: AuthType = mode.parse()?;
            let from = ctx.auth.auth_type();

            let result = ctx.auth.switch_auth_type(target);
            if result.is_ok() {
                let _ = ctx.auth.mark_auth_config_seen();
            }
            let event = session_event(&ctx, "auth_type_switched").with_command("auth use");
            log_event(&logger, match &result {
                Ok(_) => event,
                Err(e) => event.with_error(e.to_string()),
            });

            if json {
                let envelope: OperationResult<_> = result
                    .map(|changed| serde_json::json!({ "authType": target, "changed": changed }))
                    .into();
                return print_envelope(&envelope);
            }

            if result? {
                output::success(&format!("Switched from {} to {} mode", from, target));
                output::warning("Signed out of the previous mode; sign in again with `cpt login`");
            } else {
                output::info(&format!("Already using {} mode", target));
            }
        }
    }

    Ok(())
}
