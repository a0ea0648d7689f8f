//! Check command - ask whether an action is allowed under the current plan

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use carepoint_core::{EntitlementCheck, OperationResult};

use super::{get_context, get_logger, log_event, session_event};

#[derive(Subcommand)]
pub enum CheckCommands {
    /// Can another staff user be added
    User {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Can another patient be added
    Patient {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Is a plan feature enabled
    Feature {
        /// Feature key (e.g. reports, telemedicine)
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: CheckCommands) -> Result<()> {
    let logger = get_logger();
    let mut ctx = get_context()?;

    if let Err(e) = ctx.entitlements.load_limits() {
        log_event(&logger, session_event(&ctx, "limits_load_failed").with_error(e.to_string()));
    }

    let (label, check, json) = match command {
        CheckCommands::User { json } => ("Add user".to_string(), ctx.entitlements.can_add_user(), json),
        CheckCommands::Patient { json } => {
            ("Add patient".to_string(), ctx.entitlements.can_add_patient(), json)
        }
        CheckCommands::Feature { name, json } => {
            let check = ctx.entitlements.can_use_feature(&name);
            (format!("Feature '{}'", name), check, json)
        }
    };

    if !check.can_access {
        log_event(
            &logger,
            session_event(&ctx, "entitlement_blocked")
                .with_command("check")
                .with_error(check.reason.clone().unwrap_or_default())
                .with_error_details(label.clone()),
        );
    }

    if json {
        // A blocked check is still a successful answer
        println!("{}", serde_json::to_string_pretty(&OperationResult::ok(check))?);
        return Ok(());
    }

    print_check(&label, &check);
    if !check.can_access {
        std::process::exit(1);
    }
    Ok(())
}

fn print_check(label: &str, check: &EntitlementCheck) {
    if check.can_access {
        println!("{} {}", "✓".green(), label);
        return;
    }
    println!("{} {}", "✗".red(), label);
    if let Some(reason) = &check.reason {
        println!("  {}", reason);
    }
    if check.upgrade_required {
        println!("  {}", "Upgrade with `cpt billing checkout <plan>`".yellow());
    }
}
