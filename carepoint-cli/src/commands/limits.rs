//! Limits and trial commands - the clinic's plan limits and usage

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use carepoint_core::domain::limits::UNLIMITED;
use carepoint_core::services::EntitlementService;
use carepoint_core::{OperationResult, TrialStatus, UsageKind};

use super::{get_context, get_logger, log_event, print_envelope, session_event};
use crate::output;

fn format_max(max: i64) -> String {
    if max == UNLIMITED {
        "unlimited".to_string()
    } else {
        max.to_string()
    }
}

fn usage_cell(service: &EntitlementService, kind: UsageKind) -> Cell {
    let pct = service.usage_percentage(kind);
    let text = format!("{:.0}%", pct);
    if service.is_at_limit(kind) {
        Cell::new(text).fg(Color::Red)
    } else if service.is_approaching_limit(kind) {
        Cell::new(text).fg(Color::Yellow)
    } else {
        Cell::new(text).fg(Color::Green)
    }
}

fn print_trial(trial: &TrialStatus) {
    if trial.is_trial_active {
        let msg = format!("Trial active: {} day(s) remaining", trial.days_remaining);
        if trial.days_remaining <= 3 {
            output::warning(&msg);
        } else {
            output::info(&msg);
        }
    } else if trial.is_expired {
        output::error("Trial expired. Choose a plan with `cpt billing checkout <plan>`");
    }
}

pub fn run(json: bool) -> Result<()> {
    let logger = get_logger();
    let mut ctx = get_context()?;

    let result = ctx.entitlements.load_limits().map(|l| l.clone());
    if let Err(e) = &result {
        log_event(&logger, session_event(&ctx, "limits_load_failed").with_error(e.to_string()));
    }

    if json {
        let trial = ctx.entitlements.trial_status();
        let envelope: OperationResult<_> = result.into();
        return print_envelope(&envelope.with_context("trial", serde_json::json!(trial)));
    }

    let limits = result?;
    let service = &ctx.entitlements;

    println!("{}", format!("Plan Limits - {}", service.clinic_id()).bold());
    println!("  Subscription: {}", limits.subscription_status.as_str());
    if !limits.has_access {
        output::error("  Access is suspended for this clinic");
    }
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Resource", "Used", "Limit", "Usage", "Can add"]);
    for kind in [UsageKind::Users, UsageKind::Patients] {
        let (current, max) = limits.counter(kind);
        let check = service.can_add(kind);
        table.add_row(vec![
            Cell::new(kind.as_str()),
            Cell::new(current),
            Cell::new(format_max(max)),
            usage_cell(service, kind),
            if check.can_access {
                Cell::new("yes").fg(Color::Green)
            } else {
                Cell::new("no").fg(Color::Red)
            },
        ]);
    }
    println!("{}", table);

    if !limits.features.is_empty() {
        let mut features: Vec<_> = limits.features.iter().collect();
        features.sort();
        println!();
        println!("{}", "Features".bold());
        for (name, enabled) in features {
            let mark = if *enabled { "✓".green() } else { "✗".red() };
            println!("  {} {}", mark, name);
        }
    }

    println!();
    print_trial(&service.trial_status());
    Ok(())
}

pub fn run_trial(json: bool) -> Result<()> {
    let logger = get_logger();
    let mut ctx = get_context()?;

    if let Err(e) = ctx.entitlements.load_limits() {
        let message = e.to_string();
        log_event(&logger, session_event(&ctx, "limits_load_failed").with_error(message.clone()));
        if !json {
            output::warning(&format!("Could not load limits: {}", message));
        }
    }

    let trial = ctx.entitlements.trial_status();
    if json {
        return print_envelope(&OperationResult::ok(trial));
    }

    if !trial.is_trial_active && !trial.is_expired {
        println!("No trial in progress");
    } else {
        print_trial(&trial);
    }
    Ok(())
}
