//! Health command - storage, billing and remote auth connectivity checks

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use carepoint_core::domain::{CheckResult, CheckStatus};

use super::{get_context, get_logger, log_event, session_event};

fn status_cell(status: CheckStatus) -> Cell {
    match status {
        CheckStatus::Pass => Cell::new("PASS").fg(Color::Green),
        CheckStatus::Warning => Cell::new("WARN").fg(Color::Yellow),
        CheckStatus::Error => Cell::new("ERROR").fg(Color::Red),
    }
}

pub fn run(json: bool) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;
    let health = ctx.health.run_checks()?;
    let overall = health.overall();

    if overall == CheckStatus::Error {
        let failing: Vec<&str> = [&health.storage, &health.billing, &health.remote_auth]
            .iter()
            .filter(|c| c.status == CheckStatus::Error)
            .map(|c| c.message.as_str())
            .collect();
        log_event(&logger, session_event(&ctx, "health_check_failed").with_error(failing.join("; ")));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&health)?);
        if overall == CheckStatus::Error {
            std::process::exit(1);
        }
        return Ok(());
    }

    println!("{}", "Connectivity Check".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Check", "Status", "Message"]);

    let checks: [(&str, &CheckResult); 3] = [
        ("storage", &health.storage),
        (ctx.billing.provider_name(), &health.billing),
        ("remote auth", &health.remote_auth),
    ];
    for (name, check) in checks {
        table.add_row(vec![
            Cell::new(name),
            status_cell(check.status),
            Cell::new(&check.message),
        ]);
    }
    println!("{}", table);
    println!();

    match overall {
        CheckStatus::Pass => println!("{}", "All checks passed".green()),
        CheckStatus::Warning => println!("{}", "Checks passed with warnings".yellow()),
        CheckStatus::Error => {
            println!("{}", "Some checks failed".red());
            std::process::exit(1);
        }
    }
    Ok(())
}
