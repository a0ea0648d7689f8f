//! Accounts command - list the demo credentials local mode accepts

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use carepoint_core::adapters::demo_accounts::DEMO_ACCOUNTS;

pub fn run(json: bool) -> Result<()> {
    if json {
        let accounts: Vec<_> = DEMO_ACCOUNTS
            .iter()
            .map(|a| {
                serde_json::json!({
                    "email": a.email,
                    "password": a.password,
                    "name": a.name,
                    "role": a.role,
                    "department": a.department,
                    "specialization": a.specialization,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    println!("{}", "Demo Accounts".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Role", "Name", "Email", "Password", "Department"]);

    for account in DEMO_ACCOUNTS {
        table.add_row(vec![
            account.role.label(),
            account.name,
            account.email,
            account.password,
            account.department.unwrap_or("-"),
        ]);
    }

    println!("{}", table);
    println!();
    println!("Sign in with {}", "cpt login --email <email>".cyan());
    Ok(())
}
