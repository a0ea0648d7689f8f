//! Whoami command - show the signed-in user

use anyhow::Result;
use colored::Colorize;
use carepoint_core::{OperationResult, User};

use super::{get_context, print_envelope};

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let auth_type = ctx.auth.auth_type();

    if json {
        let envelope = match ctx.auth.current_user() {
            Some(user) => OperationResult::ok(user.clone()),
            None => OperationResult::<User>::fail("No user logged in"),
        };
        return print_envelope(&envelope.with_context("authType", serde_json::json!(auth_type)));
    }

    match ctx.auth.current_user() {
        Some(user) => {
            println!("{} <{}>", user.name.bold(), user.email);
            println!("  Role: {}", user.role.label());
            println!("  Mode: {}", auth_type.to_string().cyan());
        }
        None => {
            println!("Not signed in ({} mode)", auth_type);
            println!("Run {} to sign in", "cpt login".cyan());
        }
    }
    Ok(())
}
