//! Login and logout commands

use anyhow::Result;
use colored::Colorize;
use carepoint_core::OperationResult;

use super::{get_context, get_logger, log_event, print_envelope, secret_or_prompt, session_event, value_or_prompt};
use crate::output;

pub fn run(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let logger = get_logger();
    let mut ctx = get_context()?;

    let email = value_or_prompt(email, "Email", "--email")?;
    let password = secret_or_prompt(password, "Password", "--password")?;

    let result = ctx.auth.sign_in(&email, &password);
    match &result {
        Ok(_) => log_event(&logger, session_event(&ctx, "sign_in")),
        Err(e) => log_event(&logger, session_event(&ctx, "sign_in_failed").with_error(e.to_string())),
    }

    if json {
        let envelope: OperationResult<_> = result.into();
        return print_envelope(&envelope.with_context(
            "authType",
            serde_json::json!(ctx.auth.auth_type()),
        ));
    }

    let user = result?;
    output::success(&format!("Signed in as {} ({})", user.name, user.role.label()));
    println!("  Email: {}", user.email);
    println!("  Mode:  {}", ctx.auth.auth_type().to_string().cyan());
    Ok(())
}

pub fn run_logout(json: bool) -> Result<()> {
    let logger = get_logger();
    let mut ctx = get_context()?;

    let was_authenticated = ctx.auth.is_authenticated();
    let event = session_event(&ctx, "sign_out");
    let result = ctx.auth.sign_out();
    match &result {
        Ok(()) => log_event(&logger, event),
        Err(e) => log_event(&logger, event.with_error(e.to_string())),
    }

    if json {
        let envelope: OperationResult<_> = result
            .map(|()| serde_json::json!({ "wasAuthenticated": was_authenticated }))
            .into();
        return print_envelope(&envelope);
    }

    result?;
    if was_authenticated {
        output::success("Signed out");
    } else {
        output::info("No active session");
    }
    Ok(())
}
