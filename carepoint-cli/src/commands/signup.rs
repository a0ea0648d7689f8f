//! Signup command - register a staff account in the active auth mode

use anyhow::Result;
use carepoint_core::domain::SignUpRequest;
use carepoint_core::{OperationResult, Role};

use super::{get_context, get_logger, log_event, print_envelope, secret_or_prompt, session_event, value_or_prompt};
use crate::output;

pub struct SignupArgs {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub specialization: Option<String>,
    pub department: Option<String>,
    pub json: bool,
}

pub fn run(args: SignupArgs) -> Result<()> {
    let logger = get_logger();
    let mut ctx = get_context()?;

    let name = value_or_prompt(args.name, "Full name", "--name")?;
    let email = value_or_prompt(args.email, "Email", "--email")?;
    let password = secret_or_prompt(args.password, "Password", "--password")?;
    let role: Role = value_or_prompt(args.role, "Role", "--role")?.parse()?;

    let request = SignUpRequest {
        email,
        password,
        name,
        role,
        specialization: args.specialization,
        department: args.department,
    };

    let result = ctx.auth.sign_up(&request);
    match &result {
        Ok(user) => log_event(&logger, session_event(&ctx, "sign_up").with_role(user.role)),
        Err(e) => log_event(
            &logger,
            session_event(&ctx, "sign_up_failed")
                .with_role(role)
                .with_error(e.to_string()),
        ),
    }

    if args.json {
        let envelope: OperationResult<_> = result.into();
        return print_envelope(&envelope);
    }

    let user = result?;
    output::success(&format!("Created account for {} ({})", user.name, user.role.label()));
    println!("  Id:    {}", user.id);
    println!("  Email: {}", user.email);
    Ok(())
}
