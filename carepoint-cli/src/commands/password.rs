//! Password commands - only the Firebase mode supports these

use anyhow::Result;
use clap::Subcommand;
use carepoint_core::OperationResult;

use super::{get_context, get_logger, log_event, print_envelope, secret_or_prompt, session_event, value_or_prompt};
use crate::output;

#[derive(Subcommand)]
pub enum PasswordCommands {
    /// Send a password reset email
    Reset {
        /// Account email (defaults to the signed-in user)
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the signed-in user's password
    Change {
        /// New password
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: PasswordCommands) -> Result<()> {
    let logger = get_logger();
    let mut ctx = get_context()?;

    match command {
        PasswordCommands::Reset { email, json } => {
            let email = email.or_else(|| ctx.auth.current_user().map(|u| u.email.clone()));
            let email = value_or_prompt(email, "Email", "--email")?;

            let result = ctx.auth.reset_password(&email);
            let event = session_event(&ctx, "password_reset");
            log_event(&logger, match &result {
                Ok(()) => event,
                Err(e) => event.with_error(e.to_string()),
            });

            if json {
                let envelope: OperationResult<_> = result.into();
                return print_envelope(&envelope);
            }
            result?;
            output::success(&format!("Password reset email sent to {}", email));
        }
        PasswordCommands::Change { password, json } => {
            let password = secret_or_prompt(password, "New password", "--password")?;

            let result = ctx.auth.update_password(&password);
            let event = session_event(&ctx, "password_updated");
            log_event(&logger, match &result {
                Ok(()) => event,
                Err(e) => event.with_error(e.to_string()),
            });

            if json {
                let envelope: OperationResult<_> = result.into();
                return print_envelope(&envelope);
            }
            result?;
            output::success("Password updated");
        }
    }

    Ok(())
}
