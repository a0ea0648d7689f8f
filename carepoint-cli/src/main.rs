//! CarePoint CLI - clinic sessions and plan limits in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use carepoint_core::LogEvent;

mod commands;
mod output;

use commands::{accounts, auth, billing, check, health, limits, login, logs, password, profile, signup, whoami};

/// CarePoint - clinic sessions and plan limits in your terminal
#[derive(Parser)]
#[command(name = "cpt", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with the active auth mode
    Login {
        /// Account email
        #[arg(long)]
        email: Option<String>,
        /// Account password
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out of the active auth mode
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a staff account
    Signup {
        /// Account email
        #[arg(long)]
        email: Option<String>,
        /// Account password (at least 6 characters)
        #[arg(long)]
        password: Option<String>,
        /// Full name
        #[arg(long)]
        name: Option<String>,
        /// Role tag (admin, doctor, nurse, lab_tech, ...)
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        specialization: Option<String>,
        #[arg(long)]
        department: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the signed-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or edit the signed-in user's profile
    Profile {
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New specialization
        #[arg(long)]
        specialization: Option<String>,
        /// New department
        #[arg(long)]
        department: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reset or change a password (Firebase mode)
    Password {
        #[command(subcommand)]
        command: password::PasswordCommands,
    },

    /// List the demo accounts for local mode
    Accounts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or switch the auth mode
    Auth {
        #[command(subcommand)]
        command: auth::AuthCommands,
    },

    /// Show plan limits and usage for the clinic
    Limits {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether an action is allowed by the plan
    Check {
        #[command(subcommand)]
        command: check::CheckCommands,
    },

    /// Show trial status
    Trial {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List subscription plans
    Plans {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the clinic's subscription
    Billing {
        #[command(subcommand)]
        command: billing::BillingCommands,
    },

    /// Run connectivity checks
    Health {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Login { .. } => "login",
            Commands::Logout { .. } => "logout",
            Commands::Signup { .. } => "signup",
            Commands::Whoami { .. } => "whoami",
            Commands::Profile { .. } => "profile",
            Commands::Password { .. } => "password",
            Commands::Accounts { .. } => "accounts",
            Commands::Auth { .. } => "auth",
            Commands::Limits { .. } => "limits",
            Commands::Check { .. } => "check",
            Commands::Trial { .. } => "trial",
            Commands::Plans { .. } => "plans",
            Commands::Billing { .. } => "billing",
            Commands::Health { .. } => "health",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let name = cli.command.name();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let logger = commands::get_logger();
            commands::log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(name)
                    .with_error(e.to_string())
                    .with_error_details(format!("{:#}", e)),
            );
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login { email, password, json } => login::run(email, password, json),
        Commands::Logout { json } => login::run_logout(json),
        Commands::Signup { email, password, name, role, specialization, department, json } => {
            signup::run(signup::SignupArgs { email, password, name, role, specialization, department, json })
        }
        Commands::Whoami { json } => whoami::run(json),
        Commands::Profile { name, specialization, department, json } => {
            profile::run(name, specialization, department, json)
        }
        Commands::Password { command } => password::run(command),
        Commands::Accounts { json } => accounts::run(json),
        Commands::Auth { command } => auth::run(command),
        Commands::Limits { json } => limits::run(json),
        Commands::Check { command } => check::run(command),
        Commands::Trial { json } => limits::run_trial(json),
        Commands::Plans { json } => billing::run_plans(json),
        Commands::Billing { command } => billing::run(command),
        Commands::Health { json } => health::run(json),
        Commands::Logs { command } => logs::run(command),
    }
}
