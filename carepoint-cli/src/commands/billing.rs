//! Plans and billing commands

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use dialoguer::Confirm;
use carepoint_core::domain::limits::UNLIMITED;
use carepoint_core::domain::BillingInterval;
use carepoint_core::ports::SessionProvider;
use carepoint_core::{CarepointContext, OperationResult};

use super::{get_context, get_logger, log_event, print_envelope, session_event};
use crate::output;

#[derive(Subcommand)]
pub enum BillingCommands {
    /// Show the clinic's subscription, usage and invoices
    Dashboard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remember a plan for a later checkout
    Select {
        /// Plan id (see `cpt plans`)
        plan: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a checkout session
    Checkout {
        /// Plan id; defaults to the selected plan
        plan: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Cancel the clinic's subscription
    Cancel {
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Get a link to update the payment method
    PaymentMethod {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn format_limit(max: i64) -> String {
    if max == UNLIMITED {
        "unlimited".to_string()
    } else {
        max.to_string()
    }
}

fn interval_label(interval: BillingInterval) -> &'static str {
    match interval {
        BillingInterval::Month => "month",
        BillingInterval::Year => "year",
    }
}

/// Billing mutations are reserved for admins and billing staff
fn require_billing_access(ctx: &CarepointContext) -> Result<()> {
    let active = ctx.auth.active();
    if !active.is_authenticated() {
        bail!("Sign in first with `cpt login`");
    }
    if !(active.is_admin() || active.is_billing()) {
        bail!("Only administrators and billing staff can manage the subscription");
    }
    Ok(())
}

pub fn run_plans(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.billing.plans();

    if json {
        let envelope: OperationResult<_> = result.into();
        return print_envelope(&envelope);
    }

    let plans = result?;
    let selected = ctx.billing.selected_plan().unwrap_or(None);

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Plan", "Price", "Users", "Patients", "Features"]);

    for plan in &plans {
        let mut features: Vec<&str> = plan
            .features
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
            .collect();
        features.sort();

        let mut name = plan.name.clone();
        if plan.popular {
            name.push_str(" ★");
        }
        let id_cell = if selected.as_deref() == Some(plan.id.as_str()) {
            Cell::new(format!("{} (selected)", plan.id)).fg(Color::Green)
        } else {
            Cell::new(&plan.id)
        };

        table.add_row(vec![
            id_cell,
            Cell::new(name),
            Cell::new(format!("{:.2} {}/{}", plan.price, plan.currency, interval_label(plan.interval))),
            Cell::new(format_limit(plan.limits.max_users)),
            Cell::new(format_limit(plan.limits.max_patients)),
            Cell::new(features.join(", ")),
        ]);
    }

    println!("{}", table);
    println!("Billing provider: {}", ctx.billing.provider_name().dimmed());
    Ok(())
}

pub fn run(command: BillingCommands) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;

    match command {
        BillingCommands::Dashboard { json } => {
            let result = ctx.billing.dashboard();
            if json {
                let envelope: OperationResult<_> = result.into();
                return print_envelope(&envelope);
            }

            let dashboard = result?;
            println!("{}", format!("Billing - {}", dashboard.clinic_id).bold());
            match &dashboard.plan {
                Some(plan) => println!(
                    "  Plan:   {} ({:.2} {}/{})",
                    plan.name,
                    plan.price,
                    plan.currency,
                    interval_label(plan.interval)
                ),
                None => println!("  Plan:   none"),
            }
            println!("  Status: {}", dashboard.subscription_status.as_str());
            if let Some(ends) = dashboard.trial_ends_at {
                println!("  Trial ends: {}", ends.format("%Y-%m-%d"));
            }
            if let Some(next) = dashboard.next_billing_date {
                println!("  Next billing date: {}", next);
            }
            println!(
                "  Users: {} / {}   Patients: {} / {}",
                dashboard.current_usage.users,
                format_limit(dashboard.plan_limits.max_users),
                dashboard.current_usage.patients,
                format_limit(dashboard.plan_limits.max_patients),
            );

            if !dashboard.invoices.is_empty() {
                println!();
                let mut table = Table::new();
                table.set_content_arrangement(ContentArrangement::Dynamic);
                table.set_header(vec!["Invoice", "Date", "Amount", "Status"]);
                for invoice in &dashboard.invoices {
                    table.add_row(vec![
                        invoice.id.clone(),
                        invoice.issued_on.to_string(),
                        format!("{:.2} {}", invoice.amount, invoice.currency),
                        invoice.status.clone(),
                    ]);
                }
                println!("{}", table);
            }
        }
        BillingCommands::Select { plan, json } => {
            let result = ctx.billing.select_plan(&plan);
            if json {
                let envelope: OperationResult<_> = result.into();
                return print_envelope(&envelope);
            }
            let plan = result?;
            output::success(&format!("Selected the {} plan", plan.name));
        }
        BillingCommands::Checkout { plan, json } => {
            require_billing_access(&ctx)?;
            let result = ctx.billing.checkout(plan.as_deref());
            let event = session_event(&ctx, "checkout_started")
                .with_command("billing checkout");
            log_event(&logger, match &result {
                Ok(_) => event,
                Err(e) => event.with_error(e.to_string()),
            });

            if json {
                let envelope: OperationResult<_> = result.into();
                return print_envelope(&envelope);
            }
            let session = result?;
            output::success("Checkout session created");
            println!("  Open: {}", session.url.cyan());
        }
        BillingCommands::Cancel { force, json } => {
            require_billing_access(&ctx)?;
            if !force && !json {
                if !Confirm::new()
                    .with_prompt("Cancel the clinic's subscription?")
                    .default(false)
                    .interact()?
                {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let result = ctx.billing.cancel_subscription();
            let event = session_event(&ctx, "subscription_canceled");
            log_event(&logger, match &result {
                Ok(r) if r.success => event,
                Ok(r) => event.with_error(r.message.clone().unwrap_or_default()),
                Err(e) => event.with_error(e.to_string()),
            });

            if json {
                let envelope: OperationResult<_> = result.into();
                return print_envelope(&envelope);
            }
            let cancellation = result?;
            let message = cancellation.message.unwrap_or_default();
            if cancellation.success {
                output::success(&format!("Subscription canceled. {}", message));
                if let Some(at) = cancellation.effective_at {
                    println!("  Effective: {}", at.format("%Y-%m-%d"));
                }
            } else {
                bail!("Cancellation failed: {}", message);
            }
        }
        BillingCommands::PaymentMethod { json } => {
            require_billing_access(&ctx)?;
            let result = ctx.billing.update_payment_method();
            if json {
                let envelope: OperationResult<_> = result.into();
                return print_envelope(&envelope);
            }
            let update = result?;
            println!("Update the payment method at {}", update.url.cyan());
        }
    }

    Ok(())
}
