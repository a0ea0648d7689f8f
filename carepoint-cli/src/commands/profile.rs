//! Profile command - view or edit the signed-in user's profile

use anyhow::{bail, Result};
use comfy_table::{ContentArrangement, Table};
use carepoint_core::domain::ProfileUpdate;
use carepoint_core::OperationResult;

use super::{get_context, get_logger, log_event, print_envelope, session_event};
use crate::output;

pub fn run(
    name: Option<String>,
    specialization: Option<String>,
    department: Option<String>,
    json: bool,
) -> Result<()> {
    let logger = get_logger();
    let mut ctx = get_context()?;

    let update = ProfileUpdate { name, specialization, department };

    if update.is_empty() {
        let Some(user) = ctx.auth.current_user() else {
            if json {
                return print_envelope(&OperationResult::<()>::fail("No user logged in"));
            }
            bail!("No user logged in");
        };

        if json {
            return print_envelope(&OperationResult::ok(user.clone()));
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Field", "Value"]);
        let none = || "-".to_string();
        table.add_row(vec!["Id".to_string(), user.id.clone()]);
        table.add_row(vec!["Name".to_string(), user.name.clone()]);
        table.add_row(vec!["Email".to_string(), user.email.clone()]);
        table.add_row(vec!["Role".to_string(), user.role.label().to_string()]);
        table.add_row(vec![
            "Department".to_string(),
            user.department.clone().unwrap_or_else(none),
        ]);
        table.add_row(vec![
            "Specialization".to_string(),
            user.specialization.clone().unwrap_or_else(none),
        ]);
        table.add_row(vec![
            "Last login".to_string(),
            user.last_login
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(none),
        ]);
        println!("{}", table);
        return Ok(());
    }

    let result = ctx.auth.update_profile(&update);
    match &result {
        Ok(_) => log_event(&logger, session_event(&ctx, "profile_updated")),
        Err(e) => log_event(&logger, session_event(&ctx, "profile_update_failed").with_error(e.to_string())),
    }

    if json {
        let envelope: OperationResult<_> = result.into();
        return print_envelope(&envelope);
    }

    let user = result?;
    output::success(&format!("Updated profile for {}", user.name));
    Ok(())
}
