//! Log database migrations - embedded SQL files
//!
//! Applied in order by name; `000_migrations.sql` bootstraps the tracking table.

/// Format: (filename, sql_content)
///
/// New migrations get the next NNN_description.sql name and an entry here.
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
