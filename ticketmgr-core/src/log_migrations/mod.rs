//! Log database migrations, embedded with include_str!
//!
//! Applied in order by name; `000_migrations.sql` bootstraps the tracking table.

/// (filename, sql_content)
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
