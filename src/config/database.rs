//! Database configuration module.
//!
//! Handles the `SQLite` connection and table creation using `SeaORM`. Tables are generated
//! from the entity definitions with `Schema::create_table_from_entity`, so the schema always
//! matches the Rust structs. Creation is idempotent, which lets the daemon call it on every
//! start.

use crate::entities::{SystemState, Transaction};
use crate::errors::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/cashback_tracker.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or the default
/// local `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// The file behind a `sqlite://` URL, `None` for in-memory or other databases.
fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url.strip_prefix("sqlite://")?;
    let path = rest.split('?').next().unwrap_or_default();
    (!path.is_empty() && !path.starts_with(":memory:")).then(|| Path::new(path))
}

/// Opens a pool with a single connection.
///
/// While a store write holds a database transaction, every other caller waits in
/// `begin()` until it commits.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url);
    options.max_connections(1).min_connections(1);
    Database::connect(options).await.map_err(Into::into)
}

/// Establishes a connection to the database named by [`get_database_url`], creating the
/// directory of a `SQLite` file first if needed.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(parent) = sqlite_file_path(&database_url).and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    tracing::debug!("Connecting to database at {}", database_url);
    connect(&database_url).await
}

/// Creates the `transactions` and `system_state` tables if they do not exist yet.
pub async fn create_tables<C: ConnectionTrait>(db: &C) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let transaction_table = schema
        .create_table_from_entity(Transaction)
        .if_not_exists()
        .to_owned();
    let system_state_table = schema
        .create_table_from_entity(SystemState)
        .if_not_exists()
        .to_owned();

    db.execute(builder.build(&transaction_table)).await?;
    db.execute(builder.build(&system_state_table)).await?;

    Ok(())
}
