use std::path::Path;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

/// Open (creating if missing) the database file and apply migrations.
pub async fn connect(path: impl AsRef<Path>) -> anyhow::Result<SqlitePool> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    // Ensure foreign keys are enabled
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);
    let database = SqlitePool::connect_with(options).await?;
    migrate(&database).await?;
    info!("database ready at {}", path.display());
    Ok(database)
}

/// Single-connection in-memory database, every connection of `sqlite::memory:` is a new database.
pub async fn connect_in_memory() -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);
    let database = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    migrate(&database).await?;
    Ok(database)
}

async fn migrate(database: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(database).await?;
    Ok(())
}
