use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc, time::Duration};

use common::error::Res;

pub mod activation;
pub mod purchase;

pub mod models {
    pub mod activation;
    pub mod purchase;
}

pub mod dtos {
    pub mod activation;
    pub mod purchase;
}

/// Opens (creating if needed) the request store and brings its schema up to date.
pub async fn setup(database_url: &str) -> Result<Arc<SqlitePool>, Box<dyn std::error::Error>> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Request store ready at {}", database_url);

    Ok(Arc::new(pool))
}

/// In-memory store with the full schema. Every connection of an in-memory
/// SQLite pool is its own database, so the pool is pinned to one connection.
pub async fn setup_in_memory() -> Res<Arc<SqlitePool>> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(Arc::new(pool))
}
