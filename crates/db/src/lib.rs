//! Database layer for formkit.
//!
//! Entities, migrations and repositories over a single explicitly opened
//! [`DatabaseConnection`]. Callers own the handle: [`init`] opens it,
//! [`migrate`] brings the schema up to date and [`close`] releases the pool
//! once every shared handle has been dropped.

pub mod entities;
pub mod error;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

pub use error::map_db_err;

use formkit_common::{AppError, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::{sync::Arc, time::Duration};
use tracing::log::LevelFilter;

/// Initialize database connection.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    let db = Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    tracing::info!(
        max_connections = config.database.max_connections,
        "Database connection established"
    );
    Ok(db)
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Close the connection pool.
///
/// Returns `Ok(false)` without closing when other handles are still alive;
/// the pool is then released when the last of them drops.
pub async fn close(db: Arc<DatabaseConnection>) -> Result<bool, AppError> {
    let Ok(db) = Arc::try_unwrap(db) else {
        tracing::warn!("Database connection still shared at shutdown, leaving it to drop");
        return Ok(false);
    };

    db.close()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("Database connection closed");
    Ok(true)
}
