//! PostgreSQL adapters implementing the database ports.

mod results;
mod scans;
mod targets;

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub use results::PostgresResultRepository;
pub use scans::PostgresScanRepository;
pub use targets::PostgresTargetRepository;

use crate::Result;

/// Open a pool against `url`.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(url)
        .await?;
    info!(max_connections, "connected to postgres");
    Ok(pool)
}

/// Apply the embedded migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    crate::MIGRATOR.run(pool).await?;
    Ok(())
}
