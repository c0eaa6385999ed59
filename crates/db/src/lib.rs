//! Media Store: durable storage for [`MediaRecord`](gallery_core::media::MediaRecord).
//!
//! [`MediaStore`] is the seam the pipeline talks to. [`PgMediaStore`] keeps
//! records in PostgreSQL with `details` as JSONB; [`MemoryMediaStore`] keeps
//! them in a map for tests and local development.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

pub use memory::MemoryMediaStore;
pub use repositories::{MediaRecordRepo, PgMediaStore};
pub use store::MediaStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
