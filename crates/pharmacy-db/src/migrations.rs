//! # Database Migrations
//!
//! ```text
//! startup ──► _sqlx_migrations exists? ──► compare embedded vs applied
//!                                               │
//!                      001_initial_schema.sql ✓ │
//!                      00N_next_change.sql    ⬜ ──► run, record checksum
//! ```
//!
//! New migrations go in `migrations/sqlite/` as `NNN_description.sql`.
//! Applied migrations are never edited.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the workspace `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending migrations. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// `(embedded, applied)` migration counts, for health output.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}
