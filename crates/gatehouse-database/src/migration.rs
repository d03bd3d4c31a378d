//! Embedded schema migrations.

use sqlx::PgPool;
use tracing::info;

use gatehouse_core::error::{AppError, ErrorKind};

/// Applies any migrations the target database has not seen yet.
///
/// The migration files are compiled into the binary from the workspace
/// `migrations/` directory, so a fresh database reaches the current
/// schema without external tooling.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, format!("Migration failed: {e}"), e)
        })?;

    info!("Schema migrations applied");
    Ok(())
}
