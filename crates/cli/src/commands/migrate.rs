//! Database migration commands.
//!
//! Both migration sets share one database and one `_sqlx_migrations` table,
//! so each run ignores applied versions that belong to the other set.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - storefront connection string
//! - `ADMIN_DATABASE_URL` - admin connection string
//!
//! Either falls back to `DATABASE_URL`.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    run(
        "storefront",
        "STOREFRONT_DATABASE_URL",
        sqlx::migrate!("../storefront/migrations"),
    )
    .await
}

/// Run admin database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn admin() -> Result<(), MigrationError> {
    run(
        "admin",
        "ADMIN_DATABASE_URL",
        sqlx::migrate!("../admin/migrations"),
    )
    .await
}

async fn run(
    name: &str,
    env_var: &'static str,
    mut migrator: Migrator,
) -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var(env_var)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar(env_var))?;

    tracing::info!("Connecting to {name} database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!(
        migrations = migrator.iter().count(),
        "Running {name} migrations..."
    );
    migrator.set_ignore_missing(true);
    migrator.run(&pool).await?;

    tracing::info!("{name} migrations complete");
    Ok(())
}
