//! Connection pool and migrations

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Embedded migrations from the workspace `migrations/` directory
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    const INITIAL: &str = include_str!("../../../../migrations/20240601000000_initial.sql");

    fn table(name: &str) -> &'static str {
        let start = INITIAL
            .find(&format!("CREATE TABLE {} (", name))
            .unwrap_or_else(|| panic!("table {} missing", name));
        let body = &INITIAL[start..];
        &body[..body.find(");").unwrap()]
    }

    #[test]
    fn test_required_category_references_are_not_null() {
        assert!(table("budgets").contains("category_id UUID NOT NULL REFERENCES categories (id)"));
        assert!(table("expenses").contains("category_id UUID NOT NULL REFERENCES categories (id)"));
    }

    #[test]
    fn test_only_system_categories_lack_an_owner() {
        assert!(table("categories").contains("user_id UUID,"));
        assert!(table("budgets").contains("user_id UUID NOT NULL"));
        assert!(table("expenses").contains("user_id UUID NOT NULL"));
    }
}
