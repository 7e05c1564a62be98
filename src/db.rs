use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::AppConfig;
use crate::schema::SchemaPolicy;

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

/// Creates the `users` table with the columns the policy activates.
/// An existing table is left untouched.
pub async fn ensure_users_table(db: &PgPool, policy: &SchemaPolicy) -> anyhow::Result<()> {
    sqlx::query(&policy.create_table_sql())
        .execute(db)
        .await
        .context("create users table")?;
    info!(
        id = ?policy.id_kind(),
        fields = ?policy.active_fields().map(|s| s.column).collect::<Vec<_>>(),
        "users table ready"
    );
    Ok(())
}
