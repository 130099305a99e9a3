use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create executions table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS executions (
            id UUID PRIMARY KEY,
            command TEXT NOT NULL,
            module VARCHAR(255) NOT NULL,
            args TEXT NOT NULL DEFAULT '',
            inventory TEXT NOT NULL DEFAULT '',
            hosts TEXT NOT NULL,
            extra_vars TEXT,
            status VARCHAR(20) NOT NULL DEFAULT 'pending',
            output TEXT NOT NULL DEFAULT '',
            error_output TEXT NOT NULL DEFAULT '',
            exit_code INTEGER,
            start_time TIMESTAMPTZ,
            end_time TIMESTAMPTZ,
            duration BIGINT,
            user_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for listing and reconciliation
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_executions_user_created ON executions(user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_executions_status ON executions(status)")
        .execute(pool)
        .await?;

    // Create inventories table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inventories (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            kind VARCHAR(20) NOT NULL DEFAULT 'static',
            content TEXT NOT NULL,
            is_default BOOLEAN NOT NULL DEFAULT FALSE,
            user_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            CONSTRAINT uq_inventories_user_name UNIQUE (user_id, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one default inventory per user
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_inventories_user_default ON inventories(user_id) WHERE is_default",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
