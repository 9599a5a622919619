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
    // Create step cursors table; the unique (owner, project, image) index is
    // the invariant forcing strictly sequential per-image execution
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS step_cursors (
            correlation_id VARCHAR(255) PRIMARY KEY,
            owner_id VARCHAR(255) NOT NULL,
            project_id UUID NOT NULL,
            image_id UUID NOT NULL,
            file_name VARCHAR(255) NOT NULL,
            run_kind VARCHAR(20) NOT NULL,
            chain_position INTEGER NOT NULL,
            input_uri TEXT NOT NULL,
            output_uri TEXT NOT NULL,
            dispatched_at TIMESTAMPTZ NOT NULL,
            UNIQUE (owner_id, project_id, image_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create preview artifacts table (single slot per image)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS preview_artifacts (
            owner_id VARCHAR(255) NOT NULL,
            project_id UUID NOT NULL,
            image_id UUID NOT NULL,
            output_kind VARCHAR(20) NOT NULL,
            object_key VARCHAR(255) NOT NULL,
            file_name VARCHAR(255) NOT NULL,
            PRIMARY KEY (owner_id, project_id, image_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create result artifacts table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS result_artifacts (
            owner_id VARCHAR(255) NOT NULL,
            project_id UUID NOT NULL,
            image_id UUID NOT NULL,
            output_kind VARCHAR(20) NOT NULL,
            object_key VARCHAR(255) NOT NULL,
            file_name VARCHAR(255) NOT NULL,
            PRIMARY KEY (owner_id, project_id, image_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Project tables are owned by the project service; created here so a
    // single-database deployment works out of the box
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_tools (
            id UUID PRIMARY KEY,
            owner_id VARCHAR(255) NOT NULL,
            project_id UUID NOT NULL,
            chain_position INTEGER NOT NULL,
            procedure VARCHAR(50) NOT NULL,
            params JSONB NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_images (
            id UUID PRIMARY KEY,
            owner_id VARCHAR(255) NOT NULL,
            project_id UUID NOT NULL,
            file_name VARCHAR(255) NOT NULL,
            source_key VARCHAR(255) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_step_cursors_project ON step_cursors(owner_id, project_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_result_artifacts_project ON result_artifacts(owner_id, project_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_project_tools_project ON project_tools(owner_id, project_id, chain_position)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_project_images_project ON project_images(owner_id, project_id)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
