//! Run State Repository
//!
//! Postgres implementation of the run-state store: step cursors, preview
//! artifacts, result artifacts. The take-cursor claim is a single
//! `DELETE .. RETURNING`, so concurrent deliveries of the same correlation
//! id resolve to exactly one winner without any extra locking.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use darkroom_core::domain::artifact::{OutputKind, PreviewArtifact, ResultArtifact};
use darkroom_core::domain::cursor::StepCursor;
use darkroom_core::domain::run::RunKind;

use crate::ports::{RunStateStore, StateStoreError};

pub struct PgRunStateStore {
    pool: PgPool,
}

impl PgRunStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunStateStore for PgRunStateStore {
    async fn insert_cursor(&self, cursor: &StepCursor) -> Result<(), StateStoreError> {
        sqlx::query(
            r#"
            INSERT INTO step_cursors
                (correlation_id, owner_id, project_id, image_id, file_name,
                 run_kind, chain_position, input_uri, output_uri, dispatched_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&cursor.correlation_id)
        .bind(&cursor.owner)
        .bind(cursor.project)
        .bind(cursor.image)
        .bind(&cursor.file_name)
        .bind(run_kind_to_string(cursor.run_kind))
        .bind(cursor.position as i32)
        .bind(&cursor.input_uri)
        .bind(&cursor.output_uri)
        .bind(cursor.dispatched_at)
        .execute(&self.pool)
        .await
        .map_err(insert_cursor_error)?;

        Ok(())
    }

    async fn take_cursor(&self, correlation_id: &str) -> Result<Option<StepCursor>, StateStoreError> {
        let row = sqlx::query_as::<_, CursorRow>(
            r#"
            DELETE FROM step_cursors
            WHERE correlation_id = $1
            RETURNING correlation_id, owner_id, project_id, image_id, file_name,
                      run_kind, chain_position, input_uri, output_uri, dispatched_at
            "#,
        )
        .bind(correlation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(|r| r.into()))
    }

    async fn remove_cursors(&self, owner: &str, project: Uuid) -> Result<u64, StateStoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM step_cursors
            WHERE owner_id = $1 AND project_id = $2
            "#,
        )
        .bind(owner)
        .bind(project)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected())
    }

    async fn replace_preview(
        &self,
        artifact: &PreviewArtifact,
    ) -> Result<Option<PreviewArtifact>, StateStoreError> {
        let displaced = sqlx::query_as::<_, PreviewRow>(
            r#"
            SELECT owner_id, project_id, image_id, output_kind, object_key, file_name
            FROM preview_artifacts
            WHERE owner_id = $1 AND project_id = $2 AND image_id = $3
            "#,
        )
        .bind(&artifact.owner)
        .bind(artifact.project)
        .bind(artifact.image)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query(
            r#"
            INSERT INTO preview_artifacts
                (owner_id, project_id, image_id, output_kind, object_key, file_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (owner_id, project_id, image_id)
            DO UPDATE SET output_kind = $4, object_key = $5, file_name = $6
            "#,
        )
        .bind(&artifact.owner)
        .bind(artifact.project)
        .bind(artifact.image)
        .bind(output_kind_to_string(artifact.kind))
        .bind(&artifact.key)
        .bind(&artifact.file_name)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(displaced.map(|r| r.into()))
    }

    async fn take_preview(
        &self,
        owner: &str,
        project: Uuid,
        image: Uuid,
    ) -> Result<Option<PreviewArtifact>, StateStoreError> {
        let row = sqlx::query_as::<_, PreviewRow>(
            r#"
            DELETE FROM preview_artifacts
            WHERE owner_id = $1 AND project_id = $2 AND image_id = $3
            RETURNING owner_id, project_id, image_id, output_kind, object_key, file_name
            "#,
        )
        .bind(owner)
        .bind(project)
        .bind(image)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(|r| r.into()))
    }

    async fn insert_result(&self, artifact: &ResultArtifact) -> Result<(), StateStoreError> {
        sqlx::query(
            r#"
            INSERT INTO result_artifacts
                (owner_id, project_id, image_id, output_kind, object_key, file_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&artifact.owner)
        .bind(artifact.project)
        .bind(artifact.image)
        .bind(output_kind_to_string(artifact.kind))
        .bind(&artifact.key)
        .bind(&artifact.file_name)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn list_results(
        &self,
        owner: &str,
        project: Uuid,
    ) -> Result<Vec<ResultArtifact>, StateStoreError> {
        let rows = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT owner_id, project_id, image_id, output_kind, object_key, file_name
            FROM result_artifacts
            WHERE owner_id = $1 AND project_id = $2
            ORDER BY file_name ASC
            "#,
        )
        .bind(owner)
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn delete_result(
        &self,
        owner: &str,
        project: Uuid,
        image: Uuid,
    ) -> Result<(), StateStoreError> {
        sqlx::query(
            r#"
            DELETE FROM result_artifacts
            WHERE owner_id = $1 AND project_id = $2 AND image_id = $3
            "#,
        )
        .bind(owner)
        .bind(project)
        .bind(image)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn backend(err: sqlx::Error) -> StateStoreError {
    StateStoreError::Backend(err.to_string())
}

fn insert_cursor_error(err: sqlx::Error) -> StateStoreError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return StateStoreError::CursorOccupied;
        }
    }
    backend(err)
}

fn run_kind_to_string(kind: RunKind) -> &'static str {
    match kind {
        RunKind::Preview => "Preview",
        RunKind::Full => "Full",
    }
}

fn string_to_run_kind(s: &str) -> RunKind {
    match s {
        "Preview" => RunKind::Preview,
        _ => RunKind::Full,
    }
}

fn output_kind_to_string(kind: OutputKind) -> &'static str {
    kind.as_str()
}

fn string_to_output_kind(s: &str) -> OutputKind {
    OutputKind::parse(s).unwrap_or(OutputKind::Image)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct CursorRow {
    correlation_id: String,
    owner_id: String,
    project_id: Uuid,
    image_id: Uuid,
    file_name: String,
    run_kind: String,
    chain_position: i32,
    input_uri: String,
    output_uri: String,
    dispatched_at: chrono::DateTime<chrono::Utc>,
}

impl From<CursorRow> for StepCursor {
    fn from(row: CursorRow) -> Self {
        StepCursor {
            owner: row.owner_id,
            project: row.project_id,
            image: row.image_id,
            file_name: row.file_name,
            correlation_id: row.correlation_id,
            run_kind: string_to_run_kind(&row.run_kind),
            position: row.chain_position as u32,
            input_uri: row.input_uri,
            output_uri: row.output_uri,
            dispatched_at: row.dispatched_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PreviewRow {
    owner_id: String,
    project_id: Uuid,
    image_id: Uuid,
    output_kind: String,
    object_key: String,
    file_name: String,
}

impl From<PreviewRow> for PreviewArtifact {
    fn from(row: PreviewRow) -> Self {
        PreviewArtifact {
            owner: row.owner_id,
            project: row.project_id,
            image: row.image_id,
            kind: string_to_output_kind(&row.output_kind),
            key: row.object_key,
            file_name: row.file_name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResultRow {
    owner_id: String,
    project_id: Uuid,
    image_id: Uuid,
    output_kind: String,
    object_key: String,
    file_name: String,
}

impl From<ResultRow> for ResultArtifact {
    fn from(row: ResultRow) -> Self {
        ResultArtifact {
            owner: row.owner_id,
            project: row.project_id,
            image: row.image_id,
            kind: string_to_output_kind(&row.output_kind),
            key: row.object_key,
            file_name: row.file_name,
        }
    }
}
