//! Project Repository
//!
//! Read-only access to the project entity: the tool chain and image list are
//! owned by the project service and are never mutated from here.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use darkroom_core::domain::image::SourceImage;
use darkroom_core::domain::tool::{Procedure, ToolChainEntry};

use crate::ports::{ProjectStore, StateStoreError};

pub struct PgProjectStore {
    pool: PgPool,
}

impl PgProjectStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn get_tools(
        &self,
        owner: &str,
        project: Uuid,
    ) -> Result<Vec<ToolChainEntry>, StateStoreError> {
        let rows = sqlx::query_as::<_, ToolRow>(
            r#"
            SELECT id, chain_position, procedure, params
            FROM project_tools
            WHERE owner_id = $1 AND project_id = $2
            ORDER BY chain_position ASC
            "#,
        )
        .bind(owner)
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(ToolRow::into_entry).collect()
    }

    async fn get_images(
        &self,
        owner: &str,
        project: Uuid,
    ) -> Result<Vec<SourceImage>, StateStoreError> {
        let rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, file_name, source_key
            FROM project_images
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

    async fn find_image(
        &self,
        owner: &str,
        project: Uuid,
        image: Uuid,
    ) -> Result<Option<SourceImage>, StateStoreError> {
        let row = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, file_name, source_key
            FROM project_images
            WHERE owner_id = $1 AND project_id = $2 AND id = $3
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
}

// =============================================================================
// Helper Functions
// =============================================================================

fn backend(err: sqlx::Error) -> StateStoreError {
    StateStoreError::Backend(err.to_string())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ToolRow {
    id: Uuid,
    chain_position: i32,
    procedure: String,
    params: serde_json::Value,
}

impl ToolRow {
    fn into_entry(self) -> Result<ToolChainEntry, StateStoreError> {
        let procedure = Procedure::parse(&self.procedure).ok_or_else(|| {
            StateStoreError::Backend(format!("unknown procedure in tool chain: {}", self.procedure))
        })?;

        Ok(ToolChainEntry {
            id: self.id,
            position: self.chain_position as u32,
            procedure,
            params: self.params,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    id: Uuid,
    file_name: String,
    source_key: String,
}

impl From<ImageRow> for SourceImage {
    fn from(row: ImageRow) -> Self {
        SourceImage {
            id: row.id,
            file_name: row.file_name,
            source_key: row.source_key,
        }
    }
}
