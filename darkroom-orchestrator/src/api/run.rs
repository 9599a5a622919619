//! Run API Handlers
//!
//! HTTP endpoints for the pipeline run lifecycle and the completion intake.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use darkroom_core::dto::queue::CompletionReport;
use darkroom_core::dto::run::{CancelReport, ProjectResults, StartRunReport};

use crate::api::error::{ApiError, ApiResult};
use crate::service::pipeline::{Orchestrator, PipelineError};

/// POST /projects/{owner}/{project}/process
/// Start a full run over every image of the project
pub async fn start_process(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path((owner, project)): Path<(String, Uuid)>,
) -> ApiResult<(StatusCode, Json<StartRunReport>)> {
    tracing::info!(%owner, %project, "starting full run");

    let report = orchestrator
        .start_run(&owner, project)
        .await
        .map_err(pipeline_error)?;

    // Some images failing to start is not the same as the run not starting
    let status = if report.is_clean() {
        StatusCode::CREATED
    } else {
        StatusCode::MULTI_STATUS
    };

    Ok((status, Json(report)))
}

/// POST /projects/{owner}/{project}/preview/{image}
/// Start a preview run for one image
pub async fn start_preview(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path((owner, project, image)): Path<(String, Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    tracing::info!(%owner, %project, %image, "starting preview");

    orchestrator
        .start_preview(&owner, project, image)
        .await
        .map_err(pipeline_error)?;

    Ok(StatusCode::CREATED)
}

/// POST /projects/{owner}/{project}/cancel
/// Cancel the project's in-flight run
pub async fn cancel_run(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path((owner, project)): Path<(String, Uuid)>,
) -> ApiResult<Json<CancelReport>> {
    tracing::info!(%owner, %project, "cancelling run");

    let report = orchestrator
        .cancel_run(&owner, project)
        .await
        .map_err(pipeline_error)?;

    Ok(Json(report))
}

/// GET /projects/{owner}/{project}/results
/// Results of the project's last completed run, resolved to URLs
pub async fn get_results(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path((owner, project)): Path<(String, Uuid)>,
) -> ApiResult<Json<ProjectResults>> {
    tracing::debug!(%owner, %project, "collecting results");

    let results = orchestrator
        .collect_results(&owner, project)
        .await
        .map_err(pipeline_error)?;

    Ok(Json(results))
}

/// GET /projects/{owner}/{project}/advanced-ops
/// Advanced operations a full run would consume right now
pub async fn advanced_ops(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path((owner, project)): Path<(String, Uuid)>,
) -> ApiResult<Json<u64>> {
    let count = orchestrator
        .advanced_op_count(&owner, project)
        .await
        .map_err(pipeline_error)?;

    Ok(Json(count))
}

/// POST /intake/report
/// Completion intake: the broker bridge delivers worker reports here
///
/// Consumed and discarded reports both answer 200; an error here means the
/// state store failed and the bridge should redeliver.
pub async fn intake_report(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(report): Json<CompletionReport>,
) -> ApiResult<StatusCode> {
    tracing::debug!(correlation_id = %report.correlation_id, "completion report received");

    orchestrator
        .handle_report(report)
        .await
        .map_err(pipeline_error)?;

    Ok(StatusCode::OK)
}

// =============================================================================
// Error Mapping
// =============================================================================

fn pipeline_error(err: PipelineError) -> ApiError {
    match err {
        PipelineError::NoToolsSelected => ApiError::BadRequest("No tools selected".to_string()),
        PipelineError::NoImages => ApiError::BadRequest("Project has no images".to_string()),
        PipelineError::QuotaExceeded => {
            ApiError::Forbidden("No more daily operations available".to_string())
        }
        PipelineError::ImageNotFound(id) => ApiError::NotFound(format!("Image {} not found", id)),
        PipelineError::MissingChainEntry(position) => {
            ApiError::InternalError(format!("Tool chain has no entry at position {}", position))
        }
        PipelineError::State(err) => ApiError::InternalError(err.to_string()),
        PipelineError::Artifact(err) => ApiError::InternalError(err.to_string()),
        PipelineError::Queue(err) => ApiError::InternalError(err.to_string()),
        PipelineError::Entitlement(err) => ApiError::InternalError(err.to_string()),
        PipelineError::Workdir(err) => ApiError::InternalError(err.to_string()),
        PipelineError::Cleanup(msg) => ApiError::InternalError(msg),
    }
}
