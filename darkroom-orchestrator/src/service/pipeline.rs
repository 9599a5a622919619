//! Pipeline Service
//!
//! The run state machine: dispatches the first step of a run, consumes
//! completion reports from the tool queue, advances or finalizes per-image
//! progress, and handles best-effort cancellation.
//!
//! Dispatch and intake are invoked from unsynchronized entry points and may
//! interleave arbitrarily across images and runs. The only shared mutable
//! resource is the run state store; the atomic take-cursor claim in intake
//! is what makes duplicate, reordered and post-cancellation deliveries safe.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use darkroom_core::domain::artifact::{OutputKind, PreviewArtifact, ResultArtifact};
use darkroom_core::domain::cursor::StepCursor;
use darkroom_core::domain::image::SourceImage;
use darkroom_core::domain::run::RunKind;
use darkroom_core::domain::tool::{self, ToolChainEntry};
use darkroom_core::dto::notify::Notification;
use darkroom_core::dto::queue::{
    CompletionReport, ReportStatus, WorkError, WorkOutput, WorkRequest,
};
use darkroom_core::dto::run::{CancelReport, FailedStart, ProjectResults, ResultLink, StartRunReport};

use crate::ports::{
    ArtifactError, ArtifactStore, Bucket, ClientNotifier, EntitlementError, EntitlementGate,
    ProjectStore, QueueError, RunStateStore, StateStoreError, ToolQueue, UrlAudience,
};
use crate::service::decision::{self, Outcome};
use crate::workdir::WorkDirs;

/// Service error type
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no tools selected")]
    NoToolsSelected,
    #[error("project has no images")]
    NoImages,
    #[error("no more daily operations available")]
    QuotaExceeded,
    #[error("image {0} not found in project")]
    ImageNotFound(Uuid),
    #[error("tool chain has no entry at position {0}")]
    MissingChainEntry(u32),
    #[error(transparent)]
    State(#[from] StateStoreError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Entitlement(#[from] EntitlementError),
    #[error("working directory error: {0}")]
    Workdir(#[from] std::io::Error),
    #[error("cleanup incomplete: {0}")]
    Cleanup(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// The pipeline orchestrator
///
/// Owns no global state: every collaborator is an explicit field with a
/// lifecycle controlled by whoever constructed the instance.
pub struct Orchestrator {
    state: Arc<dyn RunStateStore>,
    projects: Arc<dyn ProjectStore>,
    artifacts: Arc<dyn ArtifactStore>,
    queue: Arc<dyn ToolQueue>,
    notifier: Arc<dyn ClientNotifier>,
    entitlements: Arc<dyn EntitlementGate>,
    workdirs: WorkDirs,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state: Arc<dyn RunStateStore>,
        projects: Arc<dyn ProjectStore>,
        artifacts: Arc<dyn ArtifactStore>,
        queue: Arc<dyn ToolQueue>,
        notifier: Arc<dyn ClientNotifier>,
        entitlements: Arc<dyn EntitlementGate>,
        workdirs: WorkDirs,
    ) -> Self {
        Self {
            state,
            projects,
            artifacts,
            queue,
            notifier,
            entitlements,
            workdirs,
        }
    }

    // =============================================================================
    // Dispatch
    // =============================================================================

    /// Start a full run over every image of the project
    ///
    /// Fatal preconditions (no tools, no images, quota) abort before any
    /// state is created. Per-image failures never abort sibling images; the
    /// returned report says which images started and which did not.
    pub async fn start_run(&self, owner: &str, project: Uuid) -> Result<StartRunReport> {
        let tools = self.projects.get_tools(owner, project).await?;
        if tools.is_empty() {
            return Err(PipelineError::NoToolsSelected);
        }

        let images = self.projects.get_images(owner, project).await?;
        if images.is_empty() {
            return Err(PipelineError::NoImages);
        }

        let advanced = tool::advanced_op_count(&tools, images.len());
        if !self.entitlements.can_process(owner, advanced).await? {
            return Err(PipelineError::QuotaExceeded);
        }

        // A run's results must never mix with a previous run's
        self.clear_previous_results(owner, project).await?;
        self.workdirs.recreate_run_dirs(owner, project).await?;

        let first = chain_entry(&tools, 0)?;
        let mut report = StartRunReport::default();

        for image in &images {
            match self
                .dispatch_first_step(owner, project, image, first, RunKind::Full)
                .await
            {
                Ok(()) => report.started.push(image.id),
                Err(err) => {
                    tracing::warn!(image = %image.id, error = %err, "image failed to start");
                    report.failed.push(FailedStart {
                        image: image.id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            owner,
            %project,
            started = report.started.len(),
            failed = report.failed.len(),
            "full run dispatched"
        );

        Ok(report)
    }

    /// Start a preview run for one image
    pub async fn start_preview(&self, owner: &str, project: Uuid, image: Uuid) -> Result<()> {
        let tools = self.projects.get_tools(owner, project).await?;
        if tools.is_empty() {
            return Err(PipelineError::NoToolsSelected);
        }

        let image = self
            .projects
            .find_image(owner, project, image)
            .await?
            .ok_or(PipelineError::ImageNotFound(image))?;

        let first = chain_entry(&tools, 0)?;

        // Single-slot semantics: the previous preview goes away before any
        // new bytes are produced
        if let Some(previous) = self.state.take_preview(owner, project, image.id).await? {
            self.artifacts
                .delete(owner, project, Bucket::Preview, &previous.key)
                .await?;
        }

        self.workdirs.ensure_run_dirs(owner, project).await?;
        self.dispatch_first_step(owner, project, &image, first, RunKind::Preview)
            .await?;

        tracing::info!(owner, %project, image = %image.id, "preview dispatched");

        Ok(())
    }

    /// Stage the source bytes, persist a position-0 cursor, then dispatch
    ///
    /// The cursor must be visible before the message referencing its
    /// correlation id is sent, or a fast worker reply could race a cursor
    /// that is not there yet.
    async fn dispatch_first_step(
        &self,
        owner: &str,
        project: Uuid,
        image: &SourceImage,
        tool: &ToolChainEntry,
        kind: RunKind,
    ) -> Result<()> {
        let source_path = self.workdirs.source_path(owner, project, &image.file_name)?;
        let source_url = self
            .artifacts
            .url(owner, project, Bucket::Src, &image.source_key, UrlAudience::Internal)
            .await?;
        let bytes = self.artifacts.download(&source_url).await?;
        tokio::fs::write(&source_path, &bytes).await?;

        let output_path =
            self.workdirs
                .step_output_path(owner, project, kind, &image.file_name, 0)?;

        let cursor = StepCursor {
            owner: owner.to_string(),
            project,
            image: image.id,
            file_name: image.file_name.clone(),
            correlation_id: kind.new_correlation_id(),
            run_kind: kind,
            position: 0,
            input_uri: path_str(&source_path),
            output_uri: path_str(&output_path),
            dispatched_at: chrono::Utc::now(),
        };

        self.state.insert_cursor(&cursor).await?;
        self.queue.dispatch(&work_request(&cursor, tool)).await?;

        Ok(())
    }

    // =============================================================================
    // Intake
    // =============================================================================

    /// Consume one completion report from the tool queue
    ///
    /// Safe under concurrent delivery of duplicate or reordered reports for
    /// any mix of images and runs.
    pub async fn handle_report(&self, report: CompletionReport) -> Result<()> {
        // The absence check is the sole defense against orphaned, duplicate
        // and post-cancellation reports. It happens before any other side
        // effect, and the take is atomic: exactly one consumer of a
        // correlation id gets the cursor.
        let Some(cursor) = self.state.take_cursor(&report.correlation_id).await? else {
            tracing::debug!(
                correlation_id = %report.correlation_id,
                "no in-flight step for report; discarding"
            );
            return Ok(());
        };

        if report.status == ReportStatus::Error {
            let error = report.error.unwrap_or_else(|| WorkError {
                code: "unknown".to_string(),
                msg: "tool reported an error without details".to_string(),
            });
            tracing::warn!(
                correlation_id = %cursor.correlation_id,
                code = %error.code,
                "tool reported step failure"
            );
            self.notify_step_error(&cursor, &error.code, &error.msg).await;
            return Ok(());
        }

        let Some(output) = report.output else {
            // The cursor is already consumed; dropping this silently would
            // strand the image with no signal to the owner
            self.notify_step_error(&cursor, "malformed-report", "completion report carried no output")
                .await;
            return Ok(());
        };

        let tools = self.projects.get_tools(&cursor.owner, cursor.project).await?;
        let next_position = cursor.position + 1;
        let terminal = next_position >= tools.len() as u32 || !output.kind.is_chainable();

        match decision::decide(ReportStatus::Ok, cursor.run_kind, terminal) {
            // The error row of the table is resolved above, before output
            // extraction; status is ok on every path below
            Outcome::ReportError => {}
            Outcome::AdvancePreview => {
                match self.advance(&cursor, &tools, next_position, &output).await {
                    Ok(()) => self.publish_preview(&cursor, &output, false).await,
                    Err(err) => self.fail_advance(&cursor, err).await,
                }
            }
            Outcome::FinalizePreview => self.publish_preview(&cursor, &output, true).await,
            Outcome::AdvanceRun => {
                match self.advance(&cursor, &tools, next_position, &output).await {
                    Ok(()) => self.send_progress(&cursor.owner).await,
                    Err(err) => self.fail_advance(&cursor, err).await,
                }
            }
            Outcome::FinalizeRun => self.finalize_run(&cursor, &output).await,
        }

        Ok(())
    }

    /// Persist the next cursor and dispatch the next step
    ///
    /// This runs before any artifact upload for the current step: the next
    /// remote computation starts while bookkeeping for this one is still
    /// pending.
    async fn advance(
        &self,
        cursor: &StepCursor,
        tools: &[ToolChainEntry],
        next_position: u32,
        output: &WorkOutput,
    ) -> Result<()> {
        let tool = chain_entry(tools, next_position)?;
        let output_path = self.workdirs.step_output_path(
            &cursor.owner,
            cursor.project,
            cursor.run_kind,
            &cursor.file_name,
            next_position,
        )?;

        let next = StepCursor {
            owner: cursor.owner.clone(),
            project: cursor.project,
            image: cursor.image,
            file_name: cursor.file_name.clone(),
            correlation_id: cursor.run_kind.new_correlation_id(),
            run_kind: cursor.run_kind,
            position: next_position,
            input_uri: output.image_uri.clone(),
            output_uri: path_str(&output_path),
            dispatched_at: chrono::Utc::now(),
        };

        self.state.insert_cursor(&next).await?;
        self.queue.dispatch(&work_request(&next, tool)).await?;

        tracing::debug!(
            image = %cursor.image,
            position = next_position,
            correlation_id = %next.correlation_id,
            "next step dispatched"
        );

        Ok(())
    }

    /// A failed advance ends the image's chain; the owner has to hear it
    async fn fail_advance(&self, cursor: &StepCursor, err: PipelineError) {
        tracing::error!(
            correlation_id = %cursor.correlation_id,
            error = %err,
            "failed to dispatch next step"
        );
        self.notify_step_error(cursor, "advance-failed", &err.to_string())
            .await;
    }

    /// Upload the step output into the image's single preview slot
    ///
    /// Preview publication is non-critical: any failure costs the owner one
    /// preview frame and nothing else.
    async fn publish_preview(&self, cursor: &StepCursor, output: &WorkOutput, notify_ready: bool) {
        if let Err(err) = self.try_publish_preview(cursor, output, notify_ready).await {
            tracing::warn!(
                correlation_id = %cursor.correlation_id,
                error = %err,
                "preview publication failed"
            );
        }
    }

    async fn try_publish_preview(
        &self,
        cursor: &StepCursor,
        output: &WorkOutput,
        notify_ready: bool,
    ) -> Result<()> {
        let bytes = tokio::fs::read(&output.image_uri).await?;
        let file_name = base_name(&output.image_uri);

        let key = self
            .artifacts
            .put(&cursor.owner, cursor.project, Bucket::Preview, file_name, bytes)
            .await?;

        let artifact = PreviewArtifact {
            owner: cursor.owner.clone(),
            project: cursor.project,
            image: cursor.image,
            kind: output.kind,
            key: key.clone(),
            file_name: file_name.to_string(),
        };

        if let Some(displaced) = self.state.replace_preview(&artifact).await? {
            if displaced.key != key {
                if let Err(err) = self
                    .artifacts
                    .delete(&cursor.owner, cursor.project, Bucket::Preview, &displaced.key)
                    .await
                {
                    tracing::warn!(key = %displaced.key, error = %err, "failed to delete displaced preview object");
                }
            }
        }

        if notify_ready {
            let url = self
                .artifacts
                .url(&cursor.owner, cursor.project, Bucket::Preview, &key, UrlAudience::Public)
                .await?;
            self.send_notification(Notification::preview_ready(&cursor.owner, &url))
                .await;
        }

        Ok(())
    }

    /// Record the image's final output and tell the owner
    ///
    /// Unlike previews, a terminal full-run step that fails to publish is a
    /// user-visible failure: without the run-error the owner would believe
    /// the run succeeded with no result.
    async fn finalize_run(&self, cursor: &StepCursor, output: &WorkOutput) {
        match self.try_publish_result(cursor, output).await {
            Ok(()) => self.send_progress(&cursor.owner).await,
            Err(err) => {
                tracing::error!(
                    correlation_id = %cursor.correlation_id,
                    error = %err,
                    "result publication failed"
                );
                self.send_notification(Notification::run_error(
                    &cursor.owner,
                    "publication-failed",
                    &err.to_string(),
                ))
                .await;
            }
        }
    }

    async fn try_publish_result(&self, cursor: &StepCursor, output: &WorkOutput) -> Result<()> {
        let bytes = tokio::fs::read(&output.image_uri).await?;
        let file_name = base_name(&output.image_uri);

        let key = self
            .artifacts
            .put(&cursor.owner, cursor.project, Bucket::Out, file_name, bytes)
            .await?;

        self.state
            .insert_result(&ResultArtifact {
                owner: cursor.owner.clone(),
                project: cursor.project,
                image: cursor.image,
                kind: output.kind,
                key,
                file_name: file_name.to_string(),
            })
            .await?;

        tracing::info!(image = %cursor.image, "result artifact recorded");

        Ok(())
    }

    // =============================================================================
    // Cancellation
    // =============================================================================

    /// Drop every in-flight step of a project and remove its working
    /// directories
    ///
    /// Cancellation is cooperative: already-dispatched messages cannot be
    /// recalled, so a worker that is mid-step will finish, and its report is
    /// discarded on arrival because no cursor matches it anymore.
    pub async fn cancel_run(&self, owner: &str, project: Uuid) -> Result<CancelReport> {
        let removed = self.state.remove_cursors(owner, project).await;
        let cleaned = self.workdirs.remove_run_dirs(owner, project).await;

        match (removed, cleaned) {
            (Ok(cursors_removed), Ok(())) => {
                tracing::info!(owner, %project, cursors_removed, "run cancelled");
                Ok(CancelReport { cursors_removed })
            }
            (removed, cleaned) => {
                // Already-applied deletions stay applied; nothing is
                // re-dispatched
                let mut parts = Vec::new();
                if let Err(err) = removed {
                    parts.push(format!("cursor removal: {err}"));
                }
                if let Err(err) = cleaned {
                    parts.push(format!("workdir removal: {err}"));
                }
                Err(PipelineError::Cleanup(parts.join("; ")))
            }
        }
    }

    // =============================================================================
    // Queries
    // =============================================================================

    /// The project's accumulated run results, resolved to public URLs
    pub async fn collect_results(&self, owner: &str, project: Uuid) -> Result<ProjectResults> {
        let artifacts = self.state.list_results(owner, project).await?;
        let mut results = ProjectResults::default();

        for artifact in artifacts {
            let url = self
                .artifacts
                .url(owner, project, Bucket::Out, &artifact.key, UrlAudience::Public)
                .await?;
            let link = ResultLink {
                image: artifact.image,
                file_name: artifact.file_name.clone(),
                url,
            };
            match artifact.kind {
                OutputKind::Text => results.texts.push(link),
                OutputKind::Image => results.images.push(link),
            }
        }

        Ok(results)
    }

    /// Advanced operations a full run would consume right now
    pub async fn advanced_op_count(&self, owner: &str, project: Uuid) -> Result<u64> {
        let tools = self.projects.get_tools(owner, project).await?;
        let images = self.projects.get_images(owner, project).await?;
        Ok(tool::advanced_op_count(&tools, images.len()))
    }

    // =============================================================================
    // Helpers
    // =============================================================================

    async fn clear_previous_results(&self, owner: &str, project: Uuid) -> Result<()> {
        let previous = self.state.list_results(owner, project).await?;
        for artifact in previous {
            self.artifacts
                .delete(owner, project, Bucket::Out, &artifact.key)
                .await?;
            self.state.delete_result(owner, project, artifact.image).await?;
        }
        Ok(())
    }

    async fn notify_step_error(&self, cursor: &StepCursor, code: &str, msg: &str) {
        let notification = match cursor.run_kind {
            RunKind::Preview => Notification::preview_error(&cursor.owner, code, msg),
            RunKind::Full => Notification::run_error(&cursor.owner, code, msg),
        };
        self.send_notification(notification).await;
    }

    async fn send_progress(&self, owner: &str) {
        self.send_notification(Notification::progress_tick(owner)).await;
    }

    /// Notifications are fire-and-forget: a lost one stalls the UI at worst
    async fn send_notification(&self, notification: Notification) {
        if let Err(err) = self.notifier.notify(&notification).await {
            tracing::warn!(
                owner = %notification.owner(),
                error = %err,
                "client notification failed"
            );
        }
    }
}

fn chain_entry(tools: &[ToolChainEntry], position: u32) -> Result<&ToolChainEntry> {
    tools
        .iter()
        .find(|t| t.position == position)
        .ok_or(PipelineError::MissingChainEntry(position))
}

fn work_request(cursor: &StepCursor, tool: &ToolChainEntry) -> WorkRequest {
    WorkRequest {
        correlation_id: cursor.correlation_id.clone(),
        timestamp: chrono::Utc::now(),
        input_uri: cursor.input_uri.clone(),
        output_uri: cursor.output_uri.clone(),
        procedure: tool.procedure,
        params: tool.params.clone(),
    }
}

fn base_name(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
