//! Collaborator boundaries
//!
//! Every external dependency of the pipeline service sits behind one of
//! these traits: the run-state store, the read-only project store, the
//! artifact store, the tool queue, the client notifier, and the entitlement
//! gate. The orchestrator is constructed from explicit implementations of
//! each, which is also what makes the state machine testable without a
//! database or broker.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use darkroom_core::domain::artifact::{PreviewArtifact, ResultArtifact};
use darkroom_core::domain::cursor::StepCursor;
use darkroom_core::domain::image::SourceImage;
use darkroom_core::domain::tool::ToolChainEntry;
use darkroom_core::dto::notify::Notification;
use darkroom_core::dto::queue::WorkRequest;

/// Buckets of the artifact store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Src,
    Out,
    Preview,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Src => "src",
            Bucket::Out => "out",
            Bucket::Preview => "preview",
        }
    }
}

/// Which network a resolved artifact URL must be reachable from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlAudience {
    /// Orchestrator-side downloads over the service network
    Internal,
    /// User-facing links
    Public,
}

#[derive(Debug, Error)]
pub enum StateStoreError {
    /// The unique in-flight-step slot for this image is already taken
    #[error("an in-flight step already exists for this image")]
    CursorOccupied,
    #[error("state store error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
#[error("artifact store error: {0}")]
pub struct ArtifactError(pub String);

#[derive(Debug, Error)]
#[error("tool queue error: {0}")]
pub struct QueueError(pub String);

#[derive(Debug, Error)]
#[error("notifier error: {0}")]
pub struct NotifyError(pub String);

#[derive(Debug, Error)]
#[error("entitlement service error: {0}")]
pub struct EntitlementError(pub String);

/// Durable store of the orchestrator's own small records: step cursors,
/// preview artifacts, result artifacts
#[async_trait]
pub trait RunStateStore: Send + Sync {
    /// Persist a new step cursor
    ///
    /// Fails with [`StateStoreError::CursorOccupied`] if the image already
    /// has an in-flight step; that uniqueness is the invariant forcing
    /// strictly sequential per-image execution.
    async fn insert_cursor(&self, cursor: &StepCursor) -> Result<(), StateStoreError>;

    /// Atomically delete and return the cursor for a correlation id
    ///
    /// Under concurrent delivery of duplicate reports exactly one caller
    /// receives the cursor; every other caller sees `None` and discards.
    async fn take_cursor(&self, correlation_id: &str) -> Result<Option<StepCursor>, StateStoreError>;

    /// Delete every cursor of a project, returning how many were removed
    async fn remove_cursors(&self, owner: &str, project: Uuid) -> Result<u64, StateStoreError>;

    /// Write an image's single preview slot, returning the displaced artifact
    async fn replace_preview(
        &self,
        artifact: &PreviewArtifact,
    ) -> Result<Option<PreviewArtifact>, StateStoreError>;

    /// Delete and return an image's preview slot, if occupied
    async fn take_preview(
        &self,
        owner: &str,
        project: Uuid,
        image: Uuid,
    ) -> Result<Option<PreviewArtifact>, StateStoreError>;

    /// Record one image's final run output
    async fn insert_result(&self, artifact: &ResultArtifact) -> Result<(), StateStoreError>;

    /// List a project's result artifacts
    async fn list_results(
        &self,
        owner: &str,
        project: Uuid,
    ) -> Result<Vec<ResultArtifact>, StateStoreError>;

    /// Delete one image's result artifact record
    async fn delete_result(
        &self,
        owner: &str,
        project: Uuid,
        image: Uuid,
    ) -> Result<(), StateStoreError>;
}

/// Read-only view of the project entity owned by the project service
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// The project's tool chain, ordered by position
    async fn get_tools(
        &self,
        owner: &str,
        project: Uuid,
    ) -> Result<Vec<ToolChainEntry>, StateStoreError>;

    /// The project's images
    async fn get_images(
        &self,
        owner: &str,
        project: Uuid,
    ) -> Result<Vec<SourceImage>, StateStoreError>;

    /// Look up one image of the project
    async fn find_image(
        &self,
        owner: &str,
        project: Uuid,
        image: Uuid,
    ) -> Result<Option<SourceImage>, StateStoreError>;
}

/// Binary object storage for image content
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store bytes, returning the assigned object key
    async fn put(
        &self,
        owner: &str,
        project: Uuid,
        bucket: Bucket,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ArtifactError>;

    /// Resolve a retrievable URL for an object key
    async fn url(
        &self,
        owner: &str,
        project: Uuid,
        bucket: Bucket,
        key: &str,
        audience: UrlAudience,
    ) -> Result<String, ArtifactError>;

    /// Delete an object
    async fn delete(
        &self,
        owner: &str,
        project: Uuid,
        bucket: Bucket,
        key: &str,
    ) -> Result<(), ArtifactError>;

    /// Fetch the bytes behind a resolved URL
    async fn download(&self, url: &str) -> Result<Vec<u8>, ArtifactError>;
}

/// Send channel of the tool queue broker
#[async_trait]
pub trait ToolQueue: Send + Sync {
    /// Enqueue one work request; dispatched messages cannot be recalled
    async fn dispatch(&self, request: &WorkRequest) -> Result<(), QueueError>;
}

/// Push channel to the owning user's live session
#[async_trait]
pub trait ClientNotifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Plan/quota check, consulted once per full run dispatch and never per step
#[async_trait]
pub trait EntitlementGate: Send + Sync {
    async fn can_process(&self, owner: &str, advanced_ops: u64) -> Result<bool, EntitlementError>;
}
