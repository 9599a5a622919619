//! In-memory fakes for the collaborator ports
//!
//! Everything here backs the service-level tests: a map-based run state
//! store, a single-project store, a recording artifact store/queue/notifier,
//! and a shared event log for asserting cross-collaborator ordering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use darkroom_core::domain::artifact::{OutputKind, PreviewArtifact, ResultArtifact};
use darkroom_core::domain::cursor::StepCursor;
use darkroom_core::domain::image::SourceImage;
use darkroom_core::domain::tool::{Procedure, ToolChainEntry};
use darkroom_core::dto::notify::Notification;
use darkroom_core::dto::queue::WorkRequest;

use crate::ports::{
    ArtifactError, ArtifactStore, Bucket, ClientNotifier, EntitlementError, EntitlementGate,
    NotifyError, ProjectStore, QueueError, RunStateStore, StateStoreError, ToolQueue, UrlAudience,
};
use crate::service::pipeline::Orchestrator;
use crate::workdir::WorkDirs;

pub type EventLog = Arc<Mutex<Vec<String>>>;

// =============================================================================
// Run state store
// =============================================================================

#[derive(Default)]
pub struct MemoryState {
    cursors: Mutex<HashMap<String, StepCursor>>,
    previews: Mutex<HashMap<(String, Uuid, Uuid), PreviewArtifact>>,
    results: Mutex<HashMap<(String, Uuid, Uuid), ResultArtifact>>,
}

impl MemoryState {
    pub fn cursor_count(&self) -> usize {
        self.cursors.lock().unwrap().len()
    }

    pub fn list_results_sync(&self) -> Vec<ResultArtifact> {
        self.results.lock().unwrap().values().cloned().collect()
    }

    pub fn preview_slot(&self, owner: &str, project: Uuid, image: Uuid) -> Option<PreviewArtifact> {
        self.previews
            .lock()
            .unwrap()
            .get(&(owner.to_string(), project, image))
            .cloned()
    }

    pub fn seed_preview(&self, owner: &str, project: Uuid, image: Uuid, key: &str) {
        self.previews.lock().unwrap().insert(
            (owner.to_string(), project, image),
            PreviewArtifact {
                owner: owner.to_string(),
                project,
                image,
                kind: OutputKind::Image,
                key: key.to_string(),
                file_name: "seed.png".to_string(),
            },
        );
    }

    pub fn seed_result(&self, owner: &str, project: Uuid, key: &str) {
        let image = Uuid::new_v4();
        self.results.lock().unwrap().insert(
            (owner.to_string(), project, image),
            ResultArtifact {
                owner: owner.to_string(),
                project,
                image,
                kind: OutputKind::Image,
                key: key.to_string(),
                file_name: "seed.png".to_string(),
            },
        );
    }

    pub fn seed_text_result(&self, owner: &str, project: Uuid, key: &str) {
        let image = Uuid::new_v4();
        self.results.lock().unwrap().insert(
            (owner.to_string(), project, image),
            ResultArtifact {
                owner: owner.to_string(),
                project,
                image,
                kind: OutputKind::Text,
                key: key.to_string(),
                file_name: "seed.txt".to_string(),
            },
        );
    }
}

#[async_trait]
impl RunStateStore for MemoryState {
    async fn insert_cursor(&self, cursor: &StepCursor) -> Result<(), StateStoreError> {
        let mut cursors = self.cursors.lock().unwrap();
        let occupied = cursors.values().any(|c| {
            c.owner == cursor.owner && c.project == cursor.project && c.image == cursor.image
        });
        if occupied {
            return Err(StateStoreError::CursorOccupied);
        }
        cursors.insert(cursor.correlation_id.clone(), cursor.clone());
        Ok(())
    }

    async fn take_cursor(&self, correlation_id: &str) -> Result<Option<StepCursor>, StateStoreError> {
        Ok(self.cursors.lock().unwrap().remove(correlation_id))
    }

    async fn remove_cursors(&self, owner: &str, project: Uuid) -> Result<u64, StateStoreError> {
        let mut cursors = self.cursors.lock().unwrap();
        let before = cursors.len();
        cursors.retain(|_, c| !(c.owner == owner && c.project == project));
        Ok((before - cursors.len()) as u64)
    }

    async fn replace_preview(
        &self,
        artifact: &PreviewArtifact,
    ) -> Result<Option<PreviewArtifact>, StateStoreError> {
        Ok(self.previews.lock().unwrap().insert(
            (artifact.owner.clone(), artifact.project, artifact.image),
            artifact.clone(),
        ))
    }

    async fn take_preview(
        &self,
        owner: &str,
        project: Uuid,
        image: Uuid,
    ) -> Result<Option<PreviewArtifact>, StateStoreError> {
        Ok(self
            .previews
            .lock()
            .unwrap()
            .remove(&(owner.to_string(), project, image)))
    }

    async fn insert_result(&self, artifact: &ResultArtifact) -> Result<(), StateStoreError> {
        self.results.lock().unwrap().insert(
            (artifact.owner.clone(), artifact.project, artifact.image),
            artifact.clone(),
        );
        Ok(())
    }

    async fn list_results(
        &self,
        owner: &str,
        project: Uuid,
    ) -> Result<Vec<ResultArtifact>, StateStoreError> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.owner == owner && r.project == project)
            .cloned()
            .collect())
    }

    async fn delete_result(
        &self,
        owner: &str,
        project: Uuid,
        image: Uuid,
    ) -> Result<(), StateStoreError> {
        self.results
            .lock()
            .unwrap()
            .remove(&(owner.to_string(), project, image));
        Ok(())
    }
}

// =============================================================================
// Project store
// =============================================================================

pub struct MemoryProjects {
    tools: Vec<ToolChainEntry>,
    images: Vec<SourceImage>,
}

#[async_trait]
impl ProjectStore for MemoryProjects {
    async fn get_tools(
        &self,
        _owner: &str,
        _project: Uuid,
    ) -> Result<Vec<ToolChainEntry>, StateStoreError> {
        Ok(self.tools.clone())
    }

    async fn get_images(
        &self,
        _owner: &str,
        _project: Uuid,
    ) -> Result<Vec<SourceImage>, StateStoreError> {
        Ok(self.images.clone())
    }

    async fn find_image(
        &self,
        _owner: &str,
        _project: Uuid,
        image: Uuid,
    ) -> Result<Option<SourceImage>, StateStoreError> {
        Ok(self.images.iter().find(|i| i.id == image).cloned())
    }
}

// =============================================================================
// Artifact store
// =============================================================================

pub struct MemoryArtifacts {
    puts: Mutex<Vec<(String, String, String)>>,
    deleted: Mutex<Vec<(String, String)>>,
    next_key: AtomicU64,
    events: EventLog,
}

impl MemoryArtifacts {
    fn new(events: EventLog) -> Self {
        Self {
            puts: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            next_key: AtomicU64::new(1),
            events,
        }
    }

    /// (bucket, file_name, key) triples in upload order
    pub fn puts(&self) -> Vec<(String, String, String)> {
        self.puts.lock().unwrap().clone()
    }

    /// (bucket, key) pairs in deletion order
    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifacts {
    async fn put(
        &self,
        _owner: &str,
        _project: Uuid,
        bucket: Bucket,
        file_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, ArtifactError> {
        let key = format!("obj-{}", self.next_key.fetch_add(1, Ordering::SeqCst));
        self.events
            .lock()
            .unwrap()
            .push(format!("put:{}:{}", bucket.as_str(), file_name));
        self.puts.lock().unwrap().push((
            bucket.as_str().to_string(),
            file_name.to_string(),
            key.clone(),
        ));
        Ok(key)
    }

    async fn url(
        &self,
        owner: &str,
        project: Uuid,
        bucket: Bucket,
        key: &str,
        _audience: UrlAudience,
    ) -> Result<String, ArtifactError> {
        Ok(format!(
            "http://store.local/{owner}/{project}/{}/{key}",
            bucket.as_str()
        ))
    }

    async fn delete(
        &self,
        _owner: &str,
        _project: Uuid,
        bucket: Bucket,
        key: &str,
    ) -> Result<(), ArtifactError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("delete:{}:{}", bucket.as_str(), key));
        self.deleted
            .lock()
            .unwrap()
            .push((bucket.as_str().to_string(), key.to_string()));
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ArtifactError> {
        if url.contains("fail") {
            return Err(ArtifactError(format!("download refused for {url}")));
        }
        Ok(b"source image bytes".to_vec())
    }
}

// =============================================================================
// Tool queue, notifier, entitlements
// =============================================================================

pub struct MemoryQueue {
    dispatched: Mutex<Vec<WorkRequest>>,
    events: EventLog,
}

impl MemoryQueue {
    fn new(events: EventLog) -> Self {
        Self {
            dispatched: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn dispatched(&self) -> Vec<WorkRequest> {
        self.dispatched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolQueue for MemoryQueue {
    async fn dispatch(&self, request: &WorkRequest) -> Result<(), QueueError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("dispatch:{}", request.correlation_id));
        self.dispatched.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn progress_ticks(&self) -> usize {
        self.sent()
            .iter()
            .filter(|n| matches!(n, Notification::ProgressTick { .. }))
            .count()
    }
}

#[async_trait]
impl ClientNotifier for MemoryNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct MemoryEntitlements {
    allow: AtomicBool,
}

impl MemoryEntitlements {
    pub fn deny(&self) {
        self.allow.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntitlementGate for MemoryEntitlements {
    async fn can_process(&self, _owner: &str, _advanced_ops: u64) -> Result<bool, EntitlementError> {
        Ok(self.allow.load(Ordering::SeqCst))
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub project: Uuid,
    pub images: Vec<SourceImage>,
    pub state: Arc<MemoryState>,
    pub artifacts: Arc<MemoryArtifacts>,
    pub queue: Arc<MemoryQueue>,
    pub notifier: Arc<MemoryNotifier>,
    pub entitlements: Arc<MemoryEntitlements>,
    events: EventLog,
    _workdir: tempfile::TempDir,
}

impl Harness {
    /// Cross-collaborator event order: `dispatch:`, `put:`, `delete:` entries
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

pub fn harness(tools: Vec<ToolChainEntry>, images: Vec<SourceImage>) -> Harness {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let workdir = tempfile::tempdir().expect("tempdir");

    let state = Arc::new(MemoryState::default());
    let projects = Arc::new(MemoryProjects {
        tools,
        images: images.clone(),
    });
    let artifacts = Arc::new(MemoryArtifacts::new(events.clone()));
    let queue = Arc::new(MemoryQueue::new(events.clone()));
    let notifier = Arc::new(MemoryNotifier::default());
    let entitlements = Arc::new(MemoryEntitlements {
        allow: AtomicBool::new(true),
    });

    let orchestrator = Orchestrator::new(
        state.clone(),
        projects,
        artifacts.clone(),
        queue.clone(),
        notifier.clone(),
        entitlements.clone(),
        WorkDirs::new(workdir.path()),
    );

    Harness {
        orchestrator,
        project: Uuid::new_v4(),
        images,
        state,
        artifacts,
        queue,
        notifier,
        entitlements,
        events,
        _workdir: workdir,
    }
}

pub fn tool_chain(procedures: &[Procedure]) -> Vec<ToolChainEntry> {
    procedures
        .iter()
        .enumerate()
        .map(|(position, procedure)| ToolChainEntry {
            id: Uuid::new_v4(),
            position: position as u32,
            procedure: *procedure,
            params: serde_json::json!({}),
        })
        .collect()
}

pub fn image(file_name: &str) -> SourceImage {
    image_with_key(file_name, &format!("key-{file_name}"))
}

pub fn image_with_key(file_name: &str, source_key: &str) -> SourceImage {
    SourceImage {
        id: Uuid::new_v4(),
        file_name: file_name.to_string(),
        source_key: source_key.to_string(),
    }
}
