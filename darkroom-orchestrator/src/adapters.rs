//! Port implementations over the collaborator HTTP clients

use async_trait::async_trait;
use uuid::Uuid;

use darkroom_client::{Audience, BrokerClient, GatewayClient, StoreClient, UserClient};
use darkroom_core::dto::notify::Notification;
use darkroom_core::dto::queue::WorkRequest;

use crate::ports::{
    ArtifactError, ArtifactStore, Bucket, ClientNotifier, EntitlementError, EntitlementGate,
    NotifyError, QueueError, ToolQueue, UrlAudience,
};

/// Artifact store backed by the store service
pub struct StoreArtifacts {
    client: StoreClient,
}

impl StoreArtifacts {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactStore for StoreArtifacts {
    async fn put(
        &self,
        owner: &str,
        project: Uuid,
        bucket: Bucket,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ArtifactError> {
        self.client
            .put_object(owner, project, bucket.as_str(), file_name, bytes)
            .await
            .map_err(|e| ArtifactError(e.to_string()))
    }

    async fn url(
        &self,
        owner: &str,
        project: Uuid,
        bucket: Bucket,
        key: &str,
        audience: UrlAudience,
    ) -> Result<String, ArtifactError> {
        let audience = match audience {
            UrlAudience::Internal => Audience::Internal,
            UrlAudience::Public => Audience::Public,
        };
        self.client
            .object_url(owner, project, bucket.as_str(), key, audience)
            .await
            .map_err(|e| ArtifactError(e.to_string()))
    }

    async fn delete(
        &self,
        owner: &str,
        project: Uuid,
        bucket: Bucket,
        key: &str,
    ) -> Result<(), ArtifactError> {
        self.client
            .delete_object(owner, project, bucket.as_str(), key)
            .await
            .map_err(|e| ArtifactError(e.to_string()))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ArtifactError> {
        self.client
            .download(url)
            .await
            .map_err(|e| ArtifactError(e.to_string()))
    }
}

/// Tool queue backed by the broker gateway
pub struct BrokerQueue {
    client: BrokerClient,
}

impl BrokerQueue {
    pub fn new(client: BrokerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolQueue for BrokerQueue {
    async fn dispatch(&self, request: &WorkRequest) -> Result<(), QueueError> {
        self.client
            .dispatch(request)
            .await
            .map_err(|e| QueueError(e.to_string()))
    }
}

/// Client notifier backed by the push gateway
pub struct GatewayNotifier {
    client: GatewayClient,
}

impl GatewayNotifier {
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClientNotifier for GatewayNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.client
            .push(notification)
            .await
            .map_err(|e| NotifyError(e.to_string()))
    }
}

/// Entitlement gate backed by the user service
pub struct UserEntitlements {
    client: UserClient,
}

impl UserEntitlements {
    pub fn new(client: UserClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EntitlementGate for UserEntitlements {
    async fn can_process(&self, owner: &str, advanced_ops: u64) -> Result<bool, EntitlementError> {
        self.client
            .can_process(owner, advanced_ops)
            .await
            .map_err(|e| EntitlementError(e.to_string()))
    }
}
