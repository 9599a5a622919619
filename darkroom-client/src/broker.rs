//! Tool queue broker client
//!
//! The broker gateway accepts one-operation work requests for the worker
//! fleet. Completion reports travel the other way, delivered to the
//! orchestrator's intake endpoint by the broker bridge; this client only
//! covers the send channel.

use darkroom_core::dto::queue::WorkRequest;
use reqwest::Client;

use crate::error::Result;
use crate::handle_empty_response;

/// HTTP client for the tool queue broker gateway
#[derive(Debug, Clone)]
pub struct BrokerClient {
    /// Base URL of the broker gateway (e.g., "http://broker:5672")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl BrokerClient {
    /// Create a new broker client
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Get the base URL of the broker gateway
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Enqueue one work request for the worker fleet
    ///
    /// Once accepted the message cannot be recalled; cancellation is handled
    /// by discarding the eventual completion report, not by unsending.
    pub async fn dispatch(&self, request: &WorkRequest) -> Result<()> {
        let url = format!("{}/requests", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        handle_empty_response(response).await
    }
}
