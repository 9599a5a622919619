//! Client push gateway client
//!
//! The gateway forwards notifications to the owning user's live session.
//! Delivery is best-effort by contract; callers decide whether a failure is
//! worth more than a log line.

use darkroom_core::dto::notify::Notification;
use reqwest::Client;

use crate::error::Result;
use crate::handle_empty_response;

/// HTTP client for the push gateway
#[derive(Debug, Clone)]
pub struct GatewayClient {
    /// Base URL of the push gateway (e.g., "http://gateway:8081")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl GatewayClient {
    /// Create a new push gateway client
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Get the base URL of the push gateway
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Push one notification to the owner's live session
    pub async fn push(&self, notification: &Notification) -> Result<()> {
        let url = format!("{}/notify", self.base_url);
        let response = self.client.post(&url).json(notification).send().await?;

        handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = GatewayClient::new("http://gateway:8081/");
        assert_eq!(client.base_url(), "http://gateway:8081");
    }
}
