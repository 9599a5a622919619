//! User service client
//!
//! The user service owns accounts, plan types, and daily operation quotas.
//! The orchestrator consults it exactly once per full run dispatch.

use reqwest::Client;

use crate::error::Result;
use crate::handle_response;

/// HTTP client for the user/entitlement service
#[derive(Debug, Clone)]
pub struct UserClient {
    /// Base URL of the user service (e.g., "http://users:10001")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl UserClient {
    /// Create a new user service client
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Get the base URL of the user service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether `owner` may consume `advanced_ops` advanced operations today
    pub async fn can_process(&self, owner: &str, advanced_ops: u64) -> Result<bool> {
        let url = format!("{}/{}/process/{}", self.base_url, owner, advanced_ops);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = UserClient::new("http://users:10001/");
        assert_eq!(client.base_url(), "http://users:10001");
    }
}
