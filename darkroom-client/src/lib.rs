//! Darkroom HTTP Clients
//!
//! Typed HTTP clients for the external collaborators of the pipeline
//! orchestrator: the artifact store, the user/entitlement service, the client
//! push gateway, and the tool queue broker gateway.
//!
//! Each collaborator gets its own small client struct so the orchestrator can
//! hold exactly the connections it was configured with, instead of reaching
//! for shared module state.
//!
//! # Example
//!
//! ```no_run
//! use darkroom_client::StoreClient;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = StoreClient::new("http://localhost:9000");
//!
//!     let url = store
//!         .object_url("alice", Uuid::new_v4(), "src", "k1", darkroom_client::Audience::Internal)
//!         .await?;
//!
//!     println!("source image at {url}");
//!     Ok(())
//! }
//! ```

pub mod error;

mod artifacts;
mod broker;
mod gateway;
mod users;

pub use artifacts::{Audience, StoreClient};
pub use broker::BrokerClient;
pub use error::{ClientError, Result};
pub use gateway::GatewayClient;
pub use users::UserClient;

use serde::de::DeserializeOwned;

/// Handle an API response and deserialize its JSON body
///
/// Checks the status code and returns an appropriate error if the request
/// failed, or deserializes the response body if successful.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Handle an API response that returns no content (e.g., DELETE operations)
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}
