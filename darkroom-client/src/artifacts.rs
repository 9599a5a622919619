//! Artifact store client
//!
//! The artifact store keeps image bytes in per-(owner, project) buckets
//! (`src`, `out`, `preview`) and hands out retrievable URLs for keys.

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::{handle_empty_response, handle_response};

/// Which network a returned URL must be reachable from
///
/// The orchestrator downloads sources over the internal service network;
/// user-facing links must resolve from the public side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Internal,
    Public,
}

impl Audience {
    fn as_str(&self) -> &'static str {
        match self {
            Audience::Internal => "internal",
            Audience::Public => "public",
        }
    }
}

/// HTTP client for the artifact store
#[derive(Debug, Clone)]
pub struct StoreClient {
    /// Base URL of the artifact store (e.g., "http://store:9000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

#[derive(Debug, Deserialize)]
struct PutObjectResponse {
    data: PutObjectData,
}

#[derive(Debug, Deserialize)]
struct PutObjectData {
    #[serde(rename = "imageKey")]
    image_key: String,
}

#[derive(Debug, Deserialize)]
struct ObjectUrlResponse {
    url: String,
}

impl StoreClient {
    /// Create a new artifact store client
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Get the base URL of the artifact store
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload bytes into a bucket, returning the assigned object key
    pub async fn put_object(
        &self,
        owner: &str,
        project: Uuid,
        bucket: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let url = format!("{}/images/{}/{}/{}", self.base_url, owner, project, bucket);

        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let response = self.client.post(&url).multipart(form).send().await?;
        let body: PutObjectResponse = handle_response(response).await?;

        Ok(object_key_from_path(&body.data.image_key))
    }

    /// Resolve a retrievable URL for an object key
    pub async fn object_url(
        &self,
        owner: &str,
        project: Uuid,
        bucket: &str,
        key: &str,
        audience: Audience,
    ) -> Result<String> {
        let url = format!(
            "{}/images/{}/{}/{}/{}/url?audience={}",
            self.base_url,
            owner,
            project,
            bucket,
            key,
            audience.as_str()
        );

        let response = self.client.get(&url).send().await?;
        let body: ObjectUrlResponse = handle_response(response).await?;

        Ok(body.url)
    }

    /// Delete an object from a bucket
    pub async fn delete_object(
        &self,
        owner: &str,
        project: Uuid,
        bucket: &str,
        key: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/images/{}/{}/{}/{}",
            self.base_url, owner, project, bucket, key
        );

        let response = self.client.delete(&url).send().await?;
        handle_empty_response(response).await
    }

    /// Download the bytes behind a previously resolved URL
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(ClientError::api_error(
                status.as_u16(),
                format!("download failed for {url}"),
            ));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// The store reports keys as full bucket paths; only the last segment is the key
fn object_key_from_path(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}
