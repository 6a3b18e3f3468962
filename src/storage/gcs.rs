// Google Cloud Storage JSON API

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{header, Body, Client, StatusCode};
use std::path::Path;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::TokenSource;
use crate::config::StorageConfig;
use crate::error::{CloudsubError, Result};
use super::{ObjectRef, ObjectStore};

/// Characters left as-is in a path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub struct GcsStorage {
    config: StorageConfig,
    client: Client,
    auth: Arc<dyn TokenSource>,
}

impl GcsStorage {
    pub fn new(config: StorageConfig, client: Client, auth: Arc<dyn TokenSource>) -> Self {
        Self { config, client, auth }
    }

    /// Fresh object key under the configured prefix
    pub fn generate_key(&self) -> String {
        let prefix = self.config.key_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}.wav", Uuid::new_v4())
        } else {
            format!("{}/{}.wav", prefix, Uuid::new_v4())
        }
    }

    fn upload_url(&self, bucket: &str) -> String {
        format!(
            "{}/b/{}/o",
            self.config.upload_endpoint.trim_end_matches('/'),
            utf8_percent_encode(bucket, PATH_SEGMENT)
        )
    }

    fn object_url(&self, object: &ObjectRef) -> String {
        format!(
            "{}/b/{}/o/{}",
            self.config.endpoint.trim_end_matches('/'),
            utf8_percent_encode(&object.bucket, PATH_SEGMENT),
            utf8_percent_encode(&object.key, PATH_SEGMENT)
        )
    }
}

/// Map an upload response status onto the outcome the pipeline cares about
fn upload_outcome(status: StatusCode, bucket: &str, body: &str) -> Result<()> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(CloudsubError::Upload(format!(
            "Bucket '{}' does not exist",
            bucket
        ))),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CloudsubError::Upload(format!(
            "Permission denied for bucket '{}' ({}): {}",
            bucket, status, body
        ))),
        _ => Err(CloudsubError::Upload(format!(
            "Cloud Storage returned {}: {}",
            status, body
        ))),
    }
}

/// Deleting an object that no longer exists counts as success
fn delete_outcome(status: StatusCode, object: &ObjectRef, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        debug!("{} was already deleted", object);
        return Ok(());
    }
    Err(CloudsubError::Storage(format!(
        "Failed to delete {} ({}): {}",
        object, status, body
    )))
}

#[async_trait]
impl ObjectStore for GcsStorage {
    async fn upload(&self, local_path: &Path, bucket: &str) -> Result<ObjectRef> {
        let object = ObjectRef::new(bucket, self.generate_key());
        info!("Uploading {} to {}", local_path.display(), object);

        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| CloudsubError::Upload(e.to_string()))?;

        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| CloudsubError::Upload(format!("Failed to open {}: {}", local_path.display(), e)))?;
        let length = file
            .metadata()
            .await
            .map_err(|e| CloudsubError::Upload(format!("Failed to stat {}: {}", local_path.display(), e)))?
            .len();

        let response = self
            .client
            .post(self.upload_url(bucket))
            .query(&[("uploadType", "media"), ("name", object.key.as_str())])
            .bearer_auth(token)
            .header(header::CONTENT_TYPE, "audio/wav")
            .header(header::CONTENT_LENGTH, length)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|e| CloudsubError::Upload(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        upload_outcome(status, bucket, &body)?;

        info!("Audio uploaded to {}", object);
        Ok(object)
    }

    async fn delete(&self, object: &ObjectRef) -> Result<()> {
        debug!("Deleting {}", object);

        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| CloudsubError::Storage(e.to_string()))?;

        let response = self
            .client
            .delete(self.object_url(object))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CloudsubError::Storage(format!("Delete request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        delete_outcome(status, object, &body)
    }
}
