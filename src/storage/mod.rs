// Cloud object storage for the extracted audio
//
// The recognition service reads audio from a bucket, so the pipeline uploads
// the WAV file under a fresh key and removes it again once the job is over.

pub mod gcs;

use async_trait::async_trait;
use std::fmt;
use std::path::Path;

use crate::error::Result;

pub use gcs::GcsStorage;

/// Bucket and key of an uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new<B: Into<String>, K: Into<String>>(bucket: B, key: K) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// `gs://bucket/key` form understood by the recognition service
    pub fn uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.key)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Main trait for object storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under a newly generated key
    async fn upload(&self, local_path: &Path, bucket: &str) -> Result<ObjectRef>;

    /// Delete an object. Deleting an object that is already gone succeeds.
    async fn delete(&self, object: &ObjectRef) -> Result<()>;
}
