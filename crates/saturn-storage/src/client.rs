//! Blob storage client.

use crate::error::StorageError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Abstraction over object storage get/put, addressed by `(bucket, name)`.
///
/// The GCP bucket/object API itself is a black box here; implementations
/// only need to round-trip bytes for a given bucket and name.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn get_file(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError>;
    async fn upload_file(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<(), StorageError>;
}

/// Talks to a REST object store over HTTP: `GET {base}/{bucket}/{name}`,
/// `PUT {base}/{bucket}/{name}`.
pub struct ObjectStoreClient {
    client: reqwest::Client,
    base_url: String,
}

impl ObjectStoreClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StorageClient for ObjectStoreClient {
    async fn get_file(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        let url = format!("{}/{}/{}", self.base_url, bucket, name);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::UnexpectedStatus {
                status: response.status().as_u16(),
                bucket: bucket.to_string(),
                name: name.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        tracing::debug!(bucket, name, size = bytes.len(), "downloaded blob");
        Ok(bytes.to_vec())
    }

    async fn upload_file(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let url = format!("{}/{}/{}", self.base_url, bucket, name);
        let size = data.len();
        let response = self.client.put(&url).body(data).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::UnexpectedStatus {
                status: response.status().as_u16(),
                bucket: bucket.to_string(),
                name: name.to_string(),
            });
        }
        tracing::debug!(bucket, name, size, "uploaded blob");
        Ok(())
    }
}

/// Local-filesystem backed storage for development and tests: buckets are
/// directories under a root, names are relative file paths within them.
pub struct LocalFsStorage {
    root: PathBuf,
}

impl LocalFsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, bucket: &str, name: &str) -> PathBuf {
        self.root.join(bucket).join(name)
    }
}

#[async_trait]
impl StorageClient for LocalFsStorage {
    async fn get_file(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(bucket, name);
        Ok(tokio::fs::read(path).await?)
    }

    async fn upload_file(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(bucket, name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, data).await?;
        Ok(())
    }
}
