//! Pluggable image storage: persist a blob under a user/filename key and
//! hand back a retrievable URL.

pub mod local;
pub mod s3;

pub use local::LocalImageStore;
pub use s3::S3ImageStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ImageBackend, ImageConfig};

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object storage error: {0}")]
    ObjectStorage(String),
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist the blob and return the URL it will be served from.
    async fn save_image(
        &self,
        user_id: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<String, ImageStoreError>;
}

/// Deterministic object key `{user_id}-{filename}`; a second upload with the
/// same name silently overwrites the first.
pub fn image_key(user_id: &str, filename: &str) -> String {
    format!("{}-{}", user_id, filename)
}

/// Build the configured backend. The S3 backend also ensures its bucket and
/// CORS policy exist before the first upload.
pub async fn from_config(config: &ImageConfig) -> Result<Arc<dyn ImageStore>, ImageStoreError> {
    match config.backend {
        ImageBackend::Local => Ok(Arc::new(LocalImageStore::new(&config.local_path))),
        ImageBackend::S3 => {
            let store = S3ImageStore::connect(config).await;
            store.ensure_bucket_and_cors().await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_user_prefixed() {
        assert_eq!(image_key("u1", "avatar.png"), "u1-avatar.png");
    }
}
