use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

use super::{image_key, ImageStore, ImageStoreError};

/// Filesystem-backed image store. Files land under the base path and are
/// served from `/images/{key}` by whatever fronts this API.
pub struct LocalImageStore {
    base_path: PathBuf,
}

impl LocalImageStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save_image(
        &self,
        user_id: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<String, ImageStoreError> {
        let key = image_key(user_id, filename);
        tokio::fs::create_dir_all(&self.base_path).await?;
        tokio::fs::write(self.base_path.join(&key), &data).await?;
        Ok(format!("/images/{}", key))
    }
}
