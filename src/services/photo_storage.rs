use std::collections::HashMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::order::{OrderNumber, PhotoReference};

// ============================================================================
// Photo Storage - where finished-product photos live
// ============================================================================
//
// put() returns the public reference (URL path) recorded on the order.
// The in-memory backend serves that same path from GET /photos/{order}/{file}.
//
// ============================================================================

pub const PHOTO_PATH_PREFIX: &str = "/photos";

/// Photo payload as received from the admin upload
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StoredPhoto {
    pub content_type: String,
    pub original_filename: String,
    pub bytes: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Photo storage unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid photo key: {0}")]
    InvalidKey(String),
}

#[async_trait]
pub trait PhotoStorage: Send + Sync {
    async fn put(&self, order_number: &OrderNumber, photo: PhotoUpload) -> Result<PhotoReference, StorageError>;

    /// Look up a photo by the reference `put` returned
    async fn get(&self, reference: &str) -> Result<Option<StoredPhoto>, StorageError>;

    /// Returns false if nothing was stored under the reference
    async fn remove(&self, reference: &PhotoReference) -> Result<bool, StorageError>;
}

#[derive(Default)]
pub struct InMemoryPhotoStorage {
    photos: RwLock<HashMap<String, StoredPhoto>>,
}

impl InMemoryPhotoStorage {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.photos.read().await.len()
    }
}

#[async_trait]
impl PhotoStorage for InMemoryPhotoStorage {
    async fn put(&self, order_number: &OrderNumber, photo: PhotoUpload) -> Result<PhotoReference, StorageError> {
        let reference = format!(
            "{}/{}/{}.{}",
            PHOTO_PATH_PREFIX,
            order_number,
            Uuid::new_v4(),
            file_extension(&photo.content_type, &photo.filename)
        );

        let stored = StoredPhoto {
            content_type: photo.content_type,
            original_filename: photo.filename,
            bytes: photo.bytes,
            stored_at: Utc::now(),
        };

        tracing::debug!(
            reference = %reference,
            size = stored.bytes.len(),
            "Stored photo"
        );

        self.photos.write().await.insert(reference.clone(), stored);
        Ok(PhotoReference::new(reference))
    }

    async fn get(&self, reference: &str) -> Result<Option<StoredPhoto>, StorageError> {
        if !reference.starts_with(PHOTO_PATH_PREFIX) {
            return Err(StorageError::InvalidKey(reference.to_string()));
        }
        Ok(self.photos.read().await.get(reference).cloned())
    }

    async fn remove(&self, reference: &PhotoReference) -> Result<bool, StorageError> {
        Ok(self.photos.write().await.remove(reference.as_str()).is_some())
    }
}

/// Extension for the stored file, from the content type first and the
/// uploaded filename second
fn file_extension(content_type: &str, filename: &str) -> String {
    let by_type = match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    };
    if let Some(ext) = by_type {
        return ext.to_string();
    }

    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}
