//! Adapters for the external object store and identity provider.

#[cfg(test)]
pub(crate) mod fake_google;
pub mod gcs;
pub mod identity;
pub mod memory;
pub mod service_account;

use async_trait::async_trait;
use std::fmt;

pub use gcs::GcsStorage;
pub use identity::{FirebaseIdentity, IdentityProvider};
pub use memory::MemoryStorage;
pub use service_account::ServiceAccount;

#[derive(Debug)]
pub enum StorageError {
    NotFound(String),
    Auth(String),
    Http { status: u16, body: String },
    Request(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(path) => write!(f, "Object not found: {}", path),
            StorageError::Auth(msg) => write!(f, "Credential error: {}", msg),
            StorageError::Http { status, body } => write!(f, "Storage API returned {}: {}", status, body),
            StorageError::Request(msg) => write!(f, "Storage request failed: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Request(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_transferred: u64,
    pub total: u64,
}

impl UploadProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.bytes_transferred as f64 / self.total as f64) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
}

pub type ProgressFn<'a> = &'a (dyn Fn(UploadProgress) + Send + Sync);

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Fails with `StorageError::NotFound` when there is nothing at `path`.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        data: Vec<u8>,
        progress: ProgressFn<'_>,
    ) -> Result<StoredObject, StorageError>;
}

/// Object path for a freshly uploaded course file
pub fn course_object_path(file_name: &str) -> String {
    let name: String = file_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("courses/{}-{}", chrono::Utc::now().timestamp_millis(), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percentage() {
        let p = UploadProgress { bytes_transferred: 256, total: 1024 };
        assert_eq!(p.percent(), 25.0);
        let empty = UploadProgress { bytes_transferred: 0, total: 0 };
        assert_eq!(empty.percent(), 100.0);
    }

    #[test]
    fn object_path_is_under_courses_and_flat() {
        let path = course_object_path("../intro/video.mp4");
        assert!(path.starts_with("courses/"));
        assert!(path.ends_with("-.._intro_video.mp4"));
        assert_eq!(path.matches('/').count(), 1);
    }
}
