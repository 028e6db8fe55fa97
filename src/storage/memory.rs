use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ObjectStorage, ProgressFn, StorageError, StoredObject, UploadProgress};

const MOCK_BASE_URL: &str = "https://mock-storage.com/uploads";
const MOCK_CHUNK: usize = 64 * 1024;

/// In-process bucket used by mock mode and tests
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail: AtomicBool,
    delete_calls: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with a request error
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(path))
            .unwrap_or(false)
    }

    pub fn insert(&self, path: &str, data: Vec<u8>) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(path.to_string(), data);
        }
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::Request("storage unavailable".to_string()));
        }
        Ok(())
    }

    fn poisoned() -> StorageError {
        StorageError::Request("storage lock poisoned".to_string())
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.check()?;
        Ok(self.contains(path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        let mut objects = self.objects.lock().map_err(|_| Self::poisoned())?;
        match objects.remove(path) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(path.to_string())),
        }
    }

    async fn upload(
        &self,
        path: &str,
        _content_type: &str,
        data: Vec<u8>,
        progress: ProgressFn<'_>,
    ) -> Result<StoredObject, StorageError> {
        self.check()?;

        let total = data.len() as u64;
        progress(UploadProgress { bytes_transferred: 0, total });
        let mut sent = 0u64;
        for chunk in data.chunks(MOCK_CHUNK) {
            sent += chunk.len() as u64;
            progress(UploadProgress { bytes_transferred: sent, total });
        }

        self.objects
            .lock()
            .map_err(|_| Self::poisoned())?
            .insert(path.to_string(), data);

        Ok(StoredObject {
            path: path.to_string(),
            url: format!("{}/{}", MOCK_BASE_URL, path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_reports_progress_until_complete() {
        let storage = MemoryStorage::new();
        let seen = Mutex::new(Vec::new());
        let record = |p: UploadProgress| seen.lock().unwrap().push(p.percent());

        let stored = storage
            .upload("courses/1-a.mp4", "video/mp4", vec![0u8; 200 * 1024], &record)
            .await
            .unwrap();

        assert_eq!(stored.url, "https://mock-storage.com/uploads/courses/1-a.mp4");
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.first(), Some(&0.0));
        assert_eq!(seen.last(), Some(&100.0));
        assert!(storage.exists("courses/1-a.mp4").await.unwrap());
    }

    #[tokio::test]
    async fn deleting_missing_object_is_not_found() {
        let storage = MemoryStorage::new();
        let err = storage.delete("courses/missing.mp4").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert_eq!(storage.delete_calls(), 1);
    }
}
