use async_trait::async_trait;
use reqwest::{header, StatusCode};
use std::sync::Arc;

use super::{ObjectStorage, ProgressFn, ServiceAccount, StorageError, StoredObject, UploadProgress};

const STORAGE_API_BASE: &str = "https://storage.googleapis.com/storage/v1";
const UPLOAD_API_BASE: &str = "https://storage.googleapis.com/upload/storage/v1";
const DOWNLOAD_BASE: &str = "https://firebasestorage.googleapis.com/v0";

/// Resumable chunks must be multiples of 256 KiB
const CHUNK_UNIT: usize = 256 * 1024;
const CHUNK_SIZE: usize = 32 * CHUNK_UNIT;
/// Consecutive `308` answers without new bytes before the upload is abandoned
const MAX_STALLED_CHUNKS: u32 = 3;

/// Firebase storage bucket accessed through the Cloud Storage JSON API
pub struct GcsStorage {
    bucket: String,
    credentials: Arc<ServiceAccount>,
    http: reqwest::Client,
    storage_api: String,
    upload_api: String,
    download_base: String,
    chunk_size: usize,
}

impl GcsStorage {
    pub fn new(bucket: &str, credentials: Arc<ServiceAccount>, http: reqwest::Client) -> Self {
        Self {
            bucket: bucket.to_string(),
            credentials,
            http,
            storage_api: STORAGE_API_BASE.to_string(),
            upload_api: UPLOAD_API_BASE.to_string(),
            download_base: DOWNLOAD_BASE.to_string(),
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Points the adapter at another host, e.g. a storage emulator
    pub fn with_endpoints(mut self, storage_api: &str, upload_api: &str, download_base: &str) -> Self {
        self.storage_api = storage_api.trim_end_matches('/').to_string();
        self.upload_api = upload_api.trim_end_matches('/').to_string();
        self.download_base = download_base.trim_end_matches('/').to_string();
        self
    }

    /// Rounded up to the next multiple of 256 KiB
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1).div_ceil(CHUNK_UNIT) * CHUNK_UNIT;
        self
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/b/{}/o/{}",
            self.storage_api,
            self.bucket,
            urlencoding::encode(path)
        )
    }

    fn download_url(&self, path: &str, token: &str) -> String {
        format!(
            "{}/b/{}/o/{}?alt=media&token={}",
            self.download_base,
            self.bucket,
            urlencoding::encode(path),
            token
        )
    }

    async fn start_session(
        &self,
        path: &str,
        content_type: &str,
        total: u64,
        download_token: &str,
    ) -> Result<String, StorageError> {
        let token = self.credentials.access_token().await?;
        let url = format!(
            "{}/b/{}/o?uploadType=resumable&name={}",
            self.upload_api,
            self.bucket,
            urlencoding::encode(path)
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", total.to_string())
            .json(&serde_json::json!({
                "name": path,
                "contentType": content_type,
                "metadata": { "firebaseStorageDownloadTokens": download_token }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| StorageError::Request("Resumable session without Location header".to_string()))
    }

    /// PUTs `data` into the session chunk by chunk. After a `308` the next chunk
    /// starts where the server says its copy ends, which may be mid-chunk.
    async fn send_chunks(
        &self,
        session: &str,
        path: &str,
        data: &[u8],
        progress: ProgressFn<'_>,
    ) -> Result<(), StorageError> {
        let total = data.len();
        let mut offset = 0usize;
        let mut stalled = 0u32;

        while offset < total {
            let end = (offset + self.chunk_size).min(total);
            let response = self
                .http
                .put(session)
                .header(header::CONTENT_RANGE, format!("bytes {}-{}/{}", offset, end - 1, total))
                .body(data[offset..end].to_vec())
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                progress(UploadProgress {
                    bytes_transferred: total as u64,
                    total: total as u64,
                });
                return Ok(());
            }
            if status != StatusCode::PERMANENT_REDIRECT {
                return Err(http_error(response).await);
            }

            let persisted = persisted_bytes(response.headers()).min(total);
            if persisted > offset {
                stalled = 0;
            } else {
                stalled += 1;
                log::warn!("⚠️ Upload of {} made no progress past byte {}", path, offset);
                if stalled >= MAX_STALLED_CHUNKS {
                    return Err(StorageError::Request(format!(
                        "Upload of {} stalled at byte {}",
                        path, offset
                    )));
                }
            }

            offset = persisted;
            progress(UploadProgress {
                bytes_transferred: offset as u64,
                total: total as u64,
            });
        }

        Err(StorageError::Request(format!(
            "Upload session for {} was not finalized",
            path
        )))
    }
}

async fn http_error(response: reqwest::Response) -> StorageError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StorageError::Http { status, body }
}

/// Bytes the server holds after a `308`, read from `Range: bytes=0-<last>`.
/// No header means nothing was stored yet.
fn persisted_bytes(headers: &header::HeaderMap) -> usize {
    headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().strip_prefix("bytes=0-"))
        .and_then(|last| last.parse::<usize>().ok())
        .map_or(0, |last| last + 1)
}

#[async_trait]
impl ObjectStorage for GcsStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let token = self.credentials.access_token().await?;
        let response = self.http.get(self.object_url(path)).bearer_auth(&token).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            _ => Err(http_error(response).await),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let token = self.credentials.access_token().await?;
        let response = self.http.delete(self.object_url(path)).bearer_auth(&token).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(path.to_string())),
            s if s.is_success() => {
                log::info!("🗑️ Deleted {} from bucket {}", path, self.bucket);
                Ok(())
            }
            _ => Err(http_error(response).await),
        }
    }

    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        data: Vec<u8>,
        progress: ProgressFn<'_>,
    ) -> Result<StoredObject, StorageError> {
        let total = data.len() as u64;
        let download_token = uuid::Uuid::new_v4().to_string();
        let session = self.start_session(path, content_type, total, &download_token).await?;

        log::info!("📤 Uploading {} ({} bytes) to bucket {}", path, total, self.bucket);
        progress(UploadProgress { bytes_transferred: 0, total });

        if data.is_empty() {
            let response = self
                .http
                .put(&session)
                .header(header::CONTENT_RANGE, "bytes */0")
                .header(header::CONTENT_LENGTH, "0")
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(http_error(response).await);
            }
        } else {
            self.send_chunks(&session, path, &data, progress).await?;
        }

        Ok(StoredObject {
            path: path.to_string(),
            url: self.download_url(path, &download_token),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fake_google::{Harness, BUCKET};
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[actix_web::test]
    async fn large_upload_is_sent_in_exact_chunks() {
        let harness = Harness::start().await;
        let storage = harness.storage().with_chunk_size(256 * 1024);
        let data = payload(600_000);
        let seen = Mutex::new(Vec::new());
        let record = |p: UploadProgress| seen.lock().unwrap().push(p.bytes_transferred);

        let stored = storage
            .upload("courses/1-intro.mp4", "video/mp4", data.clone(), &record)
            .await
            .unwrap();

        assert_eq!(
            *harness.google.content_ranges.lock().unwrap(),
            vec![
                "bytes 0-262143/600000",
                "bytes 262144-524287/600000",
                "bytes 524288-599999/600000"
            ]
        );
        assert_eq!(*harness.google.received.lock().unwrap(), data);
        assert_eq!(seen.into_inner().unwrap(), vec![0, 262_144, 524_288, 600_000]);

        let sessions = harness.google.sessions.lock().unwrap();
        assert_eq!(sessions[0].0, "courses/1-intro.mp4");
        let token = sessions[0].1["metadata"]["firebaseStorageDownloadTokens"].as_str().unwrap();
        assert_eq!(stored.path, "courses/1-intro.mp4");
        assert_eq!(
            stored.url,
            format!("{}/v0/b/{}/o/courses%2F1-intro.mp4?alt=media&token={}", harness.base, BUCKET, token)
        );
    }

    #[actix_web::test]
    async fn resumes_from_the_range_the_server_reports() {
        let harness = Harness::start().await;
        harness.google.short_write_next.store(true, Ordering::SeqCst);
        let storage = harness.storage().with_chunk_size(256 * 1024);
        let data = payload(600_000);

        storage
            .upload("courses/2-lesson.mp4", "video/mp4", data.clone(), &|_| {})
            .await
            .unwrap();

        assert_eq!(
            *harness.google.content_ranges.lock().unwrap(),
            vec![
                "bytes 0-262143/600000",
                "bytes 131072-393215/600000",
                "bytes 393216-599999/600000"
            ]
        );
        assert_eq!(*harness.google.received.lock().unwrap(), data);
    }

    #[actix_web::test]
    async fn empty_file_finalizes_with_an_open_range() {
        let harness = Harness::start().await;
        let storage = harness.storage();

        let stored = storage
            .upload("courses/3-empty.txt", "text/plain", Vec::new(), &|_| {})
            .await
            .unwrap();

        assert_eq!(*harness.google.content_ranges.lock().unwrap(), vec!["bytes */0"]);
        assert_eq!(stored.path, "courses/3-empty.txt");
    }

    #[actix_web::test]
    async fn delete_and_exists_follow_the_bucket() {
        let harness = Harness::start().await;
        harness
            .google
            .objects
            .lock()
            .unwrap()
            .insert("courses/4-kept.mp4".to_string());
        let storage = harness.storage();

        let missing = storage.delete("courses/4-missing.mp4").await.unwrap_err();
        assert!(matches!(missing, StorageError::NotFound(ref p) if p == "courses/4-missing.mp4"));

        assert!(storage.exists("courses/4-kept.mp4").await.unwrap());
        storage.delete("courses/4-kept.mp4").await.unwrap();
        assert!(!storage.exists("courses/4-kept.mp4").await.unwrap());

        assert_eq!(harness.google.token_requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn chunk_size_is_rounded_to_whole_units() {
        let offline = Harness {
            google: Default::default(),
            base: "http://127.0.0.1:9".to_string(),
        };
        let storage = GcsStorage::new(BUCKET, offline.account(), reqwest::Client::new());
        assert_eq!(storage.chunk_size, CHUNK_SIZE);
        let storage = storage.with_chunk_size(300 * 1024);
        assert_eq!(storage.chunk_size, 2 * CHUNK_UNIT);
    }

    #[test]
    fn persisted_bytes_reads_the_range_header() {
        let mut headers = header::HeaderMap::new();
        assert_eq!(persisted_bytes(&headers), 0);
        headers.insert(header::RANGE, header::HeaderValue::from_static("bytes=0-131071"));
        assert_eq!(persisted_bytes(&headers), 131_072);
    }
}
