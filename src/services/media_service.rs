use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::storage::{course_object_path, ObjectStorage, StorageError, StoredObject, UploadProgress};
use crate::utils::AppError;

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMediaRequest {
    #[serde(default)]
    pub file_path: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
}

impl From<StoredObject> for UploadedMedia {
    fn from(o: StoredObject) -> Self {
        UploadedMedia {
            url: o.url,
            public_id: o.path,
        }
    }
}

/// One file of a bulk upload, carried inline as standard base64
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkFile {
    pub file_name: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub data: String,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct BulkUploadRequest {
    #[serde(default)]
    pub files: Vec<BulkFile>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct BulkUploadedFile {
    pub public_id: String,
    pub secure_url: String,
    pub url: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileSize")]
    pub file_size: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub file_name: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkUploadReport {
    pub uploaded_files: Vec<BulkUploadedFile>,
    pub failed_files: Vec<BulkFailure>,
    pub total_files: usize,
    pub success_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Removes one object; a missing object is an outcome, not an error
pub async fn delete_media(storage: &dyn ObjectStorage, file_path: &str) -> Result<DeleteOutcome, AppError> {
    let file_path = file_path.trim();
    if file_path.is_empty() {
        return Err(AppError::InvalidRequest(
            "File path is required for deletion.".to_string(),
        ));
    }

    if !storage.exists(file_path).await? {
        return Ok(DeleteOutcome::NotFound);
    }

    match storage.delete(file_path).await {
        Ok(()) => {
            log::info!("🗑️ Successfully deleted {} from storage", file_path);
            Ok(DeleteOutcome::Deleted)
        }
        // Someone else removed it between the check and the delete
        Err(StorageError::NotFound(_)) => Ok(DeleteOutcome::NotFound),
        Err(e) => Err(AppError::StorageError(format!("Failed to delete {}: {}", file_path, e))),
    }
}

pub async fn upload_media(
    storage: &dyn ObjectStorage,
    file_name: &str,
    content_type: &str,
    data: Vec<u8>,
) -> Result<UploadedMedia, AppError> {
    let file_name = file_name.trim();
    if file_name.is_empty() {
        return Err(AppError::InvalidRequest("fileName is required".to_string()));
    }
    if data.is_empty() {
        return Err(AppError::InvalidRequest("Uploaded file is empty".to_string()));
    }

    let path = course_object_path(file_name);
    let stored = storage
        .upload(&path, content_type, data, &|p: UploadProgress| {
            log::debug!("📤 {}: {:.0}%", path, p.percent());
        })
        .await?;

    log::info!("✅ Uploaded {}", stored.path);
    Ok(UploadedMedia::from(stored))
}

/// Uploads each file in turn. A file that fails is reported and the rest still go through.
pub async fn bulk_upload(storage: &dyn ObjectStorage, files: Vec<BulkFile>) -> Result<BulkUploadReport, AppError> {
    if files.is_empty() {
        return Err(AppError::InvalidRequest("No files provided".to_string()));
    }

    let total_files = files.len();
    let mut uploaded_files = Vec::new();
    let mut failed_files = Vec::new();

    for file in files {
        let outcome = match base64::engine::general_purpose::STANDARD.decode(file.data.trim()) {
            Ok(bytes) => {
                let size = bytes.len() as u64;
                upload_media(storage, &file.file_name, &file.content_type, bytes)
                    .await
                    .map(|media| (media, size))
            }
            Err(e) => Err(AppError::InvalidRequest(format!("File data is not valid base64: {}", e))),
        };

        match outcome {
            Ok((media, file_size)) => uploaded_files.push(BulkUploadedFile {
                secure_url: media.url.clone(),
                url: media.url,
                public_id: media.public_id,
                file_name: file.file_name,
                file_size,
            }),
            Err(e) => {
                log::warn!("❌ Bulk upload of {} failed: {}", file.file_name, e);
                failed_files.push(BulkFailure {
                    file_name: file.file_name,
                    message: e.public_message(),
                });
            }
        }
    }

    Ok(BulkUploadReport {
        total_files,
        success_count: uploaded_files.len(),
        failed_count: failed_files.len(),
        uploaded_files,
        failed_files,
    })
}
