use actix_web::{http::header, web, HttpRequest, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::middleware::auth::Claims;
use crate::models::Role;
use crate::services::media_service::{
    self, BulkUploadReport, BulkUploadRequest, DeleteMediaRequest, DeleteOutcome, UploadedMedia,
};
use crate::state::AppState;
use crate::utils::AppError;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Client-side file name; the stored path is `courses/<millis>-<fileName>`
    pub file_name: String,
}

#[utoipa::path(
    delete,
    path = "/media/delete",
    tag = "Media",
    request_body = DeleteMediaRequest,
    responses(
        (status = 200, description = "File deleted"),
        (status = 400, description = "File path missing"),
        (status = 404, description = "File not found in storage"),
        (status = 500, description = "Storage failure")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_media(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    request: web::Json<DeleteMediaRequest>,
) -> HttpResponse {
    log::info!("🗑️ DELETE /media/delete - {}", request.file_path);

    let outcome: Result<DeleteOutcome, AppError> = async {
        claims.require_role(Role::Instructor)?;
        let storage = state.storage()?;
        media_service::delete_media(storage.as_ref(), &request.file_path).await
    }
    .await;

    match outcome {
        Ok(DeleteOutcome::Deleted) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "File deleted successfully."
        })),
        Ok(DeleteOutcome::NotFound) => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "message": "File not found in storage."
        })),
        Err(e) => {
            log::warn!("❌ Failed to delete {}: {}", request.file_path, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/media/upload",
    tag = "Media",
    params(UploadQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "File stored", body = UploadedMedia),
        (status = 400, description = "Empty body or missing file name")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_media(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    req: HttpRequest,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> HttpResponse {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    log::info!(
        "📤 POST /media/upload - {} ({} bytes, {})",
        query.file_name,
        body.len(),
        content_type
    );

    let outcome: Result<UploadedMedia, AppError> = async {
        claims.require_role(Role::Instructor)?;
        let storage = state.storage()?;
        media_service::upload_media(storage.as_ref(), &query.file_name, &content_type, body.to_vec()).await
    }
    .await;

    match outcome {
        Ok(media) => {
            crate::api::metrics::add_uploaded_bytes(body.len() as u64);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "data": media
            }))
        }
        Err(e) => {
            log::warn!("❌ Upload of {} failed: {}", query.file_name, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/media/bulk-upload",
    tag = "Media",
    request_body = BulkUploadRequest,
    responses(
        (status = 200, description = "Per-file results", body = BulkUploadReport),
        (status = 400, description = "No files provided")
    ),
    security(("bearer_auth" = []))
)]
pub async fn bulk_upload(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    request: web::Json<BulkUploadRequest>,
) -> HttpResponse {
    let request = request.into_inner();
    log::info!("📤 POST /media/bulk-upload - {} files", request.files.len());

    let outcome: Result<BulkUploadReport, AppError> = async {
        claims.require_role(Role::Instructor)?;
        let storage = state.storage()?;
        media_service::bulk_upload(storage.as_ref(), request.files).await
    }
    .await;

    match outcome {
        Ok(report) => {
            let bytes: u64 = report.uploaded_files.iter().map(|f| f.file_size).sum();
            crate::api::metrics::add_uploaded_bytes(bytes);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "data": report
            }))
        }
        Err(e) => {
            log::warn!("❌ Bulk upload failed: {}", e);
            e.error_response()
        }
    }
}
