pub mod auth;
pub mod courses;
pub mod health;
pub mod media;
pub mod metrics;
pub mod swagger;

use actix_web::{web, HttpRequest};
use std::fmt;

use crate::middleware::AuthMiddleware;
use crate::utils::AppError;

/// Largest raw body `/media/upload` accepts
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
/// `/media/bulk-upload` carries base64, a third larger than the raw bytes
pub const MAX_BULK_UPLOAD_BYTES: usize = MAX_UPLOAD_BYTES / 3 * 4;

/// Malformed bodies, query strings and path segments get the same JSON envelope as handler errors
fn reject_extraction<E: fmt::Display>(err: E, req: &HttpRequest) -> actix_web::Error {
    log::warn!("⚠️ Rejected {} {}: {}", req.method(), req.path(), err);
    AppError::InvalidRequest(err.to_string()).into()
}

/// Registers every route of the service. Shared by `main` and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .app_data(web::JsonConfig::default().error_handler(reject_extraction))
        .app_data(web::QueryConfig::default().error_handler(reject_extraction))
        .app_data(web::PathConfig::default().error_handler(reject_extraction))
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Metrics
        .route("/metrics", web::get().to(metrics::get_metrics))
        // Auth endpoints
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .service(
                    web::resource("/check-auth")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(auth::check_auth)),
                )
                .service(
                    web::resource("/user/theme")
                        .wrap(AuthMiddleware)
                        .route(web::put().to(auth::update_theme)),
                ),
        )
        // ==================== INSTRUCTOR ====================
        .service(
            web::scope("/instructor/course")
                .wrap(AuthMiddleware)
                .route("/get", web::get().to(courses::get_instructor_courses))
                .route("/add", web::post().to(courses::add_course))
                .route("/get/details/{id}", web::get().to(courses::get_instructor_course_details))
                .route("/update/{id}", web::put().to(courses::update_course)),
        )
        // ==================== STUDENT ====================
        .service(
            web::scope("/student/course")
                .route("/get", web::get().to(courses::get_catalog))
                .route("/get/details/{id}", web::get().to(courses::get_course_details))
                .service(
                    web::resource("/purchase-info/{id}")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(courses::get_purchase_info)),
                )
                .service(
                    web::resource("/enroll/{id}")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(courses::enroll)),
                ),
        )
        // ==================== MEDIA ====================
        .service(
            web::scope("/media")
                .wrap(AuthMiddleware)
                .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
                .app_data(
                    web::JsonConfig::default()
                        .limit(MAX_BULK_UPLOAD_BYTES)
                        .error_handler(reject_extraction),
                )
                .route("/delete", web::delete().to(media::delete_media))
                .route("/upload", web::post().to(media::upload_media))
                .route("/bulk-upload", web::post().to(media::bulk_upload)),
        );
}
