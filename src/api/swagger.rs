use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LMS Server API",
        version = "1.0.0",
        description = "Course authoring and catalogue API.\n\n**Authentication:** instructor, media and enrollment endpoints require a JWT Bearer token from `/auth/login`.\n\n**Roles:** `instructor` accounts author courses and manage media; `student` accounts browse and enroll."
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::check_auth,
        crate::api::auth::update_theme,

        // Instructor
        crate::api::courses::get_instructor_courses,
        crate::api::courses::add_course,
        crate::api::courses::get_instructor_course_details,
        crate::api::courses::update_course,

        // Student
        crate::api::courses::get_catalog,
        crate::api::courses::get_course_details,
        crate::api::courses::get_purchase_info,
        crate::api::courses::enroll,

        // Media
        crate::api::media::delete_media,
        crate::api::media::upload_media,
        crate::api::media::bulk_upload,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,
    ),
    components(
        schemas(
            crate::models::Role,
            crate::models::Theme,
            crate::models::UserSummary,
            crate::models::Lecture,
            crate::models::CourseLanding,
            crate::models::CourseRequest,
            crate::models::CourseView,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::LoginData,
            crate::services::auth_service::ThemeRequest,
            crate::services::media_service::DeleteMediaRequest,
            crate::services::media_service::BulkFile,
            crate::services::media_service::BulkUploadRequest,
            crate::services::media_service::BulkUploadedFile,
            crate::services::media_service::BulkFailure,
            crate::services::media_service::BulkUploadReport,
            crate::services::media_service::UploadedMedia,
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login and token checks."),
        (name = "Instructor", description = "Course authoring for instructor accounts."),
        (name = "Student", description = "Public catalogue, course details and enrollment."),
        (name = "Media", description = "Upload and delete lecture videos and course images in object storage."),
        (name = "Health", description = "Liveness and counters for monitoring."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token returned by /auth/login"))
                        .build(),
                ),
            );
        }
    }
}
