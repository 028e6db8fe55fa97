use actix_web::{web, HttpResponse, ResponseError};

use crate::middleware::auth::Claims;
use crate::models::{CourseRequest, CourseView};
use crate::services::course_service::{self, CatalogQuery};
use crate::state::AppState;

fn ok<T: serde::Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": data
    }))
}

// ==================== INSTRUCTOR ====================

#[utoipa::path(
    get,
    path = "/instructor/course/get",
    tag = "Instructor",
    responses(
        (status = 200, description = "Courses owned by the caller", body = [CourseView]),
        (status = 403, description = "Caller is not an instructor")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_instructor_courses(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    match course_service::list_instructor_courses(&state, &claims).await {
        Ok(courses) => ok(courses),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/instructor/course/add",
    tag = "Instructor",
    request_body = CourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseView),
        (status = 400, description = "Title missing"),
        (status = 403, description = "Caller is not an instructor")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_course(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    body: web::Json<CourseRequest>,
) -> HttpResponse {
    log::info!("📚 POST /instructor/course/add - {}", body.landing.title);

    match course_service::add_course(&state, &claims, body.into_inner()).await {
        Ok(course) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "message": "Course saved successfully",
            "data": course
        })),
        Err(e) => {
            log::warn!("❌ Course creation failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/instructor/course/get/details/{id}",
    tag = "Instructor",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = CourseView),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_instructor_course_details(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> HttpResponse {
    match course_service::instructor_course_details(&state, &claims, &path).await {
        Ok(course) => ok(course),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    put,
    path = "/instructor/course/update/{id}",
    tag = "Instructor",
    params(("id" = String, Path, description = "Course id")),
    request_body = CourseRequest,
    responses(
        (status = 200, description = "Course replaced", body = CourseView),
        (status = 403, description = "Caller does not own the course"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_course(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    body: web::Json<CourseRequest>,
) -> HttpResponse {
    let course_id = path.into_inner();
    log::info!("✏️ PUT /instructor/course/update/{}", course_id);

    match course_service::update_course(&state, &claims, &course_id, body.into_inner()).await {
        Ok(course) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Course updated successfully",
            "data": course
        })),
        Err(e) => {
            log::warn!("❌ Course update failed for {}: {}", course_id, e);
            e.error_response()
        }
    }
}

// ==================== STUDENT ====================

#[utoipa::path(
    get,
    path = "/student/course/get",
    tag = "Student",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Published courses", body = [CourseView]),
        (status = 400, description = "Unknown sortBy value")
    )
)]
pub async fn get_catalog(state: web::Data<AppState>, query: web::Query<CatalogQuery>) -> HttpResponse {
    match course_service::list_catalog(&state, &query).await {
        Ok(courses) => ok(courses),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    get,
    path = "/student/course/get/details/{id}",
    tag = "Student",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = CourseView),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course_details(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    match course_service::course_details(&state, &path).await {
        Ok(course) => ok(course),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    get,
    path = "/student/course/purchase-info/{id}",
    tag = "Student",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Whether the caller is enrolled"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_purchase_info(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> HttpResponse {
    match course_service::is_enrolled(&state, &claims, &path).await {
        Ok(enrolled) => ok(enrolled),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/student/course/enroll/{id}",
    tag = "Student",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrolled", body = CourseView),
        (status = 400, description = "Course is not published"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn enroll(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> HttpResponse {
    log::info!("🎓 POST /student/course/enroll/{} - user: {}", path, claims.id);

    match course_service::enroll(&state, &claims, &path).await {
        Ok(course) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Enrolled successfully",
            "data": course
        })),
        Err(e) => {
            log::warn!("❌ Enrollment failed: {}", e);
            e.error_response()
        }
    }
}
