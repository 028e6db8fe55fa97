use actix_web::{web, HttpResponse, ResponseError};

use crate::middleware::auth::Claims;
use crate::services::auth_service::{self, LoginData, LoginRequest, RegisterRequest, ThemeRequest};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Missing fields, or user name / email already taken")
    )
)]
pub async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    log::info!("📝 POST /auth/register - email: {}", request.user_email);

    match auth_service::register(&state, &request).await {
        Ok(user) => {
            log::info!("✅ Registration successful: {}", user.user_email);
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "message": "User registered successfully!",
                "data": user
            }))
        }
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", request.user_email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginData),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.user_email);

    match auth_service::login(&state, &request).await {
        Ok(data) => {
            log::info!("✅ Login successful: {}", request.user_email);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Logged in successfully",
                "data": data
            }))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.user_email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/auth/check-auth",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid; returns the user"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn check_auth(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("✓ GET /auth/check-auth - user: {}", claims.id);

    match auth_service::get_current_user(&state, &claims).await {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": {
                "authenticate": true,
                "user": user
            }
        })),
        Err(e) => {
            log::warn!("❌ check-auth failed for {}: {}", claims.id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/auth/user/theme",
    tag = "Auth",
    request_body = ThemeRequest,
    responses(
        (status = 200, description = "Theme updated"),
        (status = 400, description = "Theme is not light or dark"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_theme(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    request: web::Json<ThemeRequest>,
) -> HttpResponse {
    match auth_service::update_theme(&state, &claims, &request.theme).await {
        Ok(theme) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": format!("Theme updated to {}", theme.as_str())
        })),
        Err(e) => {
            log::warn!("❌ Theme update failed for {}: {}", claims.id, e);
            e.error_response()
        }
    }
}
