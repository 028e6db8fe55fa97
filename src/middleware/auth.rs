use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

pub use crate::services::auth_service::Claims;
use crate::state::AppState;
use crate::utils::AppError;

/// Rejects requests without a valid bearer token and exposes the decoded
/// `Claims` to handlers through `web::ReqData<Claims>`.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = match (req.app_data::<web::Data<AppState>>(), bearer_token(&req)) {
            (Some(state), Some(token)) => state.tokens.verify(&token),
            (None, _) => Err(AppError::Internal("AppState missing from app data".to_string())),
            (_, None) => Err(AppError::Unauthorized("Missing bearer token".to_string())),
        };

        match claims {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res)
                })
            }
            Err(AppError::Unauthorized(reason)) => {
                log::warn!("🔒 {} {} rejected: {}", req.method(), req.path(), reason);
                crate::api::metrics::increment_rejected_auth_count();
                // Missing, malformed and expired tokens all look the same to the caller
                Box::pin(async move { Err(AppError::Unauthorized("Unauthorized".to_string()).into()) })
            }
            Err(e) => Box::pin(async move { Err(e.into()) }),
        }
    }
}
