use std::sync::Arc;

use crate::database::Repository;
use crate::services::auth_service::TokenIssuer;
use crate::storage::{IdentityProvider, ObjectStorage};
use crate::utils::AppError;

/// Shared by every handler through `web::Data`
pub struct AppState {
    pub db: Arc<dyn Repository>,
    pub tokens: TokenIssuer,
    pub storage: Option<Arc<dyn ObjectStorage>>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub mock_mode: bool,
}

impl AppState {
    pub fn storage(&self) -> Result<&Arc<dyn ObjectStorage>, AppError> {
        self.storage
            .as_ref()
            .ok_or_else(|| AppError::Internal("Storage is not configured".to_string()))
    }
}
