use async_trait::async_trait;
use std::sync::Arc;

use super::{ServiceAccount, StorageError};

const IDENTITY_API_BASE: &str = "https://identitytoolkit.googleapis.com/v1";

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Replaces the custom claims attached to `uid`.
    async fn set_custom_claims(&self, uid: &str, claims: serde_json::Value) -> Result<(), StorageError>;
}

pub struct FirebaseIdentity {
    project_id: String,
    credentials: Arc<ServiceAccount>,
    http: reqwest::Client,
    api_base: String,
}

impl FirebaseIdentity {
    pub fn new(project_id: &str, credentials: Arc<ServiceAccount>, http: reqwest::Client) -> Self {
        Self {
            project_id: project_id.to_string(),
            credentials,
            http,
            api_base: IDENTITY_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn set_custom_claims(&self, uid: &str, claims: serde_json::Value) -> Result<(), StorageError> {
        let token = self.credentials.access_token().await?;
        let url = format!(
            "{}/projects/{}/accounts:update",
            self.api_base, self.project_id
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&serde_json::json!({
                "localId": uid,
                // The API expects the claims as a JSON-encoded string
                "customAttributes": claims.to_string(),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Http { status, body });
        }

        Ok(())
    }
}
