use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::StorageError;
use crate::config::FirebaseConfig;

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SCOPES: &str = "https://www.googleapis.com/auth/cloud-platform \
https://www.googleapis.com/auth/devstorage.full_control \
https://www.googleapis.com/auth/identitytoolkit";
// Refresh a minute before Google says the token expires
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

/// OAuth access tokens for the service account, minted with a signed JWT assertion.
pub struct ServiceAccount {
    client_email: String,
    key: EncodingKey,
    http: reqwest::Client,
    token_uri: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccount {
    pub fn new(config: &FirebaseConfig, http: reqwest::Client) -> Result<Self, StorageError> {
        let key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())
            .map_err(|e| StorageError::Auth(format!("Invalid service account private key: {}", e)))?;

        Ok(Self {
            client_email: config.client_email.clone(),
            key,
            http,
            token_uri: TOKEN_URI.to_string(),
            cached: Mutex::new(None),
        })
    }

    /// Exchanges assertions at another OAuth endpoint; also used as the assertion audience
    pub fn with_token_uri(mut self, token_uri: &str) -> Self {
        self.token_uri = token_uri.to_string();
        self
    }

    fn sign_assertion(&self, now: i64) -> Result<String, StorageError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPES,
            aud: &self.token_uri,
            iat: now,
            exp: now + 3600,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| StorageError::Auth(format!("Failed to sign assertion: {}", e)))
    }

    pub async fn access_token(&self) -> Result<String, StorageError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - EXPIRY_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        log::debug!("🔑 Requesting access token for {}", self.client_email);

        let assertion = self.sign_assertion(now)?;
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Auth(format!("Token endpoint returned {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: now + token.expires_in,
        });

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fake_google::Harness;
    use std::sync::atomic::Ordering;

    #[actix_web::test]
    async fn token_is_reused_while_it_is_fresh() {
        let harness = Harness::start().await;
        let account = harness.account();

        assert_eq!(account.access_token().await.unwrap(), "token-1");
        assert_eq!(account.access_token().await.unwrap(), "token-1");
        assert_eq!(harness.google.token_requests.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn token_inside_the_expiry_margin_is_replaced() {
        let harness = Harness::start().await;
        harness
            .google
            .token_lifetime_secs
            .store(EXPIRY_MARGIN_SECS - 1, Ordering::SeqCst);
        let account = harness.account();

        assert_eq!(account.access_token().await.unwrap(), "token-1");
        assert_eq!(account.access_token().await.unwrap(), "token-2");
    }

    #[test]
    fn malformed_private_key_is_rejected() {
        let config = FirebaseConfig {
            project_id: "lms-test".into(),
            client_email: "uploader@lms-test.iam.gserviceaccount.com".into(),
            private_key: "not a key".into(),
            storage_bucket: "lms-test.appspot.com".into(),
        };
        assert!(matches!(
            ServiceAccount::new(&config, reqwest::Client::new()),
            Err(StorageError::Auth(_))
        ));
    }
}
