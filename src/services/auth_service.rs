use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::{Role, Theme, User, UserSummary};
use crate::state::AppState;
use crate::utils::AppError;

pub const TOKEN_TTL_MINUTES: i64 = 120;
const PASSWORD_HASH_COST: u32 = 10;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    pub role: Role,
    pub iat: usize, // issued at
    pub exp: usize, // expiration
}

impl Claims {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role != role {
            return Err(AppError::Forbidden(format!("This action requires the {} role", role)));
        }
        Ok(())
    }
}

/// Signs and verifies access tokens with the shared HS256 secret
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            ttl: Duration::minutes(TOKEN_TTL_MINUTES),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            id: user.id_hex(),
            user_name: user.user_name.clone(),
            user_email: user.user_email.clone(),
            role: user.role,
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

// Request/Response structures
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub access_token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ThemeRequest {
    pub theme: String,
}

/// Stamps the instructor role on the identity provider so storage rules allow uploads.
/// Failures are logged and never surface to the caller.
async fn sync_instructor_claim(state: &AppState, user: &User) {
    if user.role != Role::Instructor {
        return;
    }

    let Some(identity) = state.identity.as_ref() else {
        log::debug!("Identity provider not configured; skipping custom claim for {}", user.id_hex());
        return;
    };

    let uid = user.id_hex();
    match identity
        .set_custom_claims(&uid, serde_json::json!({ "role": "instructor" }))
        .await
    {
        Ok(()) => log::info!("🪪 Custom claim set for instructor: {}", uid),
        Err(e) => log::error!("❌ Error setting custom claim for {}: {}", uid, e),
    }
}

// User registration
pub async fn register(state: &AppState, request: &RegisterRequest) -> Result<UserSummary, AppError> {
    let user_name = request.user_name.trim();
    let user_email = request.user_email.trim();

    if user_name.is_empty() || user_email.is_empty() || request.password.is_empty() {
        return Err(AppError::InvalidRequest(
            "userName, userEmail and password are required".to_string(),
        ));
    }

    if state
        .db
        .find_user_by_email_or_name(user_email, user_name)
        .await?
        .is_some()
    {
        return Err(AppError::InvalidRequest(
            "User name or user email already exists".to_string(),
        ));
    }

    let hashed_password = hash_password(&request.password)?;

    let user = state
        .db
        .insert_user(User {
            id: None,
            user_name: user_name.to_string(),
            user_email: user_email.to_string(),
            password: hashed_password,
            role: request.role.unwrap_or(Role::Student),
            theme: None,
        })
        .await?;

    sync_instructor_claim(state, &user).await;

    Ok(UserSummary::from(&user))
}

// User login
pub async fn login(state: &AppState, request: &LoginRequest) -> Result<LoginData, AppError> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = state
        .db
        .find_user_by_email(request.user_email.trim())
        .await?
        .ok_or_else(invalid)?;

    // A malformed stored hash counts as a mismatch
    let valid = verify(&request.password, &user.password).unwrap_or(false);
    if !valid {
        return Err(invalid());
    }

    sync_instructor_claim(state, &user).await;

    let access_token = state.tokens.issue(&user)?;

    Ok(LoginData {
        access_token,
        user: UserSummary::from(&user),
    })
}

// Get current user
pub async fn get_current_user(state: &AppState, claims: &Claims) -> Result<UserSummary, AppError> {
    let user = state
        .db
        .find_user_by_id(&claims.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(UserSummary::from(&user))
}

pub async fn update_theme(state: &AppState, claims: &Claims, theme: &str) -> Result<Theme, AppError> {
    let theme = Theme::parse(theme).ok_or_else(|| {
        AppError::InvalidRequest("Invalid theme. Must be 'light' or 'dark'.".to_string())
    })?;

    if !state.db.set_user_theme(&claims.id, theme).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(theme)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, PASSWORD_HASH_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::MemoryDb;
    use crate::storage::{IdentityProvider, StorageError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub(crate) const SECRET: &str = "test-secret";

    pub(crate) struct FailingIdentity {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityProvider for FailingIdentity {
        async fn set_custom_claims(&self, _uid: &str, _claims: serde_json::Value) -> Result<(), StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Http { status: 503, body: "unavailable".into() })
        }
    }

    pub(crate) fn test_state() -> AppState {
        AppState {
            db: Arc::new(MemoryDb::new()),
            tokens: TokenIssuer::new(SECRET),
            storage: None,
            identity: None,
            mock_mode: true,
        }
    }

    fn register_request(name: &str, email: &str, role: Role) -> RegisterRequest {
        RegisterRequest {
            user_name: name.into(),
            user_email: email.into(),
            password: "password123".into(),
            role: Some(role),
        }
    }

    #[tokio::test]
    async fn registering_same_email_twice_fails() {
        let state = test_state();
        register(&state, &register_request("ada", "ada@example.com", Role::Student))
            .await
            .unwrap();

        let second = register(&state, &register_request("ada2", "ada@example.com", Role::Student)).await;
        assert!(matches!(second, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let state = test_state();
        register(&state, &register_request("ada", "ada@example.com", Role::Student))
            .await
            .unwrap();

        let result = login(
            &state,
            &LoginRequest { user_email: "ada@example.com".into(), password: "nope".into() },
        )
        .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        let unknown = login(
            &state,
            &LoginRequest { user_email: "ghost@example.com".into(), password: "password123".into() },
        )
        .await;
        assert!(matches!(unknown, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn login_token_decodes_to_user_and_expires_in_120_minutes() {
        let state = test_state();
        let registered = register(&state, &register_request("grace", "grace@example.com", Role::Instructor))
            .await
            .unwrap();

        let data = login(
            &state,
            &LoginRequest { user_email: "grace@example.com".into(), password: "password123".into() },
        )
        .await
        .unwrap();

        let claims = state.tokens.verify(&data.access_token).unwrap();
        assert_eq!(claims.id, registered.id);
        assert_eq!(claims.user_email, "grace@example.com");
        assert_eq!(claims.role, Role::Instructor);
        assert_eq!(claims.exp - claims.iat, (TOKEN_TTL_MINUTES * 60) as usize);
    }

    #[tokio::test]
    async fn instructor_login_survives_identity_provider_failure() {
        let identity = Arc::new(FailingIdentity { calls: AtomicUsize::new(0) });
        let mut state = test_state();
        state.identity = Some(identity.clone());

        register(&state, &register_request("ins", "ins@example.com", Role::Instructor))
            .await
            .unwrap();
        let data = login(
            &state,
            &LoginRequest { user_email: "ins@example.com".into(), password: "password123".into() },
        )
        .await;

        assert!(data.is_ok());
        // once at registration, once at login
        assert_eq!(identity.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let user = User {
            id: Some(mongodb::bson::oid::ObjectId::new()),
            user_name: "ada".into(),
            user_email: "ada@example.com".into(),
            password: String::new(),
            role: Role::Student,
            theme: None,
        };
        let token = TokenIssuer::new("one").issue(&user).unwrap();
        assert!(TokenIssuer::new("two").verify(&token).is_err());
    }

    #[tokio::test]
    async fn theme_must_be_light_or_dark() {
        let state = test_state();
        let user = register(&state, &register_request("ada", "ada@example.com", Role::Student))
            .await
            .unwrap();
        let claims = Claims {
            id: user.id,
            user_name: user.user_name,
            user_email: user.user_email,
            role: user.role,
            iat: 0,
            exp: 0,
        };

        assert!(matches!(update_theme(&state, &claims, "blue").await, Err(AppError::InvalidRequest(_))));
        assert_eq!(update_theme(&state, &claims, "dark").await.unwrap(), Theme::Dark);
    }
}
