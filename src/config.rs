use std::env;

use crate::utils::AppError;

const DEFAULT_CLIENT_URL: &str = "http://localhost:5173";
const FIREBASE_ENV: [&str; 4] = [
    "FIREBASE_PROJECT_ID",
    "FIREBASE_CLIENT_EMAIL",
    "FIREBASE_PRIVATE_KEY",
    "FIREBASE_STORAGE_BUCKET",
];

/// Service-account credentials for the identity provider and its storage bucket.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    pub storage_bucket: String,
}

impl FirebaseConfig {
    /// Returns `None` (and logs which variables are missing) unless all four are set.
    fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let values: Vec<Option<String>> = FIREBASE_ENV
            .iter()
            .map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
            .collect();

        let missing: Vec<&str> = FIREBASE_ENV
            .iter()
            .zip(values.iter())
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect();

        if !missing.is_empty() {
            log::error!(
                "Firebase initialization skipped: missing required environment variables: {}",
                missing.join(", ")
            );
            return None;
        }

        let mut values = values.into_iter().flatten();
        let project_id = values.next()?;
        let client_email = values.next()?;
        // Keys pasted into .env files carry escaped newlines
        let private_key = values.next()?.replace("\\n", "\n");
        let storage_bucket = values.next()?;

        Some(Self {
            project_id,
            client_email,
            private_key,
            storage_bucket,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongo_uri: Option<String>,
    pub mongo_database: Option<String>,
    pub jwt_secret: String,
    pub client_url: String,
    pub mock_mode: bool,
    pub seed_demo_data: bool,
    pub firebase: Option<FirebaseConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key)
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };

        let mock_mode = flag("LMS_MOCK");
        let seed_demo_data = flag("SEED_DEMO_DATA");

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| AppError::Internal(format!("PORT is not a valid port: {}", p)))?,
            None => 5000,
        };

        let mongo_uri = lookup("MONGO_URI").filter(|v| !v.is_empty());
        if mongo_uri.is_none() && !mock_mode {
            return Err(AppError::Internal(
                "MONGO_URI must be set (or LMS_MOCK=true for the in-memory store)".to_string(),
            ));
        }

        let jwt_secret = match lookup("JWT_SECRET").filter(|v| !v.is_empty()) {
            Some(secret) => secret,
            None if mock_mode => {
                log::warn!("JWT_SECRET not set; using a random secret for this mock session");
                uuid::Uuid::new_v4().simple().to_string()
            }
            None => {
                return Err(AppError::Internal("JWT_SECRET must be set".to_string()));
            }
        };

        let client_url = lookup("CLIENT_URL").unwrap_or_else(|| {
            log::warn!("CLIENT_URL not set. Defaulting to {}", DEFAULT_CLIENT_URL);
            DEFAULT_CLIENT_URL.to_string()
        });

        let firebase = if mock_mode {
            None
        } else {
            FirebaseConfig::from_lookup(&lookup)
        };

        Ok(Self {
            host,
            port,
            mongo_uri,
            mongo_database: lookup("MONGO_DATABASE").filter(|v| !v.is_empty()),
            jwt_secret,
            client_url,
            mock_mode,
            seed_demo_data,
            firebase,
        })
    }
}
