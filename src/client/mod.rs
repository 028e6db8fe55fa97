//! HTTP client for the LMS API, used by course-authoring tools.
//!
//! Every response is the `{success, message, data}` envelope written by the
//! server; `success: false` becomes [`ClientError::Api`].

use async_trait::async_trait;
use reqwest::{header, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::sync::RwLock;
use std::time::Duration;

use crate::authoring::CourseApi;
use crate::models::{CourseRequest, CourseView, Role, Theme, UserSummary};
use crate::services::auth_service::LoginData;
use crate::services::media_service::UploadedMedia;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Connection or transport failure
    Http(String),
    /// The server answered `success: false`
    Api { status: u16, message: String },
    /// The body was not the expected envelope
    Decode(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Http(msg) => write!(f, "HTTP error: {}", msg),
            ClientError::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            ClientError::Decode(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// Body of `GET /auth/check-auth`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthCheck {
    pub authenticate: bool,
    pub user: UserSummary,
}

/// Turns a raw response into `data`, or into an error carrying the server's message
fn decode_envelope<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<Option<T>, ClientError> {
    let envelope: Envelope<T> = serde_json::from_slice(body).map_err(|e| {
        if (200..300).contains(&status) {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Api {
                status,
                message: String::from_utf8_lossy(body).into_owned(),
            }
        }
    })?;

    if !envelope.success || !(200..300).contains(&status) {
        return Err(ClientError::Api {
            status,
            message: envelope.message.unwrap_or_else(|| "Request failed".to_string()),
        });
    }

    Ok(envelope.data)
}

pub struct LmsClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl LmsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn with_default_url() -> Result<Self, ClientError> {
        Self::new(DEFAULT_BASE_URL)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, ClientError> {
        let request = match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        decode_envelope(status, &body)
    }

    async fn send_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        self.send(request)
            .await?
            .ok_or_else(|| ClientError::Decode("response has no data".to_string()))
    }

    pub async fn register(
        &self,
        user_name: &str,
        user_email: &str,
        password: &str,
        role: Role,
    ) -> Result<UserSummary, ClientError> {
        let body = serde_json::json!({
            "userName": user_name,
            "userEmail": user_email,
            "password": password,
            "role": role,
        });
        self.send_data(self.http.post(self.url("/auth/register")).json(&body)).await
    }

    /// Logs in and keeps the access token for every later call
    pub async fn login(&self, user_email: &str, password: &str) -> Result<LoginData, ClientError> {
        let body = serde_json::json!({ "userEmail": user_email, "password": password });
        let data: LoginData = self.send_data(self.http.post(self.url("/auth/login")).json(&body)).await?;
        self.set_token(Some(data.access_token.clone()));
        Ok(data)
    }

    pub fn logout(&self) {
        self.set_token(None);
    }

    pub async fn check_auth(&self) -> Result<AuthCheck, ClientError> {
        self.send_data(self.http.get(self.url("/auth/check-auth"))).await
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<(), ClientError> {
        let body = serde_json::json!({ "theme": theme.as_str() });
        self.send::<serde_json::Value>(self.http.put(self.url("/auth/user/theme")).json(&body))
            .await
            .map(|_| ())
    }

    pub async fn instructor_courses(&self) -> Result<Vec<CourseView>, ClientError> {
        self.send_data(self.http.get(self.url("/instructor/course/get"))).await
    }

    pub async fn catalog(&self, query: &[(&str, &str)]) -> Result<Vec<CourseView>, ClientError> {
        self.send_data(self.http.get(self.url("/student/course/get")).query(query)).await
    }

    pub async fn delete_media(&self, file_path: &str) -> Result<(), ClientError> {
        let body = serde_json::json!({ "filePath": file_path });
        self.send::<serde_json::Value>(self.http.delete(self.url("/media/delete")).json(&body))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl CourseApi for LmsClient {
    async fn upload_media(&self, file_name: &str, content_type: &str, data: Vec<u8>) -> Result<UploadedMedia, ClientError> {
        let request = self
            .http
            .post(self.url("/media/upload"))
            .query(&[("fileName", file_name)])
            .header(header::CONTENT_TYPE, content_type)
            .body(data);
        self.send_data(request).await
    }

    async fn add_course(&self, course: &CourseRequest) -> Result<CourseView, ClientError> {
        self.send_data(self.http.post(self.url("/instructor/course/add")).json(course)).await
    }

    async fn update_course(&self, id: &str, course: &CourseRequest) -> Result<CourseView, ClientError> {
        let path = format!("/instructor/course/update/{}", urlencoding::encode(id));
        self.send_data(self.http.put(self.url(&path)).json(course)).await
    }

    async fn course_details(&self, id: &str) -> Result<CourseView, ClientError> {
        let path = format!("/instructor/course/get/details/{}", urlencoding::encode(id));
        self.send_data(self.http.get(self.url(&path))).await
    }
}
