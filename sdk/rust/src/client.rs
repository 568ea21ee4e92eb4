//! Async client for the Saakra learning API.
//!
//! Bodies are plain JSON so callers can send deliberately invalid payloads;
//! the gateway's answer comes back as status plus parsed body.

use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;

pub const DEFAULT_USER_HEADER: &str = "x-user-id";

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A gateway reply, successful or not.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
    pub retry_after: Option<u64>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The `validationErrors` map of a rejected body, if present.
    pub fn validation_errors(&self) -> Option<&Value> {
        self.body.get("validationErrors")
    }
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    user_header: String,
    user_id: Option<String>,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_header: DEFAULT_USER_HEADER.to_string(),
            user_id: None,
        }
    }

    /// Send requests as `user_id`.
    pub fn as_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_user_header(mut self, header: &str) -> Self {
        self.user_header = header.to_string();
        self
    }

    pub async fn health(&self) -> Result<ApiResponse, SdkError> {
        self.get("/health").await
    }

    pub async fn update_progress(&self, body: &Value) -> Result<ApiResponse, SdkError> {
        self.post("/api/progress", body).await
    }

    pub async fn create_assessment(&self, body: &Value) -> Result<ApiResponse, SdkError> {
        self.post("/api/assessments", body).await
    }

    pub async fn submit_assessment(&self, body: &Value) -> Result<ApiResponse, SdkError> {
        self.post("/api/assessments/submit", body).await
    }

    pub async fn generate_certificate(&self, body: &Value) -> Result<ApiResponse, SdkError> {
        self.post("/api/certificates", body).await
    }

    pub async fn verify_certificate(&self, certificate_id: &str) -> Result<ApiResponse, SdkError> {
        self.post(
            "/api/certificates/verify",
            &json!({ "certificateId": certificate_id }),
        )
        .await
    }

    pub async fn revoke_certificate(
        &self,
        certificate_id: &str,
        reason: &str,
    ) -> Result<ApiResponse, SdkError> {
        self.post(
            "/api/certificates/revoke",
            &json!({ "certificateId": certificate_id, "reason": reason }),
        )
        .await
    }

    pub async fn bulk_check_eligibility(
        &self,
        course_id: &str,
        user_ids: &[&str],
    ) -> Result<ApiResponse, SdkError> {
        self.post(
            "/api/certificates/eligibility/bulk",
            &json!({ "courseId": course_id, "userIds": user_ids }),
        )
        .await
    }

    pub async fn eligibility(&self, course_id: &str) -> Result<ApiResponse, SdkError> {
        self.get(&format!("/api/courses/{course_id}/eligibility"))
            .await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, SdkError> {
        let request = self.client.post(format!("{}{}", self.base_url, path)).json(body);
        self.send(request).await
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, SdkError> {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        self.send(request).await
    }

    async fn send(&self, mut request: reqwest::RequestBuilder) -> Result<ApiResponse, SdkError> {
        if let Some(user_id) = &self.user_id {
            request = request.header(self.user_header.as_str(), user_id.as_str());
        }

        let resp = request.send().await?;
        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(ApiResponse {
            status,
            body,
            retry_after,
        })
    }
}
