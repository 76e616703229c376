//! Blocking YouTube Data API client.

use crate::{
    error::{ApiError, ApiResult},
    oauth::Credentials,
    request::ApiRequest,
};
use serde::Deserialize;
use serde_json::Value;

pub const API_SERVICE_NAME: &str = "youtube";
pub const API_VERSION: &str = "v3";
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Google's JSON error envelope: `{"error": {"code": 403, "message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct YouTubeClient {
    http:        reqwest::blocking::Client,
    base_url:    String,
    credentials: Credentials,
}

impl YouTubeClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    /// Point the client at another API root (used by tests).
    pub fn with_base_url(credentials: Credentials, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Issue the request and return the decoded JSON body.
    pub fn execute(&self, request: &impl ApiRequest) -> ApiResult<Value> {
        let query = request.query()?;
        let url = format!("{}/{}", self.base_url, request.resource());
        log::debug!("youtube: GET {url} ({} params)", query.len());

        if self.credentials.is_expired(chrono::Utc::now()) {
            log::warn!("youtube: access token has expired; the request will likely be rejected");
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.credentials.access_token)
            .query(&query)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ApiError::Api { status: status.as_u16(), message });
        }

        let value: Value = serde_json::from_str(&body)?;
        log::info!(
            "youtube: {} returned {} items",
            request.resource(),
            value.get("items").and_then(Value::as_array).map_or(0, Vec::len),
        );
        Ok(value)
    }
}
