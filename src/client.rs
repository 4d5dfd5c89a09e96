//! HTTP client for the research backend's REST endpoints.
//!
//! [`BackendClient`] wraps `reqwest::Client` with one typed method per
//! endpoint. Responses come back as `serde_json::Value` — the controller
//! and dispatcher decide what to surface.
//!
//! Non-2xx responses are parsed for a `detail` field in the JSON body
//! (the backend's error envelope); if parsing fails, the raw body is used
//! as the error message.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::config::BridgeConfig;

/// HTTP client for a single research backend.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for the configured backend.
    pub fn new(config: &BridgeConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ClientError::Request)?;
        Ok(Self {
            http,
            base_url: config.endpoint.clone(),
        })
    }

    /// The backend's base URL (without trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /` — backend liveness probe.
    pub async fn health(&self) -> Result<Value, ClientError> {
        let resp = self
            .http
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    /// `POST /api/sessions` — provision backend state for a session.
    pub async fn create_session(&self, session_id: &str) -> Result<Value, ClientError> {
        let body = serde_json::json!({ "session_id": session_id });
        let resp = self
            .http
            .post(format!("{}/api/sessions", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    /// `POST /api/query` — admit a new query against a session.
    ///
    /// A 2xx response only acknowledges receipt; the research result
    /// arrives asynchronously over the event stream.
    pub async fn submit_query(&self, session_id: &str, query: &str) -> Result<Value, ClientError> {
        let body = serde_json::json!({ "query": query, "session_id": session_id });
        let resp = self
            .http
            .post(format!("{}/api/query", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    /// `GET /api/sessions` — list all sessions known to the backend.
    pub async fn list_sessions(&self) -> Result<Value, ClientError> {
        let resp = self
            .http
            .get(format!("{}/api/sessions", self.base_url))
            .send()
            .await
            .map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    /// `GET /api/sessions/{id}` — fetch the backend's session snapshot.
    pub async fn session_info(&self, session_id: &str) -> Result<Value, ClientError> {
        let resp = self
            .http
            .get(format!("{}/api/sessions/{}", self.base_url, session_id))
            .send()
            .await
            .map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    /// `DELETE /api/sessions/{id}` — release backend session state.
    pub async fn delete_session(&self, session_id: &str) -> Result<Value, ClientError> {
        let resp = self
            .http
            .delete(format!("{}/api/sessions/{}", self.base_url, session_id))
            .send()
            .await
            .map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    /// Parse an HTTP response — the JSON body on success, or a
    /// [`ClientError`] carrying the backend's error message on failure.
    async fn handle_response(resp: reqwest::Response) -> Result<Value, ClientError> {
        let status = resp.status();
        let body = resp.text().await.map_err(ClientError::Request)?;

        if status.is_success() {
            serde_json::from_str(&body)
                .map_err(|e| ClientError::Protocol(format!("invalid JSON from backend: {e}")))
        } else {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["detail"].as_str().map(String::from))
                .unwrap_or(body);
            Err(ClientError::Backend {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Errors returned by [`BackendClient`] methods.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport error (connection refused, timeout, DNS failure, etc.).
    #[error("HTTP request failed: {0}")]
    Request(reqwest::Error),
    /// The backend returned a non-2xx HTTP status.
    #[error("backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },
    /// The response body was not valid JSON.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Returns `true` if the error is an HTTP 404 Not Found response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Backend { status: 404, .. })
    }
}
