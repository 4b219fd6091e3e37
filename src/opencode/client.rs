//! REST client for the OpenCode HTTP server.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{AppError, Result};

/// Per-request timeout for REST calls. The event stream has none.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Session record returned by `POST /session` and `GET /session/{id}`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Model selector for a prompt.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModelRef {
    #[serde(rename = "providerID")]
    pub provider_id: String,
    #[serde(rename = "modelID")]
    pub model_id: String,
}

impl ModelRef {
    /// Parse `provider/model`.
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        let (provider, model) = spec.split_once('/')?;
        (!provider.is_empty() && !model.is_empty()).then(|| Self {
            provider_id: provider.to_owned(),
            model_id: model.to_owned(),
        })
    }
}

/// Body of `POST /session/{id}/prompt_async`.
#[derive(Debug, Clone, Serialize)]
pub struct PromptBody {
    pub parts: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl PromptBody {
    /// Prompt made of a single text part.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self {
            parts: vec![json!({ "type": "text", "text": text })],
            model: None,
            agent: None,
        }
    }

    /// Append a file part with inline base64 content.
    pub fn push_file(&mut self, mime: &str, base64: &str, filename: Option<&str>) {
        let mut part = json!({
            "type": "file",
            "mime": mime,
            "url": format!("data:{mime};base64,{base64}"),
        });
        if let Some(name) = filename {
            part["filename"] = json!(name);
        }
        self.parts.push(part);
    }
}

/// Thin typed wrapper over the OpenCode REST surface.
#[derive(Debug, Clone)]
pub struct OpenCodeClient {
    http: Client,
    base_url: String,
}

impl OpenCodeClient {
    /// Client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| AppError::Http(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Probe the health endpoint. Returns the reported server version when
    /// healthy, `Ok(None)` when reachable but not ready.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`] when the server is unreachable.
    pub async fn health(&self, path: &str) -> Result<Option<String>> {
        let response = self
            .http
            .get(self.url(path))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if body.get("healthy").and_then(Value::as_bool) == Some(false) {
            return Ok(None);
        }
        let version = body
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Ok(Some(version))
    }

    /// `POST /session`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`] on transport failure or a non-2xx status.
    pub async fn create_session(&self) -> Result<SessionInfo> {
        let response = self
            .http
            .post(self.url("/session"))
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({}))
            .send()
            .await?;
        Ok(check("POST /session", response).await?.json().await?)
    }

    /// `GET /session/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for an unknown session and
    /// [`AppError::Http`] for other failures.
    pub async fn get_session(&self, session_id: &str) -> Result<SessionInfo> {
        let response = self
            .http
            .get(self.url(&format!("/session/{session_id}")))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("session {session_id}")));
        }
        Ok(check("GET /session/{id}", response).await?.json().await?)
    }

    /// `POST /session/{id}/prompt_async`; returns once the turn is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`] on transport failure or a non-2xx status.
    pub async fn prompt_async(&self, session_id: &str, body: &PromptBody) -> Result<()> {
        let response = self
            .http
            .post(self.url(&format!("/session/{session_id}/prompt_async")))
            .timeout(REQUEST_TIMEOUT)
            .json(body)
            .send()
            .await?;
        check("POST /session/{id}/prompt_async", response).await?;
        debug!(session_id, "opencode prompt accepted");
        Ok(())
    }

    /// `POST /session/{id}/abort`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`] on transport failure or a non-2xx status.
    pub async fn abort(&self, session_id: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url(&format!("/session/{session_id}/abort")))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        check("POST /session/{id}/abort", response).await?;
        Ok(())
    }

    /// `POST /session/{id}/permissions/{permission_id}` with `once`,
    /// `always` or `reject`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`] on transport failure or a non-2xx status.
    pub async fn reply_permission(
        &self,
        session_id: &str,
        permission_id: &str,
        reply: &str,
    ) -> Result<()> {
        let response = self
            .http
            .post(self.url(&format!(
                "/session/{session_id}/permissions/{permission_id}"
            )))
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({ "response": reply }))
            .send()
            .await?;
        check("POST /session/{id}/permissions/{permission_id}", response).await?;
        Ok(())
    }

    /// Open the `GET /event` SSE stream.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`] on transport failure or a non-2xx status.
    pub async fn subscribe_events(&self) -> Result<Response> {
        let response = self
            .http
            .get(self.url("/event"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        check("GET /event", response).await
    }
}

async fn check(route: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Http(format!("{route} returned {status}: {body}")))
}
