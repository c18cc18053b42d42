use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::ChatMessage;

/// Fields a webhook may put its answer in, in order of preference.
const REPLY_FIELDS: [&str; 5] = ["response", "message", "output", "text", "result"];

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook returned malformed JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayContext {
    pub messages_left: u32,
}

/// Body posted to the chat webhook.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub message: String,
    pub conversation_history: Vec<ChatMessage>,
    pub context: RelayContext,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WebhookReply {
    Answer(String),
    /// Non-2xx status; shown to the user but not counted against the quota.
    HttpError { status: u16, reason: String },
}

impl WebhookReply {
    pub fn display_text(&self) -> String {
        match self {
            WebhookReply::Answer(text) => text.clone(),
            WebhookReply::HttpError { status, reason } if reason.is_empty() => {
                format!("Error: {status}")
            }
            WebhookReply::HttpError { status, reason } => format!("Error: {status} - {reason}"),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ChatBackend: Send + Sync {
    async fn relay(&self, request: &WebhookRequest) -> RelayResult<WebhookReply>;
}

pub struct WebhookBackend {
    client: Client,
    endpoint: String,
}

impl WebhookBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ChatBackend for WebhookBackend {
    async fn relay(&self, request: &WebhookRequest) -> RelayResult<WebhookReply> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Ok(WebhookReply::HttpError {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));
        let body = response.text().await?;

        if is_json {
            Ok(WebhookReply::Answer(extract_reply(&body)?))
        } else {
            Ok(WebhookReply::Answer(body))
        }
    }
}

/// Picks the answer out of a JSON webhook body.
///
/// The first truthy field of [`REPLY_FIELDS`] wins. A bare JSON string is used as is; any other
/// shape falls back to the raw body.
pub fn extract_reply(body: &str) -> RelayResult<String> {
    let value: Value = serde_json::from_str(body)?;
    let reply = match &value {
        Value::Object(map) => REPLY_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(truthy_text)),
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    };
    Ok(reply.unwrap_or_else(|| body.to_string()))
}

fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}
