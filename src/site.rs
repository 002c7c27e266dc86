//! HTTP client for the host site's widget endpoints
//!
//! - `GET /api/agent-context` → `{ "systemInstruction": text }`
//! - `GET /system_prompt.json` → `[{ "text": text }, ...]`
//! - `POST /api/log-chat` ← `{ "messages": [...], "timestamp": text }`

use crate::conversation::{Message, Role};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors talking to the host site
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("malformed body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentContextResponse {
    system_instruction: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptEntry {
    text: Option<String>,
}

/// Wire form of a transcript entry
#[derive(Debug, Serialize)]
struct LoggedMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatLogRequest<'a> {
    messages: Vec<LoggedMessage<'a>>,
    timestamp: String,
}

/// Client bound to the site origin the widget is embedded in
#[derive(Debug, Clone)]
pub struct SiteClient {
    client: Client,
    base_url: String,
}

impl SiteClient {
    pub fn new(base_url: &str) -> Result<Self, SiteError> {
        Ok(Self {
            client: Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, SiteError> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SiteError::Status(status));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Primary context source
    pub async fn agent_context(&self) -> Result<String, SiteError> {
        let data: AgentContextResponse = self.get_json("/api/agent-context").await?;
        data.system_instruction
            .filter(|s| !s.trim().is_empty())
            .ok_or(SiteError::MissingField("systemInstruction"))
    }

    /// Static fallback; only the first entry is used
    pub async fn fallback_prompt(&self) -> Result<String, SiteError> {
        let entries: Vec<PromptEntry> = self.get_json("/system_prompt.json").await?;
        entries
            .into_iter()
            .next()
            .and_then(|e| e.text)
            .filter(|s| !s.trim().is_empty())
            .ok_or(SiteError::MissingField("text"))
    }

    /// Post the transcript. The response body is ignored.
    pub async fn log_chat(&self, messages: &[Message], at: DateTime<Utc>) -> Result<(), SiteError> {
        let body = ChatLogRequest {
            messages: messages
                .iter()
                .map(|m| LoggedMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let response = self
            .client
            .post(self.url("/api/log-chat"))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SiteError::Status(status));
        }
        Ok(())
    }
}
