//! Durable conversation history, one session, append-only.
//!
//! The backing store is a session-keyed REST message log. A missing session
//! (404 or empty body) is a new conversation, never an error. Everything
//! else maps to `Error::HistoryUnavailable`; callers treat that as
//! non-fatal and keep serving the request.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// Who produced a message. Decided at construction/deserialization time,
/// never inferred downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Unknown => "unknown",
        }
    }
}

/// One turn of the conversation. Immutable once appended; ordering is
/// append order, the timestamp is carried for the durable log only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// REST adapter for the message log of one fixed session.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    http: Client,
    base_url: String,
    token: String,
    session_key: String,
}

impl HistoryStore {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        session_key: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "history base URL is empty".to_string(),
            ));
        }

        let http = Client::builder()
            .user_agent("companion_chat/0.1.0")
            .timeout(HISTORY_TIMEOUT)
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            session_key: session_key.into(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/sessions/{}/messages", self.base_url, self.session_key)
    }

    /// Append one message to the session log.
    pub async fn append(&self, role: Role, text: &str) -> Result<()> {
        let message = Message::new(role, text);

        let response = self
            .http
            .post(self.messages_url())
            .bearer_auth(&self.token)
            .json(&message)
            .send()
            .await
            .map_err(|e| Error::HistoryUnavailable(format!("append failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HistoryUnavailable(format!(
                "append rejected {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    /// Read the full ordered message log, oldest first.
    /// A new/empty session yields an empty vector.
    pub async fn read_all(&self) -> Result<Vec<Message>> {
        let response = self
            .http
            .get(self.messages_url())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::HistoryUnavailable(format!("read failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::HistoryUnavailable(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(Error::HistoryUnavailable(format!(
                "read rejected {}: {}",
                status, text
            )));
        }

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&text)
            .map_err(|e| Error::HistoryUnavailable(format!("invalid message log: {}", e)))
    }
}
