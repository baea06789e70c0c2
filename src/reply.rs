use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3001/chat";

/// Substituted when the service answers successfully but without a `reply`.
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't generate a response.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    reply: Option<String>,
}

/// Ways a reply request can fail. The chat widget shows every one of them the
/// same way; the variant only reaches the log.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    /// The request never produced an HTTP response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("reply service returned status {status}")]
    Status { status: u16 },

    /// The response body was not the expected JSON.
    #[error("reply body could not be decoded: {0}")]
    Decode(String),

    /// No response arrived before the client-side deadline.
    #[error("no reply within {0:?}")]
    Timeout(Duration),
}

impl ReplyError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Something that turns one user message into one bot reply.
///
/// The returned future must own everything it needs so it can be spawned.
pub trait ReplyService: Clone + Send + Sync + 'static {
    fn reply(&self, message: String) -> impl Future<Output = Result<String, ReplyError>> + Send + 'static;
}

#[derive(Clone)]
pub struct HttpReplyService {
    client: Client,
    endpoint: String,
}

impl HttpReplyService {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn query(&self, message: &str) -> Result<String, ReplyError> {
        debug!(endpoint = %self.endpoint, "posting chat message");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| ReplyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReplyError::Status {
                status: status.as_u16(),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReplyError::Decode(e.to_string()))?;

        Ok(body.reply.unwrap_or_else(|| FALLBACK_REPLY.to_string()))
    }
}

impl ReplyService for HttpReplyService {
    fn reply(&self, message: String) -> impl Future<Output = Result<String, ReplyError>> + Send + 'static {
        let service = self.clone();
        async move { service.query(&message).await }
    }
}
