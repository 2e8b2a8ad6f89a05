//! `TurnExchange` trait and the reqwest-backed `ApiExchange`.
//!
//! One round trip per turn: the finalized audio buffer plus the session
//! identifier go up as multipart form data, the structured reply comes back
//! as JSON.  Session creation is a single POST; when it fails the caller
//! proceeds with [`LOCAL_SESSION_ID`] instead of blocking the flow.
//!
//! No timeout is configured on the client and nothing is retried — a failed
//! exchange surfaces exactly once as an [`ExchangeError`].

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioBuffer;
use crate::config::ServerConfig;

use super::types::{error_detail, TurnReply, WireTurnReply};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Placeholder session identifier used when session creation fails.
pub const LOCAL_SESSION_ID: &str = "demo";

/// Generic sentence shown when a failed exchange carries no usable detail.
pub const FALLBACK_ERROR_TEXT: &str = "I had trouble hearing you. Could you try again?";

// ---------------------------------------------------------------------------
// ExchangeError
// ---------------------------------------------------------------------------

/// Everything that can go wrong in the exchange round trip.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Non-success status from the server, with whatever human-readable
    /// detail the body carried.
    #[error("server returned {status}")]
    Server {
        status: reqwest::StatusCode,
        detail: Option<String>,
    },

    /// Success status but the body was not structured data.
    #[error("server response was not structured data")]
    Protocol,

    /// Transport-level failure (connection refused, DNS, …).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ExchangeError {
    /// The text the pipeline puts into the assistant-role error message:
    /// the server-provided detail when there is one, otherwise the generic
    /// fallback sentence.
    pub fn user_text(&self) -> &str {
        match self {
            ExchangeError::Server {
                detail: Some(detail),
                ..
            } => detail,
            _ => FALLBACK_ERROR_TEXT,
        }
    }
}

// ---------------------------------------------------------------------------
// TurnExchange trait
// ---------------------------------------------------------------------------

/// The remote conversational-service boundary.
///
/// Implementors must be `Send + Sync` so the orchestrator can hold them
/// behind an `Arc<dyn TurnExchange>`.
#[async_trait]
pub trait TurnExchange: Send + Sync {
    /// Create a new session, returning its opaque identifier.
    async fn create_session(&self) -> Result<String, ExchangeError>;

    /// Submit one utterance and await the structured reply.  The buffer is
    /// sent unmodified, empty or not — the server decides what "too short"
    /// means.
    async fn send_turn(
        &self,
        audio: AudioBuffer,
        session_id: &str,
    ) -> Result<TurnReply, ExchangeError>;
}

// ---------------------------------------------------------------------------
// ApiExchange
// ---------------------------------------------------------------------------

/// Production [`TurnExchange`] talking to the SoulTalk backend over HTTP.
///
/// All connection details come from [`ServerConfig`]; nothing is hardcoded.
pub struct ApiExchange {
    client: reqwest::Client,
    base_url: String,
}

impl ApiExchange {
    /// Build an `ApiExchange` from application config.
    ///
    /// The client deliberately has no request timeout: a `Thinking` exchange
    /// always runs to completion, success or failure.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn is_json(response: &reqwest::Response) -> bool {
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false)
    }
}

#[async_trait]
impl TurnExchange for ApiExchange {
    async fn create_session(&self) -> Result<String, ExchangeError> {
        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExchangeError::Server {
                status: response.status(),
                detail: None,
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|_| ExchangeError::Protocol)?;
        body.get("session_id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or(ExchangeError::Protocol)
    }

    async fn send_turn(
        &self,
        audio: AudioBuffer,
        session_id: &str,
    ) -> Result<TurnReply, ExchangeError> {
        let form = reqwest::multipart::Form::new()
            .part(
                "audio",
                reqwest::multipart::Part::bytes(audio.into_bytes())
                    .file_name("utterance.raw")
                    .mime_str("application/octet-stream")?,
            )
            .text("session_id", session_id.to_string());

        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let is_json = Self::is_json(&response);

        if !status.is_success() {
            // The server puts its detail in `detail` or `error`; a plain
            // text body is taken verbatim.  Absent both, the caller falls
            // back to the generic sentence.
            let detail = if is_json {
                response
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|body| error_detail(&body))
            } else {
                response
                    .text()
                    .await
                    .ok()
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty())
            };
            return Err(ExchangeError::Server { status, detail });
        }

        if !is_json {
            return Err(ExchangeError::Protocol);
        }

        let wire: WireTurnReply = response.json().await.map_err(|_| ExchangeError::Protocol)?;
        Ok(wire.into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- ExchangeError::user_text ---

    #[test]
    fn server_detail_is_used_verbatim() {
        let err = ExchangeError::Server {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            detail: Some("microphone too quiet".into()),
        };
        assert_eq!(err.user_text(), "microphone too quiet");
    }

    #[test]
    fn missing_detail_falls_back_to_generic_sentence() {
        let err = ExchangeError::Server {
            status: reqwest::StatusCode::BAD_GATEWAY,
            detail: None,
        };
        assert_eq!(err.user_text(), FALLBACK_ERROR_TEXT);
    }

    #[test]
    fn protocol_error_uses_generic_sentence() {
        assert_eq!(ExchangeError::Protocol.user_text(), FALLBACK_ERROR_TEXT);
    }

    // ---- ApiExchange construction ---

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = ServerConfig {
            base_url: "http://localhost:8000/api/".into(),
        };
        let exchange = ApiExchange::from_config(&config);
        assert_eq!(exchange.base_url, "http://localhost:8000/api");
    }

    #[test]
    fn exchange_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiExchange>();
    }
}
