//! Wire types for the SoulTalk turn exchange.
//!
//! The server replies to a turn with structured JSON: transcript, reply
//! text, an optional base64-encoded synthesized-speech payload, the session
//! identifier, and an optional emotion annotation.  [`WireTurnReply`] mirrors
//! that wire shape exactly; [`TurnReply`] is the decoded form the pipeline
//! consumes (audio already base64-decoded).

use base64::Engine;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Emotion
// ---------------------------------------------------------------------------

/// Emotion annotation attached to a user turn by the remote service.
///
/// The label is free-form — the client never validates it against a fixed
/// set.  `intensity` is normalized to `[0, 1]` by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Emotion {
    /// Free-form sentiment label (e.g. `"hopeful"`).
    #[serde(default)]
    pub emotion: String,
    /// Normalized intensity in `[0, 1]`.
    #[serde(default)]
    pub intensity: f32,
    /// Free-text summary of the detected sentiment.
    #[serde(default)]
    pub summary: String,
}

// ---------------------------------------------------------------------------
// WireTurnReply / TurnReply
// ---------------------------------------------------------------------------

/// The raw JSON body of a successful turn exchange.
#[derive(Debug, Deserialize)]
pub struct WireTurnReply {
    /// Transcript of the submitted utterance.
    #[serde(default)]
    pub transcript: String,
    /// Assistant reply text.
    #[serde(default)]
    pub response: String,
    /// Base64-encoded synthesized speech; absent or empty when the server
    /// produced no audio for this turn.
    #[serde(default)]
    pub audio_base64: Option<String>,
    /// Session identifier; when present it replaces the locally held one.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Optional emotion annotation for the user turn.
    #[serde(default)]
    pub emotion: Option<Emotion>,
}

/// A decoded turn reply, ready for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub transcript: String,
    pub response: String,
    /// Decoded synthesized-speech payload (self-contained encoded audio),
    /// `None` when the server sent none.
    pub audio: Option<Vec<u8>>,
    pub session_id: Option<String>,
    pub emotion: Option<Emotion>,
}

impl From<WireTurnReply> for TurnReply {
    fn from(wire: WireTurnReply) -> Self {
        // An empty string counts as "no audio"; a payload that fails to
        // decode is dropped with a warning so the turn still lands — the
        // reply text matters more than the voice.
        let audio = wire
            .audio_base64
            .filter(|b64| !b64.is_empty())
            .and_then(|b64| {
                match base64::engine::general_purpose::STANDARD.decode(&b64) {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        log::warn!("exchange: undecodable audio payload ({e}), skipping playback");
                        None
                    }
                }
            });

        Self {
            transcript: wire.transcript,
            response: wire.response,
            audio,
            session_id: wire.session_id,
            emotion: wire.emotion,
        }
    }
}

// ---------------------------------------------------------------------------
// Error-detail extraction
// ---------------------------------------------------------------------------

/// Pull the human-readable detail out of a structured error body.
///
/// The server is expected to put it in `detail` or `error`; anything else
/// means the caller substitutes the generic fallback sentence.
pub(crate) fn error_detail(body: &serde_json::Value) -> Option<String> {
    body.get("detail")
        .and_then(serde_json::Value::as_str)
        .or_else(|| body.get("error").and_then(serde_json::Value::as_str))
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
