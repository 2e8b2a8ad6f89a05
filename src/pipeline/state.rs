//! Pipeline state machine and shared application state.
//!
//! [`PipelineState`] is the single interaction status, owned exclusively by
//! the orchestrator.  [`transition`] is the pure `(state, event) -> state`
//! function behind it; the runner dispatches side effects around it but
//! never writes a state the table does not produce.
//!
//! [`AppState`] is what other UI surfaces observe: the current state, the
//! append-only conversation log, the latest-emotion indicator and the
//! session identifier.  [`SharedState`] is a type alias for
//! `Arc<Mutex<AppState>>` — cheap to clone and safe to share across threads.

use std::sync::{Arc, Mutex};

use crate::api::Emotion;

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of the voice-interaction pipeline.
///
/// The state machine cycles indefinitely:
///
/// ```text
/// Idle ──press──▶ Recording ──press──▶ Thinking
///                                        ├─ reply with audio ──▶ Speaking
///                                        ├─ reply, no audio ───▶ Idle
///                                        └─ exchange failed ───▶ Idle
/// Speaking ──playback done / press (interrupt)──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Waiting for the user to press the primary control.
    Idle,

    /// Microphone is held; chunks are accumulating.
    Recording,

    /// The turn exchange is in flight.  The primary control is inert.
    Thinking,

    /// The synthesized reply is playing.  A press interrupts it.
    Speaking,
}

impl PipelineState {
    /// Returns `true` while the exchange is in flight and the primary
    /// control must be disabled.  This is the input-intake half of the
    /// "no press while Thinking" guarantee; [`transition`] is the other.
    pub fn is_busy(&self) -> bool {
        matches!(self, PipelineState::Thinking)
    }

    /// A short human-readable status line for UI surfaces.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Tap to speak",
            PipelineState::Recording => "Listening...",
            PipelineState::Thinking => "Reflecting...",
            PipelineState::Speaking => "Speaking...",
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        PipelineState::Idle
    }
}

// ---------------------------------------------------------------------------
// StateEvent / transition
// ---------------------------------------------------------------------------

/// Everything that can move the state machine, stripped of payload.  Each
/// variant is produced by exactly one outcome in the runner's dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    /// The user pressed the primary control.
    PrimaryPressed,
    /// The exchange succeeded and playback of the reply began.
    ReplySpoken,
    /// The exchange succeeded but there is nothing to play (no audio field,
    /// or playback could not start).
    ReplySilent,
    /// The exchange failed; the error message has been appended.
    ExchangeFailed,
    /// Playback of the current reply reached natural end-of-data.
    PlaybackDone,
}

/// The pure transition function.  Unlisted `(state, event)` pairs keep the
/// current state — notably a press while `Thinking` is inert.
pub fn transition(state: PipelineState, event: StateEvent) -> PipelineState {
    use PipelineState::*;
    use StateEvent::*;

    match (state, event) {
        (Idle, PrimaryPressed) => Recording,
        (Recording, PrimaryPressed) => Thinking,
        (Thinking, ReplySpoken) => Speaking,
        (Thinking, ReplySilent) => Idle,
        (Thinking, ExchangeFailed) => Idle,
        (Speaking, PlaybackDone) => Idle,
        (Speaking, PrimaryPressed) => Idle,
        (current, _) => current,
    }
}

// ---------------------------------------------------------------------------
// Conversation log
// ---------------------------------------------------------------------------

/// Who spoke a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation log.  The log is append-only: messages are
/// never mutated or removed once pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Emotion annotation — attached to user turns only.
    pub emotion: Option<Emotion>,
}

impl Message {
    /// A user turn with its transcript and optional emotion annotation.
    pub fn user(text: impl Into<String>, emotion: Option<Emotion>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            emotion,
        }
    }

    /// An assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            emotion: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared application state — what every UI surface observes.
///
/// Held behind [`SharedState`].  The orchestrator mutates it; observers only
/// read.
pub struct AppState {
    /// Current phase of the pipeline.  Written only by the orchestrator.
    pub state: PipelineState,

    /// Append-only conversation log, in insertion order.
    pub messages: Vec<Message>,

    /// The most recent emotion annotation, for the header badge.
    pub latest_emotion: Option<Emotion>,

    /// Opaque session identifier.  Silently replaced when a turn reply
    /// carries a new value.
    pub session_id: String,
}

impl AppState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            state: PipelineState::Idle,
            messages: Vec::new(),
            latest_emotion: None,
            session_id: session_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`AppState`].
///
/// Lock for a short critical section; do **not** hold the lock across
/// `.await` points.
pub type SharedState = Arc<Mutex<AppState>>;

/// Construct a new [`SharedState`] for the given session.
pub fn new_shared_state(session_id: impl Into<String>) -> SharedState {
    Arc::new(Mutex::new(AppState::new(session_id)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- transition table ---

    #[test]
    fn press_in_idle_starts_recording() {
        assert_eq!(
            transition(PipelineState::Idle, StateEvent::PrimaryPressed),
            PipelineState::Recording
        );
    }

    #[test]
    fn press_in_recording_moves_to_thinking() {
        assert_eq!(
            transition(PipelineState::Recording, StateEvent::PrimaryPressed),
            PipelineState::Thinking
        );
    }

    #[test]
    fn press_while_thinking_is_inert() {
        assert_eq!(
            transition(PipelineState::Thinking, StateEvent::PrimaryPressed),
            PipelineState::Thinking
        );
    }

    #[test]
    fn press_while_speaking_interrupts_to_idle() {
        assert_eq!(
            transition(PipelineState::Speaking, StateEvent::PrimaryPressed),
            PipelineState::Idle
        );
    }

    #[test]
    fn thinking_resolves_per_reply_kind() {
        assert_eq!(
            transition(PipelineState::Thinking, StateEvent::ReplySpoken),
            PipelineState::Speaking
        );
        assert_eq!(
            transition(PipelineState::Thinking, StateEvent::ReplySilent),
            PipelineState::Idle
        );
        assert_eq!(
            transition(PipelineState::Thinking, StateEvent::ExchangeFailed),
            PipelineState::Idle
        );
    }

    #[test]
    fn playback_done_returns_to_idle() {
        assert_eq!(
            transition(PipelineState::Speaking, StateEvent::PlaybackDone),
            PipelineState::Idle
        );
    }

    /// Stale events in states that do not expect them change nothing.
    #[test]
    fn unexpected_events_keep_the_current_state() {
        // PlaybackDone only matters while Speaking.
        assert_eq!(
            transition(PipelineState::Idle, StateEvent::PlaybackDone),
            PipelineState::Idle
        );
        assert_eq!(
            transition(PipelineState::Thinking, StateEvent::PlaybackDone),
            PipelineState::Thinking
        );
        assert_eq!(
            transition(PipelineState::Recording, StateEvent::ReplySpoken),
            PipelineState::Recording
        );
    }

    // ---- is_busy / label ---

    #[test]
    fn only_thinking_is_busy() {
        assert!(!PipelineState::Idle.is_busy());
        assert!(!PipelineState::Recording.is_busy());
        assert!(PipelineState::Thinking.is_busy());
        assert!(!PipelineState::Speaking.is_busy());
    }

    #[test]
    fn labels_match_the_status_line() {
        assert_eq!(PipelineState::Idle.label(), "Tap to speak");
        assert_eq!(PipelineState::Recording.label(), "Listening...");
        assert_eq!(PipelineState::Thinking.label(), "Reflecting...");
        assert_eq!(PipelineState::Speaking.label(), "Speaking...");
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(PipelineState::default(), PipelineState::Idle);
    }

    // ---- AppState / SharedState ---

    #[test]
    fn new_app_state_is_idle_and_empty() {
        let state = AppState::new("s-1");
        assert_eq!(state.state, PipelineState::Idle);
        assert!(state.messages.is_empty());
        assert!(state.latest_emotion.is_none());
        assert_eq!(state.session_id, "s-1");
    }

    #[test]
    fn shared_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedState>();
    }

    #[test]
    fn message_constructors_set_roles() {
        let user = Message::user("hi", None);
        assert_eq!(user.role, Role::User);
        let asst = Message::assistant("hello");
        assert_eq!(asst.role, Role::Assistant);
        assert!(asst.emotion.is_none());
    }
}
