//! Pipeline orchestrator — drives capture → exchange → playback.
//!
//! [`PipelineOrchestrator`] owns the [`SharedState`] and responds to
//! [`PipelineEvent`]s received over a `tokio::sync::mpsc` channel.  Exactly
//! one event is processed at a time; the turn exchange is awaited inline,
//! so no two transitions can interleave.
//!
//! # Flow
//!
//! ```text
//! PrimaryPressed @ Idle       → CaptureManager::start       → Recording
//!                               (start failure: stay Idle, log only)
//! PrimaryPressed @ Recording  → CaptureManager::stop        → Thinking
//!                               → TurnExchange::send_turn (inline await)
//!                                 ├─ ok, audio    → messages, pacing delay,
//!                                 │                 PlaybackController::play → Speaking
//!                                 ├─ ok, no audio → messages, pacing delay  → Idle
//!                                 └─ err          → one assistant error msg → Idle
//! PrimaryPressed @ Thinking   → inert (also disabled at the intake layer)
//! PrimaryPressed @ Speaking   → PlaybackController::stop (interrupt)       → Idle
//! PlaybackFinished(current)   → Idle        (stale handles are ignored)
//! ```
//!
//! Exchange failures never leave this module: each one becomes exactly one
//! assistant-role [`Message`] and the machine returns to `Idle`, ready for
//! another attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::api::{TurnExchange, TurnReply};
use crate::audio::{AudioBuffer, CaptureManager};
use crate::playback::{PlaybackController, PlaybackHandle};

use super::state::{transition, Message, PipelineState, SharedState, StateEvent};

// ---------------------------------------------------------------------------
// PipelineEvent / Notice
// ---------------------------------------------------------------------------

/// Messages delivered into the orchestrator's event loop.
///
/// Both the user trigger and the playback-completion callback arrive here,
/// which is what keeps transition processing single-threaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The primary control was pressed.
    PrimaryPressed,
    /// A playback session reached natural end-of-data.
    PlaybackFinished(PlaybackHandle),
}

/// Notifications emitted towards the front-end.
///
/// The conversation log and latest emotion are also readable through
/// [`SharedState`]; notices exist so a UI can react without polling.
#[derive(Debug, Clone)]
pub enum Notice {
    StateChanged(PipelineState),
    MessageAppended(Message),
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives the complete voice-interaction pipeline.
///
/// Create with [`PipelineOrchestrator::new`], then call [`run`](Self::run)
/// inside a tokio task.
pub struct PipelineOrchestrator {
    state: SharedState,
    capture: Box<dyn CaptureManager>,
    playback: Box<dyn PlaybackController>,
    exchange: Arc<dyn TurnExchange>,
    notices: mpsc::Sender<Notice>,
    /// Artificial delay between the user and assistant messages, for
    /// conversational pacing.
    pacing: Duration,
    /// Handle of the reply currently playing, if any.
    current_playback: Option<PlaybackHandle>,
}

impl PipelineOrchestrator {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `state`    — shared application state (also read by UI surfaces).
    /// * `capture`  — input-device manager.
    /// * `playback` — output-path controller; its completion events must be
    ///                wired into the same channel `run` consumes.
    /// * `exchange` — remote conversational-service boundary.
    /// * `notices`  — front-end notification channel.
    /// * `pacing`   — delay between appending the user and assistant turns.
    pub fn new(
        state: SharedState,
        capture: Box<dyn CaptureManager>,
        playback: Box<dyn PlaybackController>,
        exchange: Arc<dyn TurnExchange>,
        notices: mpsc::Sender<Notice>,
        pacing: Duration,
    ) -> Self {
        Self {
            state,
            capture,
            playback,
            exchange,
            notices,
            pacing,
            current_playback: None,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the orchestrator until `events` is closed.
    ///
    /// Spawn this as a tokio task from `main()`; it never returns while the
    /// channel is open.
    pub async fn run(mut self, mut events: mpsc::Receiver<PipelineEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                PipelineEvent::PrimaryPressed => self.handle_press().await,
                PipelineEvent::PlaybackFinished(handle) => {
                    self.handle_playback_finished(handle).await
                }
            }
        }

        log::info!("pipeline: event channel closed, orchestrator shutting down");
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    async fn handle_press(&mut self) {
        match self.current_state() {
            PipelineState::Idle => match self.capture.start().await {
                Ok(()) => {
                    log::debug!("pipeline: capture started → Recording");
                    self.apply(StateEvent::PrimaryPressed).await;
                }
                Err(e) => {
                    // Stays Idle; not surfaced to the user.
                    log::error!("pipeline: capture could not start: {e}");
                }
            },

            PipelineState::Recording => {
                // The device is released inside stop() on every path,
                // including the zero-chunk one.
                let buffer = self.capture.stop().await;
                log::debug!("pipeline: captured {} bytes → Thinking", buffer.len());
                self.apply(StateEvent::PrimaryPressed).await;
                self.run_turn(buffer).await;
            }

            PipelineState::Thinking => {
                // Inert by the transition table; normally unreachable since
                // the intake layer disables the control while Thinking.
                log::debug!("pipeline: press ignored while Thinking");
            }

            PipelineState::Speaking => {
                if let Some(handle) = self.current_playback.take() {
                    self.playback.stop(handle);
                }
                self.apply(StateEvent::PrimaryPressed).await;
            }
        }
    }

    async fn handle_playback_finished(&mut self, handle: PlaybackHandle) {
        if self.current_playback == Some(handle) {
            self.current_playback = None;
            self.apply(StateEvent::PlaybackDone).await;
        } else {
            log::debug!("pipeline: stale playback completion {handle:?} ignored");
        }
    }

    // -----------------------------------------------------------------------
    // Turn processing
    // -----------------------------------------------------------------------

    /// Submit `buffer` (possibly empty — the server decides what is too
    /// short) and fold the outcome into the conversation log.
    async fn run_turn(&mut self, buffer: AudioBuffer) {
        let session_id = { self.state.lock().unwrap().session_id.clone() };

        match self.exchange.send_turn(buffer, &session_id).await {
            Ok(reply) => self.handle_reply(reply).await,
            Err(e) => {
                log::warn!("pipeline: exchange failed: {e}");
                self.append(Message::assistant(format!("I hit an issue: {}", e.user_text())))
                    .await;
                self.apply(StateEvent::ExchangeFailed).await;
            }
        }
    }

    async fn handle_reply(&mut self, reply: TurnReply) {
        let TurnReply {
            transcript,
            response,
            audio,
            session_id,
            emotion,
        } = reply;

        // A new session identifier always overwrites the local one.
        if let Some(new_id) = session_id.filter(|id| !id.is_empty()) {
            let mut st = self.state.lock().unwrap();
            if st.session_id != new_id {
                log::debug!("pipeline: session {} replaced by {}", st.session_id, new_id);
            }
            st.session_id = new_id;
        }

        if let Some(emotion) = &emotion {
            self.state.lock().unwrap().latest_emotion = Some(emotion.clone());
        }

        self.append(Message::user(transcript, emotion)).await;

        // Slight pause before the reply, to feel more human.
        tokio::time::sleep(self.pacing).await;

        self.append(Message::assistant(response)).await;

        match audio {
            Some(bytes) => match self.playback.play(bytes) {
                Ok(handle) => {
                    self.current_playback = Some(handle);
                    self.apply(StateEvent::ReplySpoken).await;
                }
                Err(e) => {
                    // Silent fallback: the reply text already landed.
                    log::warn!("pipeline: playback could not start: {e}");
                    self.apply(StateEvent::ReplySilent).await;
                }
            },
            None => self.apply(StateEvent::ReplySilent).await,
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn current_state(&self) -> PipelineState {
        self.state.lock().unwrap().state
    }

    /// Run `event` through the pure transition table and publish the result.
    async fn apply(&self, event: StateEvent) {
        let changed = {
            let mut st = self.state.lock().unwrap();
            let next = transition(st.state, event);
            if next == st.state {
                None
            } else {
                st.state = next;
                Some(next)
            }
        };

        if let Some(next) = changed {
            let _ = self.notices.send(Notice::StateChanged(next)).await;
        }
    }

    /// Append to the conversation log (append-only; nothing is ever mutated
    /// or removed) and notify the front-end.
    async fn append(&self, message: Message) {
        {
            self.state.lock().unwrap().messages.push(message.clone());
        }
        let _ = self.notices.send(Notice::MessageAppended(message)).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
