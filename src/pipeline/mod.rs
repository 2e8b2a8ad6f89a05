//! Pipeline orchestrator module for SoulTalk.
//!
//! This module wires capture → turn exchange → playback and exposes the
//! shared state every UI surface observes.
//!
//! # Architecture
//!
//! ```text
//! PipelineEvent (mpsc)  ←─ primary control presses, playback completions
//!        │
//!        ▼
//! PipelineOrchestrator::run()  ← single tokio task, one event at a time
//!        │
//!        ├─ Idle      + press → CaptureManager::start     → Recording
//!        ├─ Recording + press → stop → TurnExchange       → Thinking → …
//!        ├─ Thinking  + press → inert
//!        └─ Speaking  + press → PlaybackController::stop  → Idle
//!
//! SharedState (Arc<Mutex<AppState>>) ←── conversation log, latest emotion,
//!                                        session id, current state
//! Notice (mpsc) ──▶ front-end (state changes, appended messages)
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{Notice, PipelineEvent, PipelineOrchestrator};
pub use state::{
    new_shared_state, transition, AppState, Message, PipelineState, Role, SharedState, StateEvent,
};
