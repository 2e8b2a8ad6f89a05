//! SoulTalk — a client-side voice-interaction orchestrator.
//!
//! Capture one utterance from the microphone, exchange it with the remote
//! conversational service, play back the synthesized reply, and drive the
//! four-state interaction machine (`Idle → Recording → Thinking →
//! Speaking`) that UI surfaces observe.
//!
//! # Modules
//!
//! - [`audio`]    — microphone capture ([`audio::CaptureManager`]) and the
//!   immutable utterance buffer.
//! - [`playback`] — synthesized-speech playback with interrupt support.
//! - [`api`]      — the remote-service boundary: session creation + the
//!   per-turn exchange.
//! - [`pipeline`] — the orchestrator, its state machine and shared state.
//! - [`config`]   — TOML settings and platform paths.

pub mod api;
pub mod audio;
pub mod config;
pub mod pipeline;
pub mod playback;
