//! Synthesized-speech playback via `rodio`.
//!
//! [`PlaybackController`] is the seam the orchestrator drives;
//! [`SpeakerPlayback`] is the production implementation.  `play` decodes the
//! self-contained payload and returns a [`PlaybackHandle`] immediately; a
//! watcher thread delivers exactly one
//! [`PipelineEvent::PlaybackFinished`](crate::pipeline::PipelineEvent)
//! message into the orchestrator's event loop when the audio ends
//! naturally.  `stop` halts playback, suppresses the completion message and
//! is a no-op on handles that are stale, already stopped or already done.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rodio::{OutputStream, OutputStreamHandle, Sink};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::pipeline::PipelineEvent;

// ---------------------------------------------------------------------------
// PlaybackHandle
// ---------------------------------------------------------------------------

/// Identifies one playback session.  Handles are never reused, so a stale
/// completion message can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(pub(crate) u64);

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors raised when playback cannot start.  The orchestrator absorbs
/// these into a silent fallback to `Idle` — they never propagate further.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no output device available")]
    NoDevice,

    #[error("could not open audio output: {0}")]
    Output(String),

    #[error("could not decode synthesized audio: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// PlaybackController trait
// ---------------------------------------------------------------------------

/// Ownership of the audio output path for one synthesized reply.
///
/// # Contract
///
/// - [`play`](Self::play) never blocks; decoding/starting failures are
///   reported once through [`PlaybackError`].
/// - Completion is notified exactly once, only on natural end-of-data.
/// - [`stop`](Self::stop) suppresses the pending completion and is
///   idempotent.
pub trait PlaybackController: Send + Sync {
    /// Begin playing `audio` (a self-contained encoded payload) and return a
    /// handle for later interruption.
    fn play(&mut self, audio: Vec<u8>) -> Result<PlaybackHandle, PlaybackError>;

    /// Halt the playback identified by `handle` before completion.  No-op
    /// for unknown, stopped or completed handles.
    fn stop(&mut self, handle: PlaybackHandle);
}

// ---------------------------------------------------------------------------
// SpeakerPlayback
// ---------------------------------------------------------------------------

struct CurrentPlayback {
    handle: PlaybackHandle,
    sink: Arc<Sink>,
    stopped: Arc<AtomicBool>,
}

/// Production [`PlaybackController`] backed by the system default output
/// device.
pub struct SpeakerPlayback {
    output: OutputStreamHandle,
    events: mpsc::Sender<PipelineEvent>,
    next_id: u64,
    current: Option<CurrentPlayback>,
}

impl SpeakerPlayback {
    /// Open the default output device.
    ///
    /// Returns the controller together with the [`OutputStream`] the caller
    /// must keep alive for the lifetime of the program — the stream is not
    /// `Send`, so it stays on the main thread while the controller moves
    /// into the orchestrator task.
    pub fn new(
        events: mpsc::Sender<PipelineEvent>,
    ) -> Result<(Self, OutputStream), PlaybackError> {
        let (stream, output) = OutputStream::try_default().map_err(|e| match e {
            rodio::StreamError::NoDevice => PlaybackError::NoDevice,
            other => PlaybackError::Output(other.to_string()),
        })?;

        Ok((
            Self {
                output,
                events,
                next_id: 0,
                current: None,
            },
            stream,
        ))
    }
}

impl PlaybackController for SpeakerPlayback {
    fn play(&mut self, audio: Vec<u8>) -> Result<PlaybackHandle, PlaybackError> {
        let source = rodio::Decoder::new(Cursor::new(audio))
            .map_err(|e| PlaybackError::Decode(e.to_string()))?;

        let sink = Sink::try_new(&self.output).map_err(|e| PlaybackError::Output(e.to_string()))?;
        sink.append(source);

        let handle = PlaybackHandle(self.next_id);
        self.next_id += 1;

        let sink = Arc::new(sink);
        let stopped = Arc::new(AtomicBool::new(false));

        // Watcher thread: report natural end-of-data into the orchestrator
        // loop, unless stop() suppressed it first.
        let watcher_sink = Arc::clone(&sink);
        let watcher_stopped = Arc::clone(&stopped);
        let events = self.events.clone();
        std::thread::Builder::new()
            .name("playback-watch".into())
            .spawn(move || {
                watcher_sink.sleep_until_end();
                if !watcher_stopped.load(Ordering::SeqCst) {
                    let _ = events.blocking_send(PipelineEvent::PlaybackFinished(handle));
                }
            })
            .map_err(|e| PlaybackError::Output(e.to_string()))?;

        self.current = Some(CurrentPlayback {
            handle,
            sink,
            stopped,
        });
        Ok(handle)
    }

    fn stop(&mut self, handle: PlaybackHandle) {
        if !is_current(self.current.as_ref().map(|c| c.handle), handle) {
            // Stale, already-stopped or already-completed handle.
            return;
        }
        let current = self.current.take().unwrap();
        current.stopped.store(true, Ordering::SeqCst);
        current.sink.stop();
        log::debug!("playback: {handle:?} stopped by interrupt");
    }
}

/// Whether `requested` identifies the session currently playing.  Once a
/// session is stopped or completes, `current` is cleared, so a repeated stop
/// for the same handle no longer matches.
fn is_current(current: Option<PlaybackHandle>, requested: PlaybackHandle) -> bool {
    current == Some(requested)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_with_same_id_compare_equal() {
        assert_eq!(PlaybackHandle(3), PlaybackHandle(3));
        assert_ne!(PlaybackHandle(3), PlaybackHandle(4));
    }

    // ---- stop decision ---

    #[test]
    fn stop_matches_only_the_current_handle() {
        assert!(is_current(Some(PlaybackHandle(3)), PlaybackHandle(3)));
        assert!(!is_current(Some(PlaybackHandle(3)), PlaybackHandle(4)));
    }

    /// Stopping or completing clears the current session, so a second stop
    /// for the same handle no longer matches anything.
    #[test]
    fn stop_is_a_no_op_once_the_session_is_cleared() {
        assert!(!is_current(None, PlaybackHandle(3)));
    }

    #[test]
    fn decode_error_mentions_the_cause() {
        let err = PlaybackError::Decode("unrecognized container".into());
        assert!(err.to_string().contains("unrecognized container"));
    }

    #[test]
    fn speaker_playback_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SpeakerPlayback>();
    }
}
