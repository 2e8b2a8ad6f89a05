//! Audio input for SoulTalk.
//!
//! [`CaptureManager`] owns exclusive access to the microphone for the
//! duration of one utterance; [`MicCapture`] is the cpal-backed production
//! implementation.  [`AudioBuffer`] is the immutable result of a finalized
//! capture.

pub mod buffer;
pub mod capture;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use buffer::AudioBuffer;
pub use capture::{CaptureError, CaptureManager, MicCapture};
