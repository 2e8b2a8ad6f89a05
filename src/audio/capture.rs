//! Microphone capture via `cpal`.
//!
//! [`CaptureManager`] is the seam the orchestrator drives; [`MicCapture`] is
//! the production implementation.  cpal streams are not `Send` on every
//! platform, so `MicCapture` parks the stream on a dedicated device worker
//! thread and talks to it over a command channel.  The input callback pushes
//! non-empty chunks into a shared list; [`CaptureManager::stop`] asks the
//! worker to finalize, which drops the stream guard (releasing the hardware
//! on every path, including the zero-chunk one) and concatenates whatever
//! arrived into one immutable [`AudioBuffer`].

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tokio::sync::oneshot;

use super::buffer::AudioBuffer;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while acquiring or starting the input device.
///
/// These are reported once and never retried; the orchestrator logs them and
/// stays in `Idle`.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The input device refused access or no input device exists.
    #[error("microphone access denied or no input device available")]
    PermissionDenied,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The device worker thread has exited — only possible during shutdown.
    #[error("audio device worker is gone")]
    WorkerGone,
}

// ---------------------------------------------------------------------------
// CaptureManager trait
// ---------------------------------------------------------------------------

/// Exclusive ownership of the audio input path for one utterance.
///
/// # Contract
///
/// - [`start`](Self::start) must not be called while a capture is active;
///   the orchestrator guards this through its state machine, not through
///   locking here.
/// - [`stop`](Self::stop) is infallible: without a prior `start` it returns
///   an empty buffer immediately, and on every path it releases the device
///   before returning.
#[async_trait]
pub trait CaptureManager: Send + Sync {
    /// Request device access and begin buffering chunks.
    async fn start(&mut self) -> Result<(), CaptureError>;

    /// Finalize the utterance: release the device and return the captured
    /// bytes in arrival order (possibly empty).
    async fn stop(&mut self) -> AudioBuffer;
}

// ---------------------------------------------------------------------------
// Device worker
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.  Dropping it stops the
/// underlying hardware stream, which is what clears the OS input indicator.
struct StreamHandle {
    _stream: cpal::Stream,
}

/// Chunk list shared between the cpal callback and the worker.
type SharedChunks = Arc<Mutex<Vec<Vec<u8>>>>;

struct ActiveRecording {
    stream: StreamHandle,
    chunks: SharedChunks,
}

enum DeviceCommand {
    Start {
        ack: oneshot::Sender<Result<(), CaptureError>>,
    },
    Finalize {
        ack: oneshot::Sender<AudioBuffer>,
    },
}

/// Convert one cpal callback buffer to little-endian 16-bit PCM bytes.
fn samples_to_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Open the default input device and start streaming chunks into `chunks`.
fn open_input_stream(chunks: SharedChunks) -> Result<StreamHandle, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::PermissionDenied)?;

    let supported = device.default_input_config().map_err(|e| match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::PermissionDenied,
        other => CaptureError::DefaultConfig(other),
    })?;
    let config: cpal::StreamConfig = supported.into();

    let sink = Arc::clone(&chunks);
    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Zero-length callbacks are filtered and never stored.
                if data.is_empty() {
                    return;
                }
                let bytes = samples_to_bytes(data);
                if let Ok(mut list) = sink.lock() {
                    list.push(bytes);
                }
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => CaptureError::PermissionDenied,
            other => CaptureError::BuildStream(other),
        })?;

    stream.play()?;
    Ok(StreamHandle { _stream: stream })
}

/// Worker loop that owns the (non-`Send`) cpal stream.
fn device_worker(commands: std_mpsc::Receiver<DeviceCommand>) {
    let mut active: Option<ActiveRecording> = None;

    while let Ok(command) = commands.recv() {
        match command {
            DeviceCommand::Start { ack } => {
                if active.is_some() {
                    // Caller contract violation — the orchestrator guards
                    // against this.  Keep the running capture untouched.
                    log::warn!("capture: start requested while already recording");
                    let _ = ack.send(Ok(()));
                    continue;
                }

                let chunks: SharedChunks = Arc::new(Mutex::new(Vec::new()));
                match open_input_stream(Arc::clone(&chunks)) {
                    Ok(stream) => {
                        active = Some(ActiveRecording { stream, chunks });
                        let _ = ack.send(Ok(()));
                    }
                    Err(e) => {
                        let _ = ack.send(Err(e));
                    }
                }
            }

            DeviceCommand::Finalize { ack } => {
                let buffer = match active.take() {
                    Some(ActiveRecording { stream, chunks }) => {
                        // Release the hardware before touching the chunk
                        // list, so the input indicator clears even when zero
                        // chunks arrived.
                        drop(stream);
                        let list = std::mem::take(&mut *chunks.lock().unwrap());
                        AudioBuffer::from_chunks(list)
                    }
                    None => AudioBuffer::default(),
                };
                let _ = ack.send(buffer);
            }
        }
    }

    log::debug!("capture: command channel closed, device worker exiting");
}

// ---------------------------------------------------------------------------
// MicCapture
// ---------------------------------------------------------------------------

/// Production [`CaptureManager`] backed by the system default input device.
///
/// The device is opened on [`start`](CaptureManager::start) and closed on
/// [`stop`](CaptureManager::stop) — it is held only for the lifetime of one
/// utterance.
pub struct MicCapture {
    commands: std_mpsc::Sender<DeviceCommand>,
}

impl MicCapture {
    /// Spawn the device worker thread.  No device access happens until the
    /// first `start` call.
    pub fn new() -> Self {
        let (tx, rx) = std_mpsc::channel();
        std::thread::Builder::new()
            .name("audio-device".into())
            .spawn(move || device_worker(rx))
            .expect("failed to spawn audio device worker");
        Self { commands: tx }
    }
}

impl Default for MicCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureManager for MicCapture {
    async fn start(&mut self) -> Result<(), CaptureError> {
        let (ack, response) = oneshot::channel();
        self.commands
            .send(DeviceCommand::Start { ack })
            .map_err(|_| CaptureError::WorkerGone)?;
        response.await.map_err(|_| CaptureError::WorkerGone)?
    }

    async fn stop(&mut self) -> AudioBuffer {
        let (ack, response) = oneshot::channel();
        if self
            .commands
            .send(DeviceCommand::Finalize { ack })
            .is_err()
        {
            return AudioBuffer::default();
        }
        response.await.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- samples_to_bytes ---

    #[test]
    fn samples_convert_to_little_endian_pcm16() {
        let bytes = samples_to_bytes(&[0.0, 1.0, -1.0]);
        assert_eq!(&bytes[0..2], &0i16.to_le_bytes());
        assert_eq!(&bytes[2..4], &i16::MAX.to_le_bytes());
        assert_eq!(&bytes[4..6], &(-i16::MAX).to_le_bytes());
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let bytes = samples_to_bytes(&[2.0, -3.0]);
        assert_eq!(&bytes[0..2], &i16::MAX.to_le_bytes());
        assert_eq!(&bytes[2..4], &(-i16::MAX).to_le_bytes());
    }

    #[test]
    fn empty_samples_produce_no_bytes() {
        assert!(samples_to_bytes(&[]).is_empty());
    }

    // ---- MicCapture ---

    /// `stop` without a prior `start` answers immediately with an empty
    /// buffer and touches no hardware.
    #[tokio::test]
    async fn stop_without_start_returns_empty_buffer() {
        let mut capture = MicCapture::new();
        let buffer = capture.stop().await;
        assert!(buffer.is_empty());
    }

    /// Repeated stops stay cheap and empty — the worker holds no state
    /// between utterances.
    #[tokio::test]
    async fn repeated_stop_is_a_no_op() {
        let mut capture = MicCapture::new();
        assert!(capture.stop().await.is_empty());
        assert!(capture.stop().await.is_empty());
    }

    #[test]
    fn mic_capture_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<MicCapture>();
    }
}
