//! Immutable utterance buffer assembled from capture chunks.
//!
//! The cpal input callback delivers audio in small chunks while recording is
//! active.  When the user stops recording, [`AudioBuffer::from_chunks`]
//! concatenates them in arrival order into one immutable buffer that is then
//! submitted to the turn exchange as-is — even when it is empty (an instant
//! stop produces zero chunks, which is a legitimate utterance).
//!
//! # Example
//!
//! ```rust
//! use soultalk::audio::AudioBuffer;
//!
//! let buf = AudioBuffer::from_chunks(vec![vec![1, 2], vec![3], vec![4, 5]]);
//! assert_eq!(buf.as_bytes(), &[1, 2, 3, 4, 5]);
//! ```

// ---------------------------------------------------------------------------
// AudioBuffer
// ---------------------------------------------------------------------------

/// One finalized utterance: raw captured bytes, immutable once produced.
///
/// There is no mutation API on purpose — the buffer is sealed at finalize
/// time and travels unchanged to the exchange boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioBuffer {
    bytes: Vec<u8>,
}

impl AudioBuffer {
    /// Concatenate `chunks` in arrival order into one buffer.
    ///
    /// Zero-length chunks are tolerated here but the capture callback never
    /// stores them, so in practice every chunk contributes bytes.
    pub fn from_chunks(chunks: Vec<Vec<u8>>) -> Self {
        let total: usize = chunks.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(&chunk);
        }
        Self { bytes }
    }

    /// The raw captured bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the buffer, yielding the raw bytes (used when building the
    /// multipart upload body).
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of captured bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when zero chunks were captured (instant stop).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_are_concatenated_in_arrival_order() {
        let buf = AudioBuffer::from_chunks(vec![vec![10, 20], vec![30], vec![40, 50, 60]]);
        assert_eq!(buf.as_bytes(), &[10, 20, 30, 40, 50, 60]);
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn zero_chunks_yield_an_empty_buffer() {
        let buf = AudioBuffer::from_chunks(Vec::new());
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn empty_chunks_contribute_nothing() {
        let buf = AudioBuffer::from_chunks(vec![vec![], vec![7], vec![]]);
        assert_eq!(buf.as_bytes(), &[7]);
    }

    #[test]
    fn default_buffer_is_empty() {
        assert!(AudioBuffer::default().is_empty());
    }

    #[test]
    fn into_bytes_round_trips() {
        let buf = AudioBuffer::from_chunks(vec![vec![1, 2, 3]]);
        assert_eq!(buf.clone().into_bytes(), vec![1, 2, 3]);
    }
}
