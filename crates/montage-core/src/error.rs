//! Playback engine error types

use thiserror::Error;

/// Errors that can occur during playback engine operations
///
/// The synchronizer recovers from all decoder errors by skipping ahead;
/// these types exist so decoder implementations can report *why* an
/// operation failed and so callers can log the condition.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Decoder failed to load a clip's bytes
    #[error("Failed to load clip {clip_index}: {reason}")]
    LoadFailed { clip_index: usize, reason: String },

    /// Decoder failed to seek within a loaded clip
    #[error("Failed to seek clip {clip_index} to {time:.3}s: {reason}")]
    SeekFailed {
        clip_index: usize,
        time: f64,
        reason: String,
    },

    /// Platform refused to start playback (e.g. autoplay policy)
    ///
    /// Retried on the next explicit play signal, never surfaced as a crash.
    #[error("Playback blocked by platform: {0}")]
    PlaybackBlocked(String),

    /// A segment list failed validation before reaching the synchronizer
    #[error("Invalid segment list: {0}")]
    InvalidSegments(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
