//! Decoder seam - the boundary to the platform's video playback
//!
//! The synchronizer never talks to a concrete player; it drives this
//! trait. Loads and seeks are asynchronous on real platforms, so the
//! trait exposes a `is_ready` flag the frame loop polls instead of
//! blocking.

use crate::error::EngineResult;
use crate::types::VideoClip;

/// One reusable video decoder driven by the playback synchronizer
///
/// Implementations wrap whatever the presentation side uses to decode
/// and show video. All waits are expressed as `is_ready` transitions
/// polled each frame; no method may block the render loop.
pub trait ClipDecoder {
    /// Begin loading a clip's bytes. Non-blocking; readiness is reported
    /// through [`ClipDecoder::is_ready`].
    fn load(&mut self, clip: &VideoClip) -> EngineResult<()>;

    /// Seek to an absolute time within the loaded clip. Non-blocking.
    fn seek(&mut self, time: f64) -> EngineResult<()>;

    /// Start decoding/presenting frames
    fn play(&mut self) -> EngineResult<()>;

    /// Pause decoding
    fn pause(&mut self);

    /// Set the playback rate multiplier
    fn set_rate(&mut self, rate: f64);

    /// Show or hide this decoder's output surface
    fn set_visible(&mut self, visible: bool);

    /// Blend opacity for crossfades (0.0 - 1.0)
    fn set_opacity(&mut self, opacity: f32);

    /// Current decode position within the clip, seconds
    fn position(&self) -> f64;

    /// Whether the last load/seek has completed and frames are available
    fn is_ready(&self) -> bool;
}
