//! Montage Core - Shared library for the beat-synchronized montage suite
//!
//! Holds the montage data model, the real-time playback synchronizer
//! (decoder pool, master clock, drift correction) and the background
//! clip motion profiler.

pub mod engine;
pub mod error;
pub mod profile;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use types::*;
