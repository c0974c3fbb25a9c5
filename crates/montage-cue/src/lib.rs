//! Montage Cue - audio analysis and montage segmentation
//!
//! Turns an audio track and a pool of profiled clips into an ordered,
//! contiguous segment list ready for the playback synchronizer:
//!
//! envelope → beats/drops → phrase structure → segmentation
//!
//! ## Analysis
//!
//! [`analysis::analyze_audio`] produces beat markers, drop zones and a
//! BPM estimate from raw samples. Detection degrades gracefully: a
//! failed band-split pass falls back to full-band energy detection and
//! fewer than 4 beats defaults the BPM to 120.
//!
//! ## Segmentation
//!
//! [`segment::build_montage`] is the scoring/decision engine; its
//! randomness comes from an injected seedable source so the same seed
//! reproduces the same montage.

pub mod analysis;
pub mod config;
pub mod segment;

pub use analysis::{analyze_audio, AnalysisResult};
pub use segment::{build_montage, SegmenterError, SegmenterOptions};
