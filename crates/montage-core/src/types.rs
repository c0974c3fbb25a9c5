//! Common types for the montage suite
//!
//! This module contains the fundamental data model shared between the
//! analysis/segmentation side (montage-cue) and the playback engine:
//! beat markers, drop zones, clip profiles, clips and segments.

use serde::{Deserialize, Serialize};

/// Number of reusable decoder slots in the playback pool
pub const POOL_SLOTS: usize = 3;

/// Shortest segment duration the engine will accept (seconds)
///
/// Anything shorter is merged into its neighbour at segmentation time so
/// the synchronizer never has to deal with sub-frame segments.
pub const MIN_SEGMENT_SECS: f64 = 0.1;

/// A detected rhythmic onset with intensity and structural tags
///
/// Beat markers are produced once per analysis pass, are immutable
/// afterwards, and form a sequence ordered by `time` with a minimum
/// spacing enforced at detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatMarker {
    /// Position on the audio clock, in seconds
    pub time: f64,
    /// Normalized onset strength (0.0 - 1.0)
    pub intensity: f32,
    /// First beat of a 4-beat bar
    pub is_downbeat: bool,
    /// Position within the bar (1-4)
    pub bar_position: u8,
    /// Position within a 32-beat phrase (1-32)
    pub phrase_position: u8,
    /// Closest beat to a drop peak
    pub is_drop: bool,
    /// Flagged for premium clip/transition treatment
    pub is_hero_moment: bool,
}

impl BeatMarker {
    /// Create a plain beat with no structural tags yet
    pub fn new(time: f64, intensity: f32) -> Self {
        Self {
            time,
            intensity,
            is_downbeat: false,
            bar_position: 1,
            phrase_position: 1,
            is_drop: false,
            is_hero_moment: false,
        }
    }
}

/// A time range where audio energy surges from a calmer baseline
///
/// Zones never overlap; they are generated from the energy envelope in a
/// single pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropZone {
    pub start_time: f64,
    pub peak_time: f64,
    pub end_time: f64,
    /// Peak envelope energy within the zone (0.0 - 1.0)
    pub intensity: f32,
}

impl DropZone {
    /// Whether a time falls inside this zone
    #[inline]
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time
    }
}

/// Dominant motion classification for a profiled clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionDirection {
    Static,
    Horizontal,
    Vertical,
    Chaotic,
}

/// Visual statistics for a clip, computed off the main thread
///
/// Until `processed` is true the segmenter must treat the clip as
/// neutral (0.5/0.5/0.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipProfile {
    /// Mean luma (0.0 - 1.0)
    pub brightness: f32,
    /// Scaled luma variance (0.0 - 1.0)
    pub contrast: f32,
    /// Normalized inter-frame motion (0.0 - 1.0)
    pub motion_energy: f32,
    /// Dominant motion classification, if grid analysis ran
    pub dominant_motion: Option<MotionDirection>,
    /// Timestamp of the clip's most dynamic sampled position
    pub peak_motion_time: Option<f64>,
    /// False while profiling is still pending or failed
    pub processed: bool,
}

impl ClipProfile {
    /// Neutral defaults used before profiling completes (or after it fails)
    pub fn neutral() -> Self {
        Self {
            brightness: 0.5,
            contrast: 0.5,
            motion_energy: 0.5,
            dominant_motion: None,
            peak_motion_time: None,
            processed: false,
        }
    }
}

impl Default for ClipProfile {
    fn default() -> Self {
        Self::neutral()
    }
}

/// A source video clip with its playable sub-range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoClip {
    pub id: u64,
    /// Full duration of the underlying media, seconds
    pub source_duration: f64,
    /// Start of the playable sub-range
    pub trim_start: f64,
    /// End of the playable sub-range (`trim_start < trim_end <= source_duration`)
    pub trim_end: f64,
    /// Visual profile, present once the profiler has run
    pub profile: Option<ClipProfile>,
    /// User-designated hero clip, preferred for drop/hero segments
    #[serde(default)]
    pub is_hero: bool,
}

impl VideoClip {
    /// Create a clip spanning its full source duration
    pub fn new(id: u64, source_duration: f64) -> Self {
        Self {
            id,
            source_duration,
            trim_start: 0.0,
            trim_end: source_duration,
            profile: None,
            is_hero: false,
        }
    }

    /// Validate the trim invariant
    pub fn is_valid(&self) -> bool {
        self.source_duration.is_finite()
            && self.trim_start.is_finite()
            && self.trim_end.is_finite()
            && self.trim_start >= 0.0
            && self.trim_start < self.trim_end
            && self.trim_end <= self.source_duration
    }

    /// Length of the playable sub-range, seconds
    #[inline]
    pub fn playable_len(&self) -> f64 {
        self.trim_end - self.trim_start
    }

    /// Profile to use for scoring: real profile once processed, neutral otherwise
    pub fn effective_profile(&self) -> ClipProfile {
        match &self.profile {
            Some(p) if p.processed => p.clone(),
            _ => ClipProfile::neutral(),
        }
    }
}

/// Transition applied at the start of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Cut,
    Crossfade,
    Zoom,
    Glitch,
    Whip,
    Flash,
    Impact,
}

/// Color/look filter attached to a segment
///
/// The core only carries the enum; mapping to an actual effect belongs to
/// the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipFilter {
    None,
    BlackWhite,
    Contrast,
    Cyber,
    Saturate,
    Warm,
}

/// One beat-aligned cut of the final montage
///
/// Segments carry enough information to be re-materialized independently
/// of the synchronizer: the export side extracts
/// `[clip_start_time, clip_start_time + duration)` from the source clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Montage-time start, seconds
    pub start_time: f64,
    /// Montage-time end, exclusive (`end_time > start_time`)
    pub end_time: f64,
    /// Index into the clip list
    pub video_index: usize,
    /// Offset into the clip (`trim_start <= clip_start_time <= trim_end`)
    pub clip_start_time: f64,
    pub transition: Transition,
    pub filter: ClipFilter,
    pub is_hero_segment: bool,
    pub is_drop_segment: bool,
    /// Decoder rate multiplier (1.0 = normal)
    pub playback_speed: f64,
    /// Per-segment sync quality (0-100)
    pub sync_score: f32,
    /// Clip shown by the previous segment, for transition rendering
    pub prev_video_index: Option<usize>,
}

impl Segment {
    #[inline]
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether a montage time falls inside this segment
    #[inline]
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time
    }
}

/// The segmenter's output contract: ordered contiguous segments plus
/// aggregate statistics
///
/// This is the sole hand-off to rendering/export collaborators and is
/// re-derivable deterministically from the same beats, clips and options
/// when a fixed seed is supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Montage {
    pub segments: Vec<Segment>,
    pub bpm: f64,
    /// Mean segment sync score, normalized 0-100
    pub average_score: f32,
    pub drop_count: usize,
    pub hero_count: usize,
}

impl Montage {
    /// Total duration covered by the segment list
    pub fn duration(&self) -> f64 {
        self.segments.last().map(|s| s.end_time).unwrap_or(0.0)
    }

    /// Enforce the segment-list invariants the synchronizer relies on
    ///
    /// Checks that segments are time-sorted, contiguous, span exactly
    /// `[0, total_duration)`, reference valid clips, keep their in-clip
    /// offsets within trim bounds, and carry finite timing with at least
    /// the minimum duration. Invariant violations are rejected here so
    /// they never reach the playback engine.
    pub fn validate(&self, clips: &[VideoClip], total_duration: f64) -> Result<(), String> {
        if self.segments.is_empty() {
            return Err("montage has no segments".into());
        }

        let first = &self.segments[0];
        if first.start_time.abs() > 1e-6 {
            return Err(format!(
                "first segment starts at {:.3}s, expected 0",
                first.start_time
            ));
        }

        let last = self.segments.last().unwrap();
        if (last.end_time - total_duration).abs() > 1e-3 {
            return Err(format!(
                "last segment ends at {:.3}s, expected {:.3}s",
                last.end_time, total_duration
            ));
        }

        let mut prev_end: Option<f64> = None;
        for (i, seg) in self.segments.iter().enumerate() {
            if !seg.start_time.is_finite()
                || !seg.end_time.is_finite()
                || !seg.clip_start_time.is_finite()
                || !seg.playback_speed.is_finite()
            {
                return Err(format!("segment {i} has non-finite timing"));
            }
            if seg.duration() < MIN_SEGMENT_SECS - 1e-6 {
                return Err(format!(
                    "segment {i} duration {:.3}s below minimum",
                    seg.duration()
                ));
            }
            if let Some(end) = prev_end {
                if (seg.start_time - end).abs() > 1e-6 {
                    return Err(format!(
                        "segment {i} starts at {:.3}s but previous ended at {:.3}s",
                        seg.start_time, end
                    ));
                }
            }
            let clip = clips
                .get(seg.video_index)
                .ok_or_else(|| format!("segment {i} references clip {}", seg.video_index))?;
            if seg.clip_start_time < clip.trim_start - 1e-6
                || seg.clip_start_time > clip.trim_end + 1e-6
            {
                return Err(format!(
                    "segment {i} clip offset {:.3}s outside trim range [{:.3}, {:.3}]",
                    seg.clip_start_time, clip.trim_start, clip.trim_end
                ));
            }
            prev_end = Some(seg.end_time);
        }

        Ok(())
    }
}
