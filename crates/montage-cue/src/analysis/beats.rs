//! Beat detection
//!
//! Adaptive-threshold onset detection over the energy envelope: a beat
//! fires where instantaneous energy exceeds both the configured floor
//! and the rolling local average scaled by sensitivity, with a minimum
//! inter-beat interval. The multi-band variant runs the same detector
//! over low/mid/high envelopes and merges nearby beats.

use montage_core::BeatMarker;
use rayon::prelude::*;

use super::envelope::{BandEnvelopes, EnergyEnvelope};

/// Rolling local-average history length, seconds
const HISTORY_SECS: f64 = 1.0;

/// Beats from different bands closer than this collapse to one
const MERGE_WINDOW_SECS: f64 = 0.15;

/// Detector thresholds; clamped to their documented ranges on build
#[derive(Debug, Clone)]
pub struct BeatDetectorConfig {
    /// Energy floor below which nothing fires (0.01 - 0.8)
    pub min_energy: f32,
    /// Local-average multiplier (1.0 - 4.0)
    pub sensitivity: f32,
    /// Minimum inter-beat interval, seconds
    pub min_interval: f64,
}

impl BeatDetectorConfig {
    pub fn new(min_energy: f32, sensitivity: f32) -> Self {
        Self {
            min_energy: min_energy.clamp(0.01, 0.8),
            sensitivity: sensitivity.clamp(1.0, 4.0),
            min_interval: 0.15,
        }
    }
}

impl Default for BeatDetectorConfig {
    fn default() -> Self {
        Self::new(0.1, 1.4)
    }
}

/// Detect beats in a single envelope
pub fn detect_beats(envelope: &EnergyEnvelope, config: &BeatDetectorConfig) -> Vec<BeatMarker> {
    let history = (HISTORY_SECS / envelope.window_secs()).round() as usize;
    let history = history.max(1);
    let values = envelope.values();

    let mut beats = Vec::new();
    let mut last_beat = f64::NEG_INFINITY;

    for (i, &instant) in values.iter().enumerate() {
        let start = i.saturating_sub(history);
        let window = &values[start..i.max(1)];
        let local_avg = window.iter().sum::<f32>() / window.len() as f32;

        let time = envelope.time_at(i);
        if instant > config.min_energy
            && instant > local_avg * config.sensitivity
            && time - last_beat >= config.min_interval
        {
            beats.push(BeatMarker::new(time, instant.clamp(0.0, 1.0)));
            last_beat = time;
        }
    }
    beats
}

/// Merge beat lists from multiple bands: beats within the merge window
/// collapse to the single highest-intensity one.
pub fn merge_band_beats(mut beats: Vec<BeatMarker>) -> Vec<BeatMarker> {
    beats.sort_by(|a, b| a.time.total_cmp(&b.time));
    let mut merged: Vec<BeatMarker> = Vec::with_capacity(beats.len());
    for beat in beats {
        match merged.last_mut() {
            Some(last) if beat.time - last.time < MERGE_WINDOW_SECS => {
                if beat.intensity > last.intensity {
                    *last = beat;
                }
            }
            _ => merged.push(beat),
        }
    }
    merged
}

/// Three parallel band-limited passes, merged
pub fn detect_beats_multiband(
    samples: &[f32],
    sample_rate: u32,
    config: &BeatDetectorConfig,
) -> Vec<BeatMarker> {
    let bands = BandEnvelopes::split(samples, sample_rate);
    let envelopes = [&bands.low, &bands.mid, &bands.high];
    let all: Vec<BeatMarker> = envelopes
        .par_iter()
        .flat_map_iter(|env| detect_beats(env, config))
        .collect();
    merge_band_beats(all)
}
