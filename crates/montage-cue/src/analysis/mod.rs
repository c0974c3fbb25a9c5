//! Audio rhythm analysis
//!
//! Produces beat markers, drop zones and a BPM estimate from a decoded
//! sample buffer:
//!
//! envelope (RMS windows) → beats (adaptive threshold, multi-band) →
//! BPM (median intervals) → drops (surge detection) → phrase/hero tags
//!
//! Detection never fails outward: a degenerate band-split pass falls
//! back to full-band detection and sparse beat lists default the BPM.

pub mod beats;
pub mod bpm;
pub mod drops;
pub mod envelope;
pub mod phrase;

// Re-exports for convenient access
pub use beats::{detect_beats, detect_beats_multiband, BeatDetectorConfig};
pub use bpm::estimate_bpm;
pub use drops::detect_drops;
pub use envelope::{BandEnvelopes, EnergyEnvelope};

use anyhow::{bail, Result};
use montage_core::{BeatMarker, DropZone};

use crate::config::AnalysisConfig;

/// Result of a full audio analysis pass
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Ordered beat markers with structural tags
    pub beats: Vec<BeatMarker>,
    /// Non-overlapping drop zones
    pub drop_zones: Vec<DropZone>,
    /// Estimated tempo, octave-corrected
    pub bpm: f64,
    /// Full-band energy envelope (kept for UI waveforms and drops)
    pub envelope: EnergyEnvelope,
}

/// Run full rhythm analysis on a mono sample buffer
///
/// # Arguments
/// * `samples` - Mono samples (first channel of the decoded track)
/// * `sample_rate` - Samples per second
/// * `config` - Detection thresholds, usually from a style preset
pub fn analyze_audio(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<AnalysisResult> {
    if samples.is_empty() {
        bail!("No audio samples to analyze");
    }
    if sample_rate == 0 {
        bail!("Invalid sample rate");
    }
    log::info!(
        "analyze_audio: {} samples ({:.1}s at {}Hz)",
        samples.len(),
        samples.len() as f64 / sample_rate as f64,
        sample_rate
    );

    let detector = BeatDetectorConfig::new(config.min_energy, config.sensitivity);
    let envelope = EnergyEnvelope::from_samples(samples, sample_rate);

    let mut beats = detect_beats_multiband(samples, sample_rate, &detector);
    if beats.len() < 4 {
        // Band-limited passes found next to nothing; fall back to the
        // plain full-band energy method.
        log::warn!(
            "Multi-band detection produced {} beats, falling back to full-band",
            beats.len()
        );
        beats = detect_beats(&envelope, &detector);
    }

    let bpm = estimate_bpm(&beats);
    let drop_zones = detect_drops(&envelope);

    phrase::assign_structure(&mut beats, bpm);
    phrase::mark_drop_beats(&mut beats, &drop_zones);
    phrase::select_hero_moments(&mut beats);

    log::info!(
        "analyze_audio: {} beats, {} drops, {:.1} BPM",
        beats.len(),
        drop_zones.len(),
        bpm
    );

    Ok(AnalysisResult {
        beats,
        drop_zones,
        bpm,
        envelope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_track(interval_secs: f64, n_clicks: usize, sample_rate: u32) -> Vec<f32> {
        let total = ((n_clicks as f64 + 1.0) * interval_secs * sample_rate as f64) as usize;
        let mut samples = vec![0.001f32; total];
        for k in 0..n_clicks {
            let at = ((k as f64 + 0.5) * interval_secs * sample_rate as f64) as usize;
            let end = (at + sample_rate as usize / 50).min(total);
            for s in &mut samples[at..end] {
                *s = 0.9;
            }
        }
        samples
    }

    #[test]
    fn empty_input_is_rejected() {
        let config = AnalysisConfig::default();
        assert!(analyze_audio(&[], 44100, &config).is_err());
        assert!(analyze_audio(&[0.1], 0, &config).is_err());
    }

    #[test]
    fn click_track_analyzes_end_to_end() {
        let samples = click_track(0.5, 16, 44100);
        let result = analyze_audio(&samples, 44100, &AnalysisConfig::default()).unwrap();
        assert!(result.beats.len() >= 10);
        assert!((result.bpm - 120.0).abs() < 10.0, "bpm = {}", result.bpm);
        // Structure assigned.
        assert!(result.beats.iter().any(|b| b.is_downbeat));
        // Hero floor.
        assert!(result.beats.iter().filter(|b| b.is_hero_moment).count() >= 3);
        // Ordered by time.
        for pair in result.beats.windows(2) {
            assert!(pair[0].time < pair[1].time);
        }
    }

    #[test]
    fn sparse_material_degrades_instead_of_failing() {
        // Near-silence with a single thump: detection must not error and
        // BPM must fall back to the default.
        let mut samples = vec![0.0005f32; 44100 * 4];
        for s in &mut samples[44100..44541] {
            *s = 0.9;
        }
        let result = analyze_audio(&samples, 44100, &AnalysisConfig::default()).unwrap();
        assert_eq!(result.bpm, bpm::DEFAULT_BPM);
    }
}
