//! BPM estimation from detected beats
//!
//! Median of the smallest inter-beat intervals with outlier rejection,
//! octave-corrected into the plausible human-tempo range. Fully
//! deterministic: the same beat list always yields the same BPM.

use montage_core::BeatMarker;

/// How many of the smallest intervals feed the median
const INTERVAL_SAMPLE: usize = 48;

/// Intervals deviating more than this from the median are discarded
const OUTLIER_RATIO: f64 = 0.3;

/// Octave-correction target range
const MIN_BPM: f64 = 80.0;
const MAX_BPM: f64 = 180.0;

/// Fallback when too few beats were found
pub const DEFAULT_BPM: f64 = 120.0;

/// Estimate tempo from an ordered beat list
pub fn estimate_bpm(beats: &[BeatMarker]) -> f64 {
    if beats.len() < 4 {
        log::warn!(
            "Only {} beats detected, defaulting to {} BPM",
            beats.len(),
            DEFAULT_BPM
        );
        return DEFAULT_BPM;
    }

    let mut intervals: Vec<f64> = beats
        .windows(2)
        .map(|pair| pair[1].time - pair[0].time)
        .filter(|&dt| dt > 1e-6)
        .collect();
    if intervals.is_empty() {
        return DEFAULT_BPM;
    }

    // Median of the smallest ~48 intervals: the tightest spacings are
    // the most likely true beat period; long gaps are missed beats.
    intervals.sort_by(f64::total_cmp);
    intervals.truncate(INTERVAL_SAMPLE);
    let median = intervals[intervals.len() / 2];

    let kept: Vec<f64> = intervals
        .iter()
        .copied()
        .filter(|&dt| (dt - median).abs() <= median * OUTLIER_RATIO)
        .collect();
    let mean = if kept.is_empty() {
        median
    } else {
        kept.iter().sum::<f64>() / kept.len() as f64
    };
    if mean <= 1e-6 {
        return DEFAULT_BPM;
    }

    let mut bpm = 60.0 / mean;
    while bpm < MIN_BPM {
        bpm *= 2.0;
    }
    while bpm > MAX_BPM {
        bpm /= 2.0;
    }
    bpm
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beats_at_interval(interval: f64, count: usize) -> Vec<BeatMarker> {
        (0..count)
            .map(|i| BeatMarker::new(i as f64 * interval, 0.8))
            .collect()
    }

    #[test]
    fn steady_120_bpm_detected() {
        let beats = beats_at_interval(0.5, 40);
        assert!((estimate_bpm(&beats) - 120.0).abs() < 0.5);
    }

    #[test]
    fn too_few_beats_defaults_to_120() {
        let beats = beats_at_interval(0.5, 3);
        assert_eq!(estimate_bpm(&beats), DEFAULT_BPM);
        assert_eq!(estimate_bpm(&[]), DEFAULT_BPM);
    }

    #[test]
    fn octave_correction_lands_in_human_range() {
        // 40ms spacing (~1500 BPM raw) must halve into [80, 180].
        let beats = beats_at_interval(0.04, 60);
        let bpm = estimate_bpm(&beats);
        assert!((80.0..=180.0).contains(&bpm), "bpm = {bpm}");
        // Slow spacing doubles up into the range.
        let slow = beats_at_interval(1.5, 20);
        let bpm = estimate_bpm(&slow);
        assert!((80.0..=180.0).contains(&bpm), "bpm = {bpm}");
    }

    #[test]
    fn estimation_is_idempotent() {
        let mut beats = beats_at_interval(0.431, 50);
        // A few irregular gaps.
        beats[10].time += 0.2;
        beats[30].time -= 0.1;
        let first = estimate_bpm(&beats);
        for _ in 0..5 {
            assert_eq!(estimate_bpm(&beats), first);
        }
    }

    #[test]
    fn outlier_gaps_do_not_skew_estimate() {
        let mut beats = beats_at_interval(0.5, 40);
        // Simulate a 4-second breakdown with no detected beats.
        for b in beats.iter_mut().skip(20) {
            b.time += 4.0;
        }
        assert!((estimate_bpm(&beats) - 120.0).abs() < 1.0);
    }
}
