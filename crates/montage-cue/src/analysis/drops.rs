//! Drop detection
//!
//! Slides a one-second window across the energy envelope looking for a
//! surge from a calm baseline to a sustained high-energy peak. Nearby
//! candidates collapse to one zone, keeping the later peak; emitted
//! zones never overlap.

use montage_core::DropZone;

use super::envelope::EnergyEnvelope;

/// Analysis window, seconds
const WINDOW_SECS: f64 = 1.0;

/// Baseline must sit below this before the surge
const BASELINE_MAX: f32 = 0.55;

/// Peak must exceed this inside the surge window
const PEAK_MIN: f32 = 0.5;

/// Mean energy after the peak must stay above this (sustained drop,
/// not an isolated hit)
const SUSTAIN_MIN: f32 = 0.4;

/// Candidates closer than this merge, keeping the later peak
const MERGE_SECS: f64 = 6.0;

/// How long a zone extends past its peak
const ZONE_TAIL_SECS: f64 = 2.0;

/// Detect drop zones in one pass over the envelope
pub fn detect_drops(envelope: &EnergyEnvelope) -> Vec<DropZone> {
    let w = (WINDOW_SECS / envelope.window_secs()).round() as usize;
    let values = envelope.values();
    if w == 0 || values.len() < w * 3 {
        return Vec::new();
    }

    let mean = |s: &[f32]| s.iter().sum::<f32>() / s.len() as f32;

    let mut candidates: Vec<DropZone> = Vec::new();
    for i in w..values.len() - 2 * w {
        let baseline = mean(&values[i - w..i]);
        let surge = &values[i..i + w];
        let sustain = mean(&values[i + w..i + 2 * w]);

        let (peak_off, &peak) = surge
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();

        if baseline < BASELINE_MAX && peak > PEAK_MIN && sustain > SUSTAIN_MIN && peak > baseline {
            let peak_time = envelope.time_at(i + peak_off);
            let zone = DropZone {
                start_time: envelope.time_at(i),
                peak_time,
                end_time: (peak_time + ZONE_TAIL_SECS).min(envelope.duration()),
                intensity: peak,
            };
            match candidates.last_mut() {
                // Within the merge horizon: keep the later, stronger peak.
                Some(last) if zone.peak_time - last.peak_time < MERGE_SECS => {
                    if zone.intensity >= last.intensity {
                        last.peak_time = zone.peak_time;
                        last.end_time = zone.end_time;
                        last.intensity = zone.intensity;
                    }
                }
                _ => candidates.push(zone),
            }
        }
    }

    // Clamp any residual overlap after merging.
    for i in 1..candidates.len() {
        if candidates[i].start_time < candidates[i - 1].end_time {
            candidates[i].start_time = candidates[i - 1].end_time;
        }
    }
    candidates.retain(|z| z.start_time < z.end_time);

    log::debug!("Detected {} drop zones", candidates.len());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an envelope directly from a quiet/loud step pattern.
    fn envelope_from_pattern(pattern: &[(f64, f32)], sample_rate: u32) -> EnergyEnvelope {
        // pattern: (duration_secs, amplitude)
        let mut samples = Vec::new();
        for &(secs, amp) in pattern {
            let n = (secs * sample_rate as f64) as usize;
            samples.extend(std::iter::repeat(amp).take(n));
        }
        EnergyEnvelope::from_samples(&samples, sample_rate)
    }

    #[test]
    fn surge_from_quiet_baseline_is_a_drop() {
        let env = envelope_from_pattern(&[(4.0, 0.1), (6.0, 0.9)], 44100);
        let drops = detect_drops(&env);
        assert_eq!(drops.len(), 1);
        let zone = &drops[0];
        assert!(zone.peak_time > 3.0 && zone.peak_time < 6.5, "peak at {}", zone.peak_time);
        assert!(zone.start_time < zone.peak_time);
        assert!(zone.end_time > zone.peak_time);
    }

    #[test]
    fn constant_loud_track_has_no_drops() {
        let env = envelope_from_pattern(&[(10.0, 0.9)], 44100);
        assert!(detect_drops(&env).is_empty());
    }

    #[test]
    fn constant_quiet_track_has_no_drops() {
        let env = envelope_from_pattern(&[(10.0, 0.05)], 44100);
        // Self-normalization makes this all-ones; baseline is never calm.
        assert!(detect_drops(&env).is_empty());
    }

    #[test]
    fn unsustained_spike_is_not_a_drop() {
        let env = envelope_from_pattern(&[(4.0, 0.1), (0.2, 0.9), (5.0, 0.1)], 44100);
        assert!(detect_drops(&env).is_empty());
    }

    #[test]
    fn zones_never_overlap() {
        let env = envelope_from_pattern(
            &[
                (4.0, 0.1),
                (8.0, 0.9), // first drop
                (4.0, 0.1),
                (8.0, 0.95), // second drop, far enough to stay separate
            ],
            44100,
        );
        let drops = detect_drops(&env);
        assert!(!drops.is_empty());
        for pair in drops.windows(2) {
            assert!(pair[1].start_time >= pair[0].end_time);
        }
    }
}
