//! Phrase structure and hero moments
//!
//! Assigns each beat its position within a 4-beat bar and a 32-beat
//! phrase from the estimated tempo, tags the beat nearest each drop
//! peak, and selects the hero set: drop beats, phrase-opening downbeats
//! and the top intensity outliers.

use montage_core::{BeatMarker, DropZone};

/// Beats per bar
const BAR_BEATS: u64 = 4;
/// Beats per phrase
const PHRASE_BEATS: u64 = 32;

/// Intensity outliers promoted to hero: top 5%, at least this many
const MIN_HERO_OUTLIERS: usize = 3;

/// Assign bar/phrase positions from the tempo grid
pub fn assign_structure(beats: &mut [BeatMarker], bpm: f64) {
    if bpm <= 0.0 {
        return;
    }
    let beat_duration = 60.0 / bpm;
    for beat in beats.iter_mut() {
        let index = (beat.time / beat_duration).round().max(0.0) as u64;
        beat.bar_position = (index % BAR_BEATS) as u8 + 1;
        beat.phrase_position = (index % PHRASE_BEATS) as u8 + 1;
        beat.is_downbeat = beat.bar_position == 1;
    }
}

/// Tag the beat closest to each drop peak
pub fn mark_drop_beats(beats: &mut [BeatMarker], drops: &[DropZone]) {
    for zone in drops {
        if let Some(nearest) = nearest_beat(beats, zone.peak_time) {
            beats[nearest].is_drop = true;
        }
    }
}

/// Index of the beat closest in time to `t`
pub fn nearest_beat(beats: &[BeatMarker], t: f64) -> Option<usize> {
    beats
        .iter()
        .enumerate()
        .min_by(|a, b| {
            (a.1.time - t)
                .abs()
                .total_cmp(&(b.1.time - t).abs())
        })
        .map(|(i, _)| i)
}

/// Flag hero moments: drop beats ∪ phrase-opening downbeats ∪ top-5%
/// intensity outliers (minimum 3)
pub fn select_hero_moments(beats: &mut [BeatMarker]) {
    let n = beats.len();
    if n == 0 {
        return;
    }

    for beat in beats.iter_mut() {
        if beat.is_drop || (beat.is_downbeat && beat.phrase_position == 1) {
            beat.is_hero_moment = true;
        }
    }

    let outliers = ((n as f64 * 0.05).ceil() as usize).max(MIN_HERO_OUTLIERS);
    let mut by_intensity: Vec<usize> = (0..n).collect();
    by_intensity.sort_by(|&a, &b| beats[b].intensity.total_cmp(&beats[a].intensity));
    for &i in by_intensity.iter().take(outliers) {
        beats[i].is_hero_moment = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beats_at_interval(interval: f64, count: usize) -> Vec<BeatMarker> {
        (0..count)
            .map(|i| BeatMarker::new(i as f64 * interval, 0.5))
            .collect()
    }

    #[test]
    fn bar_positions_cycle_one_to_four() {
        let mut beats = beats_at_interval(0.5, 16); // 120 BPM grid
        assign_structure(&mut beats, 120.0);
        let positions: Vec<u8> = beats.iter().map(|b| b.bar_position).collect();
        assert_eq!(&positions[..8], &[1, 2, 3, 4, 1, 2, 3, 4]);
        assert!(beats[0].is_downbeat);
        assert!(!beats[1].is_downbeat);
        assert!(beats[4].is_downbeat);
    }

    #[test]
    fn phrase_position_wraps_at_32() {
        let mut beats = beats_at_interval(0.5, 40);
        assign_structure(&mut beats, 120.0);
        assert_eq!(beats[0].phrase_position, 1);
        assert_eq!(beats[31].phrase_position, 32);
        assert_eq!(beats[32].phrase_position, 1);
    }

    #[test]
    fn drop_peak_tags_nearest_beat() {
        let mut beats = beats_at_interval(0.5, 10);
        let zone = DropZone {
            start_time: 2.0,
            peak_time: 2.6,
            end_time: 4.0,
            intensity: 0.9,
        };
        mark_drop_beats(&mut beats, &[zone]);
        // 2.6 is closest to the beat at 2.5.
        assert!(beats[5].is_drop);
        assert_eq!(beats.iter().filter(|b| b.is_drop).count(), 1);
    }

    #[test]
    fn hero_minimum_holds_without_drops() {
        // 100 uniform beats, no drops: the top-5% floor still promotes
        // at least 3 heroes (here 5, plus phrase downbeats).
        let mut beats = beats_at_interval(0.5, 100);
        for (i, b) in beats.iter_mut().enumerate() {
            b.intensity = 0.3 + (i % 7) as f32 * 0.05;
        }
        assign_structure(&mut beats, 120.0);
        select_hero_moments(&mut beats);
        let heroes = beats.iter().filter(|b| b.is_hero_moment).count();
        assert!(heroes >= 3, "heroes = {heroes}");
    }

    #[test]
    fn drop_beats_are_heroes() {
        let mut beats = beats_at_interval(0.5, 20);
        beats[7].is_drop = true;
        select_hero_moments(&mut beats);
        assert!(beats[7].is_hero_moment);
    }
}
