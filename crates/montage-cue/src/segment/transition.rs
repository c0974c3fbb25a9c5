//! Transition and filter selection
//!
//! Situational rules first (montage opening, drop peak), then weighted
//! sampling for the cases where several transitions fit. Presets can
//! override the in-drop weight table.

use montage_core::{BeatMarker, ClipFilter, Transition};
use rand::rngs::StdRng;
use rand::Rng;

use super::preset::StylePreset;

/// Stock in-drop table when the preset does not override it
const DROP_TRANSITIONS: &[(Transition, u32)] = &[
    (Transition::Glitch, 3),
    (Transition::Flash, 2),
    (Transition::Whip, 2),
    (Transition::Cut, 3),
];

/// High-intensity table outside drops
const PEAK_TRANSITIONS: &[(Transition, u32)] = &[
    (Transition::Zoom, 2),
    (Transition::Whip, 2),
    (Transition::Cut, 1),
];

/// Beat intensity below this biases toward Crossfade
const CALM_INTENSITY: f32 = 0.3;

/// In-drop filter table
const DROP_FILTERS: &[(ClipFilter, u32)] = &[
    (ClipFilter::Cyber, 3),
    (ClipFilter::Contrast, 2),
    (ClipFilter::None, 2),
];

/// Hero-segment filter table
const HERO_FILTERS: &[(ClipFilter, u32)] = &[
    (ClipFilter::Saturate, 2),
    (ClipFilter::Warm, 2),
    (ClipFilter::None, 3),
];

fn weighted<T: Copy>(table: &[(T, u32)], rng: &mut StdRng) -> T {
    debug_assert!(!table.is_empty());
    let total: u32 = table.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total.max(1));
    for &(value, weight) in table {
        if roll < weight {
            return value;
        }
        roll -= weight;
    }
    table[table.len() - 1].0
}

/// Choose the transition opening a segment
///
/// `segment_index` is the position in the montage so far; the first
/// segment is always a plain cut.
pub fn pick_transition(
    segment_index: usize,
    beat: &BeatMarker,
    in_drop: bool,
    preset: &StylePreset,
    rng: &mut StdRng,
) -> Transition {
    if segment_index == 0 {
        return Transition::Cut;
    }
    if beat.is_drop {
        return Transition::Impact;
    }
    if in_drop {
        let table = if preset.drop_transitions.is_empty() {
            DROP_TRANSITIONS
        } else {
            preset.drop_transitions
        };
        return weighted(table, rng);
    }
    if beat.intensity > 0.8 {
        return weighted(PEAK_TRANSITIONS, rng);
    }
    if beat.intensity < CALM_INTENSITY {
        return Transition::Crossfade;
    }
    Transition::Cut
}

/// Choose the look filter for a segment
pub fn pick_filter(in_drop: bool, is_hero: bool, rng: &mut StdRng) -> ClipFilter {
    if in_drop {
        weighted(DROP_FILTERS, rng)
    } else if is_hero {
        weighted(HERO_FILTERS, rng)
    } else {
        ClipFilter::None
    }
}
