//! Style presets
//!
//! A preset bundles the detection thresholds and segmentation bounds
//! for one editing style. Presets are read-only and selected by name;
//! unknown names fall back to `flow`.

use montage_core::Transition;

/// Named configuration bundle for analysis + segmentation
#[derive(Debug, Clone)]
pub struct StylePreset {
    pub name: &'static str,
    /// Beat detector energy floor
    pub min_energy: f32,
    /// Beat detector local-average multiplier
    pub sensitivity: f32,
    /// Shortest segment, in beats
    pub min_segment_beats: u32,
    /// Longest segment, in beats
    pub max_segment_beats: u32,
    /// Whether the preset enables speed ramping by default
    pub speed_ramping: bool,
    /// Weighted transition table used inside drop zones; empty uses the
    /// built-in Glitch/Flash/Whip/Cut weights
    pub drop_transitions: &'static [(Transition, u32)],
}

/// Balanced default: medium cuts, stock drop transitions
pub const FLOW: StylePreset = StylePreset {
    name: "flow",
    min_energy: 0.1,
    sensitivity: 1.4,
    min_segment_beats: 1,
    max_segment_beats: 4,
    speed_ramping: false,
    drop_transitions: &[],
};

/// Aggressive fast cuts, ramped speed, glitch-heavy drops
pub const HYPE: StylePreset = StylePreset {
    name: "hype",
    min_energy: 0.08,
    sensitivity: 1.2,
    min_segment_beats: 1,
    max_segment_beats: 2,
    speed_ramping: true,
    drop_transitions: &[
        (Transition::Glitch, 4),
        (Transition::Whip, 3),
        (Transition::Flash, 2),
        (Transition::Cut, 1),
    ],
};

/// Long holds, sparse cuts, soft drop treatment
pub const CINEMATIC: StylePreset = StylePreset {
    name: "cinematic",
    min_energy: 0.15,
    sensitivity: 1.8,
    min_segment_beats: 2,
    max_segment_beats: 4,
    speed_ramping: false,
    drop_transitions: &[
        (Transition::Flash, 3),
        (Transition::Cut, 2),
        (Transition::Whip, 1),
    ],
};

/// Mostly straight cuts, strict detection
pub const MINIMAL: StylePreset = StylePreset {
    name: "minimal",
    min_energy: 0.2,
    sensitivity: 2.0,
    min_segment_beats: 2,
    max_segment_beats: 4,
    speed_ramping: false,
    drop_transitions: &[(Transition::Cut, 5), (Transition::Flash, 1)],
};

/// All built-in presets
pub const ALL: &[&StylePreset] = &[&FLOW, &HYPE, &CINEMATIC, &MINIMAL];

/// Look up a preset by name; unknown names log and return `flow`
pub fn by_name(name: &str) -> StylePreset {
    for preset in ALL {
        if preset.name.eq_ignore_ascii_case(name) {
            return (*preset).clone();
        }
    }
    log::warn!("Unknown preset '{}', using flow", name);
    FLOW
}

impl Default for StylePreset {
    fn default() -> Self {
        FLOW
    }
}
