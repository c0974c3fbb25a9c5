//! Clip candidate scoring
//!
//! Every clip is scored against the current beat and the montage built
//! so far. The highest scorers within a small margin form a candidate
//! pool and the winner is sampled from it, so equally good clips vary
//! across runs while the ranking still holds. All randomness flows
//! through the injected RNG.

use montage_core::VideoClip;
use rand::rngs::StdRng;
use rand::Rng;

/// Starting score before penalties/bonuses
pub const BASE_SCORE: f32 = 50.0;

/// Penalty for being the immediately preceding clip
const PREV_CLIP_PENALTY: f32 = 30.0;

/// Penalty per use above the least-used clip
const USAGE_PENALTY: f32 = 8.0;

/// Weight of the motion-energy/beat-intensity match
const MOTION_MATCH_WEIGHT: f32 = 30.0;

/// Bonus for hero clips during hero/drop segments
const HERO_BONUS: f32 = 25.0;

/// Weight of brightness continuity under smart reorder
const BRIGHTNESS_WEIGHT: f32 = 10.0;

/// Candidates within this margin of the best score stay in the pool
const NEAR_TIE_MARGIN: f32 = 10.0;

/// Upper bound on the sampling pool
const CANDIDATE_POOL: usize = 3;

/// Everything the scorer needs to know about the current decision point
pub struct ScoreContext<'a> {
    /// Intensity of the beat opening the segment
    pub beat_intensity: f32,
    /// Segment lands on a hero moment
    pub is_hero: bool,
    /// Segment falls inside a drop zone
    pub is_drop: bool,
    /// Clip shown by the previous segment
    pub prev_index: Option<usize>,
    /// Per-clip usage counts for the montage so far
    pub usage: &'a [u32],
    /// Brightness of the previous segment's clip
    pub prev_brightness: Option<f32>,
    /// Brightness continuity enabled
    pub smart_reorder: bool,
}

/// Score one clip for the current decision point
pub fn score_clip(clip: &VideoClip, index: usize, ctx: &ScoreContext) -> f32 {
    let profile = clip.effective_profile();
    let mut score = BASE_SCORE;

    if ctx.prev_index == Some(index) {
        score -= PREV_CLIP_PENALTY;
    }

    // Usage balancing: every use above the globally least-used clip costs.
    let min_usage = ctx.usage.iter().copied().min().unwrap_or(0);
    score -= (ctx.usage[index].saturating_sub(min_usage)) as f32 * USAGE_PENALTY;

    let motion_match = 1.0 - (profile.motion_energy - ctx.beat_intensity).abs();
    score += motion_match * MOTION_MATCH_WEIGHT;

    if clip.is_hero && (ctx.is_hero || ctx.is_drop) {
        score += HERO_BONUS;
    }

    if ctx.smart_reorder {
        if let Some(prev) = ctx.prev_brightness {
            score += (1.0 - (profile.brightness - prev).abs()) * BRIGHTNESS_WEIGHT;
        }
    }

    score
}

/// Pick the clip for a segment: score all, sample among near-ties
///
/// Returns the chosen index and its score. With a single clip the
/// choice is forced regardless of penalties.
pub fn pick_clip(clips: &[VideoClip], ctx: &ScoreContext, rng: &mut StdRng) -> (usize, f32) {
    debug_assert!(!clips.is_empty());
    let mut scored: Vec<(usize, f32)> = clips
        .iter()
        .enumerate()
        .map(|(i, clip)| (i, score_clip(clip, i, ctx)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let best = scored[0].1;
    let pool = scored
        .iter()
        .take(CANDIDATE_POOL)
        .filter(|(_, s)| best - s <= NEAR_TIE_MARGIN)
        .count();
    scored[rng.gen_range(0..pool)]
}

/// Globally least-used clip, excluding `exclude` when another choice exists
///
/// Used by segment splitting, where every sub-segment must come from a
/// different clip than its neighbour.
pub fn least_used_clip(usage: &[u32], exclude: Option<usize>) -> usize {
    let mut best: Option<usize> = None;
    for (i, &count) in usage.iter().enumerate() {
        if Some(i) == exclude && usage.len() > 1 {
            continue;
        }
        match best {
            Some(b) if usage[b] <= count => {}
            _ => best = Some(i),
        }
    }
    best.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_core::ClipProfile;
    use rand::SeedableRng;

    fn clip_with_motion(id: u64, motion: f32) -> VideoClip {
        let mut clip = VideoClip::new(id, 10.0);
        clip.profile = Some(ClipProfile {
            motion_energy: motion,
            processed: true,
            ..ClipProfile::neutral()
        });
        clip
    }

    fn ctx<'a>(usage: &'a [u32]) -> ScoreContext<'a> {
        ScoreContext {
            beat_intensity: 0.5,
            is_hero: false,
            is_drop: false,
            prev_index: None,
            usage,
            prev_brightness: None,
            smart_reorder: false,
        }
    }

    #[test]
    fn previous_clip_is_penalized() {
        let clip = clip_with_motion(1, 0.5);
        let usage = [0u32, 0];
        let mut c = ctx(&usage);
        let neutral = score_clip(&clip, 0, &c);
        c.prev_index = Some(0);
        assert!(score_clip(&clip, 0, &c) < neutral - 20.0);
    }

    #[test]
    fn overused_clip_loses_to_fresh_one() {
        let clips = vec![clip_with_motion(1, 0.5), clip_with_motion(2, 0.5)];
        let usage = [5u32, 0];
        let c = ctx(&usage);
        // 5 extra uses is a 40-point penalty: outside the tie margin.
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(pick_clip(&clips, &c, &mut rng).0, 1);
        }
    }

    #[test]
    fn motion_match_rewards_intensity_fit() {
        let calm = clip_with_motion(1, 0.1);
        let busy = clip_with_motion(2, 0.9);
        let usage = [0u32, 0];
        let mut c = ctx(&usage);
        c.beat_intensity = 0.9;
        assert!(score_clip(&busy, 1, &c) > score_clip(&calm, 0, &c));
        c.beat_intensity = 0.1;
        assert!(score_clip(&calm, 0, &c) > score_clip(&busy, 1, &c));
    }

    #[test]
    fn hero_clip_wins_hero_segments_only() {
        let mut hero = clip_with_motion(1, 0.5);
        hero.is_hero = true;
        let plain = clip_with_motion(2, 0.5);
        let usage = [0u32, 0];
        let mut c = ctx(&usage);
        assert_eq!(score_clip(&hero, 0, &c), score_clip(&plain, 1, &c));
        c.is_hero = true;
        assert!(score_clip(&hero, 0, &c) > score_clip(&plain, 1, &c));
    }

    #[test]
    fn near_tie_sampling_is_seed_deterministic() {
        let clips: Vec<VideoClip> = (0..4).map(|i| clip_with_motion(i, 0.5)).collect();
        let usage = [0u32; 4];
        let c = ctx(&usage);
        let picks_a: Vec<usize> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..10).map(|_| pick_clip(&clips, &c, &mut rng).0).collect()
        };
        let picks_b: Vec<usize> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..10).map(|_| pick_clip(&clips, &c, &mut rng).0).collect()
        };
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn least_used_skips_excluded_when_possible() {
        assert_eq!(least_used_clip(&[3, 0, 1], None), 1);
        assert_eq!(least_used_clip(&[3, 0, 0], Some(1)), 2);
        // Single clip: exclusion cannot apply.
        assert_eq!(least_used_clip(&[5], Some(0)), 0);
    }
}
