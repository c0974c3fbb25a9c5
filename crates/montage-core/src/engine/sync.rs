//! Playback synchronizer
//!
//! Runs once per display frame: maps the master clock to the active
//! segment (binary search), drives the decoder pool through cuts,
//! corrects drift against the audio clock, blends crossfades and
//! preloads the next clip ahead of the cut.
//!
//! The pool is mutated only by this frame loop and by explicit seeks,
//! never concurrently, so no locking is required. Each frame recomputes
//! idempotently from the clock; decoder failures are logged and skipped,
//! never allowed to halt playback.

use std::sync::Arc;

use crate::engine::clock::MasterClock;
use crate::engine::decoder::ClipDecoder;
use crate::engine::pool::DecoderPool;
use crate::error::{EngineError, EngineResult};
use crate::types::{Montage, Segment, Transition, VideoClip, POOL_SLOTS};

/// Tunables for the frame loop
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Hard-seek when decoder position diverges from the clock-implied
    /// target by more than this (seconds)
    pub drift_tolerance: f64,
    /// Crossfade blend window at the start of Crossfade segments
    pub crossfade_secs: f64,
    /// Preload lookahead, in beats (tempo-scaled at runtime)
    pub preload_beats: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drift_tolerance: 0.25,
            crossfade_secs: 0.5,
            preload_beats: 2.0,
        }
    }
}

/// Binary search for the unique segment satisfying
/// `start_time <= t < end_time`
///
/// Returns `None` for `t` outside `[0, duration)`; the caller falls back
/// to the nearest valid segment.
pub fn find_segment(segments: &[Segment], t: f64) -> Option<usize> {
    let idx = segments.partition_point(|s| s.end_time <= t);
    match segments.get(idx) {
        Some(seg) if seg.contains(t) => Some(idx),
        _ => None,
    }
}

/// Keeps a bounded pool of video decoders in lock-step with the audio
/// master clock
pub struct PlaybackSynchronizer<D: ClipDecoder> {
    montage: Montage,
    clips: Vec<VideoClip>,
    pool: DecoderPool<D>,
    clock: Arc<MasterClock>,
    config: SyncConfig,
    /// Slot whose decoder has visual precedence
    active_slot: Option<usize>,
    /// Slot still fading out after the last cut
    prev_slot: Option<usize>,
    /// Slot with a load in flight for the current segment's clip
    pending_slot: Option<usize>,
    current_segment: Option<usize>,
    /// Segment index we already tried (and failed) to preload for
    preload_attempted: Option<usize>,
    /// Play was blocked by the platform; retry on the next play signal
    play_blocked: bool,
}

impl<D: ClipDecoder> PlaybackSynchronizer<D> {
    /// Build a synchronizer over a validated montage
    ///
    /// The segment list is validated once more here; a montage that fails
    /// the invariants is rejected outright rather than risking an
    /// inconsistent frame loop.
    pub fn new(
        montage: Montage,
        clips: Vec<VideoClip>,
        decoders: Vec<D>,
        clock: Arc<MasterClock>,
        config: SyncConfig,
    ) -> EngineResult<Self> {
        let total = montage.duration();
        montage
            .validate(&clips, total)
            .map_err(EngineError::InvalidSegments)?;
        debug_assert_eq!(decoders.len(), POOL_SLOTS);
        Ok(Self {
            montage,
            clips,
            pool: DecoderPool::new(decoders),
            clock,
            config,
            active_slot: None,
            prev_slot: None,
            pending_slot: None,
            current_segment: None,
            preload_attempted: None,
            play_blocked: false,
        })
    }

    /// The montage being played
    pub fn montage(&self) -> &Montage {
        &self.montage
    }

    /// Clip index currently shown, if any (per-frame output contract)
    pub fn visible_clip(&self) -> Option<usize> {
        self.active_slot
            .filter(|&s| self.pool.decoder(s).is_ready())
            .and_then(|s| self.pool.clip_in(s))
            .or_else(|| self.prev_slot.and_then(|s| self.pool.clip_in(s)))
    }

    /// Advance the frame loop. Called once per display frame with the
    /// clock already updated by the audio side.
    ///
    /// Returns the clip index that should be visible this frame.
    pub fn tick(&mut self) -> Option<usize> {
        if self.montage.segments.is_empty() {
            return None;
        }
        let now = self.clock.seconds();
        let seg_idx = match find_segment(&self.montage.segments, now) {
            Some(i) => i,
            // Outside [0, duration): clamp to the nearest valid segment.
            None if now < 0.0 => 0,
            None => self.montage.segments.len() - 1,
        };

        if self.current_segment != Some(seg_idx) {
            self.preload_attempted = None;
            self.enter_segment(seg_idx, now);
        }
        self.promote_pending(now);
        self.chase(now);
        self.blend(now);
        self.preload(now);

        self.visible_clip()
    }

    /// External seek: reset fade state, resolve the target segment and
    /// prepare its slot before resuming.
    pub fn seek(&mut self, time: f64) {
        if let Some(p) = self.prev_slot.take() {
            self.pool.decoder_mut(p).pause();
            self.pool.decoder_mut(p).set_visible(false);
        }
        if let Some(a) = self.active_slot {
            self.pool.decoder_mut(a).pause();
        }
        self.pending_slot = None;
        self.current_segment = None;
        self.clock.set_seconds(time.max(0.0));
        self.tick();
    }

    /// Start playback, retrying any previously blocked play attempt
    pub fn play(&mut self) {
        self.clock.play();
        self.play_blocked = false;
        if let Some(a) = self.active_slot {
            if let Err(e) = self.pool.decoder_mut(a).play() {
                log::warn!("Play attempt blocked, will retry on next play signal: {e}");
                self.play_blocked = true;
            }
        }
    }

    /// Pause playback and all pool decoders
    pub fn pause(&mut self) {
        self.clock.pause();
        for slot in 0..self.pool.len() {
            self.pool.decoder_mut(slot).pause();
        }
    }

    /// Handle entry into a new segment: same-clip reseek or a full cut.
    fn enter_segment(&mut self, seg_idx: usize, now: f64) {
        let seg = self.montage.segments[seg_idx].clone();
        self.current_segment = Some(seg_idx);

        // Same clip continuing across the boundary (split sub-segments):
        // reseek in place, no slot churn.
        if let Some(active) = self.active_slot {
            if self.pool.clip_in(active) == Some(seg.video_index) {
                let dec = self.pool.decoder_mut(active);
                dec.set_rate(seg.playback_speed);
                if let Err(e) = dec.seek(seg.clip_start_time) {
                    log::warn!("Reseek failed, free-running: {e}");
                }
                self.pool.touch(active);
                self.pending_slot = None;
                self.retire_prev();
                return;
            }
        }

        // Cut to a different clip.
        let want = seg.video_index;
        let protected = [self.active_slot, self.prev_slot];
        let slot = self.pool.acquire(want, &protected);

        if self.pool.clip_in(slot) != Some(want) {
            let clip = self.clips[want].clone();
            if let Err(e) = self.pool.decoder_mut(slot).load(&clip) {
                // Skip this cut; the current frame keeps whatever is
                // resident and the next boundary gets another chance.
                log::warn!("Clip load failed at {:.3}s, skipping cut: {e}", now);
                self.pool.release(slot);
                self.pending_slot = None;
                return;
            }
            self.pool.assign(slot, want);
        } else {
            self.pool.touch(slot);
        }

        {
            let dec = self.pool.decoder_mut(slot);
            dec.set_rate(seg.playback_speed);
            if let Err(e) = dec.seek(seg.clip_start_time) {
                log::warn!("Seek failed on cut, playing from resident frame: {e}");
            }
        }
        if self.clock.is_playing() {
            if let Err(e) = self.pool.decoder_mut(slot).play() {
                log::warn!("Play blocked on cut: {e}");
                self.play_blocked = true;
            }
        }
        self.pending_slot = Some(slot);
    }

    /// Swap visual precedence the instant the pending slot is ready.
    fn promote_pending(&mut self, now: f64) {
        let Some(pending) = self.pending_slot else {
            return;
        };
        if !self.pool.decoder(pending).is_ready() {
            // Keep rendering the old slot; the load is still in flight.
            return;
        }
        self.pending_slot = None;
        if self.active_slot == Some(pending) {
            return;
        }

        let old_active = self.active_slot;
        self.active_slot = Some(pending);
        self.pool.touch(pending);

        let crossfading = self.in_crossfade_window(now);
        {
            let dec = self.pool.decoder_mut(pending);
            dec.set_visible(true);
            dec.set_opacity(if crossfading { 0.0 } else { 1.0 });
        }

        self.retire_prev();
        if let Some(old) = old_active {
            if crossfading {
                // The outgoing decoder keeps playing underneath the fade.
                self.prev_slot = Some(old);
                self.pool.decoder_mut(old).set_opacity(1.0);
            } else {
                let dec = self.pool.decoder_mut(old);
                dec.pause();
                dec.set_visible(false);
            }
        }
    }

    /// In-segment drift correction: hard-seek only past the tolerance,
    /// otherwise let the decoder free-run to avoid visible stutter.
    fn chase(&mut self, now: f64) {
        let (Some(active), Some(seg_idx)) = (self.active_slot, self.current_segment) else {
            return;
        };
        let seg = &self.montage.segments[seg_idx];
        if self.pool.clip_in(active) != Some(seg.video_index) {
            return;
        }
        if !self.pool.decoder(active).is_ready() {
            return;
        }
        // The decoder advances `playback_speed` clip-seconds per master
        // second, so the chase target scales with the rate.
        let target = seg.clip_start_time + (now - seg.start_time) * seg.playback_speed;
        let drift = (self.pool.decoder(active).position() - target).abs();
        if drift > self.config.drift_tolerance {
            log::debug!(
                "Drift {:.3}s beyond tolerance at {:.3}s, hard-seeking",
                drift,
                now
            );
            if let Err(e) = self.pool.decoder_mut(active).seek(target) {
                log::warn!("Drift-correction seek failed: {e}");
            }
        }
    }

    /// Crossfade opacity ramp during the blend window
    fn blend(&mut self, now: f64) {
        let Some(seg_idx) = self.current_segment else {
            return;
        };
        let seg = &self.montage.segments[seg_idx];
        let in_window = self.in_crossfade_window(now);

        if in_window {
            let alpha =
                (((now - seg.start_time) / self.config.crossfade_secs).clamp(0.0, 1.0)) as f32;
            if let Some(active) = self.active_slot {
                self.pool.decoder_mut(active).set_opacity(alpha);
            }
            if let Some(prev) = self.prev_slot {
                self.pool.decoder_mut(prev).set_opacity(1.0 - alpha);
            }
        } else {
            if let Some(active) = self.active_slot {
                self.pool.decoder_mut(active).set_opacity(1.0);
            }
            self.retire_prev();
        }
    }

    /// Begin loading the next segment's clip once the remaining time in
    /// the current segment falls below the tempo-scaled lookahead.
    fn preload(&mut self, now: f64) {
        let Some(seg_idx) = self.current_segment else {
            return;
        };
        let Some(next) = self.montage.segments.get(seg_idx + 1).cloned() else {
            return;
        };
        if self.preload_attempted == Some(seg_idx) {
            return;
        }
        let beat = 60.0 / self.montage.bpm.max(1.0);
        let lookahead = self.config.preload_beats * beat;
        let remaining = self.montage.segments[seg_idx].end_time - now;
        if remaining > lookahead {
            return;
        }
        if self.pool.slot_holding(next.video_index).is_some() {
            return;
        }

        self.preload_attempted = Some(seg_idx);
        let protected = [self.active_slot, self.prev_slot, self.pending_slot];
        let slot = self.pool.acquire(next.video_index, &protected);
        if protected.contains(&Some(slot)) {
            return;
        }
        let clip = self.clips[next.video_index].clone();
        match self.pool.decoder_mut(slot).load(&clip) {
            Ok(()) => {
                self.pool.assign(slot, next.video_index);
                let dec = self.pool.decoder_mut(slot);
                if let Err(e) = dec.seek(next.clip_start_time) {
                    log::warn!("Preload seek failed: {e}");
                }
                dec.pause();
                log::debug!(
                    "Preloaded clip {} {:.3}s ahead of the cut",
                    next.video_index,
                    remaining
                );
            }
            Err(e) => {
                log::warn!("Preload failed, cut will load on demand: {e}");
                self.pool.release(slot);
            }
        }
    }

    fn in_crossfade_window(&self, now: f64) -> bool {
        self.current_segment
            .map(|i| {
                let seg = &self.montage.segments[i];
                seg.transition == Transition::Crossfade
                    && now - seg.start_time < self.config.crossfade_secs
            })
            .unwrap_or(false)
    }

    fn retire_prev(&mut self) {
        if let Some(prev) = self.prev_slot.take() {
            let dec = self.pool.decoder_mut(prev);
            dec.pause();
            dec.set_visible(false);
        }
    }

    #[cfg(test)]
    fn decoder(&self, slot: usize) -> &D {
        self.pool.decoder(slot)
    }

    #[cfg(test)]
    fn decoder_mut(&mut self, slot: usize) -> &mut D {
        self.pool.decoder_mut(slot)
    }
}
