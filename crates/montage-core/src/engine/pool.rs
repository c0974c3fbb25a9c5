//! Fixed-size decoder pool
//!
//! An arena of `POOL_SLOTS` reusable decode slots indexed by small
//! integers. Slots are allocated on demand, reassigned when evicted and
//! never destroyed; eviction picks the least-recently-active slot that
//! is not currently showing or fading out.

use crate::engine::decoder::ClipDecoder;
use crate::types::POOL_SLOTS;

/// Bookkeeping for one pool slot
#[derive(Debug, Clone)]
pub struct PoolSlot {
    /// Clip currently resident in the slot's decoder (None = empty)
    pub clip_index: Option<usize>,
    /// Monotonic counter value of the last activation
    pub last_active: u64,
}

impl PoolSlot {
    fn empty() -> Self {
        Self {
            clip_index: None,
            last_active: 0,
        }
    }
}

/// Arena of reusable decoders
pub struct DecoderPool<D: ClipDecoder> {
    decoders: Vec<D>,
    slots: Vec<PoolSlot>,
    /// Monotonic activation counter for LRU eviction
    activation: u64,
}

impl<D: ClipDecoder> DecoderPool<D> {
    /// Build the pool from pre-constructed decoders (one per slot)
    pub fn new(decoders: Vec<D>) -> Self {
        assert_eq!(decoders.len(), POOL_SLOTS, "pool requires {POOL_SLOTS} decoders");
        Self {
            slots: (0..decoders.len()).map(|_| PoolSlot::empty()).collect(),
            decoders,
            activation: 0,
        }
    }

    /// Slot already holding `clip_index`, if any
    pub fn slot_holding(&self, clip_index: usize) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.clip_index == Some(clip_index))
    }

    /// Pick a slot for `clip_index`: a resident slot if one exists, else
    /// an empty slot, else the least-recently-active slot outside
    /// `protected` (the active and fading slots).
    ///
    /// Only the slot index is chosen here; the caller drives the decoder
    /// load so it can handle failures.
    pub fn acquire(&mut self, clip_index: usize, protected: &[Option<usize>]) -> usize {
        if let Some(slot) = self.slot_holding(clip_index) {
            return slot;
        }
        if let Some(slot) = self.slots.iter().position(|s| s.clip_index.is_none()) {
            return slot;
        }
        self.slots
            .iter()
            .enumerate()
            .filter(|(i, _)| !protected.contains(&Some(*i)))
            .min_by_key(|(_, s)| s.last_active)
            .map(|(i, _)| i)
            // All slots protected can only happen with protected.len() >= POOL_SLOTS;
            // fall back to plain LRU in that case.
            .unwrap_or_else(|| {
                self.slots
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, s)| s.last_active)
                    .map(|(i, _)| i)
                    .unwrap()
            })
    }

    /// Record that `slot` now holds `clip_index` and bump its recency
    pub fn assign(&mut self, slot: usize, clip_index: usize) {
        self.activation += 1;
        self.slots[slot].clip_index = Some(clip_index);
        self.slots[slot].last_active = self.activation;
    }

    /// Bump a slot's recency without reassigning it
    pub fn touch(&mut self, slot: usize) {
        self.activation += 1;
        self.slots[slot].last_active = self.activation;
    }

    /// Mark a slot empty (its decoder is kept for reuse)
    pub fn release(&mut self, slot: usize) {
        self.slots[slot].clip_index = None;
    }

    /// Clip resident in a slot
    #[inline]
    pub fn clip_in(&self, slot: usize) -> Option<usize> {
        self.slots[slot].clip_index
    }

    #[inline]
    pub fn decoder(&self, slot: usize) -> &D {
        &self.decoders[slot]
    }

    #[inline]
    pub fn decoder_mut(&mut self, slot: usize) -> &mut D {
        &mut self.decoders[slot]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
