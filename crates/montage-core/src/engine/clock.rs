//! Master clock - the audio element's playback position
//!
//! The audio clock is the sole timing source; every video decoder is a
//! slave that chases it. The position is published lock-free so the
//! render loop and UI can read it without taking a lock.
//!
//! All operations use `Ordering::Relaxed` since we only need visibility,
//! not synchronization with other memory operations.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Transport state of the master clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlayState {
    Stopped = 0,
    Playing = 1,
    Paused = 2,
}

impl From<u8> for PlayState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Playing,
            2 => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

/// Lock-free audio master clock
///
/// Stores the position in seconds as f64 bits inside an `AtomicU64`.
pub struct MasterClock {
    /// Current position, seconds (f64 bit pattern)
    position: AtomicU64,
    /// Playback state: 0=Stopped, 1=Playing, 2=Paused
    state: AtomicU8,
}

impl MasterClock {
    pub fn new() -> Self {
        Self {
            position: AtomicU64::new(0.0_f64.to_bits()),
            state: AtomicU8::new(PlayState::Stopped as u8),
        }
    }

    /// Current position in seconds (lock-free)
    #[inline]
    pub fn seconds(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Relaxed))
    }

    /// Publish a new position (called by the audio side each callback)
    #[inline]
    pub fn set_seconds(&self, seconds: f64) {
        self.position.store(seconds.to_bits(), Ordering::Relaxed);
    }

    /// Advance the position by `dt` seconds while playing
    #[inline]
    pub fn advance(&self, dt: f64) -> f64 {
        let next = self.seconds() + dt;
        self.set_seconds(next);
        next
    }

    #[inline]
    pub fn state(&self) -> PlayState {
        PlayState::from(self.state.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set_state(&self, state: PlayState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state() == PlayState::Playing
    }

    pub fn play(&self) {
        self.set_state(PlayState::Playing);
    }

    pub fn pause(&self) {
        self.set_state(PlayState::Paused);
    }

    pub fn stop(&self) {
        self.set_state(PlayState::Stopped);
        self.set_seconds(0.0);
    }
}

impl Default for MasterClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_round_trips_through_bits() {
        let clock = MasterClock::new();
        clock.set_seconds(12.345);
        assert!((clock.seconds() - 12.345).abs() < 1e-12);
    }

    #[test]
    fn stop_resets_position() {
        let clock = MasterClock::new();
        clock.play();
        clock.advance(3.0);
        clock.stop();
        assert_eq!(clock.state(), PlayState::Stopped);
        assert_eq!(clock.seconds(), 0.0);
    }
}
