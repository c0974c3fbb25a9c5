//! Clip Profiling Service
//!
//! Background service that computes visual profiles for clips without
//! stalling the render loop. One request/one response message passing
//! over crossbeam channels; no shared mutable state with the frame loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     Commands      ┌──────────────────┐
//! │  Clip pool  │ ───────────────►  │  ProfileService  │
//! │   manager   │ ◄───────────────  │   (background)   │
//! └─────────────┘      Events       └──────────────────┘
//!                                            │
//!                                            ▼
//!                                    ┌──────────────┐
//!                                    │ FrameSource  │
//!                                    │  (decoder)   │
//!                                    └──────────────┘
//! ```

use crossbeam::channel::{self, Receiver, Sender};
use rayon::prelude::*;
use std::thread;

use crate::profile::motion::{self, Frame};
use crate::types::{ClipProfile, MotionDirection, VideoClip};

/// Number of evenly spaced sample positions per clip
pub const SAMPLE_POSITIONS: usize = 8;

/// Gap between the two frames of a motion pair, seconds
pub const PAIR_GAP_SECS: f64 = 0.1;

/// Supplies down-scaled frame pairs for profiling
///
/// The boundary to the platform's video decoding; implementations decode
/// a frame at `position` and a second one [`PAIR_GAP_SECS`] later.
pub trait FrameSource: Send {
    fn frame_pair(&mut self, clip: &VideoClip, position: f64) -> anyhow::Result<(Frame, Frame)>;
}

/// Commands for the ProfileService
pub enum ProfileCommand {
    /// Profile a single clip; optional direct reply channel
    Profile {
        clip: VideoClip,
        reply: Option<Sender<(u64, ClipProfile)>>,
    },
    /// Profile a batch of clips, publishing one event per clip
    ProfileBatch { clips: Vec<VideoClip> },
    /// Shutdown the service
    Shutdown,
}

/// Events published by the ProfileService
#[derive(Debug, Clone)]
pub enum ProfileEvent {
    ServiceStarted,
    ServiceStopped,
    ClipProfiled { clip_id: u64, profile: ClipProfile },
}

/// Handle for sending commands to a background service
pub struct ServiceHandle<Cmd> {
    pub command_tx: Sender<Cmd>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl<Cmd> ServiceHandle<Cmd> {
    pub fn send(&self, cmd: Cmd) -> Result<(), channel::SendError<Cmd>> {
        self.command_tx.send(cmd)
    }
}

impl ServiceHandle<ProfileCommand> {
    /// Request shutdown and join the worker thread
    pub fn shutdown(mut self) {
        let _ = self.command_tx.send(ProfileCommand::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Background service for clip visual profiling
pub struct ProfileService;

impl ProfileService {
    /// Spawn the service in a background thread
    pub fn spawn<S: FrameSource + 'static>(
        source: S,
        event_tx: Sender<ProfileEvent>,
    ) -> ServiceHandle<ProfileCommand> {
        let (command_tx, command_rx) = channel::unbounded();

        let thread_handle = thread::Builder::new()
            .name("clip-profile".to_string())
            .spawn(move || {
                let _ = event_tx.send(ProfileEvent::ServiceStarted);
                Self::run(source, command_rx, event_tx.clone());
                let _ = event_tx.send(ProfileEvent::ServiceStopped);
            })
            .expect("Failed to spawn clip profile service");

        ServiceHandle {
            command_tx,
            thread_handle: Some(thread_handle),
        }
    }

    /// Main service loop
    fn run<S: FrameSource>(
        mut source: S,
        command_rx: Receiver<ProfileCommand>,
        event_tx: Sender<ProfileEvent>,
    ) {
        log::info!("ProfileService started");

        while let Ok(cmd) = command_rx.recv() {
            match cmd {
                ProfileCommand::Profile { clip, reply } => {
                    let profile = Self::profile_clip(&mut source, &clip);
                    let _ = event_tx.send(ProfileEvent::ClipProfiled {
                        clip_id: clip.id,
                        profile: profile.clone(),
                    });
                    if let Some(tx) = reply {
                        let _ = tx.send((clip.id, profile));
                    }
                }

                ProfileCommand::ProfileBatch { clips } => {
                    log::info!("Profiling batch of {} clips", clips.len());
                    for clip in clips {
                        let profile = Self::profile_clip(&mut source, &clip);
                        let _ = event_tx.send(ProfileEvent::ClipProfiled {
                            clip_id: clip.id,
                            profile,
                        });
                    }
                }

                ProfileCommand::Shutdown => {
                    log::info!("ProfileService shutting down");
                    break;
                }
            }
        }
    }

    /// Profile one clip: decode frame pairs at evenly spaced positions,
    /// then derive statistics from the pixel deltas.
    ///
    /// Any failure degrades to [`ClipProfile::neutral`]; a single bad
    /// clip never fails the whole set.
    pub fn profile_clip<S: FrameSource>(source: &mut S, clip: &VideoClip) -> ClipProfile {
        let span = clip.playable_len();
        if !clip.is_valid() || span <= PAIR_GAP_SECS {
            log::warn!("Clip {} too short to profile, using neutral defaults", clip.id);
            return ClipProfile::neutral();
        }

        // Decode sequentially (the source owns one decoder), analyze the
        // collected pairs in parallel.
        let mut pairs: Vec<(f64, Frame, Frame)> = Vec::with_capacity(SAMPLE_POSITIONS);
        for i in 0..SAMPLE_POSITIONS {
            let frac = (i as f64 + 0.5) / SAMPLE_POSITIONS as f64;
            let position = clip.trim_start + (span - PAIR_GAP_SECS) * frac;
            match source.frame_pair(clip, position) {
                Ok((a, b)) => pairs.push((position, a, b)),
                Err(e) => {
                    log::warn!("Frame decode failed for clip {} at {position:.2}s: {e}", clip.id)
                }
            }
        }
        if pairs.len() < 2 {
            log::warn!("Clip {} produced too few frames, using neutral defaults", clip.id);
            return ClipProfile::neutral();
        }

        let stats: Vec<(f64, f32, f32, f32, MotionDirection)> = pairs
            .par_iter()
            .map(|(pos, a, b)| {
                let (energy, direction) = motion::motion_between(a, b);
                (*pos, motion::brightness(a), motion::contrast(a), energy, direction)
            })
            .collect();

        let n = stats.len() as f32;
        let brightness = stats.iter().map(|s| s.1).sum::<f32>() / n;
        let contrast = stats.iter().map(|s| s.2).sum::<f32>() / n;
        let motion_energy = stats.iter().map(|s| s.3).sum::<f32>() / n;

        let peak = stats
            .iter()
            .max_by(|a, b| a.3.partial_cmp(&b.3).unwrap_or(std::cmp::Ordering::Equal));
        let peak_motion_time = peak.map(|s| s.0);

        // Dominant direction: most frequent non-static classification.
        let mut counts = [0usize; 4];
        for s in &stats {
            let idx = match s.4 {
                MotionDirection::Static => 0,
                MotionDirection::Horizontal => 1,
                MotionDirection::Vertical => 2,
                MotionDirection::Chaotic => 3,
            };
            counts[idx] += 1;
        }
        let dominant_motion = if counts[1].max(counts[2]).max(counts[3]) == 0 {
            Some(MotionDirection::Static)
        } else if counts[1] >= counts[2] && counts[1] >= counts[3] {
            Some(MotionDirection::Horizontal)
        } else if counts[2] >= counts[3] {
            Some(MotionDirection::Vertical)
        } else {
            Some(MotionDirection::Chaotic)
        };

        log::debug!(
            "Clip {} profiled: brightness {brightness:.2}, contrast {contrast:.2}, motion {motion_energy:.2}",
            clip.id
        );

        ClipProfile {
            brightness,
            contrast,
            motion_energy,
            dominant_motion,
            peak_motion_time,
            processed: true,
        }
    }
}
