//! Clip motion profiling
//!
//! Samples a handful of positions across each clip, decodes down-scaled
//! frame pairs and derives brightness, contrast, motion energy and the
//! peak-motion timestamp used to center hero-segment windows.
//!
//! The pixel math runs on a dedicated background thread
//! ([`service::ProfileService`]) so profiling a large clip pool never
//! stalls the render loop.

pub mod motion;
pub mod service;

pub use motion::{Frame, FRAME_HEIGHT, FRAME_WIDTH};
pub use service::{FrameSource, ProfileCommand, ProfileEvent, ProfileService, ServiceHandle};
