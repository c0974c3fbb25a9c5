//! Playback engine: master clock, decoder pool and the frame-loop
//! synchronizer that keeps video decoders in lock-step with the audio
//! clock.

pub mod clock;
pub mod decoder;
pub mod pool;
pub mod sync;

pub use clock::{MasterClock, PlayState};
pub use decoder::ClipDecoder;
pub use pool::DecoderPool;
pub use sync::{PlaybackSynchronizer, SyncConfig};
