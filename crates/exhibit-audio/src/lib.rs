//! Exhibit Audio - Audio engine
//!
//! Owns the single audio output of a gallery view, unlocks it under
//! gesture-gated autoplay policies, and plays named tracks.
//!
//! Architecture:
//! - `AudioBackend`: Platform seam (context, nodes, gains, probes)
//! - `AudioEngine`: Track table, unlock state machine, retries, scheduling
//! - `Mixer`: Master volume and concurrent-track auto-balance
//! - `DurationProbe`: Metadata-only duration measurement with a timeout
//! - `HeadlessBackend`: Simulated platform for headless hosts and tests

pub mod backend;
pub mod engine;
pub mod error;
pub mod headless;
pub mod mixer;
pub mod probe;
pub mod track;
pub mod unlock;

pub use backend::{AudioBackend, ContextState, NodeId};
pub use engine::AudioEngine;
pub use error::{AudioError, AudioResult};
pub use headless::HeadlessBackend;
pub use mixer::Mixer;
pub use probe::{DurationProbe, ProbeStatus};
pub use track::{PlayOptions, TrackHandle, TrackSnapshot, TrackState, BACKGROUND_TRACK_ID};
pub use unlock::{OneShot, UnlockState};
