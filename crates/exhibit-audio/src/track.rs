//! Named playback units.

use serde::{Deserialize, Serialize};

use crate::backend::NodeId;

/// Track id used by the background loop.
pub const BACKGROUND_TRACK_ID: &str = "background";

/// Where a track is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrackState {
    /// Connected, waiting for a running output context to start at `offset_secs`.
    Pending { offset_secs: f64 },
    Playing,
    Paused { position_secs: f64 },
    /// Ramping to silence before teardown.
    Stopping,
}

/// Options for [`AudioEngine::play_track`](crate::AudioEngine::play_track).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    /// Logical volume 0..1, independent of master.
    pub volume: f32,
    pub looped: bool,
    pub fade_in_ms: u64,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            looped: false,
            fade_in_ms: 0,
        }
    }
}

impl PlayOptions {
    pub fn volume(volume: f32) -> Self {
        Self {
            volume,
            ..Default::default()
        }
    }

    pub fn looped(mut self) -> Self {
        self.looped = true;
        self
    }

    pub fn fade_in(mut self, ms: u64) -> Self {
        self.fade_in_ms = ms;
        self
    }
}

/// Identifies one incarnation of a track. Replacing the source under the
/// same id bumps the generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackHandle {
    pub id: String,
    pub generation: u64,
}

impl TrackHandle {
    /// Handle for a track that could not be created.
    pub fn invalid(id: &str) -> Self {
        Self {
            id: id.to_string(),
            generation: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.generation != 0
    }
}

/// A track owned by the engine.
#[derive(Debug, Clone)]
pub(crate) struct AudioTrack {
    pub id: String,
    pub source_url: String,
    pub gain_level: f32,
    pub is_background_loop: bool,
    pub loop_enabled: bool,
    pub node: NodeId,
    pub state: TrackState,
    pub generation: u64,
    /// Gain last pushed to the backend, after balancing.
    pub effective_gain: f32,
    /// Whether `effective_gain` has reached the node at least once.
    pub gain_applied: bool,
    /// Fade-in still to apply on the next gain update.
    pub fade_in_ms: u64,
}

impl AudioTrack {
    /// Whether this track counts towards the concurrent-track balance.
    pub fn is_audible(&self) -> bool {
        matches!(self.state, TrackState::Playing)
    }

    pub fn handle(&self) -> TrackHandle {
        TrackHandle {
            id: self.id.clone(),
            generation: self.generation,
        }
    }
}

/// Read-only view of a track. Advisory: may be stale by the next tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub id: String,
    pub source_url: String,
    pub gain_level: f32,
    pub effective_gain: f32,
    pub is_background_loop: bool,
    pub loop_enabled: bool,
    pub state: TrackState,
    pub playback_position_seconds: f64,
    pub duration_seconds: Option<f64>,
}
