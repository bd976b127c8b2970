//! Tour stops and their keys.

use exhibit_core::{Pose, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Sequence index of a stop that is detached from playback but kept for
/// its authored data.
pub const INACTIVE_INDEX: i32 = -1;

/// Stable identity of a stop across edits and saves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StopKey {
    /// A stop anchored to a placed image.
    Image(String),
    /// A free camera stop, keyed by its generated marker id.
    Marker(String),
}

impl StopKey {
    /// A fresh marker key.
    pub fn new_marker() -> Self {
        Self::Marker(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for StopKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopKey::Image(id) => write!(f, "image:{}", id),
            StopKey::Marker(id) => write!(f, "marker:{}", id),
        }
    }
}

/// What a stop points the camera at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StopKind {
    /// View an image from `anchor_position`, looking along `facing_direction`.
    Image {
        anchor_position: Vec3,
        facing_direction: Vec3,
    },
    /// A captured camera pose.
    Camera { pose: Pose },
}

/// One waypoint of the guided tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourStop {
    pub key: StopKey,
    pub kind: StopKind,
    /// Playback order, or [`INACTIVE_INDEX`].
    pub sequence_index: i32,
    pub narration_url: Option<String>,
    /// Authored dwell time.
    pub duration_ms: Option<u64>,
    /// Id of the persisted marker record, once committed.
    pub record_id: Option<String>,
    /// Write stamp; higher means written later.
    #[serde(skip)]
    pub(crate) revision: u64,
}

impl TourStop {
    pub fn is_active(&self) -> bool {
        self.sequence_index != INACTIVE_INDEX
    }

    pub fn has_narration(&self) -> bool {
        self.narration_url.is_some()
    }

    pub fn is_camera(&self) -> bool {
        matches!(self.kind, StopKind::Camera { .. })
    }

    /// Whether removal keeps this stop around detached. Only image stops
    /// with narration are worth preserving.
    pub fn is_detachable(&self) -> bool {
        self.has_narration() && !self.is_camera()
    }

    /// Camera position and look-at point for this stop.
    pub fn camera_target(&self) -> (Vec3, Vec3) {
        match self.kind {
            StopKind::Image {
                anchor_position,
                facing_direction,
            } => {
                let dir = facing_direction.normalize_or_zero();
                (anchor_position, anchor_position + dir)
            }
            StopKind::Camera { pose } => (pose.position, pose.look_target()),
        }
    }
}
