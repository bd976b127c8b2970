//! Persisted tour marker records.
//!
//! This is the shape handed to the persistence collaborator:
//! `{ id, imageId?, type, index, position?, rotation?, audio?, duration? }`.

use exhibit_core::{Pose, Vec3};
use serde::{Deserialize, Serialize};

use crate::stop::{StopKey, StopKind, TourStop};

/// Kind tag of a marker record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerType {
    Image,
    Camera,
}

/// One persisted tour marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourMarkerRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: MarkerType,
    pub index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    /// XYZ euler angles in radians.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl TourMarkerRecord {
    /// The stop key this record reconciles with, if well-formed.
    pub fn key(&self) -> Option<StopKey> {
        match self.kind {
            MarkerType::Image => self.image_id.clone().map(StopKey::Image),
            MarkerType::Camera => Some(StopKey::Marker(self.id.clone())),
        }
    }

    /// Build the record for `stop` under record id `id`.
    pub fn from_stop(stop: &TourStop, id: String) -> Self {
        let (kind, image_id, pose) = match (&stop.key, stop.kind) {
            (
                StopKey::Image(image_id),
                StopKind::Image {
                    anchor_position,
                    facing_direction,
                },
            ) => (
                MarkerType::Image,
                Some(image_id.clone()),
                Pose::looking_at(anchor_position, anchor_position + facing_direction),
            ),
            (_, StopKind::Image { anchor_position, .. }) => {
                (MarkerType::Image, None, Pose::new(anchor_position, Default::default()))
            }
            (_, StopKind::Camera { pose }) => (MarkerType::Camera, None, pose),
        };
        Self {
            id,
            image_id,
            kind,
            index: stop.sequence_index,
            position: Some(pose.position.to_array()),
            rotation: Some(pose.euler()),
            audio: stop.narration_url.clone(),
            duration: stop.duration_ms,
        }
    }

    /// Rebuild a stop from this record. `None` for image records lacking an image id.
    pub fn to_stop(&self) -> Option<TourStop> {
        let key = self.key()?;
        let position = self.position.map(Vec3::from_array).unwrap_or(Vec3::ZERO);
        let pose = Pose::from_euler(position, self.rotation.unwrap_or([0.0; 3]));
        let kind = match self.kind {
            MarkerType::Image => StopKind::Image {
                anchor_position: position,
                facing_direction: pose.forward(),
            },
            MarkerType::Camera => StopKind::Camera { pose },
        };
        Some(TourStop {
            key,
            kind,
            sequence_index: self.index,
            narration_url: self.audio.clone(),
            duration_ms: self.duration,
            record_id: Some(self.id.clone()),
            revision: 0,
        })
    }
}
