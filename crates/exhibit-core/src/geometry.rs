//! Geometric primitives for camera placement in the gallery.

use glam::{Quat, Vec3 as GlamVec3};
use serde::{Deserialize, Serialize};

/// 3D vector.
pub type Vec3 = GlamVec3;

/// Distance in front of a camera used to derive a look-at point.
pub const LOOK_DISTANCE: f32 = 1.0;

/// A camera pose: position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    /// Identity pose at the origin, looking down -Z.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Create a new pose.
    #[inline]
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Create a pose at `position` looking towards `target`.
    ///
    /// Falls back to the identity orientation when the two points coincide.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let dir = (target - position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return Self::new(position, Quat::IDENTITY);
        }
        Self::new(position, Quat::from_rotation_arc(Vec3::NEG_Z, dir))
    }

    /// Unit forward vector (-Z rotated by the orientation).
    #[inline]
    pub fn forward(self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// Point the camera should look at.
    #[inline]
    pub fn look_target(self) -> Vec3 {
        self.position + self.forward() * LOOK_DISTANCE
    }

    /// Orientation as XYZ euler angles (radians), the shape stored in marker records.
    pub fn euler(self) -> [f32; 3] {
        let (x, y, z) = self.orientation.to_euler(glam::EulerRot::XYZ);
        [x, y, z]
    }

    /// Rebuild a pose from a position and XYZ euler angles.
    pub fn from_euler(position: Vec3, euler: [f32; 3]) -> Self {
        Self::new(
            position,
            Quat::from_euler(glam::EulerRot::XYZ, euler[0], euler[1], euler[2]),
        )
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}
