//! Seams to the camera and UI layers that drive and observe a tour.

use exhibit_core::Vec3;
use std::fmt;

use crate::stop::TourStop;

/// Moves the viewer's camera. Implemented by the rendering layer.
pub trait CameraDirector: Send {
    /// Animate toward `position`, looking at `look_at`.
    fn request_camera_move(&mut self, position: Vec3, look_at: Vec3);

    /// Jump to `position` without animation.
    fn request_immediate_camera_move(&mut self, position: Vec3, look_at: Vec3);
}

/// Receives playback notifications. Implemented by the UI layer.
pub trait TourListener: Send {
    fn on_tour_progress(&mut self, percent: f32);
    fn on_stop_changed(&mut self, stop: &TourStop);
    fn on_tour_completed(&mut self);
    fn on_interrupted(&mut self, reason: InterruptReason);
}

/// Why playback was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    /// The visitor moved the camera (keyboard, drag, scroll).
    UserInput,
    /// The host stopped the tour.
    Stopped,
}

impl fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterruptReason::UserInput => write!(f, "user input"),
            InterruptReason::Stopped => write!(f, "stopped"),
        }
    }
}
