//! Collaborators that report tour activity through `tracing`.

use exhibit_core::Vec3;
use exhibit_tour::{CameraDirector, InterruptReason, TourListener, TourStop};
use tracing::{debug, info, warn};

/// Stands in for the renderer's camera controls.
#[derive(Debug, Default)]
pub struct LoggingCamera {
    moves: u32,
}

impl CameraDirector for LoggingCamera {
    fn request_camera_move(&mut self, position: Vec3, look_at: Vec3) {
        self.moves += 1;
        info!(?position, ?look_at, moves = self.moves, "Camera move");
    }

    fn request_immediate_camera_move(&mut self, position: Vec3, look_at: Vec3) {
        info!(?position, ?look_at, "Camera jump");
    }
}

/// Stands in for the tour chrome of the UI.
#[derive(Debug, Default)]
pub struct LoggingListener {
    last_decile: Option<u32>,
}

impl TourListener for LoggingListener {
    fn on_tour_progress(&mut self, percent: f32) {
        let decile = (percent / 10.0) as u32;
        if self.last_decile != Some(decile) {
            self.last_decile = Some(decile);
            debug!(percent = %format!("{:.1}", percent), "Tour progress");
        }
    }

    fn on_stop_changed(&mut self, stop: &TourStop) {
        info!(stop = %stop.key, index = stop.sequence_index, "Now showing");
    }

    fn on_tour_completed(&mut self) {
        info!("Tour completed");
    }

    fn on_interrupted(&mut self, reason: InterruptReason) {
        warn!(%reason, "Tour interrupted");
    }
}
