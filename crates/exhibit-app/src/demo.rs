//! Scripted demo content for the headless host.

use anyhow::Result;
use exhibit_audio::HeadlessBackend;
use exhibit_core::{Pose, Vec3};
use exhibit_tour::TourController;

pub const AMBIENCE_URL: &str = "audio/gallery-ambience.ogg";

/// Narration assets and their lengths in milliseconds.
const NARRATIONS: &[(&str, u64)] = &[
    ("audio/entrance.mp3", 6_000),
    ("audio/portrait.mp3", 2_500),
];

/// Host input replayed while the tour plays, by milliseconds since start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Pause,
    Resume,
    Hide,
    Show,
}

pub const DEMO_SCRIPT: &[(u64, HostAction)] = &[
    (2_000, HostAction::Pause),
    (3_000, HostAction::Resume),
    (7_500, HostAction::Hide),
    (8_000, HostAction::Show),
];

pub fn register_assets(backend: &HeadlessBackend) {
    backend.add_asset(AMBIENCE_URL, 30_000);
    for (url, ms) in NARRATIONS {
        backend.add_asset(url, *ms);
    }
}

/// Author a three-stop tour: two paintings and an overview shot.
pub fn author(tour: &mut TourController) -> Result<()> {
    let entrance = tour.add_image_stop("entrance-panel", Vec3::new(0.0, 1.6, 3.0), Vec3::NEG_Z);
    tour.set_narration(&entrance, NARRATIONS[0].0)?;

    let portrait = tour.add_image_stop("portrait", Vec3::new(4.0, 1.6, 1.0), Vec3::X);
    tour.set_narration(&portrait, NARRATIONS[1].0)?;
    tour.set_duration(&portrait, Some(3_000))?;

    let overview = tour.add_camera_stop(Pose::looking_at(
        Vec3::new(-2.0, 2.4, 6.0),
        Vec3::new(2.0, 1.2, 0.0),
    ));
    tour.set_duration(&overview, Some(2_000))?;
    Ok(())
}
