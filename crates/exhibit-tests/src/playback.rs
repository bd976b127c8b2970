//! Integration tests for tour playback over the audio engine.

use exhibit_core::{GestureKind, Pose, TourConfig, Vec3};
use exhibit_tour::{InterruptReason, NarrationLength, NARRATION_TRACK_ID};

use crate::fixtures::{anchor, image, Event, Gallery};

// ── Timing ─────────────────────────────────────────────────────

#[test]
fn narration_longer_than_authored_duration_wins() {
    let mut g = Gallery::permissive();
    let keys = g.author(&[("x", Some("n/b.mp3")), ("y", None)]);
    g.tour.set_duration(&keys[0], Some(3_000)).unwrap();
    g.tour.start_playback();

    g.run_until(7_000);
    assert_eq!(g.stop_index(), Some(0));
    g.run_until(7_100);
    assert_eq!(g.stop_index(), Some(1));
}

#[test]
fn authored_duration_without_narration() {
    let mut g = Gallery::permissive();
    let keys = g.author(&[("x", None), ("y", None)]);
    g.tour.set_duration(&keys[0], Some(8_000)).unwrap();
    g.tour.start_playback();

    g.run_until(8_000);
    assert_eq!(g.stop_index(), Some(0));
    g.run_until(8_100);
    assert_eq!(g.stop_index(), Some(1));
}

#[test]
fn short_narration_does_not_override_authored_duration() {
    let mut g = Gallery::permissive();
    let keys = g.author(&[("x", Some("n/short.mp3")), ("y", None)]);
    g.tour.set_duration(&keys[0], Some(4_000)).unwrap();
    g.tour.start_playback();
    assert_eq!(g.tour.plan().duration_ms(0), 4_000);

    g.run_until(4_100);
    assert_eq!(g.stop_index(), Some(1));
}

#[test]
fn overall_progress_scenario() {
    let mut g = Gallery::permissive();
    let a = g.tour.add_image_stop("A", anchor(0), Vec3::NEG_Z);
    g.tour.set_duration(&a, Some(5_000)).unwrap();
    let b = g.tour.add_camera_stop(Pose::looking_at(anchor(1), Vec3::ZERO));
    g.tour.set_duration(&b, Some(6_000)).unwrap();
    g.tour.start_playback();

    g.run_until(2_000);
    let expected = 2_000.0 / 11_000.0 * 100.0;
    assert!((g.tour.compute_overall_progress() - expected).abs() < 0.01);
    assert!((g.recorder.last_progress().unwrap() - expected).abs() < 0.01);
}

#[test]
fn full_run_notifies_in_order() {
    let mut g = Gallery::permissive();
    let keys = g.author(&[("x", Some("n/a.mp3")), ("y", None)]);
    g.tour.start_playback();
    g.run_until(12_000);

    assert!(!g.tour.is_playing());
    assert_eq!(
        g.recorder.events(),
        vec![
            Event::CameraMove {
                position: anchor(0),
                look_at: anchor(0) + Vec3::NEG_Z,
            },
            Event::StopChanged(keys[0].clone()),
            Event::CameraMove {
                position: anchor(1),
                look_at: anchor(1) + Vec3::NEG_Z,
            },
            Event::StopChanged(keys[1].clone()),
            Event::Completed,
        ]
    );
    assert_eq!(g.recorder.last_progress(), Some(100.0));
}

// ── Narration ordering ─────────────────────────────────────────

#[test]
fn narration_never_overlaps_across_stops() {
    let mut g = Gallery::with_tour_config(TourConfig {
        narration_fade_ms: 300,
        ..TourConfig::default()
    });
    let keys = g.author(&[
        ("x", Some("n/short.mp3")),
        ("y", Some("n/a.mp3")),
        ("z", Some("n/c.mp3")),
    ]);
    // x leaves while its narration is still playing
    g.tour.set_duration(&keys[0], Some(1_000)).unwrap();
    g.tour.start_playback();

    while g.tour.is_playing() {
        g.run_until(g.clock_ms() + 100);
        assert!(g.backend.audible_urls().len() <= 1);
        assert!(g.audio.lock().active_track_count() <= 1);
    }
    assert_eq!(
        g.backend.connect_log(),
        vec!["n/short.mp3", "n/a.mp3", "n/c.mp3"]
    );
}

#[test]
fn cut_short_narration_is_silenced_on_advance() {
    let mut g = Gallery::permissive();
    let keys = g.author(&[("x", Some("n/short.mp3")), ("y", Some("n/a.mp3"))]);
    g.tour.set_duration(&keys[0], Some(1_000)).unwrap();
    g.tour.start_playback();
    assert_eq!(g.backend.audible_urls(), vec!["n/short.mp3"]);

    g.run_until(1_100);
    assert_eq!(g.backend.audible_urls(), vec!["n/a.mp3"]);
    assert_eq!(g.backend.node_count(), 1);
}

// ── Interruption ───────────────────────────────────────────────

#[test]
fn interrupt_at_third_stop_then_restart_from_first() {
    let mut g = Gallery::permissive();
    g.author(&[
        ("w", Some("n/a.mp3")),
        ("x", Some("n/b.mp3")),
        ("y", Some("n/c.mp3")),
        ("z", None),
    ]);
    g.tour.start_playback();
    g.run_until(13_300);
    assert_eq!(g.stop_index(), Some(2));
    assert_eq!(g.backend.audible_urls(), vec!["n/c.mp3"]);

    g.tour.on_user_input_detected();
    assert!(!g.tour.is_playing());
    assert!(g.tour.cursor().is_none());
    assert!(g.backend.audible_urls().is_empty());
    assert!(!g.audio.lock().is_track_playing(NARRATION_TRACK_ID));
    assert_eq!(
        g.recorder.events().last(),
        Some(&Event::Interrupted(InterruptReason::UserInput))
    );

    // nothing moves while idle
    g.run_until(30_000);
    assert_eq!(g.recorder.stops_shown().len(), 3);

    assert!(g.tour.start_playback());
    assert_eq!(g.stop_index(), Some(0));
    assert_eq!(g.recorder.stops_shown().last(), Some(&image("w")));
    assert_eq!(g.backend.audible_urls(), vec!["n/a.mp3"]);
}

#[test]
fn late_probe_from_previous_session_is_ignored() {
    let mut g = Gallery::permissive();
    g.backend.hold_probes(true);
    g.author(&[("x", Some("n/b.mp3"))]);
    g.tour.start_playback();
    let first = g.tour.session();
    g.tour.interrupt(InterruptReason::Stopped);
    g.tour.start_playback();
    assert!(g.tour.session() > first);
    assert!(g.tour.plan().is_measuring(0));

    g.backend.release_probes();
    g.run_until(100);
    assert_eq!(g.tour.plan().stops[0].narration, NarrationLength::Known(7_000));
    assert!(g.tour.is_playing());
    assert_eq!(g.recorder.count(|e| matches!(e, Event::Interrupted(_))), 1);
}

#[test]
fn hung_probe_times_out_to_fallback_duration() {
    let mut g = Gallery::permissive();
    g.backend.hold_probes(true);
    g.author(&[("x", Some("n/b.mp3")), ("y", None)]);
    g.tour.start_playback();

    g.run_until(9_900);
    assert_eq!(g.stop_index(), Some(0));
    g.run_until(10_000);
    assert_eq!(g.tour.plan().stops[0].narration, NarrationLength::Unknown);
    assert_eq!(g.stop_index(), Some(1));
}

// ── Pause and platform gating ──────────────────────────────────

#[test]
fn pause_holds_stop_and_narration_position() {
    let mut g = Gallery::permissive();
    g.author(&[("x", Some("n/b.mp3")), ("y", None)]);
    g.tour.start_playback();
    g.run_until(3_000);
    g.tour.pause_playback();

    g.run_until(60_000);
    assert_eq!(g.stop_index(), Some(0));
    assert!(g.backend.audible_urls().is_empty());

    g.tour.resume_playback();
    let snapshot = g.audio.lock().track_snapshot(NARRATION_TRACK_ID).unwrap();
    assert!((snapshot.playback_position_seconds - 3.0).abs() < 1e-6);
    assert_eq!(g.backend.audible_urls(), vec!["n/b.mp3"]);

    // 4s of narration remain
    g.run_until(64_000);
    assert_eq!(g.stop_index(), Some(0));
    g.run_until(64_100);
    assert_eq!(g.stop_index(), Some(1));
}

#[test]
fn tour_runs_on_time_while_audio_awaits_gesture() {
    let mut g = Gallery::gated();
    g.author(&[("x", Some("n/a.mp3")), ("y", None)]);
    g.tour.start_playback();

    assert_eq!(g.recorder.stops_shown(), vec![image("x")]);
    assert!(g.backend.audible_urls().is_empty());
    assert_eq!(g.tour.plan().duration_ms(0), 6_000);

    g.run_until(1_000);
    g.audio.lock().on_user_gesture(GestureKind::TouchEnd);
    assert_eq!(g.backend.audible_urls(), vec!["n/a.mp3"]);

    g.run_until(6_100);
    assert_eq!(g.stop_index(), Some(1));
}
