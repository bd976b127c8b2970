//! Integration tests for the audio engine alongside a playing tour.

use exhibit_audio::{ContextState, PlayOptions, UnlockState};
use exhibit_core::GestureKind;
use exhibit_tour::NARRATION_TRACK_ID;

use crate::fixtures::Gallery;

#[test]
fn replaying_an_id_with_new_source_keeps_one_track() {
    let g = Gallery::permissive();
    let mut audio = g.audio.lock();
    let first = audio.play_track("fx", "n/a.mp3", PlayOptions::default());
    let second = audio.play_track("fx", "n/b.mp3", PlayOptions::default());

    assert!(!audio.is_current(&first));
    assert!(audio.is_current(&second));
    assert_eq!(audio.track_ids(), vec!["fx".to_string()]);
    assert_eq!(g.backend.audible_urls(), vec!["n/b.mp3"]);
    assert_eq!(g.backend.node_count(), 1);
}

#[test]
fn repeated_unlock_registers_listeners_once() {
    let g = Gallery::gated();
    let mut audio = g.audio.lock();
    for _ in 0..10 {
        audio.ensure_unlocked();
    }
    assert_eq!(g.backend.listener_registrations(), 1);
    assert_eq!(audio.unlock_state(), UnlockState::AwaitingGesture);

    audio.on_user_gesture(GestureKind::PointerUp);
    audio.on_user_gesture(GestureKind::Click);
    assert_eq!(audio.unlock_state(), UnlockState::Unlocked);
    assert_eq!(g.backend.silent_buffers_played(), 1);
    assert_eq!(g.backend.active_listeners(), 0);

    audio.ensure_unlocked();
    assert_eq!(g.backend.listener_registrations(), 1);
}

#[test]
fn narration_is_balanced_against_background_loop() {
    let mut g = Gallery::permissive();
    g.audio.lock().play_background_loop("amb/loop.ogg", 0.5);
    assert!((g.audio.lock().effective_gain("background").unwrap() - 0.5).abs() < 1e-6);

    g.author(&[("x", Some("n/a.mp3"))]);
    g.tour.start_playback();
    let factor = 1.0 / 2f32.sqrt();
    {
        let audio = g.audio.lock();
        assert!((audio.effective_gain("background").unwrap() - 0.5 * factor).abs() < 1e-4);
        assert!((audio.effective_gain(NARRATION_TRACK_ID).unwrap() - factor).abs() < 1e-4);
    }

    // narration over, background back to nominal
    g.tour.stop_playback();
    assert!((g.audio.lock().effective_gain("background").unwrap() - 0.5).abs() < 1e-6);
}

#[test]
fn platform_suspension_mid_tour_is_recovered() {
    let mut g = Gallery::permissive();
    g.author(&[("x", Some("n/b.mp3")), ("y", None)]);
    g.tour.start_playback();
    g.run_until(1_000);

    g.backend.reclaim_context();
    g.backend.drop_connections();
    assert!(g.backend.audible_urls().is_empty());

    g.run_until(1_100);
    assert_eq!(g.audio.lock().context_state(), ContextState::Running);
    assert_eq!(g.backend.audible_urls(), vec!["n/b.mp3"]);
    assert_eq!(g.stop_index(), Some(0));
}

#[test]
fn hidden_page_silences_without_stopping_the_tour() {
    let mut g = Gallery::permissive();
    g.author(&[("x", Some("n/a.mp3")), ("y", None)]);
    g.tour.start_playback();
    g.run_until(500);

    g.audio.lock().on_visibility_changed(false);
    assert_eq!(g.audio.lock().context_state(), ContextState::Suspended);
    assert!(g.backend.audible_urls().is_empty());
    g.run_until(1_500);
    assert!(g.tour.is_playing());

    g.audio.lock().on_visibility_changed(true);
    assert_eq!(g.backend.audible_urls(), vec!["n/a.mp3"]);
}

#[test]
fn disposed_engine_leaves_tour_visual_only() {
    let mut g = Gallery::permissive();
    g.author(&[("x", Some("n/a.mp3")), ("y", None)]);
    g.audio.lock().dispose();
    assert_eq!(g.audio.lock().context_state(), ContextState::Closed);

    assert!(g.tour.start_playback());
    assert!(g.backend.audible_urls().is_empty());
    // no measurement possible, default timing applies
    assert_eq!(g.tour.plan().duration_ms(0), 5_000);
    g.run_until(5_100);
    assert_eq!(g.stop_index(), Some(1));
}
