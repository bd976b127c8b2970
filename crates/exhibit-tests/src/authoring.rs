//! Integration tests for tour authoring and persistence.

use exhibit_core::{ExhibitError, Pose, Vec3};
use exhibit_tour::{JsonFileStore, MemoryStore, StopKey, TourFile, INACTIVE_INDEX};

use crate::fixtures::{anchor, image, Gallery};

fn active_order(g: &Gallery) -> Vec<StopKey> {
    g.tour
        .sequence()
        .active_stops()
        .iter()
        .map(|s| s.key.clone())
        .collect()
}

#[test]
fn soft_deleted_narration_survives_commit_and_reload() {
    let store = MemoryStore::new();
    let mut g = Gallery::with_store(Box::new(store.clone()));
    g.author(&[("a", Some("n/a.mp3")), ("b", None)]);
    g.tour.remove_stop(&image("a")).unwrap();
    g.tour.commit().unwrap();

    let mut reopened = Gallery::with_store(Box::new(store.clone()));
    let detached = reopened.tour.sequence().get(&image("a")).unwrap();
    assert_eq!(detached.sequence_index, INACTIVE_INDEX);
    assert_eq!(detached.narration_url.as_deref(), Some("n/a.mp3"));
    assert_eq!(active_order(&reopened), vec![image("b")]);

    reopened
        .tour
        .add_image_stop("a", anchor(5), Vec3::NEG_Z);
    let back = reopened.tour.sequence().get(&image("a")).unwrap();
    assert_eq!(back.sequence_index, 1);
    assert_eq!(back.narration_url.as_deref(), Some("n/a.mp3"));

    // the reactivated stop keeps its record id
    let before = store.records();
    let after = reopened.tour.commit().unwrap();
    let id_of = |records: &[exhibit_tour::TourMarkerRecord]| {
        records
            .iter()
            .find(|r| r.image_id.as_deref() == Some("a"))
            .map(|r| r.id.clone())
    };
    assert_eq!(id_of(&before), id_of(&after));
}

#[test]
fn hard_deleted_stops_are_dropped_on_commit() {
    let store = MemoryStore::new();
    let mut g = Gallery::with_store(Box::new(store.clone()));
    g.author(&[("a", None), ("b", None)]);
    let cam = g.tour.add_camera_stop(Pose::looking_at(anchor(3), Vec3::ZERO));
    g.tour.set_narration(&cam, "n/c.mp3").unwrap();
    g.tour.commit().unwrap();
    assert_eq!(store.records().len(), 3);

    g.tour.remove_stop(&image("a")).unwrap();
    g.tour.remove_stop(&cam).unwrap();
    let records = g.tour.commit().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].image_id.as_deref(), Some("b"));
    assert_eq!(records[0].index, 0);
    assert_eq!(store.save_count(), 2);
}

#[test]
fn reorder_changes_playback_order() {
    let mut g = Gallery::permissive();
    g.author(&[("a", None), ("b", None), ("c", None)]);
    g.tour.reorder_stop(&image("c"), 0).unwrap();
    assert_eq!(active_order(&g), vec![image("c"), image("a"), image("b")]);

    g.tour.start_playback();
    g.run_until(20_000);
    assert_eq!(
        g.recorder.stops_shown(),
        vec![image("c"), image("a"), image("b")]
    );
}

#[test]
fn reorder_rejects_bad_input_without_side_effects() {
    let mut g = Gallery::permissive();
    g.author(&[("a", Some("n/a.mp3")), ("b", None)]);
    g.tour.remove_stop(&image("a")).unwrap();

    assert!(matches!(
        g.tour.reorder_stop(&image("missing"), 0),
        Err(ExhibitError::UnknownStop(_))
    ));
    assert!(matches!(
        g.tour.reorder_stop(&image("a"), 0),
        Err(ExhibitError::InvalidParameter(_))
    ));
    assert!(matches!(
        g.tour.reorder_stop(&image("b"), 3),
        Err(ExhibitError::InvalidParameter(_))
    ));
    assert_eq!(active_order(&g), vec![image("b")]);
}

#[test]
fn edits_keep_indices_contiguous() {
    let mut g = Gallery::permissive();
    let keys = g.author(&[
        ("a", Some("n/a.mp3")),
        ("b", None),
        ("c", Some("n/c.mp3")),
        ("d", None),
    ]);
    let cam = g.tour.add_camera_stop(Pose::IDENTITY);
    g.tour.remove_stop(&keys[1]).unwrap();
    g.tour.reorder_stop(&cam, 0).unwrap();
    g.tour.remove_stop(&keys[0]).unwrap();
    g.tour.add_image_stop("a", anchor(0), Vec3::NEG_Z);
    g.tour.remove_stop(&keys[2]).unwrap();
    g.tour.reorder_stop(&keys[3], 0).unwrap();

    assert!(g.tour.sequence().check_integrity());
    let indices: Vec<i32> = g
        .tour
        .sequence()
        .active_stops()
        .iter()
        .map(|s| s.sequence_index)
        .collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(active_order(&g), vec![image("d"), cam, image("a")]);
}

#[test]
fn json_store_persists_across_controllers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tour.json");

    let mut g = Gallery::with_store(Box::new(JsonFileStore::new(&path)));
    g.author(&[("a", Some("n/a.mp3")), ("b", None)]);
    g.tour.set_duration(&image("b"), Some(9_000)).unwrap();
    g.tour.commit().unwrap();

    let file = TourFile::read(&path).unwrap().unwrap();
    assert_eq!(file.markers.len(), 2);

    let reopened = Gallery::with_store(Box::new(JsonFileStore::new(&path)));
    assert_eq!(active_order(&reopened), vec![image("a"), image("b")]);
    let b = reopened.tour.sequence().get(&image("b")).unwrap();
    assert_eq!(b.duration_ms, Some(9_000));
}

#[test]
fn unknown_stop_edits_are_reported() {
    let mut g = Gallery::permissive();
    let missing = StopKey::Marker("nope".into());
    assert!(matches!(
        g.tour.remove_stop(&missing),
        Err(ExhibitError::UnknownStop(_))
    ));
    assert!(matches!(
        g.tour.set_narration(&missing, "n/a.mp3"),
        Err(ExhibitError::UnknownStop(_))
    ));
}
