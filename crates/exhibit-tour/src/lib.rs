//! Exhibit Tour - Guided tour authoring and playback
//!
//! Implements the tour of a virtual gallery:
//! - Stops anchored to images or captured camera poses
//! - An edit buffer with soft delete, reorder and commit
//! - Versioned persistence of marker records
//! - A pure playback clock driving camera moves and narration

pub mod collaborators;
pub mod controller;
pub mod marker;
pub mod playback;
pub mod sequence;
pub mod serialization;
pub mod stop;
pub mod store;

pub use collaborators::{CameraDirector, InterruptReason, TourListener};
pub use controller::{TourController, NARRATION_TRACK_ID};
pub use marker::{MarkerType, TourMarkerRecord};
pub use playback::{
    DurationRule, NarrationLength, PlanStop, PlaybackCursor, PlaybackPlan, TourEffect,
};
pub use sequence::TourSequence;
pub use serialization::{TourFile, CURRENT_VERSION};
pub use stop::{StopKey, StopKind, TourStop, INACTIVE_INDEX};
pub use store::{JsonFileStore, MemoryStore, TourStore};
