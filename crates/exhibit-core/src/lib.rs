//! Exhibit Core - Foundation types for the virtual gallery editor
//!
//! This crate provides the types shared by the audio engine and the tour:
//! - Error type and `Result` alias
//! - Millisecond clocks (real and manually stepped)
//! - Declarative retry policy
//! - Camera poses
//! - Configuration

pub mod clock;
pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod retry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AudioConfig, ExhibitConfig, TourConfig};
pub use error::{ExhibitError, Result};
pub use geometry::{Pose, Vec3};
pub use input::GestureKind;
pub use retry::RetryPolicy;
