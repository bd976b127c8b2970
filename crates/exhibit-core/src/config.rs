//! Application configuration.
//!
//! Loaded from JSON. Every field has a default so partial files are valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ExhibitError, Result};
use crate::input::GestureKind;
use crate::retry::RetryPolicy;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExhibitConfig {
    pub audio: AudioConfig,
    pub tour: TourConfig,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ExhibitConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            tour: TourConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl ExhibitConfig {
    /// Parse from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| ExhibitError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.audio.balance_floor) {
            return Err(ExhibitError::Config(format!(
                "balance_floor must be within 0..1, got {}",
                self.audio.balance_floor
            )));
        }
        if !(0.0..=1.0).contains(&self.audio.master_volume) {
            return Err(ExhibitError::Config(format!(
                "master_volume must be within 0..1, got {}",
                self.audio.master_volume
            )));
        }
        if self.audio.resume_retry.max_attempts == 0 {
            return Err(ExhibitError::Config(
                "resume_retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.tour.tick_interval_ms == 0 {
            return Err(ExhibitError::Config(
                "tick_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Audio engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input events that unlock audio on gesture-gated platforms.
    pub unlock_gestures: Vec<GestureKind>,
    /// Context resume retries when playback hits a suspended output.
    pub resume_retry: RetryPolicy,
    /// Give up on a duration probe after this long.
    pub probe_timeout_ms: u64,
    /// Delay before re-applying the background loop gain after start.
    pub background_gain_fix_ms: u64,
    /// Lowest per-track balance factor.
    pub balance_floor: f32,
    /// Initial master volume.
    pub master_volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            unlock_gestures: GestureKind::UNLOCK_DEFAULT.to_vec(),
            resume_retry: RetryPolicy::default(),
            probe_timeout_ms: 10_000,
            background_gain_fix_ms: 200,
            balance_floor: 0.2,
            master_volume: 1.0,
        }
    }
}

/// Tour playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    /// Period of the advancement timer.
    pub tick_interval_ms: u64,
    /// Dwell time for stops with no usable duration.
    pub default_stop_duration_ms: u64,
    /// Narration shorter than this does not override the authored duration.
    pub min_narration_ms: u64,
    /// Fade applied when narration is stopped at a stop transition.
    pub narration_fade_ms: u64,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            default_stop_duration_ms: 5_000,
            min_narration_ms: 5_000,
            narration_fade_ms: 0,
        }
    }
}
