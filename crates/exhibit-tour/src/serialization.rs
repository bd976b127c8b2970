//! On-disk tour format: the committed marker list plus a schema version.

use exhibit_core::{ExhibitError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::marker::TourMarkerRecord;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Versioned tour file wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourFile {
    /// Schema version for migration.
    pub version: u32,
    /// Persisted markers, active and detached.
    pub markers: Vec<TourMarkerRecord>,
    /// Application version that wrote this file.
    pub app_version: String,
}

impl TourFile {
    pub fn new(markers: Vec<TourMarkerRecord>) -> Self {
        Self {
            version: CURRENT_VERSION,
            markers,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse a tour file of any known version, upgrading it in memory.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)?;
        let version = match raw.get("version") {
            Some(v) => v
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| ExhibitError::Serialization(format!("bad tour version {}", v)))?,
            None => 0,
        };
        if version > CURRENT_VERSION {
            return Err(ExhibitError::Serialization(format!(
                "tour version {} is newer than {}",
                version, CURRENT_VERSION
            )));
        }
        Ok(serde_json::from_value(upgrade(raw, version)?)?)
    }

    /// Read the tour at `path`. `None` when no file exists there yet.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        match std::fs::read(path) {
            Ok(data) => Self::parse(&data).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file at `path` through a sibling temp file, so readers
    /// never see a half-written tour.
    pub fn write(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, self.encode()?)?;
        std::fs::rename(&tmp, path).map_err(|e| {
            ExhibitError::Persistence(format!("could not replace {}: {}", path.display(), e))
        })
    }
}

/// Bring a raw document from `version` up to [`CURRENT_VERSION`].
fn upgrade(mut data: serde_json::Value, mut version: u32) -> Result<serde_json::Value> {
    while version < CURRENT_VERSION {
        data = match (version, data) {
            // v0 was the bare marker list served by the gallery backend
            (0, serde_json::Value::Array(markers)) => serde_json::json!({
                "version": 1,
                "markers": markers,
                "app_version": "0.0.0",
            }),
            (0, _) => {
                return Err(ExhibitError::Serialization(
                    "unversioned tour is not a marker list".into(),
                ))
            }
            (v, _) => {
                return Err(ExhibitError::Serialization(format!(
                    "cannot upgrade tour version {}",
                    v
                )))
            }
        };
        version += 1;
    }
    Ok(data)
}
