//! Persistence of committed tour markers.

use exhibit_core::Result;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::marker::TourMarkerRecord;
use crate::serialization::TourFile;

/// Where committed markers are saved and loaded from.
pub trait TourStore: Send {
    /// Every persisted marker. An empty list when nothing was saved yet.
    fn load(&self) -> Result<Vec<TourMarkerRecord>>;

    /// Replace the persisted markers.
    fn save(&mut self, records: &[TourMarkerRecord]) -> Result<()>;
}

/// In-memory store. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<TourMarkerRecord>>>,
    saves: Arc<Mutex<u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TourMarkerRecord> {
        self.records.lock().clone()
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> u32 {
        *self.saves.lock()
    }
}

impl TourStore for MemoryStore {
    fn load(&self) -> Result<Vec<TourMarkerRecord>> {
        Ok(self.records.lock().clone())
    }

    fn save(&mut self, records: &[TourMarkerRecord]) -> Result<()> {
        *self.records.lock() = records.to_vec();
        *self.saves.lock() += 1;
        Ok(())
    }
}

/// Store backed by a [`TourFile`] on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TourStore for JsonFileStore {
    fn load(&self) -> Result<Vec<TourMarkerRecord>> {
        let Some(file) = TourFile::read(&self.path)? else {
            debug!(path = %self.path.display(), "No tour file yet");
            return Ok(Vec::new());
        };
        info!(path = %self.path.display(), markers = file.markers.len(), "Loaded tour");
        Ok(file.markers)
    }

    fn save(&mut self, records: &[TourMarkerRecord]) -> Result<()> {
        TourFile::new(records.to_vec()).write(&self.path)?;
        info!(path = %self.path.display(), markers = records.len(), "Saved tour");
        Ok(())
    }
}
