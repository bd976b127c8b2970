//! The authored stop sequence and its uncommitted edit buffer.
//!
//! Every mutation leaves the active stops (index != -1) numbered
//! `0..n` with no gaps or duplicates.

use exhibit_core::{ExhibitError, Pose, Result, Vec3};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::marker::TourMarkerRecord;
use crate::stop::{StopKey, StopKind, TourStop, INACTIVE_INDEX};

/// Ordered tour stops, active and inactive.
#[derive(Debug, Clone, Default)]
pub struct TourSequence {
    stops: Vec<TourStop>,
    revision: u64,
}

impl TourSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the edit buffer from persisted records.
    ///
    /// Later records win index ties. Malformed and duplicate records are skipped.
    pub fn load(records: &[TourMarkerRecord]) -> Self {
        let mut sequence = Self::new();
        let mut seen = HashSet::new();
        for record in records {
            let Some(mut stop) = record.to_stop() else {
                warn!(record = %record.id, "Skipping image marker without an image id");
                continue;
            };
            if !seen.insert(stop.key.clone()) {
                warn!(stop = %stop.key, "Skipping duplicate marker record");
                continue;
            }
            if stop.sequence_index < INACTIVE_INDEX {
                stop.sequence_index = INACTIVE_INDEX;
            }
            if !stop.is_active() && !stop.is_detachable() {
                debug!(stop = %stop.key, "Dropping detached marker with nothing to keep");
                continue;
            }
            stop.revision = sequence.next_revision();
            sequence.stops.push(stop);
        }
        sequence.repair();
        sequence
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Every stop, active or not, in insertion order.
    pub fn stops(&self) -> &[TourStop] {
        &self.stops
    }

    /// Active stops in playback order.
    pub fn active_stops(&self) -> Vec<&TourStop> {
        let mut active: Vec<&TourStop> = self.stops.iter().filter(|s| s.is_active()).collect();
        active.sort_by_key(|s| s.sequence_index);
        active
    }

    pub fn active_len(&self) -> usize {
        self.stops.iter().filter(|s| s.is_active()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_len() == 0
    }

    pub fn get(&self, key: &StopKey) -> Option<&TourStop> {
        self.stops.iter().find(|s| &s.key == key)
    }

    fn position_of(&self, key: &StopKey) -> Result<usize> {
        self.stops
            .iter()
            .position(|s| &s.key == key)
            .ok_or_else(|| ExhibitError::UnknownStop(key.to_string()))
    }

    // ── Authoring ───────────────────────────────────────────────

    /// Append a stop for an image. A detached stop for the same image is
    /// reactivated, keeping its narration.
    pub fn add_image_stop(
        &mut self,
        image_id: &str,
        anchor_position: Vec3,
        facing_direction: Vec3,
    ) -> StopKey {
        let key = StopKey::Image(image_id.to_string());
        let kind = StopKind::Image {
            anchor_position,
            facing_direction,
        };
        let next = self.active_len() as i32;
        let revision = self.next_revision();

        if let Some(stop) = self.stops.iter_mut().find(|s| s.key == key) {
            stop.kind = kind;
            stop.revision = revision;
            if stop.is_active() {
                debug!(stop = %key, "Image already in tour, anchor updated");
            } else {
                stop.sequence_index = next;
                debug!(stop = %key, index = next, "Reactivated image stop");
            }
            return key;
        }

        self.stops.push(TourStop {
            key: key.clone(),
            kind,
            sequence_index: next,
            narration_url: None,
            duration_ms: None,
            record_id: None,
            revision,
        });
        debug!(stop = %key, index = next, "Added image stop");
        key
    }

    /// Append a stop capturing `pose` verbatim.
    pub fn add_camera_stop(&mut self, pose: Pose) -> StopKey {
        let key = StopKey::new_marker();
        let index = self.active_len() as i32;
        let revision = self.next_revision();
        self.stops.push(TourStop {
            key: key.clone(),
            kind: StopKind::Camera { pose },
            sequence_index: index,
            narration_url: None,
            duration_ms: None,
            record_id: None,
            revision,
        });
        debug!(stop = %key, index, "Added camera stop");
        key
    }

    /// Take a stop out of the sequence.
    ///
    /// Image stops with narration are detached (index -1) so the narration
    /// survives re-adding. Everything else is deleted.
    pub fn remove_stop(&mut self, key: &StopKey) -> Result<()> {
        let pos = self.position_of(key)?;
        let revision = self.next_revision();
        let stop = &mut self.stops[pos];
        if !stop.is_active() {
            debug!(stop = %key, "Stop already detached");
            return Ok(());
        }
        if stop.is_detachable() {
            stop.sequence_index = INACTIVE_INDEX;
            stop.revision = revision;
            debug!(stop = %key, "Detached stop, narration kept");
        } else {
            self.stops.remove(pos);
            debug!(stop = %key, "Deleted stop");
        }
        self.renumber();
        Ok(())
    }

    /// Move an active stop to `new_position` in playback order.
    pub fn reorder_stop(&mut self, key: &StopKey, new_position: usize) -> Result<()> {
        let pos = self.position_of(key)?;
        if !self.stops[pos].is_active() {
            return Err(ExhibitError::InvalidParameter(format!(
                "stop {} is not in the tour",
                key
            )));
        }
        let len = self.active_len();
        if new_position >= len {
            return Err(ExhibitError::InvalidParameter(format!(
                "position {} out of range for {} stops",
                new_position, len
            )));
        }

        let mut order: Vec<StopKey> = self.active_stops().iter().map(|s| s.key.clone()).collect();
        let from = order.iter().position(|k| k == key).unwrap_or(0);
        let moved = order.remove(from);
        order.insert(new_position, moved);

        let revision = self.next_revision();
        for (index, k) in order.iter().enumerate() {
            if let Some(stop) = self.stops.iter_mut().find(|s| &s.key == k) {
                stop.sequence_index = index as i32;
                if k == key {
                    stop.revision = revision;
                }
            }
        }
        debug!(stop = %key, from, to = new_position, "Reordered stop");
        Ok(())
    }

    /// Write a raw index for a stop, as an authoring UI racing with other
    /// edits might. The latest write keeps the contested index and the
    /// sequence is renumbered. A negative index removes the stop.
    pub fn assign_index(&mut self, key: &StopKey, index: i32) -> Result<()> {
        if index < 0 {
            return self.remove_stop(key);
        }
        let pos = self.position_of(key)?;
        let revision = self.next_revision();
        let stop = &mut self.stops[pos];
        stop.sequence_index = index;
        stop.revision = revision;
        self.repair();
        Ok(())
    }

    /// Attach narration audio to a stop.
    pub fn set_narration(&mut self, key: &StopKey, url: &str) -> Result<()> {
        let pos = self.position_of(key)?;
        let revision = self.next_revision();
        let stop = &mut self.stops[pos];
        stop.narration_url = Some(url.to_string());
        stop.revision = revision;
        Ok(())
    }

    /// Remove a stop's narration. A detached stop has nothing left worth
    /// keeping and is deleted.
    pub fn clear_narration(&mut self, key: &StopKey) -> Result<()> {
        let pos = self.position_of(key)?;
        if !self.stops[pos].is_active() {
            self.stops.remove(pos);
            debug!(stop = %key, "Deleted detached stop without narration");
            return Ok(());
        }
        let revision = self.next_revision();
        let stop = &mut self.stops[pos];
        stop.narration_url = None;
        stop.revision = revision;
        Ok(())
    }

    /// Set or clear a stop's authored dwell time.
    pub fn set_duration(&mut self, key: &StopKey, duration_ms: Option<u64>) -> Result<()> {
        let pos = self.position_of(key)?;
        let revision = self.next_revision();
        let stop = &mut self.stops[pos];
        stop.duration_ms = duration_ms.filter(|d| *d > 0);
        stop.revision = revision;
        Ok(())
    }

    // ── Integrity ───────────────────────────────────────────────

    /// Whether active indices are exactly `0..n`.
    pub fn check_integrity(&self) -> bool {
        let mut indices: Vec<i32> = self
            .stops
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.sequence_index)
            .collect();
        indices.sort_unstable();
        indices.iter().enumerate().all(|(i, idx)| *idx == i as i32)
    }

    /// Renumber if indices have gaps or duplicates. Returns whether a repair
    /// was needed.
    pub fn repair(&mut self) -> bool {
        if self.check_integrity() {
            return false;
        }
        warn!(stops = self.active_len(), "Tour indices out of sequence, renumbering");
        self.renumber();
        true
    }

    /// Assign `0..n` to active stops, keeping relative order. On equal
    /// indices the most recently written stop goes first.
    fn renumber(&mut self) {
        let mut order: Vec<(i32, std::cmp::Reverse<u64>, usize)> = self
            .stops
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_active())
            .map(|(i, s)| (s.sequence_index, std::cmp::Reverse(s.revision), i))
            .collect();
        order.sort();
        for (index, (_, _, pos)) in order.into_iter().enumerate() {
            self.stops[pos].sequence_index = index as i32;
        }
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    // ── Persistence ─────────────────────────────────────────────

    /// Reconcile the edit buffer with `persisted` records.
    ///
    /// Stops are matched to records by key. Matched stops keep their record
    /// id, stops without a record get a new one, records with no stop left
    /// are dropped. Detached stops are kept with index -1.
    pub fn commit(&mut self, persisted: &[TourMarkerRecord]) -> Vec<TourMarkerRecord> {
        self.repair();
        let mut ordered: Vec<usize> = (0..self.stops.len()).collect();
        ordered.sort_by_key(|&i| {
            let s = &self.stops[i];
            (!s.is_active(), s.sequence_index)
        });

        let mut records = Vec::with_capacity(self.stops.len());
        for i in ordered {
            let stop = &mut self.stops[i];
            let existing = persisted
                .iter()
                .find(|r| r.key().as_ref() == Some(&stop.key))
                .map(|r| r.id.clone());
            let id = existing
                .or_else(|| stop.record_id.clone())
                .unwrap_or_else(|| match &stop.key {
                    StopKey::Marker(id) => id.clone(),
                    StopKey::Image(_) => Uuid::new_v4().to_string(),
                });
            stop.record_id = Some(id.clone());
            records.push(TourMarkerRecord::from_stop(stop, id));
        }

        let dropped = persisted
            .iter()
            .filter(|r| !records.iter().any(|n| n.id == r.id))
            .count();
        debug!(records = records.len(), dropped, "Reconciled tour markers");
        records
    }
}
