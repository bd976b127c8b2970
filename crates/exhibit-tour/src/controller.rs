//! Tour authoring and playback against the shared audio engine.
//!
//! The controller owns the edit buffer and the playback session. Camera and
//! UI side effects go out through [`CameraDirector`] and [`TourListener`];
//! narration goes through the [`AudioEngine`] under a single track id, so
//! starting a stop's narration always tears the previous one down first.

use exhibit_audio::{AudioEngine, DurationProbe, PlayOptions, ProbeStatus};
use exhibit_core::{Clock, ExhibitError, Pose, Result, TourConfig, Vec3};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::collaborators::{CameraDirector, InterruptReason, TourListener};
use crate::marker::TourMarkerRecord;
use crate::playback::{self, DurationRule, PlaybackCursor, PlaybackPlan, TourEffect};
use crate::sequence::TourSequence;
use crate::stop::{StopKey, TourStop};
use crate::store::TourStore;

/// Audio track id used for stop narration.
pub const NARRATION_TRACK_ID: &str = "tour-narration";

struct PendingProbe {
    session: u64,
    index: usize,
    probe: DurationProbe,
}

/// Authoring and playback of one gallery's guided tour.
pub struct TourController {
    sequence: TourSequence,
    persisted: Vec<TourMarkerRecord>,
    audio: Arc<Mutex<AudioEngine>>,
    camera: Box<dyn CameraDirector>,
    listener: Box<dyn TourListener>,
    store: Box<dyn TourStore>,
    clock: Arc<dyn Clock>,
    config: TourConfig,
    plan: PlaybackPlan,
    cursor: Option<PlaybackCursor>,
    probes: Vec<PendingProbe>,
    session: u64,
}

impl TourController {
    /// Create a controller and load the persisted tour from `store`.
    pub fn new(
        audio: Arc<Mutex<AudioEngine>>,
        camera: Box<dyn CameraDirector>,
        listener: Box<dyn TourListener>,
        store: Box<dyn TourStore>,
        clock: Arc<dyn Clock>,
        config: TourConfig,
    ) -> Result<Self> {
        let persisted = store.load()?;
        let sequence = TourSequence::load(&persisted);
        info!(
            stops = sequence.active_len(),
            markers = persisted.len(),
            "Tour loaded"
        );
        Ok(Self {
            sequence,
            persisted,
            audio,
            camera,
            listener,
            store,
            clock,
            config,
            plan: PlaybackPlan::default(),
            cursor: None,
            probes: Vec::new(),
            session: 0,
        })
    }

    // ── Authoring ───────────────────────────────────────────────

    pub fn add_image_stop(
        &mut self,
        image_id: &str,
        anchor_position: Vec3,
        facing_direction: Vec3,
    ) -> StopKey {
        self.sequence
            .add_image_stop(image_id, anchor_position, facing_direction)
    }

    pub fn add_camera_stop(&mut self, pose: Pose) -> StopKey {
        self.sequence.add_camera_stop(pose)
    }

    pub fn remove_stop(&mut self, key: &StopKey) -> Result<()> {
        self.sequence.remove_stop(key)
    }

    pub fn reorder_stop(&mut self, key: &StopKey, new_position: usize) -> Result<()> {
        self.sequence.reorder_stop(key, new_position)
    }

    pub fn set_narration(&mut self, key: &StopKey, url: &str) -> Result<()> {
        self.sequence.set_narration(key, url)
    }

    pub fn clear_narration(&mut self, key: &StopKey) -> Result<()> {
        self.sequence.clear_narration(key)
    }

    pub fn set_duration(&mut self, key: &StopKey, duration_ms: Option<u64>) -> Result<()> {
        self.sequence.set_duration(key, duration_ms)
    }

    /// Reconcile the edit buffer with the persisted markers and save them.
    pub fn commit(&mut self) -> Result<Vec<TourMarkerRecord>> {
        let records = self.sequence.commit(&self.persisted);
        self.store.save(&records)?;
        info!(markers = records.len(), "Tour committed");
        self.persisted = records.clone();
        Ok(records)
    }

    /// Jump the camera to a stop without starting playback.
    pub fn preview_stop(&mut self, key: &StopKey) -> Result<()> {
        let stop = self
            .sequence
            .get(key)
            .ok_or_else(|| ExhibitError::UnknownStop(key.to_string()))?;
        let (position, look_at) = stop.camera_target();
        self.camera.request_immediate_camera_move(position, look_at);
        Ok(())
    }

    // ── Playback ────────────────────────────────────────────────

    /// Start the tour from its first stop. Returns `false` when there is
    /// nothing to play.
    pub fn start_playback(&mut self) -> bool {
        self.end_session();
        self.sequence.repair();
        let rule = DurationRule::from_config(&self.config);
        self.plan = PlaybackPlan::from_stops(self.sequence.active_stops(), rule);

        let now = self.clock.now_ms();
        let Some((cursor, effects)) = playback::begin(&self.plan, now, self.session) else {
            info!("Tour has no stops, nothing to play");
            return false;
        };
        self.measure_narrations();
        self.cursor = Some(cursor);
        info!(stops = self.plan.len(), session = self.session, "Tour playback started");
        self.apply(effects);
        true
    }

    /// Freeze the stop clock and pause narration in place.
    pub fn pause_playback(&mut self) {
        let now = self.clock.now_ms();
        let Some(cursor) = self.cursor.as_mut().filter(|c| c.is_playing && !c.is_paused()) else {
            return;
        };
        cursor.pause(now);
        self.audio.lock().pause_track(NARRATION_TRACK_ID);
        debug!(stop = cursor.current_stop_index, "Tour paused");
    }

    /// Continue the stop clock and narration from where they paused.
    pub fn resume_playback(&mut self) {
        let now = self.clock.now_ms();
        let Some(cursor) = self.cursor.as_mut().filter(|c| c.is_paused()) else {
            return;
        };
        cursor.resume(now);
        self.audio.lock().resume_track(NARRATION_TRACK_ID);
        debug!(stop = cursor.current_stop_index, "Tour resumed");
    }

    /// Move to the next stop if the current one has run its course.
    ///
    /// Call from the host's periodic timer.
    pub fn advance_if_due(&mut self, now_ms: u64) {
        self.poll_probes();
        let Some(cursor) = self.cursor else {
            return;
        };
        let (next, effects) = playback::step(&self.plan, cursor, now_ms);
        if next.current_stop_index != cursor.current_stop_index {
            debug!(
                from = cursor.current_stop_index,
                to = next.current_stop_index,
                "Advancing tour"
            );
        }
        self.cursor = Some(next);
        self.apply(effects);
        if !next.is_playing {
            info!(session = next.session, "Tour completed");
            self.cursor = None;
        }
    }

    /// [`advance_if_due`](Self::advance_if_due) at the controller's clock.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        self.advance_if_due(now);
    }

    /// Cut playback short: silence narration, drop the cursor, tell the UI.
    pub fn interrupt(&mut self, reason: InterruptReason) {
        if self.cursor.is_none() {
            return;
        }
        info!(%reason, "Tour interrupted");
        self.end_session();
        self.listener.on_interrupted(reason);
    }

    /// Forwarded by the camera layer when the visitor takes control.
    pub fn on_user_input_detected(&mut self) {
        self.interrupt(InterruptReason::UserInput);
    }

    pub fn stop_playback(&mut self) {
        self.interrupt(InterruptReason::Stopped);
    }

    /// Overall completion in percent, 0 when not playing.
    pub fn compute_overall_progress(&self) -> f32 {
        let now = self.clock.now_ms();
        self.cursor
            .map(|c| playback::progress(&self.plan, &c, now))
            .unwrap_or(0.0)
    }

    // ── Snapshots ───────────────────────────────────────────────

    pub fn sequence(&self) -> &TourSequence {
        &self.sequence
    }

    pub fn persisted(&self) -> &[TourMarkerRecord] {
        &self.persisted
    }

    pub fn plan(&self) -> &PlaybackPlan {
        &self.plan
    }

    pub fn cursor(&self) -> Option<PlaybackCursor> {
        self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.cursor.map(|c| c.is_playing).unwrap_or(false)
    }

    pub fn is_paused(&self) -> bool {
        self.cursor.map(|c| c.is_paused()).unwrap_or(false)
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// The stop currently being shown.
    pub fn current_stop(&self) -> Option<&TourStop> {
        let cursor = self.cursor?;
        self.plan.stops.get(cursor.current_stop_index).map(|s| &s.stop)
    }

    // ── Internals ───────────────────────────────────────────────

    /// Invalidate the running session, if any. Late probe results for it
    /// are discarded.
    fn end_session(&mut self) {
        if self.cursor.take().is_some() {
            self.audio.lock().stop_track(NARRATION_TRACK_ID, 0);
        }
        self.session += 1;
    }

    fn measure_narrations(&mut self) {
        let mut audio = self.audio.lock();
        for (index, stop) in self.plan.stops.iter().enumerate() {
            if let Some(url) = &stop.narration_url {
                let probe = audio.measure_duration_ms(url);
                self.probes.push(PendingProbe {
                    session: self.session,
                    index,
                    probe,
                });
            }
        }
        drop(audio);
        self.poll_probes();
    }

    fn poll_probes(&mut self) {
        let session = self.session;
        let mut resolved = Vec::new();
        self.probes.retain_mut(|pending| match pending.probe.poll() {
            ProbeStatus::Pending => true,
            ProbeStatus::Ready(measured) => {
                if pending.session == session {
                    resolved.push((pending.index, measured));
                } else {
                    debug!(
                        url = %pending.probe.url(),
                        session = pending.session,
                        "Discarding narration length from an ended session"
                    );
                }
                false
            }
        });
        for (index, measured) in resolved {
            if measured.is_none() {
                warn!(stop = index, "Narration length unknown, using fallback duration");
            }
            self.plan.set_narration_ms(index, measured);
        }
    }

    fn apply(&mut self, effects: Vec<TourEffect>) {
        for effect in effects {
            match effect {
                TourEffect::StopNarration => {
                    self.audio
                        .lock()
                        .stop_track(NARRATION_TRACK_ID, self.config.narration_fade_ms);
                }
                TourEffect::MoveCamera {
                    index,
                    position,
                    look_at,
                } => {
                    debug!(stop = index, "Moving camera");
                    self.camera.request_camera_move(position, look_at);
                }
                TourEffect::PlayNarration { index, url } => {
                    let handle = self.audio.lock().play_track(
                        NARRATION_TRACK_ID,
                        &url,
                        PlayOptions::default(),
                    );
                    if !handle.is_valid() {
                        warn!(stop = index, url = %url, "Narration unavailable, continuing silently");
                        self.plan.set_narration_ms(index, None);
                    }
                }
                TourEffect::StopChanged { index } => {
                    if let Some(planned) = self.plan.stops.get(index) {
                        self.listener.on_stop_changed(&planned.stop);
                    }
                }
                TourEffect::Progress(percent) => self.listener.on_tour_progress(percent),
                TourEffect::Completed => self.listener.on_tour_completed(),
            }
        }
    }
}
