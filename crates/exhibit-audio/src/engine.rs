//! The audio engine: one output graph, gesture unlock, named tracks.
//!
//! Construct once per rendering surface and [`dispose`](AudioEngine::dispose)
//! at teardown. Every control call is infallible from the caller's point of
//! view: platform rejections are logged and degrade to silence.
//!
//! The engine never sleeps. Delayed work (resume retries, the background
//! gain correction, fade-out teardown) is queued against the injected clock
//! and executed by [`tick`](AudioEngine::tick).

use exhibit_core::{AudioConfig, Clock, GestureKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::backend::{AudioBackend, ContextState};
use crate::error::{AudioError, AudioResult};
use crate::mixer::Mixer;
use crate::probe::{DurationCache, DurationProbe};
use crate::track::{
    AudioTrack, PlayOptions, TrackHandle, TrackSnapshot, TrackState, BACKGROUND_TRACK_ID,
};
use crate::unlock::{OneShot, UnlockState};

#[derive(Debug, Clone, PartialEq)]
enum Task {
    RetryResume,
    ReapplyGain { id: String, generation: u64 },
    FinishStop { id: String, generation: u64 },
}

#[derive(Debug, Clone)]
struct Scheduled {
    due_ms: u64,
    task: Task,
}

/// Shared audio output with named, independently controlled tracks.
pub struct AudioEngine {
    backend: Box<dyn AudioBackend>,
    clock: Arc<dyn Clock>,
    config: AudioConfig,
    context: ContextState,
    unlock: UnlockState,
    gesture: OneShot<GestureKind>,
    unlocked_once: bool,
    hidden: bool,
    mixer: Mixer,
    tracks: HashMap<String, AudioTrack>,
    positions: HashMap<String, f64>,
    scheduled: Vec<Scheduled>,
    resume_attempts: u32,
    retry_pending: bool,
    durations: DurationCache,
    next_generation: u64,
}

impl AudioEngine {
    /// Create an engine over `backend`. Nothing touches the platform until
    /// the first [`ensure_unlocked`](Self::ensure_unlocked) or play call.
    pub fn new(backend: Box<dyn AudioBackend>, clock: Arc<dyn Clock>, config: AudioConfig) -> Self {
        info!("Initializing audio engine");
        let mixer = Mixer::new(config.master_volume, config.balance_floor);
        Self {
            backend,
            clock,
            config,
            context: ContextState::Uninitialized,
            unlock: UnlockState::Locked,
            gesture: OneShot::new(),
            unlocked_once: false,
            hidden: false,
            mixer,
            tracks: HashMap::new(),
            positions: HashMap::new(),
            scheduled: Vec::new(),
            resume_attempts: 0,
            retry_pending: false,
            durations: Arc::new(Mutex::new(HashMap::new())),
            next_generation: 1,
        }
    }

    // ── Unlock ──────────────────────────────────────────────────

    /// Make sure the platform will let audio play, now or on the next gesture.
    ///
    /// Idempotent: gesture listeners are registered at most once.
    pub fn ensure_unlocked(&mut self) {
        if self.is_closed() || self.unlock == UnlockState::Unlocked {
            return;
        }
        if self.context == ContextState::Uninitialized {
            if let Err(e) = self.backend.create_context() {
                warn!(error = %e, "Audio context unavailable, staying silent");
                return;
            }
            self.context = if self.backend.context_running() {
                ContextState::Running
            } else {
                ContextState::Suspended
            };
            debug!(state = ?self.context, "Audio context created");
        }

        if !self.backend.requires_gesture() {
            self.complete_unlock();
            return;
        }

        if self.gesture.subscribe(&self.config.unlock_gestures) {
            match self.backend.add_gesture_listeners(&self.config.unlock_gestures) {
                Ok(()) => {
                    self.unlock = UnlockState::AwaitingGesture;
                    info!("Audio locked, waiting for a user gesture");
                }
                Err(e) => {
                    warn!(error = %e, "Could not listen for unlock gestures");
                    self.gesture.cancel();
                }
            }
        }
    }

    /// Feed a host input event. The first matching gesture unlocks audio.
    pub fn on_user_gesture(&mut self, kind: GestureKind) {
        if self.is_closed() || !self.gesture.matches(kind) {
            return;
        }
        if self.complete_unlock() {
            info!(gesture = ?kind, "Audio unlocked");
        }
    }

    fn complete_unlock(&mut self) -> bool {
        if let Err(e) = self.backend.resume_context() {
            warn!(error = %e, "Resuming audio output failed, still locked");
            return false;
        }
        if let Err(e) = self.backend.play_silent_buffer() {
            debug!(error = %e, "Silent warm-up buffer failed");
        }
        self.unlock = UnlockState::Unlocked;
        self.unlocked_once = true;
        if let Some(kinds) = self.gesture.complete() {
            self.backend.remove_gesture_listeners(&kinds);
        }
        self.backend.set_master_gain(self.mixer.master_volume, 0);
        self.on_context_running();
        true
    }

    // ── Context resume with retries ─────────────────────────────

    fn try_resume(&mut self) {
        if self.is_closed() || self.hidden || self.unlock != UnlockState::Unlocked {
            return;
        }
        if self.context == ContextState::Running && self.backend.context_running() {
            return;
        }
        match self.backend.resume_context() {
            Ok(()) => {
                debug!(attempts = self.resume_attempts, "Audio output resumed");
                self.on_context_running();
            }
            Err(e) => {
                self.context = ContextState::Suspended;
                self.resume_attempts += 1;
                warn!(attempt = self.resume_attempts, error = %e, "Audio output resume failed");
                self.schedule_resume_retry();
            }
        }
    }

    fn schedule_resume_retry(&mut self) {
        if self.retry_pending {
            return;
        }
        let policy = self.config.resume_retry;
        if policy.should_retry(self.resume_attempts) {
            let delay = policy.delay_for(self.resume_attempts);
            self.schedule(delay, Task::RetryResume);
            self.retry_pending = true;
        } else {
            error!(
                attempts = self.resume_attempts,
                waited_ms = policy.total_delay(),
                "Audio output could not be resumed, continuing without sound"
            );
            self.resume_attempts = 0;
        }
    }

    fn on_context_running(&mut self) {
        self.context = ContextState::Running;
        self.resume_attempts = 0;
        self.retry_pending = false;
        self.scheduled.retain(|s| s.task != Task::RetryResume);

        // Tracks that were playing when the platform dropped the graph.
        let stale: Vec<String> = self
            .tracks
            .values()
            .filter(|t| t.state == TrackState::Playing && !self.backend.is_connected(t.node))
            .map(|t| t.id.clone())
            .collect();
        for id in stale {
            let offset = self.positions.get(&id).copied().unwrap_or(0.0);
            if let Some(track) = self.tracks.get_mut(&id) {
                track.state = TrackState::Pending {
                    offset_secs: offset,
                };
            }
        }
        self.start_pending_tracks();
    }

    fn start_pending_tracks(&mut self) {
        if self.context != ContextState::Running {
            return;
        }
        let mut denied = false;
        let mut broken = Vec::new();
        for track in self.tracks.values_mut() {
            let TrackState::Pending { offset_secs } = track.state else {
                continue;
            };
            if !self.backend.is_connected(track.node) {
                warn!(track = %track.id, "Track graph disconnected, rebuilding");
                if let Err(e) = repair_node(self.backend.as_mut(), track) {
                    warn!(track = %track.id, error = %e, "Track could not be rebuilt");
                    broken.push(track.id.clone());
                    continue;
                }
            }
            match self.backend.start(track.node, offset_secs) {
                Ok(()) => {
                    track.state = TrackState::Playing;
                    debug!(track = %track.id, offset_secs, "Track started");
                }
                Err(AudioError::PlatformAudioDenied(reason)) => {
                    warn!(track = %track.id, %reason, "Playback denied");
                    denied = true;
                }
                Err(e) => {
                    warn!(track = %track.id, error = %e, "Playback start failed");
                    broken.push(track.id.clone());
                }
            }
        }
        for id in broken {
            self.teardown(&id);
        }
        self.rebalance();
        if denied && !self.backend.context_running() {
            self.context = ContextState::Suspended;
            self.resume_attempts += 1;
            self.schedule_resume_retry();
        }
    }

    // ── Track control ───────────────────────────────────────────

    /// Play `source_url` under `id`.
    ///
    /// Reusing an id with a different source tears the old track down first.
    /// Reusing it with the same source keeps the existing node. Failures are
    /// logged; the returned handle is invalid if the source could not load.
    pub fn play_track(&mut self, id: &str, source_url: &str, options: PlayOptions) -> TrackHandle {
        if self.is_closed() {
            return TrackHandle::invalid(id);
        }
        self.ensure_unlocked();
        self.try_resume();

        let volume = options.volume.clamp(0.0, 1.0);
        if let Some(existing) = self.tracks.get_mut(id) {
            if existing.source_url == source_url && existing.state != TrackState::Stopping {
                existing.gain_level = volume;
                existing.loop_enabled = options.looped;
                let handle = existing.handle();
                if let TrackState::Paused { position_secs } = existing.state {
                    existing.state = TrackState::Pending {
                        offset_secs: position_secs,
                    };
                    self.start_pending_tracks();
                } else {
                    self.rebalance();
                }
                return handle;
            }
            debug!(track = %id, "Replacing track source");
            self.teardown(id);
        }

        let node = match self.backend.create_source(source_url, options.looped) {
            Ok(node) => node,
            Err(e) => {
                warn!(track = %id, url = %source_url, error = %e, "Track could not be loaded");
                return TrackHandle::invalid(id);
            }
        };
        if let Err(e) = self.backend.connect(node) {
            warn!(track = %id, error = %e, "Track could not be connected");
            self.backend.release(node);
            return TrackHandle::invalid(id);
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        let track = AudioTrack {
            id: id.to_string(),
            source_url: source_url.to_string(),
            gain_level: volume,
            is_background_loop: id == BACKGROUND_TRACK_ID,
            loop_enabled: options.looped,
            node,
            state: TrackState::Pending { offset_secs: 0.0 },
            generation,
            effective_gain: 0.0,
            gain_applied: false,
            fade_in_ms: options.fade_in_ms,
        };
        let handle = track.handle();
        self.tracks.insert(id.to_string(), track);
        self.positions.insert(id.to_string(), 0.0);
        info!(track = %id, url = %source_url, volume, looped = options.looped, "Playing track");

        if self.context == ContextState::Running {
            self.start_pending_tracks();
        }
        handle
    }

    /// Loop `source_url` as the gallery's background track, replacing any
    /// previous one.
    pub fn play_background_loop(&mut self, source_url: &str, volume: f32) -> TrackHandle {
        let handle = self.play_track(
            BACKGROUND_TRACK_ID,
            source_url,
            PlayOptions::volume(volume).looped(),
        );
        if handle.is_valid() {
            // Some platforms zero the gain on first connect.
            self.schedule(
                self.config.background_gain_fix_ms,
                Task::ReapplyGain {
                    id: handle.id.clone(),
                    generation: handle.generation,
                },
            );
        }
        handle
    }

    /// Stop a track, ramping to silence over `fade_out_ms` first when non-zero.
    ///
    /// Unknown ids are ignored.
    pub fn stop_track(&mut self, id: &str, fade_out_ms: u64) {
        if self.is_closed() {
            return;
        }
        let Some(track) = self.tracks.get_mut(id) else {
            debug!(track = %id, "Stop for unknown track ignored");
            return;
        };
        if fade_out_ms > 0 && track.state == TrackState::Playing {
            self.backend.set_gain(track.node, 0.0, fade_out_ms);
            track.state = TrackState::Stopping;
            let task = Task::FinishStop {
                id: id.to_string(),
                generation: track.generation,
            };
            self.schedule(fade_out_ms, task);
            debug!(track = %id, fade_out_ms, "Fading out track");
        } else {
            self.teardown(id);
        }
        self.rebalance();
    }

    /// Pause a track, keeping its playback position.
    pub fn pause_track(&mut self, id: &str) {
        if self.is_closed() {
            return;
        }
        let Some(track) = self.tracks.get_mut(id) else {
            return;
        };
        let position_secs = match track.state {
            TrackState::Playing => self.backend.pause(track.node),
            TrackState::Pending { offset_secs } => offset_secs,
            _ => return,
        };
        track.state = TrackState::Paused { position_secs };
        self.positions.insert(id.to_string(), position_secs);
        debug!(track = %id, position_secs, "Track paused");
        self.rebalance();
    }

    /// Resume a paused track where it left off, rebuilding its graph
    /// connection if the platform discarded it.
    pub fn resume_track(&mut self, id: &str) {
        if self.is_closed() {
            return;
        }
        let Some(TrackState::Paused { position_secs }) = self.tracks.get(id).map(|t| t.state)
        else {
            return;
        };
        self.ensure_unlocked();
        self.try_resume();
        if let Some(track) = self.tracks.get_mut(id) {
            track.state = TrackState::Pending {
                offset_secs: position_secs,
            };
        }
        self.start_pending_tracks();
    }

    /// Set a track's logical volume.
    pub fn set_track_volume(&mut self, id: &str, level: f32, ramp_ms: u64) {
        if self.is_closed() {
            return;
        }
        let active = self.active_track_count();
        let Some(track) = self.tracks.get_mut(id) else {
            debug!(track = %id, "Volume for unknown track ignored");
            return;
        };
        track.gain_level = level.clamp(0.0, 1.0);
        if track.is_audible() {
            let target = self.mixer.effective_gain(track.gain_level, active);
            self.backend.set_gain(track.node, target, ramp_ms);
            track.effective_gain = target;
        }
    }

    /// Set the master volume. Ignored until audio has been unlocked once.
    pub fn set_master_volume(&mut self, level: f32, ramp_ms: u64) {
        if self.is_closed() {
            return;
        }
        if !self.unlocked_once {
            debug!("Master volume ignored before unlock");
            return;
        }
        self.mixer.master_volume = level.clamp(0.0, 1.0);
        self.backend.set_master_gain(self.mixer.master_volume, ramp_ms);
    }

    /// Start measuring the duration of `source_url`.
    pub fn measure_duration_ms(&mut self, source_url: &str) -> DurationProbe {
        if let Some(cached) = self.durations.lock().get(source_url).copied() {
            return DurationProbe::ready(source_url, cached, Arc::clone(&self.clock));
        }
        if self.is_closed() {
            return DurationProbe::ready(source_url, None, Arc::clone(&self.clock));
        }
        let rx = self.backend.probe_duration(source_url);
        DurationProbe::pending(
            source_url,
            rx,
            self.config.probe_timeout_ms,
            Arc::clone(&self.clock),
            Arc::clone(&self.durations),
        )
    }

    /// Previously measured duration, if any probe completed for `source_url`.
    pub fn cached_duration_ms(&self, source_url: &str) -> Option<u64> {
        self.durations.lock().get(source_url).copied().flatten()
    }

    /// Recompute every audible track's effective gain for the current
    /// number of concurrently playing tracks.
    pub fn auto_balance(&mut self) {
        self.rebalance();
    }

    fn rebalance(&mut self) {
        let active = self.active_track_count();
        for track in self.tracks.values_mut().filter(|t| t.is_audible()) {
            let target = self.mixer.effective_gain(track.gain_level, active);
            let fade = std::mem::take(&mut track.fade_in_ms);
            if fade > 0 {
                self.backend.set_gain(track.node, 0.0, 0);
                self.backend.set_gain(track.node, target, fade);
            } else if !track.gain_applied || (target - track.effective_gain).abs() > f32::EPSILON {
                self.backend.set_gain(track.node, target, 0);
            }
            track.effective_gain = target;
            track.gain_applied = true;
        }
    }

    // ── Host callbacks ──────────────────────────────────────────

    /// The host tab or window became visible or hidden.
    pub fn on_visibility_changed(&mut self, visible: bool) {
        if self.is_closed() {
            return;
        }
        self.hidden = !visible;
        if visible {
            self.try_resume();
        } else if self.context == ContextState::Running {
            if let Err(e) = self.backend.suspend_context() {
                debug!(error = %e, "Suspend while hidden failed");
            }
            self.context = ContextState::Suspended;
            info!("Audio output suspended while hidden");
        }
    }

    /// Run due scheduled work and reconcile with the platform.
    ///
    /// Call from the host's periodic timer.
    pub fn tick(&mut self) {
        if self.is_closed() {
            return;
        }
        if self.context == ContextState::Running && !self.backend.context_running() {
            warn!("Audio output suspended by the platform");
            self.context = ContextState::Suspended;
            self.try_resume();
        }

        let mut ended = Vec::new();
        for track in self.tracks.values() {
            if track.state != TrackState::Playing {
                continue;
            }
            if !track.loop_enabled && self.backend.is_ended(track.node) {
                ended.push(track.id.clone());
            } else if let Some(pos) = self.backend.position(track.node) {
                self.positions.insert(track.id.clone(), pos);
            }
        }
        if !ended.is_empty() {
            for id in &ended {
                debug!(track = %id, "Track finished");
                self.teardown(id);
            }
            self.rebalance();
        }

        let now = self.clock.now_ms();
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scheduled)
            .into_iter()
            .partition(|s| s.due_ms <= now);
        self.scheduled = later;
        for scheduled in due {
            self.run_task(scheduled.task);
        }
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::RetryResume => {
                self.retry_pending = false;
                self.try_resume();
            }
            Task::ReapplyGain { id, generation } => {
                let Some((node, gain, state)) = self
                    .tracks
                    .get(&id)
                    .filter(|t| t.generation == generation)
                    .map(|t| (t.node, t.effective_gain, t.state))
                else {
                    return;
                };
                match state {
                    TrackState::Playing => {
                        self.backend.set_gain(node, gain, 0);
                        debug!(track = %id, gain, "Re-applied track gain");
                    }
                    TrackState::Pending { .. } => {
                        let delay = self.config.background_gain_fix_ms;
                        self.schedule(delay, Task::ReapplyGain { id, generation });
                    }
                    _ => {}
                }
            }
            Task::FinishStop { id, generation } => {
                let finished = self
                    .tracks
                    .get(&id)
                    .map(|t| t.generation == generation && t.state == TrackState::Stopping)
                    .unwrap_or(false);
                if finished {
                    self.teardown(&id);
                    self.rebalance();
                }
            }
        }
    }

    fn schedule(&mut self, delay_ms: u64, task: Task) {
        let due_ms = self.clock.now_ms() + delay_ms;
        self.scheduled.push(Scheduled { due_ms, task });
    }

    fn teardown(&mut self, id: &str) {
        if let Some(track) = self.tracks.remove(id) {
            self.backend.disconnect(track.node);
            self.backend.release(track.node);
            self.positions.remove(id);
            debug!(track = %id, "Track torn down");
        }
    }

    /// Stop every track, drop listeners and close the output. Terminal.
    pub fn dispose(&mut self) {
        if self.is_closed() {
            return;
        }
        info!(tracks = self.tracks.len(), "Disposing audio engine");
        let ids: Vec<String> = self.tracks.keys().cloned().collect();
        for id in ids {
            self.teardown(&id);
        }
        if let Some(kinds) = self.gesture.cancel() {
            self.backend.remove_gesture_listeners(&kinds);
        }
        self.scheduled.clear();
        if self.context != ContextState::Uninitialized {
            self.backend.close_context();
        }
        self.context = ContextState::Closed;
    }

    // ── Snapshots ───────────────────────────────────────────────

    pub fn context_state(&self) -> ContextState {
        self.context
    }

    pub fn unlock_state(&self) -> UnlockState {
        self.unlock
    }

    pub fn is_closed(&self) -> bool {
        self.context == ContextState::Closed
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn master_volume(&self) -> f32 {
        self.mixer.master_volume
    }

    /// Whether `id` is currently producing sound.
    pub fn is_track_playing(&self, id: &str) -> bool {
        self.context == ContextState::Running
            && self
                .tracks
                .get(id)
                .map(|t| t.state == TrackState::Playing)
                .unwrap_or(false)
    }

    /// Whether `handle` still refers to the live track under its id.
    pub fn is_current(&self, handle: &TrackHandle) -> bool {
        self.tracks
            .get(&handle.id)
            .map(|t| t.generation == handle.generation)
            .unwrap_or(false)
    }

    /// Number of tracks counted by the auto-balance.
    pub fn active_track_count(&self) -> usize {
        self.tracks.values().filter(|t| t.is_audible()).count()
    }

    /// Gain last pushed to the output for `id`.
    pub fn effective_gain(&self, id: &str) -> Option<f32> {
        self.tracks.get(id).map(|t| t.effective_gain)
    }

    /// Ids of every known track, sorted.
    pub fn track_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tracks.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn track_snapshot(&self, id: &str) -> Option<TrackSnapshot> {
        let track = self.tracks.get(id)?;
        let position = match track.state {
            TrackState::Playing => self
                .backend
                .position(track.node)
                .or_else(|| self.positions.get(id).copied())
                .unwrap_or(0.0),
            TrackState::Paused { position_secs } => position_secs,
            TrackState::Pending { offset_secs } => offset_secs,
            TrackState::Stopping => self.positions.get(id).copied().unwrap_or(0.0),
        };
        Some(TrackSnapshot {
            id: track.id.clone(),
            source_url: track.source_url.clone(),
            gain_level: track.gain_level,
            effective_gain: track.effective_gain,
            is_background_loop: track.is_background_loop,
            loop_enabled: track.loop_enabled,
            state: track.state,
            playback_position_seconds: position,
            duration_seconds: self
                .cached_duration_ms(&track.source_url)
                .map(|ms| ms as f64 / 1000.0),
        })
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Replace a track's node with a freshly created and connected one.
fn repair_node(backend: &mut dyn AudioBackend, track: &mut AudioTrack) -> AudioResult<()> {
    backend.release(track.node);
    let node = backend.create_source(&track.source_url, track.loop_enabled)?;
    if let Err(e) = backend.connect(node) {
        backend.release(node);
        return Err(e);
    }
    backend.set_gain(node, track.effective_gain, 0);
    track.node = node;
    Ok(())
}
