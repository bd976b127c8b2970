//! Tour playback as a pure function of plan, cursor and time.
//!
//! [`step`] never touches audio, camera or timers. It returns the new
//! cursor and a list of [`TourEffect`]s for the controller to apply, so the
//! whole clock can be exercised with plain numbers.

use exhibit_core::{TourConfig, Vec3};

use crate::stop::TourStop;

/// Picks how long a stop lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationRule {
    pub default_ms: u64,
    /// Narration shorter than this does not override the authored duration.
    pub min_narration_ms: u64,
}

impl DurationRule {
    pub fn from_config(config: &TourConfig) -> Self {
        Self {
            default_ms: config.default_stop_duration_ms,
            min_narration_ms: config.min_narration_ms,
        }
    }

    /// Narration length when long enough, else the authored duration, else
    /// the default.
    pub fn resolve(&self, authored_ms: Option<u64>, narration_ms: Option<u64>) -> u64 {
        match narration_ms {
            Some(ms) if ms >= self.min_narration_ms => ms,
            _ => authored_ms.filter(|d| *d > 0).unwrap_or(self.default_ms),
        }
    }
}

impl Default for DurationRule {
    fn default() -> Self {
        Self::from_config(&TourConfig::default())
    }
}

/// What is known about a stop's narration length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationLength {
    /// The stop has no narration.
    Absent,
    /// A measurement is in flight.
    Pending,
    Known(u64),
    /// Measurement or playback failed.
    Unknown,
}

impl NarrationLength {
    fn known(self) -> Option<u64> {
        match self {
            NarrationLength::Known(ms) => Some(ms),
            _ => None,
        }
    }
}

/// One stop as seen by playback.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStop {
    /// The stop as it was when playback started.
    pub stop: TourStop,
    pub position: Vec3,
    pub look_at: Vec3,
    pub narration_url: Option<String>,
    pub authored_ms: Option<u64>,
    pub narration: NarrationLength,
}

impl PlanStop {
    pub fn from_stop(stop: &TourStop) -> Self {
        let (position, look_at) = stop.camera_target();
        let narration = if stop.has_narration() {
            NarrationLength::Pending
        } else {
            NarrationLength::Absent
        };
        Self {
            stop: stop.clone(),
            position,
            look_at,
            narration_url: stop.narration_url.clone(),
            authored_ms: stop.duration_ms,
            narration,
        }
    }
}

/// Snapshot of the active stops taken when playback starts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackPlan {
    pub stops: Vec<PlanStop>,
    pub rule: DurationRule,
}

impl PlaybackPlan {
    /// Build a plan from stops already in playback order.
    pub fn from_stops<'a>(stops: impl IntoIterator<Item = &'a TourStop>, rule: DurationRule) -> Self {
        Self {
            stops: stops.into_iter().map(PlanStop::from_stop).collect(),
            rule,
        }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Dwell time of stop `index`. Zero past the end.
    pub fn duration_ms(&self, index: usize) -> u64 {
        self.stops
            .get(index)
            .map(|s| self.rule.resolve(s.authored_ms, s.narration.known()))
            .unwrap_or(0)
    }

    pub fn total_ms(&self) -> u64 {
        (0..self.stops.len()).map(|i| self.duration_ms(i)).sum()
    }

    /// Record the outcome of a narration measurement for stop `index`.
    pub fn set_narration_ms(&mut self, index: usize, measured: Option<u64>) {
        if let Some(stop) = self.stops.get_mut(index) {
            stop.narration = match measured {
                Some(ms) => NarrationLength::Known(ms),
                None => NarrationLength::Unknown,
            };
        }
    }

    /// Whether stop `index` still waits on a narration measurement.
    pub fn is_measuring(&self, index: usize) -> bool {
        self.stops
            .get(index)
            .map(|s| s.narration == NarrationLength::Pending)
            .unwrap_or(false)
    }
}

/// Runtime position within a playing tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCursor {
    pub current_stop_index: usize,
    pub stop_started_at_ms: u64,
    pub paused_at_ms: Option<u64>,
    pub is_playing: bool,
    /// Playback session this cursor belongs to.
    pub session: u64,
}

impl PlaybackCursor {
    /// Time spent at the current stop, excluding pauses.
    pub fn elapsed(&self, now_ms: u64) -> u64 {
        let until = self.paused_at_ms.unwrap_or(now_ms);
        until.saturating_sub(self.stop_started_at_ms)
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at_ms.is_some()
    }

    pub fn pause(&mut self, now_ms: u64) {
        if self.is_playing && self.paused_at_ms.is_none() {
            self.paused_at_ms = Some(now_ms);
        }
    }

    /// Continue the stop clock, shifting its start by the paused span.
    pub fn resume(&mut self, now_ms: u64) {
        if let Some(paused_at) = self.paused_at_ms.take() {
            self.stop_started_at_ms += now_ms.saturating_sub(paused_at);
        }
    }
}

/// Side effect requested by a playback transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TourEffect {
    /// Stop the narration of the stop being left.
    StopNarration,
    MoveCamera {
        index: usize,
        position: Vec3,
        look_at: Vec3,
    },
    PlayNarration {
        index: usize,
        url: String,
    },
    StopChanged {
        index: usize,
    },
    Progress(f32),
    Completed,
}

/// Start a session at stop 0. `None` for an empty plan.
pub fn begin(
    plan: &PlaybackPlan,
    now_ms: u64,
    session: u64,
) -> Option<(PlaybackCursor, Vec<TourEffect>)> {
    if plan.is_empty() {
        return None;
    }
    let cursor = PlaybackCursor {
        current_stop_index: 0,
        stop_started_at_ms: now_ms,
        paused_at_ms: None,
        is_playing: true,
        session,
    };
    let mut effects = vec![TourEffect::StopNarration];
    enter_stop(plan, 0, &mut effects);
    effects.push(TourEffect::Progress(0.0));
    Some((cursor, effects))
}

/// Advance the tour if the current stop has run its course.
///
/// A stop is left once its elapsed time is strictly greater than its
/// duration, and never while its narration length is still being measured.
/// Past the last stop the cursor stops playing and `Completed` is emitted.
pub fn step(
    plan: &PlaybackPlan,
    cursor: PlaybackCursor,
    now_ms: u64,
) -> (PlaybackCursor, Vec<TourEffect>) {
    if !cursor.is_playing || cursor.is_paused() {
        return (cursor, Vec::new());
    }
    let index = cursor.current_stop_index;
    let elapsed = cursor.elapsed(now_ms);
    let due = elapsed > plan.duration_ms(index) && !plan.is_measuring(index);
    if !due {
        return (cursor, vec![TourEffect::Progress(progress(plan, &cursor, now_ms))]);
    }

    let mut effects = vec![TourEffect::StopNarration];
    let next = index + 1;
    if next >= plan.len() {
        let done = PlaybackCursor {
            is_playing: false,
            ..cursor
        };
        effects.push(TourEffect::Progress(100.0));
        effects.push(TourEffect::Completed);
        return (done, effects);
    }

    let moved = PlaybackCursor {
        current_stop_index: next,
        stop_started_at_ms: now_ms,
        ..cursor
    };
    enter_stop(plan, next, &mut effects);
    effects.push(TourEffect::Progress(progress(plan, &moved, now_ms)));
    (moved, effects)
}

fn enter_stop(plan: &PlaybackPlan, index: usize, effects: &mut Vec<TourEffect>) {
    let stop = &plan.stops[index];
    // camera first, narration right after it
    effects.push(TourEffect::MoveCamera {
        index,
        position: stop.position,
        look_at: stop.look_at,
    });
    if let Some(url) = &stop.narration_url {
        effects.push(TourEffect::PlayNarration {
            index,
            url: url.clone(),
        });
    }
    effects.push(TourEffect::StopChanged { index });
}

/// Overall completion in percent: finished stops plus time at the current
/// one, over the sum of all stop durations.
pub fn progress(plan: &PlaybackPlan, cursor: &PlaybackCursor, now_ms: u64) -> f32 {
    let total = plan.total_ms();
    if total == 0 {
        return 0.0;
    }
    let index = cursor.current_stop_index.min(plan.len());
    let before: u64 = (0..index).map(|i| plan.duration_ms(i)).sum();
    let current = cursor.elapsed(now_ms).min(plan.duration_ms(index));
    ((before + current) as f64 / total as f64 * 100.0) as f32
}
