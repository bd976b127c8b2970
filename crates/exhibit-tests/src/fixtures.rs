//! A gallery wired up for tests: manual clock, headless audio, recording
//! collaborators.

use exhibit_audio::{AudioEngine, HeadlessBackend};
use exhibit_core::{AudioConfig, Clock, ManualClock, TourConfig, Vec3};
use exhibit_tour::{
    CameraDirector, InterruptReason, MemoryStore, StopKey, TourController, TourListener,
    TourStop, TourStore,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CameraMove { position: Vec3, look_at: Vec3 },
    CameraJump { position: Vec3 },
    StopChanged(StopKey),
    Completed,
    Interrupted(InterruptReason),
}

/// Records camera requests and UI notifications in call order.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
    progress: Arc<Mutex<Vec<f32>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn last_progress(&self) -> Option<f32> {
        self.progress.lock().last().copied()
    }

    pub fn stops_shown(&self) -> Vec<StopKey> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::StopChanged(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| f(e)).count()
    }
}

impl CameraDirector for Recorder {
    fn request_camera_move(&mut self, position: Vec3, look_at: Vec3) {
        self.events
            .lock()
            .push(Event::CameraMove { position, look_at });
    }

    fn request_immediate_camera_move(&mut self, position: Vec3, _look_at: Vec3) {
        self.events.lock().push(Event::CameraJump { position });
    }
}

impl TourListener for Recorder {
    fn on_tour_progress(&mut self, percent: f32) {
        self.progress.lock().push(percent);
    }

    fn on_stop_changed(&mut self, stop: &TourStop) {
        self.events.lock().push(Event::StopChanged(stop.key.clone()));
    }

    fn on_tour_completed(&mut self) {
        self.events.lock().push(Event::Completed);
    }

    fn on_interrupted(&mut self, reason: InterruptReason) {
        self.events.lock().push(Event::Interrupted(reason));
    }
}

pub struct Gallery {
    pub clock: ManualClock,
    pub backend: HeadlessBackend,
    pub audio: Arc<Mutex<AudioEngine>>,
    pub recorder: Recorder,
    pub tour: TourController,
}

/// Narration assets every gallery knows: `(url, length_ms)`.
pub const ASSETS: &[(&str, u64)] = &[
    ("n/a.mp3", 6_000),
    ("n/b.mp3", 7_000),
    ("n/c.mp3", 5_500),
    ("n/short.mp3", 2_000),
    ("amb/loop.ogg", 30_000),
];

impl Gallery {
    /// A gallery on a platform without an autoplay gate.
    pub fn permissive() -> Self {
        let clock = ManualClock::new(0);
        let backend = HeadlessBackend::permissive(Arc::new(clock.clone()));
        Self::with_backend(clock, backend, Box::new(MemoryStore::new()), TourConfig::default())
    }

    /// A permissive gallery with custom tour settings.
    pub fn with_tour_config(config: TourConfig) -> Self {
        let clock = ManualClock::new(0);
        let backend = HeadlessBackend::permissive(Arc::new(clock.clone()));
        Self::with_backend(clock, backend, Box::new(MemoryStore::new()), config)
    }

    /// A gallery whose audio waits for a user gesture.
    pub fn gated() -> Self {
        let clock = ManualClock::new(0);
        let backend = HeadlessBackend::new(Arc::new(clock.clone()));
        Self::with_backend(clock, backend, Box::new(MemoryStore::new()), TourConfig::default())
    }

    pub fn with_store(store: Box<dyn TourStore>) -> Self {
        let clock = ManualClock::new(0);
        let backend = HeadlessBackend::permissive(Arc::new(clock.clone()));
        Self::with_backend(clock, backend, store, TourConfig::default())
    }

    fn with_backend(
        clock: ManualClock,
        backend: HeadlessBackend,
        store: Box<dyn TourStore>,
        config: TourConfig,
    ) -> Self {
        for (url, ms) in ASSETS {
            backend.add_asset(url, *ms);
        }
        let audio = Arc::new(Mutex::new(AudioEngine::new(
            Box::new(backend.clone()),
            Arc::new(clock.clone()),
            AudioConfig::default(),
        )));
        let recorder = Recorder::default();
        let tour = TourController::new(
            Arc::clone(&audio),
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
            store,
            Arc::new(clock.clone()),
            config,
        )
        .unwrap();
        Self {
            clock,
            backend,
            audio,
            recorder,
            tour,
        }
    }

    /// Add image stops at x = 0, 1, 2, ... with the given narrations.
    pub fn author(&mut self, stops: &[(&str, Option<&str>)]) -> Vec<StopKey> {
        stops
            .iter()
            .enumerate()
            .map(|(i, (image, narration))| {
                let key = self
                    .tour
                    .add_image_stop(image, anchor(i), Vec3::NEG_Z);
                if let Some(url) = narration {
                    self.tour.set_narration(&key, url).unwrap();
                }
                key
            })
            .collect()
    }

    /// Run the host timer at 100ms until `until_ms`.
    pub fn run_until(&mut self, until_ms: u64) {
        while self.clock.now_ms() < until_ms {
            self.clock.advance(100);
            self.audio.lock().tick();
            self.tour.tick();
        }
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn stop_index(&self) -> Option<usize> {
        self.tour.cursor().map(|c| c.current_stop_index)
    }
}

pub fn anchor(i: usize) -> Vec3 {
    Vec3::new(i as f32, 1.6, 0.0)
}

pub fn image(id: &str) -> StopKey {
    StopKey::Image(id.to_string())
}
