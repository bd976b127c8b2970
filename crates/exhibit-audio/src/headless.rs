//! Simulated output graph for headless hosts and tests.
//!
//! Behaves like a gesture-gated browser context: the context starts
//! suspended, resume can be scripted to fail, nodes can be invalidated as if
//! the OS reclaimed them. Clones share state, so a test keeps a handle while
//! the engine owns the boxed backend.

use crossbeam_channel::{Receiver, Sender};
use exhibit_core::{Clock, GestureKind};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::backend::{AudioBackend, NodeId};
use crate::error::{AudioError, AudioResult};

#[derive(Debug, Clone)]
struct SimNode {
    url: String,
    looped: bool,
    connected: bool,
    playing: bool,
    offset_secs: f64,
    started_at_ms: u64,
    gain: f32,
    last_ramp_ms: u64,
    duration_ms: Option<u64>,
}

#[derive(Debug, Default)]
struct SimContext {
    running: bool,
    closed: bool,
}

struct HeadlessState {
    requires_gesture: bool,
    available: bool,
    context: Option<SimContext>,
    deny_resumes: u32,
    resume_calls: u32,
    listeners: HashSet<GestureKind>,
    listener_registrations: u32,
    silent_buffers: u32,
    next_node: NodeId,
    nodes: HashMap<NodeId, SimNode>,
    master_gain: f32,
    durations: HashMap<String, u64>,
    hold_probes: bool,
    held: Vec<(String, Sender<AudioResult<Duration>>)>,
    connect_log: Vec<String>,
}

/// In-process stand-in for a platform audio API.
#[derive(Clone)]
pub struct HeadlessBackend {
    state: Arc<Mutex<HeadlessState>>,
    clock: Arc<dyn Clock>,
}

impl HeadlessBackend {
    /// Create a gesture-gated backend.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState {
                requires_gesture: true,
                available: true,
                context: None,
                deny_resumes: 0,
                resume_calls: 0,
                listeners: HashSet::new(),
                listener_registrations: 0,
                silent_buffers: 0,
                next_node: 1,
                nodes: HashMap::new(),
                master_gain: 1.0,
                durations: HashMap::new(),
                hold_probes: false,
                held: Vec::new(),
                connect_log: Vec::new(),
            })),
            clock,
        }
    }

    /// A platform without an autoplay gate.
    pub fn permissive(clock: Arc<dyn Clock>) -> Self {
        let backend = Self::new(clock);
        backend.state.lock().requires_gesture = false;
        backend
    }

    /// A platform with no audio API at all.
    pub fn unavailable(clock: Arc<dyn Clock>) -> Self {
        let backend = Self::new(clock);
        backend.state.lock().available = false;
        backend
    }

    /// Register a loadable asset and its length.
    pub fn with_asset(self, url: &str, duration_ms: u64) -> Self {
        self.add_asset(url, duration_ms);
        self
    }

    pub fn add_asset(&self, url: &str, duration_ms: u64) {
        self.state.lock().durations.insert(url.to_string(), duration_ms);
    }

    /// Fail the next `count` resume attempts.
    pub fn deny_next_resumes(&self, count: u32) {
        self.state.lock().deny_resumes = count;
    }

    /// Keep probe results back until [`release_probes`](Self::release_probes).
    pub fn hold_probes(&self, hold: bool) {
        self.state.lock().hold_probes = hold;
    }

    /// Answer every held probe.
    pub fn release_probes(&self) {
        let mut state = self.state.lock();
        let held = std::mem::take(&mut state.held);
        for (url, tx) in held {
            let answer = match state.durations.get(&url) {
                Some(ms) => Ok(Duration::from_millis(*ms)),
                None => Err(AudioError::AssetUnavailable { url }),
            };
            let _ = tx.send(answer);
        }
    }

    /// Drop every node connection, as a platform does after backgrounding.
    pub fn drop_connections(&self) {
        let mut state = self.state.lock();
        for node in state.nodes.values_mut() {
            node.connected = false;
            node.playing = false;
        }
    }

    /// Zero the gain of every node playing `url`, as some platforms do on
    /// first connect.
    pub fn zero_gain(&self, url: &str) {
        for node in self.state.lock().nodes.values_mut().filter(|n| n.url == url) {
            node.gain = 0.0;
        }
    }

    /// Suspend the context behind the engine's back.
    pub fn reclaim_context(&self) {
        if let Some(ctx) = self.state.lock().context.as_mut() {
            ctx.running = false;
        }
    }

    pub fn listener_registrations(&self) -> u32 {
        self.state.lock().listener_registrations
    }

    pub fn active_listeners(&self) -> usize {
        self.state.lock().listeners.len()
    }

    pub fn silent_buffers_played(&self) -> u32 {
        self.state.lock().silent_buffers
    }

    pub fn resume_calls(&self) -> u32 {
        self.state.lock().resume_calls
    }

    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .context
            .as_ref()
            .map(|c| c.running && !c.closed)
            .unwrap_or(false)
    }

    pub fn master_gain(&self) -> f32 {
        self.state.lock().master_gain
    }

    /// URLs of nodes currently producing sound.
    pub fn audible_urls(&self) -> Vec<String> {
        let state = self.state.lock();
        let running = state.context.as_ref().map(|c| c.running).unwrap_or(false);
        if !running {
            return Vec::new();
        }
        let mut urls: Vec<String> = state
            .nodes
            .values()
            .filter(|n| n.connected && n.playing)
            .map(|n| n.url.clone())
            .collect();
        urls.sort();
        urls
    }

    /// Number of live nodes, connected or not.
    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }

    /// Gain and last ramp length of the live node playing `url`.
    pub fn gain_of(&self, url: &str) -> Option<(f32, u64)> {
        self.state
            .lock()
            .nodes
            .values()
            .find(|n| n.url == url)
            .map(|n| (n.gain, n.last_ramp_ms))
    }

    /// Order in which sources were connected.
    pub fn connect_log(&self) -> Vec<String> {
        self.state.lock().connect_log.clone()
    }

    fn node_position(node: &SimNode, now_ms: u64) -> f64 {
        if !node.playing {
            return node.offset_secs;
        }
        let elapsed = now_ms.saturating_sub(node.started_at_ms) as f64 / 1000.0;
        let pos = node.offset_secs + elapsed;
        match (node.looped, node.duration_ms) {
            (true, Some(d)) if d > 0 => pos % (d as f64 / 1000.0),
            (false, Some(d)) => pos.min(d as f64 / 1000.0),
            _ => pos,
        }
    }
}

impl AudioBackend for HeadlessBackend {
    fn requires_gesture(&self) -> bool {
        self.state.lock().requires_gesture
    }

    fn add_gesture_listeners(&mut self, kinds: &[GestureKind]) -> AudioResult<()> {
        let mut state = self.state.lock();
        state.listener_registrations += 1;
        state.listeners.extend(kinds.iter().copied());
        Ok(())
    }

    fn remove_gesture_listeners(&mut self, kinds: &[GestureKind]) {
        let mut state = self.state.lock();
        for kind in kinds {
            state.listeners.remove(kind);
        }
    }

    fn create_context(&mut self) -> AudioResult<()> {
        let mut state = self.state.lock();
        if !state.available {
            return Err(AudioError::PlatformUnavailable("no audio context".into()));
        }
        let running = !state.requires_gesture;
        state.context = Some(SimContext {
            running,
            closed: false,
        });
        Ok(())
    }

    fn resume_context(&mut self) -> AudioResult<()> {
        let now = self.clock.now_ms();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.resume_calls += 1;
        if state.deny_resumes > 0 {
            state.deny_resumes -= 1;
            return Err(AudioError::PlatformAudioDenied("resume rejected".into()));
        }
        match state.context.as_mut() {
            Some(ctx) if ctx.closed => Err(AudioError::Closed),
            Some(ctx) => {
                ctx.running = true;
                for node in state.nodes.values_mut().filter(|n| n.playing) {
                    node.started_at_ms = now;
                }
                Ok(())
            }
            None => Err(AudioError::PlatformUnavailable("context not created".into())),
        }
    }

    fn suspend_context(&mut self) -> AudioResult<()> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        let running = state.context.as_ref().map(|c| c.running).unwrap_or(false);
        if running {
            for node in state.nodes.values_mut().filter(|n| n.playing) {
                node.offset_secs = Self::node_position(node, now);
                node.started_at_ms = now;
            }
        }
        match state.context.as_mut() {
            Some(ctx) => {
                ctx.running = false;
                Ok(())
            }
            None => Err(AudioError::PlatformUnavailable("context not created".into())),
        }
    }

    fn close_context(&mut self) {
        let mut state = self.state.lock();
        state.nodes.clear();
        if let Some(ctx) = state.context.as_mut() {
            ctx.running = false;
            ctx.closed = true;
        }
    }

    fn context_running(&self) -> bool {
        self.is_running()
    }

    fn play_silent_buffer(&mut self) -> AudioResult<()> {
        self.state.lock().silent_buffers += 1;
        Ok(())
    }

    fn create_source(&mut self, url: &str, looped: bool) -> AudioResult<NodeId> {
        let mut state = self.state.lock();
        let Some(duration) = state.durations.get(url).copied() else {
            return Err(AudioError::AssetUnavailable {
                url: url.to_string(),
            });
        };
        let id = state.next_node;
        state.next_node += 1;
        state.nodes.insert(
            id,
            SimNode {
                url: url.to_string(),
                looped,
                connected: false,
                playing: false,
                offset_secs: 0.0,
                started_at_ms: 0,
                gain: 1.0,
                last_ramp_ms: 0,
                duration_ms: Some(duration),
            },
        );
        Ok(id)
    }

    fn connect(&mut self, node: NodeId) -> AudioResult<()> {
        let mut state = self.state.lock();
        let Some(sim) = state.nodes.get_mut(&node) else {
            return Err(AudioError::GraphDisconnected { node });
        };
        sim.connected = true;
        let url = sim.url.clone();
        state.connect_log.push(url);
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) {
        if let Some(sim) = self.state.lock().nodes.get_mut(&node) {
            sim.connected = false;
            sim.playing = false;
        }
    }

    fn release(&mut self, node: NodeId) {
        self.state.lock().nodes.remove(&node);
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.state
            .lock()
            .nodes
            .get(&node)
            .map(|n| n.connected)
            .unwrap_or(false)
    }

    fn start(&mut self, node: NodeId, offset_secs: f64) -> AudioResult<()> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        let running = state.context.as_ref().map(|c| c.running).unwrap_or(false);
        if !running {
            return Err(AudioError::PlatformAudioDenied(
                "play() called while suspended".into(),
            ));
        }
        let Some(sim) = state.nodes.get_mut(&node) else {
            return Err(AudioError::GraphDisconnected { node });
        };
        if !sim.connected {
            return Err(AudioError::GraphDisconnected { node });
        }
        sim.playing = true;
        sim.offset_secs = offset_secs;
        sim.started_at_ms = now;
        debug!(node, url = %sim.url, offset_secs, "Headless node started");
        Ok(())
    }

    fn pause(&mut self, node: NodeId) -> f64 {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        let running = state.context.as_ref().map(|c| c.running).unwrap_or(false);
        match state.nodes.get_mut(&node) {
            Some(sim) => {
                let pos = if running {
                    Self::node_position(sim, now)
                } else {
                    sim.offset_secs
                };
                sim.playing = false;
                sim.offset_secs = pos;
                pos
            }
            None => 0.0,
        }
    }

    fn position(&self, node: NodeId) -> Option<f64> {
        let now = self.clock.now_ms();
        let state = self.state.lock();
        let running = state.context.as_ref().map(|c| c.running).unwrap_or(false);
        state.nodes.get(&node).map(|sim| {
            if running {
                Self::node_position(sim, now)
            } else {
                sim.offset_secs
            }
        })
    }

    fn is_ended(&self, node: NodeId) -> bool {
        let now = self.clock.now_ms();
        let state = self.state.lock();
        let running = state.context.as_ref().map(|c| c.running).unwrap_or(false);
        match state.nodes.get(&node) {
            Some(sim) if running && sim.playing && !sim.looped => match sim.duration_ms {
                Some(d) => Self::node_position(sim, now) * 1000.0 >= d as f64,
                None => false,
            },
            _ => false,
        }
    }

    fn set_gain(&mut self, node: NodeId, gain: f32, ramp_ms: u64) {
        if let Some(sim) = self.state.lock().nodes.get_mut(&node) {
            sim.gain = gain;
            sim.last_ramp_ms = ramp_ms;
        }
    }

    fn set_master_gain(&mut self, gain: f32, _ramp_ms: u64) {
        self.state.lock().master_gain = gain;
    }

    fn probe_duration(&mut self, url: &str) -> Receiver<AudioResult<Duration>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut state = self.state.lock();
        if state.hold_probes {
            state.held.push((url.to_string(), tx));
            return rx;
        }
        let answer = match state.durations.get(url) {
            Some(ms) => Ok(Duration::from_millis(*ms)),
            None => Err(AudioError::AssetUnavailable {
                url: url.to_string(),
            }),
        };
        let _ = tx.send(answer);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exhibit_core::ManualClock;

    #[test]
    fn test_context_starts_suspended_when_gated() {
        let clock = ManualClock::new(0);
        let mut backend = HeadlessBackend::new(Arc::new(clock));
        backend.create_context().unwrap();
        assert!(!backend.context_running());
        backend.resume_context().unwrap();
        assert!(backend.context_running());
    }

    #[test]
    fn test_position_advances_with_clock() {
        let clock = ManualClock::new(0);
        let mut backend = HeadlessBackend::permissive(Arc::new(clock.clone())).with_asset("a", 10_000);
        backend.create_context().unwrap();
        let node = backend.create_source("a", false).unwrap();
        backend.connect(node).unwrap();
        backend.start(node, 1.0).unwrap();
        clock.advance(2_500);
        assert!((backend.position(node).unwrap() - 3.5).abs() < 1e-9);
        let paused = backend.pause(node);
        clock.advance(1_000);
        assert!((backend.position(node).unwrap() - paused).abs() < 1e-9);
    }

    #[test]
    fn test_start_refused_while_suspended() {
        let clock = ManualClock::new(0);
        let mut backend = HeadlessBackend::new(Arc::new(clock)).with_asset("a", 1_000);
        backend.create_context().unwrap();
        let node = backend.create_source("a", false).unwrap();
        backend.connect(node).unwrap();
        assert!(matches!(
            backend.start(node, 0.0),
            Err(AudioError::PlatformAudioDenied(_))
        ));
    }

    #[test]
    fn test_unknown_asset() {
        let clock = ManualClock::new(0);
        let mut backend = HeadlessBackend::permissive(Arc::new(clock));
        assert!(matches!(
            backend.create_source("missing", false),
            Err(AudioError::AssetUnavailable { .. })
        ));
        let rx = backend.probe_duration("missing");
        assert!(rx.try_recv().unwrap().is_err());
    }
}
