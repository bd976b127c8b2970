//! Platform seam for audio output.
//!
//! A backend models a single output graph: one context, a master gain, and
//! per-source nodes wired `source -> gain -> master`. All calls are
//! non-blocking; anything slow (duration probing) answers on a channel.

use crossbeam_channel::Receiver;
use exhibit_core::GestureKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AudioResult;

/// Opaque handle to a source node (with its gain stage).
pub type NodeId = u64;

/// Lifecycle of the shared output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextState {
    Uninitialized,
    Suspended,
    Running,
    Closed,
}

/// Platform audio API.
pub trait AudioBackend: Send {
    /// Whether output may only start in response to a user gesture.
    fn requires_gesture(&self) -> bool;

    /// Register document-wide listeners for the given input events.
    fn add_gesture_listeners(&mut self, kinds: &[GestureKind]) -> AudioResult<()>;

    /// Remove listeners previously added.
    fn remove_gesture_listeners(&mut self, kinds: &[GestureKind]);

    /// Create the output context. It starts suspended on gesture-gated platforms.
    fn create_context(&mut self) -> AudioResult<()>;

    /// Ask the context to start producing output.
    fn resume_context(&mut self) -> AudioResult<()>;

    /// Stop producing output, keeping the graph.
    fn suspend_context(&mut self) -> AudioResult<()>;

    /// Tear down the context and every node.
    fn close_context(&mut self);

    /// Whether the platform currently reports the context as running.
    fn context_running(&self) -> bool;

    /// Play an inaudible one-sample buffer to wake the output device.
    fn play_silent_buffer(&mut self) -> AudioResult<()>;

    /// Create a source node for `url`.
    fn create_source(&mut self, url: &str, looped: bool) -> AudioResult<NodeId>;

    /// Wire `source -> gain -> master`.
    fn connect(&mut self, node: NodeId) -> AudioResult<()>;

    /// Detach a node from the graph.
    fn disconnect(&mut self, node: NodeId);

    /// Free a node's resources. The id is invalid afterwards.
    fn release(&mut self, node: NodeId);

    /// Whether the node still exists and is wired to the master gain.
    fn is_connected(&self, node: NodeId) -> bool;

    /// Start playing from `offset_secs`.
    fn start(&mut self, node: NodeId, offset_secs: f64) -> AudioResult<()>;

    /// Pause and return the playback position in seconds.
    fn pause(&mut self, node: NodeId) -> f64;

    /// Current playback position in seconds.
    fn position(&self, node: NodeId) -> Option<f64>;

    /// Whether a non-looping node reached its end.
    fn is_ended(&self, node: NodeId) -> bool;

    /// Set a node's gain, linearly ramping over `ramp_ms` when non-zero.
    fn set_gain(&mut self, node: NodeId, gain: f32, ramp_ms: u64);

    /// Set the master gain, linearly ramping over `ramp_ms` when non-zero.
    fn set_master_gain(&mut self, gain: f32, ramp_ms: u64);

    /// Load only enough of `url` to learn its duration.
    fn probe_duration(&mut self, url: &str) -> Receiver<AudioResult<Duration>>;
}
