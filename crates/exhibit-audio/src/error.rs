//! Errors raised at the platform audio boundary.
//!
//! These only travel between an [`AudioBackend`](crate::AudioBackend) and the
//! engine. The engine logs them and degrades to silence.

use thiserror::Error;

/// Failure reported by the platform audio API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    /// No audio output API exists on this platform.
    #[error("Audio platform unavailable: {0}")]
    PlatformUnavailable(String),

    /// The platform refused playback (autoplay policy).
    #[error("Audio playback denied by platform: {0}")]
    PlatformAudioDenied(String),

    /// The source could not be loaded or decoded.
    #[error("Audio asset unavailable: {url}")]
    AssetUnavailable { url: String },

    /// A graph node was discarded by the platform.
    #[error("Audio graph node {node} disconnected")]
    GraphDisconnected { node: u64 },

    /// The output context has been closed.
    #[error("Audio output closed")]
    Closed,
}

/// Result type alias for backend calls.
pub type AudioResult<T> = std::result::Result<T, AudioError>;
