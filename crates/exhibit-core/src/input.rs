//! Host input event kinds.

use serde::{Deserialize, Serialize};

/// User input events that count as a gesture for audio unlocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    PointerDown,
    PointerUp,
    TouchStart,
    TouchEnd,
    Click,
    KeyDown,
}

impl GestureKind {
    /// The broad set of document-wide events listened to while locked.
    pub const UNLOCK_DEFAULT: [GestureKind; 5] = [
        GestureKind::PointerDown,
        GestureKind::PointerUp,
        GestureKind::TouchStart,
        GestureKind::TouchEnd,
        GestureKind::Click,
    ];
}
