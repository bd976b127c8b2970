//! Gesture-gated unlock state.

use serde::{Deserialize, Serialize};

/// Whether the platform has granted audio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockState {
    Locked,
    AwaitingGesture,
    Unlocked,
}

/// Subscribe once, auto-unsubscribe on the first successful trigger.
///
/// `subscribe` only reports `true` when the subscription was not already
/// armed, so callers register platform listeners exactly once.
#[derive(Debug, Clone)]
pub struct OneShot<K> {
    kinds: Vec<K>,
    armed: bool,
    fired: bool,
}

impl<K: Copy + PartialEq> OneShot<K> {
    pub fn new() -> Self {
        Self {
            kinds: Vec::new(),
            armed: false,
            fired: false,
        }
    }

    /// Arm for `kinds`. Returns `false` if already armed or already fired.
    pub fn subscribe(&mut self, kinds: &[K]) -> bool {
        if self.armed || self.fired {
            return false;
        }
        self.kinds = kinds.to_vec();
        self.armed = true;
        true
    }

    /// Whether an event of `kind` should trigger the subscriber.
    pub fn matches(&self, kind: K) -> bool {
        self.armed && self.kinds.contains(&kind)
    }

    /// Mark the trigger successful and disarm. Returns the kinds to unlisten.
    pub fn complete(&mut self) -> Option<Vec<K>> {
        if !self.armed {
            return None;
        }
        self.armed = false;
        self.fired = true;
        Some(std::mem::take(&mut self.kinds))
    }

    /// Disarm without firing. Returns the kinds to unlisten.
    pub fn cancel(&mut self) -> Option<Vec<K>> {
        if !self.armed {
            return None;
        }
        self.armed = false;
        Some(std::mem::take(&mut self.kinds))
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

impl<K: Copy + PartialEq> Default for OneShot<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Ev {
        Click,
        Key,
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut shot = OneShot::new();
        assert!(shot.subscribe(&[Ev::Click]));
        assert!(!shot.subscribe(&[Ev::Click]));
        assert!(shot.is_armed());
    }

    #[test]
    fn test_matches_only_subscribed_kinds() {
        let mut shot = OneShot::new();
        shot.subscribe(&[Ev::Click]);
        assert!(shot.matches(Ev::Click));
        assert!(!shot.matches(Ev::Key));
    }

    #[test]
    fn test_complete_disarms_for_good() {
        let mut shot = OneShot::new();
        shot.subscribe(&[Ev::Click, Ev::Key]);
        assert_eq!(shot.complete(), Some(vec![Ev::Click, Ev::Key]));
        assert!(!shot.matches(Ev::Click));
        assert!(shot.has_fired());
        assert!(!shot.subscribe(&[Ev::Click]));
        assert_eq!(shot.complete(), None);
    }

    #[test]
    fn test_cancel_allows_resubscribe() {
        let mut shot = OneShot::new();
        shot.subscribe(&[Ev::Click]);
        assert_eq!(shot.cancel(), Some(vec![Ev::Click]));
        assert!(shot.subscribe(&[Ev::Key]));
    }
}
