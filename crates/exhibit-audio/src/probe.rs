//! Duration probing without a full decode.

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use exhibit_core::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::AudioResult;

/// Measured durations keyed by source URL. `None` records a failed load.
pub(crate) type DurationCache = Arc<Mutex<HashMap<String, Option<u64>>>>;

/// Outcome of polling a [`DurationProbe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Pending,
    /// Duration in milliseconds, or `None` when unknown (failed or timed out).
    Ready(Option<u64>),
}

/// An in-flight duration measurement.
///
/// Resolves to "unknown" instead of hanging once its deadline passes.
pub struct DurationProbe {
    url: String,
    rx: Option<Receiver<AudioResult<Duration>>>,
    deadline_ms: u64,
    clock: Arc<dyn Clock>,
    cache: Option<DurationCache>,
    result: Option<Option<u64>>,
}

impl DurationProbe {
    pub(crate) fn pending(
        url: &str,
        rx: Receiver<AudioResult<Duration>>,
        timeout_ms: u64,
        clock: Arc<dyn Clock>,
        cache: DurationCache,
    ) -> Self {
        let deadline_ms = clock.now_ms() + timeout_ms;
        Self {
            url: url.to_string(),
            rx: Some(rx),
            deadline_ms,
            clock,
            cache: Some(cache),
            result: None,
        }
    }

    pub(crate) fn ready(url: &str, value: Option<u64>, clock: Arc<dyn Clock>) -> Self {
        Self {
            url: url.to_string(),
            rx: None,
            deadline_ms: 0,
            clock,
            cache: None,
            result: Some(value),
        }
    }

    /// Source being measured.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check for a result without blocking.
    pub fn poll(&mut self) -> ProbeStatus {
        if let Some(result) = self.result {
            return ProbeStatus::Ready(result);
        }
        let Some(rx) = &self.rx else {
            return self.finish(None, false);
        };
        match rx.try_recv() {
            Ok(message) => self.accept(message),
            Err(TryRecvError::Disconnected) => {
                warn!(url = %self.url, "Duration probe dropped without a result");
                self.finish(None, false)
            }
            Err(TryRecvError::Empty) => {
                if self.clock.now_ms() >= self.deadline_ms {
                    warn!(url = %self.url, "Duration probe timed out");
                    self.finish(None, false)
                } else {
                    ProbeStatus::Pending
                }
            }
        }
    }

    /// Block until the probe resolves or its deadline passes.
    pub fn wait(mut self) -> Option<u64> {
        if let Some(result) = self.result {
            return result;
        }
        let remaining = self.deadline_ms.saturating_sub(self.clock.now_ms());
        let Some(rx) = self.rx.take() else {
            return None;
        };
        match rx.recv_timeout(Duration::from_millis(remaining)) {
            Ok(message) => match self.accept(message) {
                ProbeStatus::Ready(value) => value,
                ProbeStatus::Pending => None,
            },
            Err(RecvTimeoutError::Timeout) => {
                warn!(url = %self.url, "Duration probe timed out");
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn accept(&mut self, message: AudioResult<Duration>) -> ProbeStatus {
        match message {
            Ok(duration) => {
                let ms = duration.as_millis() as u64;
                debug!(url = %self.url, duration_ms = ms, "Measured duration");
                self.finish(Some(ms), true)
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Duration probe failed");
                self.finish(None, true)
            }
        }
    }

    fn finish(&mut self, value: Option<u64>, cacheable: bool) -> ProbeStatus {
        self.rx = None;
        self.result = Some(value);
        if cacheable {
            if let Some(cache) = &self.cache {
                cache.lock().insert(self.url.clone(), value);
            }
        }
        ProbeStatus::Ready(value)
    }
}

impl std::fmt::Debug for DurationProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurationProbe")
            .field("url", &self.url)
            .field("deadline_ms", &self.deadline_ms)
            .field("result", &self.result)
            .finish()
    }
}
