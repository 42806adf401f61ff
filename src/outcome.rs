//! Per-event outcomes and the response fan-out callback.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

/// One outcome per submitted event, delivered to a [`ResponseCallback`].
///
/// Exactly one variant is produced per input event — see the crate-level
/// invariant that `|outcomes(S)| == |S|` for any submission sequence `S`.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Outcome {
    /// Dropped by the sampler before ever reaching the queue.
    Sampled { metadata: Option<serde_json::Value> },

    /// Dropped because the queue was at `pending_work_capacity`.
    QueueOverflow { metadata: Option<serde_json::Value> },

    /// The event failed to serialize; the rest of its batch still sent.
    EncodeError {
        metadata: Option<serde_json::Value>,
        error: String,
        duration: Option<Duration>,
    },
    /// A per-event result parsed out of a successful batch response.
    Response {
        metadata: Option<serde_json::Value>,
        status_code: Option<u16>,
        duration: Duration,
        error: Option<String>,
    },

    /// The whole partition failed at the transport level (non-2xx,
    /// network error, or deadline expiry).
    Transport {
        metadata: Option<serde_json::Value>,
        status_code: Option<u16>,
        duration: Duration,
        error: String,
        timeout: bool,
    },
}

impl Outcome {
    pub fn metadata(&self) -> Option<&serde_json::Value> {
        match self {
            Outcome::Sampled { metadata }
            | Outcome::QueueOverflow { metadata }
            | Outcome::EncodeError { metadata, .. }
            | Outcome::Response { metadata, .. }
            | Outcome::Transport { metadata, .. } => metadata.as_ref(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Outcome::Response { status_code, .. } | Outcome::Transport { status_code, .. } => {
                *status_code
            }
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Outcome::Response {
                error: None,
                ..
            }
        )
    }
}

/// Invoked (possibly concurrently, when `max_concurrent_batches > 1`) with
/// one group of outcomes per batch that completes — sampling drops and
/// queue overflows are reported as their own single-outcome group.
///
/// Implementations must be safe under concurrent invocation.
pub trait ResponseCallback: Send + Sync {
    fn on_outcomes(&self, outcomes: Vec<Outcome>);
}

/// Default callback: a bounded ring of recent outcomes plus a notifier.
/// The minimal implementation the core falls back to when no callback is
/// supplied; applications wanting a richer response queue UI can supply
/// their own `ResponseCallback` instead.
pub struct ResponseRing {
    inner: Mutex<VecDeque<Outcome>>,
    capacity: usize,
    notify: tokio::sync::Notify,
}

impl ResponseRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            notify: tokio::sync::Notify::new(),
        }
    }

    /// Drain all currently buffered outcomes.
    pub fn drain(&self) -> Vec<Outcome> {
        self.inner.lock().drain(..).collect()
    }

    /// Wait until at least one outcome has been published since the last
    /// `notified` call.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

impl ResponseCallback for ResponseRing {
    fn on_outcomes(&self, outcomes: Vec<Outcome>) {
        if outcomes.is_empty() {
            return;
        }
        {
            let mut ring = self.inner.lock();
            for outcome in outcomes {
                if ring.len() >= self.capacity {
                    ring.pop_front();
                }
                ring.push_back(outcome);
            }
        }
        self.notify.notify_waiters();
    }
}
