//! The `Transmission` capability and its four variants.
//!
//! `async_trait` is used here — rather than an inherent method on a
//! single concrete type — because `Client` needs to hold one of four
//! interchangeable implementations behind a trait object, the same shape
//! `vector`'s sink trait objects use for the same reason.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::ConfigError;
use crate::event::ValidatedEvent;
use crate::outcome::{Outcome, ResponseCallback, ResponseRing};
use crate::sampler::{Sampler, ThreadRngSource};

/// The capability every event ultimately flows through.
#[async_trait]
pub trait Transmission: Send + Sync {
    fn send_event(&self, event: ValidatedEvent);
    fn send_presampled_event(&self, event: ValidatedEvent);
    async fn flush(&self);
}

/// The real HTTP-batching transmission.
pub struct BaseTransmission {
    dispatcher: Arc<Dispatcher>,
}

impl BaseTransmission {
    pub(crate) fn new(config: Arc<Config>) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()?;

        let callback: Arc<dyn ResponseCallback> = config
            .response_callback
            .clone()
            .unwrap_or_else(|| Arc::new(ResponseRing::new(config.max_response_queue_size)));

        let sampler = Sampler::new(
            config
                .random_source
                .clone()
                .unwrap_or_else(|| Arc::new(ThreadRngSource)),
        );

        Ok(Self {
            dispatcher: Dispatcher::new(config, http, sampler, callback),
        })
    }
}

#[async_trait]
impl Transmission for BaseTransmission {
    fn send_event(&self, event: ValidatedEvent) {
        self.dispatcher.send_event(event);
    }

    fn send_presampled_event(&self, event: ValidatedEvent) {
        self.dispatcher.send_presampled_event(event);
    }

    async fn flush(&self) {
        self.dispatcher.flush().await;
    }
}

/// Discards every event. Flush completes immediately.
#[derive(Default)]
pub struct NullTransmission;

#[async_trait]
impl Transmission for NullTransmission {
    fn send_event(&self, _event: ValidatedEvent) {}
    fn send_presampled_event(&self, _event: ValidatedEvent) {}
    async fn flush(&self) {}
}

/// Appends every event it receives to an in-memory list, bypassing
/// sampling and batching entirely. Intended for tests.
#[derive(Default)]
pub struct MockTransmission {
    events: Mutex<Vec<ValidatedEvent>>,
}

impl MockTransmission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event received so far, in submission order.
    pub fn events(&self) -> Vec<ValidatedEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl Transmission for MockTransmission {
    fn send_event(&self, event: ValidatedEvent) {
        self.events.lock().push(event);
    }

    fn send_presampled_event(&self, event: ValidatedEvent) {
        self.events.lock().push(event);
    }

    async fn flush(&self) {}
}

/// Writes one JSON line per event to stdout; bypasses sampling.
#[derive(Default)]
pub struct ConsoleTransmission;

impl ConsoleTransmission {
    fn log(&self, event: ValidatedEvent) {
        let line = serde_json::json!({
            "time": event.timestamp.to_rfc3339(),
            "dataset": event.dataset,
            "data": event.post_data,
        });
        let mut stdout = std::io::stdout();
        let _ = writeln!(stdout, "{line}");
    }
}

#[async_trait]
impl Transmission for ConsoleTransmission {
    fn send_event(&self, event: ValidatedEvent) {
        self.log(event);
    }

    fn send_presampled_event(&self, event: ValidatedEvent) {
        self.log(event);
    }

    async fn flush(&self) {}
}

/// Build the transmission a [`Config`] selects — the sole place an unknown
/// `TransmissionKind::Custom` constructor's error propagates from.
pub(crate) fn build(config: Arc<Config>) -> Result<Arc<dyn Transmission>, ConfigError> {
    use crate::config::TransmissionKind;

    match &config.transmission {
        TransmissionKind::Base => Ok(Arc::new(BaseTransmission::new(config)?)),
        TransmissionKind::Null => Ok(Arc::new(NullTransmission)),
        TransmissionKind::Mock => Ok(Arc::new(MockTransmission::new())),
        TransmissionKind::Console => Ok(Arc::new(ConsoleTransmission)),
        TransmissionKind::Custom(ctor) => ctor(config.clone()),
    }
}
