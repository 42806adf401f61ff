//! Top-level client: owns the current transmission and performs the
//! drain-and-swap on `flush()`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::ConfigError;
use crate::event::ValidatedEvent;
use crate::transmission::{self, Transmission};

/// A telemetry shipper client.
///
/// Cloning a `Client` shares the same underlying transmission and config —
/// useful for handing a `Client` to multiple producer contexts while pooling
/// connections centrally.
#[derive(Clone)]
pub struct Client {
    config: Arc<Config>,
    transmission: Arc<Mutex<Arc<dyn Transmission>>>,
}

impl Client {
    /// Build a client from a validated [`Config`].
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let config = Arc::new(config);
        let transmission = transmission::build(config.clone())?;
        Ok(Self {
            config,
            transmission: Arc::new(Mutex::new(transmission)),
        })
    }

    /// Submit an event; sampled first.
    pub fn send_event(&self, event: ValidatedEvent) {
        self.current().send_event(event);
    }

    /// Submit an event that has already been sampled (or should bypass
    /// sampling).
    pub fn send_presampled_event(&self, event: ValidatedEvent) {
        self.current().send_presampled_event(event);
    }

    /// Wait for everything submitted so far to drain.
    ///
    /// Detaches the current transmission, installs a freshly built one for
    /// subsequent events, and awaits the detached instance's drain. This
    /// guarantees the caller blocks on exactly the work pending at the
    /// moment `flush` was called, while new events immediately go to the
    /// fresh instance.
    pub async fn flush(&self) -> Result<(), ConfigError> {
        let fresh = transmission::build(self.config.clone())?;
        let previous = {
            let mut current = self.transmission.lock();
            std::mem::replace(&mut *current, fresh)
        };
        previous.flush().await;
        Ok(())
    }

    fn current(&self) -> Arc<dyn Transmission> {
        self.transmission.lock().clone()
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
