//! Configuration for a [`crate::Client`]: a `#[must_use]` builder with
//! fluent setters and a fallible `.build()`.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;
use crate::outcome::ResponseCallback;
use crate::sampler::RandomSource;

const DEFAULT_API_HOST: &str = "https://api.honeycomb.io/";
const CLASSIC_WRITE_KEY_LEN: usize = 32;

/// Which [`crate::Transmission`] implementation a `Client` builds.
#[derive(Clone)]
pub enum TransmissionKind {
    /// Batches and ships events over HTTP.
    Base,
    /// Discards every event.
    Null,
    /// Appends events to an in-memory list; for tests.
    Mock,
    /// Writes one JSON line per event to stdout, bypassing sampling.
    Console,
    /// Caller-supplied constructor.
    Custom(Arc<dyn Fn(Arc<Config>) -> Result<Arc<dyn crate::transmission::Transmission>, ConfigError> + Send + Sync>),
}

impl std::fmt::Debug for TransmissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransmissionKind::Base => "Base",
            TransmissionKind::Null => "Null",
            TransmissionKind::Mock => "Mock",
            TransmissionKind::Console => "Console",
            TransmissionKind::Custom(_) => "Custom",
        };
        f.write_str(name)
    }
}

/// Resolved, validated configuration for a [`crate::Client`].
#[derive(Debug)]
#[non_exhaustive]
pub struct Config {
    pub api_host: String,
    pub write_key: String,
    pub dataset: String,
    pub sample_rate: u32,
    pub batch_size_trigger: usize,
    pub batch_time_trigger: Duration,
    pub max_concurrent_batches: usize,
    pub pending_work_capacity: usize,
    pub max_response_queue_size: usize,
    pub timeout: Duration,
    pub disabled: bool,
    pub user_agent_addition: String,
    pub(crate) transmission: TransmissionKind,
    pub(crate) response_callback: Option<Arc<dyn ResponseCallback>>,
    pub(crate) random_source: Option<Arc<dyn RandomSource>>,
}

impl Config {
    pub fn builder(write_key: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(write_key)
    }

    /// A 32-character write key is "classic" and requires a dataset.
    pub fn is_classic_key(write_key: &str) -> bool {
        write_key.len() == CLASSIC_WRITE_KEY_LEN
    }
}

/// Builder for [`Config`].
#[must_use = "builders do nothing unless you call .build()"]
pub struct ConfigBuilder {
    api_host: String,
    write_key: String,
    dataset: String,
    sample_rate: u32,
    batch_size_trigger: usize,
    batch_time_trigger: Duration,
    max_concurrent_batches: usize,
    pending_work_capacity: usize,
    max_response_queue_size: usize,
    timeout: Duration,
    disabled: bool,
    user_agent_addition: String,
    transmission: TransmissionKind,
    response_callback: Option<Arc<dyn ResponseCallback>>,
    random_source: Option<Arc<dyn RandomSource>>,
}

impl ConfigBuilder {
    pub fn new(write_key: impl Into<String>) -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            write_key: write_key.into(),
            dataset: String::new(),
            sample_rate: 1,
            batch_size_trigger: 50,
            batch_time_trigger: Duration::from_millis(100),
            max_concurrent_batches: 10,
            pending_work_capacity: 10_000,
            max_response_queue_size: 1_000,
            timeout: Duration::from_millis(60_000),
            disabled: false,
            user_agent_addition: String::new(),
            transmission: TransmissionKind::Base,
            response_callback: None,
            random_source: None,
        }
    }

    pub fn api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into();
        self
    }

    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn batch_size_trigger(mut self, n: usize) -> Self {
        self.batch_size_trigger = n;
        self
    }

    pub fn batch_time_trigger(mut self, delay: Duration) -> Self {
        self.batch_time_trigger = delay;
        self
    }

    pub fn max_concurrent_batches(mut self, n: usize) -> Self {
        self.max_concurrent_batches = n;
        self
    }

    pub fn pending_work_capacity(mut self, n: usize) -> Self {
        self.pending_work_capacity = n;
        self
    }

    pub fn max_response_queue_size(mut self, n: usize) -> Self {
        self.max_response_queue_size = n;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn user_agent_addition(mut self, addition: impl Into<String>) -> Self {
        self.user_agent_addition = addition.into();
        self
    }

    pub fn transmission(mut self, transmission: TransmissionKind) -> Self {
        self.transmission = transmission;
        self
    }

    pub fn response_callback(mut self, callback: Arc<dyn ResponseCallback>) -> Self {
        self.response_callback = Some(callback);
        self
    }

    /// Override the sampler's source of randomness. Production code never
    /// needs this; tests use it to pin the sampling predicate.
    pub fn random_source(mut self, source: Arc<dyn RandomSource>) -> Self {
        self.random_source = Some(source);
        self
    }

    /// Validate and build the configuration.
    ///
    /// A classic (32-character) write key requires a non-empty dataset. A
    /// non-classic key with no dataset is filled with `"unknown_dataset"`
    /// — this mirrors an external validator's behavior, reproduced here
    /// because `Config` is the whole library's configuration surface, not
    /// only the transmission core's.
    pub fn build(self) -> Result<Config, ConfigError> {
        if self.write_key.is_empty() {
            return Err(ConfigError::WriteKeyRequired);
        }

        let is_classic = Config::is_classic_key(&self.write_key);
        if is_classic && self.dataset.is_empty() {
            return Err(ConfigError::ClassicKeyRequiresDataset);
        }

        let dataset = if self.dataset.is_empty() {
            "unknown_dataset".to_string()
        } else {
            self.dataset
        };

        let transmission = if self.disabled {
            TransmissionKind::Null
        } else {
            self.transmission
        };

        Ok(Config {
            api_host: self.api_host,
            write_key: self.write_key,
            dataset,
            sample_rate: self.sample_rate.max(1),
            // A batch_size_trigger of 0 would prevent progress; floor at 1.
            batch_size_trigger: self.batch_size_trigger.max(1),
            batch_time_trigger: self.batch_time_trigger,
            max_concurrent_batches: self.max_concurrent_batches.max(1),
            pending_work_capacity: self.pending_work_capacity,
            max_response_queue_size: self.max_response_queue_size,
            timeout: self.timeout,
            disabled: self.disabled,
            user_agent_addition: self.user_agent_addition,
            transmission,
            response_callback: self.response_callback,
            random_source: self.random_source,
        })
    }
}
