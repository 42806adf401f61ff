//! Transmission core for a client-side telemetry shipper.
//!
//! This crate implements the hard engineering of shipping structured
//! events to a Honeycomb-style HTTP batch endpoint: a bounded intake
//! queue, a batch aggregator that partitions by destination, a concurrent
//! dispatcher with size/time/flush cut triggers, an HTTP sender with a
//! per-request deadline, and a response fan-out to a user callback.
//!
//! The user-facing event builder, field validation, and response-queue UI
//! are external collaborators — this crate consumes already-validated
//! [`ValidatedEvent`]s and emits one [`Outcome`] per event.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use libhoney_core::{Client, Config, ValidatedEvent};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::builder("my-write-key")
//!         .dataset("my-dataset")
//!         .build()?;
//!     let client = Client::new(config)?;
//!
//!     client.send_event(ValidatedEvent::new(
//!         "https://api.honeycomb.io/",
//!         "my-write-key",
//!         "my-dataset",
//!         json!({ "duration_ms": 12 }),
//!     ));
//!
//!     client.flush().await?;
//!     Ok(())
//! }
//! ```

mod aggregator;
mod client;
mod config;
mod dispatcher;
mod error;
mod event;
mod outcome;
mod queue;
mod sampler;
mod sender;
mod transmission;

pub use client::Client;
pub use config::{Config, ConfigBuilder, TransmissionKind};
pub use error::ConfigError;
pub use event::ValidatedEvent;
pub use outcome::{Outcome, ResponseCallback, ResponseRing};
pub use sampler::{FixedSource, RandomSource, Sampler, ThreadRngSource};
pub use transmission::{
    BaseTransmission, ConsoleTransmission, MockTransmission, NullTransmission, Transmission,
};
