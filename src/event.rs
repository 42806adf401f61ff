//! The validated event shape the core consumes.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// An event that has already passed through the (external) validator.
///
/// The core treats every field but [`ValidatedEvent::encode_error`] as
/// immutable once the event is handed to [`crate::Client::send_event`] or
/// [`crate::Client::send_presampled_event`]. `encode_error` is set at most
/// once, by the aggregator worker that owns the event's partition, before
/// any outcome referring to the event is emitted.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ValidatedEvent {
    pub timestamp: DateTime<Utc>,
    pub api_host: String,
    pub write_key: String,
    pub dataset: String,
    pub sample_rate: u32,
    pub post_data: serde_json::Value,
    pub metadata: Option<serde_json::Value>,
    pub encode_error: Option<String>,
}

impl ValidatedEvent {
    /// Construct an event with `sample_rate` defaulted to 1 (send every
    /// event) and no metadata.
    pub fn new(
        api_host: impl Into<String>,
        write_key: impl Into<String>,
        dataset: impl Into<String>,
        post_data: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            api_host: api_host.into(),
            write_key: write_key.into(),
            dataset: dataset.into(),
            sample_rate: 1,
            post_data,
            metadata: None,
            encode_error: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// The destination triple this event routes to.
    pub(crate) fn partition_key(&self) -> (&str, &str, &str) {
        (&self.api_host, &self.write_key, &self.dataset)
    }

    /// Encode this event to its wire shape.
    ///
    /// Mirrors the server contract: `time` is always present, `samplerate`
    /// is omitted when 1 (the default), `data` is omitted when empty.
    ///
    /// `post_data` is already a `serde_json::Value` by the time it reaches
    /// the core (the validator's job is to produce exactly that), so a
    /// `Value` tree can't hold a NaN/Infinity float or a non-string key —
    /// `Value`'s own constructors rule those out. The one failure mode that
    /// survives validation is runaway nesting (the JS original's
    /// self-referential payload becomes, in a tree-shaped Rust value,
    /// pathological depth rather than a cycle): `encode` rejects payloads
    /// deeper than [`MAX_PAYLOAD_DEPTH`] rather than risking a stack
    /// overflow in the serializer.
    pub(crate) fn encode(&self) -> Result<Vec<u8>, String> {
        if depth(&self.post_data) > MAX_PAYLOAD_DEPTH {
            return Err(format!(
                "payload exceeds maximum nesting depth of {MAX_PAYLOAD_DEPTH}"
            ));
        }

        let wire = WireEvent {
            time: self.timestamp.to_rfc3339(),
            samplerate: if self.sample_rate > 1 {
                Some(self.sample_rate)
            } else {
                None
            },
            data: if matches!(&self.post_data, serde_json::Value::Null) {
                None
            } else {
                Some(&self.post_data)
            },
        };
        serde_json::to_vec(&wire).map_err(|e| e.to_string())
    }
}

/// Maximum nesting depth `encode` tolerates in `post_data`.
pub(crate) const MAX_PAYLOAD_DEPTH: usize = 100;

fn depth(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Array(items) => {
            1 + items.iter().map(depth).max().unwrap_or(0)
        }
        serde_json::Value::Object(map) => {
            1 + map.values().map(depth).max().unwrap_or(0)
        }
        _ => 0,
    }
}

#[derive(Serialize)]
struct WireEvent<'a> {
    time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    samplerate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
}
