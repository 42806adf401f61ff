//! Partitions a cut prefix by destination and encodes each partition into
//! a single JSON array body.

use std::collections::HashMap;

use crate::event::ValidatedEvent;

/// A destination triple plus the events sharing it, in input order.
pub(crate) struct Batch {
    pub(crate) api_host: String,
    pub(crate) write_key: String,
    pub(crate) dataset: String,
    pub(crate) events: Vec<ValidatedEvent>,
}

/// Partition a cut prefix by `(api_host, write_key, dataset)`.
///
/// Within a partition, event order matches the input prefix. Across
/// partitions, order isn't a guaranteed contract; this groups by
/// first-seen key in a `HashMap` and returns groups in first-seen order,
/// which gives tests something deterministic to assert on without
/// promising cross-partition ordering to callers.
pub(crate) fn partition(prefix: Vec<ValidatedEvent>) -> Vec<Batch> {
    let mut order: Vec<(String, String, String)> = Vec::new();
    let mut groups: HashMap<(String, String, String), Vec<ValidatedEvent>> = HashMap::new();

    for event in prefix {
        let key = {
            let (a, w, d) = event.partition_key();
            (a.to_string(), w.to_string(), d.to_string())
        };
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(event);
    }

    order
        .into_iter()
        .map(|key| {
            let events = groups.remove(&key).unwrap_or_default();
            Batch {
                api_host: key.0,
                write_key: key.1,
                dataset: key.2,
                events,
            }
        })
        .collect()
}

/// Result of encoding one partition.
pub(crate) struct EncodeResult {
    /// All events of the partition, in original order. Events that failed
    /// to serialize have `encode_error` set.
    pub(crate) events: Vec<ValidatedEvent>,
    /// The JSON array body, or `None` if every event failed to encode.
    pub(crate) body: Option<Vec<u8>>,
    /// Number of events actually present in `body` — the length the
    /// server's per-event response array is expected to have.
    pub(crate) encoded_count: usize,
}

/// Encode a batch's events into one JSON array body.
///
/// An individual event that fails to serialize is marked with
/// `encode_error` and omitted from the body; the rest of the batch still
/// proceeds. If every event fails, `body` is `None` and the caller must
/// not send the partition.
pub(crate) fn encode(mut batch: Batch) -> EncodeResult {
    let mut pieces: Vec<Vec<u8>> = Vec::with_capacity(batch.events.len());

    for event in &mut batch.events {
        match event.encode() {
            Ok(wire) => pieces.push(wire),
            Err(err) => event.encode_error = Some(err),
        }
    }

    let encoded_count = pieces.len();
    let body = if pieces.is_empty() {
        None
    } else {
        let mut body = Vec::with_capacity(pieces.iter().map(Vec::len).sum::<usize>() + 2);
        body.push(b'[');
        for (i, piece) in pieces.into_iter().enumerate() {
            if i > 0 {
                body.push(b',');
            }
            body.extend(piece);
        }
        body.push(b']');
        Some(body)
    };

    EncodeResult {
        events: batch.events,
        body,
        encoded_count,
    }
}
