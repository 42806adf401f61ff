//! Performs one POST per partition, applies the per-request deadline, and
//! maps the response back onto per-event outcomes.

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::aggregator::{self, Batch};
use crate::error::TransportError;
use crate::outcome::Outcome;

/// `User-Agent` is forbidden to override by the fetch API in wasm32
/// targets (browser runtimes); `X-Honeycomb-UserAgent` carries the same
/// value there instead.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) const USER_AGENT_HEADER: &str = "User-Agent";
#[cfg(target_arch = "wasm32")]
pub(crate) const USER_AGENT_HEADER: &str = "X-Honeycomb-UserAgent";

pub(crate) fn build_user_agent(lang_version: &str, addition: &str) -> String {
    let addition = addition.trim();
    if addition.is_empty() {
        format!("libhoney-rs/{lang_version}")
    } else {
        format!("libhoney-rs/{lang_version} {addition}")
    }
}

fn build_url(api_host: &str, dataset: &str) -> String {
    format!("{}/1/batch/{}", api_host.trim_end_matches('/'), dataset)
}

#[derive(Deserialize)]
struct EventResponse {
    status: u16,
    err: Option<String>,
}

/// Send one partition and produce one outcome per event in it, in the
/// partition's original order (encode-failed events included).
pub(crate) async fn send_partition(
    http: &reqwest::Client,
    timeout: Duration,
    user_agent: &str,
    write_key: &str,
    batch: Batch,
) -> Vec<Outcome> {
    let api_host = batch.api_host.clone();
    let dataset = batch.dataset.clone();
    let encoded = aggregator::encode(batch);

    let Some(body) = encoded.body else {
        return encoded
            .events
            .into_iter()
            .map(|event| Outcome::EncodeError {
                metadata: event.metadata,
                error: event.encode_error.unwrap_or_default(),
                duration: None,
            })
            .collect();
    };

    let url = build_url(&api_host, &dataset);
    let start = Instant::now();

    let request = http
        .post(&url)
        .header("X-Honeycomb-Team", write_key)
        .header("Content-Type", "application/json")
        .header(USER_AGENT_HEADER, user_agent)
        .body(body);

    let outcome = match tokio::time::timeout(timeout, request.send()).await {
        Err(_elapsed) => PartitionOutcome::Transport(TransportError::Timeout),
        Ok(Err(err)) => PartitionOutcome::Transport(TransportError::from(err)),
        Ok(Ok(response)) => {
            let status = response.status();
            if !status.is_success() {
                #[cfg(feature = "tracing")]
                tracing::error!(status = status.as_u16(), url, "batch send failed");
                PartitionOutcome::Transport(TransportError::Status {
                    status: status.as_u16(),
                })
            } else {
                match response.json::<Vec<EventResponse>>().await {
                    Ok(responses) if responses.len() == encoded.encoded_count => {
                        PartitionOutcome::Parsed(responses)
                    }
                    Ok(responses) => PartitionOutcome::Transport(TransportError::MalformedResponse(
                        format!(
                            "expected {} response entries, got {}",
                            encoded.encoded_count,
                            responses.len()
                        ),
                    )),
                    Err(err) => {
                        PartitionOutcome::Transport(TransportError::MalformedResponse(err.to_string()))
                    }
                }
            }
        }
    };

    let duration = start.elapsed();

    match outcome {
        PartitionOutcome::Parsed(responses) => {
            let mut responses = responses.into_iter();
            encoded
                .events
                .into_iter()
                .map(|event| match event.encode_error {
                    Some(error) => Outcome::EncodeError {
                        metadata: event.metadata,
                        error,
                        duration: Some(duration),
                    },
                    None => {
                        // Walk the response array in lockstep with the
                        // successfully-encoded subset; encode-failed events
                        // never consume a slot (see the module-level note
                        // in `aggregator`).
                        let response = responses.next();
                        Outcome::Response {
                            metadata: event.metadata,
                            status_code: response.as_ref().map(|r| r.status),
                            duration,
                            error: response.and_then(|r| r.err),
                        }
                    }
                })
                .collect()
        }
        PartitionOutcome::Transport(err) => encoded
            .events
            .into_iter()
            .map(|event| match event.encode_error {
                Some(error) => Outcome::EncodeError {
                    metadata: event.metadata,
                    error,
                    duration: Some(duration),
                },
                None => Outcome::Transport {
                    metadata: event.metadata,
                    status_code: err.status_code(),
                    duration,
                    error: err.to_string(),
                    timeout: err.is_timeout(),
                },
            })
            .collect(),
    }
}

enum PartitionOutcome {
    Parsed(Vec<EventResponse>),
    Transport(TransportError),
}
