//! End-to-end coverage against a mock HTTP server: every scenario exercises
//! `Client` through its public surface only, never its internals directly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use libhoney_core::{Client, Config, FixedSource, Outcome, ResponseCallback, ValidatedEvent};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Collector {
    outcomes: Mutex<Vec<Outcome>>,
}

impl Collector {
    fn snapshot(&self) -> Vec<Outcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl ResponseCallback for Collector {
    fn on_outcomes(&self, outcomes: Vec<Outcome>) {
        self.outcomes.lock().unwrap().extend(outcomes);
    }
}

fn accepted_batch(n: usize) -> serde_json::Value {
    json!(std::iter::repeat(json!({"status": 202, "err": null}))
        .take(n)
        .collect::<Vec<_>>())
}

#[tokio::test]
async fn size_trigger_issues_one_post_for_one_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/batch/d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(accepted_batch(5)))
        .expect(1)
        .mount(&server)
        .await;

    let collector = Arc::new(Collector::default());
    let config = Config::builder("a-write-key")
        .api_host(server.uri())
        .dataset("d")
        .batch_size_trigger(5)
        .batch_time_trigger(Duration::from_secs(10))
        .response_callback(collector.clone())
        .build()
        .unwrap();
    let client = Client::new(config).unwrap();

    for i in 0..5 {
        client.send_presampled_event(ValidatedEvent::new(
            server.uri(),
            "a-write-key",
            "d",
            json!({ "n": i }),
        ));
    }
    client.flush().await.unwrap();

    let outcomes = collector.snapshot();
    assert_eq!(outcomes.len(), 5);
    for outcome in &outcomes {
        match outcome {
            Outcome::Response {
                status_code, error, ..
            } => {
                assert_eq!(*status_code, Some(202));
                assert!(error.is_none());
            }
            other => panic!("expected a Response outcome, got {other:?}"),
        }
    }
    server.verify().await;
}

#[tokio::test]
async fn ten_events_at_batch_size_five_issue_two_posts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/batch/d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(accepted_batch(5)))
        .expect(2)
        .mount(&server)
        .await;

    let collector = Arc::new(Collector::default());
    let config = Config::builder("a-write-key")
        .api_host(server.uri())
        .dataset("d")
        .batch_size_trigger(5)
        .pending_work_capacity(10)
        .batch_time_trigger(Duration::from_secs(10))
        .response_callback(collector.clone())
        .build()
        .unwrap();
    let client = Client::new(config).unwrap();

    for i in 0..10 {
        client.send_presampled_event(ValidatedEvent::new(
            server.uri(),
            "a-write-key",
            "d",
            json!({ "n": i }),
        ));
    }
    client.flush().await.unwrap();

    assert_eq!(collector.snapshot().len(), 10);
    server.verify().await;
}

#[tokio::test]
async fn sampling_drop_with_fixed_rng_never_calls_http() {
    let server = MockServer::start().await;
    // No Mock registered: any request reaching the server fails the test.

    let collector = Arc::new(Collector::default());
    let config = Config::builder("a-write-key")
        .api_host(server.uri())
        .dataset("d")
        .random_source(Arc::new(FixedSource(0.11)))
        .response_callback(collector.clone())
        .build()
        .unwrap();
    let client = Client::new(config).unwrap();

    client.send_event(
        ValidatedEvent::new(server.uri(), "a-write-key", "d", json!({"n": 1}))
            .with_sample_rate(10),
    );
    client.flush().await.unwrap();

    let outcomes = collector.snapshot();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], Outcome::Sampled { .. }));
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn overflow_past_pending_work_capacity_reports_both_outcome_kinds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/batch/d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(accepted_batch(5)))
        .mount(&server)
        .await;

    let collector = Arc::new(Collector::default());
    let config = Config::builder("a-write-key")
        .api_host(server.uri())
        .dataset("d")
        // Left at the default (far above 10): nothing cuts synchronously
        // while the submission loop runs, so `pending_work_capacity` alone
        // decides what overflows.
        .pending_work_capacity(5)
        .batch_time_trigger(Duration::from_millis(50))
        .response_callback(collector.clone())
        .build()
        .unwrap();
    let client = Client::new(config).unwrap();

    // All 10 submitted synchronously, so the queue (capacity 5) only ever
    // has room for half of them before the deferred timer cuts the rest.
    for i in 0..10 {
        client.send_presampled_event(ValidatedEvent::new(
            server.uri(),
            "a-write-key",
            "d",
            json!({ "n": i }),
        ));
    }
    client.flush().await.unwrap();

    let outcomes = collector.snapshot();
    assert_eq!(outcomes.len(), 10);
    let overflow = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::QueueOverflow { .. }))
        .count();
    let shipped = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Response { .. }))
        .count();
    assert_eq!(overflow, 5);
    assert_eq!(shipped, 5);
}

#[tokio::test]
async fn per_event_encoding_failure_still_ships_the_rest_of_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/batch/d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(accepted_batch(10)))
        .expect(1)
        .mount(&server)
        .await;

    let collector = Arc::new(Collector::default());
    let config = Config::builder("a-write-key")
        .api_host(server.uri())
        .dataset("d")
        .batch_size_trigger(11)
        .batch_time_trigger(Duration::from_secs(10))
        .response_callback(collector.clone())
        .build()
        .unwrap();
    let client = Client::new(config).unwrap();

    let mut runaway = json!(1);
    for _ in 0..110 {
        runaway = json!([runaway]);
    }

    for i in 0..11 {
        let payload = if i == 5 { runaway.clone() } else { json!({ "n": i }) };
        client.send_presampled_event(ValidatedEvent::new(
            server.uri(),
            "a-write-key",
            "d",
            payload,
        ));
    }
    client.flush().await.unwrap();

    let outcomes = collector.snapshot();
    assert_eq!(outcomes.len(), 11);
    let encode_errors = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::EncodeError { .. }))
        .count();
    let shipped = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Response { .. }))
        .count();
    assert_eq!(encode_errors, 1);
    assert_eq!(shipped, 10);
    server.verify().await;
}

#[tokio::test]
async fn slow_response_past_the_deadline_reports_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/batch/d"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(accepted_batch(1))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let collector = Arc::new(Collector::default());
    let config = Config::builder("a-write-key")
        .api_host(server.uri())
        .dataset("d")
        .batch_size_trigger(1)
        .timeout(Duration::from_millis(100))
        .response_callback(collector.clone())
        .build()
        .unwrap();
    let client = Client::new(config).unwrap();

    client.send_presampled_event(ValidatedEvent::new(
        server.uri(),
        "a-write-key",
        "d",
        json!({ "n": 1 }),
    ));
    client.flush().await.unwrap();

    let outcomes = collector.snapshot();
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        Outcome::Transport { timeout, .. } => assert!(*timeout),
        other => panic!("expected a Transport outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn trailing_slash_in_api_host_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/batch/d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(accepted_batch(1)))
        .expect(1)
        .mount(&server)
        .await;

    let collector = Arc::new(Collector::default());
    let api_host = format!("{}/", server.uri());
    let config = Config::builder("a-write-key")
        .api_host(api_host.clone())
        .dataset("d")
        .batch_size_trigger(1)
        .response_callback(collector.clone())
        .build()
        .unwrap();
    let client = Client::new(config).unwrap();

    client.send_presampled_event(ValidatedEvent::new(api_host, "a-write-key", "d", json!({})));
    client.flush().await.unwrap();

    server.verify().await;
}
