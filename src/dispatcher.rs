//! The send-trigger state machine: decides when to cut a batch and keeps
//! `in_flight <= max_concurrent_batches`.
//!
//! A single struct holds the queue, the timer handle, and the flush
//! waiters behind one `parking_lot::Mutex`; every transition locks once,
//! mutates, and drops the lock before doing any `.await`-ing work.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::aggregator;
use crate::config::Config;
use crate::event::ValidatedEvent;
use crate::outcome::{Outcome, ResponseCallback};
use crate::queue::BoundedQueue;
use crate::sampler::Sampler;
use crate::sender;

struct DispatcherState {
    queue: BoundedQueue,
    timer: Option<JoinHandle<()>>,
    flush_waiters: Vec<oneshot::Sender<()>>,
}

/// Owns the queue, the deferred timer, and the in-flight count; the single
/// logical owner of mutable transmission state.
pub(crate) struct Dispatcher {
    state: Mutex<DispatcherState>,
    in_flight: AtomicUsize,
    config: Arc<Config>,
    http: reqwest::Client,
    sampler: Sampler,
    callback: Arc<dyn ResponseCallback>,
    user_agent: String,
}

impl Dispatcher {
    pub(crate) fn new(
        config: Arc<Config>,
        http: reqwest::Client,
        sampler: Sampler,
        callback: Arc<dyn ResponseCallback>,
    ) -> Arc<Self> {
        let user_agent = sender::build_user_agent(
            env!("CARGO_PKG_VERSION"),
            &config.user_agent_addition,
        );
        Arc::new(Self {
            state: Mutex::new(DispatcherState {
                queue: BoundedQueue::new(config.pending_work_capacity),
                timer: None,
                flush_waiters: Vec::new(),
            }),
            in_flight: AtomicUsize::new(0),
            config,
            http,
            sampler,
            callback,
            user_agent,
        })
    }

    /// Intake with sampling applied first.
    pub(crate) fn send_event(self: &Arc<Self>, event: ValidatedEvent) {
        if !self.sampler.admit(event.sample_rate) {
            self.callback.on_outcomes(vec![Outcome::Sampled {
                metadata: event.metadata,
            }]);
            return;
        }
        self.send_presampled_event(event);
    }

    /// Intake without sampling: never blocks the caller.
    pub(crate) fn send_presampled_event(self: &Arc<Self>, event: ValidatedEvent) {
        let mut state = self.state.lock();

        let event = match state.queue.try_push(event) {
            Ok(()) => None,
            Err(rejected) => Some(rejected),
        };

        if let Some(rejected) = event {
            drop(state);
            self.callback.on_outcomes(vec![Outcome::QueueOverflow {
                metadata: rejected.metadata,
            }]);
            return;
        }

        if state.queue.len() >= self.config.batch_size_trigger {
            drop(state);
            self.cut();
        } else {
            self.arm_timer(&mut state);
        }
    }

    /// Arm the deferred timer if one isn't already pending. Idempotent.
    fn arm_timer(self: &Arc<Self>, state: &mut DispatcherState) {
        if state.timer.is_some() {
            return;
        }
        let dispatcher = self.clone();
        let delay = self.config.batch_time_trigger;
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            dispatcher.fire_timer();
        }));
    }

    fn fire_timer(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            state.timer = None;
        }
        self.cut();
    }

    /// Cut a batch off the front of the queue and dispatch it.
    ///
    /// A no-op if every slot is busy (a later `on_batch_done` will retry)
    /// or the queue is empty.
    pub(crate) fn cut(self: &Arc<Self>) {
        let prefix = {
            let mut state = self.state.lock();

            if self.in_flight.load(Ordering::Acquire) >= self.config.max_concurrent_batches {
                return;
            }

            if let Some(timer) = state.timer.take() {
                timer.abort();
            }

            let prefix = state.queue.take_prefix(self.config.batch_size_trigger);
            if prefix.is_empty() {
                return;
            }

            // Increment while `state` is still held: two concurrent `cut()`
            // calls (a size-trigger cut racing a timer fire, or two producer
            // threads each crossing the size trigger) must not both observe
            // room for a slot before either claims it.
            self.in_flight.fetch_add(1, Ordering::AcqRel);
            prefix
        };

        let dispatcher = self.clone();
        tokio::spawn(async move {
            let batches = aggregator::partition(prefix);
            // Sequential sends within one slot: this cut consumes exactly
            // one unit of `in_flight` regardless of how many destinations
            // the prefix fanned out to (§4.4, §9 Open Question).
            for batch in batches {
                let write_key = batch.write_key.clone();
                let outcomes = sender::send_partition(
                    &dispatcher.http,
                    dispatcher.config.timeout,
                    &dispatcher.user_agent,
                    &write_key,
                    batch,
                )
                .await;
                dispatcher.callback.on_outcomes(outcomes);
            }
            dispatcher.on_batch_done();
        });
    }

    fn on_batch_done(self: &Arc<Self>) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);

        let mut state = self.state.lock();
        let queue_len = state.queue.len();

        if queue_len > 0 {
            if queue_len >= self.config.batch_size_trigger {
                drop(state);
                self.cut();
            } else {
                self.arm_timer(&mut state);
            }
            return;
        }

        if self.in_flight.load(Ordering::Acquire) == 0 {
            for waiter in state.flush_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    /// Resolve once the queue is empty and nothing is in flight; events
    /// submitted before the drain completes are included in the same
    /// drain.
    pub(crate) async fn flush(self: &Arc<Self>) {
        let receiver = {
            let mut state = self.state.lock();
            if state.queue.is_empty() && self.in_flight.load(Ordering::Acquire) == 0 {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.flush_waiters.push(tx);
                Some(rx)
            }
        };

        if let Some(rx) = receiver {
            let _ = rx.await;
        }
    }

    #[cfg(test)]
    pub(crate) fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ResponseCallback;
    use crate::sampler::FixedSource;
    use serde_json::json;

    struct NullCallback;

    impl ResponseCallback for NullCallback {
        fn on_outcomes(&self, _outcomes: Vec<Outcome>) {}
    }

    fn test_config(batch_size_trigger: usize, max_concurrent_batches: usize) -> Arc<Config> {
        Arc::new(
            Config::builder("short-key")
                .batch_size_trigger(batch_size_trigger)
                .max_concurrent_batches(max_concurrent_batches)
                .pending_work_capacity(1_000)
                .batch_time_trigger(Duration::from_secs(60))
                .build()
                .unwrap(),
        )
    }

    fn test_dispatcher(config: Arc<Config>) -> Arc<Dispatcher> {
        let http = reqwest::Client::new();
        let sampler = Sampler::new(Arc::new(FixedSource(0.0)));
        Dispatcher::new(config, http, sampler, Arc::new(NullCallback))
    }

    fn event() -> ValidatedEvent {
        // Port 0 never accepts a connection; the spawned send task fails
        // quickly without ever reaching a real server, which is fine —
        // these tests only assert on the synchronous cut/queue bookkeeping,
        // not on the outcome the failed send eventually produces.
        ValidatedEvent::new("http://127.0.0.1:0", "short-key", "d", json!({"a": 1}))
    }

    #[tokio::test]
    async fn cut_on_empty_queue_is_a_noop() {
        let dispatcher = test_dispatcher(test_config(5, 2));
        dispatcher.cut();
        assert_eq!(dispatcher.in_flight_count(), 0);
        assert_eq!(dispatcher.queue_len(), 0);
    }

    #[tokio::test]
    async fn cut_skips_when_every_slot_is_busy() {
        let dispatcher = test_dispatcher(test_config(1, 1));

        // The size trigger fires on this push and claims the only slot.
        // Nothing here has yielded to the runtime yet, so the spawned send
        // task hasn't run and `in_flight` still reflects just this claim.
        dispatcher.send_presampled_event(event());
        assert_eq!(dispatcher.in_flight_count(), 1);

        // This push also crosses the size trigger and tries to cut, but
        // finds the one slot already taken: it must leave its event queued
        // rather than push `in_flight` past `max_concurrent_batches`.
        dispatcher.send_presampled_event(event());
        assert_eq!(dispatcher.in_flight_count(), 1);
        assert_eq!(dispatcher.queue_len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_cuts_never_exceed_max_concurrent_batches() {
        let dispatcher = test_dispatcher(test_config(10, 1));

        // Queue four events without tripping the size trigger (10), so the
        // only way a cut happens is the two racing calls below.
        for _ in 0..4 {
            dispatcher.send_presampled_event(event());
        }
        assert_eq!(dispatcher.queue_len(), 4);

        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let d1 = dispatcher.clone();
        let b1 = barrier.clone();
        let h1 = tokio::spawn(async move {
            b1.wait().await;
            d1.cut();
        });

        let d2 = dispatcher.clone();
        let b2 = barrier.clone();
        let h2 = tokio::spawn(async move {
            b2.wait().await;
            d2.cut();
        });

        let _ = tokio::join!(h1, h2);

        // Whichever call wins the race takes the whole prefix (all 4
        // events fit under the size trigger of 10); the other finds the
        // slot already claimed or the queue already empty and no-ops.
        // Either way `in_flight` must never have exceeded 1.
        assert_eq!(dispatcher.in_flight_count(), 1);
        assert_eq!(dispatcher.queue_len(), 0);
    }
}
