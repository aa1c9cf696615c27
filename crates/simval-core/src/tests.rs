//! Unit tests for value lifecycle, hooks and fault handling.
//!
//! Values here are fed from a bare [`Fanout`] so every input is published by
//! the test itself and the outcome does not depend on timing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    Accumulate, Difference, Error, FailureObserver, Fanout, FaultPolicy, FnTransform,
    TransformError, UpdateFailure, UpdateHook, Value, ValueState,
};

async fn feed(upstream: &Fanout<i64>, items: impl IntoIterator<Item = i64>) {
    for item in items {
        upstream.publish(item).await;
    }
}

fn reject_negative(
) -> FnTransform<impl FnMut(i64, &i64) -> Result<i64, TransformError> + Clone + Send + 'static> {
    FnTransform::new("no-negatives", |input: i64, _prior: &i64| {
        if input < 0 {
            Err(TransformError::rejected("negative input"))
        } else {
            Ok(input)
        }
    })
}

/// Records every hook notification in order.
#[derive(Default)]
struct RecordingHook {
    events: Mutex<Vec<String>>,
}

impl UpdateHook<i64> for RecordingHook {
    fn on_input(&self, input: &i64, prior: &i64) {
        self.events.lock().push(format!("input {input} prior {prior}"));
    }

    fn on_transform(&self, name: &str, input: &i64, output: &i64, prior: &i64) {
        self.events
            .lock()
            .push(format!("{name} {input}->{output} prior {prior}"));
    }

    fn after_update(&self, state: &i64) {
        self.events.lock().push(format!("state {state}"));
    }
}

#[derive(Default)]
struct CollectFailures {
    failures: Mutex<Vec<UpdateFailure>>,
}

impl FailureObserver for CollectFailures {
    fn on_failure(&self, failure: &UpdateFailure) {
        self.failures.lock().push(failure.clone());
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_configuration_rejected_after_start() {
    let upstream = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());
    value.add_transform(Accumulate::new()).unwrap();
    value.start().unwrap();
    assert_eq!(value.state(), ValueState::Running);

    let frozen = Err(Error::ConfigurationFrozen { component: "value" });
    for _ in 0..50 {
        assert_eq!(
            value.add_transform(Accumulate::new()).map(|_| ()),
            frozen
        );
        assert_eq!(value.enable_reset_on_read(0).map(|_| ()), frozen);
        assert_eq!(
            value.set_fault_policy(FaultPolicy::Halt).map(|_| ()),
            frozen
        );
    }
    assert_eq!(value.stats().transform_count, 1);
    assert!(!value.is_reset_on_read());

    feed(&upstream, [1, 1]).await;
    upstream.close();
    value.stop().await;

    // Rejections had no effect on processing.
    assert_eq!(value.value(), 2);
    assert_eq!(
        value.add_transform(Accumulate::new()).map(|_| ()),
        frozen
    );
}

#[tokio::test]
async fn test_start_is_single_shot() {
    let upstream: Arc<Fanout<i64>> = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());

    value.start().unwrap();
    assert_eq!(
        value.start(),
        Err(Error::AlreadyRunning { component: "value" })
    );
    // Only one consumer subscribed.
    assert_eq!(upstream.subscriber_count(), 1);

    upstream.close();
    value.stop().await;
    assert_eq!(value.start(), Err(Error::Stopped { component: "value" }));
}

#[tokio::test]
async fn test_stop_before_start() {
    let upstream: Arc<Fanout<i64>> = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());

    value.stop().await;
    value.stop().await;

    assert_eq!(value.state(), ValueState::Stopped);
    assert_eq!(value.start(), Err(Error::Stopped { component: "value" }));
    assert_eq!(upstream.subscriber_count(), 0);
}

#[test]
fn test_start_outside_runtime_rejected() {
    let value: Value<i64> = Value::new(Arc::new(Fanout::new()));
    assert_eq!(value.start(), Err(Error::NoRuntime { component: "value" }));
    assert_eq!(value.state(), ValueState::New);
}

#[tokio::test]
async fn test_concurrent_stops_wait_for_drain() {
    let upstream = Arc::new(Fanout::new());
    let value = Arc::new(Value::new(upstream.clone()));
    value.add_transform(Accumulate::new()).unwrap();
    value.start().unwrap();

    let stoppers: Vec<_> = (0..3)
        .map(|_| {
            let value = value.clone();
            tokio::spawn(async move {
                value.stop().await;
                value.stats().update_count
            })
        })
        .collect();

    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    // The source is still open, so nobody may have returned yet.
    assert!(stoppers.iter().all(|h| !h.is_finished()));

    feed(&upstream, 1..=50).await;
    upstream.close();

    for stopper in stoppers {
        assert_eq!(stopper.await.unwrap(), 50);
    }
    assert_eq!(value.state(), ValueState::Stopped);
    assert_eq!(value.value(), (1..=50).sum::<i64>());
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_stats_never_resets() {
    let upstream = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());
    value
        .add_transform(Accumulate::new())
        .unwrap()
        .enable_reset_on_read(0)
        .unwrap();
    value.start().unwrap();

    feed(&upstream, [4, 5, 6]).await;
    upstream.close();
    value.stop().await;

    for _ in 0..10 {
        let stats = value.stats();
        assert_eq!(stats.current_value, 15);
        assert_eq!(stats.update_count, 3);
    }
    assert_eq!(value.value(), 15);
    assert_eq!(value.stats().current_value, 0);
}

#[tokio::test]
async fn test_reset_value_is_a_starting_point() {
    let upstream = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());
    value
        .add_transform(Accumulate::new())
        .unwrap()
        .enable_reset_on_read(100)
        .unwrap();
    value.start().unwrap();

    feed(&upstream, [1, 2, 3]).await;
    upstream.close();
    value.stop().await;

    assert_eq!(value.value(), 6);
    assert_eq!(value.value(), 100);
    assert_eq!(value.value(), 100);
}

// ============================================================================
// Transforms and hooks
// ============================================================================

#[tokio::test]
async fn test_every_transform_sees_pre_update_state() {
    let upstream = Arc::new(Fanout::new());
    let value = Value::with_initial(upstream.clone(), 1);
    value
        .add_transform(FnTransform::new("add-prior", |i: i64, p: &i64| {
            Ok::<_, TransformError>(i + p)
        }))
        .unwrap()
        .add_transform(FnTransform::new("scale", |i: i64, p: &i64| {
            Ok::<_, TransformError>(i * 100 + p)
        }))
        .unwrap();
    value.start().unwrap();

    feed(&upstream, [2]).await;
    upstream.close();
    value.stop().await;

    // add-prior: 2 + 1 = 3, scale: 3 * 100 + 1 = 301.
    assert_eq!(value.value(), 301);
}

#[tokio::test]
async fn test_hook_notifications_in_order() {
    let upstream = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());
    let hook = Arc::new(RecordingHook::default());
    value
        .add_transform(Accumulate::new())
        .unwrap()
        .add_transform(FnTransform::new("double", |i: i64, _: &i64| {
            Ok::<_, TransformError>(i * 2)
        }))
        .unwrap();
    value.set_update_hook(Some(hook.clone()));
    value.start().unwrap();

    feed(&upstream, [3]).await;
    upstream.close();
    value.stop().await;

    assert_eq!(
        *hook.events.lock(),
        vec![
            "input 3 prior 0".to_string(),
            "accumulate 3->3 prior 0".to_string(),
            "double 3->6 prior 0".to_string(),
            "state 6".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_hook_panic_does_not_affect_update() {
    struct Faulty {
        committed: AtomicU64,
    }

    impl UpdateHook<i64> for Faulty {
        fn on_input(&self, _input: &i64, _prior: &i64) {
            panic!("on_input failure");
        }

        fn on_transform(&self, _name: &str, _input: &i64, _output: &i64, _prior: &i64) {
            panic!("on_transform failure");
        }

        fn after_update(&self, _state: &i64) {
            self.committed.fetch_add(1, Ordering::SeqCst);
        }
    }

    let upstream = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());
    let hook = Arc::new(Faulty {
        committed: AtomicU64::new(0),
    });
    value.add_transform(Accumulate::new()).unwrap();
    value.set_update_hook(Some(hook.clone()));
    value.start().unwrap();

    feed(&upstream, [5, 5, 5]).await;
    upstream.close();
    value.stop().await;

    assert_eq!(value.value(), 15);
    assert_eq!(value.stats().update_count, 3);
    assert_eq!(hook.committed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_removed_hook_stops_receiving() {
    let upstream = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());
    let hook = Arc::new(RecordingHook::default());
    value.set_update_hook(Some(hook.clone()));
    value.start().unwrap();

    // Publishing 3 waits until 2 was taken, so 1 was committed with the hook.
    feed(&upstream, [1, 2, 3]).await;
    value.set_update_hook(None);
    feed(&upstream, [4]).await;
    upstream.close();
    value.stop().await;

    let events = hook.events.lock();
    assert!(events.contains(&"state 1".to_string()));
    assert!(!events.iter().any(|e| e.starts_with("input 4")));
}

// ============================================================================
// Faults
// ============================================================================

#[tokio::test]
async fn test_failed_update_leaves_state_and_continues() {
    let upstream = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());
    let observer = Arc::new(CollectFailures::default());
    value
        .add_transform(reject_negative())
        .unwrap()
        .add_transform(Accumulate::new())
        .unwrap()
        .set_failure_observer(observer.clone())
        .unwrap();
    value.start().unwrap();

    feed(&upstream, [1, -1, 2]).await;
    upstream.close();
    value.stop().await;

    let stats = value.stats();
    assert_eq!(stats.current_value, 3);
    assert_eq!(stats.update_count, 2);
    assert_eq!(stats.failed_updates, 1);

    let failures = observer.failures.lock();
    assert_eq!(
        *failures,
        vec![UpdateFailure {
            sequence: 1,
            transform: "no-negatives".to_string(),
            error: TransformError::rejected("negative input"),
        }]
    );
}

#[tokio::test]
async fn test_failed_update_keeps_earlier_transform_memory() {
    let upstream = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());
    value
        .add_transform(Difference::new())
        .unwrap()
        .add_transform(FnTransform::new("at-most-five", |i: i64, _: &i64| {
            if i > 5 {
                Err(TransformError::rejected("step too large"))
            } else {
                Ok(i)
            }
        }))
        .unwrap();
    value.start().unwrap();

    // 10 fails after Difference has recorded it, so 12 is measured from 10.
    feed(&upstream, [1, 10, 12]).await;
    upstream.close();
    value.stop().await;

    let stats = value.stats();
    assert_eq!(stats.current_value, 2);
    assert_eq!(stats.update_count, 2);
    assert_eq!(stats.failed_updates, 1);
}

#[tokio::test]
async fn test_panicking_transform_is_contained() {
    let upstream = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());
    let observer = Arc::new(CollectFailures::default());
    value
        .add_transform(Accumulate::new())
        .unwrap()
        .add_transform(FnTransform::new("unlucky", |i: i64, _: &i64| {
            if i == 13 {
                panic!("thirteen");
            }
            Ok::<_, TransformError>(i)
        }))
        .unwrap()
        .set_failure_observer(observer.clone())
        .unwrap();
    value.start().unwrap();

    // Accumulated values: 6, 13 (panics, discarded), 6 + 8 = 14.
    feed(&upstream, [6, 7, 8]).await;
    upstream.close();
    value.stop().await;

    assert_eq!(value.value(), 14);
    let failures = observer.failures.lock();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].transform, "unlucky");
    assert_eq!(
        failures[0].error,
        TransformError::Panicked("thirteen".to_string())
    );
}

#[tokio::test]
async fn test_halt_policy_ends_consumer() {
    let upstream = Arc::new(Fanout::new());
    let value = Value::new(upstream.clone());
    value
        .add_transform(reject_negative())
        .unwrap()
        .add_transform(Accumulate::new())
        .unwrap()
        .set_fault_policy(FaultPolicy::Halt)
        .unwrap();
    value.start().unwrap();

    feed(&upstream, [1, -1, 2]).await;

    // The upstream stays open; the consumer exits on its own.
    value.stop().await;
    assert_eq!(value.state(), ValueState::Stopped);

    let stats = value.stats();
    assert_eq!(stats.current_value, 1);
    assert_eq!(stats.update_count, 1);
    assert_eq!(stats.failed_updates, 1);

    // The dropped subscription is pruned on the next publish.
    upstream.publish(5).await;
    assert_eq!(upstream.subscriber_count(), 0);
}

// ============================================================================
// Fork
// ============================================================================

#[tokio::test]
async fn test_fork_has_independent_transform_memory() {
    let upstream = Arc::new(Fanout::new());
    let original = Value::new(upstream.clone());
    original.add_transform(Difference::new()).unwrap();
    original.start().unwrap();

    feed(&upstream, [10, 15]).await;

    let fork = original.fork();
    assert_eq!(fork.state(), ValueState::Configured);
    assert_eq!(fork.stats().transform_count, 1);
    assert_eq!(fork.stats().update_count, 0);
    fork.start().unwrap();

    feed(&upstream, [20]).await;
    upstream.close();
    original.stop().await;
    fork.stop().await;

    // The original remembers 15; the fork saw 20 as its first sample.
    assert_eq!(original.value(), 5);
    assert_eq!(fork.value(), 0);
    assert_eq!(original.stats().update_count, 3);
    assert_eq!(fork.stats().update_count, 1);
}

#[test]
fn test_fork_copies_reset_on_read() {
    let value: Value<i64> = Value::with_initial(Arc::new(Fanout::new()), 7);
    value.enable_reset_on_read(0).unwrap();

    let fork = value.fork();
    assert!(fork.is_reset_on_read());
    assert_eq!(fork.value(), 7);
    assert_eq!(fork.value(), 0);
    // Reading the fork does not touch the original.
    assert_eq!(value.stats().current_value, 7);
}
