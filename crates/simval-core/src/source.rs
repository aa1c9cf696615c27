//! Tick-driven value sources.

use crate::clock::Tick;
use crate::error::{usage_error, Error, Result};
use crate::publisher::{CloseOnDrop, Fanout, Publisher, Subscription};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Read-only snapshot of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceStats {
    /// Values computed so far (one per received tick).
    pub generation_count: u64,
    /// Subscribers currently registered.
    pub subscriber_count: usize,
}

struct Shared<T> {
    fanout: Arc<Fanout<T>>,
    generated: AtomicU64,
}

/// Turns ticks into values and multicasts them.
///
/// The source subscribes to its upstream once, at construction, and runs a
/// background task that calls the generation function exactly once per tick.
/// Every subscriber receives every value produced after it subscribed. When
/// the upstream closes, the in-flight value is still delivered and then every
/// subscriber's stream is closed.
///
/// `Source` is a cheap handle; clones share the same task and subscribers.
pub struct Source<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Source<T> {
    /// Subscribe to `upstream` and start generating.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<P, F>(upstream: &P, generate: F) -> Result<Self>
    where
        P: Publisher<Tick> + ?Sized,
        F: FnMut(Tick) -> T + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            usage_error(Error::NoRuntime {
                component: "source",
            })
        })?;

        let ticks = upstream.subscribe();
        let shared = Arc::new(Shared {
            fanout: Arc::new(Fanout::new()),
            generated: AtomicU64::new(0),
        });
        runtime.spawn(run(ticks, generate, shared.clone()));

        Ok(Self { shared })
    }
}

impl<T> Source<T> {
    /// Snapshot of generation and subscriber counts.
    pub fn stats(&self) -> SourceStats {
        SourceStats {
            generation_count: self.shared.generated.load(Ordering::SeqCst),
            subscriber_count: self.shared.fanout.subscriber_count(),
        }
    }

    /// Whether the upstream closed and this source stopped producing.
    pub fn is_finished(&self) -> bool {
        self.shared.fanout.is_closed()
    }
}

impl<T: Clone + Send + 'static> Publisher<T> for Source<T> {
    fn subscribe(&self) -> Subscription<T> {
        self.shared.fanout.subscribe()
    }
}

async fn run<T, F>(mut ticks: Subscription<Tick>, mut generate: F, shared: Arc<Shared<T>>)
where
    T: Clone + Send + 'static,
    F: FnMut(Tick) -> T + Send + 'static,
{
    let _close = CloseOnDrop::new(shared.fanout.clone());

    while let Some(tick) = ticks.recv().await {
        let value = generate(tick);
        shared.generated.fetch_add(1, Ordering::SeqCst);
        shared.fanout.publish(value).await;
    }

    debug!(
        generated = shared.generated.load(Ordering::SeqCst),
        "Source upstream closed"
    );
}
