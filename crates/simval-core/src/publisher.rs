//! Subscription capability shared by clocks and sources.
//!
//! A [`Publisher`] hands out one [`Subscription`] per `subscribe` call. The
//! [`Fanout`] registry backs every publisher in this crate: it keeps one
//! bounded delivery queue per subscriber and delivers each published item to
//! all of them (multicast, not a shared work queue).
//!
//! # Delivery policy
//!
//! Each subscriber queue holds a single item ([`DELIVERY_BUFFER`]). When a
//! subscriber has not taken the previous item yet, `publish` waits for it.
//! Items are never dropped for a live subscriber and never coalesced; a slow
//! subscriber slows the producer down.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Capacity of every per-subscriber delivery queue.
pub const DELIVERY_BUFFER: usize = 1;

/// Anything that can be subscribed to.
pub trait Publisher<T>: Send + Sync {
    /// Register a new independent subscriber.
    ///
    /// The subscriber receives every item published after this call. If the
    /// publisher has already finished, the returned subscription is closed.
    fn subscribe(&self) -> Subscription<T>;
}

impl<T, P> Publisher<T> for Arc<P>
where
    P: Publisher<T> + ?Sized,
{
    fn subscribe(&self) -> Subscription<T> {
        (**self).subscribe()
    }
}

/// Receiving end of one subscriber's delivery queue.
pub struct Subscription<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    /// Wait for the next item.
    ///
    /// Returns `None` once the publisher closed and every queued item has
    /// been received.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

struct FanoutState<T> {
    subscribers: Vec<mpsc::Sender<T>>,
    closed: bool,
}

/// Registry of per-subscriber delivery queues.
pub struct Fanout<T> {
    state: Mutex<FanoutState<T>>,
}

impl<T> Fanout<T> {
    /// Create an empty, open registry.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FanoutState {
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Close the registry.
    ///
    /// Every subscriber observes end-of-stream once it has drained the items
    /// already queued for it. Later subscriptions are closed immediately.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.subscribers.clear();
    }

    /// Whether [`Fanout::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of subscribers whose receiving end is still alive.
    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .subscribers
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

impl<T> Default for Fanout<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send> Fanout<T> {
    /// Register a subscriber and return its receiving end.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(DELIVERY_BUFFER);
        let mut state = self.state.lock();
        if !state.closed {
            state.subscribers.push(tx);
        }
        Subscription { receiver: rx }
    }

    /// Deliver `item` to every registered subscriber, in registration order.
    ///
    /// Waits on each subscriber whose queue is full. Subscribers that dropped
    /// their receiving end are pruned. Returns how many subscribers accepted
    /// the item.
    pub async fn publish(&self, item: T) -> usize {
        let targets: Vec<mpsc::Sender<T>> = self.state.lock().subscribers.clone();

        let mut delivered = 0;
        for tx in &targets {
            if tx.send(item.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        if delivered < targets.len() {
            self.state
                .lock()
                .subscribers
                .retain(|tx| !tx.is_closed());
        }

        delivered
    }
}

impl<T: Clone + Send> Publisher<T> for Fanout<T> {
    fn subscribe(&self) -> Subscription<T> {
        Fanout::subscribe(self)
    }
}

/// Closes a shared [`Fanout`] when dropped.
///
/// Background tasks hold one so their subscribers see end-of-stream even if
/// the task unwinds.
pub(crate) struct CloseOnDrop<T> {
    fanout: Arc<Fanout<T>>,
}

impl<T> CloseOnDrop<T> {
    pub(crate) fn new(fanout: Arc<Fanout<T>>) -> Self {
        Self { fanout }
    }
}

impl<T> Drop for CloseOnDrop<T> {
    fn drop(&mut self) {
        self.fanout.close();
    }
}
