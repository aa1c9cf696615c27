//! Periodic tick source.
//!
//! A [`Clock`] is created stopped. [`Clock::start`] spawns a background task
//! that emits a [`Tick`] every interval to every subscriber; [`Clock::stop`]
//! ends emission for good and closes every subscriber's stream. A clock
//! cannot be restarted.
//!
//! The first tick fires one interval after `start`. A subscriber that does
//! not keep up holds the clock back (see the delivery policy in
//! [`crate::publisher`]); after such a stall the next tick is scheduled one
//! full interval after the delayed one. Sequence numbers stay contiguous.
//!
//! Stopping while a tick is held back abandons that tick. Subscribers ahead
//! of the stalled one in the fan-out may already have it, the rest never see
//! it, and it is not counted in [`ClockStats::tick_count`].

use crate::error::{usage_error, Error, Result};
use crate::publisher::{CloseOnDrop, Fanout, Publisher, Subscription};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const COMPONENT: &str = "clock";

/// A single timing signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Zero-based position of this tick in the clock's emission order.
    pub sequence: u64,
    /// Scheduled emission time.
    pub at: Instant,
}

/// Read-only snapshot of a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockStats {
    /// Ticks delivered to every subscriber so far. A final tick abandoned
    /// by `stop` partway through delivery is not counted.
    pub tick_count: u64,
    /// Whether the clock is currently emitting.
    pub running: bool,
    /// Configured tick interval.
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Stopped,
}

struct Counters {
    ticks: AtomicU64,
    running: AtomicBool,
}

/// Emits ticks at a fixed interval to any number of subscribers.
pub struct Clock {
    interval: Duration,
    fanout: Arc<Fanout<Tick>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
    phase: Mutex<Phase>,
}

impl Clock {
    /// Create a stopped clock.
    pub fn new(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(usage_error(Error::ZeroInterval));
        }

        Ok(Self {
            interval,
            fanout: Arc::new(Fanout::new()),
            counters: Arc::new(Counters {
                ticks: AtomicU64::new(0),
                running: AtomicBool::new(false),
            }),
            cancel: CancellationToken::new(),
            phase: Mutex::new(Phase::Idle),
        })
    }

    /// Configured tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Begin emitting ticks.
    ///
    /// Must be called from within a tokio runtime. Fails if the clock is
    /// already running or has been stopped.
    pub fn start(&self) -> Result<()> {
        let mut phase = self.phase.lock();
        match *phase {
            Phase::Running => {
                return Err(usage_error(Error::AlreadyRunning {
                    component: COMPONENT,
                }))
            }
            Phase::Stopped => {
                return Err(usage_error(Error::Stopped {
                    component: COMPONENT,
                }))
            }
            Phase::Idle => {}
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            usage_error(Error::NoRuntime {
                component: COMPONENT,
            })
        })?;

        self.counters.running.store(true, Ordering::SeqCst);
        runtime.spawn(run(
            self.interval,
            self.fanout.clone(),
            self.counters.clone(),
            self.cancel.clone(),
        ));
        *phase = Phase::Running;

        debug!(interval = ?self.interval, "Clock started");
        Ok(())
    }

    /// Stop emitting ticks permanently and close every subscriber's stream.
    ///
    /// Calling `stop` again, or on a clock that never started, is a no-op
    /// beyond closing the streams.
    pub fn stop(&self) {
        let mut phase = self.phase.lock();
        if *phase == Phase::Stopped {
            return;
        }
        *phase = Phase::Stopped;

        self.counters.running.store(false, Ordering::SeqCst);
        self.cancel.cancel();
        self.fanout.close();

        debug!(
            ticks = self.counters.ticks.load(Ordering::Relaxed),
            "Clock stopped"
        );
    }

    /// Whether the clock is currently emitting.
    pub fn is_running(&self) -> bool {
        self.counters.running.load(Ordering::SeqCst)
    }

    /// Snapshot of tick count, running flag and interval.
    pub fn stats(&self) -> ClockStats {
        ClockStats {
            tick_count: self.counters.ticks.load(Ordering::SeqCst),
            running: self.is_running(),
            interval: self.interval,
        }
    }
}

impl Publisher<Tick> for Clock {
    fn subscribe(&self) -> Subscription<Tick> {
        self.fanout.subscribe()
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.fanout.close();
    }
}

async fn run(
    interval: Duration,
    fanout: Arc<Fanout<Tick>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
) {
    let _close = CloseOnDrop::new(fanout.clone());

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut sequence = 0u64;
    loop {
        let at = tokio::select! {
            _ = cancel.cancelled() => break,
            at = ticker.tick() => at,
        };

        let tick = Tick { sequence, at };
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = fanout.publish(tick) => {}
        }

        sequence += 1;
        counters.ticks.fetch_add(1, Ordering::SeqCst);
    }

    trace!(ticks = sequence, "Clock task exiting");
}
