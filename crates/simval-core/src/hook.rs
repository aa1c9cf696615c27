//! Observers attached to a value's consumer task.
//!
//! [`UpdateHook`] sees every step of every update; [`FailureObserver`] sees
//! every update that a transform aborted. Both run on the consumer task.
//! Each individual notification is isolated: a panic inside one is caught and
//! logged, and neither the state commit nor the other notifications are
//! affected.

use crate::error::{panic_message, TransformError};
use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::{info, warn};

/// Notifications raised while a value processes one input.
///
/// All three run inside the value's state lock, in pipeline order, so a hook
/// always observes a consistent view. Keep them short: readers wait while a
/// hook runs.
pub trait UpdateHook<T>: Send + Sync {
    /// Raw input received, before any transform runs.
    fn on_input(&self, _input: &T, _prior: &T) {}

    /// One transform step completed. Fired once per transform.
    fn on_transform(&self, _name: &str, _input: &T, _output: &T, _prior: &T) {}

    /// The final state was committed.
    fn after_update(&self, _state: &T) {}
}

/// Logs every notification at `info` under the `simval::trace` target.
#[derive(Debug, Clone)]
pub struct TraceHook {
    label: String,
}

impl TraceHook {
    /// Create a hook whose log lines carry `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl<T: Debug> UpdateHook<T> for TraceHook {
    fn on_input(&self, input: &T, prior: &T) {
        info!(target: "simval::trace", value = %self.label, ?input, ?prior, "input");
    }

    fn on_transform(&self, name: &str, input: &T, output: &T, prior: &T) {
        info!(
            target: "simval::trace",
            value = %self.label,
            transform = name,
            ?input,
            ?output,
            ?prior,
            "transform"
        );
    }

    fn after_update(&self, state: &T) {
        info!(target: "simval::trace", value = %self.label, ?state, "updated");
    }
}

/// An update aborted by a failing transform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Update {sequence} failed in transform '{transform}': {error}")]
pub struct UpdateFailure {
    /// Zero-based position of the input in the value's subscription.
    pub sequence: u64,
    /// Name of the transform that failed.
    pub transform: String,
    /// What went wrong.
    pub error: TransformError,
}

/// Receives every failed update of a value.
pub trait FailureObserver: Send + Sync {
    fn on_failure(&self, failure: &UpdateFailure);
}

/// Default observer: logs the failure at `warn`.
#[derive(Debug, Clone, Default)]
pub struct LogFailures;

impl FailureObserver for LogFailures {
    fn on_failure(&self, failure: &UpdateFailure) {
        warn!("{failure}");
    }
}

/// What the consumer task does after a failed update.
///
/// Either way the value's state is kept as it was before the update. Transform
/// steps ahead of the failing one keep whatever memory the input gave them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Keep state unchanged and process the next input.
    #[default]
    Continue,
    /// Keep state unchanged and end the consumer task.
    Halt,
}

/// Run one observer notification, containing any panic.
///
/// Returns `false` if the notification panicked.
pub(crate) fn isolate(point: &'static str, f: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            warn!(
                hook = point,
                "Observer panicked: {}",
                panic_message(payload.as_ref())
            );
            false
        }
    }
}
