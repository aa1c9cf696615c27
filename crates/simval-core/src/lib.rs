//! Concurrent synthetic-value pipeline
//!
//! Produces values that change over time the way real measurements do, for
//! load testing and for exercising code that polls metrics.
//!
//! # Architecture
//!
//! A pipeline is a chain of independent background tasks:
//!
//! - [`Clock`] emits a [`Tick`] every interval
//! - [`Source`] turns each tick into a value and multicasts it
//! - [`Value`] runs each received value through its [`Transform`] steps and
//!   stores the result for synchronous readers
//!
//! Clocks and sources hand out subscriptions through the [`Publisher`]
//! trait. Every subscriber has its own single-slot delivery queue, so a slow
//! consumer holds its producer back instead of losing items.
//!
//! Shutdown flows from the top: stopping the clock closes the source's
//! stream, which closes every value's stream, after which [`Value::stop`]
//! returns.
//!
//! Every background task is spawned onto the ambient tokio runtime; a runtime
//! must be current when `start`/`new` is called.

pub mod clock;
pub mod error;
pub mod hook;
pub mod publisher;
pub mod source;
pub mod transform;
pub mod value;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ClockStats, Tick};
pub use error::{Error, Result, TransformError};
pub use hook::{FailureObserver, FaultPolicy, LogFailures, TraceHook, UpdateFailure, UpdateHook};
pub use publisher::{Fanout, Publisher, Subscription, DELIVERY_BUFFER};
pub use source::{Source, SourceStats};
pub use transform::{Accumulate, Clamp, Difference, FnTransform, Transform};
pub use value::{Value, ValueState, ValueStats};
