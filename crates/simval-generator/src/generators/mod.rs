//! Generation functions for sources.
//!
//! Tick-driven functions (`constant`, `sequential`) map a [`Tick`] straight
//! to a value. RNG-driven functions in [`numeric`] draw from a caller-owned
//! RNG, normally one stream from a [`crate::SeedRegistry`].

pub mod numeric;

pub use numeric::{float_range, int_range, weighted_bool, FloatRange, IntRange};

use simval_core::Tick;
use thiserror::Error;

/// Errors raised while building a generator or a generated source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    /// Lower bound above upper bound, or a non-finite bound.
    #[error("Invalid range: min {min} must not exceed max {max}")]
    InvalidRange { min: String, max: String },

    /// Probability outside `[0, 1]`.
    #[error("Invalid probability {0}: must be within [0, 1]")]
    InvalidProbability(f64),

    /// The pipeline refused to build the source.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] simval_core::Error),
}

/// Always produce `value`.
pub fn constant<T>(value: T) -> impl FnMut(Tick) -> T + Send + 'static
where
    T: Clone + Send + 'static,
{
    move |_| value.clone()
}

/// Produce `start + tick.sequence`.
pub fn sequential(start: i64) -> impl FnMut(Tick) -> i64 + Send + 'static {
    move |tick| start.wrapping_add(tick.sequence as i64)
}
