//! Transform steps applied by a value's consumer task.
//!
//! A transform maps `(input, prior state)` to the next state. Steps run in
//! registration order: the first step sees the raw input, later steps see the
//! previous step's output, and every step sees the state as it was before the
//! current update began.
//!
//! Memory a transform needs across updates (e.g. the last sample kept by
//! [`Difference`]) lives in the transform instance. Values never share an
//! instance: [`Transform::fresh`] produces the independent copy used when a
//! value is forked.
//!
//! A failed update leaves the value's state alone but not the memory of the
//! steps that ran before the failing one: those have already seen the input.

use crate::error::TransformError;
use std::marker::PhantomData;
use std::ops::{Add, Sub};

/// One named step of a value's pipeline.
pub trait Transform<T>: Send {
    /// Name reported to update hooks and failure observers.
    fn name(&self) -> &str;

    /// Compute the next state from `input` and the pre-update state.
    fn apply(&mut self, input: T, prior: &T) -> Result<T, TransformError>;

    /// An independent copy of this transform with its memory reset.
    fn fresh(&self) -> Box<dyn Transform<T>>;
}

/// Adds each input to the prior state.
///
/// Holds no memory of its own, so on a reset-on-read value every read
/// returns the sum of the inputs committed since the previous read.
pub struct Accumulate<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Accumulate<T> {
    /// Create an accumulator.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Accumulate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Transform<T> for Accumulate<T>
where
    T: Add<Output = T> + Clone + Send + 'static,
{
    fn name(&self) -> &str {
        "accumulate"
    }

    fn apply(&mut self, input: T, prior: &T) -> Result<T, TransformError> {
        Ok(prior.clone() + input)
    }

    fn fresh(&self) -> Box<dyn Transform<T>> {
        Box::new(Self::new())
    }
}

/// Emits the change between consecutive inputs.
///
/// The first input yields `T::default()`.
pub struct Difference<T> {
    last: Option<T>,
}

impl<T> Difference<T> {
    /// Create a difference step with no previous input.
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl<T> Default for Difference<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Transform<T> for Difference<T>
where
    T: Sub<Output = T> + Clone + Default + Send + 'static,
{
    fn name(&self) -> &str {
        "difference"
    }

    fn apply(&mut self, input: T, _prior: &T) -> Result<T, TransformError> {
        Ok(match self.last.replace(input.clone()) {
            Some(previous) => input - previous,
            None => T::default(),
        })
    }

    fn fresh(&self) -> Box<dyn Transform<T>> {
        Box::new(Self::new())
    }
}

/// Bounds the input to `[min, max]`.
pub struct Clamp<T> {
    min: T,
    max: T,
}

impl<T> Clamp<T> {
    /// Bound outputs to `[min, max]`.
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T> Transform<T> for Clamp<T>
where
    T: PartialOrd + Clone + Send + 'static,
{
    fn name(&self) -> &str {
        "clamp"
    }

    fn apply(&mut self, input: T, _prior: &T) -> Result<T, TransformError> {
        Ok(if input < self.min {
            self.min.clone()
        } else if input > self.max {
            self.max.clone()
        } else {
            input
        })
    }

    fn fresh(&self) -> Box<dyn Transform<T>> {
        Box::new(Self::new(self.min.clone(), self.max.clone()))
    }
}

/// Adapts a closure into a named transform.
///
/// `fresh` clones the closure, captured state included.
pub struct FnTransform<F> {
    name: String,
    f: F,
}

impl<F> FnTransform<F> {
    /// Wrap `f` under the given name.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<T, F> Transform<T> for FnTransform<F>
where
    F: FnMut(T, &T) -> Result<T, TransformError> + Clone + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, input: T, prior: &T) -> Result<T, TransformError> {
        (self.f)(input, prior)
    }

    fn fresh(&self) -> Box<dyn Transform<T>> {
        Box::new(Self::new(self.name.clone(), self.f.clone()))
    }
}
