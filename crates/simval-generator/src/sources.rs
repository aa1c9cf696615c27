//! Ready-made sources built from the generation functions.
//!
//! Random sources take one RNG stream from the registry when they are built,
//! so building them in the same order under the same master seed reproduces
//! the same values.

use crate::generators::{self, FloatRange, GeneratorError, IntRange};
use crate::seed::SeedRegistry;
use simval_core::{Publisher, Source, Tick};
use tracing::debug;

/// Source that emits `value` on every tick.
pub fn constant<P, T>(upstream: &P, value: T) -> Result<Source<T>, GeneratorError>
where
    P: Publisher<Tick> + ?Sized,
    T: Clone + Send + 'static,
{
    Ok(Source::new(upstream, generators::constant(value))?)
}

/// Source that emits `start`, `start + 1`, ... following the tick sequence.
pub fn sequential<P>(upstream: &P, start: i64) -> Result<Source<i64>, GeneratorError>
where
    P: Publisher<Tick> + ?Sized,
{
    Ok(Source::new(upstream, generators::sequential(start))?)
}

/// Source of uniformly distributed integers in `[min, max]`.
pub fn random_int<P>(
    upstream: &P,
    seeds: &SeedRegistry,
    min: i64,
    max: i64,
) -> Result<Source<i64>, GeneratorError>
where
    P: Publisher<Tick> + ?Sized,
{
    let range = IntRange::new(min, max)?;
    let mut rng = seeds.next_rng();
    debug!(min, max, "Building random integer source");
    Ok(Source::new(upstream, move |_| range.sample(&mut rng))?)
}

/// Source of uniformly distributed floats in `[min, max]`.
pub fn random_float<P>(
    upstream: &P,
    seeds: &SeedRegistry,
    min: f64,
    max: f64,
) -> Result<Source<f64>, GeneratorError>
where
    P: Publisher<Tick> + ?Sized,
{
    let range = FloatRange::new(min, max)?;
    let mut rng = seeds.next_rng();
    debug!(min, max, "Building random float source");
    Ok(Source::new(upstream, move |_| range.sample(&mut rng))?)
}
