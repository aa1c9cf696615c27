//! Seeded value generation for simval pipelines.
//!
//! This crate provides the generation functions that turn clock ticks into
//! values, plus a [`SeedRegistry`] that makes random sources reproducible.
//!
//! # Architecture
//!
//! ```text
//!   SeedRegistry (master seed)
//!        │  next_rng() → stream 0, 1, 2, ...
//!        ▼
//! ┌─────────────────────┐
//! │  sources::random_*  │ ◄── Clock ticks
//! │                     │
//! │  - range (checked)  │
//! │  - rng (StdRng)     │
//! └──────────┬──────────┘
//!            │
//!            ▼
//!      Source<T> → Value<T>
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use simval_core::{Accumulate, Clock, Value};
//! use simval_generator::{sources, SeedRegistry};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let seeds = SeedRegistry::new(12345);
//! let clock = Clock::new(Duration::from_millis(100))?;
//! let requests = sources::random_int(&clock, &seeds, 1, 10)?;
//!
//! let total = Value::new(requests);
//! total.add_transform(Accumulate::new())?;
//! total.start()?;
//! clock.start()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Generators
//!
//! - `constant` - Same value on every tick
//! - `sequential` - `start + tick sequence`
//! - `int_range` - Uniform integer in an inclusive range
//! - `float_range` - Uniform float in an inclusive range
//! - `weighted_bool` - Boolean with configurable true probability

pub mod generators;
pub mod seed;
pub mod sources;

pub use generators::GeneratorError;
pub use seed::{SeedRegistry, SeedState};
