//! simval library
//!
//! Synthetic values that change over time, for load testing and for
//! exercising code that polls metrics.
//!
//! # Features
//!
//! - Periodic clock driving tick-based sources
//! - Seeded random sources, reproducible from one master seed
//! - Transform pipelines per value (accumulate, difference, clamp, custom)
//! - Reset-on-read values that never lose or double-count an update
//! - YAML-described simulations with text and JSON reports
//!
//! # Crates
//!
//! - `simval_core` - clock, sources, transforms and the value state machine
//! - `simval_generator` - seed registry, generation functions and ready-made sources
//!
//! # CLI Usage
//!
//! ```bash
//! # Run the built-in demo simulation
//! simval run
//!
//! # Run a simulation file with a different seed, printing JSON
//! simval run --config simulation.yaml --seed 7 --output json
//!
//! # Check a simulation file without running it
//! simval validate --config simulation.yaml
//! ```

pub mod config;
pub mod report;
pub mod simulation;

pub use config::{ConfigError, SimulationConfig};
pub use report::SimulationReport;
pub use simulation::Simulation;
