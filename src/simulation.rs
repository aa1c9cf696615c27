//! Simulation runner.
//!
//! Builds one clock → source → values pipeline from a [`SimulationConfig`],
//! reads every value on a fixed schedule and shuts the pipeline down in
//! order: clock first, then each value once it has drained.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use simval_core::{Clock, Source, TraceHook, Value};
use simval_generator::{sources, SeedRegistry};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{SimulationConfig, SourceConfig, ValueConfig};
use crate::report::{SimulationReport, ValueReport};

/// A configured simulation, ready to run.
pub struct Simulation {
    config: SimulationConfig,
}

struct RunningValue<'a> {
    config: &'a ValueConfig,
    value: Value<i64>,
    reads: Vec<i64>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run every configured read, then shut down.
    pub async fn run(&self) -> anyhow::Result<SimulationReport> {
        self.run_until(CancellationToken::new()).await
    }

    /// Run until every read completed or `shutdown` is cancelled, whichever
    /// comes first. Either way the pipeline is drained before returning.
    pub async fn run_until(
        &self,
        shutdown: CancellationToken,
    ) -> anyhow::Result<SimulationReport> {
        self.config
            .validate()
            .context("Simulation configuration is invalid")?;

        let seeds = match self.config.seed {
            Some(seed) => SeedRegistry::new(seed),
            None => SeedRegistry::from_time(),
        };
        info!(
            master_seed = seeds.current().master_seed,
            values = self.config.values.len(),
            "Starting simulation"
        );

        let clock = Clock::new(self.config.clock.interval).context("Failed to create clock")?;
        let source = build_source(&self.config.source, &clock, &seeds)?;

        let mut running = Vec::with_capacity(self.config.values.len());
        for value_config in &self.config.values {
            let value = build_value(value_config, &source)
                .with_context(|| format!("Failed to build value '{}'", value_config.name))?;
            running.push(RunningValue {
                config: value_config,
                value,
                reads: Vec::new(),
            });
        }

        // Values subscribe before the first tick so none of them misses it.
        for entry in &running {
            entry
                .value
                .start()
                .with_context(|| format!("Failed to start value '{}'", entry.config.name))?;
        }
        clock.start().context("Failed to start clock")?;
        let started_at = Utc::now();

        let interrupted = read_values(&mut running, &self.config, &shutdown).await;

        clock.stop();
        for entry in &running {
            entry.value.stop().await;
            debug!(value = %entry.config.name, "Value drained");
        }
        let finished_at = Utc::now();

        let report = SimulationReport {
            seed: seeds.current(),
            started_at,
            finished_at,
            interrupted,
            clock: clock.stats().into(),
            source: source.stats().into(),
            values: running
                .into_iter()
                .map(|entry| {
                    ValueReport::new(
                        entry.config.name.clone(),
                        entry.config.reset_on_read,
                        entry.reads,
                        entry.value.stats(),
                    )
                })
                .collect(),
        };

        info!(
            ticks = report.clock.tick_count,
            interrupted,
            "Simulation finished"
        );
        Ok(report)
    }
}

/// Read every value `read.count` times. Returns `true` if cut short.
async fn read_values(
    running: &mut [RunningValue<'_>],
    config: &SimulationConfig,
    shutdown: &CancellationToken,
) -> bool {
    let mut ticker = tokio::time::interval(config.read.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for round in 0..config.read.count {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!(round, "Simulation interrupted");
                return true;
            }
            _ = ticker.tick() => {}
        }

        for entry in running.iter_mut() {
            let value = entry.value.value();
            entry.reads.push(value);
            info!(round, value = %entry.config.name, reading = value, "Read value");
        }
    }

    false
}

fn build_source(
    config: &SourceConfig,
    clock: &Clock,
    seeds: &SeedRegistry,
) -> anyhow::Result<Source<i64>> {
    let source = match *config {
        SourceConfig::Constant { value } => sources::constant(clock, value),
        SourceConfig::Sequential { start } => sources::sequential(clock, start),
        SourceConfig::IntRange { min, max } => sources::random_int(clock, seeds, min, max),
    };
    source.context("Failed to create source")
}

fn build_value(config: &ValueConfig, source: &Source<i64>) -> anyhow::Result<Value<i64>> {
    let value = Value::with_initial(source.clone(), config.initial);
    for transform in &config.transforms {
        value.add_boxed_transform(transform.build())?;
    }
    if config.reset_on_read {
        value.enable_reset_on_read(config.initial)?;
    }
    value.set_fault_policy(config.on_failure.into())?;
    if config.trace {
        value.set_update_hook(Some(Arc::new(TraceHook::new(config.name.clone()))));
    }
    Ok(value)
}
