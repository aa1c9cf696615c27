//! Simulation report types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use simval_core::{ClockStats, SourceStats, ValueStats};
use simval_generator::SeedState;

use crate::config::format_duration;

/// Result of a simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Seed used by random sources.
    pub seed: SeedState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Whether the run was interrupted before all reads completed.
    pub interrupted: bool,
    pub clock: ClockSnapshot,
    pub source: SourceSnapshot,
    /// Per-value results, in configuration order.
    pub values: Vec<ValueReport>,
}

/// Final clock state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub tick_count: u64,
    pub running: bool,
    pub interval: String,
}

impl From<ClockStats> for ClockSnapshot {
    fn from(stats: ClockStats) -> Self {
        Self {
            tick_count: stats.tick_count,
            running: stats.running,
            interval: format_duration(&stats.interval),
        }
    }
}

/// Final source state.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SourceSnapshot {
    pub generation_count: u64,
    pub subscriber_count: usize,
}

impl From<SourceStats> for SourceSnapshot {
    fn from(stats: SourceStats) -> Self {
        Self {
            generation_count: stats.generation_count,
            subscriber_count: stats.subscriber_count,
        }
    }
}

/// Reads and final state of one value.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValueReport {
    pub name: String,
    pub reset_on_read: bool,
    /// Every read taken during the run, in order.
    pub reads: Vec<i64>,
    pub update_count: u64,
    pub failed_updates: u64,
    /// State left after the last read and the final drain.
    pub final_value: i64,
    pub transform_count: usize,
}

impl ValueReport {
    pub fn new(
        name: impl Into<String>,
        reset_on_read: bool,
        reads: Vec<i64>,
        stats: ValueStats<i64>,
    ) -> Self {
        Self {
            name: name.into(),
            reset_on_read,
            reads,
            update_count: stats.update_count,
            failed_updates: stats.failed_updates,
            final_value: stats.current_value,
            transform_count: stats.transform_count,
        }
    }

    /// Sum of all reads.
    pub fn read_total(&self) -> i64 {
        self.reads.iter().sum()
    }

    /// Everything the value accumulated over the run.
    ///
    /// For a reset-on-read value this is every read plus what remained
    /// unread at the end; otherwise it is the final state.
    pub fn observed_total(&self) -> i64 {
        if self.reset_on_read {
            self.read_total() + self.final_value
        } else {
            self.final_value
        }
    }
}

impl SimulationReport {
    /// Look up a value by name.
    pub fn value(&self, name: &str) -> Option<&ValueReport> {
        self.values.iter().find(|v| v.name == name)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Generate a summary string.
    pub fn summary(&self) -> String {
        let status_str = if self.interrupted {
            "INTERRUPTED"
        } else {
            "COMPLETED"
        };

        let mut summary = format!(
            "Simulation Report: {}\n\
             =================\n\
             Seed: {} (streams used: {})\n\
             Duration: {:?}\n\n",
            status_str,
            self.seed.master_seed,
            self.seed.stream_counter,
            (self.finished_at - self.started_at)
                .to_std()
                .unwrap_or_default(),
        );

        summary.push_str(&format!(
            "Clock: ticks={} running={} interval={}\n\
             Source: generations={} subscribers={}\n",
            self.clock.tick_count,
            self.clock.running,
            self.clock.interval,
            self.source.generation_count,
            self.source.subscriber_count,
        ));

        for value in &self.values {
            summary.push_str(&format!(
                "\n{}:\n\
                 - Updates: {} (failed: {})\n\
                 - Current: {}\n\
                 - Transforms: {}\n",
                value.name,
                value.update_count,
                value.failed_updates,
                value.final_value,
                value.transform_count,
            ));
            if !value.reads.is_empty() {
                let reads: Vec<String> = value.reads.iter().map(|r| r.to_string()).collect();
                summary.push_str(&format!("- Reads: {}\n", reads.join(", ")));
            }
            if value.reset_on_read {
                summary.push_str(&format!(
                    "- Read total: {} (with unread remainder: {})\n",
                    value.read_total(),
                    value.observed_total(),
                ));
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> SimulationReport {
        let started_at = Utc::now();
        SimulationReport {
            seed: SeedState {
                master_seed: 12345,
                stream_counter: 1,
            },
            started_at,
            finished_at: started_at + chrono::Duration::milliseconds(1500),
            interrupted: false,
            clock: ClockSnapshot {
                tick_count: 15,
                running: false,
                interval: "100ms".to_string(),
            },
            source: SourceSnapshot {
                generation_count: 15,
                subscriber_count: 0,
            },
            values: vec![
                ValueReport::new(
                    "accumulated",
                    false,
                    vec![10, 40, 82],
                    ValueStats {
                        update_count: 15,
                        failed_updates: 0,
                        current_value: 82,
                        transform_count: 1,
                    },
                ),
                ValueReport::new(
                    "reset_on_read",
                    true,
                    vec![10, 30, 37],
                    ValueStats {
                        update_count: 15,
                        failed_updates: 0,
                        current_value: 5,
                        transform_count: 1,
                    },
                ),
            ],
        }
    }

    #[test]
    fn test_observed_totals() {
        let report = sample_report();

        let accumulated = report.value("accumulated").unwrap();
        assert_eq!(accumulated.read_total(), 132);
        assert_eq!(accumulated.observed_total(), 82);

        let window = report.value("reset_on_read").unwrap();
        assert_eq!(window.read_total(), 77);
        assert_eq!(window.observed_total(), 82);

        assert!(report.value("missing").is_none());
    }

    #[test]
    fn test_summary_mentions_every_component() {
        let summary = sample_report().summary();

        assert!(summary.starts_with("Simulation Report: COMPLETED"));
        assert!(summary.contains("Seed: 12345 (streams used: 1)"));
        assert!(summary.contains("Clock: ticks=15 running=false interval=100ms"));
        assert!(summary.contains("Source: generations=15 subscribers=0"));
        assert!(summary.contains("accumulated:"));
        assert!(summary.contains("- Reads: 10, 30, 37"));
        assert!(summary.contains("- Read total: 77 (with unread remainder: 82)"));
    }

    #[test]
    fn test_json_output() {
        let json = sample_report().to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["seed"]["master_seed"], 12345);
        assert_eq!(parsed["clock"]["interval"], "100ms");
        assert_eq!(parsed["values"][1]["name"], "reset_on_read");
        assert_eq!(parsed["values"][1]["reads"], serde_json::json!([10, 30, 37]));
    }
}
