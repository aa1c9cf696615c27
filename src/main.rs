//! Command-line interface for simval
//!
//! # Usage Examples
//!
//! ## Run
//! ```bash
//! # Built-in demo: random 1..=10 every 100ms, ten reads every 500ms
//! simval run
//!
//! # Simulation file with overrides
//! simval run --config simulation.yaml --interval 50ms --reads 20 --read-every 1s
//!
//! # Trace every update of traced values
//! RUST_LOG=simval::trace=info simval run
//! ```
//!
//! ## Configuration
//! ```bash
//! # Check a file
//! simval validate --config simulation.yaml
//!
//! # Print the built-in configuration as a starting point
//! simval config > simulation.yaml
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use simval::config::parse_duration;
use simval::{Simulation, SimulationConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "simval")]
#[command(about = "Simulate values that change over time")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print its report
    Run(RunArgs),

    /// Validate a simulation file
    Validate {
        /// Simulation file (YAML)
        #[arg(long)]
        config: PathBuf,
    },

    /// Print the built-in simulation as YAML
    Config,
}

#[derive(Args)]
struct RunArgs {
    /// Simulation file (YAML); the built-in demo when omitted
    #[arg(long, env = "SIMVAL_CONFIG")]
    config: Option<PathBuf>,

    /// Master seed for random sources
    #[arg(long, env = "SIMVAL_SEED", conflicts_with = "random_seed")]
    seed: Option<u64>,

    /// Seed random sources from the wall clock
    #[arg(long)]
    random_seed: bool,

    /// Clock tick interval (e.g. 100ms, 1s)
    #[arg(long, value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Number of reads
    #[arg(long)]
    reads: Option<u32>,

    /// Time between reads (e.g. 500ms, 2s)
    #[arg(long, value_parser = parse_duration)]
    read_every: Option<Duration>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_simulation(args).await,
        Commands::Validate { config } => {
            let config = SimulationConfig::from_file(&config)
                .with_context(|| format!("Invalid simulation file {}", config.display()))?;
            println!(
                "OK: {} value(s), clock every {}, {} read(s) every {}",
                config.values.len(),
                simval::config::format_duration(&config.clock.interval),
                config.read.count,
                simval::config::format_duration(&config.read.interval),
            );
            Ok(())
        }
        Commands::Config => {
            print!("{}", SimulationConfig::default().to_yaml()?);
            Ok(())
        }
    }
}

async fn run_simulation(args: RunArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("Failed to load simulation file {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if args.random_seed {
        config = config.with_time_seed();
    }
    if let Some(interval) = args.interval {
        config = config.with_clock_interval(interval);
    }
    if let Some(reads) = args.reads {
        config = config.with_read_count(reads);
    }
    if let Some(read_every) = args.read_every {
        config = config.with_read_interval(read_every);
    }

    let shutdown = setup_shutdown_handler();
    let report = Simulation::new(config).run_until(shutdown).await?;

    match args.output {
        OutputFormat::Text => print!("{}", report.summary()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}

/// Cancels the returned token on Ctrl+C.
fn setup_shutdown_handler() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Received interrupt signal (Ctrl+C)");
        token.cancel();
    });

    shutdown
}
