//! Market Twin CLI
//!
//! Simulates how a population of consumer agents reacts to a product offer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod report;

use commands::{GenerateArgs, SimulateArgs, SynthesizeArgs};
use config::TwinConfig;

#[derive(Parser)]
#[command(name = "twin")]
#[command(about = "Market twin - test product offers against synthetic consumers")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a product offer across a population file
    Simulate {
        /// Population CSV file
        #[arg(short, long)]
        population: PathBuf,

        /// Product description
        #[arg(long)]
        product: String,

        /// Price per unit
        #[arg(long)]
        price: f64,

        /// Unit of sale (defaults to the configured unit)
        #[arg(long)]
        unit: Option<String>,

        /// Write per-agent results as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the run summary as JSON
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Skip the strategy summary
        #[arg(long)]
        no_summary: bool,

        /// Maximum concurrent oracle calls
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Generate a targeted cohort
    Synthesize {
        /// Number of agents
        #[arg(short = 'n', long)]
        count: usize,

        /// Job title shared by the cohort
        #[arg(long)]
        job: String,

        #[arg(long)]
        min_age: u32,

        #[arg(long)]
        max_age: u32,

        /// Comma-separated locations
        #[arg(long)]
        locations: String,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Demographic tables (JSON) replacing the built-in ones
        #[arg(long)]
        tables: Option<PathBuf>,
    },

    /// Write reference population datasets
    GenerateDatasets {
        /// Dataset sizes, e.g. 100,500,1000
        #[arg(long, value_delimiter = ',')]
        sizes: Option<Vec<usize>>,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Demographic tables (JSON) replacing the built-in ones
        #[arg(long)]
        tables: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = match &cli.config {
        Some(path) => TwinConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => TwinConfig::from_env().context("Failed to read configuration from environment")?,
    };

    match cli.command {
        Commands::Simulate {
            population,
            product,
            price,
            unit,
            output,
            summary,
            no_summary,
            concurrency,
        } => {
            commands::simulate(
                &config,
                SimulateArgs {
                    population,
                    product,
                    price,
                    unit,
                    output,
                    summary,
                    no_summary,
                    concurrency,
                },
            )
            .await
        }
        Commands::Synthesize {
            count,
            job,
            min_age,
            max_age,
            locations,
            seed,
            output,
            tables,
        } => commands::synthesize(SynthesizeArgs {
            count,
            job,
            min_age,
            max_age,
            locations,
            seed,
            output,
            tables,
        }),
        Commands::GenerateDatasets {
            sizes,
            output_dir,
            seed,
            tables,
        } => commands::generate_datasets(
            &config,
            GenerateArgs {
                sizes,
                output_dir,
                seed,
                tables,
            },
        ),
    }
}
