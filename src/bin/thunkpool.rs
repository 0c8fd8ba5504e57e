use std::process::exit;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use serde::Serialize;

use thunkpool::scenarios::{self, Scenario, SAMPLE_DATA};
use thunkpool::{DispatcherThreadPool, RayonThreadPool, Result, SharedQueueThreadPool, ThreadPool};

#[derive(Parser)]
#[command(name = "thunkpool", version, about = "Exercise a fixed-size worker thread pool")]
struct Cli {
    /// Pool implementation to run on
    #[arg(long, value_enum, default_value_t = PoolKind::Shared)]
    pool: PoolKind,

    /// Number of worker threads [default: number of CPUs]
    #[arg(long, value_name = "N")]
    threads: Option<u32>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PoolKind {
    /// Workers pull from a shared queue
    Shared,
    /// A dispatcher thread assigns jobs to idle workers
    Dispatcher,
    /// rayon's work-stealing pool
    Rayon,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Sum integers in parallel chunks
    Sum {
        /// Values to sum [default: built-in sample data]
        #[arg(allow_negative_numbers = true)]
        values: Vec<i64>,

        /// Number of chunks [default: number of threads]
        #[arg(long, value_name = "N")]
        chunks: Option<usize>,
    },
    /// Run a named smoke check against the pool
    Check {
        /// The check to run
        #[arg(value_enum, required_unless_present = "all")]
        name: Option<Scenario>,

        /// Run every check
        #[arg(long, conflicts_with = "name")]
        all: bool,
    },
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.pool {
        PoolKind::Shared => run::<SharedQueueThreadPool>(cli),
        PoolKind::Dispatcher => run::<DispatcherThreadPool>(cli),
        PoolKind::Rayon => run::<RayonThreadPool>(cli),
    };
    if let Err(e) = result {
        error!("{}", e);
        exit(1);
    }
}

fn run<P: ThreadPool>(cli: Cli) -> Result<()> {
    let threads = cli.threads.unwrap_or_else(|| num_cpus::get() as u32);
    info!("thunkpool {}", env!("CARGO_PKG_VERSION"));
    info!("Worker threads: {}", threads);

    match cli.command {
        Commands::Sum { values, chunks } => {
            let data = if values.is_empty() {
                SAMPLE_DATA.to_vec()
            } else {
                values
            };
            let pool = P::new(threads)?;
            let chunks = chunks.unwrap_or(threads as usize);
            let report = scenarios::sum_chunks(&pool, &data, chunks)?;
            match cli.format {
                Format::Text => println!("Total sum of elements: {}", report.total),
                Format::Json => print_json(&report)?,
            }
        }
        Commands::Check { name, all } => {
            let selected = match name {
                Some(scenario) if !all => vec![scenario],
                _ => Scenario::ALL.to_vec(),
            };
            for scenario in selected {
                let report = scenarios::run_scenario::<P>(scenario, threads)?;
                match cli.format {
                    Format::Text => println!(
                        "{}: ok in {} ms ({} completed, {} panicked)",
                        report.scenario,
                        report.elapsed_ms,
                        report.stats.completed,
                        report.stats.panicked
                    ),
                    Format::Json => print_json(&report)?,
                }
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
