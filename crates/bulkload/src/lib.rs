//! bulkload compares batch insertion strategies by loading generated records
//! into SQLite and reporting time, memory, and round trips of each load.

use anyhow::Context;
use bulk_insert::StrategyId;

pub mod config;
pub mod harness;
pub mod logging;
pub mod report;

pub use config::{Config, ConfigArgs, ConfigError};
pub use harness::{Harness, Measurement};

/// Measure the time, memory, and store round trips of bulk insertion strategies.
#[derive(Debug, clap::Parser)]
#[clap(author, name = "bulkload", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,

    #[clap(flatten)]
    pub config: ConfigArgs,

    #[clap(flatten)]
    pub output: report::Output,

    #[clap(flatten)]
    pub log_args: logging::LogArgs,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Load records with each configured strategy in turn, and compare them.
    Compare,
    /// Load records with the staged strategy under each configured batch size.
    BatchSizes,
    /// Load records once with a single strategy.
    Run(RunArgs),
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Strategy to load with.
    #[clap(long, value_enum)]
    pub strategy: StrategyId,
}

/// Run the `command` of a parsed Cli, writing its report to stdout.
pub fn run(
    Cli {
        command,
        config,
        output,
        log_args: _,
    }: Cli,
) -> anyhow::Result<()> {
    let config = config.resolve().context("invalid configuration")?;
    tracing::debug!(?config, "resolved configuration");

    let mut harness = Harness::open(&config)
        .with_context(|| format!("failed to open database {}", config.database))?;

    let measurements = match command {
        Command::Compare => harness.compare(&config.strategies, config.batch_size)?,
        Command::BatchSizes => harness.sweep(&config.batch_sizes)?,
        Command::Run(RunArgs { strategy }) => vec![harness.measure(strategy, config.batch_size)?],
    };

    let mut stdout = std::io::stdout().lock();
    report::write_report(&mut stdout, output.output, &measurements)
}
