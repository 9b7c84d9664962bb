//! rabbit-replayer - RabbitMQ message recovery tool
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use rabbit_replayer::commands::{find_lost, full, replay, split};
use rabbit_replayer::config::{CliArgs, Command, RunConfig};
use rabbit_replayer::report;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;
    report::set_color_mode(args.color);

    let config = RunConfig::from_args(&args).context("Invalid configuration")?;

    match &args.command {
        Command::Full { replay, output } => {
            full::run(&config, *replay, *output).context("full command failed")
        }
        Command::FindLost {
            lost_messages,
            starts_with,
        } => find_lost::run(&config, lost_messages, *starts_with)
            .map(|_| ())
            .context("find-lost command failed"),
        Command::SplitMessages => split::run(&config).context("split-messages command failed"),
        Command::Replay => replay::run(&config).context("replay command failed"),
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("rabbit_replayer=debug,warn")
    } else {
        EnvFilter::new("rabbit_replayer=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
