//! Safext CLI - Command-line utility for secure archive extraction.

mod cli;
mod commands;
mod error;
mod output;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

fn init_logger(verbose: bool, quiet: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {}: {}",
                record.level(),
                record.target(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .context("failed to install logger")
}

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_logger(cli.verbose, cli.quiet)?;

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    match &cli.command {
        cli::Commands::Extract(args) => commands::extract::execute(args, &*formatter),
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            Ok(())
        }
    }
}
