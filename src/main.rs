mod cli;
mod commands;
mod error;
mod page_range;
mod pdf;

use clap::Parser;
use cli::Cli;
use commands::split::{OutputPlan, SplitOptions};
use error::SplitError;
use page_range::Indexing;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<SplitError>()
                .map_or(1, SplitError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Refuse before touching the filesystem.
    let plan = OutputPlan::new(cli.output, cli.per_page_dir)?;

    let options = SplitOptions {
        pages: cli.pages,
        indexing: if cli.zero_based {
            Indexing::ZeroBased
        } else {
            Indexing::OneBased
        },
        password: cli.password,
        json: cli.json,
    };

    commands::split::run(&cli.input, &plan, &options)
}
