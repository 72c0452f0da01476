// ABOUTME: Entry point for the haven-verify CLI application.
// ABOUTME: Parses arguments, loads the env file and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use haven_verify::diagnostics::Diagnostics;
use haven_verify::error::Result;
use haven_verify::report::Output;
use std::env;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut output = Output::new(cli.output_mode());

    if let Err(e) = run(cli, &mut output) {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

/// Env files are applied here, before the async runtime exists, because
/// setting variables is only sound while the process is single-threaded.
fn run(cli: Cli, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let mut diag = Diagnostics::default();

    match cli.command {
        Commands::Init { force } => commands::init(&cwd, force, output),
        Commands::CheckEnv => {
            let suite = commands::load_suite(cli.config.as_deref(), &cwd).ok();
            commands::load_env_files(suite.as_ref(), &cwd, &mut diag)?;
            commands::check_env(output, &diag)
        }
        Commands::Run { scenarios, mode } => {
            let suite = commands::load_suite(cli.config.as_deref(), &cwd)?;
            commands::load_env_files(Some(&suite), &cwd, &mut diag)?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(commands::run(suite, &scenarios, mode, output, diag))
        }
    }
}
