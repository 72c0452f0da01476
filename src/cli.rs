// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use haven_verify::pipeline::PipelineMode;
use haven_verify::report::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "haven-verify")]
#[command(about = "Staged lifecycle verification for the Haven AKS module")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print one JSON report per scenario
    #[arg(long, global = true)]
    pub json: bool,

    /// Suite file (default: haven-verify.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a haven-verify.yml suite file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run scenarios and tear down everything they create
    Run {
        /// Scenario to run (repeatable; default: all)
        #[arg(short, long = "scenario", value_name = "NAME")]
        scenarios: Vec<String>,

        /// Override the pipeline mode of every selected scenario
        #[arg(short, long, value_enum)]
        mode: Option<PipelineMode>,
    },

    /// Check that the required ARM_* credentials are present
    CheckEnv,
}
