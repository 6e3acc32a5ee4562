//! Command-line argument parsing for CardioPredict
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CardioPredict - Cardiovascular risk prediction from a model ensemble
#[derive(Parser, Debug)]
#[command(name = "cardiopredict")]
#[command(version)]
#[command(about = "Score cardiovascular risk with a stacked model ensemble", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Model directory (overrides config and MODEL_DIR)
    #[arg(long, global = true)]
    pub model_dir: Option<PathBuf>,

    /// Feature schema the artifacts were trained on (minimal, extended)
    #[arg(long, global = true)]
    pub schema: Option<String>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except results)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict risk for one JSON record
    Predict {
        /// Input file (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,
    },

    /// Predict risk for JSON lines, one record per line
    Batch {
        /// Input file (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print a telemetry summary after the batch
        #[arg(long)]
        summary: bool,
    },

    /// Report model availability
    Health {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List ensemble slots and their artifacts
    Slots,

    /// Display current configuration
    Config {
        /// Write the effective configuration to the config path
        #[arg(long)]
        init: bool,
    },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Check that a subcommand was given and flags agree
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_none() {
            return Err("No command given. Run 'cardiopredict --help' for usage.".to_string());
        }

        if self.quiet && self.verbose > 0 {
            return Err("Cannot combine --quiet with --verbose.".to_string());
        }

        Ok(())
    }
}

impl Verbosity {
    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show per-slot details
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }

    /// Default log filter for this verbosity
    pub fn log_level(&self) -> Option<&'static str> {
        match self {
            Verbosity::Quiet => Some("error"),
            Verbosity::Normal => None,
            Verbosity::Verbose => Some("debug"),
            Verbosity::VeryVerbose => Some("trace"),
        }
    }
}
