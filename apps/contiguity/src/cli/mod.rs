//! # Contiguity CLI Module
//!
//! This module implements the CLI interface for the contiguity learner.
//!
//! ## Available Commands
//!
//! - `learn` - Incorporate every demonstration of a file and print the tree
//! - `next` - Show the actions that may run next
//! - `check` - Test a candidate demonstration against the learned tree
//! - `status` - Show tree metrics

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use contiguity_core::ContiguityError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Contiguity - learn task structure from demonstrations
///
/// Every command first learns from a demonstration file, then reports on
/// the resulting tree. Nothing is persisted between runs.
#[derive(Parser, Debug)]
#[command(name = "contiguity")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print results and warnings
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Learn from a demonstration file and print the tree
    Learn {
        /// Path to the demonstration file (JSON or text)
        #[arg(short, long)]
        file: PathBuf,

        /// Input format (json, text)
        #[arg(short = 't', long, default_value = "json")]
        format: String,
    },

    /// Show the actions that may legally run next
    Next {
        /// Path to the demonstration file (JSON or text)
        #[arg(short, long)]
        file: PathBuf,

        /// Input format (json, text)
        #[arg(short = 't', long, default_value = "json")]
        format: String,

        /// Actions already done, in execution order (comma-separated)
        #[arg(long)]
        done: Option<String>,
    },

    /// Check a candidate demonstration against the learned tree
    Check {
        /// Path to the demonstration file (JSON or text)
        #[arg(short, long)]
        file: PathBuf,

        /// Input format (json, text)
        #[arg(short = 't', long, default_value = "json")]
        format: String,

        /// Candidate demonstration (comma-separated)
        #[arg(short, long)]
        demonstration: String,
    },

    /// Show tree metrics
    Status {
        /// Path to the demonstration file (JSON or text)
        #[arg(short, long)]
        file: PathBuf,

        /// Input format (json, text)
        #[arg(short = 't', long, default_value = "json")]
        format: String,
    },
}

// =============================================================================
// OUTPUT SETTINGS
// =============================================================================

/// Output settings after merging CLI flags over the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    pub json: bool,
    pub indent: usize,
    pub quiet: bool,
}

impl Output {
    /// CLI flags win over file values.
    #[must_use]
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        Self {
            json: cli.json || config.output.json,
            indent: config.output.indent,
            quiet: cli.quiet,
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli, config: &Config) -> Result<(), ContiguityError> {
    let output = Output::resolve(&cli, config);

    match cli.command {
        Commands::Learn { file, format } => cmd_learn(config, output, &file, &format),
        Commands::Next { file, format, done } => {
            cmd_next(config, output, &file, &format, done.as_deref())
        }
        Commands::Check {
            file,
            format,
            demonstration,
        } => cmd_check(config, output, &file, &format, &demonstration),
        Commands::Status { file, format } => cmd_status(config, output, &file, &format),
    }
}
