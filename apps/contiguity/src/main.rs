//! # Contiguity - Demonstration Learner
//!
//! The main binary for the contiguity-tree engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          apps/contiguity (THE BINARY)        │
//! │                                              │
//! │  ┌─────────────┐   ┌──────────────────────┐  │
//! │  │   CLI       │   │  catalog / render /  │  │
//! │  │  (clap)     │   │  config (toml)       │  │
//! │  └──────┬──────┘   └──────────┬───────────┘  │
//! │         └──────────┬──────────┘              │
//! │                    ▼                         │
//! │           ┌─────────────────┐                │
//! │           │ contiguity-core │                │
//! │           │  (THE LOGIC)    │                │
//! │           └─────────────────┘                │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! contiguity learn -f demos.json
//! contiguity next -f demos.txt -t text --done boil,grind
//! contiguity check -f demos.json -d grind,boil,pour
//! contiguity status -f demos.json --json
//! ```

use clap::Parser;
use contiguity::cli;
use contiguity::config::{Config, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // A broken config file is reported after logging is up.
    let config = Config::load(cli.config.as_deref());
    let file_format = config
        .as_ref()
        .map(|c| c.logging.format)
        .unwrap_or_default();

    // CONTIGUITY_LOG_FORMAT=json enables machine-parseable output.
    let log_format = match std::env::var("CONTIGUITY_LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        Ok("text") => LogFormat::Text,
        _ => file_format,
    };
    init_tracing(log_format, cli.verbose, cli.quiet);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(format: LogFormat, verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "contiguity=debug"
    } else if quiet {
        "contiguity=warn"
    } else {
        "contiguity=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
