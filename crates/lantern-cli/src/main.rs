//! # Lantern CLI
//!
//! Command-line interface for the Lantern indexing engine.
//!
//! ## Commands
//!
//! - `lantern index` - Scan the configured roots and print the catalog
//! - `lantern status` - Show configured roots and index statistics
//! - `lantern watch` - Keep scanning and follow filesystem changes
//! - `lantern bookmarks` - Parse or discover browser bookmarks
//! - `lantern clear` - Delete the cached index configuration
//!
//! ## Example Usage
//!
//! ```bash
//! # Scan the configured roots once
//! lantern index
//!
//! # Print the catalog as JSON
//! lantern index --output json
//!
//! # Follow filesystem changes
//! lantern watch
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Lantern - file and bookmark indexing for launchers
#[derive(Parser)]
#[command(name = "lantern")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the configured roots once and print the catalog
    Index {
        /// Extra roots to index for this run (default settings)
        #[arg(short, long)]
        root: Vec<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Show configured roots and index statistics
    Status,

    /// Keep scanning and follow filesystem changes
    Watch,

    /// Parse or discover browser bookmarks
    Bookmarks {
        /// Only list discovered source files, do not parse them
        #[arg(short, long)]
        discover: bool,
    },

    /// Delete the cached index configuration
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => lantern_core::Config::load_from(path)?,
        None => lantern_core::Config::load()?,
    };

    // Execute command
    match cli.command {
        Commands::Index { root, output } => commands::index::run(config, root, output),
        Commands::Status => commands::status::run(config),
        Commands::Watch => commands::watch::run(config),
        Commands::Bookmarks { discover } => commands::bookmarks::run(config, discover),
        Commands::Clear { yes } => commands::clear::run(config, yes),
    }
}
