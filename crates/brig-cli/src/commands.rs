//! CLI command definitions.

use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch an event to the pipeline
    Dispatch {
        /// Path to the event JSON, or `-` for stdin
        event: PathBuf,

        /// Run jobs on this host instead of in containers
        #[arg(long)]
        local: bool,
    },

    /// Create a GitHub check run from CHECK_* environment variables
    CheckRun,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration, secrets redacted
    Show,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
