//! brig CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod handlers;

use commands::{Commands, ConfigCommands, LogFormat};
use config::BrigConfig;

#[derive(Parser)]
#[command(name = "brig")]
#[command(author, version, long_about = None)]
#[command(about = "Dispatch CI events to jobs and GitHub check runs")]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Dispatch { event, local } => {
            let config = BrigConfig::load(cli.config.as_deref())?;
            handlers::dispatch(&config, &event, local).await?
        }
        Commands::CheckRun => {
            if let Err(failure) = handlers::check_run().await {
                eprintln!("Error: {}", failure.message);
                std::process::exit(failure.code);
            }
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let config = BrigConfig::load(cli.config.as_deref())?;
                handlers::show_config(&config)?
            }
        },
    }

    Ok(())
}
