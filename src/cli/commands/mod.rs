mod subcommands;


use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "colloquy")]
#[command(about = "Builder/Judge dialogue between two language models", version)]
pub struct Cli {
    /// Path to the configuration document
    #[arg(long, global = true, default_value = crate::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Start the dialogue (default)
    Run,
    /// Validate configuration, models, credentials and the memory store
    Check,
    /// Print the persisted conversation
    History {
        /// Only show the last N messages
        #[arg(long)]
        last: Option<usize>,
    },
    /// List registered model aliases
    Models,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            subcommands::run_command(&cli.config).await?;
        }
        Commands::Check => {
            subcommands::check_command(&cli.config).await?;
        }
        Commands::History { last } => {
            subcommands::history_command(&cli.config, last).await?;
        }
        Commands::Models => {
            subcommands::models_command(&cli.config)?;
        }
    }

    Ok(())
}
