use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod console;

#[derive(Parser)]
#[command(name = "powerhour")]
#[command(about = "Power Hour - run and replay sales-floor competition sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, validate and print the effective configuration
    CheckConfig {
        /// Config file (defaults to $POWERHOUR_CONFIG, then the user config dir)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run a session over a recorded JSON-lines event file
    Replay(commands::replay::ReplayArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { config } => commands::check_config::run(config)?,
        Commands::Replay(args) => commands::replay::run(args).await?,
    }

    Ok(())
}
