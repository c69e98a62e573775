use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "relay", about = "Provider registry for hosted language models")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Manage stored API keys
    Keys(commands::keys::KeysArgs),
    /// Inspect the model registry
    Models(commands::models::ModelsArgs),
    /// Reload the registry whenever stored API keys change
    Watch(commands::watch::WatchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Keys(args) => commands::keys::run(args),
        Commands::Models(args) => commands::models::run(args),
        Commands::Watch(args) => commands::watch::run(args).await,
    }
}
