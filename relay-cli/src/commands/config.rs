use crate::config::ConfigLoader;
use anyhow::Result;
use clap::{Args, Subcommand};
use relay_models::config::OpenedStore;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (merged)
    Show,
    /// Show configuration file paths
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(),
        ConfigCommands::Path => show_paths(),
    }
}

fn show_config() -> Result<()> {
    let config = ConfigLoader::load()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths() -> Result<()> {
    let config = ConfigLoader::load()?;
    println!(
        "User config:    {}",
        ConfigLoader::user_config_path().display()
    );
    println!(
        "Project config: {}",
        ConfigLoader::project_config_path().display()
    );
    match config.store.open() {
        OpenedStore::File(store) => println!("Credentials:    {}", store.path().display()),
        OpenedStore::Keyring(store) => {
            println!("Credentials:    keyring service '{}'", store.service_name())
        }
        OpenedStore::None => println!("Credentials:    environment only"),
    }
    Ok(())
}
