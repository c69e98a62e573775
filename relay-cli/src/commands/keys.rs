//! API key management against the configured persisted store.

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use dialoguer::{Password, theme::ColorfulTheme};
use relay_models::auth::{CREDENTIAL_NAMES, CredentialResolver, CredentialSource, KeyValueStore};
use relay_models::config::OpenedStore;

use super::Context;

#[derive(Args, Debug)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommands,
}

#[derive(Subcommand, Debug)]
pub enum KeysCommands {
    /// Show where each provider's API key is resolved from
    List,
    /// Save an API key to the configured store
    Set {
        /// Credential name (e.g. GROQ_API_KEY)
        name: String,

        /// Key value; prompted for when omitted
        #[arg(long)]
        value: Option<String>,
    },
    /// Remove an API key from the configured store
    Delete {
        /// Credential name (e.g. GROQ_API_KEY)
        name: String,
    },
}

pub fn run(args: KeysArgs) -> Result<()> {
    let context = Context::load()?;

    match args.command {
        KeysCommands::List => list_keys(&context),
        KeysCommands::Set { name, value } => {
            let store = writable_store(&context.store)?;
            let name = validate_name(&name)?;
            let value = match value {
                Some(value) => value,
                None => prompt_for_key(name)?,
            };
            set_key(store.as_ref(), name, &value)?;
            println!("{} saved to {}.", name, store_label(&context.store));
            Ok(())
        }
        KeysCommands::Delete { name } => {
            let store = writable_store(&context.store)?;
            let name = validate_name(&name)?;
            if store.get(name)?.is_none() {
                println!("No stored value for {}.", name);
                return Ok(());
            }
            store.remove(name)?;
            println!("{} removed from {}.", name, store_label(&context.store));
            if std::env::var(name).is_ok_and(|v| !v.is_empty()) {
                println!("Note: {} is still set in the environment.", name);
            }
            Ok(())
        }
    }
}

fn list_keys(context: &Context) -> Result<()> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Credential").fg(Color::Cyan),
        Cell::new("Source").fg(Color::Cyan),
    ]);

    for (name, source) in key_sources(&context.resolver) {
        let source = match source {
            Some(CredentialSource::Environment) => Cell::new("environment").fg(Color::Green),
            Some(CredentialSource::Store) => Cell::new(store_label(&context.store)).fg(Color::Green),
            None => Cell::new("not set").fg(Color::Yellow),
        };
        table.add_row(vec![Cell::new(name), source]);
    }

    println!("{table}");
    Ok(())
}

/// Source of every known credential, in provider order.
fn key_sources(resolver: &CredentialResolver) -> Vec<(&'static str, Option<CredentialSource>)> {
    CREDENTIAL_NAMES
        .iter()
        .map(|&name| (name, resolver.source(name)))
        .collect()
}

fn validate_name(name: &str) -> Result<&'static str> {
    let upper = name.to_ascii_uppercase();
    match CREDENTIAL_NAMES.iter().find(|&&known| known == upper) {
        Some(&known) => Ok(known),
        None => bail!(
            "Unknown credential '{}'. Valid: {}",
            name,
            CREDENTIAL_NAMES.join(", ")
        ),
    }
}

fn writable_store(store: &OpenedStore) -> Result<Arc<dyn KeyValueStore>> {
    match store.as_store() {
        Some(store) => Ok(store),
        None => bail!("No credential store configured. Set [store] kind in config.toml."),
    }
}

fn set_key(store: &dyn KeyValueStore, name: &str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        bail!("API key cannot be empty");
    }
    store.set(name, value)?;
    Ok(())
}

fn prompt_for_key(name: &str) -> Result<String> {
    println!("Enter value for {} (or set it in the environment)", name);
    let key = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("API key")
        .interact()?;
    Ok(key)
}

fn store_label(store: &OpenedStore) -> String {
    match store {
        OpenedStore::None => "no store".to_string(),
        OpenedStore::File(file) => file.path().display().to_string(),
        OpenedStore::Keyring(keyring) => format!("keyring ({})", keyring.service_name()),
    }
}
