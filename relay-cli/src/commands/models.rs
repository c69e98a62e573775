//! Model registry commands.
//!
//! Lists the catalogued models and shows details for one of them, along with
//! whether the provider's API key is currently resolvable.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use relay_models::auth::{CredentialResolver, CredentialSource};
use relay_models::{ModelInfo, Registry};

use super::Context;

/// Models arguments.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommands,
}

/// Models subcommands.
#[derive(Subcommand, Debug)]
pub enum ModelsCommands {
    /// List registered models
    List {
        /// Filter by provider (e.g. groq, openrouter)
        #[arg(long)]
        provider: Option<String>,

        /// Filter by capability tag (e.g. reasoning, vision)
        #[arg(long)]
        capability: Option<String>,
    },
    /// Show detailed model information
    Info {
        /// Model identifier (e.g. qwen-qwq, grok-3-mini)
        model: String,
    },
}

/// Run models command.
pub fn run(args: ModelsArgs) -> Result<()> {
    let context = Context::load()?;
    let registry = context.registry()?;

    match args.command {
        ModelsCommands::List {
            provider,
            capability,
        } => list_models(
            &registry,
            &context.resolver,
            provider.as_deref(),
            capability.as_deref(),
        ),
        ModelsCommands::Info { model } => show_model_info(&registry, &context.resolver, &model),
    }
}

/// Models matching both filters, in declaration order.
fn filter_models<'a>(
    registry: &'a Registry,
    provider: Option<&str>,
    capability: Option<&str>,
) -> Vec<&'a ModelInfo> {
    let models = match provider {
        Some(provider) => registry.find_by_provider(provider),
        None => registry.details(),
    };
    models
        .into_iter()
        .filter(|m| capability.is_none_or(|tag| m.has_capability(tag)))
        .collect()
}

fn list_models(
    registry: &Registry,
    resolver: &CredentialResolver,
    provider_filter: Option<&str>,
    capability_filter: Option<&str>,
) -> Result<()> {
    let models = filter_models(registry, provider_filter, capability_filter);

    if models.is_empty() {
        println!("No models match the specified filters.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Model").fg(Color::Cyan),
        Cell::new("Provider").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Capabilities").fg(Color::Cyan),
        Cell::new("API key").fg(Color::Cyan),
    ]);

    for model in models {
        let id = if model.id == *registry.default_model() {
            format!("{} (default)", model.id)
        } else {
            model.id.to_string()
        };
        table.add_row(vec![
            Cell::new(id),
            Cell::new(&model.provider),
            Cell::new(&model.name),
            Cell::new(format_capabilities(&model.capabilities)),
            Cell::new(credential_label(key_source(registry, resolver, model))),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn show_model_info(registry: &Registry, resolver: &CredentialResolver, id: &str) -> Result<()> {
    let (Some(model), Some(handle)) = (registry.info(id), registry.get(id)) else {
        bail!(
            "Model '{}' not found. Known models: {}",
            id,
            registry
                .model_ids()
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    };

    println!("Model: {}", model.name);
    println!("ID: {}", model.id);
    println!("Provider: {}", model.provider);
    println!("Upstream model: {}", handle.upstream_model());
    println!("API version: {}", model.api_version);
    println!();
    println!("{}", model.description);
    println!();
    println!("Capabilities: {}", format_capabilities(&model.capabilities));
    println!(
        "Reasoning extraction: {}",
        if handle.extracts_reasoning() {
            "yes"
        } else {
            "no"
        }
    );
    println!(
        "API key ({}): {}",
        handle.provider().credential_name(),
        credential_label(key_source(registry, resolver, model))
    );
    if model.id == *registry.default_model() {
        println!("Default model: yes");
    }

    Ok(())
}

fn key_source(
    registry: &Registry,
    resolver: &CredentialResolver,
    model: &ModelInfo,
) -> Option<CredentialSource> {
    registry
        .get(model.id.as_str())
        .and_then(|handle| resolver.source(handle.provider().credential_name()))
}

/// Format capability tags as a comma-separated string.
fn format_capabilities(tags: &[String]) -> String {
    if tags.is_empty() {
        "-".to_string()
    } else {
        tags.join(", ")
    }
}

fn credential_label(source: Option<CredentialSource>) -> &'static str {
    match source {
        Some(CredentialSource::Environment) => "environment",
        Some(CredentialSource::Store) => "store",
        None => "missing",
    }
}
