//! Keep a registry live while the credential file changes underneath it.
//!
//! `relay watch` holds no consumers of its own: it rebuilds the shared
//! registry on every API key change and reports which providers now resolve.

use std::sync::{Arc, RwLock};

use anyhow::{Result, bail};
use clap::Args;
use relay_models::Registry;
use relay_models::auth::CredentialResolver;
use relay_models::config::{OpenedStore, RelayConfig};
use relay_models::providers::ProviderKind;
use relay_models::reload::ReloadListener;
use tracing::{error, info};

use super::Context;

#[derive(Args, Debug)]
pub struct WatchArgs {}

pub async fn run(_args: WatchArgs) -> Result<()> {
    let context = Context::load()?;
    let OpenedStore::File(store) = &context.store else {
        bail!("`relay watch` needs a file store; keyring and environment-only setups emit no change events");
    };

    let registry = Arc::new(RwLock::new(context.registry()?));
    info!(
        models = registry.read().unwrap_or_else(|e| e.into_inner()).len(),
        default_model = %context.config.default_model.as_deref().unwrap_or(relay_models::DEFAULT_MODEL),
        providers = %configured_providers(&context.resolver).join(", "),
        "registry loaded"
    );

    let watcher = store.watch()?;
    let config = context.config.clone();
    let shared = Arc::clone(&registry);
    let listener = ReloadListener::new(move || match rebuild(&config) {
        Ok((rebuilt, providers)) => {
            *shared.write().unwrap_or_else(|e| e.into_inner()) = rebuilt;
            info!(providers = %providers.join(", "), "registry reloaded");
        }
        Err(e) => error!("reload failed: {e:#}"),
    });
    let task = listener.spawn(watcher.subscribe());

    println!(
        "Watching {} for API key changes. Press Ctrl-C to stop.",
        store.path().display()
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = task => {}
    }

    drop(watcher);
    let registry = registry.read().unwrap_or_else(|e| e.into_inner());
    info!(
        models = registry.len(),
        default_model = %registry.default_model(),
        "stopped watching"
    );
    Ok(())
}

/// Build a fresh registry from scratch, re-reading every credential.
fn rebuild(config: &RelayConfig) -> Result<(Registry, Vec<&'static str>)> {
    let context = Context::from_config(config.clone());
    let registry = context.registry()?;
    Ok((registry, configured_providers(&context.resolver)))
}

/// Display names of providers whose key currently resolves.
fn configured_providers(resolver: &CredentialResolver) -> Vec<&'static str> {
    ProviderKind::ALL
        .into_iter()
        .filter(|kind| resolver.source(kind.credential_name()).is_some())
        .map(ProviderKind::display_name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_models::auth::{KeyValueStore, MemoryStore};
    use std::collections::HashMap;

    #[test]
    fn configured_providers_follow_the_resolver() {
        let store = Arc::new(MemoryStore::new());
        let env: HashMap<String, String> =
            HashMap::from([("ANTHROPIC_API_KEY".to_string(), "sk-ant".to_string())]);
        let resolver = CredentialResolver::new()
            .with_env(env)
            .with_store(store.clone());

        assert_eq!(configured_providers(&resolver), vec!["Anthropic"]);

        store.set("OPENROUTER_API_KEY", "or-1").unwrap();
        assert_eq!(
            configured_providers(&resolver),
            vec!["Anthropic", "OpenRouter"]
        );
    }

    #[test]
    fn rebuild_produces_a_complete_registry() {
        let config = relay_models::config::from_toml("[store]\nkind = \"none\"\n").unwrap();
        let (registry, _) = rebuild(&config).unwrap();
        assert_eq!(registry.len(), relay_models::MODELS.len());
    }
}
