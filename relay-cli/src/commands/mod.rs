pub mod config;
pub mod keys;
pub mod models;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use relay_models::Registry;
use relay_models::auth::CredentialResolver;
use relay_models::config::{OpenedStore, RelayConfig};
use relay_models::providers::Unconfigured;

use crate::config::ConfigLoader;

/// Everything a command needs: merged config, the opened store, and a
/// resolver reading the process environment plus that store.
pub struct Context {
    pub config: RelayConfig,
    pub store: OpenedStore,
    pub resolver: CredentialResolver,
}

impl Context {
    pub fn load() -> Result<Self> {
        Ok(Self::from_config(ConfigLoader::load()?))
    }

    pub fn from_config(config: RelayConfig) -> Self {
        let store = config.store.open();
        let mut resolver = CredentialResolver::new();
        if let Some(kv) = store.as_store() {
            resolver = resolver.with_store(kv);
        }
        Self {
            config,
            store,
            resolver,
        }
    }

    /// Build the registry. The CLI never sends requests, so no transport is
    /// attached.
    pub fn registry(&self) -> Result<Registry> {
        Ok(Registry::load(
            &self.config,
            &self.resolver,
            Arc::new(Unconfigured),
        )?)
    }
}
