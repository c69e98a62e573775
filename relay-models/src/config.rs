//! Registry configuration, as read from `config.toml`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::{FileStore, KeyValueStore, KeyringStore};
use crate::middleware::ReasoningConfig;
use crate::providers::ProviderKind;
use crate::{Error, Result};

/// Keyring service name used by [`StoreKind::Keyring`].
pub const KEYRING_SERVICE: &str = "relay";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Registry identifier used when a consumer does not pick one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    #[serde(default)]
    pub store: StoreConfig,

    /// Per-provider overrides keyed by provider slug (e.g. `openrouter`).
    /// Keys are canonicalized by [`RelayConfig::canonicalize_providers`].
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSettings>,

    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

impl RelayConfig {
    /// Endpoint override for a provider, if configured.
    pub fn base_url(&self, kind: ProviderKind) -> Option<&str> {
        self.providers
            .get(kind.slug())
            .and_then(|p| p.base_url.as_deref())
    }

    /// Rewrite provider keys to their slug, rejecting names that match no
    /// provider. `OpenAI` and `openai` name the same table.
    pub fn canonicalize_providers(mut self) -> Result<Self> {
        let mut providers = BTreeMap::new();
        for (name, settings) in std::mem::take(&mut self.providers) {
            let kind = name.parse::<ProviderKind>().map_err(|_| {
                let valid: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.slug()).collect();
                Error::Config(format!(
                    "unknown provider '{name}' in [providers]; expected one of: {}",
                    valid.join(", ")
                ))
            })?;
            if providers.insert(kind.slug().to_string(), settings).is_some() {
                return Err(Error::Config(format!(
                    "provider '{}' is configured more than once",
                    kind.slug()
                )));
            }
        }
        self.providers = providers;
        Ok(self)
    }
}

/// Which persisted store backs credential fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Environment only; the reload listener stays inactive.
    None,
    /// JSON file, watched for changes.
    #[default]
    File,
    /// System keyring; no change events.
    Keyring,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,

    /// File location for [`StoreKind::File`]; defaults to the config dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Opened persisted store, keeping the concrete file store when there is one
/// so callers can watch it.
#[derive(Clone)]
pub enum OpenedStore {
    None,
    File(Arc<FileStore>),
    Keyring(Arc<KeyringStore>),
}

impl OpenedStore {
    /// The store as a trait object, if any.
    pub fn as_store(&self) -> Option<Arc<dyn KeyValueStore>> {
        match self {
            OpenedStore::None => None,
            OpenedStore::File(store) => Some(store.clone() as Arc<dyn KeyValueStore>),
            OpenedStore::Keyring(store) => Some(store.clone() as Arc<dyn KeyValueStore>),
        }
    }
}

impl StoreConfig {
    /// Open the configured store. Nothing touches the disk here.
    pub fn open(&self) -> OpenedStore {
        match self.kind {
            StoreKind::None => OpenedStore::None,
            StoreKind::File => OpenedStore::File(Arc::new(match &self.path {
                Some(path) => FileStore::new(path),
                None => FileStore::at_default_location(),
            })),
            StoreKind::Keyring => {
                OpenedStore::Keyring(Arc::new(KeyringStore::new(KEYRING_SERVICE)))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Parse a TOML document into a config.
pub fn from_toml(contents: &str) -> Result<RelayConfig> {
    let config: RelayConfig =
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
    config.canonicalize_providers()
}
