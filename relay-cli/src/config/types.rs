use std::collections::BTreeMap;
use std::path::PathBuf;

use relay_models::config::StoreKind;
use serde::Deserialize;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRelayConfig {
    /// Registry identifier used when a consumer does not pick one
    pub default_model: Option<String>,

    #[serde(default)]
    pub store: RawStoreConfig,

    #[serde(default)]
    pub providers: BTreeMap<String, RawProviderSettings>,

    #[serde(default)]
    pub reasoning: RawReasoningConfig,
}

/// Store section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStoreConfig {
    pub kind: Option<StoreKind>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawProviderSettings {
    pub base_url: Option<String>,
}

/// Reasoning section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawReasoningConfig {
    pub tag: Option<String>,
    pub separator: Option<String>,
    pub start_with_reasoning: Option<bool>,
}
