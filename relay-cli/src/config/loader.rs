use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use relay_models::config::{ProviderSettings, RelayConfig, StoreConfig};
use relay_models::middleware::ReasoningConfig;
use relay_models::providers::ProviderKind;
use tracing::debug;

use super::types::{RawProviderSettings, RawReasoningConfig, RawRelayConfig, RawStoreConfig};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<RelayConfig> {
        Self::load_layers(&Self::user_config_path(), &Self::project_config_path())
    }

    /// Load and merge two config files; missing files contribute nothing.
    pub fn load_layers(user_path: &Path, project_path: &Path) -> Result<RelayConfig> {
        let mut raw = RawRelayConfig::default();

        // Layer 1: User config
        if let Some(user_config) = Self::read_layer(user_path)? {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_layer(project_path)? {
            raw = Self::merge_raw(raw, project_config);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (`$XDG_CONFIG_HOME/relay/config.toml` or similar)
    pub fn user_config_path() -> PathBuf {
        relay_paths::user_config_path()
    }

    /// Get project config path
    /// Can be overridden with RELAY_PROJECT_CONFIG_DIR env var (useful for isolated e2e tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("RELAY_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join(relay_paths::CONFIG_FILE)
        } else {
            PathBuf::from(".relay").join(relay_paths::CONFIG_FILE)
        }
    }

    fn read_layer(path: &Path) -> Result<Option<RawRelayConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        debug!(path = %path.display(), "reading config layer");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut layer: RawRelayConfig = toml::from_str(&contents)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        layer.providers = Self::canonical_providers(layer.providers)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        Ok(Some(layer))
    }

    /// Key provider tables by slug so layers using `OpenAI` and `openai` merge.
    fn canonical_providers(
        providers: BTreeMap<String, RawProviderSettings>,
    ) -> Result<BTreeMap<String, RawProviderSettings>> {
        let mut canonical = BTreeMap::new();
        for (name, settings) in providers {
            let Ok(kind) = name.parse::<ProviderKind>() else {
                let valid: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.slug()).collect();
                bail!(
                    "unknown provider '{}' in [providers]; expected one of: {}",
                    name,
                    valid.join(", ")
                );
            };
            if canonical.insert(kind.slug().to_string(), settings).is_some() {
                bail!("provider '{}' is configured more than once", kind.slug());
            }
        }
        Ok(canonical)
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawRelayConfig, overlay: RawRelayConfig) -> RawRelayConfig {
        let mut providers = base.providers;
        for (slug, settings) in overlay.providers {
            let merged = match providers.remove(&slug) {
                Some(existing) => RawProviderSettings {
                    base_url: settings.base_url.or(existing.base_url),
                },
                None => settings,
            };
            providers.insert(slug, merged);
        }

        RawRelayConfig {
            default_model: overlay.default_model.or(base.default_model),
            store: RawStoreConfig {
                kind: overlay.store.kind.or(base.store.kind),
                path: overlay.store.path.or(base.store.path),
            },
            providers,
            reasoning: RawReasoningConfig {
                tag: overlay.reasoning.tag.or(base.reasoning.tag),
                separator: overlay.reasoning.separator.or(base.reasoning.separator),
                start_with_reasoning: overlay
                    .reasoning
                    .start_with_reasoning
                    .or(base.reasoning.start_with_reasoning),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawRelayConfig) -> RelayConfig {
        let reasoning_defaults = ReasoningConfig::default();
        RelayConfig {
            default_model: raw.default_model,
            store: StoreConfig {
                kind: raw.store.kind.unwrap_or_default(),
                path: raw.store.path,
            },
            providers: raw
                .providers
                .into_iter()
                .map(|(slug, p)| {
                    (
                        slug,
                        ProviderSettings {
                            base_url: p.base_url,
                        },
                    )
                })
                .collect(),
            reasoning: ReasoningConfig {
                tag: raw.reasoning.tag.unwrap_or(reasoning_defaults.tag),
                separator: raw.reasoning.separator.unwrap_or(reasoning_defaults.separator),
                start_with_reasoning: raw
                    .reasoning
                    .start_with_reasoning
                    .unwrap_or(reasoning_defaults.start_with_reasoning),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_models::config::StoreKind;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_layers_give_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_layers(
            &temp_dir.path().join("user.toml"),
            &temp_dir.path().join("project.toml"),
        )
        .unwrap();

        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.store.kind, StoreKind::File);
        assert_eq!(config.reasoning.separator, "\n");
    }

    #[test]
    fn test_project_layer_overrides_user_layer() {
        let temp_dir = TempDir::new().unwrap();
        let user = write(
            &temp_dir,
            "user.toml",
            r#"
default_model = "grok-3-mini"

[store]
kind = "keyring"

[providers.groq]
base_url = "http://user-groq"

[providers.xai]
base_url = "http://user-xai"

[reasoning]
separator = " "
"#,
        );
        let project = write(
            &temp_dir,
            "project.toml",
            r#"
default_model = "qwen-qwq"

[providers.groq]
base_url = "http://project-groq"

[providers.xai]
"#,
        );

        let config = ConfigLoader::load_layers(&user, &project).unwrap();

        assert_eq!(config.default_model.as_deref(), Some("qwen-qwq"));
        // Unset in project: user value survives
        assert_eq!(config.store.kind, StoreKind::Keyring);
        assert_eq!(config.base_url(ProviderKind::Groq), Some("http://project-groq"));
        assert_eq!(config.base_url(ProviderKind::Xai), Some("http://user-xai"));
        assert_eq!(config.reasoning.separator, " ");
        assert_eq!(config.reasoning.tag, "think");
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let user = write(&temp_dir, "user.toml", "this is not valid toml {{{{");

        let result = ConfigLoader::load_layers(&user, &temp_dir.path().join("none.toml"));
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("user.toml"));
    }

    #[test]
    fn test_provider_names_merge_across_layers_case_insensitively() {
        let temp_dir = TempDir::new().unwrap();
        let user = write(
            &temp_dir,
            "user.toml",
            "[providers.OpenAI]\nbase_url = \"http://user-openai\"\n",
        );
        let project = write(
            &temp_dir,
            "project.toml",
            "[providers.openai]\nbase_url = \"http://project-openai\"\n",
        );

        let config = ConfigLoader::load_layers(&user, &project).unwrap();
        assert_eq!(
            config.base_url(ProviderKind::OpenAi),
            Some("http://project-openai")
        );
        assert_eq!(config.providers.len(), 1);
    }

    #[test]
    fn test_unknown_provider_table_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let user = write(
            &temp_dir,
            "user.toml",
            "[providers.opnai]\nbase_url = \"http://proxy\"\n",
        );

        let err = ConfigLoader::load_layers(&user, &temp_dir.path().join("none.toml"))
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("user.toml"));
        assert!(message.contains("opnai"));
    }

    #[test]
    fn test_merge_raw_none_preserves_base() {
        let base = RawRelayConfig {
            default_model: Some("openrouter-deepseek-r1".to_string()),
            store: RawStoreConfig {
                kind: Some(StoreKind::None),
                path: Some(PathBuf::from("/base/credentials.json")),
            },
            ..Default::default()
        };

        let merged = ConfigLoader::merge_raw(base, RawRelayConfig::default());

        assert_eq!(
            merged.default_model,
            Some("openrouter-deepseek-r1".to_string())
        );
        assert_eq!(merged.store.kind, Some(StoreKind::None));
        assert_eq!(
            merged.store.path,
            Some(PathBuf::from("/base/credentials.json"))
        );
    }

    #[test]
    fn test_user_config_path_is_under_relay_dir() {
        let path = ConfigLoader::user_config_path();
        assert!(path.to_string_lossy().contains("relay"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path() {
        // SAFETY: serialized with other env-touching tests
        unsafe { std::env::remove_var("RELAY_PROJECT_CONFIG_DIR") };
        let path = ConfigLoader::project_config_path();
        assert_eq!(path, PathBuf::from(".relay/config.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path_env_override() {
        // SAFETY: serialized with other env-touching tests
        unsafe { std::env::set_var("RELAY_PROJECT_CONFIG_DIR", "/tmp/relay-e2e") };
        let path = ConfigLoader::project_config_path();
        unsafe { std::env::remove_var("RELAY_PROJECT_CONFIG_DIR") };
        assert_eq!(path, PathBuf::from("/tmp/relay-e2e/config.toml"));
    }
}
