//! Core types for model metadata.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Friendly identifier a consumer uses to pick a model (e.g. `qwen-qwq`).
///
/// This is the registry key, not the upstream model string a provider
/// expects; see [`ModelInfo::api_version`] for that.
///
/// # Examples
///
/// ```
/// use relay_models::ModelId;
///
/// let id = ModelId::from("grok-3-mini");
/// assert_eq!(id.as_str(), "grok-3-mini");
/// assert_eq!(id.to_string(), "grok-3-mini");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Create a new model ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ModelId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Descriptive record for one registered model, used for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Registry identifier.
    pub id: ModelId,
    /// Provider display name (e.g., "OpenAI", "OpenRouter").
    pub provider: String,
    /// Human-readable model name.
    pub name: String,
    /// One-sentence description.
    pub description: String,
    /// Upstream model version string.
    pub api_version: String,
    /// Ordered capability tags (e.g., "Reasoning", "Vision").
    pub capabilities: Vec<String>,
}

impl ModelInfo {
    /// Create a new model info builder.
    pub fn builder(id: impl Into<ModelId>, provider: &str, name: &str) -> ModelInfoBuilder {
        ModelInfoBuilder::new(id.into(), provider, name)
    }

    /// Check whether the model carries a capability tag (case-insensitive).
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.eq_ignore_ascii_case(tag))
    }
}

/// Builder for constructing `ModelInfo`.
#[derive(Debug)]
pub struct ModelInfoBuilder {
    id: ModelId,
    provider: String,
    name: String,
    description: String,
    api_version: Option<String>,
    capabilities: Vec<String>,
}

impl ModelInfoBuilder {
    fn new(id: ModelId, provider: &str, name: &str) -> Self {
        Self {
            id,
            provider: provider.to_string(),
            name: name.to_string(),
            description: String::new(),
            api_version: None,
            capabilities: Vec::new(),
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the upstream version string. Defaults to the model ID.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Append one capability tag.
    pub fn capability(mut self, tag: impl Into<String>) -> Self {
        self.capabilities.push(tag.into());
        self
    }

    /// Append capability tags, preserving order.
    pub fn capabilities<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Build the `ModelInfo`.
    pub fn build(self) -> ModelInfo {
        ModelInfo {
            api_version: self
                .api_version
                .unwrap_or_else(|| self.id.as_str().to_string()),
            id: self.id,
            provider: self.provider,
            name: self.name,
            description: self.description,
            capabilities: self.capabilities,
        }
    }
}
