//! Model registry for dispatching to and describing the catalogued models.
//!
//! A [`Registry`] binds every [`CATALOG`] entry to its provider client,
//! producing one [`ModelHandle`] per identifier plus a metadata record.
//! Building a registry never fails because of missing credentials; those
//! surface when a handle is first used.

mod catalog;

pub use catalog::*;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::auth::CredentialResolver;
use crate::config::RelayConfig;
use crate::middleware::{ReasoningConfig, ReasoningModel};
use crate::providers::{
    ChatRequest, ChatResponse, ChatStream, LanguageModel, ProviderClients, ProviderKind, Transport,
};
use crate::{Error, ModelId, ModelInfo, Result};

/// A dispatchable model, bound to one upstream version of one provider.
#[derive(Clone)]
pub struct ModelHandle {
    id: ModelId,
    model: Arc<dyn LanguageModel>,
    extracts_reasoning: bool,
}

impl ModelHandle {
    pub fn id(&self) -> &ModelId {
        &self.id
    }

    pub fn provider(&self) -> ProviderKind {
        self.model.provider()
    }

    /// Model string sent upstream.
    pub fn upstream_model(&self) -> &str {
        self.model.model()
    }

    /// Whether responses have tagged reasoning split out.
    pub fn extracts_reasoning(&self) -> bool {
        self.extracts_reasoning
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.model.chat(request).await
    }

    pub async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream> {
        self.model.chat_stream(request).await
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("id", &self.id)
            .field("provider", &self.provider())
            .field("upstream_model", &self.upstream_model())
            .field("extracts_reasoning", &self.extracts_reasoning)
            .finish()
    }
}

/// Every catalogued model, ready for dispatch.
#[derive(Debug, Clone)]
pub struct Registry {
    handles: HashMap<ModelId, ModelHandle>,
    details: HashMap<ModelId, ModelInfo>,
    order: Vec<ModelId>,
    default_model: ModelId,
}

impl Registry {
    /// Start building a registry over already-constructed clients.
    pub fn builder(clients: &ProviderClients) -> RegistryBuilder<'_> {
        RegistryBuilder {
            clients,
            reasoning: ReasoningConfig::default(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Resolve credentials, construct clients and assemble the registry.
    pub fn load(
        config: &RelayConfig,
        resolver: &CredentialResolver,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let mut clients = ProviderClients::builder(resolver).transport(transport);
        for kind in ProviderKind::ALL {
            if let Some(url) = config.base_url(kind) {
                clients = clients.base_url(kind, url);
            }
        }
        let clients = clients.build();

        let mut builder = Self::builder(&clients).reasoning(config.reasoning.clone());
        if let Some(default) = &config.default_model {
            builder = builder.default_model(default.clone());
        }
        builder.build()
    }

    /// Handle for an identifier, if registered.
    pub fn get(&self, id: &str) -> Option<&ModelHandle> {
        self.handles.get(id)
    }

    /// Handle for an identifier, failing with [`Error::ModelNotFound`].
    pub fn language_model(&self, id: &str) -> Result<ModelHandle> {
        self.get(id)
            .cloned()
            .ok_or_else(|| Error::ModelNotFound(id.to_string()))
    }

    pub fn info(&self, id: &str) -> Option<&ModelInfo> {
        self.details.get(id)
    }

    /// Metadata for every model, in declaration order.
    pub fn details(&self) -> Vec<&ModelInfo> {
        self.order
            .iter()
            .filter_map(|id| self.details.get(id))
            .collect()
    }

    /// Registered identifiers, in declaration order.
    pub fn model_ids(&self) -> &[ModelId] {
        &self.order
    }

    pub fn default_model(&self) -> &ModelId {
        &self.default_model
    }

    /// Metadata for models served by a provider, matched by slug or display name.
    pub fn find_by_provider(&self, provider: &str) -> Vec<&ModelInfo> {
        self.details()
            .into_iter()
            .filter(|info| {
                info.provider.eq_ignore_ascii_case(provider)
                    || self
                        .handles
                        .get(&info.id)
                        .is_some_and(|h| h.provider().slug().eq_ignore_ascii_case(provider))
            })
            .collect()
    }

    /// Metadata for models carrying a capability tag.
    pub fn find_by_capability(&self, tag: &str) -> Vec<&ModelInfo> {
        self.details()
            .into_iter()
            .filter(|info| info.has_capability(tag))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Builder for [`Registry`].
pub struct RegistryBuilder<'a> {
    clients: &'a ProviderClients,
    reasoning: ReasoningConfig,
    default_model: String,
}

impl RegistryBuilder<'_> {
    /// Options for the reasoning-extracting handles.
    pub fn reasoning(mut self, config: ReasoningConfig) -> Self {
        self.reasoning = config;
        self
    }

    pub fn default_model(mut self, id: impl Into<String>) -> Self {
        self.default_model = id.into();
        self
    }

    /// Assemble one handle and one metadata record per catalog entry.
    pub fn build(self) -> Result<Registry> {
        let mut handles = HashMap::with_capacity(CATALOG.len());
        let mut details = HashMap::with_capacity(CATALOG.len());
        let mut order = Vec::with_capacity(CATALOG.len());

        for entry in CATALOG {
            let id = ModelId::new(entry.id);
            let base = self.clients.get(entry.provider).language_model(entry.upstream);
            let model: Arc<dyn LanguageModel> = if entry.extract_reasoning {
                Arc::new(ReasoningModel::wrap(base, self.reasoning.clone()))
            } else {
                Arc::new(base)
            };
            debug!(model = entry.id, provider = %entry.provider, upstream = entry.upstream, "registered model");

            handles.insert(
                id.clone(),
                ModelHandle {
                    id: id.clone(),
                    model,
                    extracts_reasoning: entry.extract_reasoning,
                },
            );
            details.insert(id.clone(), entry.info());
            order.push(id);
        }

        if !handles.contains_key(self.default_model.as_str()) {
            return Err(Error::UnknownDefaultModel(self.default_model));
        }

        Ok(Registry {
            handles,
            details,
            order,
            default_model: ModelId::new(self.default_model),
        })
    }
}
