//! Provider clients and the model trait they produce.
//!
//! One [`ProviderClient`] exists per [`ProviderKind`]. A client captures a
//! resolved credential, a base URL and a [`Transport`]; building one has no
//! side effects. [`ProviderClient::language_model`] binds the client to an
//! upstream model string, yielding a [`LanguageModel`].
//!
//! # Example
//!
//! ```ignore
//! use relay_models::auth::CredentialResolver;
//! use relay_models::providers::{ProviderClients, ProviderKind};
//!
//! let clients = ProviderClients::builder(&CredentialResolver::new()).build();
//! let groq = clients.get(ProviderKind::Groq).language_model("qwen-qwq-32b");
//! let response = groq.chat(request).await?;
//! ```

mod transport;
mod types;

use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;
use tracing::debug;

pub use transport::{Transport, Unconfigured, Upstream};
pub use types::*;

use crate::auth::{ApiKey, CredentialResolver};
use crate::{Error, Result};

/// A stream of chat response chunks for streaming responses.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// The hosted providers the registry knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Groq,
    Xai,
    OpenRouter,
}

impl ProviderKind {
    /// Every provider, in declaration order.
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Groq,
        ProviderKind::Xai,
        ProviderKind::OpenRouter,
    ];

    /// Lowercase identifier used in config files and on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Groq => "groq",
            ProviderKind::Xai => "xai",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    /// Name shown to users and recorded in model metadata.
    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Groq => "Groq",
            ProviderKind::Xai => "XAI",
            ProviderKind::OpenRouter => "OpenRouter",
        }
    }

    /// Name of the credential, both as environment variable and store key.
    pub fn credential_name(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::Xai => "XAI_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    /// Public API endpoint used when config does not override it.
    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::Xai => "https://api.x.ai/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ProviderKind::ALL
            .into_iter()
            .find(|k| k.slug().eq_ignore_ascii_case(s) || k.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}

/// Unified interface of a model bound to one provider and one upstream model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// The provider serving this model.
    fn provider(&self) -> ProviderKind;

    /// The provider-side model string.
    fn model(&self) -> &str;

    /// Perform a chat completion request.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Perform a streaming chat completion request.
    ///
    /// The final chunk carries the stop reason and usage statistics.
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream>;
}

/// Client for one provider, bound to at most one credential.
///
/// A client without a credential is still valid; requests made through it
/// fail with [`Error::CredentialsNotFound`].
pub struct ProviderClient {
    kind: ProviderKind,
    base_url: String,
    api_key: Option<ApiKey>,
    transport: Arc<dyn Transport>,
}

impl ProviderClient {
    /// Create a client using the provider's default endpoint and no transport.
    pub fn new(kind: ProviderKind, api_key: Option<ApiKey>) -> Self {
        Self {
            kind,
            base_url: kind.default_base_url().to_string(),
            api_key,
            transport: Arc::new(Unconfigured),
        }
    }

    /// Override the API endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Inject the transport that executes requests.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a credential was resolved when the client was built.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Bind this client to an upstream model.
    pub fn language_model(self: &Arc<Self>, model: impl Into<String>) -> ProviderModel {
        ProviderModel {
            client: Arc::clone(self),
            model: model.into(),
        }
    }

    fn upstream(&self, model: &str) -> Result<Upstream> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| Error::CredentialsNotFound(self.kind.display_name().to_string()))?;
        Ok(Upstream {
            provider: self.kind,
            base_url: self.base_url.clone(),
            api_key,
            model: model.to_string(),
        })
    }
}

impl fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderClient")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

/// A provider client bound to one upstream model.
#[derive(Clone)]
pub struct ProviderModel {
    client: Arc<ProviderClient>,
    model: String,
}

impl ProviderModel {
    pub fn client(&self) -> &ProviderClient {
        &self.client
    }
}

#[async_trait]
impl LanguageModel for ProviderModel {
    fn provider(&self) -> ProviderKind {
        self.client.kind
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, mut request: ChatRequest) -> Result<ChatResponse> {
        let upstream = self.client.upstream(&self.model)?;
        request.model = self.model.clone();
        request.stream = false;
        debug!(provider = %self.client.kind, model = %self.model, "sending chat request");
        self.client.transport.chat(&upstream, request).await
    }

    async fn chat_stream(&self, mut request: ChatRequest) -> Result<ChatStream> {
        let upstream = self.client.upstream(&self.model)?;
        request.model = self.model.clone();
        request.stream = true;
        debug!(provider = %self.client.kind, model = %self.model, "opening chat stream");
        self.client.transport.chat_stream(&upstream, request).await
    }
}

/// One client per provider, built once at startup.
#[derive(Debug, Clone)]
pub struct ProviderClients {
    clients: [Arc<ProviderClient>; 5],
}

impl ProviderClients {
    /// Start building clients with credentials from `resolver`.
    pub fn builder(resolver: &CredentialResolver) -> ProviderClientsBuilder<'_> {
        ProviderClientsBuilder {
            resolver,
            base_urls: BTreeMap::new(),
            transport: Arc::new(Unconfigured),
        }
    }

    /// The client for a provider.
    pub fn get(&self, kind: ProviderKind) -> &Arc<ProviderClient> {
        &self.clients[kind.index()]
    }

    /// All clients in provider declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ProviderClient>> {
        self.clients.iter()
    }
}

/// Builder for [`ProviderClients`].
pub struct ProviderClientsBuilder<'a> {
    resolver: &'a CredentialResolver,
    base_urls: BTreeMap<ProviderKind, String>,
    transport: Arc<dyn Transport>,
}

impl ProviderClientsBuilder<'_> {
    /// Override one provider's endpoint.
    pub fn base_url(mut self, kind: ProviderKind, url: impl Into<String>) -> Self {
        self.base_urls.insert(kind, url.into());
        self
    }

    /// Transport shared by every client.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Resolve credentials and construct every client.
    pub fn build(self) -> ProviderClients {
        let clients = ProviderKind::ALL.map(|kind| {
            let api_key = self.resolver.resolve(kind.credential_name());
            if api_key.is_none() {
                debug!(provider = %kind, "no credential resolved; requests will fail");
            }
            let mut client =
                ProviderClient::new(kind, api_key).with_transport(Arc::clone(&self.transport));
            if let Some(url) = self.base_urls.get(&kind) {
                client = client.with_base_url(url.clone());
            }
            Arc::new(client)
        });
        ProviderClients { clients }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CREDENTIAL_NAMES;
    use crate::testing::RecordingTransport;
    use std::collections::HashMap;
    use tokio_stream::StreamExt;

    fn resolver_with(pairs: &[(&str, &str)]) -> CredentialResolver {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CredentialResolver::new().with_env(env)
    }

    #[test]
    fn credential_names_match_auth_table() {
        let names: Vec<&str> = ProviderKind::ALL
            .iter()
            .map(|k| k.credential_name())
            .collect();
        assert_eq!(names, CREDENTIAL_NAMES);
    }

    #[test]
    fn provider_kind_parses_slug_and_display_name() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("XAI".parse::<ProviderKind>().unwrap(), ProviderKind::Xai);
        assert_eq!(
            "OpenRouter".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenRouter
        );
        assert!(matches!(
            "mistral".parse::<ProviderKind>(),
            Err(Error::UnknownProvider(name)) if name == "mistral"
        ));
    }

    #[test]
    fn provider_kind_serializes_as_slug() {
        let json = serde_json::to_string(&ProviderKind::OpenRouter).unwrap();
        assert_eq!(json, "\"openrouter\"");
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
    }

    #[test]
    fn builder_creates_every_client_even_without_keys() {
        let resolver = resolver_with(&[("GROQ_API_KEY", "gsk-1")]);
        let clients = ProviderClients::builder(&resolver).build();

        assert_eq!(clients.iter().count(), 5);
        for client in clients.iter() {
            assert_eq!(client.has_credentials(), client.kind() == ProviderKind::Groq);
            assert_eq!(client.base_url(), client.kind().default_base_url());
        }
    }

    #[test]
    fn builder_applies_base_url_overrides() {
        let resolver = resolver_with(&[]);
        let clients = ProviderClients::builder(&resolver)
            .base_url(ProviderKind::OpenRouter, "http://localhost:8080/v1")
            .build();

        assert_eq!(
            clients.get(ProviderKind::OpenRouter).base_url(),
            "http://localhost:8080/v1"
        );
        assert_eq!(
            clients.get(ProviderKind::OpenAi).base_url(),
            "https://api.openai.com/v1"
        );
    }

    #[test]
    fn client_debug_redacts_key() {
        let client = ProviderClient::new(ProviderKind::OpenAi, Some(ApiKey::new("sk-secret")));
        let debug = format!("{client:?}");
        assert!(debug.contains("OpenAi"));
        assert!(!debug.contains("sk-secret"));
    }

    #[tokio::test]
    async fn missing_credential_fails_at_request_time() {
        let transport = Arc::new(RecordingTransport::replying("unused"));
        let client = Arc::new(
            ProviderClient::new(ProviderKind::Anthropic, None).with_transport(transport.clone()),
        );
        let model = client.language_model("claude-3-7-sonnet-20250219");

        let err = model
            .chat(ChatRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CredentialsNotFound(ref p) if p == "Anthropic"));
        assert!(transport.calls().is_empty(), "transport must not be reached");
    }

    #[tokio::test]
    async fn chat_addresses_upstream_model() {
        let transport = Arc::new(RecordingTransport::replying("pong"));
        let client = Arc::new(
            ProviderClient::new(ProviderKind::Groq, Some(ApiKey::new("gsk-1")))
                .with_transport(transport.clone()),
        );
        let model = client.language_model("qwen-qwq-32b");
        assert_eq!(model.provider(), ProviderKind::Groq);
        assert_eq!(model.model(), "qwen-qwq-32b");

        let response = model
            .chat(ChatRequest::new(vec![Message::user("ping")]))
            .await
            .unwrap();
        assert_eq!(response.content.as_text(), "pong");

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].provider, ProviderKind::Groq);
        assert_eq!(calls[0].model, "qwen-qwq-32b");
        assert_eq!(calls[0].api_key, "gsk-1");
        assert_eq!(calls[0].base_url, "https://api.groq.com/openai/v1");
        assert!(!calls[0].stream);
    }

    #[tokio::test]
    async fn chat_stream_marks_request_as_streaming() {
        let transport = Arc::new(RecordingTransport::streaming(vec!["a", "b"]));
        let client = Arc::new(
            ProviderClient::new(ProviderKind::Xai, Some(ApiKey::new("xai-1")))
                .with_transport(transport.clone()),
        );
        let model = client.language_model("grok-3-mini-latest");

        let mut stream = model
            .chat_stream(ChatRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap();
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            if let Some(delta) = chunk.unwrap().delta {
                text.push_str(&delta);
            }
        }
        assert_eq!(text, "ab");
        assert!(transport.calls()[0].stream);
    }
}
