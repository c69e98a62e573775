//! Transport seam between model handles and provider wire protocols.
//!
//! This crate never speaks a provider's protocol itself. The host injects a
//! [`Transport`] that receives the resolved [`Upstream`] for each call.

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ChatStream, ProviderKind};
use crate::auth::ApiKey;
use crate::{Error, Result};

/// Everything needed to address one upstream model.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub provider: ProviderKind,
    pub base_url: String,
    pub api_key: ApiKey,
    /// Provider-side model string (e.g. `qwen-qwq-32b`).
    pub model: String,
}

/// Executes requests against a provider.
///
/// Retries, rate limiting and streaming framing are the transport's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a non-streaming chat completion.
    async fn chat(&self, upstream: &Upstream, request: ChatRequest) -> Result<ChatResponse>;

    /// Perform a streaming chat completion.
    async fn chat_stream(&self, upstream: &Upstream, request: ChatRequest) -> Result<ChatStream>;
}

/// Transport used when the host injected none; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl Transport for Unconfigured {
    async fn chat(&self, upstream: &Upstream, _request: ChatRequest) -> Result<ChatResponse> {
        Err(Error::TransportUnavailable(
            upstream.provider.display_name().to_string(),
        ))
    }

    async fn chat_stream(&self, upstream: &Upstream, _request: ChatRequest) -> Result<ChatStream> {
        Err(Error::TransportUnavailable(
            upstream.provider.display_name().to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_transport_names_the_provider() {
        let upstream = Upstream {
            provider: ProviderKind::Xai,
            base_url: ProviderKind::Xai.default_base_url().to_string(),
            api_key: ApiKey::new("xai-1"),
            model: "grok-3-mini-latest".to_string(),
        };

        let err = Unconfigured
            .chat(&upstream, ChatRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransportUnavailable(ref p) if p == "XAI"));

        let err = Unconfigured
            .chat_stream(&upstream, ChatRequest::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::TransportUnavailable(_)));
    }

    #[test]
    fn unconfigured_transport_fails_without_a_runtime() {
        let upstream = Upstream {
            provider: ProviderKind::Groq,
            base_url: ProviderKind::Groq.default_base_url().to_string(),
            api_key: ApiKey::new("gsk-1"),
            model: "qwen-qwq-32b".to_string(),
        };

        let result = tokio_test::block_on(Unconfigured.chat(&upstream, ChatRequest::default()));
        assert!(matches!(result, Err(Error::TransportUnavailable(p)) if p == "Groq"));
    }
}
