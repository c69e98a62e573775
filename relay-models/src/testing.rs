//! Test doubles shared by unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::Result;
use crate::providers::{
    ChatRequest, ChatResponse, ChatStream, Content, ProviderKind, StopReason, StreamChunk,
    Transport, Upstream, Usage,
};

/// What a transport saw for one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub provider: ProviderKind,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub stream: bool,
}

/// Transport that records calls and replies with canned output.
pub struct RecordingTransport {
    reply: String,
    chunks: Vec<StreamChunk>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingTransport {
    /// Reply to `chat` with fixed text.
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            chunks: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Stream the given text deltas, then a final stop chunk with usage.
    pub fn streaming(deltas: Vec<&str>) -> Self {
        let mut chunks: Vec<StreamChunk> = deltas.into_iter().map(StreamChunk::text).collect();
        chunks.push(StreamChunk {
            stop_reason: Some(StopReason::EndTurn),
            usage: Some(Usage::new(5, 10)),
            ..Default::default()
        });
        Self::with_chunks(chunks)
    }

    /// Stream exactly these chunks.
    pub fn with_chunks(chunks: Vec<StreamChunk>) -> Self {
        Self {
            reply: String::new(),
            chunks,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, upstream: &Upstream, request: &ChatRequest) {
        self.calls.lock().unwrap().push(RecordedCall {
            provider: upstream.provider,
            base_url: upstream.base_url.clone(),
            api_key: upstream.api_key.expose_secret().to_string(),
            model: request.model.clone(),
            stream: request.stream,
        });
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn chat(&self, upstream: &Upstream, request: ChatRequest) -> Result<ChatResponse> {
        self.record(upstream, &request);
        Ok(ChatResponse {
            content: Content::text(self.reply.clone()),
            reasoning: None,
            stop_reason: StopReason::EndTurn,
            tool_calls: vec![],
            usage: Usage::new(10, 5),
        })
    }

    async fn chat_stream(&self, upstream: &Upstream, request: ChatRequest) -> Result<ChatStream> {
        self.record(upstream, &request);
        let chunks: Vec<Result<StreamChunk>> = self.chunks.iter().cloned().map(Ok).collect();
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }
}
