//! Reasoning extraction for models that inline their chain of thought.
//!
//! Some models emit reasoning wrapped in a literal tag, e.g.
//! `<think>...</think>`, ahead of (or interleaved with) the answer.
//! [`ReasoningModel`] wraps a [`LanguageModel`] and moves tagged segments out
//! of the answer: into [`ChatResponse::reasoning`] for complete responses and
//! into [`StreamChunk::reasoning_delta`] for streams. Requests pass through
//! untouched.
//!
//! # Example
//!
//! ```ignore
//! use relay_models::middleware::{ReasoningConfig, ReasoningModel};
//!
//! let qwq = ReasoningModel::wrap(groq.language_model("qwen-qwq-32b"), ReasoningConfig::default());
//! let response = qwq.chat(request).await?;
//! println!("thought: {:?}", response.reasoning);
//! println!("answer: {}", response.content.as_text());
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::providers::{
    ChatRequest, ChatResponse, ChatStream, Content, LanguageModel, ProviderKind, StreamChunk,
};

/// Tag name recognized by default.
pub const DEFAULT_TAG: &str = "think";

/// How reasoning is delimited in model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Tag name without angle brackets.
    pub tag: String,
    /// Inserted between joined reasoning segments and between answer pieces
    /// that a removed segment used to separate.
    pub separator: String,
    /// Treat output as already inside a reasoning block, for models that omit
    /// the opening tag.
    pub start_with_reasoning: bool,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG.to_string(),
            separator: "\n".to_string(),
            start_with_reasoning: false,
        }
    }
}

impl ReasoningConfig {
    fn opening_tag(&self) -> String {
        format!("<{}>", self.tag)
    }

    fn closing_tag(&self) -> String {
        format!("</{}>", self.tag)
    }

    /// Split complete output into `(reasoning, answer)`.
    ///
    /// Returns `None` for reasoning when no complete tagged segment exists, in
    /// which case the answer is `text` unchanged.
    pub fn extract(&self, text: &str) -> (Option<String>, String) {
        let open = self.opening_tag();
        let close = self.closing_tag();
        let source = if self.start_with_reasoning {
            format!("{open}{text}")
        } else {
            text.to_string()
        };

        // (start, end, inner) of every complete segment, left to right.
        let mut segments: Vec<(usize, usize, &str)> = Vec::new();
        let mut pos = 0;
        while let Some(found) = source[pos..].find(&open) {
            let start = pos + found;
            let inner_start = start + open.len();
            let Some(len) = source[inner_start..].find(&close) else {
                break;
            };
            let end = inner_start + len + close.len();
            segments.push((start, end, &source[inner_start..inner_start + len]));
            pos = end;
        }

        if segments.is_empty() {
            return (None, text.to_string());
        }

        let reasoning = segments
            .iter()
            .map(|(_, _, inner)| *inner)
            .collect::<Vec<_>>()
            .join(&self.separator);

        // Splice right to left so earlier offsets stay valid.
        let mut answer = source.clone();
        for &(start, end, _) in segments.iter().rev() {
            let before = &answer[..start];
            let after = &answer[end..];
            let separator = if before.is_empty() || after.is_empty() {
                ""
            } else {
                self.separator.as_str()
            };
            answer = format!("{before}{separator}{after}");
        }

        (Some(reasoning), answer)
    }
}

/// One classified piece of streamed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Reasoning(String),
}

/// Incremental splitter for streamed output.
///
/// Text that might be the beginning of a tag is held back until the next
/// delta decides it.
#[derive(Debug)]
pub struct ReasoningParser {
    opening: String,
    closing: String,
    separator: String,
    in_reasoning: bool,
    emitted_reasoning: bool,
    emitted_text: bool,
    after_switch: bool,
    buffer: String,
}

impl ReasoningParser {
    pub fn new(config: &ReasoningConfig) -> Self {
        Self {
            opening: config.opening_tag(),
            closing: config.closing_tag(),
            separator: config.separator.clone(),
            in_reasoning: config.start_with_reasoning,
            emitted_reasoning: false,
            emitted_text: false,
            after_switch: false,
            buffer: String::new(),
        }
    }

    /// Feed one delta, returning whatever can already be classified.
    pub fn push(&mut self, delta: &str) -> Vec<Segment> {
        self.buffer.push_str(delta);
        let mut out = Vec::new();

        loop {
            let tag = if self.in_reasoning {
                &self.closing
            } else {
                &self.opening
            };
            let tag_len = tag.len();

            let Some(start) = potential_start_index(&self.buffer, tag) else {
                let rest = std::mem::take(&mut self.buffer);
                self.publish(rest, &mut out);
                break;
            };

            let head = self.buffer[..start].to_string();
            self.publish(head, &mut out);

            if start + tag_len <= self.buffer.len() {
                self.buffer.drain(..start + tag_len);
                self.in_reasoning = !self.in_reasoning;
                self.after_switch = true;
            } else {
                self.buffer.drain(..start);
                break;
            }
        }

        out
    }

    /// Flush held-back text at end of output.
    pub fn finish(&mut self) -> Vec<Segment> {
        let mut out = Vec::new();
        let rest = std::mem::take(&mut self.buffer);
        self.publish(rest, &mut out);
        out
    }

    fn publish(&mut self, text: String, out: &mut Vec<Segment>) {
        if text.is_empty() {
            return;
        }
        let emitted = if self.in_reasoning {
            self.emitted_reasoning
        } else {
            self.emitted_text
        };
        let text = if self.after_switch && emitted {
            format!("{}{text}", self.separator)
        } else {
            text
        };
        self.after_switch = false;

        if self.in_reasoning {
            self.emitted_reasoning = true;
            out.push(Segment::Reasoning(text));
        } else {
            self.emitted_text = true;
            out.push(Segment::Text(text));
        }
    }
}

/// Index where `tag` starts in `text`, or where a suffix of `text` could be
/// the start of `tag`.
fn potential_start_index(text: &str, tag: &str) -> Option<usize> {
    if tag.is_empty() {
        return None;
    }
    if let Some(index) = text.find(tag) {
        return Some(index);
    }
    text.char_indices()
        .map(|(i, _)| i)
        .find(|&i| tag.starts_with(&text[i..]))
}

/// A model whose output is split into reasoning and answer.
#[derive(Clone)]
pub struct ReasoningModel {
    inner: Arc<dyn LanguageModel>,
    config: ReasoningConfig,
}

impl ReasoningModel {
    /// Wrap `inner` with reasoning extraction.
    pub fn wrap(inner: impl LanguageModel + 'static, config: ReasoningConfig) -> Self {
        Self {
            inner: Arc::new(inner),
            config,
        }
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }
}

#[async_trait]
impl LanguageModel for ReasoningModel {
    fn provider(&self) -> ProviderKind {
        self.inner.provider()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let mut response = self.inner.chat(request).await?;
        let (reasoning, answer) = self.config.extract(&response.content.as_text());
        if let Some(reasoning) = reasoning {
            response.content = Content::text(answer);
            response.reasoning = Some(reasoning);
        }
        Ok(response)
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let inner = self.inner.chat_stream(request).await?;
        let state = SplitState {
            inner,
            parser: ReasoningParser::new(&self.config),
            pending: VecDeque::new(),
            done: false,
        };

        let stream = futures_util::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, state));
                }
                if state.done {
                    return None;
                }
                match state.inner.next().await {
                    Some(Ok(chunk)) => state.absorb(chunk),
                    Some(Err(e)) => state.pending.push_back(Err(e)),
                    None => {
                        state.done = true;
                        let rest = state.parser.finish();
                        state.queue(rest);
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

struct SplitState {
    inner: ChatStream,
    parser: ReasoningParser,
    pending: VecDeque<Result<StreamChunk>>,
    done: bool,
}

impl SplitState {
    fn absorb(&mut self, chunk: StreamChunk) {
        let StreamChunk {
            delta,
            reasoning_delta,
            stop_reason,
            tool_calls,
            usage,
        } = chunk;

        // Reasoning the provider already separated passes through.
        if let Some(reasoning) = reasoning_delta {
            self.pending.push_back(Ok(StreamChunk::reasoning(reasoning)));
        }
        if let Some(delta) = delta {
            let segments = self.parser.push(&delta);
            self.queue(segments);
        }
        if stop_reason.is_some() {
            let rest = self.parser.finish();
            self.queue(rest);
        }
        if stop_reason.is_some() || !tool_calls.is_empty() || usage.is_some() {
            self.pending.push_back(Ok(StreamChunk {
                stop_reason,
                tool_calls,
                usage,
                ..Default::default()
            }));
        }
    }

    fn queue(&mut self, segments: Vec<Segment>) {
        self.pending
            .extend(segments.into_iter().map(|segment| match segment {
                Segment::Text(text) => Ok(StreamChunk::text(text)),
                Segment::Reasoning(text) => Ok(StreamChunk::reasoning(text)),
            }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ApiKey;
    use crate::providers::{Message, ProviderClient, StopReason, Usage};
    use crate::testing::RecordingTransport;

    fn config() -> ReasoningConfig {
        ReasoningConfig::default()
    }

    fn run(parser: &mut ReasoningParser, deltas: &[&str]) -> Vec<Segment> {
        let mut out = Vec::new();
        for delta in deltas {
            out.extend(parser.push(delta));
        }
        out.extend(parser.finish());
        out
    }

    fn text(s: &str) -> Segment {
        Segment::Text(s.to_string())
    }

    fn reasoning(s: &str) -> Segment {
        Segment::Reasoning(s.to_string())
    }

    #[test]
    fn extract_splits_leading_reasoning() {
        let (r, a) = config().extract("<think>plan first</think>The answer is 4.");
        assert_eq!(r.as_deref(), Some("plan first"));
        assert_eq!(a, "The answer is 4.");
    }

    #[test]
    fn extract_without_tags_is_identity() {
        let (r, a) = config().extract("just an answer");
        assert!(r.is_none());
        assert_eq!(a, "just an answer");
    }

    #[test]
    fn extract_ignores_unclosed_tag() {
        let (r, a) = config().extract("<think>never closed");
        assert!(r.is_none());
        assert_eq!(a, "<think>never closed");
    }

    #[test]
    fn extract_joins_multiple_segments_and_surrounding_text() {
        let (r, a) = config().extract("A<think>one</think>B<think>two</think>C");
        assert_eq!(r.as_deref(), Some("one\ntwo"));
        assert_eq!(a, "A\nB\nC");
    }

    #[test]
    fn extract_does_not_pad_edges() {
        let (r, a) = config().extract("Answer<think>late thought</think>");
        assert_eq!(r.as_deref(), Some("late thought"));
        assert_eq!(a, "Answer");
    }

    #[test]
    fn extract_spans_newlines() {
        let (r, a) = config().extract("<think>\nline one\nline two\n</think>\n\nDone");
        assert_eq!(r.as_deref(), Some("\nline one\nline two\n"));
        assert_eq!(a, "\n\nDone");
    }

    #[test]
    fn extract_honors_start_with_reasoning() {
        let config = ReasoningConfig {
            start_with_reasoning: true,
            ..config()
        };
        let (r, a) = config.extract("implicit thought</think>answer");
        assert_eq!(r.as_deref(), Some("implicit thought"));
        assert_eq!(a, "answer");
    }

    #[test]
    fn extract_uses_configured_tag() {
        let config = ReasoningConfig {
            tag: "reasoning".to_string(),
            ..config()
        };
        let (r, a) = config.extract("<think>x</think><reasoning>y</reasoning>z");
        assert_eq!(r.as_deref(), Some("y"));
        assert_eq!(a, "<think>x</think>\nz");
    }

    #[test]
    fn parser_handles_whole_tags_in_one_delta() {
        let mut parser = ReasoningParser::new(&config());
        let out = run(&mut parser, &["<think>hmm</think>yes"]);
        assert_eq!(out, vec![reasoning("hmm"), text("yes")]);
    }

    #[test]
    fn parser_holds_back_split_tags() {
        let mut parser = ReasoningParser::new(&config());
        assert!(parser.push("<th").is_empty());
        assert!(parser.push("ink>").is_empty());
        assert_eq!(parser.push("deep "), vec![reasoning("deep ")]);
        assert_eq!(parser.push("thought</thi"), vec![reasoning("thought")]);
        assert_eq!(parser.push("nk>Answer"), vec![text("Answer")]);
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn parser_releases_false_tag_prefix() {
        let mut parser = ReasoningParser::new(&config());
        assert_eq!(parser.push("a <"), vec![text("a ")]);
        assert_eq!(parser.push("b"), vec![text("<b")]);
    }

    #[test]
    fn parser_flushes_dangling_prefix_at_end() {
        let mut parser = ReasoningParser::new(&config());
        let out = run(&mut parser, &["x <thi"]);
        assert_eq!(out, vec![text("x "), text("<thi")]);
    }

    #[test]
    fn parser_separates_repeated_modes() {
        let mut parser = ReasoningParser::new(&config());
        let out = run(
            &mut parser,
            &["<think>a</think>", "B", "<think>c</think>", "D"],
        );
        assert_eq!(
            out,
            vec![reasoning("a"), text("B"), reasoning("\nc"), text("\nD")]
        );
    }

    #[test]
    fn parser_start_with_reasoning() {
        let config = ReasoningConfig {
            start_with_reasoning: true,
            ..config()
        };
        let mut parser = ReasoningParser::new(&config);
        let out = run(&mut parser, &["thinking", "</think>", "done"]);
        assert_eq!(out, vec![reasoning("thinking"), text("done")]);
    }

    #[test]
    fn potential_start_index_cases() {
        assert_eq!(potential_start_index("abc<think>", "<think>"), Some(3));
        assert_eq!(potential_start_index("abc<thi", "<think>"), Some(3));
        assert_eq!(potential_start_index("abc", "<think>"), None);
        assert_eq!(potential_start_index("héllo<", "<think>"), Some(6));
        assert_eq!(potential_start_index("abc", ""), None);
    }

    fn wrapped(transport: Arc<RecordingTransport>) -> ReasoningModel {
        let client = Arc::new(
            ProviderClient::new(ProviderKind::Groq, Some(ApiKey::new("gsk-1")))
                .with_transport(transport),
        );
        ReasoningModel::wrap(client.language_model("qwen-qwq-32b"), config())
    }

    #[tokio::test]
    async fn wrapped_chat_moves_reasoning_out_of_content() {
        let transport = Arc::new(RecordingTransport::replying(
            "<think>2+2 is 4</think>It's 4.",
        ));
        let model = wrapped(transport.clone());
        assert_eq!(model.provider(), ProviderKind::Groq);
        assert_eq!(model.model(), "qwen-qwq-32b");

        let response = model
            .chat(ChatRequest::new(vec![Message::user("2+2?")]))
            .await
            .unwrap();

        assert_eq!(response.reasoning.as_deref(), Some("2+2 is 4"));
        assert_eq!(response.content.as_text(), "It's 4.");
        // Requests are untouched.
        assert_eq!(transport.calls()[0].model, "qwen-qwq-32b");
    }

    #[tokio::test]
    async fn wrapped_chat_without_tags_passes_through() {
        let transport = Arc::new(RecordingTransport::replying("plain"));
        let response = wrapped(transport)
            .chat(ChatRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap();
        assert!(response.reasoning.is_none());
        assert_eq!(response.content.as_text(), "plain");
    }

    #[tokio::test]
    async fn wrapped_stream_splits_deltas_and_keeps_metadata() {
        let transport = Arc::new(RecordingTransport::streaming(vec![
            "<thi", "nk>pon", "der</th", "ink>Hel", "lo <", "3",
        ]));
        let mut stream = wrapped(transport)
            .chat_stream(ChatRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap();

        let mut answer = String::new();
        let mut thought = String::new();
        let mut last = None;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if let Some(d) = &chunk.delta {
                answer.push_str(d);
            }
            if let Some(r) = &chunk.reasoning_delta {
                thought.push_str(r);
            }
            if chunk.has_metadata() {
                last = Some(chunk);
            }
        }

        assert_eq!(thought, "ponder");
        assert_eq!(answer, "Hello <3");
        let last = last.unwrap();
        assert_eq!(last.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(last.usage, Some(Usage::new(5, 10)));
    }

    #[tokio::test]
    async fn wrapped_stream_flushes_before_stop_chunk() {
        let transport = Arc::new(RecordingTransport::with_chunks(vec![
            StreamChunk::text("end <"),
            StreamChunk {
                stop_reason: Some(StopReason::MaxTokens),
                ..Default::default()
            },
        ]));
        let chunks: Vec<StreamChunk> = wrapped(transport)
            .chat_stream(ChatRequest::default())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![
                StreamChunk::text("end "),
                StreamChunk::text("<"),
                StreamChunk {
                    stop_reason: Some(StopReason::MaxTokens),
                    ..Default::default()
                },
            ]
        );
    }

    #[tokio::test]
    async fn wrapped_stream_passes_provider_reasoning_through() {
        let transport = Arc::new(RecordingTransport::with_chunks(vec![
            StreamChunk::reasoning("native"),
            StreamChunk::text("ok"),
        ]));
        let chunks: Vec<StreamChunk> = wrapped(transport)
            .chat_stream(ChatRequest::default())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![StreamChunk::reasoning("native"), StreamChunk::text("ok")]
        );
    }
}
