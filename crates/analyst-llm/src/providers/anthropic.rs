//! Anthropic Claude provider implementation
//!
//! Streams the Messages API event protocol. Only `text_delta` payloads of
//! `content_block_delta` events produce fragments; lifecycle events are
//! consumed silently and an `error` event aborts the call.
//! See: https://docs.anthropic.com/en/api/messages-streaming

use super::http_client;
use crate::provider::forward;
use crate::sse::{PrefixPolicy, SseLine, SseLineReader, classify};
use crate::{
    CompletionRequest, FragmentSink, LLMError, Message, ProviderConfig, ProviderKind, Result,
    StreamingProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
///
/// Supports current Claude models, e.g.:
/// - claude-sonnet-4-5 (default)
/// - claude-opus-4-5
/// - claude-haiku-4-5
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: ProviderConfig) -> Result<Self> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    /// Create a new Anthropic provider
    ///
    /// # Arguments
    ///
    /// * `api_key` - Anthropic API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ProviderConfig::new(ProviderKind::Claude, api_key))
    }

    /// Create a provider from environment variables
    ///
    /// Reads the API key from `CLAUDE_API_KEY`, plus the optional
    /// `CLAUDE_BASE_URL` and `CLAUDE_MODEL` overrides.
    pub fn from_env() -> Result<Self> {
        Self::with_config(ProviderConfig::from_env(ProviderKind::Claude)?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[async_trait]
impl StreamingProvider for AnthropicProvider {
    #[instrument(skip_all, fields(provider = "anthropic", model = %self.config.model))]
    async fn stream_completion(
        &self,
        cancel: &CancellationToken,
        request: &CompletionRequest,
        sink: &mut dyn FragmentSink,
    ) -> Result<()> {
        debug!("Opening Anthropic message stream");

        let body = AnthropicRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: vec![Message::user(&request.user)],
            temperature: request.temperature,
            stream: true,
        };

        let http_request = self
            .client
            .post(self.config.endpoint("messages"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let response = crate::transport::open_stream(self.name(), http_request, cancel).await?;
        let mut events = AnthropicEventStream::new(SseLineReader::new(response));
        let mut forwarded = 0usize;

        while let Some(event) = events.next_event(cancel).await? {
            match event {
                StreamEvent::ContentBlockDelta {
                    delta: BlockDelta::TextDelta { text },
                } => {
                    if forward(sink, &text).await? {
                        forwarded += 1;
                    }
                }
                StreamEvent::Error { error } => {
                    return Err(LLMError::StreamError {
                        provider: self.name().to_string(),
                        message: format!("{}: {}", error.kind, error.message),
                    });
                }
                StreamEvent::MessageStop {} => break,
                _ => {}
            }
        }

        debug!(fragments = forwarded, "Anthropic stream finished");
        Ok(())
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Anthropic API request format
#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    stream: bool,
}

/// Events of the Messages streaming protocol
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart {},
    ContentBlockStart {},
    ContentBlockDelta { delta: BlockDelta },
    ContentBlockStop {},
    MessageDelta {},
    MessageStop {},
    Ping {},
    Error { error: StreamErrorBody },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta {
        text: String,
    },
    // input_json_delta, thinking_delta, ...
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Typed view over the `data:` lines of an Anthropic stream
struct AnthropicEventStream {
    lines: SseLineReader,
}

impl AnthropicEventStream {
    fn new(lines: SseLineReader) -> Self {
        Self { lines }
    }

    /// Next decodable event, or `None` at end of body
    async fn next_event(&mut self, cancel: &CancellationToken) -> Result<Option<StreamEvent>> {
        while let Some(line) = self.lines.next_line(cancel).await? {
            // `event:` lines duplicate the JSON `type` field
            let SseLine::Data(payload) = classify(&line, PrefixPolicy::Required) else {
                continue;
            };
            match serde_json::from_str::<StreamEvent>(payload) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => debug!(error = %e, "Skipping undecodable Anthropic event"),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse(events: &[serde_json::Value]) -> String {
        events
            .iter()
            .map(|e| format!("event: {}\ndata: {e}\n\n", e["type"].as_str().unwrap_or("")))
            .collect()
    }

    async fn run(body: String) -> (Vec<String>, Result<()>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "claude-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({
                "model": "claude-sonnet-4-5",
                "max_tokens": 800,
                "system": "sys",
                "stream": true,
                "messages": [{"role": "user", "content": "usr"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let config =
            ProviderConfig::new(ProviderKind::Claude, "claude-key").with_api_base(server.uri());
        let provider = AnthropicProvider::with_config(config).unwrap();
        let mut sink: Vec<String> = Vec::new();
        let result = provider
            .stream_completion(&CancellationToken::new(), &CompletionRequest::new("sys", "usr"), &mut sink)
            .await;
        (sink, result)
    }

    #[test]
    fn test_provider_creation() {
        let provider = AnthropicProvider::new("claude-key").unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.model(), "claude-sonnet-4-5");
    }

    #[test]
    fn test_event_decoding() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            StreamEvent::ContentBlockDelta { delta: BlockDelta::TextDelta { ref text } } if text == "Hi"
        ));

        let event: StreamEvent = serde_json::from_str(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            StreamEvent::ContentBlockDelta { delta: BlockDelta::Other }
        ));

        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"brand_new_event","x":1}"#).unwrap();
        assert!(matches!(event, StreamEvent::Unknown));
    }

    #[tokio::test]
    async fn test_forwards_text_deltas_only() {
        let body = sse(&[
            json!({"type": "message_start", "message": {"id": "msg_1", "usage": {"input_tokens": 10}}}),
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
            json!({"type": "ping"}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "看多"}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": ""}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "理由"}}),
            json!({"type": "content_block_stop", "index": 0}),
            json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 4}}),
            json!({"type": "message_stop"}),
        ]);

        let (sink, result) = run(body).await;
        assert!(result.is_ok());
        assert_eq!(sink, vec!["看多".to_string(), "理由".to_string()]);
    }

    #[tokio::test]
    async fn test_undecodable_line_is_skipped() {
        let mut body = sse(&[json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "a"}})]);
        body.push_str("data: {truncated\n\n");
        body.push_str(&sse(&[
            json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "b"}}),
            json!({"type": "message_stop"}),
        ]));

        let (sink, result) = run(body).await;
        assert!(result.is_ok());
        assert_eq!(sink.concat(), "ab");
    }

    #[tokio::test]
    async fn test_error_event_aborts() {
        let body = sse(&[
            json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "partial"}}),
            json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
        ]);

        let (sink, result) = run(body).await;
        assert_eq!(sink, vec!["partial".to_string()]);
        match result {
            Err(LLMError::StreamError { provider, message }) => {
                assert_eq!(provider, "anthropic");
                assert!(message.contains("Overloaded"));
            }
            other => panic!("Expected StreamError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .mount(&server)
            .await;

        let config = ProviderConfig::new(ProviderKind::Claude, "bad").with_api_base(server.uri());
        let provider = AnthropicProvider::with_config(config).unwrap();
        let mut sink: Vec<String> = Vec::new();
        let err = provider
            .stream_completion(&CancellationToken::new(), &CompletionRequest::new("s", "u"), &mut sink)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(sink.is_empty());
    }
}
