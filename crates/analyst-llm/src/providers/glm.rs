//! Zhipu GLM provider implementation
//!
//! See: https://open.bigmodel.cn/dev/api/normal-model/glm-4

use super::{chat_completions, http_client};
use crate::sse::PrefixPolicy;
use crate::{
    CompletionRequest, FragmentSink, Message, ProviderConfig, ProviderKind, Result,
    StreamingProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Zhipu GLM provider
///
/// Supports the GLM-4 family, e.g. `glm-4-plus` (default), `glm-4-air`.
pub struct GlmProvider {
    client: Client,
    config: ProviderConfig,
}

impl GlmProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: ProviderConfig) -> Result<Self> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    /// Create a provider with an API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ProviderConfig::new(ProviderKind::Glm, api_key))
    }

    /// Create a provider from `GLM_API_KEY`, `GLM_BASE_URL` and `GLM_MODEL`
    pub fn from_env() -> Result<Self> {
        Self::with_config(ProviderConfig::from_env(ProviderKind::Glm)?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[async_trait]
impl StreamingProvider for GlmProvider {
    #[instrument(skip_all, fields(provider = "glm", model = %self.config.model))]
    async fn stream_completion(
        &self,
        cancel: &CancellationToken,
        request: &CompletionRequest,
        sink: &mut dyn FragmentSink,
    ) -> Result<()> {
        let body = GlmRequest {
            model: &self.config.model,
            messages: vec![
                Message::system(&request.system),
                Message::user(&request.user),
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: true,
        };

        let http_request = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body);

        let response = crate::transport::open_stream(self.name(), http_request, cancel).await?;
        // GLM interleaves non-data lines; only `data: ` lines are frames
        let forwarded =
            chat_completions::pump(self.name(), response, PrefixPolicy::Required, cancel, sink)
                .await?;

        debug!(fragments = forwarded, "GLM stream finished");
        Ok(())
    }

    fn name(&self) -> &str {
        "glm"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct GlmRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    #[serde(skip_serializing_if = "is_zero")]
    max_tokens: u32,
    stream: bool,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LLMError;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> GlmProvider {
        let config = ProviderConfig::new(ProviderKind::Glm, "sk-test").with_api_base(server.uri());
        GlmProvider::with_config(config).unwrap()
    }

    async fn stream_server(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/event-stream"))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_provider_creation() {
        let provider = GlmProvider::new("sk-test").unwrap();
        assert_eq!(provider.name(), "glm");
        assert_eq!(provider.model(), "glm-4-plus");
        assert_eq!(provider.config().api_base, "https://open.bigmodel.cn/api/paas/v4");
    }

    #[test]
    fn test_request_omits_zero_max_tokens() {
        let body = GlmRequest {
            model: "glm-4-plus",
            messages: vec![Message::user("hi")],
            temperature: 0.7,
            max_tokens: 0,
            stream: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["stream"], true);
    }

    #[tokio::test]
    async fn test_request_shape_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "glm-4-plus",
                "stream": true,
                "max_tokens": 800,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "usr"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw("data: [DONE]\n", "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let mut sink: Vec<String> = Vec::new();
        provider(&server)
            .stream_completion(&CancellationToken::new(), &CompletionRequest::new("sys", "usr"), &mut sink)
            .await
            .unwrap();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_stream_filters_frames() {
        let body = concat!(
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"贵州\"}}]}\n\n",
            ": keep-alive comment\n",
            "{\"choices\":[{\"delta\":{\"content\":\"unprefixed\"}}]}\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"茅台\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"after done\"}}]}\n\n",
        );
        let server = stream_server(body).await;

        let mut sink: Vec<String> = Vec::new();
        provider(&server)
            .stream_completion(&CancellationToken::new(), &CompletionRequest::new("s", "u"), &mut sink)
            .await
            .unwrap();

        assert_eq!(sink, vec!["贵州".to_string(), "茅台".to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_line_is_skipped() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello \"}}]}\n",
            "data: {not json at all\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"World\"}}]}\n",
            "data: [DONE]\n",
        );
        let server = stream_server(body).await;

        let mut sink: Vec<String> = Vec::new();
        provider(&server)
            .stream_completion(&CancellationToken::new(), &CompletionRequest::new("s", "u"), &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.concat(), "Hello World");
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string(r#"{"error":{"code":"1302"}}"#))
            .mount(&server)
            .await;

        let mut sink: Vec<String> = Vec::new();
        let err = provider(&server)
            .stream_completion(&CancellationToken::new(), &CompletionRequest::new("s", "u"), &mut sink)
            .await
            .unwrap_err();

        match err {
            LLMError::Api { provider, status, body } => {
                assert_eq!(provider, "glm");
                assert_eq!(status, 429);
                assert!(body.contains("1302"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancellation_aborts_pending_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("data: [DONE]\n", "text/event-stream")
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let provider = provider(&server);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let mut sink: Vec<String> = Vec::new();
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            provider.stream_completion(&cancel, &CompletionRequest::new("s", "u"), &mut sink),
        )
        .await
        .expect("cancellation should abort promptly");

        assert!(matches!(result, Err(LLMError::Cancelled)));
    }
}
