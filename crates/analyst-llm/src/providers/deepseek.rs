//! DeepSeek provider implementation
//!
//! See: https://api-docs.deepseek.com/api/create-chat-completion

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

/// DeepSeek provider
///
/// Supports `deepseek-chat` (default) and `deepseek-reasoner`.
pub struct DeepSeekProvider {
    client: Client,
    config: ProviderConfig,
}

impl DeepSeekProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: ProviderConfig) -> Result<Self> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    /// Create a provider with an API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ProviderConfig::new(ProviderKind::DeepSeek, api_key))
    }

    /// Create a provider from `DEEPSEEK_API_KEY`, `DEEPSEEK_BASE_URL` and `DEEPSEEK_MODEL`
    pub fn from_env() -> Result<Self> {
        Self::with_config(ProviderConfig::from_env(ProviderKind::DeepSeek)?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[async_trait]
impl StreamingProvider for DeepSeekProvider {
    #[instrument(skip_all, fields(provider = "deepseek", model = %self.config.model))]
    async fn stream_completion(
        &self,
        cancel: &CancellationToken,
        request: &CompletionRequest,
        sink: &mut dyn FragmentSink,
    ) -> Result<()> {
        let body = DeepSeekRequest {
            model: &self.config.model,
            messages: vec![
                Message::system(&request.system),
                Message::user(&request.user),
            ],
            stream: true,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let http_request = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body);

        let response = crate::transport::open_stream(self.name(), http_request, cancel).await?;
        let forwarded =
            chat_completions::pump(self.name(), response, PrefixPolicy::Optional, cancel, sink)
                .await?;

        debug!(fragments = forwarded, "DeepSeek stream finished");
        Ok(())
    }

    fn name(&self) -> &str {
        "deepseek"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct DeepSeekRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
    temperature: f32,
    max_tokens: u32,
}
