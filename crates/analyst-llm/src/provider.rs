//! Streaming provider trait definition

use crate::{CompletionRequest, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Receiver for generated text fragments
///
/// Providers call [`FragmentSink::on_fragment`] once per non-empty fragment,
/// strictly in the order the vendor produced them. An error returned by the
/// sink aborts the provider call and is propagated to the caller unchanged.
#[async_trait]
pub trait FragmentSink: Send {
    /// Accept the next fragment
    async fn on_fragment(&mut self, fragment: &str) -> Result<()>;
}

/// Collecting sink, handy for one-shot callers and tests
#[async_trait]
impl FragmentSink for Vec<String> {
    async fn on_fragment(&mut self, fragment: &str) -> Result<()> {
        self.push(fragment.to_string());
        Ok(())
    }
}

/// Trait for streaming LLM providers
///
/// Implementations exist per vendor wire protocol (Anthropic, GLM, DeepSeek).
/// Instances are created once at startup and shared read-only between
/// concurrent requests.
#[async_trait]
pub trait StreamingProvider: Send + Sync {
    /// Stream a completion, forwarding each text fragment to `sink`
    ///
    /// # Arguments
    ///
    /// * `cancel` - Aborts the in-flight call; observed while connecting and
    ///   between every chunk of the response body
    /// * `request` - System and user prompts plus generation parameters
    /// * `sink` - Receives non-empty fragments in production order
    ///
    /// # Returns
    ///
    /// `Ok(())` once the vendor ends the stream, [`crate::LLMError::Cancelled`]
    /// if `cancel` fired first, or the transport/vendor failure otherwise.
    async fn stream_completion(
        &self,
        cancel: &CancellationToken,
        request: &CompletionRequest,
        sink: &mut dyn FragmentSink,
    ) -> Result<()>;

    /// Get the provider name (e.g., "anthropic", "glm")
    fn name(&self) -> &str;

    /// Model identifier sent to the vendor
    fn model(&self) -> &str;
}

/// Forward a fragment, dropping empty deltas
pub(crate) async fn forward(sink: &mut dyn FragmentSink, fragment: &str) -> Result<bool> {
    if fragment.is_empty() {
        return Ok(false);
    }
    sink.on_fragment(fragment).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forward_skips_empty() {
        let mut sink: Vec<String> = Vec::new();
        assert!(!forward(&mut sink, "").await.unwrap());
        assert!(forward(&mut sink, "text").await.unwrap());
        assert_eq!(sink, vec!["text".to_string()]);
    }
}
