//! Concrete streaming provider implementations
//!
//! One struct per vendor wire protocol. GLM and DeepSeek speak the
//! OpenAI-style chat-completions SSE dialect and share its frame decoder;
//! Anthropic has its own typed event stream.

pub mod anthropic;
mod chat_completions;
pub mod deepseek;
pub mod glm;

pub use anthropic::AnthropicProvider;
pub use deepseek::DeepSeekProvider;
pub use glm::GlmProvider;

use crate::{ProviderConfig, Result};
use reqwest::Client;
use std::time::Duration;

/// HTTP client shared by every call of one provider instance
fn http_client(config: &ProviderConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}
