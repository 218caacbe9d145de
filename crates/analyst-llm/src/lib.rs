//! Streaming LLM provider abstraction for stock-analyst
//!
//! This crate hides three incompatible vendor streaming protocols behind a
//! single capability, [`StreamingProvider::stream_completion`]. It includes:
//!
//! - The completion request type shared by every provider
//! - The [`FragmentSink`] callback that receives generated text in order
//! - Line-delimited server-sent-event framing shared by the HTTP providers
//! - Concrete providers for Anthropic Claude, Zhipu GLM and DeepSeek
//! - Provider selection from configuration, resolved once at startup
//!
//! # Example
//!
//! ```no_run
//! use analyst_llm::{CompletionRequest, StreamingProvider};
//! use analyst_llm::providers::DeepSeekProvider;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> analyst_llm::Result<()> {
//! let provider = DeepSeekProvider::from_env()?;
//! let request = CompletionRequest::new("You are terse.", "Say hello");
//!
//! let mut fragments: Vec<String> = Vec::new();
//! provider
//!     .stream_completion(&CancellationToken::new(), &request, &mut fragments)
//!     .await?;
//! println!("{}", fragments.concat());
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod config;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod sse;
mod transport;

// Re-export main types
pub use completion::{CompletionRequest, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
pub use config::{ProviderConfig, ProviderKind, build_provider};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::{FragmentSink, StreamingProvider};
