//! Provider selection and per-vendor configuration
//!
//! The vendor is chosen once at process startup (`LLM_PROVIDER`) and turned
//! into a shared `Arc<dyn StreamingProvider>` by [`build_provider`]. Each
//! vendor reads its own `{PREFIX}_API_KEY`, `{PREFIX}_BASE_URL` and
//! `{PREFIX}_MODEL` variables, where the prefix is `CLAUDE`, `GLM` or
//! `DEEPSEEK`.

use crate::providers::{AnthropicProvider, DeepSeekProvider, GlmProvider};
use crate::{LLMError, Result, StreamingProvider};
use analyst_utils::{env_opt, env_or, env_parse};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Supported LLM vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// Anthropic Claude (Messages API event stream)
    #[default]
    Claude,
    /// Zhipu GLM (OpenAI-style SSE)
    Glm,
    /// DeepSeek (OpenAI-style SSE)
    DeepSeek,
}

impl ProviderKind {
    /// All supported vendors
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Claude, ProviderKind::Glm, ProviderKind::DeepSeek];

    /// Read the selected vendor from `LLM_PROVIDER` (default: claude)
    pub fn from_env() -> Result<Self> {
        env_opt("LLM_PROVIDER").map_or(Ok(Self::default()), |raw| raw.parse())
    }

    /// Canonical name, as accepted by `LLM_PROVIDER`
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::Glm => "glm",
            ProviderKind::DeepSeek => "deepseek",
        }
    }

    /// Prefix of this vendor's environment variables
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "CLAUDE",
            ProviderKind::Glm => "GLM",
            ProviderKind::DeepSeek => "DEEPSEEK",
        }
    }

    /// Default API base URL
    pub fn default_api_base(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "https://api.anthropic.com/v1",
            ProviderKind::Glm => "https://open.bigmodel.cn/api/paas/v4",
            ProviderKind::DeepSeek => "https://api.deepseek.com",
        }
    }

    /// Default model identifier
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude-sonnet-4-5",
            ProviderKind::Glm => "glm-4-plus",
            ProviderKind::DeepSeek => "deepseek-chat",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "glm" | "zhipu" => Ok(ProviderKind::Glm),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            other => Err(LLMError::ConfigurationError(format!(
                "Unsupported LLM provider '{other}' (expected claude, glm or deepseek)"
            ))),
        }
    }
}

/// Connection settings for one vendor
#[derive(Clone)]
pub struct ProviderConfig {
    /// Which vendor these settings are for
    pub kind: ProviderKind,

    /// API key for authentication
    pub api_key: String,

    /// Base URL, without the trailing endpoint path
    pub api_base: String,

    /// Model identifier
    pub model: String,

    /// Whole-request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Create a config with the vendor's default base URL and model
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            api_base: kind.default_api_base().to_string(),
            model: kind.default_model().to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create config from environment variables
    ///
    /// Reads `{PREFIX}_API_KEY` (required), and optionally `{PREFIX}_BASE_URL`,
    /// `{PREFIX}_MODEL` and `LLM_TIMEOUT_SECS`.
    pub fn from_env(kind: ProviderKind) -> Result<Self> {
        let prefix = kind.env_prefix();
        let key_var = format!("{prefix}_API_KEY");
        let api_key = env_opt(&key_var).ok_or_else(|| {
            LLMError::ConfigurationError(format!("{key_var} environment variable not set"))
        })?;

        let timeout_secs = env_parse("LLM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .map_err(|e| LLMError::ConfigurationError(e.to_string()))?;

        let config = Self {
            kind,
            api_key,
            api_base: env_or(&format!("{prefix}_BASE_URL"), kind.default_api_base()),
            model: env_or(&format!("{prefix}_MODEL"), kind.default_model()),
            timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set custom API base URL
    ///
    /// Useful for proxies, regional endpoints, or local mock servers.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Endpoint URL for `path`, tolerating a trailing slash on the base
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let key_var = format!("{}_API_KEY", self.kind.env_prefix());
        if self.api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError(format!(
                "{key_var} is not configured"
            )));
        }

        // GLM keys are either sk- prefixed or long id.secret pairs
        if self.kind == ProviderKind::Glm
            && !self.api_key.starts_with("sk-")
            && self.api_key.len() < 32
        {
            return Err(LLMError::ConfigurationError(format!(
                "{key_var} has an invalid format"
            )));
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(LLMError::ConfigurationError(format!(
                "Invalid API base URL for {}: {}",
                self.kind, self.api_base
            )));
        }

        if self.model.trim().is_empty() {
            return Err(LLMError::ConfigurationError(format!(
                "No model configured for {}",
                self.kind
            )));
        }

        Ok(())
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Instantiate the configured vendor
///
/// Called once at startup; the returned provider is shared by every request.
pub fn build_provider(config: ProviderConfig) -> Result<Arc<dyn StreamingProvider>> {
    config.validate()?;
    let provider: Arc<dyn StreamingProvider> = match config.kind {
        ProviderKind::Claude => Arc::new(AnthropicProvider::with_config(config)?),
        ProviderKind::Glm => Arc::new(GlmProvider::with_config(config)?),
        ProviderKind::DeepSeek => Arc::new(DeepSeekProvider::with_config(config)?),
    };
    Ok(provider)
}
