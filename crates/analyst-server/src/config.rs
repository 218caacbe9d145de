//! Server configuration
//!
//! Read once at startup from the environment:
//!
//! | variable | default |
//! |---|---|
//! | `HOST` | `0.0.0.0` |
//! | `GO_API_PORT`, then `PORT` | `8080` |
//! | `PYTHON_SERVICE_URL` | `http://localhost:5000` |
//! | `DATA_SERVICE_TIMEOUT_SECS` | `30` |
//! | `ANALYSIS_TIMEOUT_SECS` | `600` |
//! | `PROMPT_LANGUAGE` | `zh` |
//! | `LLM_PROVIDER` | `claude` |
//!
//! plus the selected provider's `{PREFIX}_API_KEY`, `{PREFIX}_BASE_URL` and
//! `{PREFIX}_MODEL` (see [`analyst_llm::ProviderConfig::from_env`]).

use crate::{Result, ServerError};
use analyst_llm::{ProviderConfig, ProviderKind};
use analyst_pipeline::Language;
use analyst_utils::{env_opt, env_parse};
use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_SERVICE_URL: &str = "http://localhost:5000";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 600;

/// Complete, validated server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Base URL of the financial-data service
    pub data_service_url: String,

    /// Timeout of one data-service call
    pub fetch_timeout: Duration,

    /// Deadline of one analysis run, after which it is cancelled
    pub analysis_timeout: Duration,

    /// Prompt and message language
    pub language: Language,

    /// Selected LLM vendor and its credentials
    pub provider: ProviderConfig,
}

impl ServerConfig {
    /// Create a new configuration builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load the whole configuration from the environment
    pub fn from_env() -> Result<Self> {
        ServerConfigBuilder::from_env()?.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ServerError::Config("host must not be empty".to_string()));
        }

        if !self.data_service_url.starts_with("http://")
            && !self.data_service_url.starts_with("https://")
        {
            return Err(ServerError::Config(format!(
                "Invalid data service URL: {}",
                self.data_service_url
            )));
        }

        if self.fetch_timeout.is_zero() || self.analysis_timeout.is_zero() {
            return Err(ServerError::Config(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        self.provider.validate()?;
        Ok(())
    }
}

/// Builder for [`ServerConfig`]
///
/// Unset fields fall back to defaults; an unset provider config is loaded
/// from the environment for the selected provider kind at build time.
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    data_service_url: Option<String>,
    fetch_timeout: Option<Duration>,
    analysis_timeout: Option<Duration>,
    language: Option<Language>,
    provider_kind: Option<ProviderKind>,
    provider: Option<ProviderConfig>,
}

impl ServerConfigBuilder {
    /// Seed a builder from the process environment
    pub fn from_env() -> Result<Self> {
        let port = match env_opt("GO_API_PORT") {
            Some(_) => env_parse("GO_API_PORT", DEFAULT_PORT)?,
            None => env_parse("PORT", DEFAULT_PORT)?,
        };

        let language = match env_opt("PROMPT_LANGUAGE") {
            Some(raw) => Some(Language::from_code(&raw).ok_or_else(|| {
                ServerError::Config(format!("Unsupported PROMPT_LANGUAGE '{raw}' (expected zh or en)"))
            })?),
            None => None,
        };

        Ok(Self {
            host: env_opt("HOST"),
            port: Some(port),
            data_service_url: env_opt("PYTHON_SERVICE_URL"),
            fetch_timeout: Some(Duration::from_secs(env_parse(
                "DATA_SERVICE_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )?)),
            analysis_timeout: Some(Duration::from_secs(env_parse(
                "ANALYSIS_TIMEOUT_SECS",
                DEFAULT_ANALYSIS_TIMEOUT_SECS,
            )?)),
            language,
            provider_kind: Some(ProviderKind::from_env()?),
            provider: None,
        })
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn data_service_url(mut self, url: impl Into<String>) -> Self {
        self.data_service_url = Some(url.into());
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = Some(timeout);
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Select the LLM vendor; its settings are read from the environment
    pub fn provider_kind(mut self, kind: ProviderKind) -> Self {
        self.provider_kind = Some(kind);
        self
    }

    /// Use explicit provider settings instead of the environment
    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.provider_kind = Some(provider.kind);
        self.provider = Some(provider);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ServerConfig> {
        let kind = self.provider_kind.unwrap_or_default();
        let provider = match self.provider {
            Some(provider) if provider.kind == kind => provider,
            _ => ProviderConfig::from_env(kind)?,
        };

        let config = ServerConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            data_service_url: self
                .data_service_url
                .unwrap_or_else(|| DEFAULT_DATA_SERVICE_URL.to_string()),
            fetch_timeout: self
                .fetch_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)),
            analysis_timeout: self
                .analysis_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS)),
            language: self.language.unwrap_or_default(),
            provider,
        };

        config.validate()?;
        Ok(config)
    }
}
