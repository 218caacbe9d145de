//! Completion request type

use serde::{Deserialize, Serialize};

/// Sampling temperature used for every analysis call
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Output length cap used for every analysis call
pub const DEFAULT_MAX_TOKENS: u32 = 800;

/// A single-turn streaming completion request
///
/// The model is not part of the request: it is fixed by the provider's
/// configuration for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt (persona and output structure)
    pub system: String,

    /// User prompt (the rendered data)
    pub user: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Create a request with the default generation parameters
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}
