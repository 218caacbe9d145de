//! Inbound analysis request

use crate::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/analyze`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Stock code, e.g. `600519`
    pub code: String,

    /// Display name, used when the data service returns none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AnalysisRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Trim surrounding whitespace and reject an empty code
    pub fn normalized(self) -> Result<Self> {
        let code = self.code.trim().to_string();
        if code.is_empty() {
            return Err(PipelineError::InvalidRequest("code must not be empty".to_string()));
        }
        if code.chars().any(char::is_whitespace) {
            return Err(PipelineError::InvalidRequest(format!(
                "code must not contain whitespace: {code:?}"
            )));
        }

        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(Self { code, name })
    }
}
