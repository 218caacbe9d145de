//! Error types for the analysis pipeline

use crate::{Language, Stage};
use analyst_llm::LLMError;
use thiserror::Error;

/// Failures of the upstream financial-data call
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout, or body read failure
    #[error("Financial data request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Service answered with a non-200 status
    #[error("Financial data service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not a financial-data document
    #[error("Failed to decode financial data: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    fn short_reason(&self) -> String {
        match self {
            FetchError::Request(e) if e.is_timeout() => "timeout".to_string(),
            FetchError::Request(_) => "service unreachable".to_string(),
            FetchError::Status { status, .. } => format!("HTTP {status}"),
            FetchError::Decode(_) => "invalid response".to_string(),
        }
    }
}

/// Errors that end an analysis run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed analysis request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The financial-data document could not be obtained
    #[error("Failed to fetch financial data: {0}")]
    Fetch(#[from] FetchError),

    /// The LLM provider failed while a stage was streaming
    #[error("Stage {stage} failed: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: LLMError,
    },

    /// A stage was sequenced before one of its inputs existed
    #[error("Stage {stage} requires the output of {missing}, which is not available")]
    MissingDependency { stage: Stage, missing: Stage },

    /// A stage's output was written twice
    #[error("Output of stage {0} is already recorded")]
    DuplicateOutput(Stage),

    /// Prompt template failed to render
    #[error("Failed to render prompt for {stage}: {detail}")]
    Prompt { stage: Stage, detail: String },

    /// The run was cancelled (client went away or deadline passed)
    #[error("Analysis cancelled")]
    Cancelled,

    /// The event consumer dropped its receiver
    #[error("Event channel closed")]
    ChannelClosed,
}

impl PipelineError {
    /// Coarse message for the client-facing `error` event
    ///
    /// Full detail stays in the server log.
    pub fn client_message(&self, lang: Language) -> String {
        match (self, lang) {
            (PipelineError::InvalidRequest(detail), Language::Chinese) => {
                format!("请求参数错误: {detail}")
            }
            (PipelineError::InvalidRequest(detail), Language::English) => {
                format!("Invalid request: {detail}")
            }
            (PipelineError::Fetch(e), Language::Chinese) => {
                format!("获取数据失败: {}", e.short_reason())
            }
            (PipelineError::Fetch(e), Language::English) => {
                format!("Failed to fetch stock data: {}", e.short_reason())
            }
            (PipelineError::Provider { stage, source }, Language::Chinese) => {
                format!("{}失败: {}", stage.label(lang), llm_reason(source))
            }
            (PipelineError::Provider { stage, source }, Language::English) => {
                format!("{} failed: {}", stage.label(lang), llm_reason(source))
            }
            (PipelineError::Cancelled | PipelineError::ChannelClosed, Language::Chinese) => {
                "分析已取消".to_string()
            }
            (PipelineError::Cancelled | PipelineError::ChannelClosed, Language::English) => {
                "Analysis cancelled".to_string()
            }
            (_, Language::Chinese) => "分析失败: 内部错误".to_string(),
            (_, Language::English) => "Analysis failed: internal error".to_string(),
        }
    }

    /// Whether this is a programming error rather than an environmental failure
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingDependency { .. }
                | PipelineError::DuplicateOutput(_)
                | PipelineError::Prompt { .. }
        )
    }
}

fn llm_reason(err: &LLMError) -> String {
    match err {
        LLMError::Api { status, .. } => format!("LLM service returned HTTP {status}"),
        e if e.is_timeout() => "LLM service timeout".to_string(),
        LLMError::HttpError(_) | LLMError::StreamRead(_) => "LLM service unreachable".to_string(),
        LLMError::StreamError { message, .. } => message.clone(),
        LLMError::Cancelled => "cancelled".to_string(),
        _ => "LLM error".to_string(),
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
