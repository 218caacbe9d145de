//! Domain events streamed to the client
//!
//! Events are emitted in a strict total order. Every run that stops emitting
//! ends with exactly one terminal event, [`StreamEvent::Done`] or
//! [`StreamEvent::Error`].

use crate::{Language, Stage};
use serde_json::{Value, json};

/// `step` value of the initial fetch progress event
pub const FETCH_STEP: &str = "fetching_data";

/// Progress reported while fetching the financial data
pub const FETCH_PROGRESS: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A phase started
    Progress {
        step: &'static str,
        message: String,
        progress: u8,
    },
    /// One generated fragment of a stage
    AnalysisStep {
        stage: Stage,
        role: &'static str,
        content: String,
        progress: u8,
    },
    /// The run finished successfully
    Done { message: String },
    /// The run failed; carries a client-safe message
    Error { message: String },
}

impl StreamEvent {
    pub fn fetching(lang: Language) -> Self {
        let message = match lang {
            Language::Chinese => "正在获取股票数据...",
            Language::English => "Fetching stock data...",
        };
        StreamEvent::Progress {
            step: FETCH_STEP,
            message: message.to_string(),
            progress: FETCH_PROGRESS,
        }
    }

    pub fn stage_started(stage: Stage, lang: Language) -> Self {
        let message = match lang {
            Language::Chinese => format!("正在进行{}...", stage.label(lang)),
            Language::English => format!("Running {}...", stage.label(lang)),
        };
        StreamEvent::Progress {
            step: stage.as_str(),
            message,
            progress: stage.progress(),
        }
    }

    pub fn fragment(stage: Stage, lang: Language, content: impl Into<String>) -> Self {
        StreamEvent::AnalysisStep {
            stage,
            role: stage.label(lang),
            content: content.into(),
            progress: stage.progress(),
        }
    }

    pub fn done(lang: Language) -> Self {
        let message = match lang {
            Language::Chinese => "分析完成",
            Language::English => "Analysis complete",
        };
        StreamEvent::Done {
            message: message.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }

    /// SSE `event:` name
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::Progress { .. } => "progress",
            StreamEvent::AnalysisStep { .. } => "analysis_step",
            StreamEvent::Done { .. } => "done",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// SSE `data:` payload
    pub fn payload(&self) -> Value {
        match self {
            StreamEvent::Progress {
                step,
                message,
                progress,
            } => json!({ "step": step, "message": message, "progress": progress }),
            StreamEvent::AnalysisStep {
                stage,
                role,
                content,
                progress,
            } => json!({
                "step": stage.as_str(),
                "role": role,
                "content": content,
                "progress": progress,
            }),
            StreamEvent::Done { message } | StreamEvent::Error { message } => {
                json!({ "message": message })
            }
        }
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}
