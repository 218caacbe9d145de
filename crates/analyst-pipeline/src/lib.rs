//! Stock analysis orchestration pipeline
//!
//! Turns one "analyze this stock" request into a chain of five dependent LLM
//! generations and streams their text back as ordered [`StreamEvent`]s:
//!
//! 1. Fetch the financial-data document for the stock code
//! 2. `comprehensive` - neutral overview of the fundamentals
//! 3. `debate_bull` / `debate_bear` - opposing views built on the overview
//! 4. `trader` - concrete trading plan from the three texts above
//! 5. `final` - risk officer's verdict over the whole chain
//!
//! Each stage's text is written into the [`AnalysisContext`] before the next
//! stage's prompt is built, so later stages always see earlier output.
//!
//! # Example
//!
//! ```rust,ignore
//! use analyst_pipeline::{AnalysisOrchestrator, AnalysisRequest, HttpFinancialDataClient};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let source = Arc::new(HttpFinancialDataClient::new("http://localhost:5000")?);
//! let provider = analyst_llm::build_provider(config)?;
//! let orchestrator = Arc::new(AnalysisOrchestrator::new(source, provider));
//!
//! let mut events = orchestrator.start(AnalysisRequest::new("600519"), CancellationToken::new());
//! while let Some(event) = events.recv().await {
//!     println!("{}: {}", event.event_name(), event.payload());
//! }
//! ```

pub mod context;
pub mod error;
pub mod event;
pub mod fetch;
pub mod language;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod request;
pub mod stage;

pub use context::{AnalysisContext, AnalysisOutcome};
pub use error::{FetchError, PipelineError, Result};
pub use event::StreamEvent;
pub use fetch::{FinancialDataSource, HttpFinancialDataClient};
pub use language::Language;
pub use orchestrator::{AnalysisOrchestrator, CHANNEL_CAPACITY};
pub use report::FinancialReport;
pub use request::AnalysisRequest;
pub use stage::{RunState, Stage};
