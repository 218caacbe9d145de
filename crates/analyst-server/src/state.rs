//! Shared application state

use analyst_pipeline::AnalysisOrchestrator;
use std::sync::Arc;
use std::time::Duration;

/// State shared by every request handler
///
/// The orchestrator, and through it the provider and data clients, are
/// process-wide and read-only.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    /// Deadline of one analysis run
    pub analysis_timeout: Duration,
}

impl AppState {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, analysis_timeout: Duration) -> Self {
        Self {
            orchestrator,
            analysis_timeout,
        }
    }
}
