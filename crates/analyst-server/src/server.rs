//! Server assembly and startup

use crate::{AppState, Result, ServerConfig, app};
use analyst_llm::build_provider;
use analyst_pipeline::{AnalysisOrchestrator, HttpFinancialDataClient};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the process-wide provider, data client and orchestrator
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let provider = build_provider(config.provider.clone())?;
    let source = HttpFinancialDataClient::with_timeout(
        config.data_service_url.clone(),
        config.fetch_timeout,
    )?;

    info!(
        provider = provider.name(),
        model = provider.model(),
        data_service = %source.base_url(),
        language = %config.language,
        "Analysis pipeline ready"
    );

    let orchestrator =
        AnalysisOrchestrator::new(Arc::new(source), provider).with_language(config.language);
    Ok(AppState::new(Arc::new(orchestrator), config.analysis_timeout))
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = build_state(&config)?;

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Starting stock-analyst on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_llm::{ProviderConfig, ProviderKind};

    #[test]
    fn test_build_state_from_config() {
        let config = ServerConfig::builder()
            .provider(ProviderConfig::new(ProviderKind::DeepSeek, "ds-key"))
            .build()
            .unwrap();

        let state = tokio_test::assert_ok!(build_state(&config));
        assert_eq!(state.orchestrator.provider_name(), "deepseek");
        assert_eq!(state.analysis_timeout, config.analysis_timeout);
    }
}
