//! stock-analyst server binary
//!
//! # Usage
//!
//! ```bash
//! export LLM_PROVIDER=deepseek
//! export DEEPSEEK_API_KEY=sk-...
//! export PYTHON_SERVICE_URL=http://localhost:5000
//!
//! cargo run --bin stock-analyst -- --port 8080
//! ```

use analyst_llm::ProviderKind;
use analyst_pipeline::Language;
use analyst_server::{ServerConfigBuilder, serve};
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stock-analyst")]
#[command(about = "Streams five-stage LLM stock analyses over SSE", long_about = None)]
struct Args {
    /// Interface to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides GO_API_PORT / PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// LLM provider: claude, glm or deepseek (overrides LLM_PROVIDER)
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Prompt language: zh or en (overrides PROMPT_LANGUAGE)
    #[arg(short, long, value_parser = parse_language)]
    language: Option<Language>,
}

fn parse_language(raw: &str) -> Result<Language, String> {
    Language::from_code(raw).ok_or_else(|| format!("unsupported language '{raw}' (expected zh or en)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    analyst_utils::init_tracing();

    let args = Args::parse();

    let mut builder = ServerConfigBuilder::from_env().context("Failed to read configuration")?;
    if let Some(host) = args.host {
        builder = builder.host(host);
    }
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if let Some(provider) = args.provider {
        builder = builder.provider_kind(provider);
    }
    if let Some(language) = args.language {
        builder = builder.language(language);
    }
    let config = builder.build().context("Invalid configuration")?;

    info!(
        provider = %config.provider.kind,
        model = %config.provider.model,
        "Configuration loaded"
    );

    serve(config).await?;
    Ok(())
}
