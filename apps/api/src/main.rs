mod config;
mod errors;
mod ingestion;
mod llm_client;
mod render;
mod routes;
mod session;
mod state;
mod tuning;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::render::{ExportOptions, WkHtmlToPdfExporter};
use crate::routes::build_router;
use crate::session::store::SessionStore;
use crate::state::AppState;
use crate::tuning::GeminiTuner;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ResuTune API v{}", env!("CARGO_PKG_VERSION"));

    // The key is not validated here; a missing or bad key surfaces on the first tuning call.
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; tuning requests will fail until it is configured");
    }
    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        config.gemini_api_base.clone(),
        config.gemini_max_retries,
    )
    .context("Failed to build Gemini HTTP client")?;
    info!(
        "LLM client initialized (model: {}, instruction: {}, retries: {})",
        llm_client::MODEL,
        tuning::prompts::SYSTEM_INSTRUCTION_VERSION,
        config.gemini_max_retries
    );

    let exporter = WkHtmlToPdfExporter::from_command(&config.pdf_engine)
        .context("PDF_ENGINE must name an executable")?;
    info!("PDF export engine: {}", config.pdf_engine);

    let state = AppState {
        config: config.clone(),
        sessions: Arc::new(SessionStore::new()),
        tuner: Arc::new(GeminiTuner::new(llm)),
        exporter: Arc::new(exporter),
        export_options: ExportOptions::standard(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the front end has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
