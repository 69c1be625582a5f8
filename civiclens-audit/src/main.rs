//! civiclens-audit - claim audit service
//!
//! Accepts a video and a PDF, forwards both to a generative-model backend
//! with a fixed audit protocol, and serves the structured verdicts back.
//! Starts in demo mode when no backend credential is configured.

use anyhow::Result;
use civiclens_audit::services::{Analyzer, DemoAnalyzer, GeminiClient};
use civiclens_audit::{build_router, AppState};
use civiclens_common::config::CivicConfig;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting CivicLens Audit Service (civiclens-audit) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = CivicConfig::load()?;

    // Exactly one analyzer for the life of the process: the live backend
    // when a credential is configured, otherwise the demo fallback
    let analyzer: Arc<dyn Analyzer> = if config.gemini.api_key.is_some() {
        info!(model = %config.gemini.model, "✓ Gemini credential configured (live mode)");
        Arc::new(GeminiClient::new(config.gemini.clone()))
    } else {
        info!("No Gemini credential configured - running in demo mode");
        Arc::new(DemoAnalyzer::new())
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(analyzer, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("civiclens-audit listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
