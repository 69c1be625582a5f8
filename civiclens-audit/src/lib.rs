//! civiclens-audit library - claim audit service
//!
//! Proxies video+document audits through a generative-model backend and
//! serves the audit session (status, verdict feed, report export) over
//! HTTP. The backend credential lives only in this service's
//! configuration; clients never talk to the model directly.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use civiclens_common::config::CivicConfig;

pub mod api;
pub mod error;
pub mod feed;
pub mod services;
pub mod session;

use services::Analyzer;
use session::AuditSession;

/// Ceiling on incoming multipart bodies. Comfortably above the video
/// payload ceiling so oversize uploads reach the analyzer's own guard and
/// produce its message instead of a generic 413.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The audit session (one per service instance)
    pub session: Arc<RwLock<AuditSession>>,
    /// Analyzer selected at startup (live backend or demo fallback)
    pub analyzer: Arc<dyn Analyzer>,
    /// Resolved service configuration
    pub config: Arc<CivicConfig>,
}

impl AppState {
    /// Create new application state
    pub fn new(analyzer: Arc<dyn Analyzer>, config: CivicConfig) -> Self {
        Self {
            session: Arc::new(RwLock::new(AuditSession::new())),
            analyzer,
            config: Arc::new(config),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/analyze", post(api::analyze))
        .route("/api/session/video", post(api::upload_video))
        .route("/api/session/pdf", post(api::upload_pdf))
        .route("/api/session/run", post(api::run_audit))
        .route("/api/session/state", get(api::get_state))
        .route("/api/session/seek", post(api::seek))
        .route("/api/session/report", get(api::get_report))
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
