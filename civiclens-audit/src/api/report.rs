//! Report export endpoint
//!
//! Serializes the current result sequence as formatted JSON for download.
//! Pure export, no core logic.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::{ApiError, ApiResult};
use crate::session::{AnalysisStatus, REPORT_FILENAME};
use crate::AppState;

/// GET /api/session/report
///
/// 409 until an audit has completed; otherwise the results array as
/// pretty-printed JSON with an attachment disposition.
pub async fn get_report(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> ApiResult<Response> {
    let session = state.session.read().await;

    if session.status() != AnalysisStatus::Complete {
        return Err(ApiError::Conflict(
            "No completed audit to export".to_string(),
        ));
    }

    let report = session.report_json()?;

    tracing::info!(
        session_id = %session.session_id,
        records = session.results().len(),
        "Report exported"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", REPORT_FILENAME),
            ),
        ],
        report,
    )
        .into_response())
}
