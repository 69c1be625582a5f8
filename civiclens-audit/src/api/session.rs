//! Session API handlers
//!
//! The orchestrator surface: file selection, the guarded "run audit"
//! action, status/feed polling, and the seek side effect. The session is
//! the one shared mutable resource; the `analyzing` status is the only
//! concurrency guard (one outstanding analysis at a time).

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use civiclens_common::{time, AnalysisSource, AuditResult};

use crate::error::{ApiError, ApiResult};
use crate::feed::{self, FeedView};
use crate::services::{Analyzer, MediaFile};
use crate::session::AnalysisStatus;
use crate::AppState;

/// Read the single file out of a session upload request
async fn read_upload(mut multipart: Multipart, default_mime: &str) -> ApiResult<MediaFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        // Take the first part that carries a file
        if field.file_name().is_none() && field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field.content_type().unwrap_or(default_mime).to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
        }
        return Ok(MediaFile::new(file_name, mime_type, bytes.to_vec()));
    }
    Err(ApiError::BadRequest("No file in upload".to_string()))
}

/// Upload acknowledgement
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub session_id: Uuid,
    pub status: AnalysisStatus,
    pub file_name: String,
    pub size_bytes: u64,
}

/// POST /api/session/video
///
/// Select the video input. From a terminal status this resets the session
/// to idle and clears prior results.
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let file = read_upload(multipart, "video/mp4").await?;
    let mut session = state.session.write().await;
    let (file_name, size_bytes) = (file.file_name.clone(), file.size());
    session.set_video(file);

    tracing::info!(
        session_id = %session.session_id,
        file = %file_name,
        bytes = size_bytes,
        "Video selected"
    );

    Ok(Json(UploadResponse {
        session_id: session.session_id,
        status: session.status(),
        file_name,
        size_bytes,
    }))
}

/// POST /api/session/pdf
///
/// Select the document input. Same reset rule as the video upload.
pub async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let file = read_upload(multipart, "application/pdf").await?;
    let mut session = state.session.write().await;
    let (file_name, size_bytes) = (file.file_name.clone(), file.size());
    session.set_pdf(file);

    tracing::info!(
        session_id = %session.session_id,
        file = %file_name,
        bytes = size_bytes,
        "PDF selected"
    );

    Ok(Json(UploadResponse {
        session_id: session.session_id,
        status: session.status(),
        file_name,
        size_bytes,
    }))
}

/// POST /api/session/run response
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub session_id: Uuid,
    pub status: AnalysisStatus,
}

/// POST /api/session/run
///
/// Start an audit. 400 unless both files are present, 409 while a run is
/// already outstanding. The analysis executes as a background task; poll
/// GET /api/session/state for the outcome. No cancellation primitive:
/// once issued, the request runs to completion or failure.
pub async fn run_audit(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<RunResponse>)> {
    let (session_id, video, pdf) = {
        let mut session = state.session.write().await;

        if session.status() == AnalysisStatus::Analyzing {
            return Err(ApiError::Conflict("Audit already running".to_string()));
        }
        if !session.files_ready() {
            return Err(ApiError::BadRequest(
                "Both a video and a PDF must be uploaded before running an audit".to_string(),
            ));
        }

        // Guard passed; transition to analyzing and snapshot the inputs
        // so the lock is not held across the backend call
        let started = session.start_run();
        debug_assert!(started);

        (
            session.session_id,
            session.video().cloned(),
            session.pdf().cloned(),
        )
    };
    // files_ready() held under the same lock, so both are present
    let (Some(video), Some(pdf)) = (video, pdf) else {
        return Err(ApiError::Internal("Session files disappeared".to_string()));
    };

    tracing::info!(
        session_id = %session_id,
        analyzer = state.analyzer.name(),
        "Audit started"
    );

    let analyzer = state.analyzer.clone();
    let session = state.session.clone();
    tokio::spawn(async move {
        let result = analyzer.analyze(&video, &pdf).await;
        let mut session = session.write().await;
        match result {
            Ok(outcome) => {
                tracing::info!(
                    session_id = %session_id,
                    records = outcome.results.len(),
                    source = outcome.source.as_str(),
                    "Audit completed"
                );
                session.complete_run(outcome);
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Audit failed");
                session.fail_run(e.to_string());
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(RunResponse {
            session_id,
            status: AnalysisStatus::Analyzing,
        }),
    ))
}

/// GET /api/session/state response
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub session_id: Uuid,
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<AnalysisSource>,
    pub video_selected: bool,
    pub pdf_selected: bool,
    pub results: Vec<AuditResult>,
    pub feed: FeedView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seek: Option<String>,
}

/// GET /api/session/state
///
/// Current status, provenance tag, results, and the projected feed view.
pub async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    let session = state.session.read().await;
    let feed = feed::project(session.results(), session.status(), session.error());

    Json(StateResponse {
        session_id: session.session_id,
        status: session.status(),
        error: session.error().map(str::to_string),
        source: session.source(),
        video_selected: session.video().is_some(),
        pdf_selected: session.pdf().is_some(),
        results: session.results().to_vec(),
        feed,
        last_seek: session.last_seek().map(str::to_string),
    })
}

/// POST /api/session/seek request
#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    pub timestamp: String,
}

/// POST /api/session/seek response
#[derive(Debug, Serialize)]
pub struct SeekResponse {
    /// The timestamp string, passed through unchanged
    pub timestamp: String,
    /// Offset the playback collaborator should seek to
    pub seconds: u32,
}

/// POST /api/session/seek
///
/// Store the clicked timestamp for the playback collaborator. The string
/// is validated ("MM:SS") and echoed back unchanged with its derived
/// offset in seconds.
pub async fn seek(
    State(state): State<AppState>,
    Json(request): Json<SeekRequest>,
) -> ApiResult<Json<SeekResponse>> {
    let seconds = time::parse_timestamp(&request.timestamp)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut session = state.session.write().await;
    session.seek(request.timestamp.clone());

    tracing::debug!(
        session_id = %session.session_id,
        timestamp = %request.timestamp,
        seconds,
        "Seek recorded"
    );

    Ok(Json(SeekResponse {
        timestamp: request.timestamp,
        seconds,
    }))
}
