//! Stateless analysis proxy endpoint
//!
//! POST /api/analyze: multipart upload with exactly one `video` and one
//! `pdf` part, proxied through the configured analyzer in a single call.
//! Upload bodies are spooled to temp files that are removed on every exit
//! path (RAII drop), success or failure alike.

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::services::{Analyzer, MediaFile};
use crate::AppState;

/// One upload spooled to disk for the duration of the request.
/// The temp file is deleted when this drops, on all exit paths.
struct SpooledUpload {
    file: NamedTempFile,
    file_name: String,
    mime_type: String,
}

impl SpooledUpload {
    fn into_media_file(self) -> ApiResult<MediaFile> {
        let bytes = std::fs::read(self.file.path())?;
        Ok(MediaFile::new(self.file_name, self.mime_type, bytes))
        // self.file dropped here; the temp file is unlinked
    }
}

/// Spool one multipart field to a temp file
async fn spool_field(
    field: axum::extract::multipart::Field<'_>,
    default_mime: &str,
) -> ApiResult<SpooledUpload> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let mime_type = field
        .content_type()
        .unwrap_or(default_mime)
        .to_string();

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

    let mut file = NamedTempFile::new()?;
    file.write_all(&bytes)?;

    Ok(SpooledUpload {
        file,
        file_name,
        mime_type,
    })
}

/// POST /api/analyze
///
/// Multipart fields: `video` (exactly one), `pdf` (exactly one).
/// Returns 200 with the JSON array of audit records, 400 if either field
/// is missing or duplicated, 500 on backend/parse failure.
pub async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut video: Option<SpooledUpload> = None;
    let mut pdf: Option<SpooledUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("video") => {
                if video.is_some() {
                    return Err(ApiError::BadRequest(
                        "Duplicate 'video' field (exactly one expected)".to_string(),
                    ));
                }
                video = Some(spool_field(field, "video/mp4").await?);
            }
            Some("pdf") => {
                if pdf.is_some() {
                    return Err(ApiError::BadRequest(
                        "Duplicate 'pdf' field (exactly one expected)".to_string(),
                    ));
                }
                pdf = Some(spool_field(field, "application/pdf").await?);
            }
            // Unknown fields are ignored
            _ => {}
        }
    }

    let (Some(video), Some(pdf)) = (video, pdf) else {
        return Err(ApiError::BadRequest("Missing files".to_string()));
    };

    let video = video.into_media_file()?;
    let pdf = pdf.into_media_file()?;

    info!(
        analyzer = state.analyzer.name(),
        video = %video.file_name,
        video_bytes = video.size(),
        pdf = %pdf.file_name,
        pdf_bytes = pdf.size(),
        "Running stateless audit"
    );

    let outcome = state
        .analyzer
        .analyze(&video, &pdf)
        .await
        .map_err(|e| {
            warn!(error = %e, "Stateless audit failed");
            ApiError::from(e)
        })?;

    Ok((
        StatusCode::OK,
        [(
            header::HeaderName::from_static("x-analysis-source"),
            outcome.source.as_str(),
        )],
        Json(outcome.results),
    )
        .into_response())
}
