//! Analysis services
//!
//! Defines the `Analyzer` seam between the audit session and whatever
//! produces verdicts for it, plus the two implementations: the live Gemini
//! backend client and the no-credential demo fallback. Exactly one analyzer
//! is selected at startup and used for the life of the process.

pub mod demo;
pub mod gemini_client;

pub use demo::DemoAnalyzer;
pub use gemini_client::GeminiClient;

use civiclens_common::{AnalysisSource, AuditResult};
use thiserror::Error;

/// One uploaded input file held in memory for a single audit.
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Original client-supplied file name (informational)
    pub file_name: String,
    /// MIME type forwarded to the backend (e.g. "video/mp4")
    pub mime_type: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// File size in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Result of one analysis call: the ordered verdict records plus an
/// explicit provenance tag (live backend reply vs. canned demo data).
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// Verdict records in model-emitted order (no reordering, no dedup)
    pub results: Vec<AuditResult>,
    /// Where the results came from
    pub source: AnalysisSource,
}

/// Analysis failure taxonomy.
///
/// Every variant is terminal for the current audit attempt; no retry is
/// performed and the demo dataset is never substituted after a real
/// request was attempted.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Input rejected before any encoding or network activity
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Backend rejected or failed the request
    #[error("API error: {0}")]
    Api(String),

    /// Backend reply was empty or structurally invalid
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Analyzer seam: turns a (video, document) pair into an ordered sequence
/// of verdict records, or fails.
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyzer name for logging and provenance
    fn name(&self) -> &'static str;

    /// Run one audit. One backend request per call; the caller guards
    /// against overlapping invocations.
    async fn analyze(
        &self,
        video: &MediaFile,
        document: &MediaFile,
    ) -> Result<AnalysisOutcome, AnalysisError>;
}
