//! Audit session state machine
//!
//! One session owns the two uploaded input files, the current analysis
//! status, and the verdict records from the most recent run. Status moves
//! `idle → analyzing → {complete | error}`; only an explicit run re-enters
//! `analyzing`, and selecting a new file from a terminal state resets to
//! `idle` and discards results.

use chrono::{DateTime, Utc};
use civiclens_common::{AnalysisSource, AuditResult, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::{AnalysisOutcome, MediaFile};

/// File name offered for the report download
pub const REPORT_FILENAME: &str = "civic_audit_report.json";

/// Analysis status. Exactly one holds at a time; the error message lives
/// alongside it in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// No audit run yet (or inputs changed since the last one)
    Idle,
    /// One analysis request outstanding
    Analyzing,
    /// Last run succeeded; results are populated
    Complete,
    /// Last run failed; error message is populated
    Error,
}

/// Audit session (in-memory state).
#[derive(Debug)]
pub struct AuditSession {
    /// Unique session identifier
    pub session_id: Uuid,
    /// Current status
    status: AnalysisStatus,
    /// Failure message for the `Error` status
    error: Option<String>,
    /// Uploaded video, if any
    video: Option<MediaFile>,
    /// Uploaded document, if any
    pdf: Option<MediaFile>,
    /// Verdict records from the most recent completed run
    results: Vec<AuditResult>,
    /// Provenance of the current results
    source: Option<AnalysisSource>,
    /// Most recently clicked timestamp, for the playback collaborator
    last_seek: Option<String>,
    /// Session creation time
    pub started_at: DateTime<Utc>,
}

impl AuditSession {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            status: AnalysisStatus::Idle,
            error: None,
            video: None,
            pdf: None,
            results: Vec::new(),
            source: None,
            last_seek: None,
            started_at: Utc::now(),
        }
    }

    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn results(&self) -> &[AuditResult] {
        &self.results
    }

    pub fn source(&self) -> Option<AnalysisSource> {
        self.source
    }

    pub fn last_seek(&self) -> Option<&str> {
        self.last_seek.as_deref()
    }

    pub fn video(&self) -> Option<&MediaFile> {
        self.video.as_ref()
    }

    pub fn pdf(&self) -> Option<&MediaFile> {
        self.pdf.as_ref()
    }

    /// Both inputs present, so a run may start
    pub fn files_ready(&self) -> bool {
        self.video.is_some() && self.pdf.is_some()
    }

    /// Select a new video file.
    ///
    /// From `complete` or `error` this resets the session to `idle` and
    /// clears prior results. During `analyzing` the in-flight request is
    /// NOT aborted; the new file simply replaces the stored one.
    pub fn set_video(&mut self, file: MediaFile) {
        self.reset_if_terminal();
        self.video = Some(file);
    }

    /// Select a new document file. Same reset rule as `set_video`.
    pub fn set_pdf(&mut self, file: MediaFile) {
        self.reset_if_terminal();
        self.pdf = Some(file);
    }

    fn reset_if_terminal(&mut self) {
        if matches!(self.status, AnalysisStatus::Complete | AnalysisStatus::Error) {
            self.status = AnalysisStatus::Idle;
            self.error = None;
            self.results.clear();
            self.source = None;
            self.last_seek = None;
        }
    }

    /// Attempt to start an audit run.
    ///
    /// Guarded no-op (returns `false`, state unchanged) unless both files
    /// are present and no run is outstanding. On success the status becomes
    /// `analyzing` and prior results are cleared.
    pub fn start_run(&mut self) -> bool {
        if !self.files_ready() || self.status == AnalysisStatus::Analyzing {
            return false;
        }
        self.status = AnalysisStatus::Analyzing;
        self.error = None;
        self.results.clear();
        self.source = None;
        true
    }

    /// Record a successful analysis outcome.
    pub fn complete_run(&mut self, outcome: AnalysisOutcome) {
        debug_assert_eq!(self.status, AnalysisStatus::Analyzing);
        self.results = outcome.results;
        self.source = Some(outcome.source);
        self.error = None;
        self.status = AnalysisStatus::Complete;
    }

    /// Record a failed analysis attempt.
    pub fn fail_run(&mut self, message: impl Into<String>) {
        debug_assert_eq!(self.status, AnalysisStatus::Analyzing);
        self.error = Some(message.into());
        self.status = AnalysisStatus::Error;
    }

    /// Store the most recently clicked timestamp. The string is passed
    /// through unchanged for the playback collaborator to interpret.
    pub fn seek(&mut self, timestamp: impl Into<String>) {
        self.last_seek = Some(timestamp.into());
    }

    /// Serialize the current results for the report download.
    pub fn report_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.results)
            .map_err(|e| civiclens_common::Error::Internal(format!("Report serialization: {}", e)))
    }
}

impl Default for AuditSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::demo::demo_audit_results;

    fn video() -> MediaFile {
        MediaFile::new("clip.mp4", "video/mp4", vec![1, 2, 3])
    }

    fn pdf() -> MediaFile {
        MediaFile::new("budget.pdf", "application/pdf", vec![4, 5, 6])
    }

    fn demo_outcome() -> AnalysisOutcome {
        AnalysisOutcome {
            results: demo_audit_results(),
            source: AnalysisSource::Demo,
        }
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = AuditSession::new();
        assert_eq!(session.status(), AnalysisStatus::Idle);
        assert!(session.results().is_empty());
        assert!(session.error().is_none());
    }

    #[test]
    fn test_run_is_noop_without_both_files() {
        let mut session = AuditSession::new();
        assert!(!session.start_run());
        assert_eq!(session.status(), AnalysisStatus::Idle);

        session.set_video(video());
        assert!(!session.start_run());
        assert_eq!(session.status(), AnalysisStatus::Idle);
    }

    #[test]
    fn test_run_transitions_through_analyzing_to_complete() {
        let mut session = AuditSession::new();
        session.set_video(video());
        session.set_pdf(pdf());

        assert!(session.start_run());
        assert_eq!(session.status(), AnalysisStatus::Analyzing);

        session.complete_run(demo_outcome());
        assert_eq!(session.status(), AnalysisStatus::Complete);
        assert_eq!(session.results().len(), 5);
        assert_eq!(session.source(), Some(AnalysisSource::Demo));
    }

    #[test]
    fn test_run_transitions_to_error_on_failure() {
        let mut session = AuditSession::new();
        session.set_video(video());
        session.set_pdf(pdf());
        session.start_run();

        session.fail_run("Network error: connection refused");
        assert_eq!(session.status(), AnalysisStatus::Error);
        assert_eq!(session.error(), Some("Network error: connection refused"));
        assert!(session.results().is_empty());
    }

    #[test]
    fn test_run_rejected_while_analyzing() {
        let mut session = AuditSession::new();
        session.set_video(video());
        session.set_pdf(pdf());
        assert!(session.start_run());
        // Second run while one is outstanding: guarded no-op
        assert!(!session.start_run());
        assert_eq!(session.status(), AnalysisStatus::Analyzing);
    }

    #[test]
    fn test_new_file_resets_terminal_state() {
        let mut session = AuditSession::new();
        session.set_video(video());
        session.set_pdf(pdf());
        session.start_run();
        session.complete_run(demo_outcome());
        session.seek("01:10");

        session.set_video(video());
        assert_eq!(session.status(), AnalysisStatus::Idle);
        assert!(session.results().is_empty());
        assert!(session.source().is_none());
        assert!(session.last_seek().is_none());
        // The other file survives the reset
        assert!(session.pdf().is_some());
    }

    #[test]
    fn test_new_file_during_analyzing_does_not_abort() {
        let mut session = AuditSession::new();
        session.set_video(video());
        session.set_pdf(pdf());
        session.start_run();

        session.set_video(video());
        assert_eq!(session.status(), AnalysisStatus::Analyzing);

        // The in-flight run still lands
        session.complete_run(demo_outcome());
        assert_eq!(session.status(), AnalysisStatus::Complete);
    }

    #[test]
    fn test_rerun_clears_prior_results() {
        let mut session = AuditSession::new();
        session.set_video(video());
        session.set_pdf(pdf());
        session.start_run();
        session.complete_run(demo_outcome());

        assert!(session.start_run());
        assert_eq!(session.status(), AnalysisStatus::Analyzing);
        assert!(session.results().is_empty());
        assert!(session.source().is_none());
    }

    #[test]
    fn test_seek_stores_timestamp_unchanged() {
        let mut session = AuditSession::new();
        session.seek("01:10");
        assert_eq!(session.last_seek(), Some("01:10"));
        assert_eq!(
            civiclens_common::time::parse_timestamp(session.last_seek().unwrap()).unwrap(),
            70
        );
    }

    #[test]
    fn test_report_round_trip() {
        let mut session = AuditSession::new();
        session.set_video(video());
        session.set_pdf(pdf());
        session.start_run();
        session.complete_run(demo_outcome());

        let report = session.report_json().unwrap();
        let parsed: Vec<AuditResult> = serde_json::from_str(&report).unwrap();
        assert_eq!(parsed, session.results());
    }
}
