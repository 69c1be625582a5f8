//! Audit feed projection
//!
//! Pure projection of `(results, status)` into the list a presentation
//! layer renders: a placeholder while idle, an indeterminate progress
//! marker while analyzing, the failure message on error, and one row per
//! verdict record on completion. Row order is exactly input order; no
//! sorting, filtering, or pagination.

use civiclens_common::{AuditResult, NormalizedClaim, Verdict};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::session::AnalysisStatus;

/// Visual classification of a verdict row. Pure function of the verdict;
/// anything outside the four known cases renders neutrally instead of
/// failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStyle {
    /// TRUE - claim confirmed by the document
    Confirmed,
    /// FALSE - claim contradicted by the document
    Contradicted,
    /// PARTIAL - mixed accuracy
    Mixed,
    /// AMBIGUOUS - document silent on the claim
    Unverified,
    /// No or unknown verdict
    Neutral,
}

/// Map a verdict to its row style
pub fn verdict_style(verdict: Option<Verdict>) -> VerdictStyle {
    match verdict {
        Some(Verdict::True) => VerdictStyle::Confirmed,
        Some(Verdict::False) => VerdictStyle::Contradicted,
        Some(Verdict::Partial) => VerdictStyle::Mixed,
        Some(Verdict::Ambiguous) => VerdictStyle::Unverified,
        None => VerdictStyle::Neutral,
    }
}

/// Evidence disclosure payload, shown when a row is expanded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidencePanel {
    pub normalized_claim: NormalizedClaim,
    pub page: u32,
    pub text: String,
}

/// One rendered verdict row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedRow {
    /// Position in the result sequence (stable toggle/seek handle)
    pub index: usize,
    /// "MM:SS" position of the claim; the seek affordance emits this
    /// string unchanged
    pub timestamp: String,
    pub speaker_claim: String,
    pub verdict: Verdict,
    pub style: VerdictStyle,
    pub confidence: f64,
    pub reasoning: String,
    /// Disclosure content (collapsed by default)
    pub evidence: EvidencePanel,
}

/// Projection of the whole feed for one `(results, status)` pair
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "view", content = "content")]
pub enum FeedView {
    /// Idle: instructional placeholder, no results shown
    Placeholder { message: String },
    /// Analyzing: indeterminate progress, results ignored
    Progress { message: String },
    /// Error: failure message
    Failure { message: String },
    /// Complete: one row per record, input order
    Rows(Vec<FeedRow>),
}

/// Project `(results, status, error)` into the feed view.
///
/// Idempotent: the same inputs always yield the same rows in the same
/// order.
pub fn project(
    results: &[AuditResult],
    status: AnalysisStatus,
    error: Option<&str>,
) -> FeedView {
    match status {
        AnalysisStatus::Idle => FeedView::Placeholder {
            message: "Upload a video and a PDF, then run the audit.".to_string(),
        },
        AnalysisStatus::Analyzing => FeedView::Progress {
            message: "Analyzing claims against the document...".to_string(),
        },
        AnalysisStatus::Error => FeedView::Failure {
            message: error.unwrap_or("Analysis failed").to_string(),
        },
        AnalysisStatus::Complete => FeedView::Rows(
            results
                .iter()
                .enumerate()
                .map(|(index, result)| FeedRow {
                    index,
                    timestamp: result.timestamp.clone(),
                    speaker_claim: result.speaker_claim.clone(),
                    verdict: result.verdict,
                    style: verdict_style(Some(result.verdict)),
                    confidence: result.confidence,
                    reasoning: result.reasoning.clone(),
                    evidence: EvidencePanel {
                        normalized_claim: result.normalized_claim.clone(),
                        page: result.document_evidence.page,
                        text: result.document_evidence.text.clone(),
                    },
                })
                .collect(),
        ),
    }
}

/// Per-row interaction state: which evidence disclosures are open.
///
/// Rows start collapsed and toggle independently. Cleared whenever a new
/// result set replaces the old one.
#[derive(Debug, Default)]
pub struct FeedState {
    expanded: BTreeSet<usize>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle one row's evidence disclosure; returns the new state
    pub fn toggle_evidence(&mut self, index: usize) -> bool {
        if self.expanded.remove(&index) {
            false
        } else {
            self.expanded.insert(index);
            true
        }
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.contains(&index)
    }

    /// Forget all disclosure state (new result set)
    pub fn clear(&mut self) {
        self.expanded.clear();
    }

    /// Activate a row's seek affordance: emits the row's timestamp string
    /// unchanged, or `None` for an out-of-range index.
    pub fn seek<'a>(&self, rows: &'a [FeedRow], index: usize) -> Option<&'a str> {
        rows.get(index).map(|row| row.timestamp.as_str())
    }
}
