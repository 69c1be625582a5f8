//! Audit data model
//!
//! Defines the structured verdict contract shared by the analysis client
//! (expected model output shape) and the feed projection (expected input
//! shape). A single audit compares the spoken claims in a video against the
//! text of a document; each claim produces one `AuditResult`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{time, Error, Result};

/// Synthetic claim text emitted when the video and document are judged
/// topically unrelated (Phase 1 of the audit protocol).
pub const MISMATCH_CLAIM: &str = "IRRELEVANT FILES DETECTED";

/// Classification of a claim's accuracy against the document.
///
/// Closed four-value set; the model backend is schema-constrained to emit
/// exactly these strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// The video claim matches the document text exactly
    True,
    /// The video claim explicitly contradicts the document text
    False,
    /// The details are mixed or partially correct
    Partial,
    /// The document does not contain the specific data point claimed
    Ambiguous,
}

/// Supporting or contradicting excerpt located in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEvidence {
    /// 1-based page number in the document
    pub page: u32,
    /// Literal text excerpt used to support the verdict
    pub text: String,
}

/// Structured restatement of a free-text claim into comparable fields.
///
/// Claim shape varies by topic, so this is a union of the known shapes with
/// a generic string-keyed fallback. Variants are tried in declaration order
/// during deserialization; the fallback accepts anything the model emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedClaim {
    /// Phase-1 topic mismatch report (the degenerate "unrelated files" case)
    TopicMismatch {
        video_topic: String,
        pdf_topic: String,
        status: String,
    },
    /// Monetary claim (allocation, spend, funding amount)
    Financial {
        #[serde(skip_serializing_if = "Option::is_none")]
        project: Option<String>,
        amount: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        currency: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        date: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },
    /// Project schedule / status claim
    Schedule {
        project: String,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        date: Option<String>,
    },
    /// Any other claim shape the model produced
    Other(BTreeMap<String, serde_json::Value>),
}

impl NormalizedClaim {
    /// True when this is the Phase-1 topic mismatch shape
    pub fn is_topic_mismatch(&self) -> bool {
        matches!(self, NormalizedClaim::TopicMismatch { .. })
    }
}

/// One claim-verification record.
///
/// All seven fields are mandatory; a model reply missing any field fails
/// deserialization and the whole reply is rejected (replies are accepted
/// atomically, never partially).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    /// Position of the claim in the video, "MM:SS"
    pub timestamp: String,
    /// The claim as stated in the video
    pub speaker_claim: String,
    /// Structured restatement of the claim
    pub normalized_claim: NormalizedClaim,
    /// Document excerpt supporting the verdict
    pub document_evidence: DocumentEvidence,
    /// Accuracy classification
    pub verdict: Verdict,
    /// Model confidence in the verdict, 0.0-1.0
    pub confidence: f64,
    /// Free-text justification
    pub reasoning: String,
}

impl AuditResult {
    /// Validate the record invariants beyond what serde enforces:
    /// confidence within [0, 1], evidence page ≥ 1, parseable timestamp.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::InvalidInput(format!(
                "confidence {} outside [0, 1] for claim at {}",
                self.confidence, self.timestamp
            )));
        }
        if self.document_evidence.page < 1 {
            return Err(Error::InvalidInput(format!(
                "evidence page must be >= 1 for claim at {}",
                self.timestamp
            )));
        }
        time::parse_timestamp(&self.timestamp)?;
        Ok(())
    }

    /// True when this record reports that the inputs were unrelated
    pub fn is_mismatch_report(&self) -> bool {
        self.speaker_claim == MISMATCH_CLAIM
    }
}

/// Provenance of a result set.
///
/// Explicit tag carried alongside every analysis outcome so the demo
/// fallback is distinguishable from a genuine backend reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    /// Result of a real backend request
    Live,
    /// Fixed demonstration dataset (no credential configured)
    Demo,
}

impl AnalysisSource {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisSource::Live => "live",
            AnalysisSource::Demo => "demo",
        }
    }
}
