//! Demo fallback analyzer
//!
//! Used when no Gemini credential is configured: returns a fixed
//! demonstration dataset after a simulated analysis delay so the service
//! stays demonstrable without secrets. Every outcome is tagged
//! `AnalysisSource::Demo` so callers can distinguish it from live results.

use async_trait::async_trait;
use civiclens_common::{
    AnalysisSource, AuditResult, DocumentEvidence, NormalizedClaim, Verdict,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

use super::{AnalysisError, AnalysisOutcome, Analyzer, MediaFile};

/// Simulated analysis delay before returning the canned dataset
pub const DEMO_DELAY: Duration = Duration::from_millis(1500);

/// Demo analyzer returning the fixed five-record dataset.
pub struct DemoAnalyzer {
    delay: Duration,
}

impl DemoAnalyzer {
    pub fn new() -> Self {
        Self { delay: DEMO_DELAY }
    }

    /// Override the simulated delay (tests use zero)
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for DemoAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Analyzer for DemoAnalyzer {
    fn name(&self) -> &'static str {
        "Demo"
    }

    async fn analyze(
        &self,
        _video: &MediaFile,
        _document: &MediaFile,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        info!("No API key configured - returning demo dataset");
        tokio::time::sleep(self.delay).await;
        Ok(AnalysisOutcome {
            results: demo_audit_results(),
            source: AnalysisSource::Demo,
        })
    }
}

/// The fixed demonstration dataset: five records covering every verdict
/// class against a fictional municipal budget briefing.
pub fn demo_audit_results() -> Vec<AuditResult> {
    vec![
        AuditResult {
            timestamp: "00:05".to_string(),
            speaker_claim: "We have fully allocated $500,000 to the Community Park renovation project this quarter.".to_string(),
            normalized_claim: NormalizedClaim::Financial {
                project: Some("Community Park".to_string()),
                amount: 500_000.0,
                currency: Some("USD".to_string()),
                date: None,
                status: Some("allocated".to_string()),
            },
            document_evidence: DocumentEvidence {
                page: 3,
                text: "Budget Item 4.2: Community Park Renovation. Allocated: $50,000 for Q1 planning phase.".to_string(),
            },
            verdict: Verdict::False,
            confidence: 0.98,
            reasoning: "The speaker claims $500,000 was allocated, but the official budget document clearly states only $50,000 was allocated for this period.".to_string(),
        },
        AuditResult {
            timestamp: "00:22".to_string(),
            speaker_claim: "The downtown bike lane extension was completed last month.".to_string(),
            normalized_claim: NormalizedClaim::Schedule {
                project: "Downtown Bike Lane".to_string(),
                status: "completed".to_string(),
                date: Some("last month".to_string()),
            },
            document_evidence: DocumentEvidence {
                page: 1,
                text: "Infrastructure Update: Downtown Bike Lane extension is currently 80% complete. Expected completion: Next Month.".to_string(),
            },
            verdict: Verdict::False,
            confidence: 0.95,
            reasoning: "The speaker claims completion, whereas the status report lists the project as 80% complete with a future expected completion date.".to_string(),
        },
        AuditResult {
            timestamp: "00:45".to_string(),
            speaker_claim: "We are moving forward with the solar panel installation on the library roof.".to_string(),
            normalized_claim: NormalizedClaim::Schedule {
                project: "Library Solar Panels".to_string(),
                status: "in_progress".to_string(),
                date: None,
            },
            document_evidence: DocumentEvidence {
                page: 5,
                text: "Approved Projects: Main Library Solar Installation. Status: Contractor selected, work to commence pending weather.".to_string(),
            },
            verdict: Verdict::True,
            confidence: 0.92,
            reasoning: "The claim of moving forward aligns with the document's status of 'Approved' and 'Contractor selected'.".to_string(),
        },
        AuditResult {
            timestamp: "01:10".to_string(),
            speaker_claim: "The timeline for the new school wing is roughly on track.".to_string(),
            normalized_claim: NormalizedClaim::Schedule {
                project: "New School Wing".to_string(),
                status: "on_track".to_string(),
                date: None,
            },
            document_evidence: DocumentEvidence {
                page: 2,
                text: "School Wing Annex: Construction delays due to supply chain. Revised timeline TBD.".to_string(),
            },
            verdict: Verdict::Partial,
            confidence: 0.85,
            reasoning: "The speaker claims it is 'roughly on track', but the document notes 'delays' and a 'Revised timeline TBD', suggesting a discrepancy that isn't a direct falsehood but certainly not fully accurate.".to_string(),
        },
        AuditResult {
            timestamp: "01:30".to_string(),
            speaker_claim: "We expect the state grant to cover the remaining costs.".to_string(),
            normalized_claim: NormalizedClaim::Other(BTreeMap::from([
                (
                    "source".to_string(),
                    serde_json::Value::String("State Grant".to_string()),
                ),
                (
                    "coverage".to_string(),
                    serde_json::Value::String("remaining costs".to_string()),
                ),
            ])),
            document_evidence: DocumentEvidence {
                page: 4,
                text: "Funding Sources: Federal Grant (Confirmed), State Grant (Application Pending).".to_string(),
            },
            verdict: Verdict::Ambiguous,
            confidence: 0.60,
            reasoning: "The speaker states an expectation, and the document confirms an application is pending. It is not possible to verify if it will cover costs until the grant is awarded.".to_string(),
        },
    ]
}
