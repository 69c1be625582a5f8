//! Gemini analysis client
//!
//! Issues one `generateContent` request per audit to the Gemini REST API,
//! carrying both input files inline (base64) together with the fixed
//! two-phase audit instruction and a response schema that constrains the
//! reply to an array of verdict records.
//!
//! # API Reference
//! - Endpoint: https://generativelanguage.googleapis.com/v1beta
//! - Documentation: https://ai.google.dev/api/generate-content

use async_trait::async_trait;
use base64::Engine;
use civiclens_common::config::GeminiConfig;
use civiclens_common::{AnalysisSource, AuditResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::{AnalysisError, AnalysisOutcome, Analyzer, MediaFile};

/// Default timeout for Gemini requests. Video analysis is slow; the backend
/// regularly takes tens of seconds for multi-minute clips.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Thinking budget forwarded with every audit request
const THINKING_BUDGET: u32 = 16_000;

/// Fixed system instruction: closed-world, two-phase audit protocol.
///
/// Phase 1 checks that the two inputs are topically related and reports a
/// single AMBIGUOUS mismatch record if not; Phase 2 extracts factual claims
/// and classifies each against the document text.
const SYSTEM_INSTRUCTION: &str = r#"
You are CivicLens, a STRICT autonomous auditor.

*** CRITICAL INSTRUCTION: CLOSED WORLD ASSUMPTION ***
1. You have NO knowledge of the outside world, history, or news.
2. You ONLY know what is explicitly contained in the uploaded VIDEO and PDF.
3. If information is not in the files, it DOES NOT EXIST. Do not "fill in the blanks".

YOUR TASK:
Compare the specific claims made in the VIDEO against the text in the PDF.

PHASE 1: CONTENT MATCHING CHECK (MANDATORY)
First, determine the specific topic of the VIDEO and the specific topic of the PDF.
- If the VIDEO is about "Topic A" and the PDF is about "Topic B" (completely unrelated), you MUST STOP.
- Do not attempt to force a comparison.

IF UNRELATED:
Return an array with exactly ONE object using this structure:
{
  "timestamp": "00:00",
  "speaker_claim": "IRRELEVANT FILES DETECTED",
  "normalized_claim": {
    "video_topic": "[Insert 1-sentence summary of Video]",
    "pdf_topic": "[Insert 1-sentence summary of PDF]",
    "status": "mismatch"
  },
  "document_evidence": {
     "page": 1,
     "text": "The PDF covers [PDF Topic], while the Video discusses [Video Topic]. No overlap found."
  },
  "verdict": "AMBIGUOUS",
  "confidence": 1.0,
  "reasoning": "The uploaded files are unrelated. I cannot compare [Video Topic] with [PDF Topic]."
}

PHASE 2: CLAIM VERIFICATION (Only if related)
If the topics match (e.g., both about the "Downtown Project"):
1. Transcribe factual claims from the video (Money, Dates, Status).
2. Search the PDF for the *exact* corresponding line item.
3. Compare them literally.

VERDICT RULES:
- TRUE: The video claim matches the PDF text exactly.
- FALSE: The video claim explicitly contradicts the PDF text.
- PARTIAL: The details are mixed or partially correct.
- AMBIGUOUS: The PDF does not contain the specific data point mentioned in the video.

OUTPUT FORMAT:
Return ONLY the JSON array.
"#;

/// User-turn prompt sent alongside the two inline files
const USER_PROMPT: &str = "Perform a forensic audit comparing the Video claims to the PDF text. \
     IGNORE all external knowledge. If files are unrelated, report the mismatch immediately.";

/// Machine-checkable response schema: array of verdict records with the
/// verdict field restricted to the closed four-value set.
fn response_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "timestamp": { "type": "STRING" },
                "speaker_claim": { "type": "STRING" },
                "normalized_claim": {
                    "type": "OBJECT",
                    "properties": {
                        "project": { "type": "STRING" },
                        "amount": { "type": "NUMBER" },
                        "currency": { "type": "STRING" },
                        "date": { "type": "STRING" },
                        "status": { "type": "STRING" },
                        "video_topic": { "type": "STRING" },
                        "pdf_topic": { "type": "STRING" }
                    }
                },
                "document_evidence": {
                    "type": "OBJECT",
                    "properties": {
                        "page": { "type": "INTEGER" },
                        "text": { "type": "STRING" }
                    }
                },
                "verdict": {
                    "type": "STRING",
                    "enum": ["TRUE", "FALSE", "PARTIAL", "AMBIGUOUS"]
                },
                "confidence": { "type": "NUMBER" },
                "reasoning": { "type": "STRING" }
            },
            "required": [
                "timestamp", "speaker_claim", "verdict", "reasoning",
                "confidence", "document_evidence", "normalized_claim"
            ]
        }
    })
}

/// Gemini analysis client (live path).
///
/// Holds an explicit configuration; constructed once at startup when a
/// credential is available. One HTTP request per audit, no retry.
pub struct GeminiClient {
    /// HTTP client for API requests
    http_client: Client,
    /// Backend configuration (credential, model, size ceiling)
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new client from explicit configuration.
    ///
    /// The configuration must carry a credential; selecting the demo
    /// fallback for credential-less operation is the caller's decision.
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    /// Reject oversize videos before any encoding or network activity.
    fn check_video_size(&self, video: &MediaFile) -> Result<(), AnalysisError> {
        let ceiling = self.config.max_video_bytes;
        if video.size() > ceiling {
            return Err(AnalysisError::InvalidInput(format!(
                "Video file too large: {} bytes exceeds the {} MiB limit. \
                 Please use a shorter clip.",
                video.size(),
                ceiling / (1024 * 1024)
            )));
        }
        Ok(())
    }

    /// Issue the generateContent request and return the model's text reply.
    async fn request_audit(
        &self,
        video: &MediaFile,
        document: &MediaFile,
    ) -> Result<String, AnalysisError> {
        let encoder = base64::engine::general_purpose::STANDARD;
        let document_data = encoder.encode(&document.bytes);
        let video_data = encoder.encode(&video.bytes);

        // Part order mirrors the protocol: document, video, then the prompt
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline(&document.mime_type, document_data),
                    Part::inline(&video.mime_type, video_data),
                    Part::text(USER_PROMPT),
                ],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part::text(SYSTEM_INSTRUCTION)],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: THINKING_BUDGET,
                }),
            },
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint, self.config.model
        );
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            AnalysisError::InvalidInput("Gemini client constructed without an API key".to_string())
        })?;

        debug!(
            model = %self.config.model,
            video_bytes = video.size(),
            document_bytes = document.size(),
            "Sending audit request to Gemini"
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Network(format!("Gemini API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Gemini API rejected audit request");
            if status.as_u16() == 400 {
                return Err(AnalysisError::Api(format!(
                    "API Error (400). The files might be unreadable or the \
                     request was rejected. Details: {}",
                    body
                )));
            }
            return Err(AnalysisError::Api(format!(
                "Gemini API returned error {}: {}",
                status, body
            )));
        }

        let reply: GenerateContentResponse = response.json().await.map_err(|e| {
            AnalysisError::Parse(format!("Failed to parse Gemini response: {}", e))
        })?;

        extract_reply_text(reply)
            .ok_or_else(|| AnalysisError::Parse("No response text from Gemini".to_string()))
    }
}

/// Parse and validate the model's JSON reply into verdict records.
///
/// The whole reply is accepted atomically: any structurally invalid or
/// invariant-violating record rejects the entire reply.
fn parse_audit_results(text: &str) -> Result<Vec<AuditResult>, AnalysisError> {
    let results: Vec<AuditResult> = serde_json::from_str(text)
        .map_err(|e| AnalysisError::Parse(format!("Gemini reply is not a valid audit array: {}", e)))?;

    for result in &results {
        result
            .validate()
            .map_err(|e| AnalysisError::Parse(format!("Invalid audit record: {}", e)))?;
    }

    Ok(results)
}

#[async_trait]
impl Analyzer for GeminiClient {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn analyze(
        &self,
        video: &MediaFile,
        document: &MediaFile,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.check_video_size(video)?;

        let text = self.request_audit(video, document).await?;
        let results = parse_audit_results(&text)?;

        debug!(
            record_count = results.len(),
            "Gemini audit completed"
        );

        Ok(AnalysisOutcome {
            results,
            source: AnalysisSource::Live,
        })
    }
}

// ============================================================================
// Gemini API Request Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Part {
    fn inline(mime_type: &str, data: String) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data,
            }),
            text: None,
        }
    }

    fn text(text: &str) -> Self {
        Self {
            inline_data: None,
            text: Some(text.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

// ============================================================================
// Gemini API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Pull the first non-empty text part out of the first candidate
fn extract_reply_text(reply: GenerateContentResponse) -> Option<String> {
    reply
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.text))
        .filter(|text| !text.is_empty())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use civiclens_common::Verdict;

    fn test_config(max_video_bytes: u64) -> GeminiConfig {
        GeminiConfig {
            api_key: Some("test-key".to_string()),
            max_video_bytes,
            ..GeminiConfig::default()
        }
    }

    fn media(bytes: usize) -> MediaFile {
        MediaFile::new("clip.mp4", "video/mp4", vec![0u8; bytes])
    }

    #[test]
    fn test_client_name() {
        let client = GeminiClient::new(test_config(1024));
        assert_eq!(client.name(), "Gemini");
    }

    #[test]
    fn test_oversize_video_rejected_before_network() {
        let client = GeminiClient::new(test_config(20 * 1024 * 1024));
        let oversize = media(21 * 1024 * 1024);
        let err = client.check_video_size(&oversize).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
        assert!(message.contains("20 MiB"), "message must name the limit: {}", message);
    }

    #[test]
    fn test_video_at_ceiling_accepted() {
        let client = GeminiClient::new(test_config(1024));
        assert!(client.check_video_size(&media(1024)).is_ok());
    }

    #[test]
    fn test_response_schema_restricts_verdict() {
        let schema = response_schema();
        let verdict_enum = &schema["items"]["properties"]["verdict"]["enum"];
        assert_eq!(
            verdict_enum,
            &json!(["TRUE", "FALSE", "PARTIAL", "AMBIGUOUS"])
        );
        // All seven record fields must be required
        assert_eq!(schema["items"]["required"].as_array().unwrap().len(), 7);
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline("application/pdf", "cGRm".to_string()),
                    Part::text("prompt"),
                ],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part::text("instruction")],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: THINKING_BUDGET,
                }),
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(
            value["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "application/pdf"
        );
        assert_eq!(value["contents"][0]["parts"][1]["text"], "prompt");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            value["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            16000
        );
        // No role on the system instruction, no stray nulls in parts
        assert!(value["systemInstruction"].get("role").is_none());
        assert!(value["contents"][0]["parts"][1].get("inlineData").is_none());
    }

    #[test]
    fn test_extract_reply_text() {
        let reply: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [ { "text": "[]" } ] } }
            ]
        }))
        .unwrap();
        assert_eq!(extract_reply_text(reply).as_deref(), Some("[]"));
    }

    #[test]
    fn test_extract_reply_text_empty_candidates() {
        let reply: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(extract_reply_text(reply).is_none());
    }

    #[test]
    fn test_parse_audit_results_valid() {
        let text = json!([{
            "timestamp": "00:10",
            "speaker_claim": "The project is complete.",
            "normalized_claim": { "project": "Main St", "status": "completed" },
            "document_evidence": { "page": 2, "text": "80% complete." },
            "verdict": "FALSE",
            "confidence": 0.9,
            "reasoning": "Document reports partial completion."
        }])
        .to_string();

        let results = parse_audit_results(&text).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].verdict, Verdict::False);
    }

    #[test]
    fn test_parse_mismatch_reply() {
        // Phase 1 outcome: unrelated inputs yield exactly one AMBIGUOUS
        // record with the synthetic mismatch claim
        let text = json!([{
            "timestamp": "00:00",
            "speaker_claim": "IRRELEVANT FILES DETECTED",
            "normalized_claim": {
                "video_topic": "A speech about the municipal budget",
                "pdf_topic": "A residential lease agreement",
                "status": "mismatch"
            },
            "document_evidence": {
                "page": 1,
                "text": "The PDF covers a lease, while the Video discusses a budget. No overlap found."
            },
            "verdict": "AMBIGUOUS",
            "confidence": 1.0,
            "reasoning": "The uploaded files are unrelated."
        }])
        .to_string();

        let results = parse_audit_results(&text).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].verdict, Verdict::Ambiguous);
        assert!(results[0].is_mismatch_report());
        assert!(results[0].normalized_claim.is_topic_mismatch());
    }

    #[test]
    fn test_parse_audit_results_rejects_non_array() {
        assert!(matches!(
            parse_audit_results("{\"not\": \"an array\"}"),
            Err(AnalysisError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_audit_results_rejects_invariant_violation() {
        // Structurally valid but confidence out of range: whole reply rejected
        let text = json!([{
            "timestamp": "00:10",
            "speaker_claim": "claim",
            "normalized_claim": { "project": "P", "status": "done" },
            "document_evidence": { "page": 1, "text": "excerpt" },
            "verdict": "TRUE",
            "confidence": 1.5,
            "reasoning": "reason"
        }])
        .to_string();

        assert!(matches!(
            parse_audit_results(&text),
            Err(AnalysisError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_audit_results_rejects_unknown_verdict() {
        let text = json!([{
            "timestamp": "00:10",
            "speaker_claim": "claim",
            "normalized_claim": { "project": "P", "status": "done" },
            "document_evidence": { "page": 1, "text": "excerpt" },
            "verdict": "MAYBE",
            "confidence": 0.5,
            "reasoning": "reason"
        }])
        .to_string();

        assert!(matches!(
            parse_audit_results(&text),
            Err(AnalysisError::Parse(_))
        ));
    }
}
