//! AI-assisted extraction fallback.
//!
//! Invoked only when the heuristic quality score is below the acceptance
//! threshold. Text goes to the service first; a rendered page image is the
//! strictly more expensive second attempt. The returned fields run through
//! the same plausibility filter and scorer as the heuristic path, and the
//! higher-scoring outcome wins outright: full replacement, never a merge.
//! The service is untrusted: every failure degrades to the heuristic result.

use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{GlLimits, SourceMethod};
use crate::pipeline::acquire::{AcquisitionError, DocumentRef};
use crate::pipeline::parsing::{
    assemble_outcome, filter_limits, score_extraction, ScoredExtraction,
};

/// Characters of acquired text sent to the service.
const MAX_TEXT_CHARS: usize = 8_000;

const EXTRACTION_INSTRUCTIONS: &str = "Extract General Liability data from this \
certificate of insurance. Respond with only a JSON object containing \
policy_number, effective_date (YYYY-MM-DD), expiration_date (YYYY-MM-DD), and \
limits keyed by GL_EACH_OCC, GL_AGGREGATE, GL_PERS_ADV, GL_PROD_AGG, \
GL_DAMAGE_PREM, GL_MED_EXP. Numbers carry no symbols or separators; use null \
for anything not found.";

// ═══════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════

#[derive(Error, Debug)]
pub enum AiServiceError {
    #[error("AI extraction service is unreachable at {0}")]
    Connection(String),

    #[error("AI extraction request timed out after {0}s")]
    Timeout(u64),

    #[error("AI extraction service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Malformed AI extraction response: {0}")]
    MalformedResponse(String),
}

// ═══════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════

#[derive(Serialize)]
struct AiExtractionRequest<'a> {
    certificate_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_base64: Option<String>,
    instructions: &'a str,
}

/// Structured fields returned by the extraction service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiExtractionResponse {
    pub policy_number: Option<String>,
    pub effective_date: Option<String>,
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub limits: AiLimits,
}

/// Service limit payload, keyed by the canonical coverage codes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiLimits {
    #[serde(rename = "GL_EACH_OCC")]
    pub each_occurrence: Option<f64>,
    #[serde(rename = "GL_AGGREGATE")]
    pub general_aggregate: Option<f64>,
    #[serde(rename = "GL_PERS_ADV")]
    pub personal_adv_injury: Option<f64>,
    #[serde(rename = "GL_PROD_AGG")]
    pub products_agg: Option<f64>,
    #[serde(rename = "GL_DAMAGE_PREM")]
    pub damage_premises: Option<f64>,
    #[serde(rename = "GL_MED_EXP")]
    pub medical_expense: Option<f64>,
}

// ═══════════════════════════════════════════
// Traits
// ═══════════════════════════════════════════

/// External AI extraction path. Both calls block with a timeout.
pub trait AiExtractor: Send + Sync {
    fn extract_from_text(
        &self,
        certificate_id: i64,
        text: &str,
    ) -> Result<AiExtractionResponse, AiServiceError>;

    fn extract_from_image(
        &self,
        certificate_id: i64,
        image_png: &[u8],
    ) -> Result<AiExtractionResponse, AiServiceError>;
}

/// Renders the first page of a document to PNG for the image attempt.
/// Rendering mechanics live outside the pipeline.
pub trait PageRenderer: Send + Sync {
    fn render_first_page(&self, doc: &DocumentRef) -> Result<Vec<u8>, AcquisitionError>;
}

// ═══════════════════════════════════════════
// HTTP client
// ═══════════════════════════════════════════

/// Blocking HTTP client for the AI extraction service.
pub struct HttpAiExtractor {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpAiExtractor {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    fn post_request(&self, body: &AiExtractionRequest) -> Result<AiExtractionResponse, AiServiceError> {
        let url = format!("{}/v1/extract", self.base_url);

        let response = self.client.post(&url).json(body).send().map_err(|e| {
            if e.is_connect() {
                AiServiceError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                AiServiceError::Timeout(self.timeout_secs)
            } else {
                AiServiceError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AiServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| AiServiceError::MalformedResponse(e.to_string()))
    }
}

impl AiExtractor for HttpAiExtractor {
    fn extract_from_text(
        &self,
        certificate_id: i64,
        text: &str,
    ) -> Result<AiExtractionResponse, AiServiceError> {
        let mut end = text.len().min(MAX_TEXT_CHARS);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.post_request(&AiExtractionRequest {
            certificate_id,
            text: Some(&text[..end]),
            image_base64: None,
            instructions: EXTRACTION_INSTRUCTIONS,
        })
    }

    fn extract_from_image(
        &self,
        certificate_id: i64,
        image_png: &[u8],
    ) -> Result<AiExtractionResponse, AiServiceError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_png);
        self.post_request(&AiExtractionRequest {
            certificate_id,
            text: None,
            image_base64: Some(encoded),
            instructions: EXTRACTION_INSTRUCTIONS,
        })
    }
}

// ═══════════════════════════════════════════
// Response scoring
// ═══════════════════════════════════════════

/// Parse a service date string. Tolerates the two formats seen in practice.
fn parse_ai_date(value: Option<&str>) -> Option<NaiveDate> {
    let trimmed = value?.trim();
    if trimmed.is_empty() || trimmed == "null" || trimmed == "NOT_FOUND" {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .ok()
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Filter and score an AI response with the same rules as the heuristic
/// path, so the two outcomes compare on one metric.
pub fn score_ai_response(certificate_id: i64, response: &AiExtractionResponse) -> ScoredExtraction {
    let raw = GlLimits {
        each_occurrence: positive(response.limits.each_occurrence),
        general_aggregate: positive(response.limits.general_aggregate),
        personal_adv_injury: positive(response.limits.personal_adv_injury),
        products_agg: positive(response.limits.products_agg),
        damage_premises: positive(response.limits.damage_premises),
        medical_expense: positive(response.limits.medical_expense),
    };
    let filtered = filter_limits(&raw);

    let effective = parse_ai_date(response.effective_date.as_deref());
    let expiration = parse_ai_date(response.expiration_date.as_deref());
    let policy_number = response
        .policy_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let report = score_extraction(
        &filtered.limits,
        effective,
        expiration,
        policy_number.as_deref(),
    );

    let outcome = assemble_outcome(
        certificate_id,
        policy_number,
        effective,
        expiration,
        &filtered.limits,
        &[],
        SourceMethod::AiFallback,
        report.score,
    );

    ScoredExtraction { outcome, report }
}

// ═══════════════════════════════════════════
// Escalation
// ═══════════════════════════════════════════

/// Escalate a low-confidence heuristic extraction to the AI service.
///
/// Returns the AI outcome only when it scores strictly higher than the
/// heuristic one; `None` means keep the heuristic result. Safe to call
/// repeatedly; no side effects beyond the service requests themselves.
pub fn escalate(
    ai: &dyn AiExtractor,
    renderer: Option<&dyn PageRenderer>,
    certificate_id: i64,
    doc: &DocumentRef,
    text: &str,
    heuristic: &ScoredExtraction,
    acceptance_threshold: f64,
) -> Option<ScoredExtraction> {
    let mut best: Option<ScoredExtraction> = None;

    match ai.extract_from_text(certificate_id, text) {
        Ok(response) => {
            let scored = score_ai_response(certificate_id, &response);
            tracing::info!(certificate_id, quality = scored.report.score, "AI text extraction scored");
            best = Some(scored);
        }
        Err(e) => {
            tracing::warn!(certificate_id, error = %e, "AI text extraction failed");
        }
    }

    let text_sufficient = best
        .as_ref()
        .is_some_and(|b| b.report.score >= acceptance_threshold);

    if !text_sufficient {
        if let Some(renderer) = renderer {
            if let Some(scored) = render_and_extract(ai, renderer, certificate_id, doc) {
                let better_than_text = best
                    .as_ref()
                    .map_or(true, |b| scored.report.score > b.report.score);
                if better_than_text {
                    best = Some(scored);
                }
            }
        }
    }

    match best {
        Some(scored) if scored.report.score > heuristic.report.score => {
            tracing::info!(
                certificate_id,
                heuristic = heuristic.report.score,
                fallback = scored.report.score,
                "AI fallback outcome replaces heuristic result"
            );
            Some(scored)
        }
        _ => {
            tracing::info!(certificate_id, "Keeping heuristic outcome");
            None
        }
    }
}

fn render_and_extract(
    ai: &dyn AiExtractor,
    renderer: &dyn PageRenderer,
    certificate_id: i64,
    doc: &DocumentRef,
) -> Option<ScoredExtraction> {
    let image = match renderer.render_first_page(doc) {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!(certificate_id, error = %e, "Page render for AI image attempt failed");
            return None;
        }
    };
    match ai.extract_from_image(certificate_id, &image) {
        Ok(response) => {
            let scored = score_ai_response(certificate_id, &response);
            tracing::info!(certificate_id, quality = scored.report.score, "AI image extraction scored");
            Some(scored)
        }
        Err(e) => {
            tracing::warn!(certificate_id, error = %e, "AI image extraction failed");
            None
        }
    }
}

// ═══════════════════════════════════════════
// Test doubles
// ═══════════════════════════════════════════

/// Mock extractor with canned responses per input kind.
pub struct MockAiExtractor {
    text_response: Option<AiExtractionResponse>,
    image_response: Option<AiExtractionResponse>,
}

impl MockAiExtractor {
    /// A mock whose every call fails, as if the service were down.
    pub fn unavailable() -> Self {
        Self {
            text_response: None,
            image_response: None,
        }
    }

    pub fn with_text_response(mut self, response: AiExtractionResponse) -> Self {
        self.text_response = Some(response);
        self
    }

    pub fn with_image_response(mut self, response: AiExtractionResponse) -> Self {
        self.image_response = Some(response);
        self
    }
}

impl AiExtractor for MockAiExtractor {
    fn extract_from_text(
        &self,
        _certificate_id: i64,
        _text: &str,
    ) -> Result<AiExtractionResponse, AiServiceError> {
        self.text_response
            .clone()
            .ok_or_else(|| AiServiceError::Connection("mock".to_string()))
    }

    fn extract_from_image(
        &self,
        _certificate_id: i64,
        _image_png: &[u8],
    ) -> Result<AiExtractionResponse, AiServiceError> {
        self.image_response
            .clone()
            .ok_or_else(|| AiServiceError::Connection("mock".to_string()))
    }
}

/// Renderer returning fixed bytes, for tests.
pub struct StaticPageRenderer;

impl PageRenderer for StaticPageRenderer {
    fn render_first_page(&self, _doc: &DocumentRef) -> Result<Vec<u8>, AcquisitionError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}
