//! Heuristic field extraction for General Liability certificates.
//!
//! `extract_certificate` is the pure core of the pipeline: pages in, scored
//! outcome out. No I/O, deterministic for identical input.

pub mod dates;
pub mod labels;
pub mod limits;
pub mod plausibility;
pub mod policy_number;
pub mod scoring;
pub mod section;

pub use dates::extract_policy_dates;
pub use limits::{extract_limits, normalize_money, RawLimitScan};
pub use plausibility::{acceptance_range, filter_limits, FilterOutcome, LimitRange, Rejection};
pub use policy_number::extract_policy_number;
pub use scoring::{score_extraction, IssueKind, IssueSeverity, QualityReport, ValidationIssue};
pub use section::{find_gl_section, relevant_section};

use chrono::NaiveDate;

use crate::models::{
    CoverageCode, ExtractedCoverage, ExtractedPolicy, ExtractionOutcome, GlLimits, LobCode,
    SourceMethod,
};
use crate::pipeline::acquire::PageText;

/// Fields pulled from the raw text before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFields {
    pub effective_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub policy_number: Option<String>,
    pub scan: RawLimitScan,
}

/// An outcome together with the report that scored it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredExtraction {
    pub outcome: ExtractionOutcome,
    pub report: QualityReport,
}

/// Concatenate page texts in page order.
pub fn full_text(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run every field extractor over the text.
pub fn extract_fields(text: &str) -> ParsedFields {
    let (effective_date, expiration_date) = extract_policy_dates(text);
    let policy_number = extract_policy_number(text);
    let scan = extract_limits(text);
    ParsedFields {
        effective_date,
        expiration_date,
        policy_number,
        scan,
    }
}

/// Build the aggregate outcome from extracted fields.
///
/// Confidence is provenance-based: labeled regex captures carry 0.8, the
/// unlabeled section fallback 0.5, AI-extracted fields 0.9.
pub fn assemble_outcome(
    certificate_id: i64,
    policy_number: Option<String>,
    effective_date: Option<NaiveDate>,
    expiration_date: Option<NaiveDate>,
    limits: &GlLimits,
    low_confidence_codes: &[CoverageCode],
    source_method: SourceMethod,
    quality_score: f64,
) -> ExtractionOutcome {
    let (policy_conf, bare_policy_conf, coverage_conf, low_coverage_conf) = match source_method {
        SourceMethod::Regex => (0.8, 0.5, 0.8, 0.5),
        SourceMethod::AiFallback => (0.9, 0.9, 0.9, 0.9),
    };

    let mut policies = Vec::new();
    if policy_number.is_some() || effective_date.is_some() {
        let confidence = if policy_number.is_some() {
            policy_conf
        } else {
            bare_policy_conf
        };
        policies.push(ExtractedPolicy {
            lob_code: LobCode::GeneralLiability,
            carrier_name: None,
            policy_number,
            effective_date,
            expiration_date,
            cancellation_notice_days: None,
            source_method,
            confidence_score: confidence,
        });
    }

    let mut coverages = Vec::new();
    for (code, value) in limits.entries() {
        let Some(amount) = value else { continue };
        let confidence = if low_confidence_codes.contains(&code) {
            low_coverage_conf
        } else {
            coverage_conf
        };
        coverages.push(ExtractedCoverage {
            policy_index: 0,
            coverage_code: code,
            limit_amount: Some(amount),
            limit_currency: "USD".to_string(),
            source_method,
            confidence_score: confidence,
        });
    }

    // Coverages must reference a policy inside the same outcome; anchor them
    // to a bare GL policy when no dated or numbered one was found.
    if policies.is_empty() && !coverages.is_empty() {
        policies.push(ExtractedPolicy {
            lob_code: LobCode::GeneralLiability,
            carrier_name: None,
            policy_number: None,
            effective_date: None,
            expiration_date: None,
            cancellation_notice_days: None,
            source_method,
            confidence_score: bare_policy_conf,
        });
    }

    ExtractionOutcome {
        certificate_id,
        policies,
        coverages,
        clauses: Vec::new(),
        source_method,
        quality_score,
    }
}

/// Full heuristic pass: extract, filter, score, assemble.
pub fn extract_certificate(certificate_id: i64, pages: &[PageText]) -> ScoredExtraction {
    let text = full_text(pages);
    let fields = extract_fields(&text);

    let filtered = filter_limits(&fields.scan.limits);
    let report = score_extraction(
        &filtered.limits,
        fields.effective_date,
        fields.expiration_date,
        fields.policy_number.as_deref(),
    );

    let outcome = assemble_outcome(
        certificate_id,
        fields.policy_number,
        fields.effective_date,
        fields.expiration_date,
        &filtered.limits,
        &fields.scan.fallback_codes,
        SourceMethod::Regex,
        report.score,
    );

    tracing::info!(
        certificate_id,
        quality = report.score,
        coverages = outcome.coverages.len(),
        "Heuristic extraction complete"
    );
    ScoredExtraction { outcome, report }
}
