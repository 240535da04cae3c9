//! Domain types produced by the extraction pipeline.
//!
//! An [`ExtractionOutcome`] is the aggregate root: it fully replaces any
//! prior outcome for the same certificate when persisted, never merges.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::{CoverageCode, LobCode, RunStatus, SourceMethod};

// ═══════════════════════════════════════════
// GL limit set
// ═══════════════════════════════════════════

/// The six General Liability sub-limits, each optional.
///
/// Kept as a flat struct rather than a map so every code is spelled out at
/// every use site and a missing slot is a compile error, not a silent miss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlLimits {
    pub each_occurrence: Option<f64>,
    pub general_aggregate: Option<f64>,
    pub personal_adv_injury: Option<f64>,
    pub products_agg: Option<f64>,
    pub damage_premises: Option<f64>,
    pub medical_expense: Option<f64>,
}

impl GlLimits {
    pub fn get(&self, code: CoverageCode) -> Option<f64> {
        match code {
            CoverageCode::GlEachOcc => self.each_occurrence,
            CoverageCode::GlAggregate => self.general_aggregate,
            CoverageCode::GlPersAdv => self.personal_adv_injury,
            CoverageCode::GlProdAgg => self.products_agg,
            CoverageCode::GlDamagePrem => self.damage_premises,
            CoverageCode::GlMedExp => self.medical_expense,
        }
    }

    pub fn set(&mut self, code: CoverageCode, value: Option<f64>) {
        match code {
            CoverageCode::GlEachOcc => self.each_occurrence = value,
            CoverageCode::GlAggregate => self.general_aggregate = value,
            CoverageCode::GlPersAdv => self.personal_adv_injury = value,
            CoverageCode::GlProdAgg => self.products_agg = value,
            CoverageCode::GlDamagePrem => self.damage_premises = value,
            CoverageCode::GlMedExp => self.medical_expense = value,
        }
    }

    /// Number of non-null limits out of six.
    pub fn present_count(&self) -> usize {
        CoverageCode::all()
            .iter()
            .filter(|code| self.get(**code).is_some())
            .count()
    }

    /// Iterate `(code, value)` in extraction order.
    pub fn entries(&self) -> impl Iterator<Item = (CoverageCode, Option<f64>)> + '_ {
        CoverageCode::all().iter().map(|code| (*code, self.get(*code)))
    }

    pub fn has_both_primaries(&self) -> bool {
        self.each_occurrence.is_some() && self.general_aggregate.is_some()
    }
}

// ═══════════════════════════════════════════
// Extracted records
// ═══════════════════════════════════════════

/// A policy extracted from a certificate, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPolicy {
    pub lob_code: LobCode,
    pub carrier_name: Option<String>,
    pub policy_number: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub cancellation_notice_days: Option<u32>,
    pub source_method: SourceMethod,
    pub confidence_score: f64,
}

/// An extracted coverage limit. `policy_index` points into the owning
/// outcome's `policies` vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCoverage {
    pub policy_index: usize,
    pub coverage_code: CoverageCode,
    pub limit_amount: Option<f64>,
    pub limit_currency: String,
    pub source_method: SourceMethod,
    pub confidence_score: f64,
}

/// An extracted clause (additional insured, waiver of subrogation, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedClause {
    pub policy_index: usize,
    pub clause_code: String,
    pub clause_text: Option<String>,
    pub source_method: SourceMethod,
    pub confidence_score: f64,
}

/// Aggregate root: everything extracted from one certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub certificate_id: i64,
    pub policies: Vec<ExtractedPolicy>,
    pub coverages: Vec<ExtractedCoverage>,
    pub clauses: Vec<ExtractedClause>,
    pub source_method: SourceMethod,
    /// Composite 0–1 confidence for the whole extraction.
    pub quality_score: f64,
}

impl ExtractionOutcome {
    /// True when the outcome carries nothing worth persisting.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty() && self.coverages.is_empty()
    }

    /// Every coverage and clause must reference a policy within this outcome.
    pub fn references_resolve(&self) -> bool {
        let n = self.policies.len();
        self.coverages.iter().all(|c| c.policy_index < n)
            && self.clauses.iter().all(|c| c.policy_index < n)
    }

    /// Limit amount for a coverage code, if extracted.
    pub fn limit(&self, code: CoverageCode) -> Option<f64> {
        self.coverages
            .iter()
            .find(|c| c.coverage_code == code)
            .and_then(|c| c.limit_amount)
    }
}

// ═══════════════════════════════════════════
// Run record
// ═══════════════════════════════════════════

/// One orchestrated pass over a certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRun {
    pub id: String,
    pub certificate_id: i64,
    pub status: RunStatus,
    /// Text provider that served this run (native layer vs OCR engine).
    pub provider: Option<String>,
    pub error_detail: Option<String>,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
}
