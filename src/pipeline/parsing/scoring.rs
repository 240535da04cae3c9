//! Quality scoring and validation of extracted fields.
//!
//! Callable on its own so QA and compliance tooling can re-validate stored
//! fields without re-running extraction. Issues are metadata: the only one
//! that zeroes the score is both primary limits missing.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::GlLimits;

/// Aggregate should comfortably exceed each-occurrence; below this ratio the
/// two values likely came from the same column.
const MIN_AGGREGATE_RATIO: f64 = 1.5;

/// Plausible policy term, in months.
const MIN_POLICY_MONTHS: i32 = 6;
const MAX_POLICY_MONTHS: i32 = 24;

/// Words that show up when the capture grabbed form boilerplate instead of
/// an actual policy number.
const POLICY_BOILERPLATE: &[&str] = &["number", "policy", "follows"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingBothPrimaryLimits,
    MissingPrimaryLimit,
    AggregateBelowEachOccurrence,
    LowAggregateRatio,
    ExpirationBeforeEffective,
    ImplausiblePolicySpan,
    SuspectPolicyNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Field relationships that cannot be true of a real policy.
    Hard,
    /// Unusual but possible; recorded for review.
    Soft,
}

impl IssueKind {
    pub fn severity(&self) -> IssueSeverity {
        match self {
            Self::MissingBothPrimaryLimits
            | Self::AggregateBelowEachOccurrence
            | Self::ExpirationBeforeEffective => IssueSeverity::Hard,
            Self::MissingPrimaryLimit
            | Self::LowAggregateRatio
            | Self::ImplausiblePolicySpan
            | Self::SuspectPolicyNumber => IssueSeverity::Soft,
        }
    }
}

/// One validation finding. Never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub detail: String,
}

impl ValidationIssue {
    fn new(kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Composite score plus the issue list that shaped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: f64,
    pub issues: Vec<ValidationIssue>,
}

impl QualityReport {
    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }
}

fn whole_months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32)
}

fn check_dates(effective: Option<NaiveDate>, expiration: Option<NaiveDate>, issues: &mut Vec<ValidationIssue>) {
    let (Some(eff), Some(exp)) = (effective, expiration) else {
        return;
    };

    if exp <= eff {
        issues.push(ValidationIssue::new(
            IssueKind::ExpirationBeforeEffective,
            format!("expiration {exp} on or before effective {eff}"),
        ));
        return;
    }

    let months = whole_months_between(eff, exp);
    if months < MIN_POLICY_MONTHS || months > MAX_POLICY_MONTHS {
        issues.push(ValidationIssue::new(
            IssueKind::ImplausiblePolicySpan,
            format!("policy spans {months} months"),
        ));
    }
}

fn check_policy_number(policy_number: Option<&str>, issues: &mut Vec<ValidationIssue>) {
    let Some(number) = policy_number else { return };

    let lower = number.to_lowercase();
    if POLICY_BOILERPLATE.iter().any(|word| lower.contains(word)) {
        issues.push(ValidationIssue::new(
            IssueKind::SuspectPolicyNumber,
            format!("'{number}' looks like form boilerplate"),
        ));
        return;
    }
    if number.len() < 6 {
        issues.push(ValidationIssue::new(
            IssueKind::SuspectPolicyNumber,
            format!("'{number}' is shorter than 6 characters"),
        ));
    }
}

/// Score one extraction.
///
/// `score == 0.0` exactly when both primary limits are missing. Otherwise
/// `(present/6) × (both primaries ? 1.0 : 0.5) × (≤1 issue ? 1.0 : 0.5)`.
pub fn score_extraction(
    limits: &GlLimits,
    effective: Option<NaiveDate>,
    expiration: Option<NaiveDate>,
    policy_number: Option<&str>,
) -> QualityReport {
    let each = limits.each_occurrence;
    let agg = limits.general_aggregate;

    if each.is_none() && agg.is_none() {
        tracing::warn!("No primary limits extracted, scoring 0.0");
        return QualityReport {
            score: 0.0,
            issues: vec![ValidationIssue::new(
                IssueKind::MissingBothPrimaryLimits,
                "neither each-occurrence nor general aggregate found",
            )],
        };
    }

    let mut issues = Vec::new();

    if each.is_none() || agg.is_none() {
        issues.push(ValidationIssue::new(
            IssueKind::MissingPrimaryLimit,
            "missing primary limit",
        ));
    }

    if let (Some(each), Some(agg)) = (each, agg) {
        if each > agg {
            issues.push(ValidationIssue::new(
                IssueKind::AggregateBelowEachOccurrence,
                format!("each-occurrence {each} exceeds aggregate {agg}"),
            ));
        }
        if each > 0.0 && agg / each < MIN_AGGREGATE_RATIO {
            issues.push(ValidationIssue::new(
                IssueKind::LowAggregateRatio,
                format!("aggregate/each-occurrence ratio {:.2}", agg / each),
            ));
        }
    }

    check_dates(effective, expiration, &mut issues);
    check_policy_number(policy_number, &mut issues);

    let completeness = limits.present_count() as f64 / 6.0;
    let primary_factor = if limits.has_both_primaries() { 1.0 } else { 0.5 };
    let issue_factor = if issues.len() <= 1 { 1.0 } else { 0.5 };
    let score = completeness * primary_factor * issue_factor;

    tracing::info!(score, issue_count = issues.len(), "Extraction scored");
    QualityReport { score, issues }
}
