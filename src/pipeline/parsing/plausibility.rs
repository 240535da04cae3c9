//! Range checks and cross-field correction for extracted limits.
//!
//! Out-of-range values are nulled, never clamped, and every rejection is
//! recorded so an operator can see what the scan originally found. When both
//! primary limits survive and each-occurrence exceeds the aggregate, the two
//! are swapped: column mislabeling, not bad data.

use crate::models::{CoverageCode, GlLimits};

/// Acceptance band for one coverage code. `None` bounds are open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl LimitRange {
    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Declared acceptance range per coverage code.
pub fn acceptance_range(code: CoverageCode) -> LimitRange {
    match code {
        CoverageCode::GlEachOcc
        | CoverageCode::GlAggregate
        | CoverageCode::GlPersAdv
        | CoverageCode::GlProdAgg => LimitRange {
            min: Some(100_000.0),
            max: None,
        },
        CoverageCode::GlMedExp => LimitRange {
            min: None,
            max: Some(100_000.0),
        },
        CoverageCode::GlDamagePrem => LimitRange {
            min: None,
            max: Some(2_000_000.0),
        },
    }
}

/// A value nulled by the range check.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub code: CoverageCode,
    pub value: f64,
}

/// Filtered limits plus the audit trail of what was dropped or corrected.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub limits: GlLimits,
    pub rejections: Vec<Rejection>,
    /// True when each-occurrence and aggregate were swapped.
    pub swapped: bool,
}

/// Apply acceptance ranges, then the primary-limit swap.
pub fn filter_limits(raw: &GlLimits) -> FilterOutcome {
    let mut limits = GlLimits::default();
    let mut rejections = Vec::new();

    for (code, value) in raw.entries() {
        let Some(value) = value else { continue };
        if acceptance_range(code).contains(value) {
            limits.set(code, Some(value));
        } else {
            tracing::warn!(code = %code, value, "Rejected out-of-range limit");
            rejections.push(Rejection { code, value });
        }
    }

    let mut swapped = false;
    if let (Some(each), Some(agg)) = (limits.each_occurrence, limits.general_aggregate) {
        if each > agg {
            tracing::warn!(
                each_occurrence = each,
                general_aggregate = agg,
                "Each-occurrence exceeds aggregate, swapping"
            );
            limits.each_occurrence = Some(agg);
            limits.general_aggregate = Some(each);
            swapped = true;
        }
    }

    FilterOutcome {
        limits,
        rejections,
        swapped,
    }
}
