//! Monetary limit extraction for the six GL sub-limit codes.
//!
//! Two labeled passes per code (same-line capture across every alias, then
//! a bounded-window capture) and a last-resort scan of the GL section for
//! the first plausible dollar figure when no alias matched at all. Money
//! tokens normalize by stripping symbols and separators; unparsable tokens
//! yield `None`, never an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{CoverageCode, GlLimits};

use super::labels;
use super::section::{find_gl_section, relevant_section};

/// Characters after a label considered by the windowed pass.
const LABEL_WINDOW: usize = 80;

/// Plausibility band for the unlabeled dollar-figure fallback.
const FALLBACK_MIN: f64 = 100_000.0;
const FALLBACK_MAX: f64 = 100_000_000.0;

const MONEY: &str = r"\$?[^\S\n]*([\d][\d,]*(?:\.\d{2})?)";

struct LabelPatterns {
    same_line: Regex,
    windowed: Regex,
}

static LIMIT_PATTERNS: LazyLock<Vec<(CoverageCode, Vec<LabelPatterns>)>> = LazyLock::new(|| {
    CoverageCode::all()
        .iter()
        .map(|code| {
            let patterns = labels::limit_aliases(*code)
                .iter()
                .map(|label| {
                    let escaped = regex::escape(label);
                    LabelPatterns {
                        same_line: Regex::new(&format!(r"(?i){escaped}:?[^\S\n]*{MONEY}"))
                            .expect("limit same-line pattern is valid"),
                        windowed: Regex::new(&format!(
                            r"(?i){escaped}[\s\S]{{0,{LABEL_WINDOW}}}?{MONEY}"
                        ))
                        .expect("limit windowed pattern is valid"),
                    }
                })
                .collect();
            (*code, patterns)
        })
        .collect()
});

static MONEY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MONEY).expect("money token pattern is valid"));

/// Strip currency symbols and separators and parse as a decimal amount.
/// Returns `None` for anything that does not survive as a number.
pub fn normalize_money(token: &str) -> Option<f64> {
    let cleaned: String = token
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Raw limit scan: extracted values plus the codes that only matched via the
/// low-confidence section fallback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLimitScan {
    pub limits: GlLimits,
    pub fallback_codes: Vec<CoverageCode>,
}

fn labeled_value(patterns: &[LabelPatterns], text: &str) -> Option<f64> {
    for p in patterns {
        if let Some(caps) = p.same_line.captures(text) {
            if let Some(value) = normalize_money(&caps[1]) {
                return Some(value);
            }
        }
    }
    for p in patterns {
        if let Some(caps) = p.windowed.captures(text) {
            if let Some(value) = normalize_money(&caps[1]) {
                return Some(value);
            }
        }
    }
    None
}

/// First dollar figure in the GL section that sits in the plausible band.
fn first_plausible_section_figure(text: &str) -> Option<f64> {
    let section = find_gl_section(text)?;
    MONEY_TOKEN
        .captures_iter(section)
        .filter_map(|caps| normalize_money(&caps[1]))
        .find(|v| (FALLBACK_MIN..=FALLBACK_MAX).contains(v))
}

/// Extract all six GL sub-limits from `text`.
pub fn extract_limits(text: &str) -> RawLimitScan {
    let section = relevant_section(text);
    let mut scan = RawLimitScan::default();

    for (code, patterns) in LIMIT_PATTERNS.iter() {
        if let Some(value) = labeled_value(patterns, section) {
            scan.limits.set(*code, Some(value));
            continue;
        }
        if let Some(value) = first_plausible_section_figure(text) {
            tracing::warn!(code = %code, value, "Limit taken from unlabeled section figure");
            scan.limits.set(*code, Some(value));
            scan.fallback_codes.push(*code);
        }
    }

    tracing::info!(
        found = scan.limits.present_count(),
        fallback = scan.fallback_codes.len(),
        "Raw limit scan complete"
    );
    scan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_symbols_and_separators() {
        assert_eq!(normalize_money("$1,000,000"), Some(1_000_000.0));
        assert_eq!(normalize_money("2,000,000.00"), Some(2_000_000.0));
        assert_eq!(normalize_money("$ 500,000"), Some(500_000.0));
        assert_eq!(normalize_money("5000"), Some(5_000.0));
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert_eq!(normalize_money(""), None);
        assert_eq!(normalize_money("$"), None);
        assert_eq!(normalize_money("N/A"), None);
        assert_eq!(normalize_money("1.2.3"), None);
    }

    #[test]
    fn same_line_capture() {
        let scan = extract_limits("EACH OCCURRENCE $1,000,000");
        assert_eq!(scan.limits.each_occurrence, Some(1_000_000.0));
        assert!(scan.fallback_codes.is_empty());
    }

    #[test]
    fn merged_ocr_label_matches() {
        let scan = extract_limits("EACHOCCURRENCE $1,000,000");
        assert_eq!(scan.limits.each_occurrence, Some(1_000_000.0));
    }

    #[test]
    fn windowed_capture_spans_lines() {
        let scan = extract_limits("GENERAL AGGREGATE\n  \n $2,000,000");
        assert_eq!(scan.limits.general_aggregate, Some(2_000_000.0));
    }

    #[test]
    fn all_six_codes_extracted() {
        let text = "GENERAL LIABILITY\n\
                    EACH OCCURRENCE $1,000,000\n\
                    DAMAGE TO RENTED PREMISES $100,000\n\
                    MED EXP (ANY ONE PERSON) $5,000\n\
                    PERSONAL & ADV INJURY $1,000,000\n\
                    GENERAL AGGREGATE $2,000,000\n\
                    PRODUCTS - COMP/OP AGG $2,000,000";
        let scan = extract_limits(text);
        assert_eq!(scan.limits.present_count(), 6);
        assert_eq!(scan.limits.each_occurrence, Some(1_000_000.0));
        assert_eq!(scan.limits.general_aggregate, Some(2_000_000.0));
        assert_eq!(scan.limits.personal_adv_injury, Some(1_000_000.0));
        assert_eq!(scan.limits.products_agg, Some(2_000_000.0));
        assert_eq!(scan.limits.damage_premises, Some(100_000.0));
        assert_eq!(scan.limits.medical_expense, Some(5_000.0));
        assert!(scan.fallback_codes.is_empty());
    }

    #[test]
    fn unlabeled_section_figure_is_low_confidence() {
        // No alias anywhere, but the GL section holds a plausible figure.
        let text = "GENERAL LIABILITY\nLIMIT OF LIABILITY $1,000,000";
        let scan = extract_limits(text);
        assert_eq!(scan.limits.each_occurrence, Some(1_000_000.0));
        assert!(scan.fallback_codes.contains(&CoverageCode::GlEachOcc));
    }

    #[test]
    fn fallback_skips_implausible_figures() {
        // 5,000 is below the plausible band for an unlabeled figure.
        let text = "GENERAL LIABILITY\nSOME FEE $5,000";
        let scan = extract_limits(text);
        assert_eq!(scan.limits.each_occurrence, None);
    }

    #[test]
    fn fallback_needs_a_gl_section() {
        let scan = extract_limits("UNRELATED TEXT $1,000,000");
        assert_eq!(scan.limits.present_count(), 0);
    }

    #[test]
    fn missing_limits_stay_none_without_section() {
        // Labeled value found, no GL heading: the section fallback has
        // nothing to scan, so every other code stays empty.
        let scan = extract_limits("EACH OCCURRENCE $1,000,000 NOTHING ELSE");
        assert_eq!(scan.limits.each_occurrence, Some(1_000_000.0));
        assert_eq!(scan.limits.medical_expense, None);
        assert_eq!(scan.limits.present_count(), 1);
    }

    #[test]
    fn unmatched_codes_share_the_section_fallback_figure() {
        // Inside a GL section, a code with no label anywhere borrows the
        // first plausible figure; the plausibility filter prunes it later.
        let text = "GENERAL LIABILITY\nEACH OCCURRENCE $1,000,000";
        let scan = extract_limits(text);
        assert_eq!(scan.limits.medical_expense, Some(1_000_000.0));
        assert!(scan.fallback_codes.contains(&CoverageCode::GlMedExp));
        assert!(!scan.fallback_codes.contains(&CoverageCode::GlEachOcc));
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "GENERAL LIABILITY EACH OCCURRENCE $1,000,000 GENERAL AGGREGATE $2,000,000";
        let first = extract_limits(text);
        for _ in 0..3 {
            assert_eq!(extract_limits(text), first);
        }
    }
}
