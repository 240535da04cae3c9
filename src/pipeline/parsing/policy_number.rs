//! Policy number extraction.
//!
//! Labeled capture runs first: each label alias is tried in priority order,
//! same-line capture before a bounded window after the label. When no label
//! matches, the token immediately preceding the first date token is taken
//! as a last resort (ACORD tables put the policy number in the column just
//! before the effective date).

use std::sync::LazyLock;

use regex::Regex;

use super::dates::DATE_TOKEN;
use super::labels;
use super::section::relevant_section;

/// Characters after a label considered by the windowed pass.
const LABEL_WINDOW: usize = 80;

struct LabelPatterns {
    same_line: Regex,
    windowed: Regex,
}

static POLICY_PATTERNS: LazyLock<Vec<LabelPatterns>> = LazyLock::new(|| {
    labels::POLICY_NUMBER
        .iter()
        .map(|label| {
            let escaped = regex::escape(label);
            LabelPatterns {
                same_line: Regex::new(&format!(
                    r"(?i){escaped}[:#]?[^\S\n]*([A-Z0-9][A-Z0-9\-]{{5,19}})\b"
                ))
                .expect("policy same-line pattern is valid"),
                windowed: Regex::new(&format!(
                    r"(?i){escaped}[\s\S]{{0,{LABEL_WINDOW}}}?([A-Z0-9][A-Z0-9\-]{{5,19}})\b"
                ))
                .expect("policy windowed pattern is valid"),
            }
        })
        .collect()
});

/// A captured candidate is usable when it is 6–20 characters, not a bare
/// number (dollar figures), and not a date token.
fn is_plausible_candidate(candidate: &str) -> bool {
    let len = candidate.len();
    if !(6..=20).contains(&len) {
        return false;
    }
    if candidate.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    !DATE_TOKEN.is_match(candidate)
}

fn labeled_capture(section: &str) -> Option<String> {
    for patterns in POLICY_PATTERNS.iter() {
        for pattern in [&patterns.same_line, &patterns.windowed] {
            if let Some(caps) = pattern.captures(section) {
                let candidate = caps[1].trim().to_string();
                if is_plausible_candidate(&candidate) {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// Token immediately preceding the first date token, accepted only when it
/// contains a digit and is at least 6 characters.
fn token_before_first_date(section: &str) -> Option<String> {
    let date = DATE_TOKEN.find(section)?;
    let preceding = &section[..date.start()];
    let token = preceding
        .split_whitespace()
        .last()?
        .trim_matches(|c: char| !c.is_ascii_alphanumeric());

    if token.len() >= 6 && token.chars().any(|c| c.is_ascii_digit()) {
        Some(token.to_string())
    } else {
        None
    }
}

/// Extract the policy number from the relevant section of `text`.
pub fn extract_policy_number(text: &str) -> Option<String> {
    let section = relevant_section(text);

    if let Some(number) = labeled_capture(section) {
        tracing::debug!(policy_number = %number, "Policy number from label capture");
        return Some(number);
    }

    let fallback = token_before_first_date(section);
    if let Some(number) = &fallback {
        tracing::debug!(policy_number = %number, "Policy number from date-adjacent token");
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_line_label_capture() {
        let number = extract_policy_number("POLICY NUMBER: GL-1234567");
        assert_eq!(number.as_deref(), Some("GL-1234567"));
    }

    #[test]
    fn windowed_label_capture() {
        // OCR pushed the value a little away from its label.
        let text = "POLICY NUMBER\n   \n  CPL0045678";
        assert_eq!(extract_policy_number(text).as_deref(), Some("CPL0045678"));
    }

    #[test]
    fn label_priority_beats_positional_order() {
        // The bare "POLICY" alias appears earlier in the text, but the
        // explicit "POLICY NUMBER" label has higher priority.
        let text = "POLICY HOLDER ACME9X\nPOLICY NUMBER: GLX-998877";
        assert_eq!(extract_policy_number(text).as_deref(), Some("GLX-998877"));
    }

    #[test]
    fn pure_digit_capture_rejected() {
        // "POLICY LIMIT 1000000" must not yield a policy number.
        assert_eq!(extract_policy_number("POLICY LIMIT 1000000"), None);
    }

    #[test]
    fn date_after_label_not_taken_as_number() {
        let text = "POLICY NUMBER unreadable EFF 01-15-2024 GL7654321 02/01/2024";
        let number = extract_policy_number(text);
        assert_ne!(number.as_deref(), Some("01-15-2024"));
    }

    #[test]
    fn fallback_token_before_date() {
        let text = "GENERAL LIABILITY X CARRIER GL7654321 01/15/2024 01/15/2025";
        assert_eq!(extract_policy_number(text).as_deref(), Some("GL7654321"));
    }

    #[test]
    fn fallback_requires_a_digit() {
        let text = "GENERAL LIABILITY FROM CARRIER 01/15/2024 01/15/2025";
        assert_eq!(extract_policy_number(text), None);
    }

    #[test]
    fn fallback_requires_six_chars() {
        let text = "GENERAL LIABILITY AB1 01/15/2024 01/15/2025";
        assert_eq!(extract_policy_number(text), None);
    }

    #[test]
    fn no_label_no_date_yields_none() {
        assert_eq!(extract_policy_number("nothing useful here"), None);
    }

    #[test]
    fn candidate_length_bounds() {
        assert!(!is_plausible_candidate("AB123"));
        assert!(is_plausible_candidate("AB1234"));
        assert!(!is_plausible_candidate(&"A1".repeat(11)));
    }
}
