//! Policy date extraction.
//!
//! Certificates carry effective/expiration dates as `M/D/YY` or `M/D/YYYY`
//! tokens (OCR sometimes renders the separator as `-`). The first two
//! date-shaped tokens inside the relevant section are taken as effective and
//! expiration; calendar-invalid tokens become `None`, never errors.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::section::relevant_section;

pub static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\b").expect("date token pattern is valid")
});

/// Parse one captured date token. Two-digit years are 2000-relative.
/// Returns `None` for calendar-invalid dates (e.g. month 13, Feb 30).
pub fn parse_date_token(month: &str, day: &str, year: &str) -> Option<NaiveDate> {
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    let mut year: i32 = year.parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Extract `(effective, expiration)` from the relevant section of `text`.
///
/// The first date-shaped token is the effective date, the second the
/// expiration. Either slot is `None` when its token is missing or invalid.
pub fn extract_policy_dates(text: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let section = relevant_section(text);

    let mut tokens = DATE_TOKEN.captures_iter(section);
    let effective = tokens
        .next()
        .and_then(|c| parse_date_token(&c[1], &c[2], &c[3]));
    let expiration = tokens
        .next()
        .and_then(|c| parse_date_token(&c[1], &c[2], &c[3]));

    (effective, expiration)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn extracts_effective_and_expiration() {
        let (eff, exp) = extract_policy_dates("POLICY EFF 01/15/2024 POLICY EXP 01/15/2025");
        assert_eq!(eff, Some(date(2024, 1, 15)));
        assert_eq!(exp, Some(date(2025, 1, 15)));
    }

    #[test]
    fn two_digit_years_are_2000_relative() {
        let (eff, exp) = extract_policy_dates("3/1/24 to 3/1/25");
        assert_eq!(eff, Some(date(2024, 3, 1)));
        assert_eq!(exp, Some(date(2025, 3, 1)));
    }

    #[test]
    fn dash_separator_accepted() {
        let (eff, _) = extract_policy_dates("EFF 06-30-2024 EXP 06-30-2025");
        assert_eq!(eff, Some(date(2024, 6, 30)));
    }

    #[test]
    fn calendar_invalid_date_becomes_none() {
        // Month 13 does not exist; the token is discarded, not an error.
        let (eff, exp) = extract_policy_dates("EFF 13/45/2024 EXP 01/15/2025");
        assert_eq!(eff, None);
        assert_eq!(exp, Some(date(2025, 1, 15)));
    }

    #[test]
    fn feb_30_is_invalid() {
        let (eff, _) = extract_policy_dates("EFF 2/30/2024 EXP 01/15/2025");
        assert_eq!(eff, None);
    }

    #[test]
    fn missing_second_date_leaves_expiration_none() {
        let (eff, exp) = extract_policy_dates("EFFECTIVE 01/15/2024 only");
        assert_eq!(eff, Some(date(2024, 1, 15)));
        assert_eq!(exp, None);
    }

    #[test]
    fn no_dates_at_all() {
        let (eff, exp) = extract_policy_dates("no dates anywhere in this text");
        assert_eq!(eff, None);
        assert_eq!(exp, None);
    }

    #[test]
    fn dates_scoped_to_gl_section() {
        // The auto-liability date after the GL block must not leak into the
        // GL policy dates.
        let text = "GENERAL LIABILITY\nEFF 04/01/2024 EXP 04/01/2025\nAUTOMOBILE LIABILITY\nEFF 05/01/2023";
        let (eff, exp) = extract_policy_dates(text);
        assert_eq!(eff, Some(date(2024, 4, 1)));
        assert_eq!(exp, Some(date(2025, 4, 1)));
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "GENERAL LIABILITY EFF 04/01/2024 EXP 04/01/2025";
        let first = extract_policy_dates(text);
        for _ in 0..3 {
            assert_eq!(extract_policy_dates(text), first);
        }
    }
}
