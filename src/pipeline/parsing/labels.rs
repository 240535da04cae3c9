//! Label alias tables for field extraction.
//!
//! OCR and layout variance produce many surface forms for the same logical
//! label (including words merged by OCR, e.g. "EACHOCCURRENCE"). Aliases are
//! ordered data: extraction tries them first-match-wins by table order, so
//! editing priority means reordering a list, not changing code.

use crate::models::CoverageCode;

pub const EACH_OCCURRENCE: &[&str] = &[
    "EACH OCCURRENCE",
    "EACHOCCURRENCE",
    "EACH OCCUR.",
    "EACH OCCUR",
    "EACH OCC.",
    "EACH OCC",
    "EA OCCURRENCE",
    "EA OCC",
];

pub const GENERAL_AGGREGATE: &[&str] = &[
    "GENERAL AGGREGATE",
    "GEN'L AGGREGATE",
    "GENL AGGREGATE",
    "GEN'L AGG.",
    "GENL AGG.",
    "GEN AGGREGATE",
    "GEN AGG",
];

pub const PERSONAL_ADV_INJURY: &[&str] = &[
    "PERSONAL & ADV INJURY",
    "PERSONAL AND ADV INJURY",
    "PERSONAL & ADVERTISING INJURY",
    "PERSONAL AND ADVERTISING INJURY",
    "PERS & ADV INJ",
    "PERS/ADV INJ",
    "PERS ADV INJ",
];

pub const PRODUCTS_AGG: &[&str] = &[
    "PRODUCTS - COMP/OP AGG",
    "PRODUCTS-COMP/OP AGG",
    "PRODUCTS & COMP/OP AGG",
    "PRODUCTS/COMPLETED OPERATIONS AGG",
    "PRODUCTS - COMPLETED OPERATIONS",
    "PRODUCTS/COMPLETED OPS AGG",
    "PROD/COMP OP AGG",
];

pub const DAMAGE_PREMISES: &[&str] = &[
    "DAMAGE TO PREMISES (EA OCCURRENCE)",
    "DAMAGE TO PREMISES (EA OCC)",
    "DAMAGE TO RENTED PREMISES",
    "DAMAGE TO RENTED PREM",
    "PREMISES (EA OCCURRENCE)",
    "PREMISES (EA OCC)",
    "DMG TO RENTED PREM",
];

pub const MEDICAL_EXPENSE: &[&str] = &[
    "MED EXP (ANY ONE PERSON)",
    "MED EXP (ANY ONE PERS)",
    "MEDICAL EXPENSE (ANY ONE PERSON)",
    "MEDICAL EXP (ANY ONE PERSON)",
    "MED EXP",
];

/// Policy-number labels, highest priority first.
pub const POLICY_NUMBER: &[&str] = &[
    "POLICY NUMBER",
    "POLICY NO.",
    "POLICY NO",
    "POLICY #",
    "POL NO.",
    "POL NO",
    "POL #",
    "POLICY",
];

/// Alias list for a GL sub-limit code.
pub fn limit_aliases(code: CoverageCode) -> &'static [&'static str] {
    match code {
        CoverageCode::GlEachOcc => EACH_OCCURRENCE,
        CoverageCode::GlAggregate => GENERAL_AGGREGATE,
        CoverageCode::GlPersAdv => PERSONAL_ADV_INJURY,
        CoverageCode::GlProdAgg => PRODUCTS_AGG,
        CoverageCode::GlDamagePrem => DAMAGE_PREMISES,
        CoverageCode::GlMedExp => MEDICAL_EXPENSE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_has_aliases() {
        for code in CoverageCode::all() {
            assert!(!limit_aliases(*code).is_empty(), "{code} has no aliases");
        }
    }

    #[test]
    fn canonical_form_is_first() {
        assert_eq!(EACH_OCCURRENCE[0], "EACH OCCURRENCE");
        assert_eq!(GENERAL_AGGREGATE[0], "GENERAL AGGREGATE");
        assert_eq!(POLICY_NUMBER[0], "POLICY NUMBER");
    }

    #[test]
    fn merged_ocr_variant_present() {
        assert!(EACH_OCCURRENCE.contains(&"EACHOCCURRENCE"));
    }

    #[test]
    fn bare_policy_label_is_lowest_priority() {
        assert_eq!(*POLICY_NUMBER.last().unwrap(), "POLICY");
    }
}
