//! Closed enums for statuses, codes, and provenance tags.
//!
//! Everything that used to travel as a bare string in the persistence layer
//! is a checked set here, with `as_str`/`from_str` for the database boundary.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════
// Run lifecycle
// ═══════════════════════════════════════════

/// Status of one extraction run.
///
/// A run only moves forward through [`RunStatus::can_transition_to`]; the
/// single exception is the explicit reset operation in the run repository,
/// which returns a terminally-failed run to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Started,
    AcquiringText,
    Parsing,
    Success,
    AcquisitionFailed,
    ParsingFailed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Started => "STARTED",
            Self::AcquiringText => "ACQUIRING_TEXT",
            Self::Parsing => "PARSING",
            Self::Success => "SUCCESS",
            Self::AcquisitionFailed => "ACQUISITION_FAILED",
            Self::ParsingFailed => "PARSING_FAILED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "STARTED" => Some(Self::Started),
            "ACQUIRING_TEXT" => Some(Self::AcquiringText),
            "PARSING" => Some(Self::Parsing),
            "SUCCESS" => Some(Self::Success),
            "ACQUISITION_FAILED" => Some(Self::AcquisitionFailed),
            "PARSING_FAILED" => Some(Self::ParsingFailed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// True once a run can no longer advance.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::AcquisitionFailed | Self::ParsingFailed | Self::Failed
        )
    }

    /// True for terminal states that an operator may reset to `Pending`.
    /// `Success` is terminal but never reset.
    pub fn is_resettable(&self) -> bool {
        matches!(
            self,
            Self::AcquisitionFailed | Self::ParsingFailed | Self::Failed
        )
    }

    /// Forward transition table. Exhaustive on the current state so adding
    /// a status forces a decision here.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Started),
            Self::Started => matches!(next, Self::AcquiringText),
            Self::AcquiringText => matches!(next, Self::Parsing | Self::AcquisitionFailed),
            Self::Parsing => matches!(next, Self::Success | Self::ParsingFailed | Self::Failed),
            Self::Success | Self::AcquisitionFailed | Self::ParsingFailed | Self::Failed => false,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Certificate status
// ═══════════════════════════════════════════

/// Extraction status carried on a certificate row. The batch driver selects
/// on `Pending`; the orchestrator writes the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    Pending,
    Processing,
    Extracted,
    Failed,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Extracted => "EXTRACTED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "EXTRACTED" => Some(Self::Extracted),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Provenance
// ═══════════════════════════════════════════

/// How an outcome (or one of its fields) was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceMethod {
    /// Heuristic regex parsing over acquired text.
    #[serde(rename = "REGEX_PARSER")]
    Regex,
    /// AI-assisted extraction, used when the heuristic score was too low.
    #[serde(rename = "AI_FALLBACK")]
    AiFallback,
}

impl SourceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regex => "REGEX_PARSER",
            Self::AiFallback => "AI_FALLBACK",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "REGEX_PARSER" => Some(Self::Regex),
            "AI_FALLBACK" => Some(Self::AiFallback),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Lines of business and coverage codes
// ═══════════════════════════════════════════

/// Line of Business code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LobCode {
    #[serde(rename = "GL")]
    GeneralLiability,
    #[serde(rename = "AL")]
    AutoLiability,
    #[serde(rename = "WC")]
    WorkersComp,
    #[serde(rename = "UMB")]
    Umbrella,
}

impl LobCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralLiability => "GL",
            Self::AutoLiability => "AL",
            Self::WorkersComp => "WC",
            Self::Umbrella => "UMB",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GL" => Some(Self::GeneralLiability),
            "AL" => Some(Self::AutoLiability),
            "WC" => Some(Self::WorkersComp),
            "UMB" => Some(Self::Umbrella),
            _ => None,
        }
    }
}

impl std::fmt::Display for LobCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The six General Liability sub-limit codes the extractor targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverageCode {
    #[serde(rename = "GL_EACH_OCC")]
    GlEachOcc,
    #[serde(rename = "GL_AGGREGATE")]
    GlAggregate,
    #[serde(rename = "GL_PERS_ADV")]
    GlPersAdv,
    #[serde(rename = "GL_PROD_AGG")]
    GlProdAgg,
    #[serde(rename = "GL_DAMAGE_PREM")]
    GlDamagePrem,
    #[serde(rename = "GL_MED_EXP")]
    GlMedExp,
}

impl CoverageCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GlEachOcc => "GL_EACH_OCC",
            Self::GlAggregate => "GL_AGGREGATE",
            Self::GlPersAdv => "GL_PERS_ADV",
            Self::GlProdAgg => "GL_PROD_AGG",
            Self::GlDamagePrem => "GL_DAMAGE_PREM",
            Self::GlMedExp => "GL_MED_EXP",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GL_EACH_OCC" => Some(Self::GlEachOcc),
            "GL_AGGREGATE" => Some(Self::GlAggregate),
            "GL_PERS_ADV" => Some(Self::GlPersAdv),
            "GL_PROD_AGG" => Some(Self::GlProdAgg),
            "GL_DAMAGE_PREM" => Some(Self::GlDamagePrem),
            "GL_MED_EXP" => Some(Self::GlMedExp),
            _ => None,
        }
    }

    /// All codes in extraction order.
    pub fn all() -> &'static [CoverageCode] {
        &[
            Self::GlEachOcc,
            Self::GlAggregate,
            Self::GlPersAdv,
            Self::GlProdAgg,
            Self::GlDamagePrem,
            Self::GlMedExp,
        ]
    }

    /// The two primary GL limits that drive the quality score.
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::GlEachOcc | Self::GlAggregate)
    }
}

impl std::fmt::Display for CoverageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Document types
// ═══════════════════════════════════════════

/// Document type assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocType {
    #[serde(rename = "ACORD_25_COI")]
    AcordCoi,
    #[serde(rename = "WORKERS_COMP")]
    WorkersComp,
    #[serde(rename = "AUTO_LIABILITY")]
    AutoLiability,
    #[serde(rename = "ENDORSEMENT")]
    Endorsement,
    #[serde(rename = "CERTIFICATE_GENERIC")]
    GenericCertificate,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AcordCoi => "ACORD_25_COI",
            Self::WorkersComp => "WORKERS_COMP",
            Self::AutoLiability => "AUTO_LIABILITY",
            Self::Endorsement => "ENDORSEMENT",
            Self::GenericCertificate => "CERTIFICATE_GENERIC",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACORD_25_COI" => Some(Self::AcordCoi),
            "WORKERS_COMP" => Some(Self::WorkersComp),
            "AUTO_LIABILITY" => Some(Self::AutoLiability),
            "ENDORSEMENT" => Some(Self::Endorsement),
            "CERTIFICATE_GENERIC" => Some(Self::GenericCertificate),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_roundtrip() {
        let all = [
            RunStatus::Pending,
            RunStatus::Started,
            RunStatus::AcquiringText,
            RunStatus::Parsing,
            RunStatus::Success,
            RunStatus::AcquisitionFailed,
            RunStatus::ParsingFailed,
            RunStatus::Failed,
        ];
        for status in &all {
            let s = status.as_str();
            assert_eq!(RunStatus::from_str(s), Some(*status), "Roundtrip failed for {s}");
        }
    }

    #[test]
    fn run_status_happy_path_transitions() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Started));
        assert!(RunStatus::Started.can_transition_to(RunStatus::AcquiringText));
        assert!(RunStatus::AcquiringText.can_transition_to(RunStatus::Parsing));
        assert!(RunStatus::Parsing.can_transition_to(RunStatus::Success));
    }

    #[test]
    fn run_status_failure_transitions() {
        assert!(RunStatus::AcquiringText.can_transition_to(RunStatus::AcquisitionFailed));
        assert!(RunStatus::Parsing.can_transition_to(RunStatus::ParsingFailed));
        assert!(RunStatus::Parsing.can_transition_to(RunStatus::Failed));
    }

    #[test]
    fn run_status_never_moves_backward() {
        assert!(!RunStatus::Parsing.can_transition_to(RunStatus::AcquiringText));
        assert!(!RunStatus::Started.can_transition_to(RunStatus::Pending));
        assert!(!RunStatus::Success.can_transition_to(RunStatus::Parsing));
    }

    #[test]
    fn run_status_no_step_skipping() {
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Parsing));
        assert!(!RunStatus::Started.can_transition_to(RunStatus::Success));
        assert!(!RunStatus::AcquiringText.can_transition_to(RunStatus::Success));
    }

    #[test]
    fn terminal_states_have_no_successors() {
        let terminal = [
            RunStatus::Success,
            RunStatus::AcquisitionFailed,
            RunStatus::ParsingFailed,
            RunStatus::Failed,
        ];
        let all = [
            RunStatus::Pending,
            RunStatus::Started,
            RunStatus::AcquiringText,
            RunStatus::Parsing,
            RunStatus::Success,
            RunStatus::AcquisitionFailed,
            RunStatus::ParsingFailed,
            RunStatus::Failed,
        ];
        for t in &terminal {
            assert!(t.is_terminal());
            for next in &all {
                assert!(!t.can_transition_to(*next), "{t} must not advance to {next}");
            }
        }
    }

    #[test]
    fn success_is_not_resettable() {
        assert!(!RunStatus::Success.is_resettable());
        assert!(RunStatus::AcquisitionFailed.is_resettable());
        assert!(RunStatus::ParsingFailed.is_resettable());
        assert!(RunStatus::Failed.is_resettable());
    }

    #[test]
    fn certificate_status_roundtrip() {
        for status in [
            CertificateStatus::Pending,
            CertificateStatus::Processing,
            CertificateStatus::Extracted,
            CertificateStatus::Failed,
        ] {
            assert_eq!(CertificateStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn source_method_wire_names() {
        assert_eq!(SourceMethod::Regex.as_str(), "REGEX_PARSER");
        assert_eq!(SourceMethod::AiFallback.as_str(), "AI_FALLBACK");
        assert_eq!(SourceMethod::from_str("AI_FALLBACK"), Some(SourceMethod::AiFallback));
        assert_eq!(SourceMethod::from_str("unknown"), None);
    }

    #[test]
    fn coverage_code_all_has_six() {
        assert_eq!(CoverageCode::all().len(), 6);
    }

    #[test]
    fn coverage_code_primaries() {
        assert!(CoverageCode::GlEachOcc.is_primary());
        assert!(CoverageCode::GlAggregate.is_primary());
        assert!(!CoverageCode::GlMedExp.is_primary());
        assert!(!CoverageCode::GlDamagePrem.is_primary());
    }

    #[test]
    fn coverage_code_roundtrip() {
        for code in CoverageCode::all() {
            assert_eq!(CoverageCode::from_str(code.as_str()), Some(*code));
        }
    }

    #[test]
    fn doc_type_roundtrip() {
        for doc_type in [
            DocType::AcordCoi,
            DocType::WorkersComp,
            DocType::AutoLiability,
            DocType::Endorsement,
            DocType::GenericCertificate,
            DocType::Unknown,
        ] {
            assert_eq!(DocType::from_str(doc_type.as_str()), Some(doc_type));
        }
    }

    #[test]
    fn run_status_serde_uses_wire_names() {
        let json = serde_json::to_string(&RunStatus::AcquiringText).unwrap();
        assert_eq!(json, "\"ACQUIRING_TEXT\"");
        let parsed: RunStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, RunStatus::AcquiringText);
    }

    #[test]
    fn coverage_code_serde_uses_wire_names() {
        let json = serde_json::to_string(&CoverageCode::GlEachOcc).unwrap();
        assert_eq!(json, "\"GL_EACH_OCC\"");
    }
}
