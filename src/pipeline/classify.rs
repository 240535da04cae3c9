//! Document classification over raw certificate text.
//!
//! Each candidate type owns required patterns (all must match or the type
//! scores zero), strong patterns (each adds a bonus), and a weight. Pattern
//! tables are immutable data compiled once and shared by reference; the
//! classifier itself is a stateless value callers construct explicitly.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::DocType;

/// Texts shorter than this cannot be classified.
const MIN_TEXT_CHARS: usize = 100;

/// Default minimum winning score; below it the result is forced to Unknown.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.3;

struct TypeSignature {
    doc_type: DocType,
    required: &'static [&'static str],
    strong: &'static [&'static str],
    weight: f64,
}

/// Declaration order is the tie-break order.
const SIGNATURES: &[TypeSignature] = &[
    TypeSignature {
        doc_type: DocType::AcordCoi,
        required: &[r"ACORD\s*25", r"CERTIFICATE\s+OF\s+(LIABILITY\s+)?INSURANCE"],
        strong: &[
            r"GENERAL\s+LIABILITY",
            r"EACH\s+OCCURRENCE",
            r"AGGREGATE",
            r"PRODUCTS.*COMP.*OP.*AGG",
        ],
        weight: 1.0,
    },
    TypeSignature {
        doc_type: DocType::WorkersComp,
        required: &[r"WORKERS?\s*'?\s*COMP"],
        strong: &[
            r"WC\s+STATUTORY\s+LIMITS",
            r"EMPLOYERS?\s+LIABILITY",
            r"DISEASE.*POLICY\s+LIMIT",
            r"DISEASE.*EACH\s+EMPLOYEE",
        ],
        weight: 0.9,
    },
    TypeSignature {
        doc_type: DocType::AutoLiability,
        required: &[r"AUTOMOBILE\s+LIABILITY", r"AUTO\s+LIABILITY"],
        strong: &[
            r"ANY\s+AUTO",
            r"OWNED\s+AUTOS\s+ONLY",
            r"SCHEDULED\s+AUTOS",
            r"HIRED\s+AUTOS",
            r"NON.*OWNED\s+AUTOS",
        ],
        weight: 0.8,
    },
    TypeSignature {
        doc_type: DocType::Endorsement,
        required: &[r"ENDORSEMENT", r"THIS\s+ENDORSEMENT\s+CHANGES\s+THE\s+POLICY"],
        strong: &[
            r"POLICY\s+NUMBER",
            r"ENDORSEMENT\s+NUMBER",
            r"EFFECTIVE\s+DATE\s+OF\s+ENDORSEMENT",
        ],
        weight: 0.7,
    },
    TypeSignature {
        doc_type: DocType::GenericCertificate,
        required: &[r"CERTIFICATE"],
        strong: &[r"INSURED", r"POLICY\s+NUMBER", r"COVERAGE"],
        weight: 0.5,
    },
];

struct CompiledSignature {
    doc_type: DocType,
    required: Vec<(Regex, String)>,
    strong: Vec<(Regex, String)>,
    weight: f64,
}

/// Human-readable indicator derived from a pattern source.
fn indicator_label(pattern: &str) -> String {
    pattern.replace(r"\s+", " ").replace(r"\s*", "")
}

static COMPILED: LazyLock<Vec<CompiledSignature>> = LazyLock::new(|| {
    SIGNATURES
        .iter()
        .map(|sig| {
            let compile = |patterns: &[&str]| {
                patterns
                    .iter()
                    .map(|p| {
                        (
                            Regex::new(p).expect("classifier pattern is valid"),
                            indicator_label(p),
                        )
                    })
                    .collect::<Vec<_>>()
            };
            CompiledSignature {
                doc_type: sig.doc_type,
                required: compile(sig.required),
                strong: compile(sig.strong),
                weight: sig.weight,
            }
        })
        .collect()
});

/// Classification output: type, confidence, and the indicators that matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub doc_type: DocType,
    pub confidence: f64,
    pub indicators: Vec<String>,
}

impl ClassificationResult {
    fn unknown() -> Self {
        Self {
            doc_type: DocType::Unknown,
            confidence: 0.0,
            indicators: Vec::new(),
        }
    }
}

/// Stateless keyword/pattern classifier. Construct once, share by reference.
#[derive(Debug, Clone)]
pub struct DocumentClassifier {
    min_confidence: f64,
}

impl Default for DocumentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentClassifier {
    pub fn new() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Classify a document from its raw text. Pure: no side effects.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        if text.len() < MIN_TEXT_CHARS {
            return ClassificationResult::unknown();
        }

        let normalized = text.to_uppercase();

        let mut best: Option<(f64, DocType, Vec<String>)> = None;
        for signature in COMPILED.iter() {
            let (score, indicators) = evaluate(signature, &normalized);
            if score <= 0.0 {
                continue;
            }
            // Strictly greater keeps the earliest declaration on ties.
            if best.as_ref().map_or(true, |(s, _, _)| score > *s) {
                best = Some((score, signature.doc_type, indicators));
            }
        }

        let Some((confidence, doc_type, indicators)) = best else {
            return ClassificationResult::unknown();
        };

        if confidence < self.min_confidence {
            return ClassificationResult {
                doc_type: DocType::Unknown,
                confidence,
                indicators,
            };
        }

        ClassificationResult {
            doc_type,
            confidence,
            indicators,
        }
    }
}

fn evaluate(signature: &CompiledSignature, text: &str) -> (f64, Vec<String>) {
    let mut indicators = Vec::new();

    let mut required_found = 0;
    for (pattern, label) in &signature.required {
        if pattern.is_match(text) {
            required_found += 1;
            indicators.push(label.clone());
        }
    }
    if required_found < signature.required.len() {
        return (0.0, indicators);
    }

    let mut strong_found = 0;
    for (pattern, label) in &signature.strong {
        if pattern.is_match(text) {
            strong_found += 1;
            indicators.push(label.clone());
        }
    }

    let score = ((0.5 + 0.1 * strong_found as f64) * signature.weight).min(1.0);
    (score, indicators)
}
