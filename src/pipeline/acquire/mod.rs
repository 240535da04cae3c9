//! Text acquisition interface.
//!
//! Actual page extraction (native PDF text layer, OCR engines) lives behind
//! [`TextAcquirer`]; the pipeline only sees ordered pages plus provenance.
//! Acquisition is the one retryable stage: provider failures are transient
//! (engine busy, render timeout), everything else is terminal for the run.

pub mod cache;

pub use cache::{content_hash, text_hash, CachedText, FsTextCache, TextCache};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How OCR participates in acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcquisitionMode {
    /// Always run OCR and use its output.
    Required,
    /// Use the native text layer when it has enough characters, OCR otherwise.
    Fallback,
}

/// Which engine produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextProvider {
    NativeLayer,
    OcrEngine,
}

impl TextProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativeLayer => "NATIVE_LAYER",
            Self::OcrEngine => "OCR_ENGINE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NATIVE_LAYER" => Some(Self::NativeLayer),
            "OCR_ENGINE" => Some(Self::OcrEngine),
            _ => None,
        }
    }
}

impl std::fmt::Display for TextProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tuning handed to acquirer implementations.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionConfig {
    pub mode: AcquisitionMode,
    /// In `Fallback` mode, a native text layer shorter than this falls
    /// through to OCR (and sets `used_fallback`).
    pub min_chars_for_text_layer: usize,
    /// Bound on pages processed per document; certificates front-load the
    /// ACORD form, so large attachments need not be fully OCRed.
    pub max_pages: Option<u32>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            mode: AcquisitionMode::Fallback,
            min_chars_for_text_layer: 50,
            max_pages: None,
        }
    }
}

/// One page of acquired text. Discarded after parsing, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
    pub lines: Vec<String>,
}

impl PageText {
    pub fn from_text(page_number: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = text.lines().map(str::to_string).collect();
        Self {
            page_number,
            text,
            lines,
        }
    }
}

/// Result of acquiring text from one document.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredText {
    pub pages: Vec<PageText>,
    pub provider: TextProvider,
    /// True when `Fallback` mode had to run OCR after a thin text layer.
    pub used_fallback: bool,
    pub mode: AcquisitionMode,
}

impl AcquiredText {
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.text.len()).sum()
    }

    pub fn full_text(&self) -> String {
        crate::pipeline::parsing::full_text(&self.pages)
    }
}

/// Reference to a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub path: PathBuf,
}

impl DocumentRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Failures during text acquisition.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Transient provider failure; the orchestrator retries these.
    #[error("text provider failure: {0}")]
    Provider(String),

    /// The document exists but cannot be read as pages.
    #[error("document is unreadable: {0}")]
    DocumentUnreadable(String),

    /// File type no provider handles.
    #[error("unsupported document format: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquisitionError {
    /// Only provider failures are worth retrying; a corrupt or unsupported
    /// document will not improve on a second attempt.
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

/// Source of raw page text. Implementations may block on an external engine;
/// they are expected to enforce their own timeouts.
pub trait TextAcquirer: Send + Sync {
    fn acquire(
        &self,
        doc: &DocumentRef,
        config: &AcquisitionConfig,
    ) -> Result<AcquiredText, AcquisitionError>;
}

/// Fixed-response acquirer for tests and dry runs.
pub struct StaticTextAcquirer {
    text: String,
    provider: TextProvider,
}

impl StaticTextAcquirer {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            provider: TextProvider::NativeLayer,
        }
    }

    pub fn with_provider(mut self, provider: TextProvider) -> Self {
        self.provider = provider;
        self
    }
}

impl TextAcquirer for StaticTextAcquirer {
    fn acquire(
        &self,
        _doc: &DocumentRef,
        config: &AcquisitionConfig,
    ) -> Result<AcquiredText, AcquisitionError> {
        Ok(AcquiredText {
            pages: vec![PageText::from_text(1, self.text.clone())],
            provider: self.provider,
            used_fallback: false,
            mode: config.mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_text_splits_lines() {
        let page = PageText::from_text(1, "line one\nline two");
        assert_eq!(page.lines, vec!["line one", "line two"]);
        assert_eq!(page.page_number, 1);
    }

    #[test]
    fn acquired_text_counts_chars_across_pages() {
        let acquired = AcquiredText {
            pages: vec![PageText::from_text(1, "abc"), PageText::from_text(2, "defg")],
            provider: TextProvider::NativeLayer,
            used_fallback: false,
            mode: AcquisitionMode::Fallback,
        };
        assert_eq!(acquired.char_count(), 7);
        assert_eq!(acquired.full_text(), "abc\ndefg");
    }

    #[test]
    fn provider_roundtrip() {
        for provider in [TextProvider::NativeLayer, TextProvider::OcrEngine] {
            assert_eq!(TextProvider::from_str(provider.as_str()), Some(provider));
        }
        assert_eq!(TextProvider::from_str("PDFPLUMBER"), None);
    }

    #[test]
    fn only_provider_errors_are_retryable() {
        assert!(AcquisitionError::Provider("engine busy".into()).retryable());
        assert!(!AcquisitionError::DocumentUnreadable("garbage bytes".into()).retryable());
        assert!(!AcquisitionError::Unsupported("docx".into()).retryable());
        let io = AcquisitionError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert!(!io.retryable());
    }

    #[test]
    fn static_acquirer_returns_configured_text() {
        let acquirer = StaticTextAcquirer::new("EACH OCCURRENCE $1,000,000")
            .with_provider(TextProvider::OcrEngine);
        let doc = DocumentRef::new("/tmp/cert.pdf");
        let config = AcquisitionConfig {
            mode: AcquisitionMode::Required,
            ..AcquisitionConfig::default()
        };
        let acquired = acquirer.acquire(&doc, &config).unwrap();
        assert_eq!(acquired.provider, TextProvider::OcrEngine);
        assert_eq!(acquired.mode, AcquisitionMode::Required);
        assert_eq!(acquired.pages.len(), 1);
        assert!(acquired.full_text().contains("EACH OCCURRENCE"));
    }

    #[test]
    fn acquisition_config_defaults() {
        let config = AcquisitionConfig::default();
        assert_eq!(config.mode, AcquisitionMode::Fallback);
        assert_eq!(config.min_chars_for_text_layer, 50);
        assert_eq!(config.max_pages, None);
    }
}
