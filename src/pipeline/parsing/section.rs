//! Locating the General Liability section of a certificate.
//!
//! ACORD-style certificates list coverage lines in sequence; the GL block
//! runs from its heading to the next coverage-line heading. Bounding field
//! extraction to this window keeps Auto/Umbrella/WC figures from bleeding
//! into GL fields.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum characters of GL section considered after the anchor.
const SECTION_SPAN: usize = 2_000;

static GL_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)COMMERCIAL\s+GENERAL\s+LIABILITY|GENERAL\s+LIABILITY")
        .expect("GL anchor pattern is valid")
});

static NEXT_COVERAGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)AUTOMOBILE|UMBRELLA|WORKERS|EXCESS")
        .expect("coverage-line heading pattern is valid")
});

/// Find the GL section: from the GL heading up to the next coverage-line
/// heading or at most [`SECTION_SPAN`] characters. `None` when the text has
/// no GL heading; callers fall back to the full text.
pub fn find_gl_section(text: &str) -> Option<&str> {
    let anchor = GL_ANCHOR.find(text)?;

    let mut end = anchor.end().saturating_add(SECTION_SPAN).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let window = &text[anchor.start()..end];
    // Cut at the next coverage-line heading, searching past the anchor itself.
    let body_offset = anchor.end() - anchor.start();
    match NEXT_COVERAGE_LINE.find(&window[body_offset..]) {
        Some(next) => Some(&window[..body_offset + next.start()]),
        None => Some(window),
    }
}

/// The window field extraction operates on: the GL section when present,
/// otherwise the whole text.
pub fn relevant_section(text: &str) -> &str {
    find_gl_section(text).unwrap_or(text)
}
