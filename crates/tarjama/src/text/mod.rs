//! Script-aware text normalization.
//!
//! Applied to every block exactly once, after segmentation and before
//! translation. [`normalize`] is pure and idempotent; punctuation and
//! non-Arabic scripts pass through untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Tatweel / kashida elongation mark.
const TATWEEL: char = '\u{0640}';

/// Alef variants folded to bare alef: madda, hamza above, hamza below.
const ALEF_VARIANTS: [char; 3] = ['\u{0622}', '\u{0623}', '\u{0625}'];
const ALEF: char = '\u{0627}';

/// Zero-width / invisible formatting characters stripped outright:
/// ZWSP, ZWNJ, ZWJ, BOM.
const ZERO_WIDTH: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex pattern is valid and should compile"));

/// Normalize extracted or OCR'd text ahead of translation.
///
/// Policy:
/// - strip tatweel elongation marks
/// - fold alef variants bearing madda/hamza to bare alef
/// - strip zero-width formatting characters
/// - collapse whitespace runs to a single space and trim
///
/// `normalize(normalize(t)) == normalize(t)` for all `t`.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut folded = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == TATWEEL || ZERO_WIDTH.contains(&ch) {
            continue;
        }
        if ALEF_VARIANTS.contains(&ch) {
            folded.push(ALEF);
        } else {
            folded.push(ch);
        }
    }

    let collapsed: Cow<'_, str> = WHITESPACE_RUN.replace_all(&folded, " ");
    collapsed.trim().to_string()
}

/// Script classification from a range-based codepoint check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// At least one codepoint in the Arabic block U+0600..=U+06FF.
    Arabic,
    Other,
}

/// Classify text by presence of any Arabic-block codepoint.
///
/// Used for quick language routing and as a pre-filter before invoking the
/// full statistical detector.
pub fn detect_script(text: &str) -> Script {
    if text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c)) {
        Script::Arabic
    } else {
        Script::Other
    }
}
