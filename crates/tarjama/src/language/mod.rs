//! Language routing for the skip-if-target-language optimization.
//!
//! Two-step detection: the cheap range-based script check first, then
//! whatlang statistical detection when the quick check is inconclusive.

use crate::text::{detect_script, Script};
use whatlang::{detect, Lang};

/// Minimum text length for reliable detection; shorter inputs are
/// undetectable.
const MIN_DETECTABLE_CHARS: usize = 3;

/// Confidence floor below which whatlang's answer is discarded.
const MIN_CONFIDENCE: f64 = 0.5;

/// Detect the language of a text fragment.
///
/// Returns a short language tag (`"ar"`, `"en"`, or whatlang's mapped
/// two-letter code), or `None` when the text is too short or detection is
/// not confident enough.
pub fn detect_language(text: &str) -> Option<&'static str> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_DETECTABLE_CHARS {
        return None;
    }

    // Any Arabic-block codepoint settles it without the statistical pass.
    if detect_script(trimmed) == Script::Arabic {
        return Some("ar");
    }

    let info = detect(trimmed)?;
    if info.confidence() < MIN_CONFIDENCE {
        return None;
    }
    Some(lang_to_tag(info.lang()))
}

/// Whether `text` is already in the language named by `target_tag`.
///
/// `target_tag` accepts both short tags ("en") and NLLB-style tags
/// ("eng_Latn"); only the leading subtag is compared.
pub fn matches_target_language(text: &str, target_tag: &str) -> bool {
    let Some(detected) = detect_language(text) else {
        return false;
    };
    let target = primary_subtag(target_tag);
    // "en" vs "eng": compare on the shorter prefix.
    target.starts_with(detected) || detected.starts_with(target)
}

fn primary_subtag(tag: &str) -> &str {
    tag.split(['_', '-']).next().unwrap_or(tag)
}

/// Short document-language tag for a backend language tag:
/// `"eng_Latn"` → `"en"`, `"ar"` → `"ar"`.
pub fn short_tag(tag: &str) -> String {
    let primary = primary_subtag(tag);
    let shortened = match primary {
        "ara" => "ar",
        "eng" => "en",
        "fra" => "fr",
        "deu" => "de",
        "spa" => "es",
        "por" => "pt",
        "ita" => "it",
        "rus" => "ru",
        other => other,
    };
    shortened.to_string()
}

fn lang_to_tag(lang: Lang) -> &'static str {
    match lang {
        Lang::Ara => "ar",
        Lang::Eng => "en",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Spa => "es",
        Lang::Por => "pt",
        Lang::Ita => "it",
        Lang::Rus => "ru",
        Lang::Tur => "tr",
        Lang::Pes => "fa",
        Lang::Urd => "ur",
        Lang::Hin => "hi",
        Lang::Cmn => "zh",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Nld => "nl",
        other => other.code(),
    }
}
