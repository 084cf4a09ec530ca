//! Clean-up of raw recognizer output before matching
//!
//! Neither helper is applied by the disambiguator itself; recognition
//! pipelines run them on each frame's lines first.

use ahash::AHashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::patterns::extract_order_codes;
use crate::types::TextObservation;

/// Default dedupe tolerance, relative to the smaller frame dimension
pub const DEFAULT_PROXIMITY_RATIO: f64 = 0.08;

/// Dedupe tolerance never drops below this many pixels
const MIN_PROXIMITY_PX: f64 = 4.0;

const MIN_TEXT_LEN: usize = 3;
const MAX_SPECIAL_CHAR_RATIO: f64 = 0.3;
const MAX_SINGLE_CHAR_WORD_RATIO: f64 = 0.5;
const MAX_HYPHENS: usize = 2;

static SINGLE_CHAR_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9_]\b").expect("Invalid regex pattern"));
static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s]").expect("Invalid regex pattern"));

/// Normalize one recognized line, or return an empty string for noise
///
/// A line containing an order code (possibly split by spaces) reduces to
/// that code alone.
pub fn clean_ocr_text(text: &str) -> String {
    let cleaned = collapse_whitespace(text);
    if cleaned.is_empty() {
        return String::new();
    }

    if let Some(code) = extract_order_codes(&cleaned).into_iter().next() {
        if code.len() == 6 {
            return code;
        }
    }

    let len = cleaned.chars().count();
    if len < MIN_TEXT_LEN && !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return String::new();
    }

    let special = PUNCTUATION.find_iter(&cleaned).count();
    if special as f64 / len as f64 > MAX_SPECIAL_CHAR_RATIO {
        return String::new();
    }

    let words: Vec<&str> = cleaned.split(' ').collect();
    let single_char = words.iter().filter(|w| w.chars().count() == 1).count();
    if words.len() > 2 && single_char as f64 / words.len() as f64 > MAX_SINGLE_CHAR_WORD_RATIO {
        return String::new();
    }

    if cleaned.matches('-').count() > MAX_HYPHENS {
        return String::new();
    }

    let stripped = SINGLE_CHAR_WORD.replace_all(&cleaned, "");
    let stripped = PUNCTUATION.replace_all(&stripped, "");
    let result = collapse_whitespace(&stripped);
    if result.chars().count() < MIN_TEXT_LEN {
        return String::new();
    }
    result
}

/// Drop repeated readings of the same text at nearly the same spot
///
/// Identical text (case-insensitive) is only a duplicate when its centre
/// lies within `max(4px, min(width, height) * proximity_ratio)` of a reading
/// already kept; the same label printed twice on a box survives.
pub fn dedupe_observations(
    items: &[TextObservation],
    proximity_ratio: f64,
) -> Vec<TextObservation> {
    let mut seen: AHashMap<String, Vec<(f64, f64)>> = AHashMap::new();
    let mut result = Vec::with_capacity(items.len());

    for item in items {
        let key = item.text.to_uppercase();
        if key.is_empty() {
            continue;
        }

        let tolerance = MIN_PROXIMITY_PX.max(item.width.min(item.height) * proximity_ratio);
        let kept = seen.entry(key).or_default();
        let duplicate = kept.iter().any(|&(x, y)| {
            let dx = x - item.center_x;
            let dy = y - item.center_y;
            (dx * dx + dy * dy).sqrt() <= tolerance
        });

        if !duplicate {
            kept.push((item.center_x, item.center_y));
            result.push(item.clone());
        }
    }

    result
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
