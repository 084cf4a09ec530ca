//! Pattern extraction from recognized text and product names
//!
//! Pulls order codes, "WORD NUMBER" family designators and significant
//! words out of free text.

use once_cell::sync::Lazy;
use regex::Regex;

// Compiled once; the patterns are constants and cannot fail to build.
static ORDER_CODE_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^19\d{4}$").expect("Invalid regex pattern"));
// Recognizers often split a code into groups: "19 12 34"
static SPACED_ORDER_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"19\s*\d\s*\d\s*\d\s*\d").expect("Invalid regex pattern"));
static DESIGNATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]{4,})\s*(\d{3,4})").expect("Invalid regex pattern"));
static CATALOG_DESIGNATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]+)\s+(\d{3,4})").expect("Invalid regex pattern"));
static FAMILY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z]+(?:\s+[A-Z]+)*)\s*(\d{3,4})(?:\D|$)").expect("Invalid regex pattern")
});
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s]").expect("Invalid regex pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

/// Minimum length (exclusive) of a token worth indexing
const SIGNIFICANT_WORD_MIN: usize = 2;

/// A base name plus numeric designator, e.g. `ODESSA` + `922`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Designator {
    pub name: String,
    pub number: String,
}

impl Designator {
    pub fn key(&self) -> String {
        format!("{} {}", self.name, self.number)
    }
}

/// Whether `code` follows the `19` + four digits convention
pub fn is_order_code_format(code: &str) -> bool {
    ORDER_CODE_FORMAT.is_match(code)
}

/// Order codes embedded in noisy text, with inner whitespace removed
pub fn extract_order_codes(text: &str) -> Vec<String> {
    SPACED_ORDER_CODE
        .find_iter(text)
        .map(|m| m.as_str().split_whitespace().collect::<String>())
        .collect()
}

/// Uppercase, whitespace-free form used for whole-text code comparison
pub fn compact(text: &str) -> String {
    text.split_whitespace().collect::<String>().to_uppercase()
}

/// Uppercase tokens longer than two chars, punctuation treated as a separator
pub fn significant_words(text: &str) -> Vec<String> {
    NON_WORD
        .replace_all(text, " ")
        .split_whitespace()
        .filter(|word| word.chars().count() > SIGNIFICANT_WORD_MIN)
        .map(|word| word.to_uppercase())
        .collect()
}

/// Uppercase with punctuation dropped and whitespace collapsed
pub fn normalize_for_match(text: &str) -> String {
    let upper = text.to_uppercase();
    let collapsed = WHITESPACE.replace_all(&upper, " ");
    let stripped = NON_WORD.replace_all(&collapsed, "");
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

/// Every "WORD NUMBER" designator in the text (word of 4+ letters, 3-4 digits)
pub fn designators(text: &str) -> Vec<Designator> {
    let upper = text.to_uppercase();
    DESIGNATOR
        .captures_iter(&upper)
        .map(|cap| Designator {
            name: cap[1].to_string(),
            number: cap[2].to_string(),
        })
        .collect()
}

/// Designator a catalog name starts with, e.g. "ODESSA 922 BASIN" → ODESSA 922
pub fn catalog_designator(product_name: &str) -> Option<Designator> {
    let upper = product_name.trim().to_uppercase();
    CATALOG_DESIGNATOR.captures(&upper).map(|cap| Designator {
        name: cap[1].to_string(),
        number: cap[2].to_string(),
    })
}

/// Key grouping variants of one product line
///
/// Uses the leading words and number of the name ("LA ROCCA 800 VANITY" →
/// "LA ROCCA 800"), else its first one or two significant words. Returns an
/// empty string only for names with no usable text.
pub fn family_key(product_name: &str) -> String {
    let upper = product_name.trim().to_uppercase();

    if let Some(cap) = FAMILY_PREFIX.captures(&upper) {
        let words = WHITESPACE.replace_all(&cap[1], " ");
        return format!("{} {}", words, &cap[2]);
    }

    let words = significant_words(&upper);
    if !words.is_empty() {
        return words.iter().take(2).cloned().collect::<Vec<_>>().join(" ");
    }

    normalize_for_match(&upper)
}
