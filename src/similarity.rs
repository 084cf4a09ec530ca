//! Edit distance for misread codes and family names
//!
//! Inputs are short (six-character order codes, single family words), so a
//! plain dynamic-programming Levenshtein is all that is needed.

/// Levenshtein distance between two strings, counted in chars
///
/// Insertion, deletion and substitution each cost 1.
pub fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    strsim::levenshtein(a, b)
}

/// Edit distance if it does not exceed `max_distance`
///
/// Skips the full computation when the length difference alone already
/// rules the pair out.
pub fn bounded_levenshtein(a: &str, b: &str, max_distance: usize) -> Option<usize> {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a.abs_diff(len_b) > max_distance {
        return None;
    }

    let distance = levenshtein(a, b);
    (distance <= max_distance).then_some(distance)
}
