//! Word-level text similarity used by the diversity selectors
use std::collections::BTreeSet;

/// Split on anything that is not an ASCII letter or digit
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Jaccard similarity of the two word sets, in [0, 1].
///
/// Identical strings score 1.0 and an empty side scores 0.0 before any
/// tokenizing happens.
pub fn word_overlap(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let words_a: BTreeSet<&str> = tokenize(a).into_iter().collect();
    let words_b: BTreeSet<&str> = tokenize(b).into_iter().collect();
    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    words_a.intersection(&words_b).count() as f64 / union as f64
}
