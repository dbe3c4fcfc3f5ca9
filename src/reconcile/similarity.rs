//! String similarity primitive for record matching.
//!
//! Jaro-Winkler over normalized text. Scores are always in [0, 1]; identical
//! inputs score exactly 1 and a single empty side scores 0.

/// Winkler prefix weight.
const PREFIX_WEIGHT: f64 = 0.1;

/// Maximum shared-prefix length that earns a bonus.
const PREFIX_LIMIT: usize = 4;

/// Normalize text for comparison: lowercase, non-alphanumeric characters
/// replaced with spaces, whitespace runs collapsed, trimmed.
pub fn normalize(input: &str) -> String {
    let replaced: String = input
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaro-Winkler similarity between two strings, in [0, 1].
///
/// Characters match within a window of half the longer string's length minus
/// one. Up to four shared leading characters add a bonus scaled by the
/// unmatched portion of the base score.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let s1: Vec<char> = normalize(a).chars().collect();
    let s2: Vec<char> = normalize(b).chars().collect();
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }

    // The window is fractional for odd lengths; bounds are resolved the same
    // way integer loop indices resolve against a fractional limit.
    let window = s1.len().max(s2.len()) as f64 / 2.0 - 1.0;

    let mut s1_matched = vec![false; s1.len()];
    let mut s2_matched = vec![false; s2.len()];
    let mut matches = 0usize;

    for i in 0..s1.len() {
        let start = (i as f64 - window).floor().max(0.0) as usize;
        let end = (i as f64 + window + 1.0).min(s2.len() as f64);
        let mut j = start;
        while (j as f64) < end {
            if !s2_matched[j] && s1[i] == s2[j] {
                s1_matched[i] = true;
                s2_matched[j] = true;
                matches += 1;
                break;
            }
            j += 1;
        }
    }

    if matches == 0 {
        return 0.0;
    }

    // Half-transpositions: matched characters out of order between the sides.
    let mut half_transpositions = 0usize;
    let mut k = 0usize;
    for i in 0..s1.len() {
        if !s1_matched[i] {
            continue;
        }
        while !s2_matched[k] {
            k += 1;
        }
        if s1[i] != s2[k] {
            half_transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let t = half_transpositions as f64 / 2.0;
    let jaro = (m / s1.len() as f64 + m / s2.len() as f64 + (m - t) / m) / 3.0;

    let mut prefix = 0usize;
    for i in 0..PREFIX_LIMIT.min(s1.len()).min(s2.len()) {
        if s1[i] == s2[i] {
            prefix += 1;
        } else {
            break;
        }
    }

    jaro + prefix as f64 * PREFIX_WEIGHT * (1.0 - jaro)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(jaro_winkler("Google", "Google"), 1.0);
        assert_eq!(jaro_winkler("", ""), 1.0);
        assert_eq!(jaro_winkler("Software Engineer", "Software Engineer"), 1.0);
    }

    #[test]
    fn empty_against_nonempty_scores_zero() {
        assert_eq!(jaro_winkler("", "Google"), 0.0);
        assert_eq!(jaro_winkler("Google", ""), 0.0);
    }

    #[test]
    fn symmetric() {
        let ab = jaro_winkler("Google Inc.", "Google");
        let ba = jaro_winkler("Google", "Google Inc.");
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let pairs = [
            ("Google", "Meta"),
            ("Software Engineer", "Product Manager"),
            ("Acme Corp", "Acme Corporation"),
            ("a", "b"),
            ("martha", "marhta"),
        ];
        for (a, b) in pairs {
            let s = jaro_winkler(a, b);
            assert!((0.0..=1.0).contains(&s), "{a} vs {b} scored {s}");
        }
    }

    #[test]
    fn normalized_equivalents_score_one() {
        // Punctuation and case differences vanish under normalization.
        let s = jaro_winkler("Google, Inc", "google inc");
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn close_variants_score_high() {
        assert!(jaro_winkler("Google Inc.", "Google") > 0.85);
        assert!(jaro_winkler("Acme Corp", "Acme Corporation") > 0.85);
    }

    #[test]
    fn unrelated_strings_score_low() {
        assert!(jaro_winkler("Google", "Meta") < 0.6);
    }

    #[test]
    fn prefix_bonus_favors_shared_lead() {
        // Same edit distance shape, but one pair shares a 4-char prefix.
        let with_prefix = jaro_winkler("stripe", "stride");
        let without = jaro_winkler("estrip", "edirts");
        assert!(with_prefix > without);
    }

    #[test]
    fn punctuation_only_strings() {
        assert_eq!(jaro_winkler("!!!", "???"), 0.0);
        assert_eq!(jaro_winkler("!!!", "!!!"), 1.0);
    }

    #[test]
    fn normalize_collapses_and_trims() {
        assert_eq!(normalize("  Google,   Inc.  "), "google inc");
        assert_eq!(normalize("Sr. Software-Engineer"), "sr software engineer");
        assert_eq!(normalize("???"), "");
    }
}
