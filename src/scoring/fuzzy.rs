//! Fuzzy string matching.
//!
//! Scores are a fixed blend of four edit-distance signals so that values
//! computed on different runs stay comparable:
//!
//! | signal                      | weight |
//! |-----------------------------|--------|
//! | whole-string ratio          | 0.30   |
//! | best partial (substring)    | 0.20   |
//! | token-sorted ratio          | 0.25   |
//! | token-set ratio             | 0.25   |

use std::collections::BTreeSet;

const RATIO_WEIGHT: f64 = 0.30;
const PARTIAL_WEIGHT: f64 = 0.20;
const TOKEN_SORT_WEIGHT: f64 = 0.25;
const TOKEN_SET_WEIGHT: f64 = 0.25;

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Similarity of two strings in [0, 1]. Empty input on either side scores 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let score = ratio(&a, &b) * RATIO_WEIGHT
        + partial_ratio(&a, &b) * PARTIAL_WEIGHT
        + token_sort_ratio(&a, &b) * TOKEN_SORT_WEIGHT
        + token_set_ratio(&a, &b) * TOKEN_SET_WEIGHT;
    score.clamp(0.0, 1.0)
}

/// Returns `(score >= threshold, score)`.
pub fn is_match(a: &str, b: &str, threshold: f64) -> (bool, f64) {
    let score = similarity(a, b);
    if score == 0.0 {
        return (false, 0.0);
    }
    (score >= threshold, score)
}

/// Pick the candidate with the highest token-set similarity to `query`.
///
/// Ties keep the earliest candidate. Returns `None` when nothing reaches
/// `threshold`.
pub fn best_match<'a, S: AsRef<str>>(
    query: &str,
    candidates: &'a [S],
    threshold: f64,
) -> Option<(&'a str, f64)> {
    let query = normalize(query);
    if query.is_empty() {
        return None;
    }

    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let candidate = candidate.as_ref();
        let normalized = normalize(candidate);
        if normalized.is_empty() {
            continue;
        }
        let score = token_set_ratio(&query, &normalized);
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((candidate, score));
        }
    }

    best.filter(|(_, score)| *score >= threshold)
}

/// Whole-string edit similarity
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Best edit similarity of the shorter string against every equally long
/// window of the longer one
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long): (Vec<char>, Vec<char>) = {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        if a.len() <= b.len() {
            (a, b)
        } else {
            (b, a)
        }
    };
    if short.is_empty() {
        return 0.0;
    }

    let short: String = short.into_iter().collect();
    let window = short.chars().count();
    let mut best = 0.0_f64;
    for start in 0..=(long.len() - window) {
        let candidate: String = long[start..start + window].iter().collect();
        let score = strsim::normalized_levenshtein(&short, &candidate);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

/// Edit similarity after sorting whitespace-separated tokens
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Similarity of the shared token set against each side's full token set
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    // One side's tokens are a subset of the other's
    if !intersection.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 1.0;
    }

    let sect = intersection.join(" ");
    let combined_a = join_nonempty(&sect, &only_a.join(" "));
    let combined_b = join_nonempty(&sect, &only_b.join(" "));

    let mut best = ratio(&combined_a, &combined_b);
    if !sect.is_empty() {
        best = best
            .max(ratio(&sect, &combined_a))
            .max(ratio(&sect, &combined_b));
    }
    best
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{} {}", a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_score_one() {
        assert_eq!(similarity("John Smith", "John Smith"), 1.0);
        assert_eq!(similarity("  JOHN smith ", "john SMITH"), 1.0);
    }

    #[test]
    fn test_empty_side_scores_zero() {
        assert_eq!(similarity("", "x"), 0.0);
        assert_eq!(similarity("x", "   "), 0.0);
        assert_eq!(is_match("", "John", 0.0), (false, 0.0));
    }

    #[test]
    fn test_reordered_tokens_score_high() {
        let score = similarity("Smith John", "John Smith");
        assert!(score >= 0.5, "score was {}", score);
        assert_eq!(token_sort_ratio("smith john", "john smith"), 1.0);
    }

    #[test]
    fn test_unrelated_strings_score_low() {
        let score = similarity("John Smith", "Pediatric Associates of Ohio");
        assert!(score < 0.5, "score was {}", score);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let pairs = [
            ("a", "b"),
            ("123 Main St", "123 Main Street New York NY"),
            ("Dr. Jane Doe MD", "Jane Doe"),
            ("x", "xxxxxxxxxxxxxxxxxxxx"),
        ];
        for (a, b) in pairs {
            let score = similarity(a, b);
            assert!((0.0..=1.0).contains(&score), "{} vs {} = {}", a, b, score);
        }
    }

    #[test]
    fn test_partial_ratio_finds_substring() {
        assert_eq!(partial_ratio("main st", "123 main st new york"), 1.0);
    }

    #[test]
    fn test_token_set_subset_is_full_match() {
        assert_eq!(token_set_ratio("jane doe", "dr jane doe md"), 1.0);
        assert_eq!(token_set_ratio("", "jane"), 0.0);
    }

    #[test]
    fn test_is_match_respects_threshold() {
        let (matched, score) = is_match("212-555-1234", "2125551234", 0.99);
        assert!(!matched);
        assert!(score > 0.0);

        let (matched, score) = is_match("Cardiology", "cardiology", 0.85);
        assert!(matched);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_best_match_picks_highest_token_set_score() {
        let candidates = ["Pediatrics", "Cardiology Associates", "Dermatology"];
        let (best, score) = best_match("cardiology", &candidates, 0.7).unwrap();
        assert_eq!(best, "Cardiology Associates");
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_best_match_below_threshold_is_none() {
        let candidates = vec!["Orthopedics".to_string(), "Dermatology".to_string()];
        assert!(best_match("cardiology", &candidates, 0.9).is_none());
        assert!(best_match("", &candidates, 0.0).is_none());
        let empty: Vec<String> = Vec::new();
        assert!(best_match("cardiology", &empty, 0.0).is_none());
    }
}
