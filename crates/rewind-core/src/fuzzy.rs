//! Fuzzy title matching.
//!
//! Scores are the cosine similarity of character bigram and trigram counts
//! over the lowercased, padded title, in `[0.0, 1.0]`. An exact
//! case-insensitive match always scores `1.0`.

use std::collections::HashMap;

/// Default minimum score for a title to count as a match.
pub const DEFAULT_MIN_SCORE: f64 = 0.33;

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-' | '/'))
        .collect()
}

fn grams(normalized: &str) -> HashMap<String, usize> {
    let padded: Vec<char> = format!("-{normalized}-").chars().collect();
    let mut counts = HashMap::new();
    for size in 2..=3 {
        for window in padded.windows(size) {
            *counts.entry(window.iter().collect::<String>()).or_insert(0) += 1;
        }
    }
    counts
}

/// Similarity of `query` and `candidate`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn score(query: &str, candidate: &str) -> f64 {
    let (q, c) = (normalize(query), normalize(candidate));
    if q.is_empty() || c.is_empty() {
        return 0.0;
    }
    if q == c {
        return 1.0;
    }

    let (a, b) = (grams(&q), grams(&c));
    let dot: usize = a
        .iter()
        .filter_map(|(gram, n)| b.get(gram).map(|m| n * m))
        .sum();
    let norm = |counts: &HashMap<String, usize>| {
        (counts.values().map(|n| n * n).sum::<usize>() as f64).sqrt()
    };
    let denominator = norm(&a) * norm(&b);
    if denominator == 0.0 {
        0.0
    } else {
        dot as f64 / denominator
    }
}

/// Index and score of the best candidate scoring at least `min_score`.
/// Ties go to the earliest candidate.
pub fn best_match<'a, I>(query: &str, candidates: I, min_score: f64) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.into_iter().enumerate() {
        let s = score(query, candidate);
        if s < min_score {
            continue;
        }
        if best.is_none_or(|(_, top)| s > top) {
            best = Some((index, s));
        }
    }
    best
}
