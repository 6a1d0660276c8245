//! Column name similarity shared by drift detection and fix suggestion
//!
//! Score = max(normalized Levenshtein similarity, token Dice similarity).
//! Tokens are the snake_case words of a name, folded through a small synonym
//! lexicon, with key suffixes (`id`, `key`, ...) dropped. Detection and
//! suggestion must agree on a score, so the lexicon and threshold are fixed.

use crate::naming::to_snake_case;
use lazy_static::lazy_static;
use std::collections::{BTreeSet, HashMap};
use strsim::normalized_levenshtein;

/// Minimum similarity for a column to count as a rename candidate.
pub const RENAME_THRESHOLD: f64 = 0.6;

const KEY_TOKENS: &[&str] = &["id", "key", "code", "guid", "uuid", "sk", "pk", "fk"];

/// Synonym groups; every word folds to the first word of its group.
const SYNONYMS: &[&[&str]] = &[
    &["warehouse", "facility", "site", "depot", "plant", "dc"],
    &["location", "loc"],
    &["customer", "client", "cust"],
    &["shipment", "consignment", "shipping"],
    &["quantity", "qty"],
    &["amount", "amt"],
    &["number", "num", "nbr", "no"],
    &["description", "desc", "descr"],
    &["temperature", "temp"],
    &["status", "state"],
    &["date", "dt"],
    &["product", "item", "sku"],
];

lazy_static! {
    static ref CANONICAL: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        for group in SYNONYMS {
            for word in group.iter() {
                map.insert(*word, group[0]);
            }
        }
        map
    };
}

/// Similarity of two column names, with the number of shared tokens used
/// to order candidates that score the same.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NameScore {
    pub score: f64,
    pub shared_tokens: usize,
}

/// Canonical token set of a column name.
pub fn tokens(name: &str) -> BTreeSet<String> {
    let words: Vec<String> = to_snake_case(name)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| CANONICAL.get(w).copied().unwrap_or(w).to_string())
        .collect();

    let meaningful: BTreeSet<String> = words
        .iter()
        .filter(|w| !KEY_TOKENS.contains(&w.as_str()))
        .cloned()
        .collect();

    if meaningful.is_empty() {
        words.into_iter().collect()
    } else {
        meaningful
    }
}

pub fn edit_similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&to_snake_case(a), &to_snake_case(b))
}

pub fn score(a: &str, b: &str) -> NameScore {
    let tokens_a = tokens(a);
    let tokens_b = tokens(b);
    let shared_tokens = tokens_a.intersection(&tokens_b).count();

    let token_similarity = if tokens_a.is_empty() && tokens_b.is_empty() {
        0.0
    } else {
        2.0 * shared_tokens as f64 / (tokens_a.len() + tokens_b.len()) as f64
    };

    NameScore {
        score: edit_similarity(a, b).max(token_similarity).clamp(0.0, 1.0),
        shared_tokens,
    }
}

pub fn similarity(a: &str, b: &str) -> f64 {
    score(a, b).score
}

/// Best candidate for `target` among `candidates`, in candidate order on ties.
/// Returns the candidate index and its score when it reaches `RENAME_THRESHOLD`.
pub fn best_match<'a, I>(target: &str, candidates: I) -> Option<(usize, NameScore)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(usize, NameScore)> = None;

    for (idx, candidate) in candidates.into_iter().enumerate() {
        let current = score(target, candidate);
        let better = match &best {
            None => true,
            Some((_, b)) => {
                current.score > b.score
                    || (current.score == b.score && current.shared_tokens > b.shared_tokens)
            }
        };
        if better {
            best = Some((idx, current));
        }
    }

    best.filter(|(_, s)| s.score >= RENAME_THRESHOLD)
}
