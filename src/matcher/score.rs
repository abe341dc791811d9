//! Weighted string similarity on a 0-100 scale.
//!
//! Every sub-score is an indel ratio (`2 * LCS / total length`) applied to a
//! different view of the two strings: whole, best-aligned window, sorted
//! tokens, or token sets. The weighted ratio picks the most favourable view
//! and scales down the looser ones.

use std::collections::BTreeSet;

use log::debug;

use crate::error::{BotError, Result};

const UNBASE_SCALE: f64 = 0.95;
const PARTIAL_SCALE: f64 = 0.9;
const LONG_PARTIAL_SCALE: f64 = 0.6;

/// Best-scoring candidate from [`extract_one`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredMatch<'a> {
    pub index: usize,
    pub choice: &'a str,
    pub score: u8,
}

/// Replace non-alphanumeric characters with spaces, lowercase and trim.
#[must_use]
pub fn process(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0; b.len() + 1];
    let mut curr = vec![0; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[allow(clippy::cast_precision_loss)]
fn raw_ratio(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    2.0 * lcs_len(a, b) as f64 / (a.len() + b.len()) as f64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_score(value: f64) -> u8 {
    value.round_ties_even().clamp(0.0, 100.0) as u8
}

/// Plain indel similarity.
#[must_use]
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    to_score(raw_ratio(&a, &b) * 100.0)
}

/// Best similarity of the shorter string against any same-length window of the longer.
#[must_use]
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if shorter.is_empty() {
        return 0;
    }

    let mut best = 0.0_f64;
    for window in longer.windows(shorter.len()) {
        let current = raw_ratio(&shorter, window);
        if current > 0.995 {
            return 100;
        }
        best = best.max(current);
    }
    to_score(best * 100.0)
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

#[must_use]
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

#[must_use]
pub fn partial_token_sort_ratio(a: &str, b: &str) -> u8 {
    partial_ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn token_set_with(a: &str, b: &str, scorer: fn(&str, &str) -> u8) -> u8 {
    let left: BTreeSet<&str> = a.split_whitespace().collect();
    let right: BTreeSet<&str> = b.split_whitespace().collect();

    let join = |tokens: Vec<&str>| tokens.join(" ");
    let intersection = join(left.intersection(&right).copied().collect());
    let left_only = join(left.difference(&right).copied().collect());
    let right_only = join(right.difference(&left).copied().collect());

    let combined_left = format!("{intersection} {left_only}");
    let combined_right = format!("{intersection} {right_only}");
    let (intersection, combined_left, combined_right) = (
        intersection.trim(),
        combined_left.trim(),
        combined_right.trim(),
    );

    scorer(intersection, combined_left)
        .max(scorer(intersection, combined_right))
        .max(scorer(combined_left, combined_right))
}

#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    token_set_with(a, b, ratio)
}

#[must_use]
pub fn partial_token_set_ratio(a: &str, b: &str) -> u8 {
    token_set_with(a, b, partial_ratio)
}

/// Combined similarity of two strings, bounded 0-100.
///
/// Strings of similar length are compared whole and by tokens. When one is at
/// least 1.5x longer, the partial (windowed) variants are used and discounted.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let a = process(a);
    let b = process(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let base = f64::from(ratio(&a, &b));
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    let len_ratio = len_a.max(len_b) as f64 / len_a.min(len_b) as f64;

    let best = if len_ratio < 1.5 {
        let token_sort = f64::from(token_sort_ratio(&a, &b)) * UNBASE_SCALE;
        let token_set = f64::from(token_set_ratio(&a, &b)) * UNBASE_SCALE;
        base.max(token_sort).max(token_set)
    } else {
        let partial_scale = if len_ratio > 8.0 {
            LONG_PARTIAL_SCALE
        } else {
            PARTIAL_SCALE
        };
        let partial = f64::from(partial_ratio(&a, &b)) * partial_scale;
        let partial_sort =
            f64::from(partial_token_sort_ratio(&a, &b)) * UNBASE_SCALE * partial_scale;
        let partial_set =
            f64::from(partial_token_set_ratio(&a, &b)) * UNBASE_SCALE * partial_scale;
        base.max(partial).max(partial_sort).max(partial_set)
    };
    to_score(best)
}

/// Highest score [`weighted_ratio`] can give processed strings of these char lengths.
///
/// Once one side is 1.5x longer, only the partial views apply and they are
/// scaled to at most 90, while the plain ratio is capped by the length gap.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn score_ceiling(len_a: usize, len_b: usize) -> u8 {
    let (shorter, longer) = (len_a.min(len_b), len_a.max(len_b));
    if shorter == 0 {
        return 0;
    }

    let len_ratio = longer as f64 / shorter as f64;
    if len_ratio < 1.5 {
        return 100;
    }
    let partial_scale = if len_ratio > 8.0 {
        LONG_PARTIAL_SCALE
    } else {
        PARTIAL_SCALE
    };
    let base_ceiling = 200.0 * shorter as f64 / (shorter + longer) as f64;
    to_score(base_ceiling.max(100.0 * partial_scale))
}

/// Score every choice against `query` and return the best one.
///
/// Ties keep the earliest choice. Returns `Ok(None)` when there are no choices.
///
/// # Errors
///
/// Returns [`BotError::FuzzyMatch`] when the query has nothing left to compare
/// after processing (only punctuation, symbols or whitespace).
pub fn extract_one<'a, I>(query: &str, choices: I) -> Result<Option<ScoredMatch<'a>>>
where
    I: IntoIterator<Item = &'a str>,
{
    scan(query, choices, None)
}

/// Like [`extract_one`], but only returns a choice scoring strictly above `cutoff`.
///
/// Choices whose length alone keeps them at or below `cutoff` are never scored,
/// so a long query costs nothing against short keywords.
///
/// # Errors
///
/// Returns [`BotError::FuzzyMatch`] when the query has nothing left to compare
/// after processing.
pub fn extract_one_above<'a, I>(
    query: &str,
    choices: I,
    cutoff: u8,
) -> Result<Option<ScoredMatch<'a>>>
where
    I: IntoIterator<Item = &'a str>,
{
    Ok(scan(query, choices, Some(cutoff))?.filter(|best| best.score > cutoff))
}

fn scan<'a, I>(query: &str, choices: I, cutoff: Option<u8>) -> Result<Option<ScoredMatch<'a>>>
where
    I: IntoIterator<Item = &'a str>,
{
    let processed = process(query);
    if processed.is_empty() {
        return Err(BotError::FuzzyMatch(format!(
            "query {query:?} is empty after processing"
        )));
    }
    let query_len = processed.chars().count();

    let mut best: Option<ScoredMatch<'a>> = None;
    for (index, choice) in choices.into_iter().enumerate() {
        if let Some(cutoff) = cutoff
            && score_ceiling(query_len, process(choice).chars().count()) <= cutoff
        {
            continue;
        }

        let score = weighted_ratio(&processed, choice);
        let is_better = best
            .as_ref()
            .is_none_or(|current| score > current.score);

        if is_better {
            debug!("New best match: {choice} (score: {score})");
            best = Some(ScoredMatch {
                index,
                choice,
                score,
            });
        }
    }

    Ok(best)
}
