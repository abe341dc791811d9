//! Exact-then-fuzzy keyword matching for inbound messages.

mod score;

use std::sync::Arc;

use log::{debug, error};

use crate::registry::{KeywordEntry, KeywordRegistry, normalize_keyword};

pub use score::{ScoredMatch, extract_one, extract_one_above, score_ceiling, weighted_ratio};

/// Fuzzy scores must be strictly above this to count as a hit.
pub const FUZZY_THRESHOLD: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Fuzzy { score: u8 },
}

/// A registry entry selected for an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordMatch<'a> {
    pub keyword: &'a str,
    pub reply: &'a str,
    pub kind: MatchKind,
}

impl<'a> KeywordMatch<'a> {
    fn new(entry: &'a KeywordEntry, kind: MatchKind) -> Self {
        Self {
            keyword: &entry.keyword,
            reply: &entry.reply,
            kind,
        }
    }
}

// Hand-edited files can carry blank replies; Discord rejects empty messages.
fn has_reply(entry: &KeywordEntry) -> bool {
    !entry.reply.trim().is_empty()
}

/// Find the reply for `message`, if any.
///
/// An exact hit on the normalized message always wins. Otherwise the single
/// best fuzzy candidate is accepted only when it scores above [`FUZZY_THRESHOLD`].
/// Entries with a blank reply never match. Scoring failures are logged and
/// count as no match.
#[must_use]
pub fn find_reply<'a>(message: &str, registry: &'a KeywordRegistry) -> Option<KeywordMatch<'a>> {
    let normalized = normalize_keyword(message);

    if let Some(entry) = registry.entry(&normalized)
        && has_reply(entry)
    {
        return Some(KeywordMatch::new(entry, MatchKind::Exact));
    }

    if registry.is_empty() {
        return None;
    }

    let best = match extract_one_above(&normalized, registry.keywords(), FUZZY_THRESHOLD) {
        Ok(Some(best)) => best,
        Ok(None) => {
            debug!("Keyword match: no candidate above {FUZZY_THRESHOLD}");
            return None;
        }
        Err(e) => {
            debug!("Keyword match skipped: {e}");
            return None;
        }
    };

    registry
        .entry(best.choice)
        .filter(|entry| has_reply(entry))
        .map(|entry| KeywordMatch::new(entry, MatchKind::Fuzzy { score: best.score }))
}

/// Reply text for `message`, if any.
#[must_use]
pub fn match_reply(message: &str, registry: &KeywordRegistry) -> Option<String> {
    find_reply(message, registry).map(|found| {
        debug!("Keyword '{}' matched ({:?})", found.keyword, found.kind);
        found.reply.to_string()
    })
}

/// [`match_reply`] on tokio's blocking pool, against a registry snapshot.
///
/// Fuzzy scoring is CPU-bound and must not run on an async worker.
pub async fn match_reply_blocking(message: String, registry: Arc<KeywordRegistry>) -> Option<String> {
    match tokio::task::spawn_blocking(move || match_reply(&message, &registry)).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("Keyword match task failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::registry::{KeywordStore, load};

    fn registry(entries: &[(&str, &str)]) -> (tempfile::TempDir, KeywordStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = KeywordStore::open(dir.path().join("keyword_reply_config.json"));
        for (keyword, reply) in entries {
            store.put(keyword, *reply).unwrap();
        }
        (dir, store)
    }

    #[test]
    fn exact_match_after_normalization() {
        let (_dir, store) = registry(&[("hello", "hi there")]);
        assert_eq!(
            match_reply("  Hello ", store.registry()),
            Some("hi there".to_string())
        );
        assert_eq!(
            find_reply("HELLO", store.registry()).map(|m| m.kind),
            Some(MatchKind::Exact)
        );
    }

    #[test]
    fn exact_match_beats_better_fuzzy_neighbor() {
        // "apple!" is inserted first and scores 100 against "apple" under fuzzy scoring.
        let (_dir, store) = registry(&[("apple!", "punctuated"), ("apple", "plain")]);
        let found = find_reply("apple", store.registry()).unwrap();
        assert_eq!(found.reply, "plain");
        assert_eq!(found.kind, MatchKind::Exact);
    }

    #[test]
    fn fuzzy_match_above_threshold() {
        let (_dir, store) = registry(&[("weather", "it's sunny")]);
        let found = find_reply("weathr", store.registry()).unwrap();
        assert_eq!(found.reply, "it's sunny");
        assert_eq!(found.kind, MatchKind::Fuzzy { score: 92 });
    }

    #[test]
    fn unrelated_message_does_not_match() {
        let (_dir, store) = registry(&[("weather", "it's sunny")]);
        assert_eq!(match_reply("xyz", store.registry()), None);
    }

    #[test]
    fn threshold_is_strict() {
        let (_dir, ten) = registry(&[("abcdefghij", "ten")]);
        // Scores exactly 90.
        assert_eq!(match_reply("abcdefghix", ten.registry()), None);

        let (_dir, eleven) = registry(&[("abcdefghijk", "eleven")]);
        // Scores 91.
        assert_eq!(
            match_reply("abcdefghijx", eleven.registry()),
            Some("eleven".to_string())
        );
    }

    #[test]
    fn empty_registry_and_empty_message_never_match() {
        let (_dir, empty) = registry(&[]);
        assert_eq!(match_reply("hello", empty.registry()), None);

        let (_dir, store) = registry(&[("hello", "hi")]);
        assert_eq!(match_reply("   ", store.registry()), None);
        assert_eq!(match_reply("!!!", store.registry()), None);
    }

    #[test]
    fn matching_is_idempotent() {
        let (_dir, store) = registry(&[("weather", "it's sunny"), ("hello", "hi")]);
        let first = match_reply("weathr", store.registry());
        for _ in 0..5 {
            assert_eq!(match_reply("weathr", store.registry()), first);
        }
    }

    #[test]
    fn deleted_keyword_stops_matching() {
        let (_dir, mut store) = registry(&[("hello", "hi")]);
        store.remove("hello").unwrap();
        assert_eq!(match_reply("hello", store.registry()), None);
        assert_eq!(store.list().count(), 0);
    }

    #[test]
    fn non_ascii_keywords_match() {
        let (_dir, store) = registry(&[("今天天气怎么样", "晴天")]);
        assert_eq!(
            match_reply("今天天气怎么样", store.registry()),
            Some("晴天".to_string())
        );
        assert_eq!(match_reply("今天天气怎么样？", store.registry()), Some("晴天".to_string()));
    }

    #[test]
    fn blank_stored_reply_never_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyword_reply_config.json");
        std::fs::write(&path, r#"{"hello": "", "weather": "   ", "rules": "be nice"}"#).unwrap();
        let registry = load(&path);
        assert_eq!(registry.len(), 3);

        assert_eq!(match_reply("hello", &registry), None);
        assert_eq!(match_reply("weathr", &registry), None);
        assert_eq!(match_reply("rules", &registry), Some("be nice".to_string()));
    }

    #[test]
    fn long_message_against_many_keywords_stays_cheap() {
        let keywords: Vec<String> = (0..30)
            .map(|i| format!("frequently asked question number {i} about rules"))
            .collect();
        let entries: Vec<(&str, &str)> = keywords.iter().map(|k| (k.as_str(), "see #faq")).collect();
        let (_dir, store) = registry(&entries);

        let message = "rules and questions ".repeat(100);
        assert_eq!(message.chars().count(), 2000);

        let started = Instant::now();
        assert_eq!(match_reply(&message, store.registry()), None);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn blocking_match_uses_the_snapshot() {
        let (_dir, mut store) = registry(&[("weather", "it's sunny")]);
        let snapshot = store.snapshot();
        store.remove("weather").unwrap();

        assert_eq!(
            match_reply_blocking("weathr".to_string(), snapshot).await,
            Some("it's sunny".to_string())
        );
        assert_eq!(
            match_reply_blocking("weathr".to_string(), store.snapshot()).await,
            None
        );
    }
}
