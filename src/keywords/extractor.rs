// Frequency-based keyword extraction over result titles.
//
// Deliberately simple: lowercase, strip punctuation, drop noise words and
// short tokens, then count. Identical titles always produce identical output,
// including tie order, so results are stable across runs and easy to test.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::stoplist;
use crate::result::KeywordCount;

/// Number of keywords returned for the common result shape.
pub const DEFAULT_TOP_N: usize = 5;

/// Number of keywords returned for the legacy single-backend shape.
pub const LEGACY_TOP_N: usize = 10;

/// Counts meaningful words across a pool of titles.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    stop_words: HashSet<String>,
    /// Tokens shorter than this are dropped.
    min_len: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(stoplist::default_stop_words())
    }
}

impl KeywordExtractor {
    /// Create an extractor with exactly the given stop words.
    pub fn new<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stop_words: stop_words.into_iter().map(|w| w.into().to_lowercase()).collect(),
            min_len: 3,
        }
    }

    /// Add extra noise words on top of the current set.
    pub fn with_stop_words<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words
            .extend(extra.into_iter().map(|w| w.into().to_lowercase()));
        self
    }

    /// Merge the full English stop-word list from the `stop-words` crate.
    pub fn with_english_stop_words(self) -> Self {
        self.with_stop_words(stop_words::get(stop_words::LANGUAGE::English))
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Return the `top_n` most frequent meaningful words across `titles`.
    ///
    /// Sorted by descending count; ties keep the order in which each word
    /// first appeared in the token stream. Empty input yields an empty list.
    pub fn extract<S: AsRef<str>>(&self, titles: &[S], top_n: usize) -> Vec<KeywordCount> {
        if titles.is_empty() || top_n == 0 {
            return Vec::new();
        }

        let joined = titles
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(" ")
            .to_lowercase();
        let cleaned = strip_symbols(&joined);

        // Insertion-ordered counts: position in `counts` is first appearance.
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<(&str, u32)> = Vec::new();

        for token in cleaned.split_whitespace() {
            if token.len() < self.min_len || self.is_stop_word(token) {
                continue;
            }
            match index.get(token) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(token, counts.len());
                    counts.push((token, 1));
                }
            }
        }

        // Stable sort keeps first-appearance order among equal counts.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(top_n);

        debug!(
            titles = titles.len(),
            distinct = index.len(),
            returned = counts.len(),
            "Extracted title keywords"
        );

        counts
            .into_iter()
            .map(|(word, count)| KeywordCount {
                word: word.to_string(),
                count,
            })
            .collect()
    }
}

/// Remove everything except ASCII letters, digits and whitespace. Removed,
/// not replaced, so "Charmander's" becomes "charmanders". Any Unicode space
/// (NBSP, thin space) still separates words.
fn strip_symbols(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect()
}
