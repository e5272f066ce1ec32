//! Stop filter implementation.
//!
//! Removes common words that carry little ranking signal. Three word lists
//! ship with the crate: Lucene's classic English list, and the extended lists
//! the TREC runs use at index and query time (the query list additionally
//! drops "also", which is frequent in topic descriptions).
//!
//! # Examples
//!
//! ```
//! use prf_rank::analysis::token_filter::Filter;
//! use prf_rank::analysis::token_filter::stop::StopFilter;
//! use prf_rank::analysis::token::Token;
//!
//! let filter = StopFilter::new();
//! let tokens = vec![Token::new("the", 0), Token::new("satellite", 1)];
//!
//! let result: Vec<_> = filter.filter(Box::new(tokens.into_iter()))
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(result.len(), 1);
//! assert_eq!(result[0].text, "satellite");
//! ```

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Default English stop words list.
const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Extended list used when indexing TREC collections.
const TREC_INDEX_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "aren't", "as", "at", "be", "but", "by", "can", "can't", "does",
    "how", "for", "if", "in", "into", "is", "it", "have", "haven't", "why", "has", "no", "not",
    "of", "on", "or", "such", "under", "over", "out", "that", "the", "their", "then", "them",
    "there", "these", "they", "this", "to", "too", "what", "was", "will", "with", "where",
];

/// Default English stop words as a HashSet.
pub static DEFAULT_ENGLISH_STOP_WORDS_SET: LazyLock<HashSet<String>> =
    LazyLock::new(|| to_set(DEFAULT_ENGLISH_STOP_WORDS.iter().copied()));

/// Stop words applied to documents at index time.
pub static TREC_INDEX_STOP_WORDS_SET: LazyLock<HashSet<String>> =
    LazyLock::new(|| to_set(TREC_INDEX_STOP_WORDS.iter().copied()));

/// Stop words applied to topics and feedback documents at query time.
pub static TREC_QUERY_STOP_WORDS_SET: LazyLock<HashSet<String>> = LazyLock::new(|| {
    to_set(
        TREC_INDEX_STOP_WORDS
            .iter()
            .copied()
            .chain(std::iter::once("also")),
    )
});

fn to_set<'a>(words: impl Iterator<Item = &'a str>) -> HashSet<String> {
    words.map(str::to_string).collect()
}

/// A filter that removes stop words from the token stream.
///
/// Matching is exact, so the filter belongs after [`LowercaseFilter`]
/// in a pipeline.
///
/// [`LowercaseFilter`]: crate::analysis::token_filter::LowercaseFilter
#[derive(Clone, Debug)]
pub struct StopFilter {
    /// The set of stop words to remove
    stop_words: Arc<HashSet<String>>,
}

impl StopFilter {
    /// Create a new stop filter with the default English stop words.
    pub fn new() -> Self {
        Self::with_stop_words(DEFAULT_ENGLISH_STOP_WORDS_SET.clone())
    }

    /// Create a new stop filter with custom stop words.
    pub fn with_stop_words(stop_words: HashSet<String>) -> Self {
        StopFilter {
            stop_words: Arc::new(stop_words),
        }
    }

    /// Create a new stop filter from a list of stop words.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stop_words = words.into_iter().map(|s| s.into()).collect();
        Self::with_stop_words(stop_words)
    }

    /// Check if a word is a stop word.
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Get the number of stop words.
    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    /// Check if the stop word set is empty.
    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }
}

impl Default for StopFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let filtered_tokens: Vec<Token> = tokens
            .filter(|token| !self.is_stop_word(&token.text))
            .collect();

        Ok(Box::new(filtered_tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_filter() {
        let filter = StopFilter::from_words(vec!["the", "and", "or"]);
        let tokens = vec![
            Token::new("hello", 0),
            Token::new("the", 1),
            Token::new("world", 2),
            Token::new("and", 3),
            Token::new("test", 4),
        ];

        let result: Vec<Token> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].text, "hello");
        assert_eq!(result[1].text, "world");
        assert_eq!(result[2].text, "test");
        // Positions are not renumbered.
        assert_eq!(result[2].position, 4);
    }

    #[test]
    fn test_trec_lists() {
        assert!(TREC_INDEX_STOP_WORDS_SET.contains("haven't"));
        assert!(!TREC_INDEX_STOP_WORDS_SET.contains("also"));
        assert!(TREC_QUERY_STOP_WORDS_SET.contains("also"));
        assert_eq!(
            TREC_QUERY_STOP_WORDS_SET.len(),
            TREC_INDEX_STOP_WORDS_SET.len() + 1
        );
    }

    #[test]
    fn test_filter_name() {
        assert_eq!(StopFilter::new().name(), "stop");
    }
}
