//! Retrieval over an open index.
//!
//! The query expansion core talks to the index only through the
//! [`RetrievalEngine`] and [`TermStatistics`] traits; [`IndexSearcher`] is
//! the implementation backed by an [`IndexReader`](crate::index::IndexReader).

pub mod searcher;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::Query;

pub use searcher::IndexSearcher;

/// A search hit: the matched document and its score.
///
/// `doc` is the engine's handle for the document and is what stored fields
/// are fetched by; `doc_id` is the external id written to results. Two
/// documents may share a `doc_id` but never a `doc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// The internal document number.
    pub doc: u32,
    /// The external document id (`docno`).
    pub doc_id: String,
    /// The relevance score.
    pub score: f32,
}

impl Hit {
    /// Create a new hit.
    pub fn new<S: Into<String>>(doc: u32, doc_id: S, score: f32) -> Self {
        Hit {
            doc,
            doc_id: doc_id.into(),
            score,
        }
    }
}

/// Sort hits by score descending, then by document id ascending, then by
/// document number.
pub fn sort_hits(hits: &mut [Hit]) {
    hits.sort_unstable_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
            .then_with(|| a.doc.cmp(&b.doc))
    });
}

/// Collection statistics needed to weight expansion terms.
pub trait TermStatistics: Send + Sync {
    /// Number of documents whose `field` contains `term`.
    fn doc_freq(&self, field: &str, term: &str) -> Result<u64>;

    /// Number of documents with a non-empty `field`.
    fn doc_count(&self, field: &str) -> Result<u64>;
}

/// The retrieval capabilities used by query expansion.
pub trait RetrievalEngine: Send + Sync {
    /// Parse query text (already escaped) over the configured search fields.
    fn parse_query(&self, text: &str) -> Result<Box<dyn Query>>;

    /// Run `query` and return at most `limit` hits, best first.
    fn search(&self, query: &dyn Query, limit: usize) -> Result<Vec<Hit>>;

    /// The stored value of `field` for the document with handle `doc`.
    fn stored_field(&self, doc: u32, field: &str) -> Result<Option<String>>;

    /// Split `text` into terms with the query-stage analyzer.
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_hits_breaks_ties_by_doc_id() {
        let mut hits = vec![
            Hit::new(3, "B", 1.0),
            Hit::new(0, "C", 2.0),
            Hit::new(2, "A", 1.0),
            Hit::new(1, "B", 1.0),
        ];
        sort_hits(&mut hits);

        let ids: Vec<(&str, u32)> = hits.iter().map(|h| (h.doc_id.as_str(), h.doc)).collect();
        assert_eq!(ids, vec![("C", 0), ("A", 2), ("B", 1), ("B", 3)]);
    }
}
