//! Feedback term weighting.
//!
//! Terms mined from first-pass documents are weighted with a sublinear tf
//! and a base-10 idf (Singhal, "Modern Information Retrieval: A Brief
//! Overview"):
//!
//! ```text
//! tf     = 1 + ln(1 + ln(count))
//! idf    = log10((N + 1) / df)
//! weight = tf × idf
//! ```
//!
//! where `count` is the term's frequency in the pooled feedback tokens, `N`
//! the number of documents with the field and `df` the number containing the
//! term.

use std::sync::Arc;

use log::warn;

use crate::error::Result;
use crate::search::TermStatistics;

/// Weight of a feedback term.
///
/// Returns 0 when the term occurs in no document or not at all in the
/// feedback pool, and is never negative.
///
/// ```
/// use prf_rank::expansion::term_weight;
///
/// let weight = term_weight(6, 1000, 50);
/// assert!((weight - 2.637).abs() < 1e-3);
/// assert_eq!(term_weight(6, 1000, 0), 0.0);
/// ```
pub fn term_weight(
    occurrence_count: u64,
    total_collection_docs: u64,
    docs_containing_term: u64,
) -> f64 {
    if docs_containing_term == 0 || occurrence_count == 0 {
        return 0.0;
    }

    let tf = 1.0 + (1.0 + (occurrence_count as f64).ln()).ln();
    let idf = ((total_collection_docs as f64 + 1.0) / docs_containing_term as f64).log10();
    (tf * idf).max(0.0)
}

/// Weights terms of one field against live collection statistics.
#[derive(Clone)]
pub struct TermWeighter {
    statistics: Arc<dyn TermStatistics>,
    field: String,
}

impl std::fmt::Debug for TermWeighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermWeighter")
            .field("field", &self.field)
            .finish()
    }
}

impl TermWeighter {
    /// Create a weighter for terms of `field`.
    pub fn new<S: Into<String>>(statistics: Arc<dyn TermStatistics>, field: S) -> Self {
        TermWeighter {
            statistics,
            field: field.into(),
        }
    }

    /// The weighted field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Number of documents with the field.
    pub fn collection_size(&self) -> Result<u64> {
        self.statistics.doc_count(&self.field)
    }

    /// Weight `term` seen `occurrence_count` times in the feedback pool.
    ///
    /// A failed statistics lookup is logged and weighs 0, which drops the
    /// term from expansion.
    pub fn weight(&self, term: &str, occurrence_count: u64, total_collection_docs: u64) -> f64 {
        match self.statistics.doc_freq(&self.field, term) {
            Ok(doc_freq) => term_weight(occurrence_count, total_collection_docs, doc_freq),
            Err(e) => {
                warn!("no statistics for {}:{term}: {e}", self.field);
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrfError;
    use ahash::AHashMap;

    #[test]
    fn test_satellite_example() {
        let n: f64 = 1000.0;
        let idf = ((n + 1.0) / 50.0).log10();
        let tf = 1.0 + (1.0 + 6f64.ln()).ln();
        assert!((idf - 1.3011).abs() < 1e-3);
        assert!((tf - 2.0268).abs() < 1e-3);

        let weight = term_weight(6, 1000, 50);
        assert!((weight - 2.637).abs() < 1e-3);
        assert!((weight - tf * idf).abs() < 1e-12);
    }

    #[test]
    fn test_zero_cases() {
        assert_eq!(term_weight(6, 1000, 0), 0.0);
        assert_eq!(term_weight(0, 1000, 50), 0.0);
        assert_eq!(term_weight(0, 0, 0), 0.0);
    }

    #[test]
    fn test_single_occurrence_is_pure_idf() {
        let weight = term_weight(1, 99, 10);
        assert!((weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weight_is_never_negative() {
        for count in [1, 2, 5, 100, 10_000] {
            for df in [1, 10, 500, 1001, 5000] {
                assert!(term_weight(count, 1000, df) >= 0.0, "{count} {df}");
            }
        }
        assert_eq!(term_weight(3, 1000, 1001), 0.0);
    }

    #[test]
    fn test_weight_grows_with_count_and_rarity() {
        assert!(term_weight(10, 1000, 50) > term_weight(2, 1000, 50));
        assert!(term_weight(3, 1000, 5) > term_weight(3, 1000, 500));
    }

    struct FixedStatistics(AHashMap<String, u64>);

    impl TermStatistics for FixedStatistics {
        fn doc_freq(&self, _field: &str, term: &str) -> Result<u64> {
            self.0
                .get(term)
                .copied()
                .ok_or_else(|| PrfError::statistics(format!("lookup failed for {term}")))
        }

        fn doc_count(&self, _field: &str) -> Result<u64> {
            Ok(1000)
        }
    }

    #[test]
    fn test_weighter_logs_and_zeroes_failures() {
        let mut dfs = AHashMap::new();
        dfs.insert("satellit".to_string(), 50);
        let weighter = TermWeighter::new(Arc::new(FixedStatistics(dfs)), "text");

        let n = weighter.collection_size().unwrap();
        assert_eq!(n, 1000);
        assert!((weighter.weight("satellit", 6, n) - 2.637).abs() < 1e-3);
        assert_eq!(weighter.weight("unknown", 6, n), 0.0);
        assert_eq!(weighter.field(), "text");
    }
}
