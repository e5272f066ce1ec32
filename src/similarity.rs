//! Similarity functions used to score term matches.
//!
//! A run is configured with a [`SimilarityKind`] name, which is resolved once
//! into a parameterised [`Similarity`] and handed to the searcher. Scoring is
//! per (term, document) pair; query-level scores are the sum over clauses.
//!
//! - BM25 (Robertson & Zaragoza): `idf · tf·(k1+1) / (tf + k1·(1 − b + b·len/avg))`
//!   with `idf = ln(1 + (N − df + 0.5)/(df + 0.5))`.
//! - Classic tf-idf: `√tf · idf² · 1/√len` with `idf = 1 + ln((N + 1)/(df + 1))`.
//! - Dirichlet-smoothed language model (Zhai & Lafferty):
//!   `ln(1 + tf/(μ·p(t|C))) + ln(μ/(len + μ))`, floored at zero.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{PrfError, Result};
use crate::index::{FieldStats, TermInfo};

/// The similarity names a run can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityKind {
    /// Okapi BM25 with k1 = 1.2, b = 0.75.
    #[default]
    Bm25,
    /// Lucene's classic tf-idf vector-space similarity.
    Classic,
    /// Query likelihood with Dirichlet smoothing, μ = 2000.
    LmDirichlet,
}

impl SimilarityKind {
    /// Resolve this name into a similarity with default parameters.
    pub fn build(self) -> Similarity {
        match self {
            SimilarityKind::Bm25 => Similarity::bm25(),
            SimilarityKind::Classic => Similarity::Classic,
            SimilarityKind::LmDirichlet => Similarity::lm_dirichlet(),
        }
    }

    /// The configuration name of this similarity.
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityKind::Bm25 => "bm25",
            SimilarityKind::Classic => "classic",
            SimilarityKind::LmDirichlet => "lm-dirichlet",
        }
    }
}

impl fmt::Display for SimilarityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityKind {
    type Err = PrfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bm25" => Ok(SimilarityKind::Bm25),
            "classic" | "tfidf" => Ok(SimilarityKind::Classic),
            "lm-dirichlet" | "lmd" | "lm_dirichlet" => Ok(SimilarityKind::LmDirichlet),
            other => Err(PrfError::config(format!("unknown similarity: {other}"))),
        }
    }
}

/// A parameterised similarity function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Similarity {
    /// Okapi BM25.
    Bm25 { k1: f32, b: f32 },
    /// Classic tf-idf.
    Classic,
    /// Dirichlet-smoothed language model.
    LmDirichlet { mu: f32 },
}

impl Default for Similarity {
    fn default() -> Self {
        Similarity::bm25()
    }
}

impl Similarity {
    /// BM25 with the usual parameters.
    pub fn bm25() -> Self {
        Similarity::Bm25 { k1: 1.2, b: 0.75 }
    }

    /// Dirichlet language model with μ = 2000.
    pub fn lm_dirichlet() -> Self {
        Similarity::LmDirichlet { mu: 2000.0 }
    }

    /// Score one occurrence record of a term in a document.
    ///
    /// `term_freq` is the term's frequency in the document field and
    /// `field_length` the number of indexed tokens in that field. The result
    /// is scaled by `boost` and is never negative.
    pub fn score(
        &self,
        boost: f32,
        term: &TermInfo,
        field: &FieldStats,
        term_freq: u32,
        field_length: u32,
    ) -> f32 {
        if term_freq == 0 || term.doc_freq == 0 || field.doc_count == 0 {
            return 0.0;
        }

        let tf = term_freq as f32;
        let len = field_length.max(1) as f32;
        let n = field.doc_count as f32;
        let df = term.doc_freq as f32;

        let raw = match *self {
            Similarity::Bm25 { k1, b } => {
                let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
                let avg = field.avg_length().max(1.0) as f32;
                let norm = k1 * (1.0 - b + b * len / avg);
                idf * (tf * (k1 + 1.0)) / (tf + norm)
            }
            Similarity::Classic => {
                let idf = 1.0 + ((n + 1.0) / (df + 1.0)).ln();
                tf.sqrt() * idf * idf / len.sqrt()
            }
            Similarity::LmDirichlet { mu } => {
                let collection_prob =
                    (term.total_term_freq as f32 + 1.0) / (field.total_tokens as f32 + 1.0);
                (1.0 + tf / (mu * collection_prob)).ln() + (mu / (len + mu)).ln()
            }
        };

        (boost * raw).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> FieldStats {
        FieldStats {
            doc_count: 1000,
            total_tokens: 100_000,
        }
    }

    fn term(doc_freq: u64) -> TermInfo {
        TermInfo {
            doc_freq,
            total_term_freq: doc_freq * 3,
        }
    }

    #[test]
    fn test_bm25_prefers_rare_terms() {
        let sim = Similarity::bm25();
        let rare = sim.score(1.0, &term(5), &field(), 2, 100);
        let common = sim.score(1.0, &term(500), &field(), 2, 100);
        assert!(rare > common);
        assert!(common > 0.0);
    }

    #[test]
    fn test_bm25_length_normalization() {
        let sim = Similarity::bm25();
        let short = sim.score(1.0, &term(50), &field(), 2, 50);
        let long = sim.score(1.0, &term(50), &field(), 2, 400);
        assert!(short > long);
    }

    #[test]
    fn test_boost_scales_score() {
        for kind in [
            SimilarityKind::Bm25,
            SimilarityKind::Classic,
            SimilarityKind::LmDirichlet,
        ] {
            let sim = kind.build();
            let base = sim.score(1.0, &term(20), &field(), 4, 80);
            let boosted = sim.score(0.5, &term(20), &field(), 4, 80);
            assert!((boosted - base * 0.5).abs() < 1e-5, "{kind}");
            assert_eq!(sim.score(0.0, &term(20), &field(), 4, 80), 0.0);
        }
    }

    #[test]
    fn test_lm_dirichlet_is_floored() {
        let sim = Similarity::lm_dirichlet();
        let score = sim.score(1.0, &term(900), &field(), 1, 5000);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_zero_statistics_score_zero() {
        let sim = Similarity::Classic;
        assert_eq!(sim.score(1.0, &term(0), &field(), 3, 10), 0.0);
        assert_eq!(sim.score(1.0, &term(3), &field(), 0, 10), 0.0);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(
            "lmd".parse::<SimilarityKind>().unwrap(),
            SimilarityKind::LmDirichlet
        );
        assert_eq!(SimilarityKind::LmDirichlet.to_string(), "lm-dirichlet");
        assert!("dfr".parse::<SimilarityKind>().is_err());
    }
}
