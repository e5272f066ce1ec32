//! Boolean query implementation for combining multiple queries.

use std::any::Any;

use ahash::AHashSet;

use crate::error::Result;
use crate::index::IndexReader;
use crate::query::query::{DocScores, Query};
use crate::similarity::Similarity;

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
    /// The clause must not match (equivalent to NOT).
    MustNot,
}

impl Occur {
    fn prefix(&self) -> &'static str {
        match self {
            Occur::Must => "+",
            Occur::Should => "",
            Occur::MustNot => "-",
        }
    }
}

/// A clause in a boolean query.
#[derive(Debug, Clone)]
pub struct BooleanClause {
    /// The query for this clause.
    pub query: Box<dyn Query>,
    /// The occurrence requirement.
    pub occur: Occur,
}

impl BooleanClause {
    /// Create a new boolean clause.
    pub fn new(query: Box<dyn Query>, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }

    /// Create a MUST clause.
    pub fn must(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Must)
    }

    /// Create a SHOULD clause.
    pub fn should(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Should)
    }

    /// Create a MUST_NOT clause.
    pub fn must_not(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::MustNot)
    }
}

/// A boolean query that combines multiple queries with boolean logic.
///
/// Matching follows the usual rules: with any MUST clause a document has to
/// match all of them and SHOULD clauses only add to its score; without MUST
/// clauses at least one SHOULD clause has to match. MUST_NOT clauses remove
/// documents and never contribute to scores. A query with only MUST_NOT
/// clauses matches nothing.
#[derive(Debug, Clone)]
pub struct BooleanQuery {
    /// The clauses in this boolean query.
    clauses: Vec<BooleanClause>,
    /// The boost factor for this query.
    boost: f32,
}

impl BooleanQuery {
    /// Create a new empty boolean query.
    pub fn new() -> Self {
        BooleanQuery {
            clauses: Vec::new(),
            boost: 1.0,
        }
    }

    /// Add a clause to this boolean query.
    pub fn add_clause(&mut self, clause: BooleanClause) {
        self.clauses.push(clause);
    }

    /// Add a MUST clause.
    pub fn add_must(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::must(query));
    }

    /// Add a SHOULD clause.
    pub fn add_should(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::should(query));
    }

    /// Add a MUST_NOT clause.
    pub fn add_must_not(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::must_not(query));
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Get the clauses.
    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    /// Check if this query has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Number of clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }
}

impl Default for BooleanQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl Query for BooleanQuery {
    fn evaluate(&self, reader: &IndexReader, similarity: &Similarity) -> Result<DocScores> {
        let mut required: Option<DocScores> = None;
        let mut optional = Vec::new();
        let mut excluded = AHashSet::new();

        for clause in &self.clauses {
            let scores = clause.query.evaluate(reader, similarity)?;
            match clause.occur {
                Occur::Must => {
                    required = Some(match required {
                        None => scores,
                        Some(mut acc) => {
                            acc.retain(|doc, _| scores.contains_key(doc));
                            for (doc, score) in acc.iter_mut() {
                                *score += scores[doc];
                            }
                            acc
                        }
                    });
                }
                Occur::Should => optional.push(scores),
                Occur::MustNot => excluded.extend(scores.into_keys()),
            }
        }

        let mut result = match required {
            Some(mut acc) => {
                for scores in &optional {
                    for (doc, score) in acc.iter_mut() {
                        if let Some(extra) = scores.get(doc) {
                            *score += extra;
                        }
                    }
                }
                acc
            }
            None => {
                let mut acc = DocScores::new();
                for scores in optional {
                    for (doc, score) in scores {
                        *acc.entry(doc).or_insert(0.0) += score;
                    }
                }
                acc
            }
        };

        if !excluded.is_empty() {
            result.retain(|doc, _| !excluded.contains(doc));
        }
        if self.boost != 1.0 {
            for score in result.values_mut() {
                *score *= self.boost;
            }
        }
        Ok(result)
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        let body = self
            .clauses
            .iter()
            .map(|clause| {
                let inner = clause.query.description();
                let nested = clause.query.as_any().is::<BooleanQuery>();
                if nested {
                    format!("{}({inner})", clause.occur.prefix())
                } else {
                    format!("{}{inner}", clause.occur.prefix())
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        if self.boost == 1.0 {
            body
        } else {
            format!("({body})^{}", self.boost)
        }
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalyzerKind;
    use crate::index::{Document, IndexWriter};
    use crate::query::TermQuery;
    use tempfile::TempDir;

    fn term(t: &str) -> Box<dyn Query> {
        Box::new(TermQuery::new("text", t))
    }

    fn reader(dir: &TempDir) -> Result<IndexReader> {
        let mut writer = IndexWriter::create(dir.path(), AnalyzerKind::Whitespace)?;
        writer.add_documents(vec![
            Document::new("A").with_text("apple banana"),
            Document::new("B").with_text("apple cherry"),
            Document::new("C").with_text("banana cherry"),
            Document::new("D").with_text("durian"),
        ])?;
        writer.commit()?;
        IndexReader::open(dir.path())
    }

    fn matched(scores: &DocScores) -> Vec<u32> {
        let mut docs: Vec<u32> = scores.keys().copied().collect();
        docs.sort();
        docs
    }

    #[test]
    fn test_should_is_union() -> Result<()> {
        let dir = TempDir::new()?;
        let reader = reader(&dir)?;

        let mut query = BooleanQuery::new();
        query.add_should(term("apple"));
        query.add_should(term("durian"));

        let scores = query.evaluate(&reader, &Similarity::bm25())?;
        assert_eq!(matched(&scores), vec![0, 1, 3]);
        Ok(())
    }

    #[test]
    fn test_must_with_optional_should() -> Result<()> {
        let dir = TempDir::new()?;
        let reader = reader(&dir)?;
        let similarity = Similarity::bm25();

        let mut query = BooleanQuery::new();
        query.add_must(term("apple"));
        query.add_should(term("banana"));

        let scores = query.evaluate(&reader, &similarity)?;
        assert_eq!(matched(&scores), vec![0, 1]);
        assert!(scores[&0] > scores[&1]);
        Ok(())
    }

    #[test]
    fn test_must_not_excludes() -> Result<()> {
        let dir = TempDir::new()?;
        let reader = reader(&dir)?;

        let mut query = BooleanQuery::new();
        query.add_should(term("cherry"));
        query.add_must_not(term("apple"));
        assert_eq!(matched(&query.evaluate(&reader, &Similarity::bm25())?), vec![2]);

        let mut only_not = BooleanQuery::new();
        only_not.add_must_not(term("apple"));
        assert!(only_not.evaluate(&reader, &Similarity::bm25())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_boost_scales_all_scores() -> Result<()> {
        let dir = TempDir::new()?;
        let reader = reader(&dir)?;
        let similarity = Similarity::Classic;

        let mut plain = BooleanQuery::new();
        plain.add_should(term("banana"));
        let boosted = plain.clone().with_boost(2.0);

        let a = plain.evaluate(&reader, &similarity)?;
        let b = boosted.evaluate(&reader, &similarity)?;
        for (doc, score) in &a {
            assert!((b[doc] - score * 2.0).abs() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_description() {
        let mut inner = BooleanQuery::new();
        inner.add_should(term("a"));
        inner.add_should(term("b"));

        let mut query = BooleanQuery::new();
        query.add_must(Box::new(inner));
        query.add_must_not(term("c"));
        query.add_should(Box::new(TermQuery::new("text", "d").with_boost(0.5)));

        assert_eq!(query.description(), "+(text:a text:b) -text:c text:d^0.5");
        assert_eq!(query.len(), 3);
        assert_eq!(
            query.with_boost(3.0).description(),
            "(+(text:a text:b) -text:c text:d^0.5)^3"
        );
    }
}
