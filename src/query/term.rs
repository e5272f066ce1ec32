//! Term query implementation for exact term matching.

use std::any::Any;

use crate::error::Result;
use crate::index::IndexReader;
use crate::query::query::{DocScores, Query, boost_suffix};
use crate::similarity::Similarity;

/// A query that matches documents containing a specific term.
#[derive(Debug, Clone, PartialEq)]
pub struct TermQuery {
    /// The field to search in.
    field: String,
    /// The term to search for.
    term: String,
    /// The boost factor for this query.
    boost: f32,
}

impl TermQuery {
    /// Create a new term query.
    ///
    /// The term is matched exactly and is not analyzed; it must already be in
    /// the form the index-stage analyzer produces.
    pub fn new<F, T>(field: F, term: T) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: 1.0,
        }
    }

    /// Get the field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Get the term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for TermQuery {
    fn evaluate(&self, reader: &IndexReader, similarity: &Similarity) -> Result<DocScores> {
        let (Some(term), Some(field)) = (
            reader.term_info(&self.field, &self.term),
            reader.field_stats(&self.field),
        ) else {
            return Ok(DocScores::new());
        };

        let postings = reader.postings(&self.field, &self.term);
        let mut scores = DocScores::with_capacity(postings.len());
        for posting in postings {
            let length = reader.field_length(&self.field, posting.doc);
            let score = similarity.score(self.boost, &term, &field, posting.freq, length);
            scores.insert(posting.doc, score);
        }
        Ok(scores)
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        format!("{}:{}{}", self.field, self.term, boost_suffix(self.boost))
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
