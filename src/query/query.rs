//! Base query trait.

use std::any::Any;
use std::fmt::Debug;

use ahash::AHashMap;

use crate::error::Result;
use crate::index::IndexReader;
use crate::similarity::Similarity;

/// Scores of the documents matched by a query, keyed by internal number.
pub type DocScores = AHashMap<u32, f32>;

/// Trait for search queries.
pub trait Query: Send + Sync + Debug {
    /// Score every document this query matches.
    fn evaluate(&self, reader: &IndexReader, similarity: &Similarity) -> Result<DocScores>;

    /// Get the boost factor for this query.
    fn boost(&self) -> f32;

    /// Set the boost factor for this query.
    fn set_boost(&mut self, boost: f32);

    /// Get a human-readable description of this query.
    fn description(&self) -> String;

    /// Clone this query.
    fn clone_box(&self) -> Box<dyn Query>;

    /// Get this query as Any for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Render a boost suffix the way query strings write it.
pub(crate) fn boost_suffix(boost: f32) -> String {
    if boost == 1.0 {
        String::new()
    } else {
        format!("^{boost}")
    }
}
