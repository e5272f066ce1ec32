//! Index-backed retrieval engine.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::analysis::{Analyzer, Stage};
use crate::config::RunConfig;
use crate::error::{PrfError, Result};
use crate::index::IndexReader;
use crate::query::{Query, QueryParser};
use crate::search::{Hit, RetrievalEngine, TermStatistics, sort_hits};
use crate::similarity::Similarity;

/// Searches one [`IndexReader`] with a fixed similarity and analyzer.
#[derive(Debug)]
pub struct IndexSearcher {
    reader: Arc<IndexReader>,
    similarity: Similarity,
    analyzer: Arc<dyn Analyzer>,
    parser: QueryParser,
}

impl IndexSearcher {
    /// Create a searcher from its parts.
    pub fn new(
        reader: Arc<IndexReader>,
        similarity: Similarity,
        analyzer: Arc<dyn Analyzer>,
        search_fields: Vec<String>,
    ) -> Result<Self> {
        let parser = QueryParser::multi_field(search_fields, analyzer.clone())?;
        Ok(IndexSearcher {
            reader,
            similarity,
            analyzer,
            parser,
        })
    }

    /// Create a searcher configured by `config`.
    ///
    /// The query-stage analyzer is built here. When a frequent-term threshold
    /// is configured, the most frequent terms of the expansion field above it
    /// become extra query-time stop words.
    pub fn from_config(reader: Arc<IndexReader>, config: &RunConfig) -> Result<Self> {
        if reader.meta().analyzer != config.analyzer {
            warn!(
                "index was built with analyzer {} but queries use {}",
                reader.meta().analyzer,
                config.analyzer
            );
        }

        let frequent = match config.frequent_term_threshold {
            Some(threshold) => reader
                .frequent_terms(&config.field, config.frequent_term_candidates)
                .into_iter()
                .filter(|(_, freq)| *freq > threshold)
                .map(|(term, _)| term)
                .collect(),
            None => HashSet::new(),
        };
        if !frequent.is_empty() {
            info!("{} frequent terms added to the query stop list", frequent.len());
            debug!("frequent terms: {frequent:?}");
        }

        let analyzer = config
            .analyzer
            .build_with_stop_words(Stage::Query, frequent)?;
        IndexSearcher::new(
            reader,
            config.similarity.build(),
            analyzer,
            config.search_fields(),
        )
    }

}

impl RetrievalEngine for IndexSearcher {
    fn parse_query(&self, text: &str) -> Result<Box<dyn Query>> {
        self.parser.parse(text)
    }

    fn search(&self, query: &dyn Query, limit: usize) -> Result<Vec<Hit>> {
        self.reader.ensure_open()?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let scores = query.evaluate(&self.reader, &self.similarity)?;
        let mut hits = Vec::with_capacity(scores.len());
        for (doc, score) in scores {
            let document = self.reader.document(doc).ok_or_else(|| {
                PrfError::index_unavailable(format!("posting points at missing document {doc}"))
            })?;
            hits.push(Hit::new(doc, document.docno.clone(), score));
        }

        sort_hits(&mut hits);
        hits.truncate(limit);
        Ok(hits)
    }

    fn stored_field(&self, doc: u32, field: &str) -> Result<Option<String>> {
        self.reader.ensure_open()?;
        Ok(self
            .reader
            .document(doc)
            .and_then(|document| document.field(field))
            .map(str::to_string))
    }

    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        self.analyzer.terms(text)
    }
}

impl TermStatistics for IndexSearcher {
    fn doc_freq(&self, field: &str, term: &str) -> Result<u64> {
        self.reader
            .ensure_open()
            .map_err(|e| PrfError::statistics(e.to_string()))?;
        Ok(self.reader.doc_freq(field, term))
    }

    fn doc_count(&self, field: &str) -> Result<u64> {
        self.reader
            .ensure_open()
            .map_err(|e| PrfError::statistics(e.to_string()))?;
        Ok(self.reader.field_stats(field).map_or(0, |stats| stats.doc_count))
    }
}
