//! Two-pass retrieval with pseudo-relevance feedback.
//!
//! For every query:
//!
//! 1. the query text is escaped and parsed;
//! 2. pass 1 retrieves the top `first_pass_limit` documents;
//! 3. the stored text of those documents is tokenized into one pooled list;
//! 4. each distinct pooled term is weighted (see [`term_weight`]);
//! 5. the best `expansion_limit` terms are boosted relative to the best one
//!    and OR-ed onto the original query;
//! 6. pass 2 retrieves the top `second_pass_limit` documents.
//!
//! [`term_weight`]: crate::expansion::term_weight

use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use log::{debug, trace, warn};

use crate::config::RunConfig;
use crate::error::{PrfError, Result};
use crate::expansion::weighting::TermWeighter;
use crate::query::{BooleanQuery, Query, TermQuery, escape};
use crate::search::{Hit, RetrievalEngine, TermStatistics};

/// Limits and field used by [`QueryExpansionEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionConfig {
    /// Hits mined for expansion terms.
    pub first_pass_limit: usize,
    /// Hits returned from the expanded query.
    pub second_pass_limit: usize,
    /// Maximum number of expansion terms.
    pub expansion_limit: usize,
    /// Boost of the best expansion term.
    pub expansion_term_scale: f64,
    /// Field mined for terms and searched by expansion clauses.
    pub field: String,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        ExpansionConfig::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for ExpansionConfig {
    fn from(config: &RunConfig) -> Self {
        ExpansionConfig {
            first_pass_limit: config.first_pass_limit,
            second_pass_limit: config.second_pass_limit,
            expansion_limit: config.expansion_limit,
            expansion_term_scale: config.expansion_term_scale,
            field: config.field.clone(),
        }
    }
}

/// Weighted feedback terms, best first.
///
/// Built once per query from the pooled tokens; ordered by weight
/// descending, ties broken by term ascending. Terms of weight 0 are never
/// present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateTerms {
    terms: Vec<(String, f64)>,
}

impl CandidateTerms {
    /// Weigh every distinct term of `pool` with `weigh(term, count)`.
    pub fn from_pool<F>(pool: &[String], weigh: F) -> Self
    where
        F: Fn(&str, u64) -> f64,
    {
        let mut counts: AHashMap<&str, u64> = AHashMap::new();
        for term in pool {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }

        let mut terms: Vec<(String, f64)> = counts
            .into_iter()
            .map(|(term, count)| (term.to_string(), weigh(term, count)))
            .filter(|(_, weight)| *weight > 0.0)
            .collect();
        terms.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        CandidateTerms { terms }
    }

    /// Keep only the best `limit` terms.
    pub fn truncate(&mut self, limit: usize) {
        self.terms.truncate(limit);
    }

    /// The largest weight, if any.
    pub fn max_weight(&self) -> Option<f64> {
        self.terms.first().map(|(_, weight)| *weight)
    }

    /// Iterate over (term, weight), best first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.terms.iter().map(|(term, weight)| (term.as_str(), *weight))
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether there are no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// One term added to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionTerm {
    /// The analyzed term.
    pub term: String,
    /// Its feedback weight.
    pub weight: f64,
    /// Its clause boost, `scale × weight / max_weight`.
    pub boost: f64,
}

/// The query run in pass 2.
#[derive(Debug, Clone)]
pub struct ExpandedQuery {
    query: Box<dyn Query>,
    terms: Vec<ExpansionTerm>,
}

impl ExpandedQuery {
    /// Build the expanded query: the original query, unboosted, OR-ed with
    /// one boosted term clause per candidate on `field`.
    ///
    /// Without candidates, or when the best weight is 0, the original query
    /// is used unchanged. Clauses whose boost is 0 can only add zero scores
    /// and are left out.
    pub fn build(
        original: &dyn Query,
        candidates: &CandidateTerms,
        field: &str,
        scale: f64,
    ) -> Self {
        let unexpanded = || ExpandedQuery {
            query: original.clone_box(),
            terms: Vec::new(),
        };

        let Some(max_weight) = candidates.max_weight().filter(|w| *w > 0.0) else {
            return unexpanded();
        };

        let terms: Vec<ExpansionTerm> = candidates
            .iter()
            .map(|(term, weight)| ExpansionTerm {
                term: term.to_string(),
                weight,
                boost: scale * (weight / max_weight),
            })
            .collect();

        let mut query = BooleanQuery::new();
        query.add_should(original.clone_box());
        for term in terms.iter().filter(|t| t.boost > 0.0) {
            query.add_should(Box::new(
                TermQuery::new(field, term.term.as_str()).with_boost(term.boost as f32),
            ));
        }

        if query.len() == 1 {
            return ExpandedQuery {
                query: original.clone_box(),
                terms,
            };
        }
        ExpandedQuery {
            query: Box::new(query),
            terms,
        }
    }

    /// The query to run.
    pub fn query(&self) -> &dyn Query {
        self.query.as_ref()
    }

    /// The selected terms with their boosts, best first.
    pub fn terms(&self) -> &[ExpansionTerm] {
        &self.terms
    }

    /// Whether any term clause was added.
    pub fn is_expanded(&self) -> bool {
        self.terms.iter().any(|t| t.boost > 0.0)
    }
}

/// What happened while expanding one query.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionTrace {
    /// The query id.
    pub query_id: u32,
    /// Description of the parsed original query.
    pub original_query: String,
    /// Hits returned by pass 1.
    pub first_pass_hits: usize,
    /// Tokens in the feedback pool, duplicates included.
    pub pooled_tokens: usize,
    /// Distinct terms with a positive weight.
    pub candidate_count: usize,
    /// The selected terms.
    pub terms: Vec<ExpansionTerm>,
    /// Whether pass 2 ran an expanded query.
    pub expanded: bool,
    /// Hits returned by pass 2.
    pub second_pass_hits: usize,
}

/// Runs two-pass pseudo-relevance feedback retrieval.
pub struct QueryExpansionEngine {
    engine: Arc<dyn RetrievalEngine>,
    weighter: TermWeighter,
    config: ExpansionConfig,
}

impl std::fmt::Debug for QueryExpansionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExpansionEngine")
            .field("weighter", &self.weighter)
            .field("config", &self.config)
            .finish()
    }
}

impl QueryExpansionEngine {
    /// Create an engine over a retrieval engine and its statistics.
    pub fn new(
        engine: Arc<dyn RetrievalEngine>,
        statistics: Arc<dyn TermStatistics>,
        config: ExpansionConfig,
    ) -> Self {
        let weighter = TermWeighter::new(statistics, config.field.clone());
        QueryExpansionEngine {
            engine,
            weighter,
            config,
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &ExpansionConfig {
        &self.config
    }

    /// Rank documents for one query.
    pub fn expand_and_search(&self, query_id: u32, query_text: &str) -> Result<Vec<Hit>> {
        self.expand_with_trace(query_id, query_text).map(|(hits, _)| hits)
    }

    /// Rank documents for one query and report how it was expanded.
    pub fn expand_with_trace(
        &self,
        query_id: u32,
        query_text: &str,
    ) -> Result<(Vec<Hit>, ExpansionTrace)> {
        self.expand_until(query_id, query_text, None)
    }

    /// Like [`expand_with_trace`], failing with [`PrfError::Timeout`] once
    /// `deadline` has passed. The deadline is checked between stages, so a
    /// late query never returns hits.
    ///
    /// [`expand_with_trace`]: QueryExpansionEngine::expand_with_trace
    pub fn expand_until(
        &self,
        query_id: u32,
        query_text: &str,
        deadline: Option<Instant>,
    ) -> Result<(Vec<Hit>, ExpansionTrace)> {
        let original = self.engine.parse_query(&escape(query_text))?;
        check_deadline(query_id, deadline, "parse")?;

        let first_pass = self
            .engine
            .search(original.as_ref(), self.config.first_pass_limit)?;
        check_deadline(query_id, deadline, "first pass")?;

        let pool = self.feedback_pool(&first_pass)?;
        let mut candidates = self.candidates(query_id, &pool);
        let candidate_count = candidates.len();
        candidates.truncate(self.config.expansion_limit);
        check_deadline(query_id, deadline, "weighting")?;

        let expanded = ExpandedQuery::build(
            original.as_ref(),
            &candidates,
            &self.config.field,
            self.config.expansion_term_scale,
        );
        trace!("query {query_id} expanded to {}", expanded.query().description());

        let hits = self
            .engine
            .search(expanded.query(), self.config.second_pass_limit)?;
        check_deadline(query_id, deadline, "second pass")?;

        let trace = ExpansionTrace {
            query_id,
            original_query: original.description(),
            first_pass_hits: first_pass.len(),
            pooled_tokens: pool.len(),
            candidate_count,
            expanded: expanded.is_expanded(),
            terms: expanded.terms,
            second_pass_hits: hits.len(),
        };
        debug!(
            "query {query_id}: {} feedback docs, {} candidates, {} expansion terms, {} hits",
            trace.first_pass_hits,
            trace.candidate_count,
            trace.terms.len(),
            trace.second_pass_hits
        );
        Ok((hits, trace))
    }

    /// Tokens of the designated field of every hit, in hit order.
    fn feedback_pool(&self, hits: &[Hit]) -> Result<Vec<String>> {
        let mut pool = Vec::new();
        for hit in hits {
            match self.engine.stored_field(hit.doc, &self.config.field)? {
                Some(text) => pool.extend(self.engine.tokenize(&text)?),
                None => debug!("{} has no stored {}", hit.doc_id, self.config.field),
            }
        }
        Ok(pool)
    }

    /// Weighted candidates from the pool. Without a collection size every
    /// term weighs 0, so the query runs unexpanded.
    fn candidates(&self, query_id: u32, pool: &[String]) -> CandidateTerms {
        if pool.is_empty() {
            return CandidateTerms::default();
        }
        let total_docs = match self.weighter.collection_size() {
            Ok(total_docs) => total_docs,
            Err(e) => {
                warn!("query {query_id}: no collection size, skipping expansion: {e}");
                return CandidateTerms::default();
            }
        };
        CandidateTerms::from_pool(pool, |term, count| {
            self.weighter.weight(term, count, total_docs)
        })
    }
}

fn check_deadline(query_id: u32, deadline: Option<Instant>, stage: &str) -> Result<()> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(PrfError::timeout(format!(
            "query {query_id} ran out of time after {stage}"
        ))),
        _ => Ok(()),
    }
}
