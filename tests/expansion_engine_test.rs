//! Query expansion against an in-memory retrieval engine.

use std::collections::HashMap;
use std::sync::Arc;

use prf_rank::expansion::{ExpansionConfig, QueryExpansionEngine};
use prf_rank::prelude::*;
use prf_rank::query::{BooleanQuery, Query, TermQuery};

/// A fixed collection: documents are stored texts, statistics are given.
struct FixedEngine {
    stored: Vec<(&'static str, &'static str)>,
    doc_freqs: HashMap<&'static str, u64>,
    doc_count: Option<u64>,
}

impl FixedEngine {
    fn new() -> Self {
        FixedEngine {
            stored: vec![
                ("D1", "satellite orbit orbit launch"),
                ("D2", "satellite rocket orbit"),
                ("D3", "satellite weather"),
            ],
            doc_freqs: HashMap::from([
                ("satellite", 3),
                ("orbit", 40),
                ("launch", 900),
                ("rocket", 25),
                ("weather", 0),
            ]),
            doc_count: Some(1000),
        }
    }
}

/// Collect the terms of a (possibly nested) query.
fn query_terms(query: &dyn Query, out: &mut Vec<String>) {
    if let Some(term) = query.as_any().downcast_ref::<TermQuery>() {
        out.push(term.term().to_string());
    } else if let Some(boolean) = query.as_any().downcast_ref::<BooleanQuery>() {
        for clause in boolean.clauses() {
            query_terms(clause.query.as_ref(), out);
        }
    }
}

impl RetrievalEngine for FixedEngine {
    fn parse_query(&self, text: &str) -> Result<Box<dyn Query>> {
        if text.trim().is_empty() {
            return Err(PrfError::query_parse("empty query"));
        }
        let mut query = BooleanQuery::new();
        for word in text.split_whitespace() {
            query.add_should(Box::new(TermQuery::new("text", word)));
        }
        Ok(Box::new(query))
    }

    fn search(&self, query: &dyn Query, limit: usize) -> Result<Vec<Hit>> {
        let mut terms = Vec::new();
        query_terms(query, &mut terms);
        let mut hits: Vec<Hit> = self
            .stored
            .iter()
            .enumerate()
            .filter_map(|(doc, (id, text))| {
                let matched = text
                    .split_whitespace()
                    .filter(|w| terms.iter().any(|t| t == w))
                    .count();
                (matched > 0).then(|| Hit::new(doc as u32, *id, matched as f32))
            })
            .collect();
        prf_rank::search::sort_hits(&mut hits);
        hits.truncate(limit);
        Ok(hits)
    }

    fn stored_field(&self, doc: u32, _field: &str) -> Result<Option<String>> {
        Ok(self.stored.get(doc as usize).map(|(_, text)| text.to_string()))
    }

    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }
}

impl TermStatistics for FixedEngine {
    fn doc_freq(&self, _field: &str, term: &str) -> Result<u64> {
        self.doc_freqs
            .get(term)
            .copied()
            .ok_or_else(|| PrfError::statistics(format!("no statistics for {term}")))
    }

    fn doc_count(&self, _field: &str) -> Result<u64> {
        self.doc_count.ok_or_else(|| PrfError::statistics("doc count unavailable"))
    }
}

fn engine_over(fixed: FixedEngine, config: ExpansionConfig) -> QueryExpansionEngine {
    let fixed = Arc::new(fixed);
    QueryExpansionEngine::new(fixed.clone(), fixed, config)
}

fn engine(config: ExpansionConfig) -> QueryExpansionEngine {
    engine_over(FixedEngine::new(), config)
}

#[test]
fn test_trace_reports_each_stage() -> Result<()> {
    let engine = engine(ExpansionConfig::default());
    let (hits, trace) = engine.expand_with_trace(7, "satellite")?;

    assert_eq!(trace.query_id, 7);
    assert_eq!(trace.first_pass_hits, 3);
    assert_eq!(trace.pooled_tokens, 9);
    // "weather" has df 0 and drops out.
    assert_eq!(trace.candidate_count, 4);
    assert!(trace.expanded);
    assert_eq!(trace.second_pass_hits, hits.len());
    Ok(())
}

#[test]
fn test_boosts_are_normalized_to_scale() -> Result<()> {
    let engine = engine(ExpansionConfig {
        expansion_term_scale: 0.8,
        ..ExpansionConfig::default()
    });
    let (_, trace) = engine.expand_with_trace(1, "satellite")?;

    let terms: Vec<&str> = trace.terms.iter().map(|t| t.term.as_str()).collect();
    assert_eq!(terms[0], "satellite");
    assert_eq!(trace.terms[0].boost, 0.8);
    for pair in trace.terms.windows(2) {
        assert!(pair[0].weight >= pair[1].weight);
    }
    for term in &trace.terms[1..] {
        assert!(term.boost < 0.8);
        assert!(term.boost > 0.0);
    }
    Ok(())
}

#[test]
fn test_expansion_limit_truncates_terms() -> Result<()> {
    let engine = engine(ExpansionConfig {
        expansion_limit: 2,
        ..ExpansionConfig::default()
    });
    let (_, trace) = engine.expand_with_trace(1, "satellite")?;

    assert_eq!(trace.candidate_count, 4);
    assert_eq!(trace.terms.len(), 2);
    Ok(())
}

#[test]
fn test_unknown_statistics_weigh_zero() -> Result<()> {
    let engine = engine(ExpansionConfig::default());
    let (_, trace) = engine.expand_with_trace(1, "weather")?;

    // D3 is the only hit; "weather" has df 0 and "satellite" survives.
    assert_eq!(trace.first_pass_hits, 1);
    let terms: Vec<&str> = trace.terms.iter().map(|t| t.term.as_str()).collect();
    assert_eq!(terms, vec!["satellite"]);
    Ok(())
}

#[test]
fn test_no_first_pass_hits_searches_original() -> Result<()> {
    let engine = engine(ExpansionConfig::default());
    let (hits, trace) = engine.expand_with_trace(1, "nothing")?;

    assert!(hits.is_empty());
    assert_eq!(trace.pooled_tokens, 0);
    assert!(!trace.expanded);
    Ok(())
}

#[test]
fn test_blank_query_is_a_parse_error() {
    let engine = engine(ExpansionConfig::default());
    assert!(matches!(
        engine.expand_and_search(1, "   "),
        Err(PrfError::QueryParse(_))
    ));
}

#[test]
fn test_feedback_reads_the_matched_document() -> Result<()> {
    let fixed = FixedEngine {
        stored: vec![
            ("DUP", "banana banana cherry"),
            ("DUP", "satellite orbit orbit"),
        ],
        doc_freqs: HashMap::from([
            ("banana", 5),
            ("cherry", 5),
            ("satellite", 3),
            ("orbit", 40),
        ]),
        doc_count: Some(1000),
    };
    let engine = engine_over(fixed, ExpansionConfig::default());
    let (hits, trace) = engine.expand_with_trace(1, "satellite")?;

    assert_eq!(trace.first_pass_hits, 1);
    let mut terms: Vec<&str> = trace.terms.iter().map(|t| t.term.as_str()).collect();
    terms.sort_unstable();
    assert_eq!(terms, vec!["orbit", "satellite"]);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc, 1);
    Ok(())
}

#[test]
fn test_missing_collection_size_runs_unexpanded() -> Result<()> {
    let mut fixed = FixedEngine::new();
    fixed.doc_count = None;
    let unexpanded = engine_over(fixed, ExpansionConfig::default());
    let (hits, trace) = unexpanded.expand_with_trace(1, "satellite")?;

    assert_eq!(trace.first_pass_hits, 3);
    assert_eq!(trace.candidate_count, 0);
    assert!(!trace.expanded);
    let ids: Vec<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
    assert_eq!(ids, vec!["D1", "D2", "D3"]);
    Ok(())
}
