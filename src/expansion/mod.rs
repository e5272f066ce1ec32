//! Pseudo-relevance feedback query expansion.

pub mod engine;
pub mod weighting;

pub use engine::{
    CandidateTerms, ExpandedQuery, ExpansionConfig, ExpansionTerm, ExpansionTrace,
    QueryExpansionEngine,
};
pub use weighting::{TermWeighter, term_weight};
