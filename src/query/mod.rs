//! Query model: term and boolean queries, and the query string parser.

pub mod boolean;
pub mod parser;
#[allow(clippy::module_inception)]
pub mod query;
pub mod term;

pub use self::boolean::{BooleanClause, BooleanQuery, Occur};
pub use self::parser::{QueryParser, escape};
pub use self::query::{DocScores, Query};
pub use self::term::TermQuery;
