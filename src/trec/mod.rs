//! Readers for TREC collections and topic files.

pub mod document;
pub mod topic;

pub use document::{TrecDocumentParser, corpus_files, read_corpus};
pub use topic::{Topic, TopicParser, read_topics};
