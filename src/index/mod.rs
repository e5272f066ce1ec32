//! Inverted index: documents, writer, reader and term statistics.
//!
//! An index lives in a directory holding two files:
//!
//! - `segment.bin`: the stored documents and per-field postings, `bincode`
//!   encoded;
//! - `meta.json`: a small human readable summary ([`IndexMeta`]).
//!
//! The index is written once by [`IndexWriter`] and is read-only afterwards.

pub mod document;
pub mod reader;
pub mod segment;
pub mod writer;

pub use document::{DOCNO_FIELD, Document, HEADLINE_FIELD, TEXT_FIELD};
pub use reader::IndexReader;
pub use segment::{FieldStats, IndexMeta, Posting, TermInfo};
pub use writer::IndexWriter;

/// File name of the serialized segment inside an index directory.
pub const SEGMENT_FILE: &str = "segment.bin";

/// File name of the index metadata inside an index directory.
pub const META_FILE: &str = "meta.json";

/// Format version written into [`IndexMeta`].
pub const FORMAT_VERSION: u32 = 1;
