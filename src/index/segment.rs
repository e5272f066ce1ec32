//! In-memory layout of an index segment and its statistics types.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::AnalyzerKind;
use crate::index::Document;

/// Collection statistics for one term in one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermInfo {
    /// Number of documents containing the term.
    pub doc_freq: u64,
    /// Total number of occurrences across the collection.
    pub total_term_freq: u64,
}

/// Statistics for one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Number of documents with at least one token in the field.
    pub doc_count: u64,
    /// Number of tokens indexed for the field.
    pub total_tokens: u64,
}

impl FieldStats {
    /// Average number of tokens per document having the field.
    pub fn avg_length(&self) -> f64 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.total_tokens as f64 / self.doc_count as f64
        }
    }
}

/// One entry of a posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Internal document number.
    pub doc: u32,
    /// Frequency of the term in the document field.
    pub freq: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct PostingList {
    pub info: TermInfo,
    /// Sorted by `doc`.
    pub postings: Vec<Posting>,
}

/// Inverted index and length norms for a single field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct FieldIndex {
    pub stats: FieldStats,
    /// Token count per internal document number.
    pub lengths: Vec<u32>,
    pub terms: AHashMap<String, PostingList>,
}

impl FieldIndex {
    /// Record the analyzed terms of document `doc`.
    ///
    /// Documents must be added in increasing `doc` order.
    pub fn add(&mut self, doc: u32, terms: &[String]) {
        let doc_index = doc as usize;
        if self.lengths.len() < doc_index {
            self.lengths.resize(doc_index, 0);
        }
        self.lengths.push(terms.len() as u32);

        if terms.is_empty() {
            return;
        }

        let mut frequencies: AHashMap<&str, u32> = AHashMap::new();
        for term in terms {
            *frequencies.entry(term.as_str()).or_insert(0) += 1;
        }

        for (term, freq) in frequencies {
            let list = self.terms.entry(term.to_string()).or_default();
            list.info.doc_freq += 1;
            list.info.total_term_freq += freq as u64;
            list.postings.push(Posting { doc, freq });
        }

        self.stats.doc_count += 1;
        self.stats.total_tokens += terms.len() as u64;
    }

    pub fn length(&self, doc: u32) -> u32 {
        self.lengths.get(doc as usize).copied().unwrap_or(0)
    }
}

/// Everything the reader needs: stored documents plus per-field indexes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Segment {
    pub documents: Vec<Document>,
    pub fields: AHashMap<String, FieldIndex>,
}

impl Segment {
    /// Append a document with its analyzed fields and return its number.
    pub fn add_document(&mut self, doc: Document, analyzed: Vec<(&str, Vec<String>)>) -> u32 {
        let number = self.documents.len() as u32;
        for (field, terms) in analyzed {
            self.fields
                .entry(field.to_string())
                .or_default()
                .add(number, &terms);
        }
        self.documents.push(doc);
        number
    }

    pub fn doc_count(&self) -> u32 {
        self.documents.len() as u32
    }
}

/// Summary written next to the segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Segment format version.
    pub version: u32,
    /// Analyzer used at index time.
    pub analyzer: AnalyzerKind,
    /// Number of stored documents.
    pub doc_count: u32,
    /// Indexed field names, sorted.
    pub fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_field_index_statistics() {
        let mut field = FieldIndex::default();
        field.add(0, &terms(&["satellit", "orbit", "satellit"]));
        field.add(1, &terms(&[]));
        field.add(2, &terms(&["orbit"]));

        assert_eq!(field.stats.doc_count, 2);
        assert_eq!(field.stats.total_tokens, 4);
        assert_eq!(field.stats.avg_length(), 2.0);
        assert_eq!(field.length(0), 3);
        assert_eq!(field.length(1), 0);
        assert_eq!(field.length(7), 0);

        let satellite = &field.terms["satellit"];
        assert_eq!(satellite.info.doc_freq, 1);
        assert_eq!(satellite.info.total_term_freq, 2);
        assert_eq!(satellite.postings, vec![Posting { doc: 0, freq: 2 }]);

        let orbit = &field.terms["orbit"];
        assert_eq!(orbit.info.doc_freq, 2);
        let docs: Vec<u32> = orbit.postings.iter().map(|p| p.doc).collect();
        assert_eq!(docs, vec![0, 2]);
    }

    #[test]
    fn test_segment_numbers_documents() {
        let mut segment = Segment::default();
        let a = segment.add_document(Document::new("A"), vec![("text", terms(&["x"]))]);
        let b = segment.add_document(Document::new("B"), vec![("text", terms(&["y"]))]);

        assert_eq!((a, b), (0, 1));
        assert_eq!(segment.doc_count(), 2);
        assert_eq!(segment.fields["text"].lengths, vec![1, 1]);
    }

    #[test]
    fn test_empty_field_stats() {
        assert_eq!(FieldStats::default().avg_length(), 0.0);
    }
}
