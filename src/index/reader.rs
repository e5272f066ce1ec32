//! Read-only access to a committed index.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::AHashSet;
use log::{debug, info, warn};

use crate::error::{PrfError, Result};
use crate::index::segment::{FieldIndex, IndexMeta, Segment};
use crate::index::{
    Document, FORMAT_VERSION, FieldStats, META_FILE, Posting, SEGMENT_FILE, TermInfo,
};

/// A loaded index.
///
/// The reader is opened once per batch, shared between workers behind an
/// `Arc`, and closed exactly once. After [`close`] every lookup through
/// [`ensure_open`] fails with [`PrfError::IndexUnavailable`].
///
/// [`close`]: IndexReader::close
/// [`ensure_open`]: IndexReader::ensure_open
#[derive(Debug)]
pub struct IndexReader {
    directory: PathBuf,
    meta: IndexMeta,
    segment: Segment,
    closed: AtomicBool,
}

impl IndexReader {
    /// Open the index stored in `directory`.
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        let meta_path = directory.join(META_FILE);
        let meta: IndexMeta = match fs::read_to_string(&meta_path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                PrfError::index_unavailable(format!("corrupt {}: {e}", meta_path.display()))
            })?,
            Err(e) => {
                return Err(PrfError::index_unavailable(format!(
                    "cannot read {}: {e}",
                    meta_path.display()
                )));
            }
        };
        if meta.version != FORMAT_VERSION {
            return Err(PrfError::index_unavailable(format!(
                "unsupported index version {} (expected {FORMAT_VERSION})",
                meta.version
            )));
        }

        let segment_path = directory.join(SEGMENT_FILE);
        let bytes = fs::read(&segment_path).map_err(|e| {
            PrfError::index_unavailable(format!("cannot read {}: {e}", segment_path.display()))
        })?;
        let segment: Segment = bincode::deserialize(&bytes).map_err(|e| {
            PrfError::index_unavailable(format!("corrupt {}: {e}", segment_path.display()))
        })?;
        if segment.doc_count() != meta.doc_count {
            return Err(PrfError::index_unavailable(format!(
                "segment holds {} documents but metadata says {}",
                segment.doc_count(),
                meta.doc_count
            )));
        }

        let mut docnos = AHashSet::with_capacity(segment.documents.len());
        for doc in &segment.documents {
            if !docnos.insert(doc.docno.as_str()) {
                warn!("duplicate docno {} in index", doc.docno);
            }
        }

        info!(
            "opened index {} ({} documents, analyzer {})",
            directory.display(),
            meta.doc_count,
            meta.analyzer
        );

        Ok(IndexReader {
            directory,
            meta,
            segment,
            closed: AtomicBool::new(false),
        })
    }

    /// Close the reader. A second close is an error.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(PrfError::index_unavailable(format!(
                "index {} already closed",
                self.directory.display()
            )));
        }
        debug!("closed index {}", self.directory.display());
        Ok(())
    }

    /// Whether [`close`](IndexReader::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Fail with `IndexUnavailable` once the reader is closed.
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(PrfError::index_unavailable(format!(
                "index {} is closed",
                self.directory.display()
            )))
        } else {
            Ok(())
        }
    }

    /// The index metadata.
    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// Total number of stored documents.
    pub fn doc_count(&self) -> u32 {
        self.segment.doc_count()
    }

    /// Statistics for `field`, or `None` if nothing was indexed in it.
    pub fn field_stats(&self, field: &str) -> Option<FieldStats> {
        self.field(field).map(|f| f.stats)
    }

    /// Statistics for `term` in `field`, or `None` if the term is unknown.
    pub fn term_info(&self, field: &str, term: &str) -> Option<TermInfo> {
        self.field(field)
            .and_then(|f| f.terms.get(term))
            .map(|list| list.info)
    }

    /// Document frequency of `term` in `field`; 0 for unknown terms.
    pub fn doc_freq(&self, field: &str, term: &str) -> u64 {
        self.term_info(field, term).map_or(0, |info| info.doc_freq)
    }

    /// Posting list of `term` in `field`, sorted by document number.
    pub fn postings(&self, field: &str, term: &str) -> &[Posting] {
        self.field(field)
            .and_then(|f| f.terms.get(term))
            .map(|list| list.postings.as_slice())
            .unwrap_or(&[])
    }

    /// The `limit` terms of `field` with the highest collection frequency,
    /// most frequent first, ties broken by term.
    pub fn frequent_terms(&self, field: &str, limit: usize) -> Vec<(String, u64)> {
        let Some(index) = self.field(field) else {
            return Vec::new();
        };

        let mut terms: Vec<(&str, u64)> = index
            .terms
            .iter()
            .map(|(term, list)| (term.as_str(), list.info.total_term_freq))
            .collect();
        terms.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        terms.truncate(limit);
        terms
            .into_iter()
            .map(|(term, freq)| (term.to_string(), freq))
            .collect()
    }

    /// Number of tokens indexed for document `doc` in `field`.
    pub fn field_length(&self, field: &str, doc: u32) -> u32 {
        self.field(field).map_or(0, |f| f.length(doc))
    }

    /// A stored document by internal number.
    pub fn document(&self, doc: u32) -> Option<&Document> {
        self.segment.documents.get(doc as usize)
    }

    fn field(&self, field: &str) -> Option<&FieldIndex> {
        self.segment.fields.get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalyzerKind;
    use crate::index::IndexWriter;
    use tempfile::TempDir;

    fn build(dir: &Path) -> Result<()> {
        let mut writer = IndexWriter::create(dir, AnalyzerKind::Standard)?;
        writer.add_documents(vec![
            Document::new("D1")
                .with_headline("Satellite news")
                .with_text("satellite launch satellite orbit"),
            Document::new("D2").with_text("rocket launch"),
            Document::new("D3"),
        ])?;
        writer.commit()?;
        Ok(())
    }

    #[test]
    fn test_open_and_statistics() -> Result<()> {
        let dir = TempDir::new()?;
        build(dir.path())?;

        let reader = IndexReader::open(dir.path())?;
        assert_eq!(reader.doc_count(), 3);
        assert_eq!(reader.meta().analyzer, AnalyzerKind::Standard);

        let stats = reader.field_stats("text").unwrap();
        assert_eq!(stats.doc_count, 2);
        assert_eq!(stats.total_tokens, 6);

        assert_eq!(reader.doc_freq("text", "launch"), 2);
        assert_eq!(reader.doc_freq("text", "missing"), 0);
        assert_eq!(reader.term_info("text", "satellite").unwrap().total_term_freq, 2);
        assert_eq!(reader.postings("text", "satellite"), &[Posting { doc: 0, freq: 2 }]);
        assert!(reader.postings("body", "satellite").is_empty());
        assert_eq!(reader.field_length("text", 1), 2);

        assert_eq!(
            reader.frequent_terms("text", 2),
            vec![("launch".to_string(), 2), ("satellite".to_string(), 2)]
        );
        assert!(reader.frequent_terms("body", 2).is_empty());

        assert_eq!(reader.document(1).unwrap().docno, "D2");
        assert_eq!(reader.document(1).unwrap().text, "rocket launch");
        Ok(())
    }

    #[test]
    fn test_missing_index_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let result = IndexReader::open(dir.path().join("nowhere"));
        assert!(matches!(result, Err(PrfError::IndexUnavailable(_))));
    }

    #[test]
    fn test_corrupt_segment_is_unavailable() -> Result<()> {
        let dir = TempDir::new()?;
        build(dir.path())?;
        fs::write(dir.path().join(SEGMENT_FILE), b"not a segment")?;

        let result = IndexReader::open(dir.path());
        assert!(matches!(result, Err(PrfError::IndexUnavailable(_))));
        Ok(())
    }

    #[test]
    fn test_close_exactly_once() -> Result<()> {
        let dir = TempDir::new()?;
        build(dir.path())?;

        let reader = IndexReader::open(dir.path())?;
        assert!(reader.ensure_open().is_ok());
        reader.close()?;
        assert!(reader.is_closed());
        assert!(reader.ensure_open().is_err());
        assert!(reader.close().is_err());
        Ok(())
    }
}
