//! Building an index directory from documents.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;

use crate::analysis::{Analyzer, AnalyzerKind, Stage};
use crate::error::{PrfError, Result};
use crate::index::segment::{IndexMeta, Segment};
use crate::index::{Document, FORMAT_VERSION, META_FILE, SEGMENT_FILE};

/// Writes a single-segment index.
///
/// Documents are analyzed with the index-stage analyzer of the configured
/// [`AnalyzerKind`]. Nothing reaches the directory until [`commit`] is
/// called.
///
/// [`commit`]: IndexWriter::commit
///
/// # Example
///
/// ```rust,no_run
/// use prf_rank::analysis::AnalyzerKind;
/// use prf_rank::index::{Document, IndexWriter};
///
/// let mut writer = IndexWriter::create("/tmp/prf-index", AnalyzerKind::Custom).unwrap();
/// writer
///     .add_document(Document::new("FT911-3").with_text("Satellite launch delayed"))
///     .unwrap();
/// let meta = writer.commit().unwrap();
/// assert_eq!(meta.doc_count, 1);
/// ```
pub struct IndexWriter {
    directory: PathBuf,
    analyzer_kind: AnalyzerKind,
    analyzer: Arc<dyn Analyzer>,
    segment: Segment,
}

impl std::fmt::Debug for IndexWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriter")
            .field("directory", &self.directory)
            .field("analyzer", &self.analyzer.name())
            .field("pending_docs", &self.segment.doc_count())
            .finish()
    }
}

type AnalyzedFields = Vec<(&'static str, Vec<String>)>;

impl IndexWriter {
    /// Create a writer for `directory`, creating the directory if needed.
    pub fn create<P: AsRef<Path>>(directory: P, analyzer: AnalyzerKind) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|e| {
            PrfError::index(format!(
                "cannot create index directory {}: {e}",
                directory.display()
            ))
        })?;

        Ok(IndexWriter {
            directory,
            analyzer_kind: analyzer,
            analyzer: analyzer.build(Stage::Index)?,
            segment: Segment::default(),
        })
    }

    /// Add one document and return its internal number.
    pub fn add_document(&mut self, doc: Document) -> Result<u32> {
        let analyzed = self.analyze(&doc)?;
        Ok(self.segment.add_document(doc, analyzed))
    }

    /// Add a batch of documents, analyzing them in parallel.
    ///
    /// Documents keep the order of `docs`, so internal numbers are assigned
    /// exactly as if they had been added one by one.
    pub fn add_documents(&mut self, docs: Vec<Document>) -> Result<usize> {
        let analyzed = docs
            .par_iter()
            .map(|doc| self.analyze(doc))
            .collect::<Result<Vec<_>>>()?;

        let count = docs.len();
        for (doc, fields) in docs.into_iter().zip(analyzed) {
            self.segment.add_document(doc, fields);
        }
        debug!("added {count} documents ({} total)", self.segment.doc_count());
        Ok(count)
    }

    /// Number of documents added so far.
    pub fn pending_docs(&self) -> u32 {
        self.segment.doc_count()
    }

    /// Write the segment and metadata to the index directory.
    pub fn commit(self) -> Result<IndexMeta> {
        let mut fields: Vec<String> = self.segment.fields.keys().cloned().collect();
        fields.sort();

        let meta = IndexMeta {
            version: FORMAT_VERSION,
            analyzer: self.analyzer_kind,
            doc_count: self.segment.doc_count(),
            fields,
        };

        write_atomically(&self.directory.join(SEGMENT_FILE), |out| {
            bincode::serialize_into(out, &self.segment)?;
            Ok(())
        })?;
        write_atomically(&self.directory.join(META_FILE), |out| {
            serde_json::to_writer_pretty(&mut *out, &meta)?;
            out.write_all(b"\n")?;
            Ok(())
        })?;

        info!(
            "committed {} documents to {}",
            meta.doc_count,
            self.directory.display()
        );
        Ok(meta)
    }

    fn analyze(&self, doc: &Document) -> Result<AnalyzedFields> {
        if doc.docno.trim().is_empty() {
            return Err(PrfError::index("document without docno"));
        }

        doc.analyzed_fields()
            .into_iter()
            .map(|(field, value)| Ok((field, self.analyzer.terms(value)?)))
            .collect()
    }
}

/// Write `path` through a sibling temporary file and rename it into place.
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp = path.with_extension("tmp");
    let mut out = BufWriter::new(File::create(&tmp)?);
    write(&mut out)?;
    out.flush()?;
    out.get_ref().sync_all()?;
    drop(out);
    fs::rename(&tmp, path)?;
    Ok(())
}
