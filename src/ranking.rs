//! trec_eval results output.
//!
//! Every hit becomes one line:
//!
//! ```text
//! <query_id> 0 <doc_id> 0 <score> <run_tag>
//! ```
//!
//! Lines of one query are written as a single block in pass-2 order and
//! flushed before the next query starts, so a results file never holds part
//! of a query.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::error::{PrfError, Result};
use crate::search::Hit;

/// One line of a results file.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingLine<'a> {
    /// The query id.
    pub query_id: u32,
    /// The external document id.
    pub doc_id: &'a str,
    /// The pass-2 score.
    pub score: f32,
    /// The run tag.
    pub run_tag: &'a str,
}

impl fmt::Display for RankingLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} 0 {} 0 {} {}",
            self.query_id, self.doc_id, self.score, self.run_tag
        )
    }
}

/// Writes ranked hits to a results destination.
///
/// The destination is truncated once, when the writer is created. Each call
/// to [`write_query`](RankingWriter::write_query) appends and flushes one
/// query's block. Dropping the writer flushes on a best-effort basis.
pub struct RankingWriter<W: Write = BufWriter<File>> {
    out: W,
    run_tag: String,
    flushed: Vec<u32>,
    lines: u64,
}

impl RankingWriter<BufWriter<File>> {
    /// Create (or truncate) the results file at `path`.
    pub fn create<P: AsRef<Path>, S: Into<String>>(path: P, run_tag: S) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            PrfError::output_write(format!("cannot create {}: {e}", path.display()), Vec::new())
        })?;
        Ok(RankingWriter::new(BufWriter::new(file), run_tag))
    }
}

impl<W: Write> RankingWriter<W> {
    /// Wrap any writer.
    pub fn new<S: Into<String>>(out: W, run_tag: S) -> Self {
        RankingWriter {
            out,
            run_tag: run_tag.into(),
            flushed: Vec::new(),
            lines: 0,
        }
    }

    /// Write and flush all lines of one query.
    ///
    /// On failure the error carries the ids of the queries flushed before
    /// this one.
    pub fn write_query(&mut self, query_id: u32, hits: &[Hit]) -> Result<()> {
        let mut block = String::with_capacity(hits.len() * 48);
        for hit in hits {
            let line = RankingLine {
                query_id,
                doc_id: &hit.doc_id,
                score: hit.score,
                run_tag: &self.run_tag,
            };
            block.push_str(&line.to_string());
            block.push('\n');
        }

        self.out
            .write_all(block.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| {
                PrfError::output_write(
                    format!("writing query {query_id}: {e}"),
                    self.flushed.clone(),
                )
            })?;

        self.flushed.push(query_id);
        self.lines += hits.len() as u64;
        debug!("wrote {} lines for query {query_id}", hits.len());
        Ok(())
    }

    /// Ids of the queries written so far, in write order.
    pub fn flushed(&self) -> &[u32] {
        &self.flushed
    }

    /// Number of lines written so far.
    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    /// Flush and return the ids of every written query.
    pub fn finish(mut self) -> Result<Vec<u32>> {
        let flushed = std::mem::take(&mut self.flushed);
        if let Err(e) = self.out.flush() {
            return Err(PrfError::output_write(
                format!("final flush: {e}"),
                flushed,
            ));
        }
        Ok(flushed)
    }
}

impl<W: Write> Drop for RankingWriter<W> {
    fn drop(&mut self) {
        let _ = self.out.flush();
    }
}
