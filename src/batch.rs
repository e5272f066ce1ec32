//! Batch execution of a topic set.
//!
//! Queries are ranked on a rayon pool; every outcome is sent over a channel
//! to a single writer thread which owns the [`RankingWriter`]. The writer
//! emits queries in input order, each as one contiguous block, so results
//! files are byte-identical across runs whatever the thread count.
//!
//! Errors are split by scope. Per-query errors (parse failures, timeouts,
//! missing statistics) are recorded in the [`BatchReport`] and the batch
//! continues. Anything else stops the batch with a [`BatchError`] naming the
//! [`Stage`] that failed; lines already written stay flushed.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ahash::AHashSet;
use crossbeam_channel::{Receiver, bounded};
use log::{error, info, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::RunConfig;
use crate::error::PrfError;
use crate::expansion::{ExpansionConfig, QueryExpansionEngine};
use crate::index::IndexReader;
use crate::metrics::{BatchMetrics, MetricsCollector};
use crate::ranking::RankingWriter;
use crate::search::{Hit, IndexSearcher};

/// A query to rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Query id, unique within a batch.
    pub id: u32,
    /// Raw query text.
    pub text: String,
}

impl QueryRequest {
    /// Create a new request.
    pub fn new<S: Into<String>>(id: u32, text: S) -> Self {
        QueryRequest {
            id,
            text: text.into(),
        }
    }
}

/// What a worker produced for one query.
#[derive(Debug)]
pub enum QueryOutcome {
    /// Pass-2 hits, ready to write.
    Ranked { query_id: u32, hits: Vec<Hit> },
    /// The query failed.
    Failed { query_id: u32, error: PrfError },
    /// The query was not run because the batch was cancelled.
    Skipped { query_id: u32 },
}

/// A query that failed without stopping the batch.
#[derive(Debug)]
pub struct QueryFailure {
    /// The query id.
    pub query_id: u32,
    /// Why it failed.
    pub error: PrfError,
}

/// Summary of a finished batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Queries whose lines were written, in write order.
    pub written: Vec<u32>,
    /// Queries that failed on their own.
    pub failures: Vec<QueryFailure>,
    /// Queries skipped or discarded because of cancellation.
    pub skipped: Vec<u32>,
    /// Repeated query ids that were ignored.
    pub duplicates: Vec<u32>,
    /// Number of results lines written.
    pub lines: u64,
    /// Whether the batch was cancelled.
    pub cancelled: bool,
    /// Timing and expansion counters.
    pub metrics: BatchMetrics,
}

/// Shared flag used to stop a running batch.
///
/// Once cancelled, workers skip queries they have not started and the
/// writer discards results it has not written yet.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The part of a run that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Validating the configuration and building the analyzers.
    Configure,
    /// Reading a document collection.
    ReadCorpus,
    /// Building and committing an index.
    BuildIndex,
    /// Reading a topic file.
    ReadTopics,
    /// Opening the index.
    OpenIndex,
    /// Creating the results file.
    OpenOutput,
    /// Ranking queries.
    Search,
    /// Writing results.
    Write,
    /// Closing the index.
    CloseIndex,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Configure => "configure",
            Stage::ReadCorpus => "read corpus",
            Stage::BuildIndex => "build index",
            Stage::ReadTopics => "read topics",
            Stage::OpenIndex => "open index",
            Stage::OpenOutput => "open output",
            Stage::Search => "search",
            Stage::Write => "write results",
            Stage::CloseIndex => "close index",
        })
    }
}

/// A run-level failure.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct BatchError {
    /// Where the run failed.
    pub stage: Stage,
    /// The underlying error.
    #[source]
    pub source: PrfError,
}

impl BatchError {
    /// Create a new batch error.
    pub fn new(stage: Stage, source: PrfError) -> Self {
        BatchError { stage, source }
    }
}

type BatchResult<T> = std::result::Result<T, BatchError>;

/// Runs a batch of queries against one index.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    config: RunConfig,
    cancel: CancellationToken,
}

impl BatchRunner {
    /// Create a runner for `config`.
    pub fn new(config: RunConfig) -> Self {
        BatchRunner {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally controlled cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The token that cancels this runner's batches.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Open `index_dir`, rank `queries` into `output`, and close the index.
    ///
    /// The index is closed exactly once, also when ranking fails; a ranking
    /// failure takes precedence over a close failure.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        index_dir: P,
        queries: Vec<QueryRequest>,
        output: Q,
    ) -> BatchResult<BatchReport> {
        self.config
            .validate()
            .map_err(|e| BatchError::new(Stage::Configure, e))?;

        let reader = Arc::new(
            IndexReader::open(index_dir).map_err(|e| BatchError::new(Stage::OpenIndex, e))?,
        );

        let result = self.run_open(&reader, queries, output.as_ref());
        let closed = reader
            .close()
            .map_err(|e| BatchError::new(Stage::CloseIndex, e));

        let report = result?;
        closed?;
        Ok(report)
    }

    fn run_open(
        &self,
        reader: &Arc<IndexReader>,
        queries: Vec<QueryRequest>,
        output: &Path,
    ) -> BatchResult<BatchReport> {
        let searcher = Arc::new(
            IndexSearcher::from_config(reader.clone(), &self.config)
                .map_err(|e| BatchError::new(Stage::Configure, e))?,
        );
        let engine = QueryExpansionEngine::new(
            searcher.clone(),
            searcher,
            ExpansionConfig::from(&self.config),
        );

        let writer = RankingWriter::create(output, self.config.run_tag.clone())
            .map_err(|e| BatchError::new(Stage::OpenOutput, e))?;
        info!("writing results to {}", output.display());

        self.run_with_engine(&engine, queries, writer)
    }

    /// Rank `queries` with `engine` and write them through `writer`.
    pub fn run_with_engine<W: Write + Send>(
        &self,
        engine: &QueryExpansionEngine,
        queries: Vec<QueryRequest>,
        writer: RankingWriter<W>,
    ) -> BatchResult<BatchReport> {
        let (queries, duplicates) = dedupe(queries);
        let threads = self.config.threads.max(1);
        let timeout = self.config.query_timeout();
        let cancel = &self.cancel;
        let metrics = MetricsCollector::new();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("prf-worker-{i}"))
            .build()
            .map_err(|e| {
                BatchError::new(
                    Stage::Search,
                    PrfError::other(format!("failed to create thread pool: {e}")),
                )
            })?;

        info!("ranking {} queries on {threads} threads", queries.len());

        let (tx, rx) = bounded::<(usize, QueryOutcome)>(threads * 2);
        let joined = std::thread::scope(|scope| {
            let writer_thread = scope.spawn(move || write_outcomes(rx, writer, cancel));

            pool.install(|| {
                queries
                    .par_iter()
                    .enumerate()
                    .for_each_with(tx, |tx, (seq, query)| {
                        let outcome = run_query(engine, query, timeout, cancel, &metrics);
                        // The writer stops listening after a fatal error.
                        let _ = tx.send((seq, outcome));
                    });
            });

            writer_thread.join()
        });

        let mut report = joined.map_err(|_| {
            BatchError::new(Stage::Write, PrfError::other("writer thread panicked"))
        })??;
        report.duplicates = duplicates;
        report.metrics = metrics.snapshot();

        info!(
            "ranked {} queries in {:.2?} ({:.1} queries/s): {} written, {} failed, {} skipped",
            queries.len(),
            report.metrics.elapsed,
            report.metrics.queries_per_second(),
            report.written.len(),
            report.failures.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

/// Keep the first query of every id.
fn dedupe(queries: Vec<QueryRequest>) -> (Vec<QueryRequest>, Vec<u32>) {
    let mut seen = AHashSet::with_capacity(queries.len());
    let mut duplicates = Vec::new();
    let kept = queries
        .into_iter()
        .filter(|query| {
            if seen.insert(query.id) {
                true
            } else {
                warn!("duplicate query id {}, keeping the first occurrence", query.id);
                duplicates.push(query.id);
                false
            }
        })
        .collect();
    (kept, duplicates)
}

fn run_query(
    engine: &QueryExpansionEngine,
    query: &QueryRequest,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
    metrics: &MetricsCollector,
) -> QueryOutcome {
    if cancel.is_cancelled() {
        return QueryOutcome::Skipped { query_id: query.id };
    }

    let started = Instant::now();
    let deadline = timeout.map(|t| started + t);
    match engine.expand_until(query.id, &query.text, deadline) {
        Ok((hits, trace)) => {
            let added = if trace.expanded { trace.terms.len() } else { 0 };
            metrics.record_ranked(started.elapsed(), added, hits.len());
            QueryOutcome::Ranked {
                query_id: query.id,
                hits,
            }
        }
        Err(error) => {
            metrics.record_failed(started.elapsed());
            QueryOutcome::Failed {
                query_id: query.id,
                error,
            }
        }
    }
}

/// Writer loop: reorders outcomes by input position and writes them.
fn write_outcomes<W: Write>(
    rx: Receiver<(usize, QueryOutcome)>,
    mut writer: RankingWriter<W>,
    cancel: &CancellationToken,
) -> BatchResult<BatchReport> {
    let mut report = BatchReport::default();
    let mut pending: BTreeMap<usize, QueryOutcome> = BTreeMap::new();
    let mut next = 0;

    for (seq, outcome) in rx {
        pending.insert(seq, outcome);

        while let Some(outcome) = pending.remove(&next) {
            next += 1;
            match outcome {
                QueryOutcome::Ranked { query_id, .. } if cancel.is_cancelled() => {
                    info!("discarding query {query_id}: batch cancelled");
                    report.skipped.push(query_id);
                }
                QueryOutcome::Ranked { query_id, hits } => {
                    if let Err(e) = writer.write_query(query_id, &hits) {
                        error!("writing query {query_id} failed: {e}");
                        cancel.cancel();
                        return Err(BatchError::new(Stage::Write, e));
                    }
                    report.written.push(query_id);
                }
                QueryOutcome::Failed { query_id, error } if error.is_query_scoped() => {
                    warn!("query {query_id} failed: {error}");
                    report.failures.push(QueryFailure { query_id, error });
                }
                QueryOutcome::Failed { query_id, error } => {
                    error!("query {query_id} stopped the batch: {error}");
                    cancel.cancel();
                    return Err(BatchError::new(Stage::Search, error));
                }
                QueryOutcome::Skipped { query_id } => report.skipped.push(query_id),
            }
        }
    }

    report.lines = writer.lines_written();
    report.cancelled = cancel.is_cancelled();
    writer
        .finish()
        .map_err(|e| BatchError::new(Stage::Write, e))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::query::{Query, TermQuery};
    use crate::search::{RetrievalEngine, TermStatistics};
    use crossbeam_channel::{Sender, unbounded};
    use std::io;

    /// Returns one hit per query, named after the parsed query. The query
    /// "slow" takes 600ms per search.
    struct EchoEngine;

    impl RetrievalEngine for EchoEngine {
        fn parse_query(&self, text: &str) -> Result<Box<dyn Query>> {
            match text {
                "bad" => Err(PrfError::query_parse("malformed")),
                "broken" => Err(PrfError::index_unavailable("index vanished")),
                _ => Ok(Box::new(TermQuery::new("text", text))),
            }
        }

        fn search(&self, query: &dyn Query, limit: usize) -> Result<Vec<Hit>> {
            if query.description() == "text:slow" {
                std::thread::sleep(Duration::from_millis(600));
            }
            let mut hits = vec![Hit::new(0, query.description(), 1.0)];
            hits.truncate(limit);
            Ok(hits)
        }

        fn stored_field(&self, _doc: u32, _field: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn tokenize(&self, text: &str) -> Result<Vec<String>> {
            Ok(text.split_whitespace().map(str::to_string).collect())
        }
    }

    impl TermStatistics for EchoEngine {
        fn doc_freq(&self, _field: &str, _term: &str) -> Result<u64> {
            Ok(1)
        }

        fn doc_count(&self, _field: &str) -> Result<u64> {
            Ok(10)
        }
    }

    fn engine() -> QueryExpansionEngine {
        let echo = Arc::new(EchoEngine);
        QueryExpansionEngine::new(echo.clone(), echo, ExpansionConfig::default())
    }

    /// Cancels the batch while ranking "halt", once one query is flushed.
    struct HaltingEngine {
        cancel: CancellationToken,
        flushes: Receiver<()>,
    }

    impl RetrievalEngine for HaltingEngine {
        fn parse_query(&self, text: &str) -> Result<Box<dyn Query>> {
            EchoEngine.parse_query(text)
        }

        fn search(&self, query: &dyn Query, limit: usize) -> Result<Vec<Hit>> {
            if query.description() == "text:halt" && !self.cancel.is_cancelled() {
                let _ = self.flushes.recv_timeout(Duration::from_secs(5));
                self.cancel.cancel();
            }
            EchoEngine.search(query, limit)
        }

        fn stored_field(&self, doc: u32, field: &str) -> Result<Option<String>> {
            EchoEngine.stored_field(doc, field)
        }

        fn tokenize(&self, text: &str) -> Result<Vec<String>> {
            EchoEngine.tokenize(text)
        }
    }

    impl TermStatistics for HaltingEngine {
        fn doc_freq(&self, field: &str, term: &str) -> Result<u64> {
            EchoEngine.doc_freq(field, term)
        }

        fn doc_count(&self, field: &str) -> Result<u64> {
            EchoEngine.doc_count(field)
        }
    }

    /// Collects output and reports every flush.
    struct FlushNotifier<'a> {
        out: &'a mut Vec<u8>,
        flushes: Sender<()>,
    }

    impl Write for FlushNotifier<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.out.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            let _ = self.flushes.send(());
            Ok(())
        }
    }

    fn queries(texts: &[(u32, &str)]) -> Vec<QueryRequest> {
        texts
            .iter()
            .map(|(id, text)| QueryRequest::new(*id, *text))
            .collect()
    }

    fn run(threads: usize, batch: Vec<QueryRequest>) -> (BatchResult<BatchReport>, String) {
        let runner = BatchRunner::new(RunConfig::default().with_threads(threads));
        let mut out = Vec::new();
        let result = runner.run_with_engine(&engine(), batch, RankingWriter::new(&mut out, "t"));
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_output_follows_input_order() {
        let batch: Vec<QueryRequest> = (1..=40)
            .map(|i| QueryRequest::new(i, format!("q{i}")))
            .collect();
        let (result, output) = run(4, batch);
        let report = result.unwrap();

        assert_eq!(report.written, (1..=40).collect::<Vec<u32>>());
        let first_column: Vec<&str> = output
            .lines()
            .map(|line| line.split(' ').next().unwrap())
            .collect();
        let expected: Vec<String> = (1..=40).map(|i| i.to_string()).collect();
        assert_eq!(first_column, expected);
        assert_eq!(report.lines, 40);
    }

    #[test]
    fn test_fault_isolation() {
        let (result, output) = run(2, queries(&[(1, "alpha"), (2, "bad"), (3, "gamma")]));
        let report = result.unwrap();

        assert_eq!(report.written, vec![1, 3]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].query_id, 2);
        assert!(matches!(report.failures[0].error, PrfError::QueryParse(_)));
        assert_eq!(output, "1 0 text:alpha 0 1 t\n3 0 text:gamma 0 1 t\n");
    }

    #[test]
    fn test_run_level_error_stops_batch() {
        let (result, _) = run(1, queries(&[(1, "alpha"), (2, "broken"), (3, "gamma")]));
        let error = result.unwrap_err();

        assert_eq!(error.stage, Stage::Search);
        assert!(matches!(error.source, PrfError::IndexUnavailable(_)));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let (result, output) = run(1, queries(&[(7, "first"), (7, "second")]));
        let report = result.unwrap();

        assert_eq!(report.written, vec![7]);
        assert_eq!(report.duplicates, vec![7]);
        assert_eq!(output, "7 0 text:first 0 1 t\n");
    }

    #[test]
    fn test_cancelled_batch_writes_nothing_new() {
        let token = CancellationToken::new();
        token.cancel();
        let runner = BatchRunner::new(RunConfig::default().with_threads(2))
            .with_cancellation(token.clone());

        let mut out = Vec::new();
        let report = runner
            .run_with_engine(
                &engine(),
                queries(&[(1, "alpha"), (2, "beta")]),
                RankingWriter::new(&mut out, "t"),
            )
            .unwrap();

        assert!(report.cancelled);
        assert!(report.written.is_empty());
        assert_eq!(report.skipped, vec![1, 2]);
        assert!(out.is_empty());
        assert!(runner.cancellation_token().is_cancelled());
    }

    #[test]
    fn test_slow_query_times_out_and_batch_continues() {
        let runner = BatchRunner::new(
            RunConfig::default()
                .with_threads(2)
                .with_query_timeout_ms(Some(200)),
        );
        let mut out = Vec::new();
        let report = runner
            .run_with_engine(
                &engine(),
                queries(&[(1, "alpha"), (2, "slow"), (3, "gamma")]),
                RankingWriter::new(&mut out, "t"),
            )
            .unwrap();

        assert_eq!(report.written, vec![1, 3]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].query_id, 2);
        assert!(matches!(report.failures[0].error, PrfError::Timeout(_)));
        assert!(!report.cancelled);
        assert_eq!(report.metrics.failed_queries, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1 0 text:alpha 0 1 t\n3 0 text:gamma 0 1 t\n"
        );
    }

    #[test]
    fn test_cancel_mid_batch_keeps_written_lines() {
        let token = CancellationToken::new();
        let (flush_tx, flush_rx) = unbounded();
        let halting = Arc::new(HaltingEngine {
            cancel: token.clone(),
            flushes: flush_rx,
        });
        let engine =
            QueryExpansionEngine::new(halting.clone(), halting, ExpansionConfig::default());
        let runner =
            BatchRunner::new(RunConfig::default().with_threads(1)).with_cancellation(token);

        let mut out = Vec::new();
        let writer = RankingWriter::new(
            FlushNotifier {
                out: &mut out,
                flushes: flush_tx,
            },
            "t",
        );
        let report = runner
            .run_with_engine(
                &engine,
                queries(&[(1, "alpha"), (2, "halt"), (3, "gamma")]),
                writer,
            )
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.written, vec![1]);
        assert_eq!(report.skipped, vec![2, 3]);
        assert!(report.failures.is_empty());
        assert_eq!(String::from_utf8(out).unwrap(), "1 0 text:alpha 0 1 t\n");
    }

    #[test]
    fn test_stage_display() {
        let error = BatchError::new(Stage::OpenIndex, PrfError::index_unavailable("gone"));
        assert_eq!(error.to_string(), "open index failed: Index unavailable: gone");
    }
}
