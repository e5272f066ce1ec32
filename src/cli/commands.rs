//! Command implementations for prf-rank CLI.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};

use crate::analysis::AnalyzerKind;
use crate::batch::{BatchError, BatchRunner, QueryRequest, Stage};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::RunConfig;
use crate::error::PrfError;
use crate::index::{IndexWriter, META_FILE};
use crate::trec::{read_corpus, read_topics};

type CommandResult<T> = std::result::Result<T, BatchError>;

/// Execute a CLI command.
pub fn execute_command(args: PrfRankArgs) -> CommandResult<()> {
    let config = load_config(&args)?;

    match &args.command {
        Command::Index(index_args) => {
            let analyzer = index_args.analyzer.unwrap_or(config.analyzer);
            build_index(
                &index_args.index_path,
                &index_args.corpus,
                analyzer,
                index_args.force,
                &args,
            )
        }
        Command::Search(search_args) => {
            let config = finish_config(search_args.overrides.apply(config))?;
            rank_topics(
                &search_args.index_path,
                &search_args.topics,
                &search_args.output,
                config,
                &args,
            )
        }
        Command::Run(run_args) => {
            let config = finish_config(run_args.overrides.apply(config))?;
            build_index(
                &run_args.index_path,
                &run_args.corpus,
                config.analyzer,
                run_args.force,
                &args,
            )?;
            rank_topics(
                &run_args.index_path,
                &run_args.topics,
                &run_args.output,
                config,
                &args,
            )
        }
    }
}

fn load_config(args: &PrfRankArgs) -> CommandResult<RunConfig> {
    match &args.config {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            RunConfig::from_file(path).map_err(|e| BatchError::new(Stage::Configure, e))
        }
        None => Ok(RunConfig::default()),
    }
}

fn finish_config(config: RunConfig) -> CommandResult<RunConfig> {
    config
        .validate()
        .map_err(|e| BatchError::new(Stage::Configure, e))?;
    Ok(config)
}

/// Build an index from collection directories.
fn build_index(
    index_path: &Path,
    corpus: &[PathBuf],
    analyzer: AnalyzerKind,
    force: bool,
    cli_args: &PrfRankArgs,
) -> CommandResult<()> {
    if index_path.join(META_FILE).exists() && !force {
        return Err(BatchError::new(
            Stage::BuildIndex,
            PrfError::index(format!(
                "index already exists at {}; use --force to overwrite",
                index_path.display()
            )),
        ));
    }

    let start_time = Instant::now();
    let documents = read_corpus(corpus).map_err(|e| BatchError::new(Stage::ReadCorpus, e))?;
    if documents.is_empty() {
        warn!("no documents found in the corpus");
    }

    let meta = IndexWriter::create(index_path, analyzer)
        .and_then(|mut writer| {
            writer.add_documents(documents)?;
            writer.commit()
        })
        .map_err(|e| BatchError::new(Stage::BuildIndex, e))?;

    let duration = start_time.elapsed();
    let docs_per_second = if duration.as_secs_f64() > 0.0 {
        meta.doc_count as f64 / duration.as_secs_f64()
    } else {
        0.0
    };

    output_result(
        "Index built successfully",
        &IndexSummary {
            path: index_path.display().to_string(),
            analyzer: meta.analyzer.to_string(),
            documents: meta.doc_count,
            fields: meta.fields,
            duration_ms: duration.as_millis() as u64,
            docs_per_second,
        },
        cli_args,
    )
    .map_err(|e| BatchError::new(Stage::BuildIndex, e))
}

/// Rank every topic of a topic file into a results file.
fn rank_topics(
    index_path: &Path,
    topics_path: &Path,
    output: &Path,
    config: RunConfig,
    cli_args: &PrfRankArgs,
) -> CommandResult<()> {
    let topics = read_topics(topics_path).map_err(|e| BatchError::new(Stage::ReadTopics, e))?;
    let queries: Vec<QueryRequest> = topics
        .iter()
        .map(|topic| topic.to_request(&config.topic_fields))
        .collect();
    let query_count = queries.len();
    let run_tag = config.run_tag.clone();

    let report = BatchRunner::new(config).run(index_path, queries, output)?;
    if !report.failures.is_empty() {
        warn!("{} of {query_count} queries failed", report.failures.len());
    }

    let summary = RunSummary::from_report(
        output.display().to_string(),
        run_tag,
        query_count,
        &report,
    );
    output_result("Ranking finished", &summary, cli_args)
        .map_err(|e| BatchError::new(Stage::Write, e))
}
