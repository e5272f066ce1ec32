//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::batch::BatchReport;
use crate::cli::args::{OutputFormat, PrfRankArgs};
use crate::error::Result;

/// Result structure for index creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSummary {
    pub path: String,
    pub analyzer: String,
    pub documents: u32,
    pub fields: Vec<String>,
    pub duration_ms: u64,
    pub docs_per_second: f64,
}

/// A query that failed during a run.
#[derive(Debug, Serialize, Deserialize)]
pub struct FailureSummary {
    pub query_id: u32,
    pub error: String,
}

/// Result structure for a ranking run.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub results: String,
    pub run_tag: String,
    pub queries: usize,
    pub written: usize,
    pub lines: u64,
    pub failed: Vec<FailureSummary>,
    pub skipped: Vec<u32>,
    pub duplicates: Vec<u32>,
    pub expanded_queries: u64,
    pub avg_query_ms: f64,
    pub max_query_ms: f64,
    pub queries_per_second: f64,
}

impl RunSummary {
    /// Summarize a finished batch.
    pub fn from_report(
        results: String,
        run_tag: String,
        queries: usize,
        report: &BatchReport,
    ) -> Self {
        RunSummary {
            results,
            run_tag,
            queries,
            written: report.written.len(),
            lines: report.lines,
            failed: report
                .failures
                .iter()
                .map(|f| FailureSummary {
                    query_id: f.query_id,
                    error: f.error.to_string(),
                })
                .collect(),
            skipped: report.skipped.clone(),
            duplicates: report.duplicates.clone(),
            expanded_queries: report.metrics.expanded_queries,
            avg_query_ms: report.metrics.avg_query_time.as_secs_f64() * 1000.0,
            max_query_ms: report.metrics.max_query_time.as_secs_f64() * 1000.0,
            queries_per_second: report.metrics.queries_per_second(),
        }
    }
}

/// Output a result in the requested format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &PrfRankArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &PrfRankArgs) -> Result<()> {
    if args.verbosity() == 0 {
        return Ok(());
    }

    println!("{message}");
    println!();

    let value = serde_json::to_value(result)?;
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in &obj {
                println!("{key}: {}", format_value(val));
            }
        }
        other => println!("{}", format_value(&other)),
    }
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &PrfRankArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.2}"),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| format!("{k}={}", format_value(v)))
            .collect::<Vec<_>>()
            .join(" "),
        serde_json::Value::Null => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("text")), "text");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!(1.23456)), "1.23");
        assert_eq!(format_value(&json!([401, 402])), "[401, 402]");
        assert_eq!(
            format_value(&json!([{"query_id": 7, "error": "bad"}])),
            "[error=bad query_id=7]"
        );
    }

    #[test]
    fn test_run_summary_from_report() {
        let report = BatchReport {
            written: vec![401, 402],
            skipped: vec![403],
            lines: 17,
            ..Default::default()
        };
        let summary = RunSummary::from_report("out.txt".into(), "tag".into(), 3, &report);
        assert_eq!(summary.written, 2);
        assert_eq!(summary.lines, 17);
        assert_eq!(summary.skipped, vec![403]);
        assert!(summary.failed.is_empty());
    }
}
