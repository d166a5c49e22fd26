//! C14 — Evaluator.
//!
//! Reads a TREC-qrels-flavored relevance-judgments file (`query_id
//! review_id relevance`), runs each query against the index, and reports
//! precision@k / recall@k per query plus a macro-averaged summary. New
//! relative to the teacher crate (which has no evaluation harness);
//! grounded in `original_source/src/main.py`'s `Evaluator` / results-file
//! shape, generalized into an ordinary library function so it can run
//! independent queries in parallel with `rayon` (query evaluation has no
//! shared mutable state and no ordering requirement across queries,
//! unlike the indexing core which must stay single-threaded).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use rayon::prelude::*;

use crate::config::{Config, ProcessorConfig};
use crate::error::IndexerError;
use crate::scoring::ScoringFormat;
use crate::segment::SegmentIndex;

/// One query's relevant review ids.
pub struct RelevanceJudgments {
    judgments: HashMap<String, HashSet<String>>,
}

impl RelevanceJudgments {
    /// Parses `query_id review_id relevance` lines; only relevance != 0
    /// counts as relevant.
    pub fn read(path: &Path) -> Result<Self, IndexerError> {
        let text = fs::read_to_string(path).map_err(|source| IndexerError::CorpusIo {
            path: path.to_path_buf(),
            source,
        })?;

        let mut judgments: HashMap<String, HashSet<String>> = HashMap::new();
        for line in text.lines() {
            let mut fields = line.split_whitespace();
            let (Some(query_id), Some(review_id), Some(relevance)) =
                (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            if relevance.parse::<f64>().unwrap_or(0.0) > 0.0 {
                judgments.entry(query_id.to_string()).or_default().insert(review_id.to_string());
            }
        }
        Ok(Self { judgments })
    }

    fn relevant_for(&self, query_id: &str) -> &HashSet<String> {
        static EMPTY: std::sync::OnceLock<HashSet<String>> = std::sync::OnceLock::new();
        self.judgments.get(query_id).unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }
}

pub struct QueryMetrics {
    pub query_id: String,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
}

pub struct EvaluationReport {
    pub per_query: Vec<QueryMetrics>,
    pub mean_precision_at_k: f64,
    pub mean_recall_at_k: f64,
}

/// Runs every `(query_id, query_text)` pair through the evaluator,
/// scoring against `judgments`. Queries are independent of each other
/// and of ingestion order, so they fan out across `rayon`'s pool.
pub fn evaluate(
    queries: &[(String, String)],
    judgments: &RelevanceJudgments,
    config: &Config,
    scoring_format: &ScoringFormat,
    segment_index: &SegmentIndex,
    review_ids: &[String],
    total_docs: u64,
    top_k: usize,
) -> Result<EvaluationReport, IndexerError> {
    let processor_config: ProcessorConfig = config.processor.clone();

    let per_query: Vec<QueryMetrics> = queries
        .par_iter()
        .map(|(query_id, query_text)| {
            let results = crate::query::search(
                query_text,
                &processor_config,
                scoring_format,
                segment_index,
                review_ids,
                total_docs,
                top_k,
            )?;

            let relevant = judgments.relevant_for(query_id);
            let retrieved_relevant = results
                .iter()
                .filter(|(review_id, _)| relevant.contains(review_id))
                .count();

            let precision_at_k = if results.is_empty() {
                0.0
            } else {
                retrieved_relevant as f64 / results.len() as f64
            };
            let recall_at_k = if relevant.is_empty() {
                0.0
            } else {
                retrieved_relevant as f64 / relevant.len() as f64
            };

            Ok(QueryMetrics { query_id: query_id.clone(), precision_at_k, recall_at_k })
        })
        .collect::<Result<Vec<_>, IndexerError>>()?;

    let n = per_query.len().max(1) as f64;
    let mean_precision_at_k = per_query.iter().map(|m| m.precision_at_k).sum::<f64>() / n;
    let mean_recall_at_k = per_query.iter().map(|m| m.recall_at_k).sum::<f64>() / n;

    Ok(EvaluationReport { per_query, mean_precision_at_k, mean_recall_at_k })
}

/// Writes a human-readable report, modeled on the original source's
/// fixed-width results table.
pub fn write_report(report: &EvaluationReport, path: &Path) -> Result<(), IndexerError> {
    let mut out = String::new();
    out.push_str(&format!("{:>20}  {:>12}  {:>12}\n", "QUERY ID", "PRECISION@K", "RECALL@K"));
    for metrics in &report.per_query {
        out.push_str(&format!(
            "{:>20}  {:>12.4}  {:>12.4}\n",
            metrics.query_id, metrics.precision_at_k, metrics.recall_at_k
        ));
    }
    out.push_str(&format!(
        "\n{:>20}  {:>12.4}  {:>12.4}\n",
        "MEAN", report.mean_precision_at_k, report.mean_recall_at_k
    ));
    fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::tempdir;

    #[test]
    fn parses_positive_relevance_only() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("qrels.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "q1 R1 1").unwrap();
        writeln!(file, "q1 R2 0").unwrap();
        drop(file);

        let judgments = RelevanceJudgments::read(&path).unwrap();
        assert!(judgments.relevant_for("q1").contains("R1"));
        assert!(!judgments.relevant_for("q1").contains("R2"));
        assert!(judgments.relevant_for("q2").is_empty());
    }
}
