//! C9 — Query Evaluator.
//!
//! Term-at-a-time scoring: process the query through the same
//! [`processor::process`] used at index time, weight each query term via
//! the active [`ScoringFormat`], stream each term's posting list once,
//! and return the top-k ordinals translated back to review ids.

use std::collections::HashMap;

use crate::config::ProcessorConfig;
use crate::dictionary::DocumentOrdinal;
use crate::error::IndexerError;
use crate::processor;
use crate::scoring::ScoringFormat;
use crate::segment::SegmentIndex;

pub const DEFAULT_TOP_K: usize = 10;

/// Runs one query end to end. `total_docs` is the index's document
/// count (`N` in the scoring formulas).
pub fn search(
    query_text: &str,
    processor_config: &ProcessorConfig,
    scoring_format: &ScoringFormat,
    segment_index: &SegmentIndex,
    review_ids: &[String],
    total_docs: u64,
    top_k: usize,
) -> Result<Vec<(String, f64)>, IndexerError> {
    let processed = processor::process("__query__", query_text, processor_config);
    if processed.term_frequencies.is_empty() {
        return Ok(Vec::new());
    }

    // Pass 1: resolve df for each distinct query term and compute the
    // per-term query weight once (not per posting).
    let mut document_frequencies: HashMap<String, u64> = HashMap::new();
    for term in processed.term_frequencies.keys() {
        if let Some(entry) = segment_index.find_term(term)? {
            document_frequencies.insert(term.clone(), entry.document_frequency);
        }
    }

    let query_weights = scoring_format.query_term_weights(&processed.term_frequencies, total_docs, |t| {
        document_frequencies.get(t).copied()
    });

    if query_weights.is_empty() {
        return Ok(Vec::new());
    }

    // Pass 2: stream each in-vocabulary term's posting list once,
    // accumulating `query_weight * payload` per document ordinal.
    let mut scores: HashMap<DocumentOrdinal, f64> = HashMap::new();
    for (term, query_weight) in &query_weights {
        let Some(entry) = segment_index.find_term(term)? else {
            continue; // UnknownTermSkip: contributes zero, not an error.
        };
        let postings = segment_index.read_postings(&entry)?;
        for (ordinal, payload) in postings {
            *scores.entry(ordinal).or_insert(0.0) += query_weight * payload;
        }
    }

    let mut ranked: Vec<(DocumentOrdinal, f64)> = scores.into_iter().collect();
    // Descending score, ties broken by ascending ordinal.
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
    ranked.truncate(top_k);

    let results = ranked
        .into_iter()
        .filter_map(|(ordinal, score)| {
            review_ids.get(ordinal as usize).map(|id| (id.clone(), score))
        })
        .collect();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Bm25Params;
    use crate::directory::{IndexCreationOption, IndexDirectory};
    use crate::processor::ProcessedDocument;
    use std::collections::HashMap as Map;
    use tempfile::tempdir;

    fn build_index(
        tmp: &std::path::Path,
        docs: &[(&str, &str)],
        scoring_format: &ScoringFormat,
        processor_config: &ProcessorConfig,
    ) -> (IndexDirectory, Vec<String>, f64) {
        let mut dir = IndexDirectory::create(tmp.join("idx"), IndexCreationOption::ErrorOnExists).unwrap();
        let mut dict = crate::dictionary::PostingsDictionary::new();
        let mut review_ids = Vec::new();
        let mut document_lengths = Vec::new();

        for (ordinal, (id, text)) in docs.iter().enumerate() {
            let processed = processor::process(id, text, processor_config);
            review_ids.push(processed.review_id.clone());
            document_lengths.push(scoring_format.document_length_stat(&processed.term_frequencies, processed.raw_token_count));
            dict.add_document(ordinal as u32, &processed);
        }

        let p0 = dir.next_block_path();
        crate::block::write_block(&dict, &p0).unwrap();
        let merge_output = crate::merge::merge_blocks(&[p0], &document_lengths, scoring_format, &dir, false).unwrap();

        let _ = ProcessedDocument {
            review_id: String::new(),
            raw_token_count: 0,
            term_frequencies: Map::new(),
        }; // silence unused import in some configurations

        (dir, review_ids, merge_output.avgdl)
    }

    fn no_filter_config() -> ProcessorConfig {
        ProcessorConfig { min_token_length: 1, stopwords: Default::default(), use_stemmer: false }
    }

    #[test]
    fn s1_empty_corpus_returns_empty_results() {
        let tmp = tempdir().unwrap();
        let cfg = no_filter_config();
        let (dir, review_ids, _) = build_index(tmp.path(), &[], &ScoringFormat::TfIdf, &cfg);
        let segment_index = SegmentIndex::load(&dir.segments_dir()).unwrap();

        let results = search("anything", &cfg, &ScoringFormat::TfIdf, &segment_index, &review_ids, 0, DEFAULT_TOP_K).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn s2_single_document_zero_idf_returns_zero_score_hit() {
        let tmp = tempdir().unwrap();
        let cfg = no_filter_config();
        let (dir, review_ids, _) = build_index(
            tmp.path(),
            &[("R1", "alpha beta alpha")],
            &ScoringFormat::TfIdf,
            &cfg,
        );
        let segment_index = SegmentIndex::load(&dir.segments_dir()).unwrap();

        let results = search("alpha", &cfg, &ScoringFormat::TfIdf, &segment_index, &review_ids, 1, DEFAULT_TOP_K).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "R1");
        assert!((results[0].1 - 0.0).abs() < 1e-12);
    }

    #[test]
    fn s3_bm25_orders_by_length_normalized_term_frequency() {
        let tmp = tempdir().unwrap();
        let cfg = no_filter_config();
        let format = ScoringFormat::Bm25(Bm25Params { k1: 1.2, b: 0.75 });
        let (dir, review_ids, avgdl) = build_index(
            tmp.path(),
            &[("R1", "cat"), ("R2", "cat cat"), ("R3", "cat dog")],
            &format,
            &cfg,
        );
        assert!(avgdl > 0.0);
        let segment_index = SegmentIndex::load(&dir.segments_dir()).unwrap();

        let results = search("cat", &cfg, &format, &segment_index, &review_ids, 3, DEFAULT_TOP_K).unwrap();
        let order: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["R2", "R1", "R3"]);
    }

    #[test]
    fn s6_ties_break_by_ascending_ordinal() {
        let tmp = tempdir().unwrap();
        let cfg = no_filter_config();
        let format = ScoringFormat::TfIdf;
        let (dir, review_ids, _) = build_index(
            tmp.path(),
            &[("R1", "alpha"), ("R2", "alpha"), ("R3", "alpha")],
            &format,
            &cfg,
        );
        let segment_index = SegmentIndex::load(&dir.segments_dir()).unwrap();

        let results = search("alpha", &cfg, &format, &segment_index, &review_ids, 3, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "R1");
        assert_eq!(results[1].0, "R2");
    }

    #[test]
    fn unknown_query_term_yields_empty_results_not_error() {
        let tmp = tempdir().unwrap();
        let cfg = no_filter_config();
        let (dir, review_ids, _) = build_index(tmp.path(), &[("R1", "alpha")], &ScoringFormat::TfIdf, &cfg);
        let segment_index = SegmentIndex::load(&dir.segments_dir()).unwrap();

        let results = search("zzz", &cfg, &ScoringFormat::TfIdf, &segment_index, &review_ids, 1, DEFAULT_TOP_K).unwrap();
        assert!(results.is_empty());
    }
}
