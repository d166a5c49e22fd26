//! C5 — SPIMI Indexer.
//!
//! Streams processed documents, accumulates them into a
//! [`PostingsDictionary`], and flushes to a block file whenever the
//! [`MemoryMonitor`] reports memory pressure over threshold. Records the
//! review-ids table and the document-length table as it goes.

use std::path::PathBuf;

use crate::config::ProcessorConfig;
use crate::corpus::RawReview;
use crate::dictionary::{DocumentOrdinal, PostingsDictionary};
use crate::directory::{IndexDirectory, ReviewIdWriter};
use crate::error::IndexerError;
use crate::memory::MemoryMonitor;
use crate::processor;
use crate::scoring::ScoringFormat;

pub struct SpimiOutput {
    pub block_paths: Vec<PathBuf>,
    pub document_lengths: Vec<f64>,
}

/// Runs the full ingestion loop over `reviews`. On any I/O failure while
/// flushing, deletes the partial block before propagating the error.
pub fn index_reviews(
    reviews: impl Iterator<Item = Result<RawReview, IndexerError>>,
    processor_config: &ProcessorConfig,
    scoring_format: &ScoringFormat,
    memory_monitor: &mut MemoryMonitor,
    index_dir: &mut IndexDirectory,
    progress: &indicatif::ProgressBar,
) -> Result<SpimiOutput, IndexerError> {
    let mut dictionary = PostingsDictionary::new();
    let mut review_id_writer = ReviewIdWriter::create(index_dir)?;
    let mut document_lengths = Vec::new();
    let mut block_paths = Vec::new();
    let mut next_ordinal: DocumentOrdinal = 0;

    for raw_review in reviews {
        let raw_review = raw_review?;

        if !memory_monitor.under_threshold() && !dictionary.is_empty() {
            let block_path = flush(&dictionary, index_dir)?;
            block_paths.push(block_path);
            dictionary = PostingsDictionary::new();
        }

        let processed = processor::process(&raw_review.review_id, &raw_review.text, processor_config);

        review_id_writer.append(&processed.review_id)?;
        let length_stat =
            scoring_format.document_length_stat(&processed.term_frequencies, processed.raw_token_count);
        document_lengths.push(length_stat);

        dictionary.add_document(next_ordinal, &processed);
        next_ordinal += 1;
        progress.inc(1);
    }

    review_id_writer.flush()?;

    if !dictionary.is_empty() {
        let block_path = flush(&dictionary, index_dir)?;
        block_paths.push(block_path);
    }

    Ok(SpimiOutput { block_paths, document_lengths })
}

fn flush(dictionary: &PostingsDictionary, index_dir: &mut IndexDirectory) -> Result<PathBuf, IndexerError> {
    let path = index_dir.next_block_path();
    crate::block::write_block(dictionary, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::IndexCreationOption;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn reviews(pairs: &[(&str, &str)]) -> Vec<Result<RawReview, IndexerError>> {
        pairs
            .iter()
            .map(|(id, text)| {
                Ok(RawReview {
                    review_id: id.to_string(),
                    text: text.to_string(),
                })
            })
            .collect()
    }

    #[test]
    fn empty_corpus_produces_zero_blocks_and_empty_review_ids() {
        let tmp = tempdir().unwrap();
        let mut dir = IndexDirectory::create(tmp.path().join("idx"), IndexCreationOption::ErrorOnExists).unwrap();
        let processor_config = ProcessorConfig {
            min_token_length: 1,
            stopwords: HashSet::new(),
            use_stemmer: false,
        };
        let mut monitor = MemoryMonitor::new(1.0);
        let bar = indicatif::ProgressBar::hidden();

        let output = index_reviews(
            std::iter::empty(),
            &processor_config,
            &ScoringFormat::TfIdf,
            &mut monitor,
            &mut dir,
            &bar,
        )
        .unwrap();

        assert!(output.block_paths.is_empty());
        assert!(output.document_lengths.is_empty());
        assert_eq!(crate::directory::read_review_ids(&dir).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn residual_dictionary_flushes_as_final_block() {
        let tmp = tempdir().unwrap();
        let mut dir = IndexDirectory::create(tmp.path().join("idx"), IndexCreationOption::ErrorOnExists).unwrap();
        let processor_config = ProcessorConfig {
            min_token_length: 1,
            stopwords: HashSet::new(),
            use_stemmer: false,
        };
        let mut monitor = MemoryMonitor::new(1.0); // never pressured, one block only
        let bar = indicatif::ProgressBar::hidden();

        let output = index_reviews(
            reviews(&[("R1", "alpha beta"), ("R2", "beta gamma")]).into_iter(),
            &processor_config,
            &ScoringFormat::TfIdf,
            &mut monitor,
            &mut dir,
            &bar,
        )
        .unwrap();

        assert_eq!(output.block_paths.len(), 1);
        assert_eq!(output.document_lengths.len(), 2);
        assert_eq!(
            crate::directory::read_review_ids(&dir).unwrap(),
            vec!["R1".to_string(), "R2".to_string()]
        );
    }

    #[test]
    fn forced_pressure_flushes_every_document() {
        let tmp = tempdir().unwrap();
        let mut dir = IndexDirectory::create(tmp.path().join("idx"), IndexCreationOption::ErrorOnExists).unwrap();
        let processor_config = ProcessorConfig {
            min_token_length: 1,
            stopwords: HashSet::new(),
            use_stemmer: false,
        };
        let mut monitor = MemoryMonitor::new(0.0); // always "over" threshold
        let bar = indicatif::ProgressBar::hidden();

        let output = index_reviews(
            reviews(&[("R1", "a"), ("R2", "b"), ("R3", "c")]).into_iter(),
            &processor_config,
            &ScoringFormat::TfIdf,
            &mut monitor,
            &mut dir,
            &bar,
        )
        .unwrap();

        // First doc can't trigger a flush (dictionary starts empty); the
        // remaining two each force a flush of the prior doc, then the
        // residual third doc flushes at the end: three blocks total.
        assert_eq!(output.block_paths.len(), 3);
    }
}
