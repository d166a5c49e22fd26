pub mod block;
pub mod config;
pub mod corpus;
pub mod dictionary;
pub mod directory;
pub mod error;
pub mod evaluate;
pub mod memory;
pub mod merge;
pub mod processor;
pub mod properties;
pub mod query;
pub mod scoring;
pub mod segment;
pub mod spimi;

use std::time::{Duration, Instant};

use config::Config;
use directory::{IndexCreationOption, IndexDirectory};
use error::IndexerError;
use memory::MemoryMonitor;
use properties::IndexProperties;
use scoring::ScoringFormat;
use segment::SegmentIndex;

/// Mirrors the original source's `IndexingStatistics` record, reported
/// by the CLI after a build completes.
pub struct IndexingStatistics {
    pub indexing_time: Duration,
    pub index_size_bytes: u64,
    pub term_count: usize,
    pub review_count: u64,
    pub blocks_used: usize,
}

/// Builds a complete index from `config.corpus_path` into
/// `config.index_path`. This is the top-level driver for C5/C6/C10: it
/// wires the Corpus Reader through the Processor into the SPIMI Indexer,
/// runs the External Merger, and writes `properties.json` last.
pub fn create_index(config: &Config) -> Result<IndexingStatistics, IndexerError> {
    let creation_option = if config.overwrite {
        IndexCreationOption::Overwrite
    } else {
        IndexCreationOption::ErrorOnExists
    };
    let mut index_dir = IndexDirectory::create(&config.index_path, creation_option)?;

    let start = Instant::now();

    let corpus_reader = corpus::CorpusReader::open(&config.corpus_path)?;
    let scoring_format = ScoringFormat::new(config.scoring_format, config.bm25);
    let mut memory_monitor = MemoryMonitor::new(config.memory_threshold);

    let progress = indicatif::ProgressBar::new_spinner();
    progress.set_message("Indexing reviews...");

    let spimi_output = spimi::index_reviews(
        corpus_reader,
        &config.processor,
        &scoring_format,
        &mut memory_monitor,
        &mut index_dir,
        &progress,
    )?;
    progress.finish_with_message(format!("Indexed {} reviews", spimi_output.document_lengths.len()));

    let review_count = spimi_output.document_lengths.len() as u64;

    eprintln!(
        "[SpimiIndexer]: Wrote {} block(s), merging into segments...",
        spimi_output.block_paths.len()
    );
    let merge_output = merge::merge_blocks(
        &spimi_output.block_paths,
        &spimi_output.document_lengths,
        &scoring_format,
        &index_dir,
        config.debug_mode,
    )?;

    let properties = IndexProperties::new(config, merge_output.avgdl, review_count);
    properties.write_atomically(&index_dir.properties_path())?;

    let indexing_time = start.elapsed();
    let index_size_bytes = index_dir.index_size()?;

    Ok(IndexingStatistics {
        indexing_time,
        index_size_bytes,
        term_count: merge_output.term_count,
        review_count,
        blocks_used: index_dir.block_count(),
    })
}

/// A loaded, query-ready index: segment index, review-id table, and the
/// properties used to enforce §4.C10's compatibility check.
pub struct QuerySession {
    pub properties: IndexProperties,
    pub segment_index: SegmentIndex,
    pub review_ids: Vec<String>,
    pub scoring_format: ScoringFormat,
}

impl QuerySession {
    /// Opens `index_path` for querying, refusing to proceed if `config`'s
    /// processor settings disagree with how the index was built.
    pub fn open(index_path: &std::path::Path, config: &Config) -> Result<Self, IndexerError> {
        let properties = IndexProperties::read(&index_path.join("properties.json"))?;
        properties.check_compatible(config)?;

        let segment_index = SegmentIndex::load(&index_path.join("segments"))?;
        let review_ids = directory::read_review_ids(&IndexDirectory::open_existing(index_path))?;
        let scoring_format = ScoringFormat::new(properties.scoring_format, properties.bm25_params());

        Ok(Self { properties, segment_index, review_ids, scoring_format })
    }

    pub fn search(&self, query_text: &str, config: &Config, top_k: usize) -> Result<Vec<(String, f64)>, IndexerError> {
        query::search(
            query_text,
            &config.processor,
            &self.scoring_format,
            &self.segment_index,
            &self.review_ids,
            self.properties.document_count,
            top_k,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{default_config, ScoringFormatTag};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn s1_empty_corpus_end_to_end() {
        let tmp = tempdir().unwrap();
        let corpus_path = tmp.path().join("corpus.txt");
        std::fs::File::create(&corpus_path).unwrap();
        let index_path = tmp.path().join("idx");

        let config = default_config(corpus_path, index_path.clone());
        let stats = create_index(&config).unwrap();

        assert_eq!(stats.review_count, 0);
        assert_eq!(stats.term_count, 0);
        assert_eq!(
            std::fs::read_to_string(index_path.join("review_ids.txt")).unwrap(),
            ""
        );

        let session = QuerySession::open(&index_path, &config).unwrap();
        let results = session.search("anything", &config, query::DEFAULT_TOP_K).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn full_pipeline_indexes_and_answers_a_query() {
        let tmp = tempdir().unwrap();
        let corpus_path = tmp.path().join("corpus.txt");
        {
            let mut file = std::fs::File::create(&corpus_path).unwrap();
            writeln!(file, "R1\tthe quick brown fox").unwrap();
            writeln!(file, "R2\tthe lazy dog sleeps").unwrap();
            writeln!(file, "R3\tquick foxes jump high").unwrap();
        }
        let index_path = tmp.path().join("idx");

        let mut config = default_config(corpus_path, index_path.clone());
        config.processor.min_token_length = 1;
        config.processor.use_stemmer = false;
        config.scoring_format = ScoringFormatTag::TfIdf;

        let stats = create_index(&config).unwrap();
        assert_eq!(stats.review_count, 3);
        assert!(stats.term_count > 0);

        let session = QuerySession::open(&index_path, &config).unwrap();
        let results = session.search("quick fox", &config, query::DEFAULT_TOP_K).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].0, "R1");
    }

    #[test]
    fn s5_property_mismatch_refuses_to_query() {
        let tmp = tempdir().unwrap();
        let corpus_path = tmp.path().join("corpus.txt");
        {
            let mut file = std::fs::File::create(&corpus_path).unwrap();
            writeln!(file, "R1\trunning runners ran").unwrap();
        }
        let index_path = tmp.path().join("idx");

        let mut build_config = default_config(corpus_path, index_path.clone());
        build_config.processor.use_stemmer = true;
        create_index(&build_config).unwrap();

        let mut query_config = build_config.clone();
        query_config.processor.use_stemmer = false;

        let result = QuerySession::open(&index_path, &query_config);
        assert!(matches!(result, Err(IndexerError::PropertyMismatch(_))));
    }

    #[test]
    fn index_exists_without_overwrite_is_an_error() {
        let tmp = tempdir().unwrap();
        let corpus_path = tmp.path().join("corpus.txt");
        std::fs::File::create(&corpus_path).unwrap();
        let index_path = tmp.path().join("idx");
        let config = default_config(corpus_path, index_path);

        create_index(&config).unwrap();
        let result = create_index(&config);
        assert!(matches!(result, Err(IndexerError::IndexExists(_))));
    }
}
