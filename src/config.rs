//! Typed configuration record, threaded explicitly through every
//! constructor instead of living in global parser state (see the
//! "Global mutable state" redesign flag).

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::IndexerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringFormatTag {
    TfIdf,
    Bm25,
}

impl ScoringFormatTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringFormatTag::TfIdf => "tf_idf",
            ScoringFormatTag::Bm25 => "bm25",
        }
    }
}

impl std::str::FromStr for ScoringFormatTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tf_idf" | "tfidf" | "tf-idf" => Ok(ScoringFormatTag::TfIdf),
            "bm25" => Ok(ScoringFormatTag::Bm25),
            other => Err(format!(
                "'{other}' is not a recognised indexing format (expected 'tf_idf' or 'bm25')"
            )),
        }
    }
}

/// BM25 tuning parameters. Defaults come from Robertson & Zaragoza.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Everything the processor needs to turn raw text into normalized terms,
/// shared verbatim between index build and query time.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub min_token_length: usize,
    pub stopwords: HashSet<String>,
    pub use_stemmer: bool,
}

/// The fully resolved, validated configuration for an indexing run.
#[derive(Debug, Clone)]
pub struct Config {
    pub corpus_path: PathBuf,
    pub index_path: PathBuf,
    pub processor: ProcessorConfig,
    pub memory_threshold: f64,
    pub scoring_format: ScoringFormatTag,
    pub bm25: Bm25Params,
    /// Overwrite an existing index at `index_path` instead of erroring.
    pub overwrite: bool,
    /// Retain block files under `blocks/` after merging, for inspection.
    pub debug_mode: bool,
}

/// One initializer for every default, matching the original source's
/// `default_arguments` dict in spirit.
pub fn default_config(corpus_path: PathBuf, index_path: PathBuf) -> Config {
    Config {
        corpus_path,
        index_path,
        processor: ProcessorConfig {
            min_token_length: 3,
            stopwords: HashSet::new(),
            use_stemmer: true,
        },
        memory_threshold: 0.5,
        scoring_format: ScoringFormatTag::TfIdf,
        bm25: Bm25Params::default(),
        overwrite: false,
        debug_mode: false,
    }
}

pub fn validate_min_token_length(value: i64) -> Result<usize, IndexerError> {
    if value < 0 {
        return Err(IndexerError::Configuration(format!(
            "minimum token length ({value}) must not be negative"
        )));
    }
    Ok(value as usize)
}

pub fn validate_unit_interval(value: f64) -> Result<f64, IndexerError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(IndexerError::Configuration(format!(
            "value ({value}) is not a float between 0.0 and 1.0"
        )));
    }
    Ok(value)
}
