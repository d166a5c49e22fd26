//! C10 — Index Properties.
//!
//! The configuration that produced an index, persisted as
//! `properties.json` so a later query session can refuse to run against
//! mismatched normalization or scoring settings (they'd make query and
//! document terms incomparable).

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{Bm25Params, Config, ScoringFormatTag};
use crate::error::IndexerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexProperties {
    pub min_token_length: usize,
    pub stopwords: BTreeSet<String>,
    pub use_stemmer: bool,
    pub scoring_format: ScoringFormatTag,
    pub k1: f64,
    pub b: f64,
    pub avgdl: f64,
    pub document_count: u64,
}

impl IndexProperties {
    pub fn new(config: &Config, avgdl: f64, document_count: u64) -> Self {
        Self {
            min_token_length: config.processor.min_token_length,
            stopwords: config.processor.stopwords.iter().cloned().collect(),
            use_stemmer: config.processor.use_stemmer,
            scoring_format: config.scoring_format,
            k1: config.bm25.k1,
            b: config.bm25.b,
            avgdl,
            document_count,
        }
    }

    pub fn bm25_params(&self) -> Bm25Params {
        Bm25Params { k1: self.k1, b: self.b }
    }

    /// Writes `properties.json` atomically: a temp file in the same
    /// directory, then an in-filesystem rename. This is the final step
    /// of index creation; its presence is how callers detect a complete
    /// build.
    pub fn write_atomically(&self, path: &Path) -> Result<(), IndexerError> {
        let tmp_path = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self).map_err(std::io::Error::from)?;
            writer.flush()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, IndexerError> {
        let file = File::open(path)?;
        let properties = serde_json::from_reader(file).map_err(std::io::Error::from)?;
        Ok(properties)
    }

    /// Refuses to proceed if the caller's processor configuration would
    /// produce terms incomparable with what's stored in this index.
    pub fn check_compatible(&self, config: &Config) -> Result<(), IndexerError> {
        let caller_stopwords: BTreeSet<String> =
            config.processor.stopwords.iter().cloned().collect();

        if self.min_token_length != config.processor.min_token_length {
            return Err(IndexerError::PropertyMismatch(format!(
                "minimum token length differs: index was built with {}, query session uses {}",
                self.min_token_length, config.processor.min_token_length
            )));
        }
        if self.use_stemmer != config.processor.use_stemmer {
            return Err(IndexerError::PropertyMismatch(format!(
                "stemmer selection differs: index was built with stemmer={}, query session uses stemmer={}",
                self.use_stemmer, config.processor.use_stemmer
            )));
        }
        if self.stopwords != caller_stopwords {
            return Err(IndexerError::PropertyMismatch(
                "stopword set differs between index build and query session".to_string(),
            ));
        }
        if self.scoring_format != config.scoring_format {
            return Err(IndexerError::PropertyMismatch(format!(
                "scoring format differs: index uses {:?}, query session requests {:?}",
                self.scoring_format, config.scoring_format
            )));
        }
        Ok(())
    }
}
