//! C12 — Corpus Reader.
//!
//! Lazily streams `(ReviewId, text)` pairs from the corpus file, one
//! record at a time, so the SPIMI Indexer never needs to hold the whole
//! corpus in memory. Two formats are recognised: CSV with a
//! `review_id,text` (or wider Amazon-reviews-shaped) header, and a
//! fallback tab-separated `id\ttext` line format.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::IndexerError;

pub struct RawReview {
    pub review_id: String,
    pub text: String,
}

enum Source {
    Csv(csv::Reader<File>),
    Lines { reader: BufReader<File> },
}

pub struct CorpusReader {
    source: Source,
    path: PathBuf,
}

fn looks_like_csv(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("csv") | Some("tsv")
    )
}

impl CorpusReader {
    pub fn open(path: &Path) -> Result<Self, IndexerError> {
        let map_open_err = |source: std::io::Error| IndexerError::CorpusIo { path: path.to_path_buf(), source };

        let source = if looks_like_csv(path) {
            let file = File::open(path).map_err(map_open_err)?;
            Source::Csv(csv::ReaderBuilder::new().has_headers(true).from_reader(file))
        } else {
            let file = File::open(path).map_err(map_open_err)?;
            Source::Lines { reader: BufReader::new(file) }
        };

        Ok(Self { source, path: path.to_path_buf() })
    }

    fn corpus_err(&self, source: std::io::Error) -> IndexerError {
        IndexerError::CorpusIo { path: self.path.clone(), source }
    }
}

impl Iterator for CorpusReader {
    type Item = Result<RawReview, IndexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            Source::Csv(reader) => {
                let headers = reader.headers().ok()?.clone();
                let id_index = headers.iter().position(|h| h.eq_ignore_ascii_case("review_id"));
                let text_index = headers
                    .iter()
                    .position(|h| h.eq_ignore_ascii_case("text") || h.eq_ignore_ascii_case("review_body"));

                let mut record = csv::StringRecord::new();
                match reader.read_record(&mut record) {
                    Ok(true) => {
                        let review_id = id_index
                            .and_then(|i| record.get(i))
                            .unwrap_or("")
                            .to_string();
                        let text = text_index
                            .and_then(|i| record.get(i))
                            .unwrap_or("")
                            .to_string();
                        Some(Ok(RawReview { review_id, text }))
                    }
                    Ok(false) => None,
                    Err(err) => Some(Err(self.corpus_err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        err,
                    )))),
                }
            }
            Source::Lines { reader } => loop {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) => return None,
                    Ok(_) => {
                        let line = line.trim_end_matches(['\n', '\r']);
                        match line.split_once('\t') {
                            Some((id, text)) => {
                                return Some(Ok(RawReview { review_id: id.to_string(), text: text.to_string() }));
                            }
                            None if line.is_empty() => continue,
                            None => {
                                return Some(Ok(RawReview { review_id: String::new(), text: line.to_string() }));
                            }
                        }
                    }
                    Err(err) => return Some(Err(self.corpus_err(err))),
                }
            },
        }
    }
}
