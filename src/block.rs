//! C3 — Block Writer, plus the reader the External Merger pulls from.
//!
//! Block files are one line per term, ascending, `term<SP>ordinal:tf
//! ordinal:tf ...`. Textual and self-delimiting per term, per the stable
//! on-disk format the spec mandates.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::dictionary::{DocumentOrdinal, PostingsDictionary, RawTermFrequency};
use crate::error::IndexerError;

/// Serializes `dictionary` to `path`, one sorted line per term.
pub fn write_block(dictionary: &PostingsDictionary, path: &Path) -> Result<(), IndexerError> {
    let result = (|| -> Result<(), IndexerError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        for (term, postings) in dictionary.sorted_terms() {
            write!(writer, "{term}")?;
            for (ordinal, tf) in postings {
                write!(writer, " {ordinal}:{tf}")?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    })();

    if result.is_err() {
        // Best-effort cleanup of a partial block before propagating.
        let _ = std::fs::remove_file(path);
    }
    result
}

/// One parsed line from a block file.
pub struct BlockEntry {
    pub term: String,
    pub postings: Vec<(DocumentOrdinal, RawTermFrequency)>,
}

fn parse_line(line: &str) -> Option<BlockEntry> {
    let mut parts = line.split(' ');
    let term = parts.next()?.to_string();
    if term.is_empty() {
        return None;
    }

    let mut postings = Vec::new();
    for token in parts {
        let (ordinal, tf) = token.split_once(':')?;
        postings.push((ordinal.parse().ok()?, tf.parse().ok()?));
    }
    Some(BlockEntry { term, postings })
}

/// A streaming reader over one block file, used by the k-way merge.
pub struct BlockReader {
    lines: std::io::Lines<BufReader<File>>,
    path: PathBuf,
}

impl BlockReader {
    pub fn open(path: &Path) -> Result<Self, IndexerError> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path: path.to_path_buf(),
        })
    }

    /// Reads and parses the next entry, or `None` at EOF.
    pub fn next_entry(&mut self) -> Result<Option<BlockEntry>, IndexerError> {
        loop {
            match self.lines.next() {
                None => return Ok(None),
                Some(line) => {
                    let line = line?;
                    if line.is_empty() {
                        continue;
                    }
                    match parse_line(&line) {
                        Some(entry) => return Ok(Some(entry)),
                        None => {
                            return Err(IndexerError::InternalIo(std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                format!("malformed block line in {}", self.path.display()),
                            )));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_a_dictionary() {
        let mut dict = PostingsDictionary::new();
        use crate::processor::ProcessedDocument;
        use std::collections::HashMap;

        let mut tf = HashMap::new();
        tf.insert("alpha".to_string(), 2);
        dict.add_document(
            0,
            &ProcessedDocument {
                review_id: "R0".into(),
                raw_token_count: 2,
                term_frequencies: tf,
            },
        );

        let tmp = tempdir().unwrap();
        let path = tmp.path().join("block_0.txt");
        write_block(&dict, &path).unwrap();

        let mut reader = BlockReader::open(&path).unwrap();
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.term, "alpha");
        assert_eq!(entry.postings, vec![(0, 2)]);
        assert!(reader.next_entry().unwrap().is_none());
    }
}
