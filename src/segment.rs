//! C7 — Segment Index.
//!
//! Loads the list of segment directories once, sorted by first term, and
//! locates a term's vocabulary entry by binary-searching segment
//! boundaries and then the segment's own sorted vocabulary file.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use crate::dictionary::DocumentOrdinal;
use crate::error::IndexerError;

#[derive(Debug, Clone)]
pub struct VocabularyEntry {
    pub term: String,
    pub document_frequency: u64,
    pub postings_offset: u64,
    pub postings_length: u64,
}

struct Segment {
    first_term: String,
    last_term: String,
    vocabulary_path: PathBuf,
    postings_path: PathBuf,
}

pub struct SegmentIndex {
    segments: Vec<Segment>,
}

fn parse_vocabulary_line(line: &str) -> Option<VocabularyEntry> {
    let mut parts = line.rsplitn(4, ' ');
    let length: u64 = parts.next()?.parse().ok()?;
    let offset: u64 = parts.next()?.parse().ok()?;
    let df: u64 = parts.next()?.parse().ok()?;
    let term = parts.next()?.to_string();
    Some(VocabularyEntry {
        term,
        document_frequency: df,
        postings_offset: offset,
        postings_length: length,
    })
}

impl SegmentIndex {
    /// Loads every segment under `segments_root`, sorted by first term.
    pub fn load(segments_root: &std::path::Path) -> Result<Self, IndexerError> {
        let dirs = crate::merge::list_segment_dirs(segments_root)?;
        let mut segments = Vec::with_capacity(dirs.len());

        for dir in dirs {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let (first_term, last_term) = name.split_once('-').unwrap_or(("", ""));
            segments.push(Segment {
                first_term: first_term.to_string(),
                last_term: last_term.to_string(),
                vocabulary_path: dir.join("vocabulary.txt"),
                postings_path: dir.join("postings.txt"),
            });
        }
        segments.sort_by(|a, b| a.first_term.cmp(&b.first_term));

        Ok(Self { segments })
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Binary-searches for the segment whose range could contain `term`,
    /// then scans its vocabulary file for the exact entry. Returns
    /// `None` if the term is not indexed.
    pub fn find_term(&self, term: &str) -> Result<Option<VocabularyEntry>, IndexerError> {
        let segment_index = match self
            .segments
            .binary_search_by(|segment| {
                if term < segment.first_term.as_str() {
                    std::cmp::Ordering::Greater
                } else if term > segment.last_term.as_str() {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            }) {
            Ok(i) => i,
            Err(_) => return Ok(None),
        };

        let segment = &self.segments[segment_index];
        let contents = fs::read_to_string(&segment.vocabulary_path)?;

        // The vocabulary file is sorted, so this could binary-search too;
        // a linear scan keeps the parser simple and is bounded by one
        // segment's worth of terms.
        for line in contents.lines() {
            if let Some(entry) = parse_vocabulary_line(line) {
                if entry.term == term {
                    return Ok(Some(entry));
                }
                if entry.term.as_str() > term {
                    break;
                }
            }
        }
        Ok(None)
    }

    /// Reads and parses the posting list addressed by `entry`.
    pub fn read_postings(&self, segment_hint: &VocabularyEntry) -> Result<Vec<(DocumentOrdinal, f64)>, IndexerError> {
        // Re-locate the owning segment by range (cheap linear scan; the
        // caller already paid for one `find_term` binary search and we
        // avoid threading segment identity through `VocabularyEntry`).
        let segment = self
            .segments
            .iter()
            .find(|s| segment_hint.term.as_str() >= s.first_term.as_str() && segment_hint.term.as_str() <= s.last_term.as_str())
            .ok_or_else(|| {
                IndexerError::InternalIo(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no segment owns term '{}'", segment_hint.term),
                ))
            })?;

        let mut file = fs::File::open(&segment.postings_path)?;
        file.seek(SeekFrom::Start(segment_hint.postings_offset))?;
        let mut buf = vec![0u8; segment_hint.postings_length as usize];
        file.read_exact(&mut buf)?;
        let line = String::from_utf8_lossy(&buf);

        let mut postings = Vec::new();
        for token in line.split_whitespace() {
            if let Some((ordinal, weight)) = token.split_once(':') {
                if let (Ok(ordinal), Ok(weight)) = (ordinal.parse(), weight.parse()) {
                    postings.push((ordinal, weight));
                }
            }
        }
        Ok(postings)
    }
}
