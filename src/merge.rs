//! C6 — External Merger.
//!
//! A k-way streaming merge of every block file into lexicographically
//! partitioned segments. Each segment is named by its first and last
//! term and holds a sorted vocabulary plus the concatenated, scored
//! posting lists for that term range.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::block::BlockReader;
use crate::dictionary::DocumentOrdinal;
use crate::directory::IndexDirectory;
use crate::error::IndexerError;
use crate::scoring::ScoringFormat;

/// Distinct terms per segment. Implementer's choice; fixed so merges
/// over identical input are deterministic run to run.
const SEGMENT_TERM_CAPACITY: usize = 2048;

struct HeapEntry {
    term: String,
    block_index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term && self.block_index == other.block_index
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse so BinaryHeap (a max-heap) yields the lexicographically
        // smallest term first; ties broken by ascending block index.
        other.term.cmp(&self.term).then(other.block_index.cmp(&self.block_index))
    }
}

struct PendingSegment {
    vocabulary: Vec<(String, u64, u64, u64)>, // term, df, offset, length
    postings_buffer: Vec<u8>,
}

impl PendingSegment {
    fn new() -> Self {
        Self { vocabulary: Vec::new(), postings_buffer: Vec::new() }
    }

    fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    fn finalize(&mut self, index_dir: &IndexDirectory) -> Result<(), IndexerError> {
        if self.is_empty() {
            return Ok(());
        }
        let first_term = &self.vocabulary.first().unwrap().0;
        let last_term = &self.vocabulary.last().unwrap().0;
        let (vocab_path, postings_path) = index_dir.make_segment_dir(first_term, last_term)?;

        std::fs::write(&postings_path, &self.postings_buffer)?;

        let mut writer = std::io::BufWriter::new(std::fs::File::create(&vocab_path)?);
        for (term, df, offset, length) in &self.vocabulary {
            writeln!(writer, "{term} {df} {offset} {length}")?;
        }
        writer.flush()?;

        self.vocabulary.clear();
        self.postings_buffer.clear();
        Ok(())
    }
}

pub struct MergeOutput {
    pub term_count: usize,
    pub avgdl: f64,
}

/// Runs the k-way merge over `block_paths`, writing segments under
/// `index_dir`. `document_lengths` is the complete, ordinal-indexed
/// table produced by the SPIMI Indexer.
pub fn merge_blocks(
    block_paths: &[PathBuf],
    document_lengths: &[f64],
    scoring_format: &ScoringFormat,
    index_dir: &IndexDirectory,
    retain_blocks: bool,
) -> Result<MergeOutput, IndexerError> {
    let avgdl = if document_lengths.is_empty() {
        0.0
    } else {
        document_lengths.iter().sum::<f64>() / document_lengths.len() as f64
    };

    if block_paths.is_empty() {
        return Ok(MergeOutput { term_count: 0, avgdl });
    }

    let mut readers: Vec<BlockReader> =
        block_paths.iter().map(|p| BlockReader::open(p)).collect::<Result<_, _>>()?;

    let mut current_entries: Vec<Option<crate::block::BlockEntry>> = Vec::with_capacity(readers.len());
    let mut heap = BinaryHeap::new();

    for (i, reader) in readers.iter_mut().enumerate() {
        let entry = reader.next_entry()?;
        if let Some(e) = &entry {
            heap.push(HeapEntry { term: e.term.clone(), block_index: i });
        }
        current_entries.push(entry);
    }

    let mut segment = PendingSegment::new();
    let mut term_count = 0usize;

    while let Some(HeapEntry { term, .. }) = heap.pop() {
        // Gather every block currently positioned at `term` (there may be
        // several entries with the same term bucketed in the heap; pop
        // them all before advancing).
        let mut contributing_blocks = vec![];
        // The just-popped entry's block index:
        // re-derive by scanning current_entries for blocks whose cached
        // term equals `term`; heap ties on the same term are adjacent at
        // the top, so drain them too.
        for (i, entry) in current_entries.iter().enumerate() {
            if let Some(e) = entry {
                if e.term == term {
                    contributing_blocks.push(i);
                }
            }
        }
        // Remove the duplicate heap entries for the blocks we're about to
        // consume (the one already popped plus any siblings).
        let mut remaining = BinaryHeap::new();
        while let Some(h) = heap.pop() {
            if h.term == term {
                continue;
            }
            remaining.push(h);
        }
        heap = remaining;

        let mut merged_postings: Vec<(DocumentOrdinal, u32)> = Vec::new();
        for &block_index in &contributing_blocks {
            if let Some(entry) = current_entries[block_index].take() {
                merged_postings.extend(entry.postings);
            }
            let next = readers[block_index].next_entry()?;
            if let Some(next_entry) = &next {
                heap.push(HeapEntry { term: next_entry.term.clone(), block_index });
            }
            current_entries[block_index] = next;
        }

        let df = merged_postings.len() as u64;

        let offset = segment.postings_buffer.len() as u64;
        {
            let mut line = Vec::new();
            for (ordinal, tf) in &merged_postings {
                let doc_length_stat = document_lengths.get(*ordinal as usize).copied().unwrap_or(0.0);
                let payload = scoring_format.posting_payload(*tf, doc_length_stat, avgdl);
                if !line.is_empty() {
                    line.push(b' ');
                }
                write!(line, "{ordinal}:{payload}")?;
            }
            line.push(b'\n');
            segment.postings_buffer.extend_from_slice(&line);
        }
        let length = segment.postings_buffer.len() as u64 - offset;

        segment.vocabulary.push((term, df, offset, length));
        term_count += 1;

        if segment.vocabulary.len() >= SEGMENT_TERM_CAPACITY {
            segment.finalize(index_dir)?;
        }
    }

    segment.finalize(index_dir)?;

    if !retain_blocks {
        index_dir.delete_blocks_dir()?;
    }

    Ok(MergeOutput { term_count, avgdl })
}

/// Lists segment directories in ascending first-term order, used by the
/// Segment Index loader. Exposed here because the directory naming
/// convention (`<first>-<last>`) is owned by the merge step.
pub fn list_segment_dirs(segments_root: &Path) -> Result<Vec<PathBuf>, IndexerError> {
    if !segments_root.exists() {
        return Ok(Vec::new());
    }
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(segments_root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}
