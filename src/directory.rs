//! C4 — Index Directory.
//!
//! Owns the on-disk layout and path allocation for a single index:
//! ```text
//! <root>/
//!   review_ids.txt
//!   properties.json
//!   blocks/
//!   segments/
//!     <first>-<last>/
//!       vocabulary.txt
//!       postings.txt
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::IndexerError;

pub enum IndexCreationOption {
    ErrorOnExists,
    Overwrite,
}

pub struct IndexDirectory {
    root: PathBuf,
    block_count: usize,
}

impl IndexDirectory {
    /// Opens a handle onto an existing index root without touching the
    /// filesystem; used by the query path, which only ever reads.
    pub fn open_existing(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), block_count: 0 }
    }

    pub fn review_ids_path(&self) -> PathBuf {
        self.root.join("review_ids.txt")
    }

    pub fn properties_path(&self) -> PathBuf {
        self.root.join("properties.json")
    }

    pub fn blocks_dir(&self) -> PathBuf {
        self.root.join("blocks")
    }

    pub fn segments_dir(&self) -> PathBuf {
        self.root.join("segments")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Creates the directory layout, failing or wiping an existing root
    /// per `option`.
    pub fn create(root: impl Into<PathBuf>, option: IndexCreationOption) -> Result<Self, IndexerError> {
        let root = root.into();

        if root.exists() {
            match option {
                IndexCreationOption::ErrorOnExists => {
                    return Err(IndexerError::IndexExists(root));
                }
                IndexCreationOption::Overwrite => {
                    eprintln!("[IndexDirectory]: Deleting index '{}'", root.display());
                    fs::remove_dir_all(&root)?;
                }
            }
        }

        fs::create_dir_all(&root)?;
        File::create(root.join("review_ids.txt"))?;
        File::create(root.join("properties.json"))?;
        fs::create_dir_all(root.join("blocks"))?;
        fs::create_dir_all(root.join("segments"))?;

        Ok(Self { root, block_count: 0 })
    }

    /// Allocates the next block path, embedding a monotonically
    /// increasing index so identically sorted contents never collide.
    pub fn next_block_path(&mut self) -> PathBuf {
        let path = self.blocks_dir().join(format!("block_{}.txt", self.block_count));
        self.block_count += 1;
        path
    }

    /// Allocates a segment directory named by its term range, returning
    /// `(vocabulary_path, postings_path)`.
    pub fn make_segment_dir(
        &self,
        first_term: &str,
        last_term: &str,
    ) -> Result<(PathBuf, PathBuf), IndexerError> {
        let segment_dir = self.segments_dir().join(format!("{first_term}-{last_term}"));
        fs::create_dir_all(&segment_dir)?;
        Ok((
            segment_dir.join("vocabulary.txt"),
            segment_dir.join("postings.txt"),
        ))
    }

    pub fn delete_blocks_dir(&self) -> Result<(), IndexerError> {
        if self.blocks_dir().exists() {
            eprintln!("[IndexDirectory]: Deleting {}", self.blocks_dir().display());
            fs::remove_dir_all(self.blocks_dir())?;
        }
        Ok(())
    }

    /// Total on-disk size of review ids + segments, excluding properties.
    pub fn index_size(&self) -> Result<u64, IndexerError> {
        let mut total = fs::metadata(self.review_ids_path())?.len();

        if self.segments_dir().exists() {
            for entry in fs::read_dir(self.segments_dir())? {
                let segment_dir = entry?.path();
                if !segment_dir.is_dir() {
                    continue;
                }
                for file in fs::read_dir(&segment_dir)? {
                    total += fs::metadata(file?.path())?.len();
                }
            }
        }
        Ok(total)
    }
}

/// Append-only, line-buffered writer for `review_ids.txt`.
pub struct ReviewIdWriter {
    writer: BufWriter<File>,
}

impl ReviewIdWriter {
    pub fn create(index_dir: &IndexDirectory) -> Result<Self, IndexerError> {
        let file = File::create(index_dir.review_ids_path())?;
        Ok(Self { writer: BufWriter::new(file) })
    }

    pub fn append(&mut self, review_id: &str) -> Result<(), IndexerError> {
        writeln!(self.writer, "{review_id}")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), IndexerError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads `review_ids.txt` into an ordinal-indexed vector.
pub fn read_review_ids(index_dir: &IndexDirectory) -> Result<Vec<String>, IndexerError> {
    let text = fs::read_to_string(index_dir.review_ids_path())?;
    Ok(text.lines().map(|l| l.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_lays_out_expected_tree() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("idx");
        let dir = IndexDirectory::create(&root, IndexCreationOption::ErrorOnExists).unwrap();

        assert!(dir.review_ids_path().exists());
        assert!(dir.properties_path().exists());
        assert!(dir.blocks_dir().is_dir());
        assert!(dir.segments_dir().is_dir());
    }

    #[test]
    fn create_errors_when_existing_and_not_overwriting() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("idx");
        IndexDirectory::create(&root, IndexCreationOption::ErrorOnExists).unwrap();

        let result = IndexDirectory::create(&root, IndexCreationOption::ErrorOnExists);
        assert!(matches!(result, Err(IndexerError::IndexExists(_))));
    }

    #[test]
    fn overwrite_wipes_existing_root() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("idx");
        let mut dir = IndexDirectory::create(&root, IndexCreationOption::ErrorOnExists).unwrap();
        let block = dir.next_block_path();
        fs::write(&block, "stale").unwrap();

        let dir2 = IndexDirectory::create(&root, IndexCreationOption::Overwrite).unwrap();
        assert_eq!(dir2.block_count(), 0);
        assert!(!block.exists());
    }

    #[test]
    fn block_paths_are_monotonic() {
        let tmp = tempdir().unwrap();
        let mut dir = IndexDirectory::create(tmp.path().join("idx"), IndexCreationOption::ErrorOnExists).unwrap();
        let a = dir.next_block_path();
        let b = dir.next_block_path();
        assert_ne!(a, b);
        assert!(a.to_string_lossy().contains("block_0"));
        assert!(b.to_string_lossy().contains("block_1"));
    }
}
