//! Crate-wide error kinds for the indexer and query evaluator.
//!
//! The binary wraps these in `anyhow::Context` at each call site (same as
//! the original CLI did), but library code returns this typed enum so the
//! driver can map a failure to the exit codes the CLI surface promises.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("index directory '{}' already exists", .0.display())]
    IndexExists(PathBuf),

    #[error("failed to read corpus '{}': {source}", .path.display())]
    CorpusIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("internal I/O failure: {0}")]
    InternalIo(#[from] std::io::Error),

    #[error("index properties mismatch: {0}")]
    PropertyMismatch(String),
}

impl IndexerError {
    /// Exit code promised by the CLI surface (see §7 of the design).
    pub fn exit_code(&self) -> i32 {
        match self {
            IndexerError::Configuration(_) => 2,
            IndexerError::IndexExists(_) => 3,
            IndexerError::CorpusIo { .. } => 4,
            IndexerError::InternalIo(_) => 5,
            IndexerError::PropertyMismatch(_) => 6,
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;
