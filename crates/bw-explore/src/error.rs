use std::path::PathBuf;

use bw_core::StoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to prepare store directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write segment {path}: {source}")]
    WriteSegment {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read segment {path}: {source}")]
    ReadSegment {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove segment {path}: {source}")]
    RemoveSegment {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corrupt record in {path} at line {line}: {source}")]
    CorruptRecord {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
    #[error("Failed to encode path record: {0}")]
    Encode(serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to prepare checkpoint directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write checkpoint {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse checkpoint {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to encode checkpoint: {0}")]
    Encode(serde_json::Error),
    #[error("Invalid checkpoint schema version \"{found}\" in {path}, expected \"{expected}\".")]
    InvalidSchemaVersion {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("Invalid checkpoint name pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Failed to scan checkpoint directory {path}: {source}")]
    Scan {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("Failed to remove checkpoint {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Faults that end the whole run. Per-path story faults never reach this
/// type; they are recorded and the traversal moves on.
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("State codec failed: {0}")]
    Codec(StoryError),
    #[error("Frontier store failed: {0}")]
    Store(#[from] StoreError),
    #[error("Checkpoint failed: {0}")]
    Checkpoint(#[from] CheckpointError),
}
