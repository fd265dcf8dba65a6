use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid journal line: [{0}]")]
    CorruptStep(String),

    #[error("the database is not backed by a file")]
    NotJournaled,

    #[error("no snapshot named {0}")]
    SnapshotNotFound(String),

    #[error("snapshot at {pos}+{size} lies outside the {len} byte snapshot file")]
    SnapshotOutOfBounds { pos: u64, size: u64, len: u64 },

    #[error("no snapshot found")]
    NoSnapshot,

    #[error("cannot prune the entire database, prune each primary key instead")]
    EmptyPath,
}

pub type Result<T> = std::result::Result<T, DbError>;
