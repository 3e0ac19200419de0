use thiserror::Error;

use colscan_block::BlockError;
use colscan_predicate::PredicateError;
use colscan_split::SplitError;

/// Result type local to colscan-exec.
pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("block: {0}")]
    Block(#[from] BlockError),

    #[error("predicate: {0}")]
    Predicate(#[from] PredicateError),

    #[error("split: {0}")]
    Split(#[from] SplitError),

    #[error("page memory: {0}")]
    Memory(#[from] colscan_mem::Error),

    /// Reported by a [`SplitDecoder`](crate::decoder::SplitDecoder).
    #[error("decode: {0}")]
    Decode(String),
}

impl ScanError {
    pub fn is_fatal(&self) -> bool {
        match self {
            ScanError::Block(e) => e.is_fatal(),
            ScanError::Predicate(e) => e.is_fatal(),
            ScanError::Split(e) => e.is_fatal(),
            ScanError::Memory(_) | ScanError::Decode(_) => false,
        }
    }
}
