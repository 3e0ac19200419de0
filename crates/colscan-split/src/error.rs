use thiserror::Error;

/// Result type local to colscan-split.
pub type Result<T> = std::result::Result<T, SplitError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    /// A caller handed over a malformed split (bad offsets, gaps between ranges).
    #[error("invalid split arguments: {0}")]
    InvalidSplitArguments(String),

    #[error("all ranges consumed")]
    AllRangesConsumed,

    /// The read cursor no longer lines up with the ranges.
    #[error("corrupt split: {0}")]
    CorruptSplit(String),

    #[error("split buffering limit exceeded: {requested} bytes requested with {used} of {limit} in use")]
    BufferLimitExceeded {
        requested: usize,
        used: usize,
        limit: usize,
    },

    #[error("invalid host address: {0}")]
    InvalidAddress(String),

    /// Partition or file listing reported an error.
    #[error("split enumeration failed: {0}")]
    Enumeration(String),

    #[error("split source is in state {state}: {operation} not allowed")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },

    #[error("split source closed")]
    Closed,
}

impl SplitError {
    /// Internal-consistency failures; everything else is a caller or listing
    /// problem reported back as-is.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SplitError::CorruptSplit(_)
                | SplitError::AllRangesConsumed
                | SplitError::InvalidState { .. }
        )
    }
}
