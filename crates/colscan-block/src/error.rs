use thiserror::Error;

use colscan_core::types::ColumnType;

pub type Result<T> = std::result::Result<T, BlockError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("position {position} is out of range for block with {position_count} positions")]
    IndexOutOfRange {
        position: usize,
        position_count: usize,
    },

    #[error("invalid byte offset {offset} within a {layout} value")]
    InvalidOffset { offset: usize, layout: &'static str },

    #[error("region offset {offset} + length {length} exceeds {position_count} positions")]
    InvalidRange {
        offset: usize,
        length: usize,
        position_count: usize,
    },

    #[error("{operation} is not supported by {layout} blocks")]
    UnsupportedAccess {
        operation: &'static str,
        layout: &'static str,
    },

    #[error("cannot append {got} to a {} builder", column_type.name())]
    UnsupportedAppendType {
        column_type: ColumnType,
        got: &'static str,
    },

    #[error("invalid block arguments: {0}")]
    InvalidArguments(String),

    #[error("page channel {channel} has {actual} positions, expected {expected}")]
    PositionCountMismatch {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("corrupt block data: {0}")]
    Corrupt(String),
}

impl BlockError {
    /// Internal-consistency failures that should abort the task rather than be
    /// reported back to the caller that supplied the arguments.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BlockError::IndexOutOfRange { .. } | BlockError::Corrupt(_)
        )
    }
}
