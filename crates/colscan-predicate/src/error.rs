use thiserror::Error;

use colscan_block::BlockError;

pub type Result<T> = std::result::Result<T, PredicateError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    /// A predicate column has no counterpart on the other side of a transform.
    #[error("predicate column {0} cannot be resolved")]
    UnresolvedColumn(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error(transparent)]
    Block(#[from] BlockError),
}

impl PredicateError {
    /// Unresolved columns mean the planner and executor disagree on the
    /// column set; the task cannot continue.
    pub fn is_fatal(&self) -> bool {
        match self {
            PredicateError::UnresolvedColumn(_) => true,
            PredicateError::InvalidRange(_) => false,
            PredicateError::Block(e) => e.is_fatal(),
        }
    }
}
