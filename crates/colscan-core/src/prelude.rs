//! Convenient re-exports for downstream crates.

pub use crate::budget::{BudgetGuard, MemoryBudget};
pub use crate::config::ScanConfig;
pub use crate::error::{Error, Result};
pub use crate::id::{ColumnId, SplitId};
pub use crate::types::{ColumnType, PhysicalLayout, Value};
