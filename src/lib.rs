#![forbid(unsafe_code)]
//! colscan: the columnar scan layer of a query engine, as one dependency.
//!
//! - [`block`]: immutable columnar Blocks, BlockBuilders, Pages, encoding.
//! - [`split`]: split descriptors, the async split source and loader.
//! - [`predicate`]: domains, tuple domains, statistics pruning, row filters.
//! - [`exec`]: the scan pipeline tying the three together.
//!
//! [`kernel`] and [`mem`] hold the shared types, configuration, and memory budget.

pub use colscan_block as block;
pub use colscan_core as kernel;
pub use colscan_exec as exec;
pub use colscan_mem as mem;
pub use colscan_predicate as predicate;
pub use colscan_split as split;

pub use colscan_core::prelude;
pub use colscan_core::prelude::{ColumnType, ScanConfig, Value};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
