#![forbid(unsafe_code)]
//! colscan-core: shared kernel for the colscan columnar scan layer.
//!
//! This crate contains only *pure* types, small helpers, and interfaces
//! (traits) that other crates implement. There is **no I/O** and **no async**
//! here.
//!
//! Crates that use this:
//! - colscan-mem: implements the MemoryBudget trait (guards live there).
//! - colscan-block: packs typed values into Blocks keyed by `ColumnType`.
//! - colscan-predicate: builds Domains over `Value`s.
//! - colscan-split: sizes split buffers from `ScanConfig`, fingerprints splits.
//! - colscan-exec: drives splits through decoders into Pages.

pub mod budget;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod types;

pub use error::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
