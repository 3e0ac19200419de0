#![forbid(unsafe_code)]
//! colscan-mem: hard memory budgeting for buffered splits and resident pages.
//!
//! This crate provides the concrete implementation of the interfaces defined in
//! `colscan-core::budget`. Every accounted byte is held by an RAII guard so a
//! dropped split or page returns its bytes even on panic.

pub mod error;
pub mod guard;
pub mod tracking;

pub use error::{Error, Result};
pub use guard::{BudgetGuardImpl, MemoryBudgetImpl};
pub use tracking::PeakTracker;
