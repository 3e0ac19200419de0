#![forbid(unsafe_code)]
//! colscan-predicate: value domains and tuple-domain predicates.
//!
//! Two uses, one representation:
//! - pruning: [`matches_statistics`] tests min/max/null-count statistics and
//!   may admit data that ends up not matching, but never rejects data that does;
//! - row filtering: [`RowFilter`] evaluates decoded Pages exactly.
//!
//! Predicates are immutable values; evaluation is pure and can run from many
//! threads at once.

pub mod domain;
pub mod error;
pub mod filter;
pub mod range;
pub mod stats;
pub mod tuple_domain;
pub mod value_set;

pub use domain::Domain;
pub use error::{PredicateError, Result};
pub use filter::RowFilter;
pub use range::{Bound, Range};
pub use stats::{matches_statistics, ColumnStatistics, StatisticsSet};
pub use tuple_domain::{Observed, TupleDomain};
pub use value_set::{DiscreteValueSet, SortedRangeSet, ValueSet};
