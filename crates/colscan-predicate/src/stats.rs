//! Pruning with column statistics.
//!
//! Statistics only ever widen into a domain that contains every value the
//! data may hold, so a rejected file or range provably has no matching row.
//! A column without statistics is treated as unconstrained.

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use colscan_core::types::Value;

use crate::domain::Domain;
use crate::range::{Bound, Range};
use crate::tuple_domain::{Observed, TupleDomain};
use crate::value_set::{SortedRangeSet, ValueSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub null_count: Option<u64>,
}

impl ColumnStatistics {
    pub fn min_max(min: Value, max: Value) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            null_count: None,
        }
    }

    pub fn with_null_count(mut self, null_count: u64) -> Self {
        self.null_count = Some(null_count);
        self
    }

    /// Domain covering every value these statistics allow, given the number of
    /// rows they describe.
    pub fn to_domain(&self, row_count: Option<u64>) -> Domain {
        if row_count == Some(0) {
            return Domain::none();
        }
        let null_allowed = self.null_count.map_or(true, |n| n > 0);
        if let (Some(nulls), Some(rows)) = (self.null_count, row_count) {
            if nulls >= rows {
                return Domain::only_null();
            }
        }
        // A NaN min or max says nothing about where the other values lie.
        let low = self.min.clone().filter(|v| !v.is_nan()).map_or(Bound::Unbounded, Bound::Inclusive);
        let high = self.max.clone().filter(|v| !v.is_nan()).map_or(Bound::Unbounded, Bound::Inclusive);
        // Inverted bounds come from a broken writer; fall back to no constraint.
        let values = match Range::new(low, high) {
            Ok(range) => ValueSet::of_ranges(SortedRangeSet::of(vec![range])),
            Err(_) => ValueSet::All,
        };
        Domain::create(values, null_allowed)
    }
}

/// Statistics for one file, stripe or range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSet<C: Ord> {
    pub row_count: Option<u64>,
    pub columns: BTreeMap<C, ColumnStatistics>,
}

impl<C: Ord> StatisticsSet<C> {
    pub fn new(row_count: Option<u64>) -> Self {
        Self {
            row_count,
            columns: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, column: C, stats: ColumnStatistics) -> Self {
        self.columns.insert(column, stats);
        self
    }
}

/// Whether data summarized by `stats` may contain a row satisfying `predicate`.
pub fn matches_statistics<C: Ord + Clone + Debug>(
    predicate: &TupleDomain<C>,
    stats: &StatisticsSet<C>,
) -> bool {
    predicate.is_satisfied_by(|column| match stats.columns.get(column) {
        Some(s) => Observed::Domain(s.to_domain(stats.row_count)),
        None => Observed::Missing,
    })
}
