//! Sets of admissible non-null values for one column.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use colscan_core::types::Value;

use crate::range::{cmp_high, cmp_low, Bound, Range};

/// Disjoint, non-adjacent ranges in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedRangeSet {
    ranges: Vec<Range>,
}

impl SortedRangeSet {
    pub fn none() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn all() -> Self {
        Self {
            ranges: vec![Range::all()],
        }
    }

    /// Normalize: drop ranges nothing satisfies, sort by lower bound and
    /// merge overlapping or touching ranges.
    pub fn of(mut ranges: Vec<Range>) -> Self {
        ranges.retain(|r| !r.is_empty());
        ranges.sort_by(|a, b| cmp_low(a.low(), b.low()));
        let mut merged: Vec<Range> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if last.merges_with(&range) => *last = last.span(&range),
                _ => merged.push(range),
            }
        }
        Self { ranges: merged }
    }

    pub fn of_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self::of(values.into_iter().map(Range::equal).collect())
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn is_none(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_all(&self) -> bool {
        matches!(self.ranges.as_slice(), [only] if only.is_all())
    }

    pub fn single_value(&self) -> Option<&Value> {
        match self.ranges.as_slice() {
            [only] => only.single_value(),
            _ => None,
        }
    }

    /// Smallest single range covering the set.
    pub fn span(&self) -> Option<Range> {
        match (self.ranges.first(), self.ranges.last()) {
            (Some(first), Some(last)) => Some(first.span(last)),
            _ => None,
        }
    }

    /// Binary search over the disjoint ranges.
    pub fn contains_value(&self, value: &Value) -> bool {
        let idx = self.ranges.partition_point(|r| r.is_below(value));
        self.ranges
            .get(idx)
            .is_some_and(|r| r.contains_value(value))
    }

    pub fn intersect(&self, other: &SortedRangeSet) -> SortedRangeSet {
        let (a, b) = (&self.ranges, &other.ranges);
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            if let Some(r) = a[i].intersect(&b[j]) {
                out.push(r);
            }
            if cmp_high(a[i].high(), b[j].high()) == Ordering::Less {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self::of(out)
    }

    pub fn union(&self, other: &SortedRangeSet) -> SortedRangeSet {
        Self::of(self.ranges.iter().chain(&other.ranges).cloned().collect())
    }

    pub fn overlaps(&self, other: &SortedRangeSet) -> bool {
        !self.intersect(other).is_none()
    }
}

/// Include-list or exclude-list of values that are only compared for
/// equality. Boolean columns use this form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteValueSet {
    inclusive: bool,
    values: BTreeSet<Value>,
}

impl DiscreteValueSet {
    pub fn of(values: impl IntoIterator<Item = Value>) -> Self {
        Self::normalized(true, values.into_iter().collect())
    }

    pub fn excluding(values: impl IntoIterator<Item = Value>) -> Self {
        Self::normalized(false, values.into_iter().collect())
    }

    /// Both booleans listed means every boolean: flip to the equivalent
    /// empty list of the other kind.
    fn normalized(inclusive: bool, values: BTreeSet<Value>) -> Self {
        let both_booleans = values.len() == 2
            && values.contains(&Value::Boolean(true))
            && values.contains(&Value::Boolean(false));
        if both_booleans {
            return Self {
                inclusive: !inclusive,
                values: BTreeSet::new(),
            };
        }
        Self { inclusive, values }
    }

    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    pub fn values(&self) -> &BTreeSet<Value> {
        &self.values
    }

    pub fn is_none(&self) -> bool {
        self.inclusive && self.values.is_empty()
    }

    pub fn is_all(&self) -> bool {
        !self.inclusive && self.values.is_empty()
    }

    pub fn single_value(&self) -> Option<&Value> {
        match (self.inclusive, self.values.len()) {
            (true, 1) => self.values.iter().next(),
            _ => None,
        }
    }

    /// Listed values match by SQL equality, so NaN is never listed.
    pub fn contains_value(&self, value: &Value) -> bool {
        self.inclusive == self.values.iter().any(|v| v.sql_eq(value))
    }

    pub fn intersect(&self, other: &DiscreteValueSet) -> DiscreteValueSet {
        match (self.inclusive, other.inclusive) {
            (true, true) => Self::normalized(true, self.values.intersection(&other.values).cloned().collect()),
            (true, false) => Self::normalized(true, self.values.difference(&other.values).cloned().collect()),
            (false, true) => Self::normalized(true, other.values.difference(&self.values).cloned().collect()),
            (false, false) => Self::normalized(false, self.values.union(&other.values).cloned().collect()),
        }
    }

    pub fn union(&self, other: &DiscreteValueSet) -> DiscreteValueSet {
        match (self.inclusive, other.inclusive) {
            (true, true) => Self::normalized(true, self.values.union(&other.values).cloned().collect()),
            (true, false) => Self::normalized(false, other.values.difference(&self.values).cloned().collect()),
            (false, true) => Self::normalized(false, self.values.difference(&other.values).cloned().collect()),
            (false, false) => Self::normalized(false, self.values.intersection(&other.values).cloned().collect()),
        }
    }

    /// Same set expressed as ranges; exclusions become the gaps between points.
    pub fn to_ranges(&self) -> SortedRangeSet {
        if self.inclusive {
            return SortedRangeSet::of_values(self.values.iter().cloned());
        }
        let mut ranges = Vec::with_capacity(self.values.len() + 1);
        let mut low = Bound::Unbounded;
        for v in &self.values {
            ranges.push(Range::from_bounds(low, Bound::Exclusive(v.clone())));
            low = Bound::Exclusive(v.clone());
        }
        ranges.push(Range::from_bounds(low, Bound::Unbounded));
        SortedRangeSet::of(ranges)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueSet {
    All,
    None,
    Ranges(SortedRangeSet),
    Discrete(DiscreteValueSet),
}

impl ValueSet {
    pub fn of_ranges(ranges: SortedRangeSet) -> Self {
        if ranges.is_none() {
            ValueSet::None
        } else if ranges.is_all() {
            ValueSet::All
        } else {
            ValueSet::Ranges(ranges)
        }
    }

    pub fn of_discrete(set: DiscreteValueSet) -> Self {
        if set.is_none() {
            ValueSet::None
        } else if set.is_all() {
            ValueSet::All
        } else {
            ValueSet::Discrete(set)
        }
    }

    /// Point set over `values`: discrete for booleans, ranges otherwise.
    pub fn of_values(values: Vec<Value>) -> Self {
        if !values.is_empty() && values.iter().all(|v| matches!(v, Value::Boolean(_))) {
            Self::of_discrete(DiscreteValueSet::of(values))
        } else {
            Self::of_ranges(SortedRangeSet::of_values(values))
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, ValueSet::All)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ValueSet::None)
    }

    pub fn single_value(&self) -> Option<&Value> {
        match self {
            ValueSet::Ranges(r) => r.single_value(),
            ValueSet::Discrete(d) => d.single_value(),
            _ => None,
        }
    }

    pub fn contains_value(&self, value: &Value) -> bool {
        match self {
            ValueSet::All => true,
            ValueSet::None => false,
            ValueSet::Ranges(r) => r.contains_value(value),
            ValueSet::Discrete(d) => d.contains_value(value),
        }
    }

    pub fn intersect(&self, other: &ValueSet) -> ValueSet {
        match (self, other) {
            (ValueSet::None, _) | (_, ValueSet::None) => ValueSet::None,
            (ValueSet::All, x) | (x, ValueSet::All) => x.clone(),
            (ValueSet::Ranges(a), ValueSet::Ranges(b)) => Self::of_ranges(a.intersect(b)),
            (ValueSet::Discrete(a), ValueSet::Discrete(b)) => Self::of_discrete(a.intersect(b)),
            (ValueSet::Ranges(r), ValueSet::Discrete(d))
            | (ValueSet::Discrete(d), ValueSet::Ranges(r)) => {
                if d.is_inclusive() {
                    let kept = d.values().iter().filter(|v| r.contains_value(v)).cloned();
                    Self::of_discrete(DiscreteValueSet::of(kept))
                } else {
                    Self::of_ranges(r.intersect(&d.to_ranges()))
                }
            }
        }
    }

    pub fn union(&self, other: &ValueSet) -> ValueSet {
        match (self, other) {
            (ValueSet::All, _) | (_, ValueSet::All) => ValueSet::All,
            (ValueSet::None, x) | (x, ValueSet::None) => x.clone(),
            (ValueSet::Ranges(a), ValueSet::Ranges(b)) => Self::of_ranges(a.union(b)),
            (ValueSet::Discrete(a), ValueSet::Discrete(b)) => Self::of_discrete(a.union(b)),
            (ValueSet::Ranges(r), ValueSet::Discrete(d))
            | (ValueSet::Discrete(d), ValueSet::Ranges(r)) => Self::of_ranges(r.union(&d.to_ranges())),
        }
    }

    pub fn overlaps(&self, other: &ValueSet) -> bool {
        !self.intersect(other).is_none()
    }
}
