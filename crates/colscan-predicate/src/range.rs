//! Intervals over [`Value`]s.
//!
//! A `Range` is never empty: constructors reject `low > high` and half-open
//! single points such as `[5, 5)`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use colscan_core::types::Value;

use crate::error::{PredicateError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    Unbounded,
    Inclusive(Value),
    Exclusive(Value),
}

impl Bound {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Bound::Unbounded => None,
            Bound::Inclusive(v) | Bound::Exclusive(v) => Some(v),
        }
    }

    fn parts(&self) -> Option<(&Value, bool)> {
        match self {
            Bound::Unbounded => None,
            Bound::Inclusive(v) => Some((v, true)),
            Bound::Exclusive(v) => Some((v, false)),
        }
    }
}

/// Ordering of bound values: numeric for doubles so the two zeros tie, with
/// the total order breaking NaN ties. Only used to arrange bounds, never to
/// decide membership.
fn order(a: &Value, b: &Value) -> Ordering {
    a.sql_cmp(b).unwrap_or_else(|| a.cmp(b))
}

/// Order of two bounds used as lower ends: unbounded first, and at the same
/// value an inclusive bound starts earlier.
pub(crate) fn cmp_low(a: &Bound, b: &Bound) -> Ordering {
    match (a.parts(), b.parts()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some((av, ai)), Some((bv, bi))) => order(av, bv).then_with(|| bi.cmp(&ai)),
    }
}

/// Order of two bounds used as upper ends: unbounded last, and at the same
/// value an exclusive bound ends earlier.
pub(crate) fn cmp_high(a: &Bound, b: &Bound) -> Ordering {
    match (a.parts(), b.parts()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some((av, ai)), Some((bv, bi))) => order(av, bv).then_with(|| ai.cmp(&bi)),
    }
}

/// A NaN bound admits nothing: every comparison against NaN is false.
fn non_empty(low: &Bound, high: &Bound) -> bool {
    match (low.parts(), high.parts()) {
        (Some((l, li)), Some((h, hi))) => match l.sql_cmp(h) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => li && hi,
            _ => false,
        },
        (Some((v, _)), None) | (None, Some((v, _))) => !v.is_nan(),
        (None, None) => true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    low: Bound,
    high: Bound,
}

impl Range {
    pub fn new(low: Bound, high: Bound) -> Result<Self> {
        if !non_empty(&low, &high) {
            return Err(PredicateError::InvalidRange(format!(
                "{} is empty",
                Range { low, high }
            )));
        }
        Ok(Self { low, high })
    }

    /// Caller guarantees the bounds describe a non-empty interval, except for
    /// NaN points which [`Range::is_empty`] reports and range sets drop.
    pub(crate) fn from_bounds(low: Bound, high: Bound) -> Self {
        Self { low, high }
    }

    pub fn all() -> Self {
        Self::from_bounds(Bound::Unbounded, Bound::Unbounded)
    }

    pub fn equal(value: Value) -> Self {
        Self::from_bounds(Bound::Inclusive(value.clone()), Bound::Inclusive(value))
    }

    pub fn greater_than(value: Value) -> Self {
        Self::from_bounds(Bound::Exclusive(value), Bound::Unbounded)
    }

    pub fn greater_than_or_equal(value: Value) -> Self {
        Self::from_bounds(Bound::Inclusive(value), Bound::Unbounded)
    }

    pub fn less_than(value: Value) -> Self {
        Self::from_bounds(Bound::Unbounded, Bound::Exclusive(value))
    }

    pub fn less_than_or_equal(value: Value) -> Self {
        Self::from_bounds(Bound::Unbounded, Bound::Inclusive(value))
    }

    /// Closed interval `[low, high]`.
    pub fn between(low: Value, high: Value) -> Result<Self> {
        Self::new(Bound::Inclusive(low), Bound::Inclusive(high))
    }

    pub fn low(&self) -> &Bound {
        &self.low
    }

    pub fn high(&self) -> &Bound {
        &self.high
    }

    pub fn is_all(&self) -> bool {
        self.low == Bound::Unbounded && self.high == Bound::Unbounded
    }

    /// True only for bounds no value satisfies, such as `= NaN` or `> NaN`.
    pub fn is_empty(&self) -> bool {
        !non_empty(&self.low, &self.high)
    }

    pub fn is_single_value(&self) -> bool {
        self.single_value().is_some()
    }

    pub fn single_value(&self) -> Option<&Value> {
        match (&self.low, &self.high) {
            (Bound::Inclusive(l), Bound::Inclusive(h)) if l.sql_eq(h) => Some(l),
            _ => None,
        }
    }

    /// Membership with SQL comparison: `-0.0` and `0.0` are the same point,
    /// and NaN lies in no range that has a bound.
    pub fn contains_value(&self, value: &Value) -> bool {
        let above_low = match &self.low {
            Bound::Unbounded => true,
            Bound::Inclusive(l) => matches!(value.sql_cmp(l), Some(Ordering::Greater | Ordering::Equal)),
            Bound::Exclusive(l) => value.sql_cmp(l) == Some(Ordering::Greater),
        };
        let below_high = match &self.high {
            Bound::Unbounded => true,
            Bound::Inclusive(h) => matches!(value.sql_cmp(h), Some(Ordering::Less | Ordering::Equal)),
            Bound::Exclusive(h) => value.sql_cmp(h) == Some(Ordering::Less),
        };
        above_low && below_high
    }

    /// Whether every value of this range is smaller than `value`. False for
    /// NaN, which orders against nothing.
    pub(crate) fn is_below(&self, value: &Value) -> bool {
        match &self.high {
            Bound::Unbounded => false,
            Bound::Inclusive(h) => h.sql_cmp(value) == Some(Ordering::Less),
            Bound::Exclusive(h) => matches!(h.sql_cmp(value), Some(Ordering::Less | Ordering::Equal)),
        }
    }

    pub fn intersect(&self, other: &Range) -> Option<Range> {
        let low = match cmp_low(&self.low, &other.low) {
            Ordering::Less => &other.low,
            _ => &self.low,
        };
        let high = match cmp_high(&self.high, &other.high) {
            Ordering::Greater => &other.high,
            _ => &self.high,
        };
        non_empty(low, high).then(|| Range::from_bounds(low.clone(), high.clone()))
    }

    pub fn overlaps(&self, other: &Range) -> bool {
        self.intersect(other).is_some()
    }

    /// Smallest range covering both.
    pub fn span(&self, other: &Range) -> Range {
        let low = match cmp_low(&self.low, &other.low) {
            Ordering::Greater => &other.low,
            _ => &self.low,
        };
        let high = match cmp_high(&self.high, &other.high) {
            Ordering::Less => &other.high,
            _ => &self.high,
        };
        Range::from_bounds(low.clone(), high.clone())
    }

    /// Whether `next`, which does not start before `self`, can be merged
    /// into one range with it: they overlap or meet at an included point.
    pub(crate) fn merges_with(&self, next: &Range) -> bool {
        if self.overlaps(next) {
            return true;
        }
        match (self.high.parts(), next.low.parts()) {
            (Some((h, hi)), Some((l, li))) => h.sql_eq(l) && (hi || li),
            _ => false,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.low {
            Bound::Unbounded => write!(f, "(<min>")?,
            Bound::Inclusive(v) => write!(f, "[{:?}", v)?,
            Bound::Exclusive(v) => write!(f, "({:?}", v)?,
        }
        match &self.high {
            Bound::Unbounded => write!(f, ", <max>)"),
            Bound::Inclusive(v) => write!(f, ", {:?}]", v),
            Bound::Exclusive(v) => write!(f, ", {:?})", v),
        }
    }
}
