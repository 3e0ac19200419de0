//! Admissible values of one column: a value set plus whether null is allowed.

use serde::{Deserialize, Serialize};

use colscan_core::types::Value;

use crate::range::Range;
use crate::value_set::{SortedRangeSet, ValueSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    values: ValueSet,
    null_allowed: bool,
}

impl Domain {
    pub fn create(values: ValueSet, null_allowed: bool) -> Self {
        Self {
            values,
            null_allowed,
        }
    }

    pub fn all() -> Self {
        Self::create(ValueSet::All, true)
    }

    pub fn none() -> Self {
        Self::create(ValueSet::None, false)
    }

    pub fn only_null() -> Self {
        Self::create(ValueSet::None, true)
    }

    pub fn not_null() -> Self {
        Self::create(ValueSet::All, false)
    }

    pub fn single_value(value: Value) -> Self {
        Self::create(ValueSet::of_values(vec![value]), false)
    }

    pub fn multiple_values(values: Vec<Value>) -> Self {
        Self::create(ValueSet::of_values(values), false)
    }

    pub fn range(range: Range) -> Self {
        Self::create(ValueSet::of_ranges(SortedRangeSet::of(vec![range])), false)
    }

    pub fn values(&self) -> &ValueSet {
        &self.values
    }

    pub fn is_null_allowed(&self) -> bool {
        self.null_allowed
    }

    pub fn is_none(&self) -> bool {
        self.values.is_none() && !self.null_allowed
    }

    pub fn is_all(&self) -> bool {
        self.values.is_all() && self.null_allowed
    }

    pub fn is_only_null(&self) -> bool {
        self.values.is_none() && self.null_allowed
    }

    pub fn is_single_value(&self) -> bool {
        !self.null_allowed && self.values.single_value().is_some()
    }

    /// The one admitted value, when the domain is a single non-null point.
    pub fn get_single_value(&self) -> Option<&Value> {
        if self.null_allowed {
            None
        } else {
            self.values.single_value()
        }
    }

    /// `None` stands for SQL null.
    pub fn includes_value(&self, value: Option<&Value>) -> bool {
        match value {
            None => self.null_allowed,
            Some(v) => self.values.contains_value(v),
        }
    }

    pub fn overlaps(&self, other: &Domain) -> bool {
        (self.null_allowed && other.null_allowed) || self.values.overlaps(&other.values)
    }

    pub fn intersect(&self, other: &Domain) -> Domain {
        Self::create(
            self.values.intersect(&other.values),
            self.null_allowed && other.null_allowed,
        )
    }

    pub fn union(&self, other: &Domain) -> Domain {
        Self::create(
            self.values.union(&other.values),
            self.null_allowed || other.null_allowed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handling() {
        let d = Domain::single_value(Value::Long(5));
        assert!(!d.includes_value(None));
        assert!(Domain::only_null().includes_value(None));
        assert!(!Domain::only_null().includes_value(Some(&Value::Long(5))));
        assert!(Domain::only_null().overlaps(&Domain::all()));
        assert!(!Domain::only_null().overlaps(&Domain::not_null()));
    }

    #[test]
    fn test_intersect_and_union() {
        let a = Domain::multiple_values(vec![Value::Long(1), Value::Long(2)]);
        let b = Domain::range(Range::greater_than(Value::Long(1)));
        assert_eq!(a.intersect(&b), Domain::single_value(Value::Long(2)));
        assert!(a.intersect(&Domain::only_null()).is_none());
        assert!(Domain::not_null().union(&Domain::only_null()).is_all());
    }

    #[test]
    fn test_single_value_requires_no_nulls() {
        let d = Domain::single_value(Value::Varchar("x".into()));
        assert!(d.is_single_value());
        let with_null = d.union(&Domain::only_null());
        assert!(!with_null.is_single_value());
        assert_eq!(with_null.get_single_value(), None);
        assert_eq!(d.get_single_value(), Some(&Value::Varchar("x".into())));
    }

    #[test]
    fn test_double_domains_follow_sql_comparison() {
        let zero = Domain::single_value(Value::Double(0.0));
        assert!(zero.includes_value(Some(&Value::Double(-0.0))));
        assert!(zero.overlaps(&Domain::range(Range::between(Value::Double(-0.0), Value::Double(-0.0)).unwrap())));

        let nan = Value::Double(f64::NAN);
        assert!(Domain::single_value(nan.clone()).is_none());
        assert!(!Domain::range(Range::greater_than(Value::Double(0.0))).includes_value(Some(&nan)));
        assert!(Domain::not_null().includes_value(Some(&nan)));
    }
}
