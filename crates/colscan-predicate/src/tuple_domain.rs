//! Conjunction of per-column domains.
//!
//! `TupleDomain::none()` admits nothing. Otherwise every listed column must
//! admit its value; unlisted columns are unconstrained. A none domain for any
//! column collapses the whole tuple to none, and all domains are dropped, so
//! the representation is canonical.

use std::collections::BTreeMap;
use std::fmt::Debug;

use colscan_core::types::Value;

use crate::domain::Domain;
use crate::error::{PredicateError, Result};

/// What is known about one column when testing admissibility.
#[derive(Debug, Clone)]
pub enum Observed<'a> {
    /// An actual row value; `None` is null.
    Value(Option<&'a Value>),
    /// A superset of the values present, e.g. derived from min/max statistics.
    Domain(Domain),
    /// Nothing known; never excludes anything.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleDomain<C: Ord> {
    domains: Option<BTreeMap<C, Domain>>,
}

impl<C: Ord + Clone + Debug> TupleDomain<C> {
    pub fn all() -> Self {
        Self {
            domains: Some(BTreeMap::new()),
        }
    }

    pub fn none() -> Self {
        Self { domains: None }
    }

    pub fn with_column_domains(domains: impl IntoIterator<Item = (C, Domain)>) -> Self {
        let mut kept = BTreeMap::new();
        for (column, domain) in domains {
            if domain.is_none() {
                return Self::none();
            }
            if !domain.is_all() {
                kept.insert(column, domain);
            }
        }
        Self {
            domains: Some(kept),
        }
    }

    /// Predicate pinning each column to one value, or to null for `None`.
    pub fn from_fixed_values(values: impl IntoIterator<Item = (C, Option<Value>)>) -> Self {
        Self::with_column_domains(values.into_iter().map(|(column, value)| {
            let domain = match value {
                Some(v) => Domain::single_value(v),
                None => Domain::only_null(),
            };
            (column, domain)
        }))
    }

    pub fn is_all(&self) -> bool {
        self.domains.as_ref().is_some_and(BTreeMap::is_empty)
    }

    pub fn is_none(&self) -> bool {
        self.domains.is_none()
    }

    /// Column domains, or `None` for the unsatisfiable predicate.
    pub fn domains(&self) -> Option<&BTreeMap<C, Domain>> {
        self.domains.as_ref()
    }

    /// Effective domain of `column`.
    pub fn domain(&self, column: &C) -> Domain {
        match &self.domains {
            None => Domain::none(),
            Some(map) => map.get(column).cloned().unwrap_or_else(Domain::all),
        }
    }

    pub fn intersect(&self, other: &TupleDomain<C>) -> TupleDomain<C> {
        let (Some(left), Some(right)) = (&self.domains, &other.domains) else {
            return Self::none();
        };
        let mut merged = left.clone();
        for (column, domain) in right {
            let combined = match merged.get(column) {
                Some(existing) => existing.intersect(domain),
                None => domain.clone(),
            };
            merged.insert(column.clone(), combined);
        }
        Self::with_column_domains(merged)
    }

    /// Weakest predicate implied by each of `tuples`: per column, the union of
    /// its domains. A column missing from any satisfiable tuple is unconstrained.
    pub fn column_wise_union<'a>(tuples: impl IntoIterator<Item = &'a TupleDomain<C>>) -> TupleDomain<C>
    where
        C: 'a,
    {
        let mut satisfiable = tuples.into_iter().filter_map(|t| t.domains.as_ref());
        let Some(first) = satisfiable.next() else {
            return Self::none();
        };
        let mut union = first.clone();
        for domains in satisfiable {
            union = union
                .into_iter()
                .filter_map(|(column, domain)| {
                    domains
                        .get(&column)
                        .map(|other| (column, domain.union(other)))
                })
                .collect();
        }
        Self::with_column_domains(union)
    }

    /// Re-key the predicate. Every column must map; columns mapping to the
    /// same new key are intersected.
    pub fn transform<D, F>(&self, mut f: F) -> Result<TupleDomain<D>>
    where
        D: Ord + Clone + Debug,
        F: FnMut(&C) -> Option<D>,
    {
        let Some(domains) = &self.domains else {
            return Ok(TupleDomain::none());
        };
        let mut mapped: BTreeMap<D, Domain> = BTreeMap::new();
        for (column, domain) in domains {
            let key = f(column).ok_or_else(|| PredicateError::UnresolvedColumn(format!("{:?}", column)))?;
            let combined = match mapped.remove(&key) {
                Some(existing) => existing.intersect(domain),
                None => domain.clone(),
            };
            mapped.insert(key, combined);
        }
        Ok(TupleDomain::with_column_domains(mapped))
    }

    /// Keep only the columns `keep` accepts; dropping a constraint only widens
    /// the predicate.
    pub fn filter_columns(&self, mut keep: impl FnMut(&C) -> bool) -> TupleDomain<C> {
        match &self.domains {
            None => Self::none(),
            Some(domains) => Self {
                domains: Some(
                    domains
                        .iter()
                        .filter(|(column, _)| keep(column))
                        .map(|(c, d)| (c.clone(), d.clone()))
                        .collect(),
                ),
            },
        }
    }

    /// Columns pinned to exactly one value (`Some`) or to null (`None`).
    /// `None` for the unsatisfiable predicate.
    pub fn extract_fixed_values(&self) -> Option<BTreeMap<C, Option<Value>>> {
        let domains = self.domains.as_ref()?;
        Some(
            domains
                .iter()
                .filter_map(|(column, domain)| {
                    if domain.is_only_null() {
                        Some((column.clone(), None))
                    } else {
                        domain
                            .get_single_value()
                            .map(|v| (column.clone(), Some(v.clone())))
                    }
                })
                .collect(),
        )
    }

    /// Strict AND over the constrained columns. Stops at the first column that
    /// cannot be satisfied; the result is the same as evaluating them all.
    pub fn is_satisfied_by<'a>(&self, mut observe: impl FnMut(&C) -> Observed<'a>) -> bool {
        let Some(domains) = &self.domains else {
            return false;
        };
        domains.iter().all(|(column, domain)| match observe(column) {
            Observed::Missing => true,
            Observed::Value(v) => domain.includes_value(v),
            Observed::Domain(observed) => domain.overlaps(&observed),
        })
    }
}

impl<C: Ord + Clone + Debug> Default for TupleDomain<C> {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Range;

    fn long(v: i64) -> Value {
        Value::Long(v)
    }

    #[test]
    fn test_none_column_collapses_tuple() {
        let t = TupleDomain::with_column_domains([
            ("a", Domain::single_value(long(1))),
            ("b", Domain::none()),
        ]);
        assert!(t.is_none());
        assert!(!t.is_satisfied_by(|_| Observed::Missing));
    }

    #[test]
    fn test_all_domains_are_dropped() {
        let t = TupleDomain::with_column_domains([("a", Domain::all())]);
        assert!(t.is_all());
        assert_eq!(t, TupleDomain::all());
    }

    #[test]
    fn test_intersect_disjoint_is_none() {
        let a = TupleDomain::with_column_domains([("x", Domain::single_value(long(1)))]);
        let b = TupleDomain::with_column_domains([("x", Domain::single_value(long(2)))]);
        assert!(a.intersect(&b).is_none());
        let c = TupleDomain::with_column_domains([("y", Domain::single_value(long(2)))]);
        let both = a.intersect(&c);
        assert_eq!(both.domains().map(BTreeMap::len), Some(2));
    }

    #[test]
    fn test_column_wise_union_drops_columns_not_in_every_tuple() {
        let a = TupleDomain::with_column_domains([
            ("x", Domain::single_value(long(1))),
            ("y", Domain::single_value(long(1))),
        ]);
        let b = TupleDomain::with_column_domains([("x", Domain::single_value(long(5)))]);
        let union = TupleDomain::column_wise_union([&a, &b, &TupleDomain::none()]);
        let x = union.domain(&"x");
        assert!(x.includes_value(Some(&long(1))));
        assert!(x.includes_value(Some(&long(5))));
        assert!(!x.includes_value(Some(&long(3))));
        assert!(union.domain(&"y").is_all());
    }

    #[test]
    fn test_transform_fails_on_unmapped_column() {
        let t = TupleDomain::with_column_domains([
            ("a".to_string(), Domain::single_value(long(1))),
            ("b".to_string(), Domain::single_value(long(2))),
        ]);
        let err = t
            .transform(|c| (c == "a").then_some(0usize))
            .unwrap_err();
        assert!(matches!(err, PredicateError::UnresolvedColumn(ref c) if c.contains('b')));
        assert!(err.is_fatal());

        let mapped = t.transform(|c| Some(c.len())).unwrap();
        // both columns land on key 1 and are intersected
        assert!(mapped.is_none());
    }

    #[test]
    fn test_extract_fixed_values() {
        let t = TupleDomain::with_column_domains([
            ("a", Domain::single_value(long(7))),
            ("b", Domain::only_null()),
            ("c", Domain::range(Range::greater_than(long(0)))),
        ]);
        let fixed = t.extract_fixed_values().unwrap();
        assert_eq!(fixed.get("a"), Some(&Some(long(7))));
        assert_eq!(fixed.get("b"), Some(&None));
        assert!(!fixed.contains_key("c"));
        assert_eq!(TupleDomain::<&str>::none().extract_fixed_values(), None);
    }

    #[test]
    fn test_filter_columns_widens() {
        let t = TupleDomain::with_column_domains([
            ("a", Domain::single_value(long(7))),
            ("b", Domain::single_value(long(8))),
        ]);
        let only_a = t.filter_columns(|c| *c == "a");
        assert!(only_a.domain(&"b").is_all());
        assert!(!only_a.domain(&"a").is_all());
    }
}
