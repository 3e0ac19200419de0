//! Exact per-row evaluation of a predicate against decoded Pages.

use colscan_block::Page;
use colscan_core::id::ColumnId;
use colscan_core::types::ColumnType;

use crate::domain::Domain;
use crate::error::{PredicateError, Result};
use crate::tuple_domain::TupleDomain;

#[derive(Debug, Clone)]
pub struct RowFilter {
    predicate: TupleDomain<ColumnId>,
    // (channel, type, domain) for every constrained channel.
    columns: Vec<(usize, ColumnType, Domain)>,
}

impl RowFilter {
    /// `types[channel]` is the declared type of each page channel.
    pub fn new(predicate: TupleDomain<ColumnId>, types: &[ColumnType]) -> Result<Self> {
        let mut columns = Vec::new();
        if let Some(domains) = predicate.domains() {
            for (column, domain) in domains {
                let channel = column.channel();
                let ty = types
                    .get(channel)
                    .copied()
                    .ok_or_else(|| PredicateError::UnresolvedColumn(column.to_string()))?;
                columns.push((channel, ty, domain.clone()));
            }
        }
        Ok(Self { predicate, columns })
    }

    pub fn predicate(&self) -> &TupleDomain<ColumnId> {
        &self.predicate
    }

    /// True when every row passes without looking at it.
    pub fn is_pass_through(&self) -> bool {
        self.predicate.is_all()
    }

    /// One flag per row of `page`: whether the row satisfies the predicate.
    pub fn evaluate(&self, page: &Page) -> Result<Vec<bool>> {
        let rows = page.position_count();
        if self.predicate.is_none() {
            return Ok(vec![false; rows]);
        }
        let mut selected = vec![true; rows];
        for (channel, ty, domain) in &self.columns {
            let block = page.block(*channel)?;
            for (position, keep) in selected.iter_mut().enumerate() {
                if *keep {
                    let value = block.get_value(position, *ty)?;
                    *keep = domain.includes_value(value.as_ref());
                }
            }
        }
        Ok(selected)
    }

    /// Rows of `page` that satisfy the predicate. Returns `page` itself when
    /// every row passes.
    pub fn filter_page(&self, page: &Page) -> Result<Page> {
        if self.is_pass_through() {
            return Ok(page.clone());
        }
        let selected = self.evaluate(page)?;
        let positions: Vec<usize> = selected
            .iter()
            .enumerate()
            .filter_map(|(position, keep)| keep.then_some(position))
            .collect();
        if positions.len() == page.position_count() {
            return Ok(page.clone());
        }
        Ok(page.copy_positions(&positions, 0, positions.len())?)
    }
}
