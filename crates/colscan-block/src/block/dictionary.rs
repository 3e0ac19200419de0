//! Dictionary-encoded blocks: positions are ids into a shared dictionary Block.

use std::mem::size_of;
use std::sync::{Arc, OnceLock};

use super::{check_position, check_region, selected_positions, Block};
use crate::error::{BlockError, Result};
use crate::size::shared_vec_retained;

const ID_BYTES: usize = size_of::<u32>();

#[derive(Debug, Clone)]
pub struct DictionaryBlock {
    position_offset: usize,
    position_count: usize,
    dictionary: Arc<Block>,
    ids: Arc<Vec<u32>>,
    // Needs a pass over the ids; computed on first use and kept.
    size_in_bytes: OnceLock<u64>,
    retained_size_in_bytes: u64,
}

impl DictionaryBlock {
    const INSTANCE_SIZE: usize = size_of::<Self>();

    pub fn new(dictionary: Block, ids: Vec<u32>) -> Result<Self> {
        let count = ids.len();
        Self::from_shared(0, count, Arc::new(dictionary), Arc::new(ids))
    }

    /// View over shared ids; every id in the view must address the dictionary.
    pub fn from_shared(
        position_offset: usize,
        position_count: usize,
        dictionary: Arc<Block>,
        ids: Arc<Vec<u32>>,
    ) -> Result<Self> {
        let end = position_offset
            .checked_add(position_count)
            .ok_or_else(|| BlockError::InvalidArguments("position range overflows".into()))?;
        if ids.len() < end {
            return Err(BlockError::InvalidArguments(format!(
                "ids hold {} entries, need {}",
                ids.len(),
                end
            )));
        }
        let dictionary_size = dictionary.position_count();
        if let Some(bad) = ids[position_offset..end]
            .iter()
            .find(|id| **id as usize >= dictionary_size)
        {
            return Err(BlockError::InvalidArguments(format!(
                "dictionary id {} out of range for dictionary of {} entries",
                bad, dictionary_size
            )));
        }
        Ok(Self::from_parts(position_offset, position_count, dictionary, ids))
    }

    fn from_parts(
        position_offset: usize,
        position_count: usize,
        dictionary: Arc<Block>,
        ids: Arc<Vec<u32>>,
    ) -> Self {
        let retained_size_in_bytes = Self::INSTANCE_SIZE as u64
            + shared_vec_retained(&ids)
            + dictionary.retained_size_in_bytes();
        Self {
            position_offset,
            position_count,
            dictionary,
            ids,
            size_in_bytes: OnceLock::new(),
            retained_size_in_bytes,
        }
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    pub fn dictionary(&self) -> &Block {
        &self.dictionary
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids[self.position_offset..self.position_offset + self.position_count]
    }

    /// Dictionary position backing `position`.
    pub fn id(&self, position: usize) -> Result<usize> {
        check_position(position, self.position_count)?;
        Ok(self.ids[self.position_offset + position] as usize)
    }

    fn used_entries(&self, ids: impl Iterator<Item = u32>) -> Vec<bool> {
        let mut used = vec![false; self.dictionary.position_count()];
        for id in ids {
            used[id as usize] = true;
        }
        used
    }

    fn size_of_ids<'a>(&self, ids: impl Iterator<Item = &'a u32> + Clone) -> Result<u64> {
        let count = ids.clone().count();
        let used = self.used_entries(ids.copied());
        Ok(self.dictionary.positions_size_in_bytes(&used)? + (ID_BYTES * count) as u64)
    }

    /// Ids plus the dictionary entries this view references.
    pub fn size_in_bytes(&self) -> u64 {
        *self.size_in_bytes.get_or_init(|| {
            // `used_entries` yields one flag per dictionary entry, the only thing
            // sizing checks. Should it fail anyway, charge the whole dictionary.
            self.size_of_ids(self.ids().iter())
                .unwrap_or_else(|_| self.dictionary.size_in_bytes() + (ID_BYTES * self.position_count) as u64)
        })
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> Result<u64> {
        check_region(offset, length, self.position_count)?;
        self.size_of_ids(self.ids()[offset..offset + length].iter())
    }

    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> Result<u64> {
        selected_positions(selected, self.position_count)?;
        let ids = self.ids();
        self.size_of_ids(
            selected
                .iter()
                .zip(ids.iter())
                .filter(|(keep, _)| **keep)
                .map(|(_, id)| id),
        )
    }

    pub fn retained_size_in_bytes(&self) -> u64 {
        self.retained_size_in_bytes
    }

    pub fn get_region(&self, offset: usize, length: usize) -> Result<Self> {
        check_region(offset, length, self.position_count)?;
        Ok(Self::from_parts(
            self.position_offset + offset,
            length,
            Arc::clone(&self.dictionary),
            Arc::clone(&self.ids),
        ))
    }

    pub fn copy_region(&self, offset: usize, length: usize) -> Result<Self> {
        check_region(offset, length, self.position_count)?;
        let compacted = if offset == 0
            && length == self.position_count
            && self.position_offset == 0
            && self.ids.len() == length
        {
            self.clone()
        } else {
            let ids = self.ids()[offset..offset + length].to_vec();
            Self::from_parts(0, length, Arc::clone(&self.dictionary), Arc::new(ids))
        };
        compacted.compact()
    }

    pub fn copy_positions(&self, positions: &[usize], offset: usize, length: usize) -> Result<Self> {
        let positions = super::check_positions(positions, offset, length, self.position_count)?;
        let ids = self.ids();
        let gathered: Vec<u32> = positions.iter().map(|p| ids[*p]).collect();
        Self::from_parts(0, length, Arc::clone(&self.dictionary), Arc::new(gathered)).compact()
    }

    /// Rewrite so the dictionary holds only referenced entries, in dictionary
    /// order. Returns `self` unchanged when every entry is already referenced.
    pub fn compact(&self) -> Result<Self> {
        let used = self.used_entries(self.ids().iter().copied());
        if used.iter().all(|u| *u) {
            return Ok(self.clone());
        }
        let mut remap = vec![u32::MAX; used.len()];
        let mut kept = Vec::new();
        for (position, is_used) in used.iter().enumerate() {
            if *is_used {
                remap[position] = kept.len() as u32;
                kept.push(position);
            }
        }
        let dictionary = self.dictionary.copy_positions(&kept, 0, kept.len())?;
        let ids: Vec<u32> = self.ids().iter().map(|id| remap[*id as usize]).collect();
        Ok(Self::from_parts(
            0,
            self.position_count,
            Arc::new(dictionary),
            Arc::new(ids),
        ))
    }

    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ids, &other.ids) && Arc::ptr_eq(&self.dictionary, &other.dictionary)
    }

    pub fn same_view(&self, other: &Self) -> bool {
        self.shares_storage(other)
            && self.position_offset == other.position_offset
            && self.position_count == other.position_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::ArrayBlock;

    fn dictionary_block() -> DictionaryBlock {
        let dictionary = Block::Long(ArrayBlock::new(vec![100, 200, 300, 400], None).unwrap());
        DictionaryBlock::new(dictionary, vec![2, 0, 2, 1]).unwrap()
    }

    #[test]
    fn test_ids_validated() {
        let dictionary = Block::Long(ArrayBlock::new(vec![1], None).unwrap());
        assert!(DictionaryBlock::new(dictionary, vec![0, 1]).is_err());
    }

    #[test]
    fn test_size_counts_only_referenced_entries() {
        let b = dictionary_block();
        // three distinct entries of 9 bytes each + four 4-byte ids
        assert_eq!(b.size_in_bytes(), 27 + 16);
        assert_eq!(b.region_size_in_bytes(0, 3).unwrap(), 18 + 12);
    }

    #[test]
    fn test_view_size_bounded_by_dictionary() {
        let b = dictionary_block();
        let full = b.dictionary().size_in_bytes() + (ID_BYTES * b.position_count()) as u64;
        assert!(b.size_in_bytes() <= full);
        let view = b.get_region(1, 1).unwrap();
        assert_eq!(view.size_in_bytes(), 9 + 4);
        let empty = b.get_region(2, 0).unwrap();
        assert_eq!(empty.size_in_bytes(), 0);
    }

    #[test]
    fn test_compact_drops_unused_entries() {
        let compact = dictionary_block().compact().unwrap();
        assert_eq!(compact.dictionary().position_count(), 3);
        let decoded: Vec<i64> = (0..4)
            .map(|p| compact.dictionary().get_long(compact.id(p).unwrap(), 0).unwrap())
            .collect();
        assert_eq!(decoded, vec![300, 100, 300, 200]);
    }

    #[test]
    fn test_copy_positions_gathers_ids() {
        let copy = dictionary_block().copy_positions(&[3, 3], 0, 2).unwrap();
        assert_eq!(copy.dictionary().position_count(), 1);
        assert_eq!(copy.ids(), &[0, 0]);
    }
}
