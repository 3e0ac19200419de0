//! A Page: equally sized Blocks, one per channel, forming a batch of rows.

use std::mem::size_of;
use std::sync::Arc;

use crate::block::{check_position, check_positions, check_region, Block, RunLengthBlock};
use crate::error::{BlockError, Result};

#[derive(Debug, Clone)]
pub struct Page {
    position_count: usize,
    blocks: Arc<[Block]>,
}

impl Page {
    const INSTANCE_SIZE: usize = size_of::<Self>();

    /// Every block must have `position_count` positions.
    pub fn new(position_count: usize, blocks: Vec<Block>) -> Result<Self> {
        for (channel, block) in blocks.iter().enumerate() {
            if block.position_count() != position_count {
                return Err(BlockError::PositionCountMismatch {
                    channel,
                    expected: position_count,
                    actual: block.position_count(),
                });
            }
        }
        Ok(Self {
            position_count,
            blocks: blocks.into(),
        })
    }

    /// Page whose row count is taken from its first block.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        let count = blocks.first().map_or(0, Block::position_count);
        Self::new(count, blocks)
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    pub fn channel_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, channel: usize) -> Result<&Block> {
        self.blocks.get(channel).ok_or_else(|| {
            BlockError::InvalidArguments(format!(
                "channel {} out of range for page with {} channels",
                channel,
                self.blocks.len()
            ))
        })
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.blocks.iter().map(Block::size_in_bytes).sum()
    }

    pub fn retained_size_in_bytes(&self) -> u64 {
        Self::INSTANCE_SIZE as u64
            + (size_of::<Block>() * self.blocks.len()) as u64
            + self
                .blocks
                .iter()
                .map(Block::retained_size_in_bytes)
                .sum::<u64>()
    }

    /// Zero-copy row range across every channel. The range is checked against
    /// the page itself so pages without channels are validated too.
    pub fn get_region(&self, offset: usize, length: usize) -> Result<Page> {
        check_region(offset, length, self.position_count)?;
        let blocks = self
            .blocks
            .iter()
            .map(|b| b.get_region(offset, length))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            position_count: length,
            blocks: blocks.into(),
        })
    }

    /// Gather `positions[offset..offset + length]` from every channel.
    pub fn copy_positions(&self, positions: &[usize], offset: usize, length: usize) -> Result<Page> {
        check_positions(positions, offset, length, self.position_count)?;
        let blocks = self
            .blocks
            .iter()
            .map(|b| b.copy_positions(positions, offset, length))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            position_count: length,
            blocks: blocks.into(),
        })
    }

    /// Page holding only `channels`, in the given order; repeats are allowed.
    pub fn get_columns(&self, channels: &[usize]) -> Result<Page> {
        let blocks = channels
            .iter()
            .map(|c| self.block(*c).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            position_count: self.position_count,
            blocks: blocks.into(),
        })
    }

    pub fn append_column(&self, block: Block) -> Result<Page> {
        if block.position_count() != self.position_count {
            return Err(BlockError::PositionCountMismatch {
                channel: self.blocks.len(),
                expected: self.position_count,
                actual: block.position_count(),
            });
        }
        let mut blocks = self.blocks.to_vec();
        blocks.push(block);
        Ok(Page {
            position_count: self.position_count,
            blocks: blocks.into(),
        })
    }

    /// One-row page holding a copy of row `position`.
    pub fn get_single_value_page(&self, position: usize) -> Result<Page> {
        check_position(position, self.position_count)?;
        let blocks = self
            .blocks
            .iter()
            .map(|b| b.single_value_block(position))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            position_count: 1,
            blocks: blocks.into(),
        })
    }

    /// Constant column: `value` (one position) repeated for every row.
    pub fn append_constant(&self, value: Block) -> Result<Page> {
        let constant = RunLengthBlock::new(value, self.position_count)?;
        self.append_column(Block::RunLength(constant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{ArrayBlock, VariableWidthBlock};

    fn page() -> Page {
        let ids = Block::Long(ArrayBlock::new(vec![1, 2, 3], None).unwrap());
        let names = Block::VariableWidth(
            VariableWidthBlock::new(b"abc".to_vec(), vec![0, 1, 2, 3], None).unwrap(),
        );
        Page::new(3, vec![ids, names]).unwrap()
    }

    #[test]
    fn test_mismatched_counts_rejected() {
        let short = Block::Long(ArrayBlock::new(vec![1], None).unwrap());
        let err = Page::new(3, vec![short]).unwrap_err();
        assert_eq!(
            err,
            BlockError::PositionCountMismatch {
                channel: 0,
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn test_region_and_copy_positions() {
        let p = page();
        let region = p.get_region(1, 2).unwrap();
        assert_eq!(region.position_count(), 2);
        assert_eq!(region.block(0).unwrap().get_long(0, 0).unwrap(), 2);

        let gathered = p.copy_positions(&[2, 0], 0, 2).unwrap();
        assert_eq!(gathered.block(1).unwrap().get_slice(0).unwrap(), b"c");
        assert_eq!(gathered.block(1).unwrap().get_slice(1).unwrap(), b"a");
    }

    #[test]
    fn test_row_bounds_checked_without_channels() {
        let empty = Page::new(3, Vec::new()).unwrap();
        assert_eq!(empty.get_region(1, 2).unwrap().position_count(), 2);
        assert_eq!(
            empty.get_region(2, 5).unwrap_err(),
            BlockError::InvalidRange {
                offset: 2,
                length: 5,
                position_count: 3
            }
        );
        assert!(empty.get_region(usize::MAX, 2).is_err());

        assert_eq!(empty.copy_positions(&[0, 2], 0, 2).unwrap().position_count(), 2);
        assert!(empty.copy_positions(&[0, 3], 0, 2).is_err());
        assert!(empty.copy_positions(&[0], 0, 4).is_err());
        assert!(empty.get_single_value_page(3).is_err());
    }

    #[test]
    fn test_columns_and_constants() {
        let p = page();
        let swapped = p.get_columns(&[1, 0]).unwrap();
        assert_eq!(swapped.block(1).unwrap().get_long(2, 0).unwrap(), 3);
        assert!(p.get_columns(&[5]).is_err());

        let key = Block::Int(ArrayBlock::new(vec![2024], None).unwrap());
        let with_key = p.append_constant(key).unwrap();
        assert_eq!(with_key.channel_count(), 3);
        assert_eq!(with_key.block(2).unwrap().get_int(2, 0).unwrap(), 2024);
    }

    #[test]
    fn test_single_value_page() {
        let single = page().get_single_value_page(1).unwrap();
        assert_eq!(single.position_count(), 1);
        assert_eq!(single.block(1).unwrap().get_slice(0).unwrap(), b"b");
    }
}
