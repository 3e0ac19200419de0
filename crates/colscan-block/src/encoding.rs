//! Self-describing binary form of a Block.
//!
//! ```text
//! magic "CSBK" | version u8 | body | blake3(body) [32 bytes]
//! body  = tag u8 | position_count u64 | layout payload
//! ```
//!
//! Fixed-width payloads are `has_nulls u8`, optional null flags (one byte each)
//! and little-endian values. Variable-width payloads carry rebased `u32`
//! offsets and the data bytes. Dictionary and run-length payloads nest a body.
//! Only the block's view is written; a region encodes like a compact copy.

use colscan_core::hash::hash_bytes;

use crate::block::{ArrayBlock, Block, DictionaryBlock, FixedWidth, Int96ArrayBlock};
use crate::block::{data_offset, RunLengthBlock, VariableWidthBlock};
use crate::error::{BlockError, Result};

const MAGIC: &[u8; 4] = b"CSBK";
const VERSION: u8 = 1;
const CHECKSUM_BYTES: usize = 32;
/// Deepest dictionary or run-length nesting accepted when decoding.
const MAX_NESTING: usize = 8;

const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_INT96: u8 = 5;
const TAG_VARIABLE_WIDTH: u8 = 6;
const TAG_DICTIONARY: u8 = 7;
const TAG_RUN_LENGTH: u8 = 8;

/// Little-endian codec for the fixed-width element types.
trait Word: FixedWidth {
    fn put(self, out: &mut Vec<u8>);
    fn take(bytes: &[u8]) -> Self;
}

macro_rules! impl_word {
    ($($t:ty),*) => {$(
        impl Word for $t {
            fn put(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
            fn take(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }
        }
    )*};
}

impl_word!(i8, i16, i32, i64);

pub fn encode_block(block: &Block) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(block.size_in_bytes() as usize + 16);
    write_body(block, &mut body)?;
    let checksum = hash_bytes(&body);

    let mut out = Vec::with_capacity(MAGIC.len() + 1 + body.len() + CHECKSUM_BYTES);
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&body);
    out.extend_from_slice(&checksum.0);
    Ok(out)
}

pub fn decode_block(bytes: &[u8]) -> Result<Block> {
    let header = MAGIC.len() + 1;
    if bytes.len() < header + CHECKSUM_BYTES {
        return Err(corrupt(format!("{} bytes is too short for a block", bytes.len())));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(corrupt("bad magic".into()));
    }
    if bytes[MAGIC.len()] != VERSION {
        return Err(corrupt(format!("unsupported version {}", bytes[MAGIC.len()])));
    }
    let (body, checksum) = bytes[header..].split_at(bytes.len() - header - CHECKSUM_BYTES);
    if hash_bytes(body).0[..] != *checksum {
        return Err(corrupt("checksum mismatch".into()));
    }
    let mut reader = Reader { bytes: body, at: 0 };
    let block = reader.body(0)?;
    if reader.at != body.len() {
        return Err(corrupt(format!(
            "{} trailing bytes after block",
            body.len() - reader.at
        )));
    }
    Ok(block)
}

fn corrupt(message: String) -> BlockError {
    BlockError::Corrupt(message)
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_nulls(out: &mut Vec<u8>, nulls: Option<&[bool]>) {
    match nulls {
        Some(flags) => {
            out.push(1);
            out.extend(flags.iter().map(|f| *f as u8));
        }
        None => out.push(0),
    }
}

fn put_array<T: Word>(out: &mut Vec<u8>, tag: u8, block: &ArrayBlock<T>) {
    out.push(tag);
    put_u64(out, block.position_count() as u64);
    put_nulls(out, block.nulls());
    for v in block.values() {
        v.put(out);
    }
}

fn put_int96(out: &mut Vec<u8>, block: &Int96ArrayBlock) {
    out.push(TAG_INT96);
    put_u64(out, block.position_count() as u64);
    put_nulls(out, block.nulls());
    for (high, low) in block.high_words().iter().zip(block.low_words()) {
        high.put(out);
        low.put(out);
    }
}

fn put_variable_width(out: &mut Vec<u8>, block: &VariableWidthBlock) -> Result<()> {
    let count = block.position_count();
    out.push(TAG_VARIABLE_WIDTH);
    put_u64(out, count as u64);
    if block.may_have_null() {
        let flags = (0..count)
            .map(|p| block.is_null(p))
            .collect::<Result<Vec<_>>>()?;
        put_nulls(out, Some(&flags));
    } else {
        put_nulls(out, None);
    }
    let mut end = 0usize;
    put_u32(out, 0);
    for p in 0..count {
        end += block.slice_length(p)?;
        put_u32(out, data_offset(end)?);
    }
    for p in 0..count {
        out.extend_from_slice(block.slice(p)?);
    }
    Ok(())
}

fn write_body(block: &Block, out: &mut Vec<u8>) -> Result<()> {
    match block {
        Block::Byte(b) => put_array(out, TAG_BYTE, b),
        Block::Short(b) => put_array(out, TAG_SHORT, b),
        Block::Int(b) => put_array(out, TAG_INT, b),
        Block::Long(b) => put_array(out, TAG_LONG, b),
        Block::Int96(b) => put_int96(out, b),
        Block::VariableWidth(b) => put_variable_width(out, b)?,
        Block::Dictionary(d) => {
            out.push(TAG_DICTIONARY);
            put_u64(out, d.position_count() as u64);
            write_body(d.dictionary(), out)?;
            for id in d.ids() {
                put_u32(out, *id);
            }
        }
        Block::RunLength(r) => {
            out.push(TAG_RUN_LENGTH);
            put_u64(out, r.position_count() as u64);
            write_body(r.value(), out)?;
        }
    }
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .at
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| corrupt(format!("truncated: need {} bytes at {}", n, self.at)))?;
        let slice = &self.bytes[self.at..end];
        self.at = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn count(&mut self) -> Result<usize> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        let count = u64::from_le_bytes(buf);
        usize::try_from(count).map_err(|_| corrupt(format!("position count {} overflows", count)))
    }

    /// Reject counts that cannot possibly fit in the remaining bytes before allocating.
    fn expect_room(&self, count: usize, per_position: usize) -> Result<()> {
        match count.checked_mul(per_position) {
            Some(need) if need <= self.bytes.len() - self.at => Ok(()),
            _ => Err(corrupt(format!(
                "{} positions cannot fit in {} remaining bytes",
                count,
                self.bytes.len() - self.at
            ))),
        }
    }

    fn nulls(&mut self, count: usize) -> Result<Option<Vec<bool>>> {
        match self.u8()? {
            0 => Ok(None),
            1 => {
                let flags = self.take(count)?;
                flags
                    .iter()
                    .map(|f| match f {
                        0 => Ok(false),
                        1 => Ok(true),
                        other => Err(corrupt(format!("null flag {}", other))),
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Some)
            }
            other => Err(corrupt(format!("null marker {}", other))),
        }
    }

    fn words<T: Word>(&mut self, count: usize) -> Result<Vec<T>> {
        let bytes = self.take(count * T::WIDTH)?;
        Ok(bytes.chunks_exact(T::WIDTH).map(T::take).collect())
    }

    fn array<T: Word>(&mut self, count: usize) -> Result<ArrayBlock<T>> {
        self.expect_room(count, T::WIDTH)?;
        let nulls = self.nulls(count)?;
        let values = self.words::<T>(count)?;
        ArrayBlock::new(values, nulls).map_err(|e| corrupt(e.to_string()))
    }

    fn body(&mut self, depth: usize) -> Result<Block> {
        if depth > MAX_NESTING {
            return Err(corrupt(format!("blocks nested deeper than {}", MAX_NESTING)));
        }
        let tag = self.u8()?;
        let count = self.count()?;
        let block = match tag {
            TAG_BYTE => Block::Byte(self.array(count)?),
            TAG_SHORT => Block::Short(self.array(count)?),
            TAG_INT => Block::Int(self.array(count)?),
            TAG_LONG => Block::Long(self.array(count)?),
            TAG_INT96 => {
                self.expect_room(count, 12)?;
                let nulls = self.nulls(count)?;
                let mut high = Vec::with_capacity(count);
                let mut low = Vec::with_capacity(count);
                for _ in 0..count {
                    high.push(i64::take(self.take(8)?));
                    low.push(i32::take(self.take(4)?));
                }
                Block::Int96(
                    Int96ArrayBlock::new(high, low, nulls).map_err(|e| corrupt(e.to_string()))?,
                )
            }
            TAG_VARIABLE_WIDTH => {
                self.expect_room(count, 4)?;
                let nulls = self.nulls(count)?;
                let offsets = (0..=count).map(|_| self.u32()).collect::<Result<Vec<_>>>()?;
                let data_len = offsets.last().copied().unwrap_or(0) as usize;
                let bytes = self.take(data_len)?.to_vec();
                Block::VariableWidth(
                    VariableWidthBlock::new(bytes, offsets, nulls)
                        .map_err(|e| corrupt(e.to_string()))?,
                )
            }
            TAG_DICTIONARY => {
                let dictionary = self.body(depth + 1)?;
                self.expect_room(count, 4)?;
                let ids = (0..count).map(|_| self.u32()).collect::<Result<Vec<_>>>()?;
                Block::Dictionary(
                    DictionaryBlock::new(dictionary, ids).map_err(|e| corrupt(e.to_string()))?,
                )
            }
            TAG_RUN_LENGTH => {
                let value = self.body(depth + 1)?;
                Block::RunLength(
                    RunLengthBlock::new(value, count).map_err(|e| corrupt(e.to_string()))?,
                )
            }
            other => return Err(corrupt(format!("unknown layout tag {}", other))),
        };
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colscan_core::types::{ColumnType, Value};

    #[test]
    fn test_region_encodes_as_compact_copy() {
        let block = Block::Long(ArrayBlock::new(vec![1, 2, 3, 4], Some(vec![false, true, false, false])).unwrap());
        let region = block.get_region(1, 2).unwrap();
        let decoded = decode_block(&encode_block(&region).unwrap()).unwrap();
        assert_eq!(decoded.position_count(), 2);
        assert_eq!(decoded.get_value(0, ColumnType::BigInt).unwrap(), None);
        assert_eq!(decoded.get_value(1, ColumnType::BigInt).unwrap(), Some(Value::Long(3)));
    }

    #[test]
    fn test_nested_layouts_survive() {
        let strings = Block::VariableWidth(
            VariableWidthBlock::new(b"xyzzy".to_vec(), vec![0, 3, 5], None).unwrap(),
        );
        let dict = Block::Dictionary(DictionaryBlock::new(strings, vec![1, 0, 1]).unwrap());
        let decoded = decode_block(&encode_block(&dict).unwrap()).unwrap();
        assert_eq!(decoded.encoding_name(), "DICTIONARY");
        assert_eq!(decoded.get_slice(0).unwrap(), b"zy");
        assert_eq!(decoded.get_slice(1).unwrap(), b"xyz");

        let rle = Block::RunLength(
            RunLengthBlock::new(Block::Int(ArrayBlock::new(vec![9], None).unwrap()), 1000).unwrap(),
        );
        let decoded = decode_block(&encode_block(&rle).unwrap()).unwrap();
        assert_eq!(decoded.position_count(), 1000);
        assert_eq!(decoded.get_int(999, 0).unwrap(), 9);
    }

    #[test]
    fn test_flipped_byte_is_corrupt() {
        let block = Block::Int(ArrayBlock::new(vec![1, 2, 3], None).unwrap());
        let mut bytes = encode_block(&block).unwrap();
        bytes[8] ^= 0xff;
        let err = decode_block(&bytes).unwrap_err();
        assert!(matches!(err, BlockError::Corrupt(_)));
        assert!(err.is_fatal());
    }

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.push(VERSION);
        out.extend_from_slice(body);
        out.extend_from_slice(&hash_bytes(body).0);
        out
    }

    #[test]
    fn test_deep_nesting_is_corrupt() {
        let mut body = Vec::new();
        for _ in 0..100_000 {
            body.push(TAG_DICTIONARY);
            put_u64(&mut body, 0);
        }
        let err = decode_block(&frame(&body)).unwrap_err();
        assert_eq!(
            err,
            BlockError::Corrupt(format!("blocks nested deeper than {}", MAX_NESTING))
        );
    }

    #[test]
    fn test_truncated_and_bad_magic() {
        let block = Block::Byte(ArrayBlock::new(vec![1], None).unwrap());
        let bytes = encode_block(&block).unwrap();
        assert!(decode_block(&bytes[..10]).is_err());
        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert!(decode_block(&bad).is_err());
    }
}
