#![forbid(unsafe_code)]
//! colscan-block: columnar value storage.
//!
//! A [`Block`] holds one column's values for a run of positions. Backing arrays
//! are `Arc`-shared and immutable once published, so slicing with
//! [`Block::get_region`] is zero-copy and blocks can be read from many threads.
//! [`BlockBuilder`] is the single-writer, append-only way to make one, and a
//! [`Page`] groups equally sized blocks into a row batch.

pub mod block;
pub mod builder;
pub mod encoding;
pub mod error;
pub mod page;
pub mod size;

pub use block::{
    ArrayBlock, Block, DictionaryBlock, Int96ArrayBlock, RunLengthBlock, VariableWidthBlock,
};
pub use builder::BlockBuilder;
pub use encoding::{decode_block, encode_block};
pub use error::{BlockError, Result};
pub use page::Page;
