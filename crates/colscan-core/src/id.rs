//! Strongly-typed identifiers used across the scan layer.
//!
//! Downstream crates should *not* pass raw integers for splits or columns.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

// Sequence number handed out by a split source, unique per source.
new_id!(SplitId);
// Physical column index (channel) inside a decoded page.
new_id!(ColumnId);

impl ColumnId {
    /// Channel index as a `usize` for indexing page blocks.
    pub fn channel(self) -> usize {
        self.0 as usize
    }
}
