#![forbid(unsafe_code)]
//! colscan-split: splitting files into units of scan work.
//!
//! - [`SplitFactory`] builds a [`SplitDescriptor`] per listed file: a byte
//!   span made of contiguous, host-annotated [`ByteRange`]s.
//! - [`SplitSource`] buffers descriptors under a memory cap and carves
//!   [`ScanSplit`]s off them on demand.
//! - [`SplitLoader`] feeds the source from a [`PartitionLister`] on a tokio
//!   task, pruning partitions and paths by predicate.

pub mod address;
pub mod descriptor;
pub mod error;
pub mod factory;
pub mod loader;
pub mod scan_split;
pub mod source;

pub use address::{ByteRange, HostAddress};
pub use descriptor::{FileEntry, PartitionInfo, PartitionKey, SplitDescriptor};
pub use error::{Result, SplitError};
pub use factory::{BlockLocation, SplitFactory};
pub use loader::{ListedFile, LoaderOptions, PartitionLister, SplitLoader, PATH_COLUMN};
pub use scan_split::ScanSplit;
pub use source::{SourceState, SplitSource};
