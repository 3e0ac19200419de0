#![forbid(unsafe_code)]
//! colscan-exec: turns scan splits into filtered pages.
//!
//! [`ScanPipeline`] drives one [`ScanSplit`](colscan_split::ScanSplit) through
//! a format-specific [`SplitDecoder`], prunes on partition values and
//! statistics before decoding, and hands out pages whose memory stays
//! accounted until they are dropped.

pub mod decoder;
pub mod error;
pub mod pipeline;
pub mod stats;

pub use decoder::{MemoryDecoder, ScanColumn, SplitDecoder};
pub use error::{Result, ScanError};
pub use pipeline::{ScanPipeline, ScannedPage, SplitScan};
pub use stats::ScanStats;
