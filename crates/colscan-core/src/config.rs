//! Scan configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Target byte length of a scan split carved from a splittable file.
    pub max_split_size: u64,

    /// Smaller target used for the first `max_initial_splits` splits so that
    /// workers get started quickly.
    pub max_initial_split_size: u64,

    /// How many splits are carved with `max_initial_split_size`.
    pub max_initial_splits: usize,

    /// Hard cap on the estimated bytes of split descriptors buffered in a split
    /// source. Exceeding it fails the source.
    pub max_outstanding_splits_bytes: usize,

    /// Descriptors queued before the loader is made to wait for consumers.
    pub max_queued_descriptors: usize,

    /// Default `max_size` for a split batch request.
    pub split_batch_size: usize,

    /// Rows per page emitted by the scan pipeline.
    pub target_page_rows: usize,

    /// Initial entry capacity of each block builder.
    pub expected_block_entries: usize,

    /// Partitions listed concurrently by the split loader.
    pub loader_concurrency: usize,

    /// Hard memory cap (in bytes) for pages resident in a scan pipeline.
    pub mem_cap_bytes: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_split_size: 64 * MIB,
            max_initial_split_size: 32 * MIB,
            max_initial_splits: 200,
            max_outstanding_splits_bytes: 32 * MIB as usize,
            max_queued_descriptors: 1000,
            split_batch_size: 1000,
            target_page_rows: 1024,
            expected_block_entries: 1024,
            loader_concurrency: 4,
            mem_cap_bytes: 512 * MIB as usize,
        }
    }
}

impl ScanConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `COLSCAN_MAX_SPLIT_SIZE`: split size in bytes
    /// - `COLSCAN_MAX_INITIAL_SPLIT_SIZE`: initial split size in bytes
    /// - `COLSCAN_MAX_INITIAL_SPLITS`: number of initial splits
    /// - `COLSCAN_MAX_OUTSTANDING_SPLITS_BYTES`: split buffer cap
    /// - `COLSCAN_MAX_QUEUED_DESCRIPTORS`: loader backpressure threshold
    /// - `COLSCAN_SPLIT_BATCH_SIZE`: default split batch size
    /// - `COLSCAN_TARGET_PAGE_ROWS`: rows per page
    /// - `COLSCAN_EXPECTED_BLOCK_ENTRIES`: builder capacity hint
    /// - `COLSCAN_LOADER_CONCURRENCY`: concurrent partition listings
    /// - `COLSCAN_MEM_CAP_BYTES`: page memory cap
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_parse("COLSCAN_MAX_SPLIT_SIZE") {
            cfg.max_split_size = v;
        }
        if let Some(v) = env_parse("COLSCAN_MAX_INITIAL_SPLIT_SIZE") {
            cfg.max_initial_split_size = v;
        }
        if let Some(v) = env_parse("COLSCAN_MAX_INITIAL_SPLITS") {
            cfg.max_initial_splits = v;
        }
        if let Some(v) = env_parse("COLSCAN_MAX_OUTSTANDING_SPLITS_BYTES") {
            cfg.max_outstanding_splits_bytes = v;
        }
        if let Some(v) = env_parse("COLSCAN_MAX_QUEUED_DESCRIPTORS") {
            cfg.max_queued_descriptors = v;
        }
        if let Some(v) = env_parse("COLSCAN_SPLIT_BATCH_SIZE") {
            cfg.split_batch_size = v;
        }
        if let Some(v) = env_parse("COLSCAN_TARGET_PAGE_ROWS") {
            cfg.target_page_rows = v;
        }
        if let Some(v) = env_parse("COLSCAN_EXPECTED_BLOCK_ENTRIES") {
            cfg.expected_block_entries = v;
        }
        if let Some(v) = env_parse("COLSCAN_LOADER_CONCURRENCY") {
            cfg.loader_concurrency = v;
        }
        if let Some(v) = env_parse("COLSCAN_MEM_CAP_BYTES") {
            cfg.mem_cap_bytes = v;
        }

        cfg
    }

    /// Parse a YAML document; missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: ScanConfig = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_split_size", self.max_split_size as usize),
            ("max_initial_split_size", self.max_initial_split_size as usize),
            ("max_outstanding_splits_bytes", self.max_outstanding_splits_bytes),
            ("max_queued_descriptors", self.max_queued_descriptors),
            ("split_batch_size", self.split_batch_size),
            ("target_page_rows", self.target_page_rows),
            ("loader_concurrency", self.loader_concurrency),
            ("mem_cap_bytes", self.mem_cap_bytes),
        ];
        for (name, v) in positive {
            if v == 0 {
                return Err(Error::Config(format!("{} must be positive", name)));
            }
        }
        if self.max_initial_split_size > self.max_split_size {
            return Err(Error::Config(format!(
                "max_initial_split_size ({}) exceeds max_split_size ({})",
                self.max_initial_split_size, self.max_split_size
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        ScanConfig::default().validate().unwrap();
    }

    #[test]
    fn test_yaml_overrides_and_defaults() {
        let cfg = ScanConfig::from_yaml_str("max_split_size: 1024\nmax_initial_split_size: 512\n")
            .unwrap();
        assert_eq!(cfg.max_split_size, 1024);
        assert_eq!(cfg.max_initial_split_size, 512);
        assert_eq!(cfg.target_page_rows, ScanConfig::default().target_page_rows);
    }

    #[test]
    fn test_initial_split_larger_than_max_is_rejected() {
        let err = ScanConfig::from_yaml_str("max_split_size: 10\nmax_initial_split_size: 20\n")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_page_rows_is_rejected() {
        let cfg = ScanConfig {
            target_page_rows: 0,
            ..ScanConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
