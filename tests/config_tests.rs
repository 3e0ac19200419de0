//! ScanConfig loading and validation

use colscan_core::config::ScanConfig;
use colscan_core::error::Error;

#[test]
fn test_yaml_document_overrides_defaults() {
    let yaml = r#"
max_split_size: 134217728
max_initial_split_size: 16777216
max_initial_splits: 10
target_page_rows: 4096
loader_concurrency: 8
"#;
    let cfg = ScanConfig::from_yaml_str(yaml).expect("Failed to parse config");
    assert_eq!(cfg.max_split_size, 128 * 1024 * 1024);
    assert_eq!(cfg.max_initial_split_size, 16 * 1024 * 1024);
    assert_eq!(cfg.max_initial_splits, 10);
    assert_eq!(cfg.target_page_rows, 4096);
    assert_eq!(cfg.loader_concurrency, 8);

    let defaults = ScanConfig::default();
    assert_eq!(cfg.max_queued_descriptors, defaults.max_queued_descriptors);
    assert_eq!(cfg.mem_cap_bytes, defaults.mem_cap_bytes);
}

#[test]
fn test_empty_yaml_is_default() {
    let cfg = ScanConfig::from_yaml_str("{}").unwrap();
    assert_eq!(cfg, ScanConfig::default());
}

#[test]
fn test_invalid_yaml_is_config_error() {
    let err = ScanConfig::from_yaml_str("max_split_size: [1, 2]").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_validation_names_the_field() {
    for (cfg, field) in [
        (
            ScanConfig {
                split_batch_size: 0,
                ..ScanConfig::default()
            },
            "split_batch_size",
        ),
        (
            ScanConfig {
                mem_cap_bytes: 0,
                ..ScanConfig::default()
            },
            "mem_cap_bytes",
        ),
        (
            ScanConfig {
                max_split_size: 100,
                max_initial_split_size: 200,
                ..ScanConfig::default()
            },
            "max_initial_split_size",
        ),
    ] {
        match cfg.validate() {
            Err(Error::Config(msg)) => assert!(msg.contains(field), "{}", msg),
            other => panic!("expected config error for {}, got {:?}", field, other),
        }
    }
}

#[test]
fn test_from_env_reads_colscan_variables() {
    std::env::set_var("COLSCAN_TARGET_PAGE_ROWS", "256");
    std::env::set_var("COLSCAN_MAX_QUEUED_DESCRIPTORS", " 12 ");
    std::env::set_var("COLSCAN_LOADER_CONCURRENCY", "lots");
    let cfg = ScanConfig::from_env();
    std::env::remove_var("COLSCAN_TARGET_PAGE_ROWS");
    std::env::remove_var("COLSCAN_MAX_QUEUED_DESCRIPTORS");
    std::env::remove_var("COLSCAN_LOADER_CONCURRENCY");

    assert_eq!(cfg.target_page_rows, 256);
    assert_eq!(cfg.max_queued_descriptors, 12);
    // unparseable values fall back to the default
    assert_eq!(cfg.loader_concurrency, ScanConfig::default().loader_concurrency);
}

#[test]
fn test_json_round_trip() {
    let cfg = ScanConfig {
        max_split_size: 1000,
        max_initial_split_size: 500,
        ..ScanConfig::default()
    };
    let json = serde_json::to_string(&cfg).unwrap();
    let back: ScanConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}
