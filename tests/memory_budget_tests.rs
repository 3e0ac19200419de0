//! Memory budget enforcement, on its own and as used by split sources and pages

mod test_data_gen;

use std::sync::Arc;
use std::thread;

use colscan_core::budget::{BudgetGuard, MemoryBudget};
use colscan_core::config::ScanConfig;
use colscan_mem::{Error, MemoryBudgetImpl};
use colscan_split::{SplitFactory, SplitSource};
use test_data_gen::{listed_file, partition, sample_page};

#[test]
fn test_budget_acquire_release() {
    let budget = MemoryBudgetImpl::new(1024 * 1024);
    assert_eq!(budget.used_bytes(), 0);

    let guard = budget
        .try_acquire(100 * 1024, "test")
        .expect("Acquire failed");
    assert_eq!(budget.used_bytes(), 100 * 1024);
    assert_eq!(guard.bytes(), 100 * 1024);
    assert_eq!(guard.tag(), "test");

    drop(guard);
    assert_eq!(budget.used_bytes(), 0);
    assert_eq!(budget.peak_bytes(), 100 * 1024);
}

#[test]
fn test_budget_exhaustion_and_recovery() {
    let budget = MemoryBudgetImpl::new(500);
    let first = budget.try_acquire(400, "pages").expect("First acquire failed");
    assert!(budget.try_acquire(200, "pages").is_none());
    assert_eq!(budget.used_bytes(), 400);

    let err = budget.reserve(200, "pages").unwrap_err();
    assert_eq!(
        err,
        Error::BudgetExceeded {
            tag: "pages",
            requested: 200,
            capacity: 500,
            used: 400
        }
    );

    drop(first);
    let _second = budget.try_acquire(200, "pages").expect("Acquire after release failed");
    assert_eq!(budget.used_bytes(), 200);
}

#[test]
fn test_budget_exact_capacity() {
    let budget = MemoryBudgetImpl::new(1024);
    let guard = budget.try_acquire(1024, "test").expect("Should acquire exact capacity");
    assert!(budget.try_acquire(1, "test").is_none());
    assert_eq!(budget.available_bytes(), 0);
    drop(guard);
    assert_eq!(budget.available_bytes(), 1024);
}

#[test]
fn test_budget_try_resize() {
    let budget = MemoryBudgetImpl::new(1024);
    let mut guard = budget.try_acquire(100, "test").unwrap();
    assert!(guard.try_resize(600));
    assert_eq!(budget.used_bytes(), 600);
    assert!(!guard.try_resize(2048));
    assert_eq!(guard.bytes(), 600);
    assert!(guard.try_resize(50));
    assert_eq!(budget.used_bytes(), 50);
    drop(guard);
    assert_eq!(budget.used_bytes(), 0);
}

#[test]
fn test_budget_high_contention_never_exceeds_cap() {
    let budget = Arc::new(MemoryBudgetImpl::new(100 * 1024));
    let handles: Vec<_> = (0..20)
        .map(|_| {
            let budget = Arc::clone(&budget);
            thread::spawn(move || {
                for _ in 0..10 {
                    if let Some(guard) = budget.try_acquire(10 * 1024, "test") {
                        assert!(budget.used_bytes() <= budget.capacity_bytes());
                        thread::sleep(std::time::Duration::from_micros(100));
                        drop(guard);
                    } else {
                        thread::sleep(std::time::Duration::from_micros(50));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    assert_eq!(budget.used_bytes(), 0);
    assert!(budget.peak_bytes() <= 100 * 1024);
}

#[test]
fn test_page_retained_size_fits_budget_accounting() {
    let page = sample_page(64);
    let budget = MemoryBudgetImpl::new(page.retained_size_in_bytes() as usize);
    let guard = budget
        .try_acquire(page.retained_size_in_bytes() as usize, "scan-page")
        .expect("page should fit exactly");
    assert!(budget.try_acquire(1, "scan-page").is_none());
    drop(guard);
    assert_eq!(budget.used_bytes(), 0);
}

#[tokio::test]
async fn test_split_source_returns_bytes_as_splits_are_carved() {
    let source = SplitSource::new(&ScanConfig {
        max_split_size: 1000,
        max_initial_split_size: 1000,
        ..ScanConfig::default()
    });
    let factory = SplitFactory::new(partition(1), false);
    let listed = listed_file("/t/ds=1/a", 1500, 2);
    let descriptor = factory
        .create_for_file(&listed.file, &listed.locations)
        .unwrap()
        .unwrap();
    let estimated = descriptor.estimated_size_in_bytes();

    source.add_to_queue(descriptor).await.unwrap();
    assert_eq!(source.buffered_bytes(), estimated);

    // 1500 bytes carve into two halves; the descriptor is released only when empty
    let first = source.next_batch(1).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(source.buffered_bytes(), estimated);
    let second = source.next_batch(1).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(source.buffered_bytes(), 0);
}
