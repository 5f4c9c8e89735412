use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use proptest::prelude::*;
use simdexpr::parallel::{run_1d, run_2d, split_1d, split_2d, Range1d, MAX_GRID_WORKERS};

fn assert_partition(ranges: &[Range1d], size: usize) {
    let mut next = 0;
    for range in ranges {
        assert_eq!(range.start, next, "gap or overlap at {next}");
        next = range.end();
    }
    assert_eq!(next, size);
}

#[test]
fn test_scenario_seventeen_over_four() {
    let ranges = split_1d(17, 4);
    assert_eq!(ranges.len(), 4);
    let lens: Vec<usize> = ranges.iter().map(|r| r.len).collect();
    assert_eq!(lens, vec![5, 4, 4, 4]);
    assert_eq!(lens.iter().sum::<usize>(), 17);
    assert_partition(&ranges, 17);
}

#[test]
fn test_more_workers_than_elements() {
    let ranges = split_1d(3, 5);
    assert_eq!(ranges.len(), 5);
    assert_partition(&ranges, 3);
    assert!(ranges[3].is_empty() && ranges[4].is_empty());
}

#[test]
#[should_panic(expected = "at least one worker")]
fn test_zero_workers_panics() {
    split_1d(10, 0);
}

#[test]
fn test_grid_factorizations() {
    for workers in 1..=MAX_GRID_WORKERS {
        let cells = split_2d(100, 90, workers);
        assert_eq!(cells.len(), workers, "{workers} workers");
        let area: usize = cells.iter().map(|c| c.axis1.len * c.axis2.len).sum();
        assert_eq!(area, 100 * 90);
        assert!(cells.iter().all(|c| c.axis1.end() <= 100 && c.axis2.end() <= 90));
    }

    // Seven workers is prime: seven row bands, one column band.
    let seven = split_2d(14, 5, 7);
    assert!(seven.iter().all(|c| c.axis1.len == 2 && c.axis2.len == 5));

    let six = split_2d(9, 4, 6);
    assert_eq!(six[0].axis1, Range1d { start: 0, len: 3 });
    assert_eq!(six[0].axis2, Range1d { start: 0, len: 2 });
    assert_eq!(six[1].axis2, Range1d { start: 2, len: 2 });
}

#[test]
#[should_panic(expected = "2-D split supports")]
fn test_grid_rejects_too_many_workers() {
    split_2d(10, 10, MAX_GRID_WORKERS + 1);
}

#[test]
fn test_run_1d_visits_every_index_once() {
    let hits: Vec<AtomicUsize> = (0..101).map(|_| AtomicUsize::new(0)).collect();
    run_1d(101, 6, true, |range| {
        for i in range.start..range.end() {
            hits[i].fetch_add(1, Ordering::Relaxed);
        }
    });
    assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
}

#[test]
fn test_sequential_runs_call_once_with_the_whole_domain() {
    let seen = Mutex::new(Vec::new());
    run_1d(40, 8, false, |range| seen.lock().unwrap().push(range));
    assert_eq!(*seen.lock().unwrap(), vec![Range1d { start: 0, len: 40 }]);

    let calls = AtomicUsize::new(0);
    run_2d(12, 12, 1, true, |cell| {
        assert_eq!((cell.axis1.len, cell.axis2.len), (12, 12));
        calls.fetch_add(1, Ordering::Relaxed);
    });
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn test_run_2d_skips_empty_cells() {
    let covered = AtomicUsize::new(0);
    run_2d(2, 3, 16, true, |cell| {
        assert!(!cell.axis1.is_empty() && !cell.axis2.is_empty());
        covered.fetch_add(cell.axis1.len * cell.axis2.len, Ordering::Relaxed);
    });
    assert_eq!(covered.load(Ordering::Relaxed), 6);
}

proptest! {
    #[test]
    fn prop_split_1d_partitions(size in 0usize..10_000, workers in 1usize..64) {
        let ranges = split_1d(size, workers);
        prop_assert_eq!(ranges.len(), workers);
        let mut next = 0;
        for range in &ranges {
            prop_assert_eq!(range.start, next);
            next = range.end();
        }
        prop_assert_eq!(next, size);

        let longest = ranges.iter().map(|r| r.len).max().unwrap_or(0);
        let shortest = ranges.iter().map(|r| r.len).min().unwrap_or(0);
        prop_assert!(longest - shortest <= 1);
    }
}
