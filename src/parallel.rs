//! Work splitting for multi-threaded evaluation.
//!
//! A one-dimensional domain is cut into contiguous ranges, one per worker; a
//! two-dimensional domain is cut into a grid whose factorization depends only
//! on the worker count. The ranges are then handed to Rayon. Each worker
//! receives a disjoint part of the destination, so no synchronization is
//! needed beyond the final join.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// Upper bound on the worker count accepted by [`split_2d`].
pub const MAX_GRID_WORKERS: usize = 16;

/// Number of grid cells along the first (row) axis, indexed by worker count.
const AXIS1_FACTORS: [usize; MAX_GRID_WORKERS + 1] =
    [0, 1, 2, 3, 2, 5, 3, 7, 4, 3, 5, 11, 4, 13, 7, 5, 4];

/// Number of grid cells along the second (column) axis, indexed by worker count.
const AXIS2_FACTORS: [usize; MAX_GRID_WORKERS + 1] =
    [0, 1, 1, 1, 2, 1, 2, 1, 2, 3, 2, 1, 3, 1, 2, 3, 4];

/// A contiguous run of indices `start..start + len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range1d {
    pub start: usize,
    pub len: usize,
}

impl Range1d {
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One cell of a 2-D split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block2d {
    pub axis1: Range1d,
    pub axis2: Range1d,
}

/// Worker count used when the caller does not pick one.
pub fn available_workers() -> usize {
    rayon::current_num_threads().clamp(1, MAX_GRID_WORKERS)
}

/// Splits `0..size` into `workers` contiguous ranges.
///
/// Lengths differ by at most one and the longer ranges come first, so
/// `split_1d(17, 4)` yields lengths 5, 4, 4, 4. When `size < workers` the
/// trailing ranges are empty.
///
/// # Panics
///
/// Panics if `workers` is zero.
pub fn split_1d(size: usize, workers: usize) -> Vec<Range1d> {
    assert!(workers >= 1, "at least one worker is required");
    let base = size / workers;
    let remainder = size % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for index in 0..workers {
        let len = base + usize::from(index < remainder);
        ranges.push(Range1d { start, len });
        start += len;
    }
    ranges
}

/// Splits a `size1 x size2` domain into a grid of `workers` cells.
///
/// The grid has `AXIS1_FACTORS[workers]` parts along the first axis and
/// `AXIS2_FACTORS[workers]` along the second; each axis is divided with
/// [`split_1d`]. Cells are listed with the second axis varying fastest.
///
/// # Panics
///
/// Panics unless `1 <= workers <= 16`.
pub fn split_2d(size1: usize, size2: usize, workers: usize) -> Vec<Block2d> {
    assert!(
        (1..=MAX_GRID_WORKERS).contains(&workers),
        "2-D split supports 1 to {MAX_GRID_WORKERS} workers, got {workers}"
    );
    let parts1 = split_1d(size1, AXIS1_FACTORS[workers]);
    let parts2 = split_1d(size2, AXIS2_FACTORS[workers]);

    parts1
        .iter()
        .flat_map(|&axis1| parts2.iter().map(move |&axis2| Block2d { axis1, axis2 }))
        .collect()
}

/// Runs `f` on every range of [`split_1d`]`(size, workers)`.
///
/// With `parallel == false` or a single worker, `f` is called once on the
/// whole domain on the current thread.
pub fn run_1d<F>(size: usize, workers: usize, parallel: bool, f: F)
where
    F: Fn(Range1d) + Sync + Send,
{
    if !parallel || workers <= 1 {
        f(Range1d { start: 0, len: size });
        return;
    }

    split_1d(size, workers)
        .into_par_iter()
        .filter(|range| !range.is_empty())
        .for_each(|range| f(range));
}

/// Runs `f` on every cell of [`split_2d`]`(size1, size2, workers)`.
pub fn run_2d<F>(size1: usize, size2: usize, workers: usize, parallel: bool, f: F)
where
    F: Fn(Block2d) + Sync + Send,
{
    if !parallel || workers <= 1 {
        f(Block2d {
            axis1: Range1d {
                start: 0,
                len: size1,
            },
            axis2: Range1d {
                start: 0,
                len: size2,
            },
        });
        return;
    }

    split_2d(size1, size2, workers)
        .into_par_iter()
        .filter(|cell| !cell.axis1.is_empty() && !cell.axis2.is_empty())
        .for_each(|cell| f(cell));
}

/// A raw destination pointer shared between workers that write disjoint
/// parts of the same buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SharedMut<T>(*mut T);

// SAFETY: workers only dereference the pointer through views over disjoint
// index ranges, and the owning borrow outlives the parallel section.
unsafe impl<T: Send> Send for SharedMut<T> {}
unsafe impl<T: Send> Sync for SharedMut<T> {}

impl<T> SharedMut<T> {
    #[inline]
    pub(crate) fn new(ptr: *mut T) -> Self {
        SharedMut(ptr)
    }

    #[inline]
    pub(crate) fn get(self) -> *mut T {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn split_1d_puts_remainder_first() {
        let lens: Vec<usize> = split_1d(17, 4).iter().map(|r| r.len).collect();
        assert_eq!(lens, vec![5, 4, 4, 4]);
        let starts: Vec<usize> = split_1d(17, 4).iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0, 5, 9, 13]);
    }

    #[test]
    fn split_1d_with_more_workers_than_items() {
        let ranges = split_1d(2, 5);
        assert_eq!(ranges.len(), 5);
        assert_eq!(ranges.iter().map(|r| r.len).sum::<usize>(), 2);
        assert!(ranges[2..].iter().all(Range1d::is_empty));
    }

    #[test]
    #[should_panic(expected = "at least one worker")]
    fn split_1d_rejects_zero_workers() {
        split_1d(10, 0);
    }

    #[test]
    fn split_2d_uses_grid_factors() {
        for workers in 1..=MAX_GRID_WORKERS {
            let cells = split_2d(100, 60, workers);
            assert_eq!(cells.len(), workers);
            let area: usize = cells.iter().map(|c| c.axis1.len * c.axis2.len).sum();
            assert_eq!(area, 6000);
        }
        let cells = split_2d(8, 8, 4);
        assert_eq!(cells[0].axis1, Range1d { start: 0, len: 4 });
        assert_eq!(cells[1].axis2, Range1d { start: 4, len: 4 });
    }

    #[test]
    #[should_panic(expected = "2-D split supports")]
    fn split_2d_rejects_too_many_workers() {
        split_2d(10, 10, 17);
    }

    #[test]
    fn run_1d_covers_domain_once() {
        let seen = AtomicUsize::new(0);
        run_1d(1000, 4, true, |range| {
            seen.fetch_add(range.len, Ordering::Relaxed);
        });
        assert_eq!(seen.load(Ordering::Relaxed), 1000);

        let calls = AtomicUsize::new(0);
        run_1d(1000, 4, false, |range| {
            assert_eq!(range.len, 1000);
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn run_2d_covers_domain_once() {
        let seen = AtomicUsize::new(0);
        run_2d(30, 20, 6, true, |cell| {
            seen.fetch_add(cell.axis1.len * cell.axis2.len, Ordering::Relaxed);
        });
        assert_eq!(seen.load(Ordering::Relaxed), 600);
    }
}
