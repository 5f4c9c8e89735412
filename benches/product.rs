//! Matrix Product Benchmarks
//!
//! Measures the lazy coefficient product against the cache-blocked kernel,
//! sequentially and split across a 2-D worker grid.
//!
//! # Benchmark Categories
//!
//! ## 1. **Lazy vs blocked**
//! - `lazy_product` assigned through the Default traversal (baseline)
//! - `eval_product_into` with the packet kernel
//!
//! ## 2. **Grid parallelism**
//! - `par_eval_product_into` for several worker counts

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use simdexpr::assign::{self, AssignConfig};
use simdexpr::expr::product::{eval_product_into, par_eval_product_into};
use simdexpr::prelude::*;

// ================================================================================================
// BENCHMARK CONFIGURATION
// ================================================================================================

const ORDERS: &[usize] = &[32, 64, 128, 256, 512];

/// The lazy product is O(n^3) coefficient reads without blocking; keep it
/// to the smaller orders.
const LAZY_LIMIT: usize = 256;

const WORKERS: &[usize] = &[2, 4, 8, 16];

fn operands(order: usize) -> (Matrix<f64>, Matrix<f64>) {
    let mut rng = StdRng::seed_from_u64(7);
    (
        Matrix::random_with(order, order, &mut rng),
        Matrix::random_with(order, order, &mut rng),
    )
}

/// Two flops per multiply-add.
fn flops(order: usize) -> u64 {
    2 * (order as u64).pow(3)
}

// ================================================================================================
// BENCHMARKS
// ================================================================================================

fn bench_lazy_vs_blocked(c: &mut Criterion) {
    let mut group = c.benchmark_group("product");
    let sequential = AssignConfig::sequential();
    for &order in ORDERS {
        let (a, b) = operands(order);
        let mut dst = Matrix::<f64>::zeros(order, order);
        group.throughput(Throughput::Elements(flops(order)));

        if order <= LAZY_LIMIT {
            group.bench_function(BenchmarkId::new("lazy", order), |bench| {
                bench.iter(|| {
                    let lazy = black_box(&a).lazy_product(black_box(&b));
                    assign::assign_with(&sequential, &mut dst, lazy).unwrap()
                })
            });
        }
        group.bench_function(BenchmarkId::new("blocked", order), |bench| {
            bench.iter(|| eval_product_into(&mut dst, black_box(&a), black_box(&b)).unwrap())
        });
    }
    group.finish();
}

fn bench_grid_parallelism(c: &mut Criterion) {
    let mut group = c.benchmark_group("product_parallel");
    for &order in &ORDERS[2..] {
        let (a, b) = operands(order);
        let mut dst = Matrix::<f64>::zeros(order, order);
        group.throughput(Throughput::Elements(flops(order)));

        for &workers in WORKERS {
            group.bench_with_input(
                BenchmarkId::new(format!("{workers}_workers"), order),
                &workers,
                |bench, &workers| {
                    bench.iter(|| {
                        par_eval_product_into(&mut dst, black_box(&a), black_box(&b), workers)
                            .unwrap()
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_lazy_vs_blocked, bench_grid_parallelism);
criterion_main!(benches);
