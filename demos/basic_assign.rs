//! Basic Assignment Demonstration
//!
//! Builds a few lazy expressions, shows which traversal and unrolling the
//! classifier picks for each, and evaluates them.

use simdexpr::assign::{self, AssignConfig, Strategy};
use simdexpr::expr::{Block, Product, Reverse, Transpose};
use simdexpr::prelude::*;

fn main() {
    println!("Strategy selection\n");
    println!(
        "  SMatrix<f32, 4, 4> <- SMatrix<f32, 4, 4>    : {}",
        Strategy::select::<SMatrix<f32, 4, 4>, &SMatrix<f32, 4, 4>>()
    );
    println!(
        "  Matrix<f32>        <- Matrix<f32>           : {}",
        Strategy::select::<Matrix<f32>, &Matrix<f32>>()
    );
    println!(
        "  Block<Matrix<f32>> <- Matrix<f32>           : {}",
        Strategy::select::<Block<&mut Matrix<f32>>, &Matrix<f32>>()
    );
    println!(
        "  Matrix<f32>        <- Transpose<Matrix<f32>>: {}",
        Strategy::select::<Matrix<f32>, Transpose<&Matrix<f32>>>()
    );
    println!(
        "  Matrix<f32>        <- Reverse<Matrix<f32>>  : {}",
        Strategy::select::<Matrix<f32>, Reverse<&Matrix<f32>, simdexpr::expr::Both>>()
    );
    println!(
        "  Matrix<f32>        <- Product<..>           : {}",
        Strategy::select::<Matrix<f32>, Product<&Matrix<f32>, &Matrix<f32>>>()
    );
    println!();

    println!("Evaluation\n");
    let a = Matrix::<f32, RowMajor>::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
    let mut b = Matrix::<f32>::zeros(0, 0);
    b.assign_from(&a);
    println!("  copy:              {:?}", b.to_vec());

    b.assign_from((&a).reverse());
    println!("  reverse:           {:?}", b.to_vec());

    b.assign_from((&a).transpose().plus(&a).scale(0.5));
    println!("  (a^T + a) / 2:     {:?}", b.to_vec());

    match b.product(&a) {
        Ok(p) => println!("  b * a:             {:?}", p.to_vec()),
        Err(e) => println!("  product failed: {e}"),
    }

    println!("\nErrors\n");
    let mut fixed = SMatrix::<f32, 2, 2>::zeros();
    match fixed.try_assign_from(&a) {
        Ok(()) => println!("  unexpected success"),
        Err(e) => println!("  {e}"),
    }

    println!("\nParallel split\n");
    let big = Matrix::<f32>::from_fn(512, 512, |r, c| (r + c) as f32);
    let mut out = Matrix::<f32>::zeros(512, 512);
    let config = AssignConfig::default().with_threshold(1 << 12);
    match assign::assign_with(&config, &mut out, (&big).scale(2.0)) {
        Ok(()) => println!(
            "  512x512 over {} workers, out[(511, 511)] = {}",
            config.max_workers,
            out[(511, 511)]
        ),
        Err(e) => println!("  assignment failed: {e}"),
    }
}
