use approx::assert_relative_eq;
use ndarray::array;
use num::Complex;
use simdexpr::assign::{self, Strategy, ALL_STRATEGIES};
use simdexpr::flags::Flags;
use simdexpr::prelude::*;

fn sample(rows: usize, cols: usize) -> Matrix<f64> {
    Matrix::from_fn(rows, cols, |r, c| (r * cols + c) as f64 + 1.0)
}

#[test]
fn test_scenario_bidirectional_reverse() {
    let v = Matrix::<f64>::column(&[1.0, 2.0, 3.0, 4.0]);
    let reversed = (&v).reverse().eval();
    assert_eq!(reversed.to_vec(), vec![4.0, 3.0, 2.0, 1.0]);

    let back = (&reversed).reverse().eval();
    assert_eq!(back, v);
}

#[test]
fn test_double_reverse_under_every_strategy() {
    for (rows, cols) in [(4, 1), (9, 7), (1, 13), (16, 16)] {
        let m = sample(rows, cols);
        let twice = (&m).reverse().reverse();
        for strategy in ALL_STRATEGIES {
            let mut dst = Matrix::<f64>::zeros(rows, cols);
            if strategy.check_applicable(&dst, &twice).is_err() {
                continue;
            }
            assign::assign_using(strategy, &mut dst, twice).unwrap();
            assert_eq!(dst, m, "reverse(reverse(m)) with {strategy} for {rows}x{cols}");
        }
    }
}

#[test]
fn test_partial_reversals() {
    let m = Matrix::<f64, RowMajor>::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    assert_eq!(
        (&m).reverse_rows().to_vec(),
        vec![4.0, 5.0, 6.0, 1.0, 2.0, 3.0]
    );
    assert_eq!(
        (&m).reverse_cols().to_vec(),
        vec![3.0, 2.0, 1.0, 6.0, 5.0, 4.0]
    );
    assert_eq!((&m).reverse_rows().reverse_cols().to_vec(), (&m).reverse().to_vec());
}

#[test]
fn test_reversed_destination() {
    let m = sample(5, 3);
    let mut out = Matrix::<f64>::zeros(5, 3);
    out.reverse_mut().assign_from(&m);
    assert_eq!(out, (&m).reverse().eval());
}

#[test]
fn test_transpose_round_trip_and_destination() {
    let m = sample(6, 4);
    assert_eq!((&m).transpose().transpose().eval(), m);

    let mut t = Matrix::<f64>::zeros(4, 6);
    t.assign_from((&m).transpose());
    for r in 0..6 {
        for c in 0..4 {
            assert_eq!(t[(c, r)], m[(r, c)]);
        }
    }

    let mut back = Matrix::<f64>::zeros(6, 4);
    back.transpose_mut().assign_from(&t);
    assert_eq!(back, m);
}

#[test]
fn test_conjugation() {
    let real = sample(3, 3);
    assert_eq!((&real).conjugate().conjugate().eval(), real);
    assert_eq!((&real).conjugate().eval(), real);

    let z = Matrix::<Complex<f64>>::from_fn(2, 2, |r, c| Complex::new(r as f64, c as f64 + 1.0));
    let conj = (&z).conjugate().eval();
    assert_eq!(conj[(1, 1)], Complex::new(1.0, -2.0));
    assert_eq!((&conj).conjugate().eval(), z);

    let adjoint = (&z).adjoint().eval();
    assert_eq!(adjoint[(0, 1)], z[(1, 0)].conj());
}

#[test]
fn test_blocks_rows_and_columns() {
    let m = sample(5, 6);
    let block = (&m).block(1, 2, 3, 2).eval();
    assert_eq!(block.shape(), (3, 2));
    assert_eq!(block[(0, 0)], m[(1, 2)]);
    assert_eq!(block[(2, 1)], m[(3, 3)]);

    assert_eq!((&m).row(4).to_vec(), vec![25.0, 26.0, 27.0, 28.0, 29.0, 30.0]);
    assert_eq!((&m).col(0).to_vec(), vec![1.0, 7.0, 13.0, 19.0, 25.0]);

    let mut target = Matrix::<f64>::zeros(5, 6);
    target.block_mut(1, 1, 3, 4).set_constant(2.0);
    assert_eq!((&target).sum_coeffs(), 24.0);
    target.col_mut(0).set_constant(1.0);
    target.row_mut(0).set_constant(-1.0);
    assert_eq!(target[(0, 0)], -1.0);
    assert_eq!(target[(4, 0)], 1.0);
}

#[test]
#[should_panic(expected = "exceeds")]
fn test_block_out_of_bounds_panics() {
    let m = sample(3, 3);
    let _ = (&m).block(2, 2, 2, 1);
}

#[test]
fn test_coefficient_wise_operations() {
    let a = sample(4, 5);
    let b = (&a).scale(0.5).eval();

    let diff = (&a).minus(&b).eval();
    assert_eq!(diff, b);

    let prod = (&a).cwise_product(&b).eval();
    assert_eq!(prod[(3, 4)], 20.0 * 10.0);

    let abs = (&a).negated().cwise_abs().eval();
    assert_eq!(abs, a);

    let mapped = (&a).map(|x| x * x + 1.0).eval();
    assert_eq!(mapped[(0, 1)], 5.0);

    assert!((&a).try_plus(&sample(5, 4)).is_err());
}

#[test]
fn test_capabilities_decrease_under_composition() {
    type M = Matrix<f32>;
    assert!(<&M>::FLAGS.has(Flags::LINEAR_ACCESS.or(Flags::PACKET_ACCESS)));

    let block_flags = <simdexpr::expr::Block<&M>>::FLAGS;
    assert!(!block_flags.has(Flags::LINEAR_ACCESS));
    assert!(block_flags.has(Flags::PACKET_ACCESS));

    let vertical = <simdexpr::expr::Reverse<&M, simdexpr::expr::Vertical>>::FLAGS;
    assert!(!vertical.has(Flags::LINEAR_ACCESS));
    assert!(!vertical.has(Flags::DIRECT_ACCESS));

    let product = <simdexpr::expr::Product<&M, &M>>::FLAGS;
    assert!(!product.has(Flags::PACKET_ACCESS));
    assert!(!product.has(Flags::LINEAR_ACCESS));

    let chosen = Strategy::select::<M, simdexpr::expr::Product<&M, &M>>();
    assert!(!chosen.is_vectorized());
}

#[test]
fn test_reductions() {
    let v = Matrix::<f64>::column(&[3.0, 4.0]);
    assert_eq!(v.squared_norm(), 25.0);
    assert_relative_eq!(v.norm(), 5.0);
    assert_eq!(v.dot(&Matrix::<f64>::column(&[1.0, 2.0])), 11.0);

    let z = Matrix::<Complex<f64>>::column(&[Complex::new(0.0, 1.0), Complex::new(2.0, 0.0)]);
    // the left operand is conjugated
    assert_eq!(z.dot(&z), Complex::new(5.0, 0.0));

    let tiny = (&v).scale(1e-20);
    assert!(tiny.is_much_smaller_than(1.0, 1e-12));
}

#[test]
fn test_ndarray_interop() {
    let a = array![[1.0f64, 2.0, 3.0], [4.0, 5.0, 6.0]];
    let m = Matrix::<f64>::from_ndarray(&a);
    assert_eq!(m[(1, 2)], 6.0);
    assert_eq!(m.to_ndarray(), a);

    let mut out = ndarray::Array2::<f64>::zeros((3, 2));
    out.view_mut().assign_from((&m).transpose());
    assert_eq!(out, a.t());

    let from_view = a.view().scale(2.0).eval();
    assert_eq!(from_view[(0, 2)], 6.0);
}

#[test]
fn test_nullary_fills() {
    let mut m = Matrix::<f64, RowMajor>::zeros(3, 4);
    m.set_identity();
    assert_eq!(m.to_vec().iter().sum::<f64>(), 3.0);
    assert_eq!(m[(2, 2)], 1.0);

    m.set_constant(1.5);
    assert!(m.to_vec().iter().all(|&x| x == 1.5));
    m.set_zero();
    assert_eq!(m.squared_norm(), 0.0);
}
