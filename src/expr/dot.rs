//! Reductions: dot products, norms, sums and approximate comparison.
//!
//! All reductions accumulate in a fixed order (index order for vectors,
//! storage order otherwise) so repeated runs give identical results.

use num::{Float, Zero};

use crate::expr::Expr;
use crate::flags::Flags;
use crate::scalar::Scalar;
use crate::UNROLLING_LIMIT;

type RealOf<E> = <<E as Expr>::Scalar as Scalar>::Real;

#[inline(always)]
fn is_vector<E: Expr>(e: &E) -> bool {
    e.rows() == 1 || e.cols() == 1
}

/// Coefficient `index` of a row or column vector.
#[inline(always)]
fn vector_coeff<E: Expr>(e: &E, index: usize) -> E::Scalar {
    if E::FLAGS.has(Flags::LINEAR_ACCESS) {
        e.coeff_linear(index)
    } else if e.rows() == 1 {
        e.coeff(0, index)
    } else {
        e.coeff(index, 0)
    }
}

/// Trip count of a reduction over `E`: the static size when it is small
/// enough to unroll, the run-time size otherwise.
#[inline(always)]
fn trip_count<E: Expr>(e: &E) -> usize {
    match E::SHAPE.size().value() {
        Some(n) if n <= UNROLLING_LIMIT => n,
        _ => e.size(),
    }
}

/// Folds `f` over every coefficient in storage order.
#[inline]
fn fold_coeffs<E, A, F>(e: &E, init: A, mut f: F) -> A
where
    E: Expr,
    F: FnMut(A, E::Scalar) -> A,
{
    let mut acc = init;
    if E::FLAGS.has(Flags::LINEAR_ACCESS) {
        for index in 0..trip_count(e) {
            acc = f(acc, e.coeff_linear(index));
        }
        return acc;
    }
    for outer in 0..e.outer_size() {
        for inner in 0..e.inner_size() {
            acc = f(acc, e.coeff(E::row_of(outer, inner), E::col_of(outer, inner)));
        }
    }
    acc
}

/// `sum_i conj(a_i) * b_i`, accumulated in increasing `i`.
///
/// Either operand may be a row or a column vector.
///
/// # Panics
///
/// Panics unless both operands are vectors of the same length.
#[track_caller]
pub fn dot<A, B>(a: &A, b: &B) -> A::Scalar
where
    A: Expr,
    B: Expr<Scalar = A::Scalar>,
{
    assert!(
        is_vector(a) && is_vector(b) && a.size() == b.size(),
        "dot product needs two vectors of equal length, got {}x{} and {}x{}",
        a.rows(),
        a.cols(),
        b.rows(),
        b.cols()
    );
    let size = trip_count(a);
    if size == 0 {
        return <A::Scalar as Zero>::zero();
    }
    let mut acc = vector_coeff(a, 0).conj() * vector_coeff(b, 0);
    for i in 1..size {
        acc = acc + vector_coeff(a, i).conj() * vector_coeff(b, i);
    }
    acc
}

/// Sum of `|x|^2` over every coefficient (squared Frobenius norm).
pub fn squared_norm<E: Expr>(e: &E) -> RealOf<E> {
    fold_coeffs(e, <RealOf<E> as Zero>::zero(), |acc, x| acc + x.abs2())
}

pub fn norm<E: Expr>(e: &E) -> RealOf<E> {
    squared_norm(e).sqrt()
}

/// Sum of all coefficients; zero for an empty expression.
pub fn sum_coeffs<E: Expr>(e: &E) -> E::Scalar {
    fold_coeffs(e, <E::Scalar as Zero>::zero(), |acc, x| acc + x)
}

/// `||a - b||^2 <= prec^2 * min(||a||^2, ||b||^2)`.
///
/// Expressions of different shapes are never approximately equal.
pub fn is_approx<A, B>(a: &A, b: &B, prec: RealOf<A>) -> bool
where
    A: Expr,
    B: Expr<Scalar = A::Scalar>,
{
    if (a.rows(), a.cols()) != (b.rows(), b.cols()) {
        return false;
    }
    let mut diff = <RealOf<A> as Zero>::zero();
    for col in 0..a.cols() {
        for row in 0..a.rows() {
            diff = diff + (a.coeff(row, col) - b.coeff(row, col)).abs2();
        }
    }
    diff <= prec * prec * Float::min(squared_norm(a), squared_norm(b))
}

/// `||e||^2 <= (prec * other)^2`.
pub fn is_much_smaller_than<E: Expr>(e: &E, other: RealOf<E>, prec: RealOf<E>) -> bool {
    let bound = prec * other;
    squared_norm(e) <= bound * bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprExt;
    use crate::storage::{Matrix, RowMajor, SMatrix};
    use approx::assert_relative_eq;
    use num::Complex;

    #[test]
    fn dot_of_rows_and_columns() {
        let a = Matrix::<f64>::column(&[1.0, 2.0, 3.0]);
        let b = Matrix::<f64, RowMajor>::from_rows(&[[4.0, 5.0, 6.0]]);
        assert_eq!(dot(&a, &b), 32.0);
        assert_eq!((&a).transpose().dot(&b), 32.0);
    }

    #[test]
    fn dot_conjugates_the_left_operand() {
        let a = Matrix::<Complex<f64>>::column(&[Complex::new(0.0, 1.0)]);
        let b = Matrix::<Complex<f64>>::column(&[Complex::new(0.0, 1.0)]);
        assert_eq!(dot(&a, &b), Complex::new(1.0, 0.0));
    }

    #[test]
    #[should_panic(expected = "two vectors of equal length")]
    fn dot_rejects_matrices() {
        let a = Matrix::<f64>::zeros(2, 2);
        dot(&a, &a);
    }

    #[test]
    fn norms_and_sums() {
        let m = SMatrix::<f64, 2, 2>::from_rows(&[[3.0, 0.0], [0.0, 4.0]]);
        assert_eq!(squared_norm(&m), 25.0);
        assert_relative_eq!(norm(&m), 5.0);
        assert_eq!((&m).transpose().sum_coeffs(), 7.0);
        assert_eq!(sum_coeffs(&Matrix::<f32>::zeros(0, 3)), 0.0);
    }

    #[test]
    fn approximate_comparison() {
        let a = Matrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
        let b = Matrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0 + 1e-13]]);
        assert!(a.is_approx(&b, f64::dummy_precision()));
        let c = Matrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.1]]);
        assert!(!a.is_approx(&c, f64::dummy_precision()));
        assert!(!a.is_approx(&Matrix::<f64>::zeros(2, 3), 1.0));

        let tiny = Matrix::<f64>::column(&[1e-14, 0.0]);
        assert!(tiny.is_much_smaller_than(1.0, 1e-12));
        assert!(!tiny.is_much_smaller_than(1.0, 1e-15));
    }
}
