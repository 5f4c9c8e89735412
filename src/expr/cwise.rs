//! Coefficient-wise unary and binary nodes.

use crate::error::{ensure_same_shape, Result};
use crate::expr::{Expr, PacketOf};
use crate::flags::{Cost, Flags, Shape};
use crate::scalar::Scalar;
use crate::simd::{Align, Packet};

/// Cost assumed for functions the engine knows nothing about.
pub const DEFAULT_FUNCTOR_COST: usize = 10;

/// A function applied to every coefficient.
pub trait UnaryOp<T: Scalar>: Sync {
    /// Whether [`apply_packet`](Self::apply_packet) is implemented.
    const PACKET: bool;
    const COST: usize;

    fn apply(&self, x: T) -> T;

    #[inline]
    fn apply_packet(&self, x: T::Packet) -> T::Packet {
        let _ = x;
        crate::expr::unsupported_access::<Self>("packet")
    }
}

/// A function combining two coefficients at the same position.
pub trait BinaryOp<T: Scalar>: Sync {
    const PACKET: bool;
    const COST: usize;

    fn apply(&self, a: T, b: T) -> T;

    #[inline]
    fn apply_packet(&self, a: T::Packet, b: T::Packet) -> T::Packet {
        let _ = (a, b);
        crate::expr::unsupported_access::<Self>("packet")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NegateOp;

impl<T: Scalar> UnaryOp<T> for NegateOp {
    const PACKET: bool = true;
    const COST: usize = T::ADD_COST;

    #[inline(always)]
    fn apply(&self, x: T) -> T {
        -x
    }

    #[inline(always)]
    fn apply_packet(&self, x: T::Packet) -> T::Packet {
        -x
    }
}

/// Multiplication by a fixed scalar.
#[derive(Debug, Clone, Copy)]
pub struct ScaleOp<T>(pub T);

impl<T: Scalar> UnaryOp<T> for ScaleOp<T> {
    const PACKET: bool = true;
    const COST: usize = T::MUL_COST;

    #[inline(always)]
    fn apply(&self, x: T) -> T {
        x * self.0
    }

    #[inline(always)]
    fn apply_packet(&self, x: T::Packet) -> T::Packet {
        x * T::Packet::splat(self.0)
    }
}

/// Absolute value, returned in the scalar type itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsOp;

impl<T: Scalar> UnaryOp<T> for AbsOp {
    const PACKET: bool = true;
    const COST: usize = T::ADD_COST;

    #[inline(always)]
    fn apply(&self, x: T) -> T {
        T::from_real(Scalar::abs(x))
    }

    #[inline(always)]
    fn apply_packet(&self, x: T::Packet) -> T::Packet {
        x.abs()
    }
}

/// Complex conjugation; free for real scalars.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConjugateOp;

impl<T: Scalar> UnaryOp<T> for ConjugateOp {
    const PACKET: bool = T::PACKET_CONJ;
    const COST: usize = if T::IS_REAL { 0 } else { T::ADD_COST };

    #[inline(always)]
    fn apply(&self, x: T) -> T {
        x.conj()
    }

    #[inline(always)]
    fn apply_packet(&self, x: T::Packet) -> T::Packet {
        x.conj()
    }
}

/// A user function; evaluated one coefficient at a time.
#[derive(Debug, Clone, Copy)]
pub struct MapOp<F>(pub F);

impl<T: Scalar, F: Fn(T) -> T + Sync> UnaryOp<T> for MapOp<F> {
    const PACKET: bool = false;
    const COST: usize = DEFAULT_FUNCTOR_COST;

    #[inline(always)]
    fn apply(&self, x: T) -> T {
        (self.0)(x)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SumOp;

impl<T: Scalar> BinaryOp<T> for SumOp {
    const PACKET: bool = true;
    const COST: usize = T::ADD_COST;

    #[inline(always)]
    fn apply(&self, a: T, b: T) -> T {
        a + b
    }

    #[inline(always)]
    fn apply_packet(&self, a: T::Packet, b: T::Packet) -> T::Packet {
        a + b
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DifferenceOp;

impl<T: Scalar> BinaryOp<T> for DifferenceOp {
    const PACKET: bool = true;
    const COST: usize = T::ADD_COST;

    #[inline(always)]
    fn apply(&self, a: T, b: T) -> T {
        a - b
    }

    #[inline(always)]
    fn apply_packet(&self, a: T::Packet, b: T::Packet) -> T::Packet {
        a - b
    }
}

/// Coefficient-wise (Hadamard) product.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductOp;

impl<T: Scalar> BinaryOp<T> for ProductOp {
    const PACKET: bool = true;
    const COST: usize = T::MUL_COST;

    #[inline(always)]
    fn apply(&self, a: T, b: T) -> T {
        a * b
    }

    #[inline(always)]
    fn apply_packet(&self, a: T::Packet, b: T::Packet) -> T::Packet {
        a * b
    }
}

/// `op(child)` at every position.
#[derive(Debug, Clone, Copy)]
pub struct CwiseUnary<E, Op> {
    inner: E,
    op: Op,
}

pub type Conjugate<E> = CwiseUnary<E, ConjugateOp>;
pub type Negated<E> = CwiseUnary<E, NegateOp>;
pub type Scaled<E> = CwiseUnary<E, ScaleOp<<E as Expr>::Scalar>>;

impl<E: Expr, Op: UnaryOp<E::Scalar>> CwiseUnary<E, Op> {
    pub fn new(inner: E, op: Op) -> Self {
        CwiseUnary { inner, op }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: Expr, Op: UnaryOp<E::Scalar>> Expr for CwiseUnary<E, Op> {
    type Scalar = E::Scalar;

    const SHAPE: Shape = E::SHAPE;
    const FLAGS: Flags = E::FLAGS
        .and(
            Flags::ROW_MAJOR
                .or(Flags::LINEAR_ACCESS)
                .or(Flags::ALIGNED)
                .or(Flags::TRIANGULAR),
        )
        .with_if(
            Flags::PACKET_ACCESS,
            E::FLAGS.has(Flags::PACKET_ACCESS) && Op::PACKET,
        );
    const COST: Cost = E::COST.add(Op::COST);

    #[inline(always)]
    fn rows(&self) -> usize {
        self.inner.rows()
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.inner.cols()
    }

    #[inline(always)]
    fn coeff(&self, row: usize, col: usize) -> E::Scalar {
        self.op.apply(self.inner.coeff(row, col))
    }

    #[inline(always)]
    fn coeff_linear(&self, index: usize) -> E::Scalar {
        self.op.apply(self.inner.coeff_linear(index))
    }

    #[inline(always)]
    fn packet(&self, row: usize, col: usize, align: Align) -> PacketOf<Self> {
        self.op.apply_packet(self.inner.packet(row, col, align))
    }

    #[inline(always)]
    fn packet_linear(&self, index: usize, align: Align) -> PacketOf<Self> {
        self.op.apply_packet(self.inner.packet_linear(index, align))
    }
}

/// `op(lhs, rhs)` at every position of two equally shaped operands.
#[derive(Debug, Clone, Copy)]
pub struct CwiseBinary<L, R, Op> {
    lhs: L,
    rhs: R,
    op: Op,
}

pub type Sum<L, R> = CwiseBinary<L, R, SumOp>;
pub type Difference<L, R> = CwiseBinary<L, R, DifferenceOp>;

impl<L, R, Op> CwiseBinary<L, R, Op>
where
    L: Expr,
    R: Expr<Scalar = L::Scalar>,
    Op: BinaryOp<L::Scalar>,
{
    /// # Panics
    ///
    /// Panics if the operands have different shapes.
    #[track_caller]
    pub fn new(lhs: L, rhs: R, op: Op) -> Self {
        match Self::try_new(lhs, rhs, op) {
            Ok(node) => node,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_new(lhs: L, rhs: R, op: Op) -> Result<Self> {
        ensure_same_shape(
            "coefficient-wise operation",
            (lhs.rows(), lhs.cols()),
            (rhs.rows(), rhs.cols()),
        )?;
        Ok(CwiseBinary { lhs, rhs, op })
    }

    pub fn lhs(&self) -> &L {
        &self.lhs
    }

    pub fn rhs(&self) -> &R {
        &self.rhs
    }
}

impl<L, R, Op> Expr for CwiseBinary<L, R, Op>
where
    L: Expr,
    R: Expr<Scalar = L::Scalar>,
    Op: BinaryOp<L::Scalar>,
{
    type Scalar = L::Scalar;

    const SHAPE: Shape = L::SHAPE.merge(R::SHAPE);
    const FLAGS: Flags = {
        let orders_agree = L::FLAGS.is_row_major() == R::FLAGS.is_row_major();
        let joint = L::FLAGS.and(R::FLAGS);
        let order = L::FLAGS.and(Flags::ROW_MAJOR);
        if orders_agree {
            order
                .or(joint.and(Flags::LINEAR_ACCESS.or(Flags::ALIGNED)))
                .with_if(
                    Flags::PACKET_ACCESS,
                    joint.has(Flags::PACKET_ACCESS) && Op::PACKET,
                )
        } else {
            order
        }
    };
    const COST: Cost = L::COST.plus(R::COST).add(Op::COST);

    #[inline(always)]
    fn rows(&self) -> usize {
        self.lhs.rows()
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.lhs.cols()
    }

    #[inline(always)]
    fn coeff(&self, row: usize, col: usize) -> L::Scalar {
        self.op
            .apply(self.lhs.coeff(row, col), self.rhs.coeff(row, col))
    }

    #[inline(always)]
    fn coeff_linear(&self, index: usize) -> L::Scalar {
        self.op
            .apply(self.lhs.coeff_linear(index), self.rhs.coeff_linear(index))
    }

    #[inline(always)]
    fn packet(&self, row: usize, col: usize, align: Align) -> PacketOf<Self> {
        self.op.apply_packet(
            self.lhs.packet(row, col, align),
            self.rhs.packet(row, col, align),
        )
    }

    #[inline(always)]
    fn packet_linear(&self, index: usize, align: Align) -> PacketOf<Self> {
        self.op.apply_packet(
            self.lhs.packet_linear(index, align),
            self.rhs.packet_linear(index, align),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprExt;
    use crate::storage::{Matrix, RowMajor};
    use num::Complex;

    #[test]
    fn sum_and_difference_coefficients() {
        let a = Matrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
        let b = Matrix::<f64>::from_rows(&[[10.0, 20.0], [30.0, 40.0]]);
        let s = (&a).plus(&b);
        assert_eq!(s.coeff(1, 0), 33.0);
        assert_eq!((&b).minus(&a).coeff_linear(3), 36.0);
        assert_eq!((&a).cwise_product(&b).coeff(0, 1), 40.0);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let a = Matrix::<f32>::zeros(2, 3);
        let b = Matrix::<f32>::zeros(3, 2);
        assert!((&a).try_plus(&b).is_err());
    }

    #[test]
    #[should_panic(expected = "Shape mismatch in coefficient-wise operation")]
    fn mismatched_shapes_panic() {
        let a = Matrix::<f32>::zeros(2, 3);
        let b = Matrix::<f32>::zeros(3, 2);
        let _ = (&a).plus(&b);
    }

    #[test]
    fn mixed_orders_lose_linear_and_packet_access() {
        type Mixed<'a> = Sum<&'a Matrix<f32>, &'a Matrix<f32, RowMajor>>;
        assert!(!Mixed::FLAGS.has(Flags::LINEAR_ACCESS));
        assert!(!Mixed::FLAGS.has(Flags::PACKET_ACCESS));
        type Same<'a> = Sum<&'a Matrix<f32>, &'a Matrix<f32>>;
        assert!(Same::FLAGS.has(Flags::PACKET_ACCESS.or(Flags::LINEAR_ACCESS).or(Flags::ALIGNED)));
    }

    #[test]
    fn complex_conjugate_is_not_vectorized() {
        assert!(!Conjugate::<&Matrix<Complex<f64>>>::FLAGS.has(Flags::PACKET_ACCESS));
        assert!(Conjugate::<&Matrix<Complex<f64>>>::FLAGS.has(Flags::LINEAR_ACCESS));
        assert!(Conjugate::<&Matrix<f64>>::FLAGS.has(Flags::PACKET_ACCESS));
        assert_eq!(Conjugate::<&Matrix<f64>>::COST, Cost::Fixed(1));
    }

    #[test]
    fn map_is_scalar_only() {
        let a = Matrix::<f64>::from_rows(&[[1.0, -2.0]]);
        let m = (&a).map(|x| x * x + 1.0);
        assert_eq!(m.coeff(0, 1), 5.0);
        assert!(!<CwiseUnary<&Matrix<f64>, MapOp<fn(f64) -> f64>>>::FLAGS
            .has(Flags::PACKET_ACCESS));
    }
}
