//! Expression contracts and combinators.
//!
//! An expression is any type implementing [`Expr`]: leaves wrap storage,
//! derived nodes hold their children by value (usually references to
//! leaves) and define their coefficients in terms of them. Nothing is
//! evaluated until an expression is assigned to an [`ExprMut`] destination
//! through [`crate::assign`].
//!
//! Each node publishes its static descriptor as associated constants
//! ([`Expr::SHAPE`], [`Expr::FLAGS`], [`Expr::COST`]); the assignment
//! classifier reads only those.

pub mod block;
pub mod cwise;
pub mod dot;
pub mod nullary;
pub mod product;
pub mod reverse;
pub mod transpose;

use std::any::type_name;

pub use block::Block;
pub use cwise::{
    AbsOp, BinaryOp, Conjugate, ConjugateOp, CwiseBinary, CwiseUnary, Difference, DifferenceOp,
    MapOp, NegateOp, Negated, ProductOp, ScaleOp, Scaled, Sum, SumOp, UnaryOp,
};
pub use nullary::{Constant, Identity};
pub use product::Product;
pub use reverse::{Both, Direction, Horizontal, Reverse, Vertical};
pub use transpose::Transpose;

use crate::assign::{self, MulTo};
use crate::error::{shape_mismatch, Result};
use crate::flags::{Cost, Flags, Shape};
use crate::scalar::Scalar;
use crate::simd::Align;
use crate::storage::Matrix;

/// Packet type of an expression's scalar.
pub type PacketOf<E> = <<E as Expr>::Scalar as Scalar>::Packet;

/// Panics for an access mode a node does not advertise.
#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn unsupported_access<E: ?Sized>(mode: &str) -> ! {
    panic!(
        "{} does not support {} access; check its capability flags before dispatching",
        type_name::<E>(),
        mode
    )
}

/// Read side of every expression node.
///
/// `coeff` is always available. The other accessors are only valid when the
/// matching bit is set in [`Expr::FLAGS`]: `coeff_linear` needs
/// [`Flags::LINEAR_ACCESS`], `packet` needs [`Flags::PACKET_ACCESS`] and
/// `packet_linear` needs both. A packet at `(row, col)` holds `LANES`
/// consecutive coefficients along the inner dimension.
pub trait Expr: Sync {
    type Scalar: Scalar;

    const SHAPE: Shape;
    const FLAGS: Flags;
    const COST: Cost;

    fn rows(&self) -> usize;
    fn cols(&self) -> usize;

    fn coeff(&self, row: usize, col: usize) -> Self::Scalar;

    #[inline]
    fn coeff_linear(&self, index: usize) -> Self::Scalar {
        let _ = index;
        unsupported_access::<Self>("linear")
    }

    #[inline]
    fn packet(&self, row: usize, col: usize, align: Align) -> PacketOf<Self> {
        let _ = (row, col, align);
        unsupported_access::<Self>("packet")
    }

    #[inline]
    fn packet_linear(&self, index: usize, align: Align) -> PacketOf<Self> {
        let _ = (index, align);
        unsupported_access::<Self>("linear packet")
    }

    #[inline]
    fn size(&self) -> usize {
        self.rows() * self.cols()
    }

    #[inline]
    fn inner_size(&self) -> usize {
        if Self::FLAGS.is_row_major() {
            self.cols()
        } else {
            self.rows()
        }
    }

    #[inline]
    fn outer_size(&self) -> usize {
        if Self::FLAGS.is_row_major() {
            self.rows()
        } else {
            self.cols()
        }
    }

    /// Row of the coefficient at (`outer`, `inner`) in this storage order.
    #[inline(always)]
    fn row_of(outer: usize, inner: usize) -> usize {
        if Self::FLAGS.is_row_major() {
            outer
        } else {
            inner
        }
    }

    #[inline(always)]
    fn col_of(outer: usize, inner: usize) -> usize {
        if Self::FLAGS.is_row_major() {
            inner
        } else {
            outer
        }
    }
}

/// Maps an (outer, inner) pair to (row, col) for `E`'s storage order.
#[inline(always)]
pub fn position<E: Expr + ?Sized>(outer: usize, inner: usize) -> (usize, usize) {
    (E::row_of(outer, inner), E::col_of(outer, inner))
}

/// Write side of an expression, implemented by storage and by views that
/// map positions one-to-one onto writable children.
pub trait ExprMut: Expr {
    fn coeff_ref(&mut self, row: usize, col: usize) -> &mut Self::Scalar;

    #[inline]
    fn coeff_ref_linear(&mut self, index: usize) -> &mut Self::Scalar {
        let _ = index;
        unsupported_access::<Self>("linear")
    }

    #[inline]
    fn write_packet(&mut self, row: usize, col: usize, align: Align, packet: PacketOf<Self>) {
        let _ = (row, col, align, packet);
        unsupported_access::<Self>("packet")
    }

    #[inline]
    fn write_packet_linear(&mut self, index: usize, align: Align, packet: PacketOf<Self>) {
        let _ = (index, align, packet);
        unsupported_access::<Self>("linear packet")
    }

    /// Address of coefficient (0, 0). Nodes advertising
    /// [`Flags::DIRECT_ACCESS`] return a pointer valid for
    /// `outer_stride() * (outer_size() - 1) + inner_size()` elements with a
    /// unit inner stride.
    #[inline]
    fn data_ptr(&self) -> *const Self::Scalar {
        unsupported_access::<Self>("direct")
    }

    #[inline]
    fn data_ptr_mut(&mut self) -> *mut Self::Scalar {
        unsupported_access::<Self>("direct")
    }

    /// Distance in elements between the starts of consecutive outer slices.
    #[inline]
    fn outer_stride(&self) -> usize {
        unsupported_access::<Self>("direct")
    }

    /// Makes the destination `rows x cols`. Fixed-shape destinations and
    /// views only accept their current shape.
    fn resize(&mut self, rows: usize, cols: usize) -> Result<()> {
        if (self.rows(), self.cols()) == (rows, cols) {
            Ok(())
        } else {
            Err(shape_mismatch(
                "resize",
                (self.rows(), self.cols()),
                (rows, cols),
            ))
        }
    }
}

macro_rules! forward_expr {
    () => {
        type Scalar = E::Scalar;

        const SHAPE: Shape = E::SHAPE;
        const FLAGS: Flags = E::FLAGS;
        const COST: Cost = E::COST;

        #[inline(always)]
        fn rows(&self) -> usize {
            (**self).rows()
        }

        #[inline(always)]
        fn cols(&self) -> usize {
            (**self).cols()
        }

        #[inline(always)]
        fn coeff(&self, row: usize, col: usize) -> Self::Scalar {
            (**self).coeff(row, col)
        }

        #[inline(always)]
        fn coeff_linear(&self, index: usize) -> Self::Scalar {
            (**self).coeff_linear(index)
        }

        #[inline(always)]
        fn packet(&self, row: usize, col: usize, align: Align) -> PacketOf<Self> {
            (**self).packet(row, col, align)
        }

        #[inline(always)]
        fn packet_linear(&self, index: usize, align: Align) -> PacketOf<Self> {
            (**self).packet_linear(index, align)
        }
    };
}

impl<E: Expr + ?Sized> Expr for &E {
    forward_expr!();
}

impl<E: Expr + ?Sized> Expr for &mut E {
    forward_expr!();
}

impl<E: ExprMut + ?Sized> ExprMut for &mut E {
    #[inline(always)]
    fn coeff_ref(&mut self, row: usize, col: usize) -> &mut Self::Scalar {
        (**self).coeff_ref(row, col)
    }

    #[inline(always)]
    fn coeff_ref_linear(&mut self, index: usize) -> &mut Self::Scalar {
        (**self).coeff_ref_linear(index)
    }

    #[inline(always)]
    fn write_packet(&mut self, row: usize, col: usize, align: Align, packet: PacketOf<Self>) {
        (**self).write_packet(row, col, align, packet)
    }

    #[inline(always)]
    fn write_packet_linear(&mut self, index: usize, align: Align, packet: PacketOf<Self>) {
        (**self).write_packet_linear(index, align, packet)
    }

    #[inline(always)]
    fn data_ptr(&self) -> *const Self::Scalar {
        (**self).data_ptr()
    }

    #[inline(always)]
    fn data_ptr_mut(&mut self) -> *mut Self::Scalar {
        (**self).data_ptr_mut()
    }

    #[inline(always)]
    fn outer_stride(&self) -> usize {
        (**self).outer_stride()
    }

    fn resize(&mut self, rows: usize, cols: usize) -> Result<()> {
        (**self).resize(rows, cols)
    }
}

/// Combinators available on every expression.
///
/// Building methods take `self` by value; call them on a reference
/// (`(&m).transpose()`) to keep using a stored matrix afterwards.
pub trait ExprExt: Expr + Sized {
    /// Coefficient-wise sum.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ; see [`try_plus`](Self::try_plus).
    fn plus<R: Expr<Scalar = Self::Scalar>>(self, rhs: R) -> Sum<Self, R> {
        CwiseBinary::new(self, rhs, SumOp)
    }

    fn try_plus<R: Expr<Scalar = Self::Scalar>>(self, rhs: R) -> Result<Sum<Self, R>> {
        CwiseBinary::try_new(self, rhs, SumOp)
    }

    fn minus<R: Expr<Scalar = Self::Scalar>>(self, rhs: R) -> Difference<Self, R> {
        CwiseBinary::new(self, rhs, DifferenceOp)
    }

    fn try_minus<R: Expr<Scalar = Self::Scalar>>(self, rhs: R) -> Result<Difference<Self, R>> {
        CwiseBinary::try_new(self, rhs, DifferenceOp)
    }

    fn cwise_product<R: Expr<Scalar = Self::Scalar>>(
        self,
        rhs: R,
    ) -> CwiseBinary<Self, R, ProductOp> {
        CwiseBinary::new(self, rhs, ProductOp)
    }

    fn scale(self, factor: Self::Scalar) -> Scaled<Self> {
        CwiseUnary::new(self, ScaleOp(factor))
    }

    fn negated(self) -> Negated<Self> {
        CwiseUnary::new(self, NegateOp)
    }

    fn cwise_abs(self) -> CwiseUnary<Self, AbsOp> {
        CwiseUnary::new(self, AbsOp)
    }

    /// Applies an arbitrary function to every coefficient (never vectorized).
    fn map<F>(self, f: F) -> CwiseUnary<Self, MapOp<F>>
    where
        F: Fn(Self::Scalar) -> Self::Scalar + Sync,
    {
        CwiseUnary::new(self, MapOp(f))
    }

    fn conjugate(self) -> Conjugate<Self> {
        CwiseUnary::new(self, ConjugateOp)
    }

    fn transpose(self) -> Transpose<Self> {
        Transpose::new(self)
    }

    /// Conjugate transpose.
    fn adjoint(self) -> Transpose<Conjugate<Self>> {
        Transpose::new(self.conjugate())
    }

    /// Reverses both rows and columns.
    fn reverse(self) -> Reverse<Self, Both> {
        Reverse::new(self)
    }

    /// Reverses the order of the rows.
    fn reverse_rows(self) -> Reverse<Self, Vertical> {
        Reverse::new(self)
    }

    /// Reverses the order of the columns.
    fn reverse_cols(self) -> Reverse<Self, Horizontal> {
        Reverse::new(self)
    }

    fn block(self, row: usize, col: usize, rows: usize, cols: usize) -> Block<Self> {
        Block::new(self, row, col, rows, cols)
    }

    fn row(self, index: usize) -> Block<Self> {
        let cols = self.cols();
        Block::new(self, index, 0, 1, cols)
    }

    fn col(self, index: usize) -> Block<Self> {
        let rows = self.rows();
        Block::new(self, 0, index, rows, 1)
    }

    /// Matrix product evaluated coefficient by coefficient on demand.
    fn lazy_product<R: Expr<Scalar = Self::Scalar>>(self, rhs: R) -> Product<Self, R> {
        Product::new(self, rhs)
    }

    fn try_lazy_product<R: Expr<Scalar = Self::Scalar>>(self, rhs: R) -> Result<Product<Self, R>> {
        Product::try_new(self, rhs)
    }

    /// Matrix product evaluated into a new matrix with the cache-blocked
    /// kernel, split across workers for large destinations.
    fn product<R: Expr<Scalar = Self::Scalar>>(&self, rhs: &R) -> Result<Matrix<Self::Scalar>> {
        product::evaluate(self, rhs)
    }

    /// Evaluates into a new column-major matrix.
    ///
    /// # Panics
    ///
    /// Aborts like `Vec` if the allocation fails; see [`try_eval`](Self::try_eval).
    fn eval(&self) -> Matrix<Self::Scalar> {
        let mut out = Matrix::zeros(self.rows(), self.cols());
        assign::assign(&mut out, self);
        out
    }

    fn try_eval(&self) -> Result<Matrix<Self::Scalar>> {
        let mut out = Matrix::try_zeros(self.rows(), self.cols())?;
        assign::try_assign(&mut out, self)?;
        Ok(out)
    }

    /// `sum_i conj(self_i) * rhs_i` over two vectors.
    fn dot<R: Expr<Scalar = Self::Scalar>>(&self, rhs: &R) -> Self::Scalar {
        dot::dot(self, rhs)
    }

    fn squared_norm(&self) -> <Self::Scalar as Scalar>::Real {
        dot::squared_norm(self)
    }

    fn norm(&self) -> <Self::Scalar as Scalar>::Real {
        dot::norm(self)
    }

    fn sum_coeffs(&self) -> Self::Scalar {
        dot::sum_coeffs(self)
    }

    /// `||self - other||^2 <= prec^2 * min(||self||^2, ||other||^2)`.
    fn is_approx<R: Expr<Scalar = Self::Scalar>>(
        &self,
        other: &R,
        prec: <Self::Scalar as Scalar>::Real,
    ) -> bool {
        dot::is_approx(self, other, prec)
    }

    fn is_much_smaller_than(
        &self,
        other: <Self::Scalar as Scalar>::Real,
        prec: <Self::Scalar as Scalar>::Real,
    ) -> bool {
        dot::is_much_smaller_than(self, other, prec)
    }

    /// Coefficients in row-major order.
    fn to_vec(&self) -> Vec<Self::Scalar> {
        let mut out = Vec::with_capacity(self.size());
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                out.push(self.coeff(row, col));
            }
        }
        out
    }
}

impl<E: Expr> ExprExt for E {}

/// Assignment and in-place operations on writable expressions.
pub trait ExprMutExt: ExprMut + Sized {
    /// `self = src`, resizing `self` when it supports it.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ and `self` cannot be resized.
    fn assign_from<S: Expr<Scalar = Self::Scalar>>(&mut self, src: S) {
        assign::assign(self, src)
    }

    fn try_assign_from<S: Expr<Scalar = Self::Scalar>>(&mut self, src: S) -> Result<()> {
        assign::try_assign(self, src)
    }

    /// `self += src`.
    fn plus_assign<S: Expr<Scalar = Self::Scalar>>(&mut self, src: S) {
        if let Err(err) = assign::add_assign(self, src) {
            panic!("{err}");
        }
    }

    /// `self -= src`.
    fn minus_assign<S: Expr<Scalar = Self::Scalar>>(&mut self, src: S) {
        if let Err(err) = assign::sub_assign(self, src) {
            panic!("{err}");
        }
    }

    /// `self *= factor`.
    fn scale_assign(&mut self, factor: Self::Scalar) {
        let (rows, cols) = (self.rows(), self.cols());
        if Self::FLAGS.is_row_major() {
            let src = Constant::<Self::Scalar, true>::new(rows, cols, factor);
            assign::run_compound(self, &src, MulTo);
        } else {
            let src = Constant::<Self::Scalar, false>::new(rows, cols, factor);
            assign::run_compound(self, &src, MulTo);
        }
    }

    /// `self = self * rhs` as a matrix product, through a temporary so the
    /// operands never alias the destination.
    fn mul_assign<R: Expr<Scalar = Self::Scalar>>(&mut self, rhs: &R) -> Result<()> {
        let result = product::evaluate(&*self, rhs)?;
        assign::try_assign(self, &result)
    }

    fn set_constant(&mut self, value: Self::Scalar) {
        let (rows, cols) = (self.rows(), self.cols());
        if Self::FLAGS.is_row_major() {
            assign::assign(self, Constant::<Self::Scalar, true>::new(rows, cols, value));
        } else {
            assign::assign(self, Constant::<Self::Scalar, false>::new(rows, cols, value));
        }
    }

    fn set_zero(&mut self) {
        self.set_constant(<Self::Scalar as num::Zero>::zero());
    }

    fn set_identity(&mut self) {
        let (rows, cols) = (self.rows(), self.cols());
        assign::assign(self, Identity::<Self::Scalar>::new(rows, cols));
    }

    fn block_mut(&mut self, row: usize, col: usize, rows: usize, cols: usize) -> Block<&mut Self> {
        Block::new(self, row, col, rows, cols)
    }

    fn row_mut(&mut self, index: usize) -> Block<&mut Self> {
        let cols = self.cols();
        Block::new(self, index, 0, 1, cols)
    }

    fn col_mut(&mut self, index: usize) -> Block<&mut Self> {
        let rows = self.rows();
        Block::new(self, 0, index, rows, 1)
    }

    fn transpose_mut(&mut self) -> Transpose<&mut Self> {
        Transpose::new(self)
    }

    fn reverse_mut(&mut self) -> Reverse<&mut Self, Both> {
        Reverse::new(self)
    }
}

impl<E: ExprMut> ExprMutExt for E {}
