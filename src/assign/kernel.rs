//! Assignment functors and the per-position transfer primitives the
//! executors are built from.

use crate::expr::{Expr, ExprMut};
use crate::scalar::Scalar;
use crate::simd::Align;

/// How a source value is combined with the destination value it replaces.
pub trait AssignOp<T: Scalar>: Copy + Send + Sync {
    /// `false` when the old destination value is ignored, which lets the
    /// executors skip the read.
    const READS_DESTINATION: bool;

    fn combine(&self, old: T, new: T) -> T;

    fn combine_packet(&self, old: T::Packet, new: T::Packet) -> T::Packet;
}

/// `dst = src`
#[derive(Debug, Clone, Copy, Default)]
pub struct Assign;

/// `dst += src`
#[derive(Debug, Clone, Copy, Default)]
pub struct AddTo;

/// `dst -= src`
#[derive(Debug, Clone, Copy, Default)]
pub struct SubFrom;

/// `dst *= src`, coefficient-wise.
#[derive(Debug, Clone, Copy, Default)]
pub struct MulTo;

impl<T: Scalar> AssignOp<T> for Assign {
    const READS_DESTINATION: bool = false;

    #[inline(always)]
    fn combine(&self, _old: T, new: T) -> T {
        new
    }

    #[inline(always)]
    fn combine_packet(&self, _old: T::Packet, new: T::Packet) -> T::Packet {
        new
    }
}

macro_rules! impl_compound_op {
    ($name:ident, $op:tt) => {
        impl<T: Scalar> AssignOp<T> for $name {
            const READS_DESTINATION: bool = true;

            #[inline(always)]
            fn combine(&self, old: T, new: T) -> T {
                old $op new
            }

            #[inline(always)]
            fn combine_packet(&self, old: T::Packet, new: T::Packet) -> T::Packet {
                old $op new
            }
        }
    };
}

impl_compound_op!(AddTo, +);
impl_compound_op!(SubFrom, -);
impl_compound_op!(MulTo, *);

#[inline(always)]
pub(crate) fn copy_coeff<D, S, Op>(dst: &mut D, src: &S, op: Op, row: usize, col: usize)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let new = src.coeff(row, col);
    let value = if Op::READS_DESTINATION {
        op.combine(dst.coeff(row, col), new)
    } else {
        new
    };
    *dst.coeff_ref(row, col) = value;
}

#[inline(always)]
pub(crate) fn copy_coeff_linear<D, S, Op>(dst: &mut D, src: &S, op: Op, index: usize)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let new = src.coeff_linear(index);
    let value = if Op::READS_DESTINATION {
        op.combine(dst.coeff_linear(index), new)
    } else {
        new
    };
    *dst.coeff_ref_linear(index) = value;
}

#[inline(always)]
pub(crate) fn copy_packet<D, S, Op>(
    dst: &mut D,
    src: &S,
    op: Op,
    (row, col): (usize, usize),
    dst_align: Align,
    src_align: Align,
) where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let new = src.packet(row, col, src_align);
    let value = if Op::READS_DESTINATION {
        op.combine_packet(dst.packet(row, col, dst_align), new)
    } else {
        new
    };
    dst.write_packet(row, col, dst_align, value);
}

#[inline(always)]
pub(crate) fn copy_packet_linear<D, S, Op>(
    dst: &mut D,
    src: &S,
    op: Op,
    index: usize,
    dst_align: Align,
    src_align: Align,
) where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let new = src.packet_linear(index, src_align);
    let value = if Op::READS_DESTINATION {
        op.combine_packet(dst.packet_linear(index, dst_align), new)
    } else {
        new
    };
    dst.write_packet_linear(index, dst_align, value);
}
