use crate::expr::{Expr, ExprMut, PacketOf};
use crate::flags::{Cost, Flags, Shape};
use crate::simd::Align;

/// Rows and columns exchanged.
///
/// Only the storage-order bit flips: memory is shared with the child, so a
/// packet along the transposed view's inner dimension is the child's packet
/// at the swapped position.
#[derive(Debug, Clone, Copy)]
pub struct Transpose<E> {
    inner: E,
}

impl<E: Expr> Transpose<E> {
    pub fn new(inner: E) -> Self {
        Transpose { inner }
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: Expr> Expr for Transpose<E> {
    type Scalar = E::Scalar;

    const SHAPE: Shape = E::SHAPE.transposed();
    const FLAGS: Flags = E::FLAGS.toggle_order().swap_triangular();
    const COST: Cost = E::COST;

    #[inline(always)]
    fn rows(&self) -> usize {
        self.inner.cols()
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.inner.rows()
    }

    #[inline(always)]
    fn coeff(&self, row: usize, col: usize) -> E::Scalar {
        self.inner.coeff(col, row)
    }

    #[inline(always)]
    fn coeff_linear(&self, index: usize) -> E::Scalar {
        self.inner.coeff_linear(index)
    }

    #[inline(always)]
    fn packet(&self, row: usize, col: usize, align: Align) -> PacketOf<Self> {
        self.inner.packet(col, row, align)
    }

    #[inline(always)]
    fn packet_linear(&self, index: usize, align: Align) -> PacketOf<Self> {
        self.inner.packet_linear(index, align)
    }
}

impl<E: ExprMut> ExprMut for Transpose<E> {
    #[inline(always)]
    fn coeff_ref(&mut self, row: usize, col: usize) -> &mut E::Scalar {
        self.inner.coeff_ref(col, row)
    }

    #[inline(always)]
    fn coeff_ref_linear(&mut self, index: usize) -> &mut E::Scalar {
        self.inner.coeff_ref_linear(index)
    }

    #[inline(always)]
    fn write_packet(&mut self, row: usize, col: usize, align: Align, packet: PacketOf<Self>) {
        self.inner.write_packet(col, row, align, packet)
    }

    #[inline(always)]
    fn write_packet_linear(&mut self, index: usize, align: Align, packet: PacketOf<Self>) {
        self.inner.write_packet_linear(index, align, packet)
    }

    #[inline(always)]
    fn data_ptr(&self) -> *const E::Scalar {
        self.inner.data_ptr()
    }

    #[inline(always)]
    fn data_ptr_mut(&mut self) -> *mut E::Scalar {
        self.inner.data_ptr_mut()
    }

    #[inline(always)]
    fn outer_stride(&self) -> usize {
        self.inner.outer_stride()
    }
}
