use crate::expr::{Expr, ExprMut, PacketOf};
use crate::flags::{Cost, Flags, Shape};
use crate::simd::Align;

/// A rectangular window `[row, row + rows) x [col, col + cols)` of a child.
///
/// The window starts at an arbitrary offset, so flat indexing and the
/// static alignment claim are lost; the rest of the child's capabilities
/// carry over. Alignment hints are forwarded unchanged because the packet at
/// a block position is the child's packet at the same address.
#[derive(Debug, Clone, Copy)]
pub struct Block<E> {
    inner: E,
    start_row: usize,
    start_col: usize,
    rows: usize,
    cols: usize,
}

impl<E: Expr> Block<E> {
    /// # Panics
    ///
    /// Panics if the window does not fit inside `inner`.
    #[track_caller]
    pub fn new(inner: E, row: usize, col: usize, rows: usize, cols: usize) -> Self {
        assert!(
            row.checked_add(rows).is_some_and(|end| end <= inner.rows())
                && col.checked_add(cols).is_some_and(|end| end <= inner.cols()),
            "block {rows}x{cols} at ({row}, {col}) exceeds a {}x{} expression",
            inner.rows(),
            inner.cols()
        );
        Block {
            inner,
            start_row: row,
            start_col: col,
            rows,
            cols,
        }
    }

    /// Position of the top-left corner inside the child.
    pub fn start(&self) -> (usize, usize) {
        (self.start_row, self.start_col)
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: Expr> Expr for Block<E> {
    type Scalar = E::Scalar;

    const SHAPE: Shape = E::SHAPE.bounded_dynamic();
    const FLAGS: Flags = E::FLAGS.and(
        Flags::ROW_MAJOR
            .or(Flags::DIRECT_ACCESS)
            .or(Flags::PACKET_ACCESS),
    );
    const COST: Cost = E::COST;

    #[inline(always)]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    fn coeff(&self, row: usize, col: usize) -> E::Scalar {
        debug_assert!(row < self.rows && col < self.cols);
        self.inner.coeff(self.start_row + row, self.start_col + col)
    }

    #[inline(always)]
    fn packet(&self, row: usize, col: usize, align: Align) -> PacketOf<Self> {
        self.inner
            .packet(self.start_row + row, self.start_col + col, align)
    }
}

impl<E: ExprMut> ExprMut for Block<E> {
    #[inline(always)]
    fn coeff_ref(&mut self, row: usize, col: usize) -> &mut E::Scalar {
        debug_assert!(row < self.rows && col < self.cols);
        self.inner
            .coeff_ref(self.start_row + row, self.start_col + col)
    }

    #[inline(always)]
    fn write_packet(&mut self, row: usize, col: usize, align: Align, packet: PacketOf<Self>) {
        self.inner
            .write_packet(self.start_row + row, self.start_col + col, align, packet)
    }

    #[inline(always)]
    fn data_ptr(&self) -> *const E::Scalar {
        self.inner.data_ptr().wrapping_add(self.offset())
    }

    #[inline(always)]
    fn data_ptr_mut(&mut self) -> *mut E::Scalar {
        let offset = self.offset();
        self.inner.data_ptr_mut().wrapping_add(offset)
    }

    #[inline(always)]
    fn outer_stride(&self) -> usize {
        self.inner.outer_stride()
    }
}

impl<E: ExprMut> Block<E> {
    /// Element offset of the window's first coefficient in the child's memory.
    #[inline(always)]
    fn offset(&self) -> usize {
        let stride = self.inner.outer_stride();
        if E::FLAGS.is_row_major() {
            self.start_row * stride + self.start_col
        } else {
            self.start_col * stride + self.start_row
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExprExt, ExprMutExt};
    use crate::storage::{Matrix, RowMajor, SMatrix};

    #[test]
    fn block_coefficients_and_descriptor() {
        let m = Matrix::<f64>::from_fn(4, 5, |r, c| (10 * r + c) as f64);
        let b = (&m).block(1, 2, 2, 3);
        assert_eq!(b.coeff(1, 2), 24.0);
        assert_eq!((&m).row(3).to_vec(), vec![30.0, 31.0, 32.0, 33.0, 34.0]);
        type B<'a> = Block<&'a SMatrix<f32, 4, 4>>;
        assert!(B::SHAPE.rows.is_dynamic());
        assert_eq!(B::SHAPE.max_rows.value(), Some(4));
        assert!(!B::FLAGS.has(Flags::LINEAR_ACCESS));
        assert!(!B::FLAGS.has(Flags::ALIGNED));
    }

    #[test]
    fn block_pointer_follows_parent_layout() {
        let mut m = Matrix::<f32, RowMajor>::zeros(3, 6);
        let base = m.data_ptr();
        let b = m.block_mut(1, 2, 2, 2);
        assert_eq!(b.data_ptr(), base.wrapping_add(6 + 2));
        assert_eq!(b.outer_stride(), 6);
    }

    #[test]
    fn writes_through_block() {
        let mut m = Matrix::<f64>::zeros(3, 3);
        m.block_mut(1, 1, 2, 2).set_constant(5.0);
        assert_eq!(m.to_vec(), vec![0.0, 0.0, 0.0, 0.0, 5.0, 5.0, 0.0, 5.0, 5.0]);
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn block_out_of_range_panics() {
        let m = Matrix::<f64>::zeros(3, 3);
        let _ = (&m).block(2, 2, 2, 1);
    }
}
