//! Reversal of rows, columns, or both.

use std::marker::PhantomData;

use crate::expr::{Expr, ExprMut, PacketOf};
use crate::flags::{Cost, Flags, Shape};
use crate::simd::{Align, Packet};

/// Which axes a [`Reverse`] flips.
pub trait Direction: Copy + Send + Sync + 'static {
    const ROWS: bool;
    const COLS: bool;
}

/// Rows and columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct Both;

/// Rows only (top to bottom).
#[derive(Debug, Clone, Copy, Default)]
pub struct Vertical;

/// Columns only (left to right).
#[derive(Debug, Clone, Copy, Default)]
pub struct Horizontal;

impl Direction for Both {
    const ROWS: bool = true;
    const COLS: bool = true;
}

impl Direction for Vertical {
    const ROWS: bool = true;
    const COLS: bool = false;
}

impl Direction for Horizontal {
    const ROWS: bool = false;
    const COLS: bool = true;
}

/// `child(rows - 1 - r, cols - 1 - c)` for the flipped axes.
///
/// Packet access survives: when the flipped axis is the contiguous one the
/// child packet is fetched `LANES - 1` positions further and its lanes are
/// reversed. Flat indexing survives only for a full reversal, where index
/// `i` maps to `size - 1 - i`.
#[derive(Debug, Clone, Copy)]
pub struct Reverse<E, D> {
    inner: E,
    direction: PhantomData<D>,
}

impl<E: Expr, D: Direction> Reverse<E, D> {
    pub fn new(inner: E) -> Self {
        Reverse {
            inner,
            direction: PhantomData,
        }
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    const IS_ROW_MAJOR: bool = E::FLAGS.is_row_major();

    /// Whether a packet read along the inner dimension runs backwards.
    const REVERSE_PACKET: bool =
        (D::ROWS && !Self::IS_ROW_MAJOR) || (D::COLS && Self::IS_ROW_MAJOR);

    #[inline(always)]
    fn source_row(&self, row: usize, span: usize) -> usize {
        if D::ROWS {
            self.inner.rows() - row - span
        } else {
            row
        }
    }

    #[inline(always)]
    fn source_col(&self, col: usize, span: usize) -> usize {
        if D::COLS {
            self.inner.cols() - col - span
        } else {
            col
        }
    }

    /// Child position of the packet starting at (`row`, `col`).
    #[inline(always)]
    fn packet_source(&self, row: usize, col: usize) -> (usize, usize) {
        let lanes = <PacketOf<E> as Packet>::LANES;
        let row_span = if D::ROWS && !Self::IS_ROW_MAJOR { lanes } else { 1 };
        let col_span = if D::COLS && Self::IS_ROW_MAJOR { lanes } else { 1 };
        (self.source_row(row, row_span), self.source_col(col, col_span))
    }

    #[inline(always)]
    fn maybe_reverse(packet: PacketOf<E>) -> PacketOf<E> {
        if Self::REVERSE_PACKET {
            packet.reverse()
        } else {
            packet
        }
    }
}

impl<E: Expr, D: Direction> Expr for Reverse<E, D> {
    type Scalar = E::Scalar;

    const SHAPE: Shape = E::SHAPE;
    const FLAGS: Flags = {
        let both = D::ROWS && D::COLS;
        let kept = E::FLAGS
            .and(Flags::ROW_MAJOR.or(Flags::PACKET_ACCESS))
            .with_if(
                Flags::LINEAR_ACCESS,
                both && E::FLAGS.has(Flags::LINEAR_ACCESS.or(Flags::PACKET_ACCESS)),
            );
        if both {
            kept.or(E::FLAGS.and(Flags::TRIANGULAR).swap_triangular())
        } else {
            kept
        }
    };
    const COST: Cost = E::COST;

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
        self.inner
            .coeff(self.source_row(row, 1), self.source_col(col, 1))
    }

    #[inline(always)]
    fn coeff_linear(&self, index: usize) -> E::Scalar {
        self.inner.coeff_linear(self.inner.size() - index - 1)
    }

    #[inline(always)]
    fn packet(&self, row: usize, col: usize, _align: Align) -> PacketOf<Self> {
        let (r, c) = self.packet_source(row, col);
        Self::maybe_reverse(self.inner.packet(r, c, Align::Unaligned))
    }

    #[inline(always)]
    fn packet_linear(&self, index: usize, _align: Align) -> PacketOf<Self> {
        let lanes = <PacketOf<E> as Packet>::LANES;
        self.inner
            .packet_linear(self.inner.size() - index - lanes, Align::Unaligned)
            .reverse()
    }
}

impl<E: ExprMut, D: Direction> ExprMut for Reverse<E, D> {
    #[inline(always)]
    fn coeff_ref(&mut self, row: usize, col: usize) -> &mut E::Scalar {
        let (r, c) = (self.source_row(row, 1), self.source_col(col, 1));
        self.inner.coeff_ref(r, c)
    }

    #[inline(always)]
    fn coeff_ref_linear(&mut self, index: usize) -> &mut E::Scalar {
        let source = self.inner.size() - index - 1;
        self.inner.coeff_ref_linear(source)
    }

    #[inline(always)]
    fn write_packet(&mut self, row: usize, col: usize, _align: Align, packet: PacketOf<Self>) {
        let (r, c) = self.packet_source(row, col);
        self.inner
            .write_packet(r, c, Align::Unaligned, Self::maybe_reverse(packet))
    }

    #[inline(always)]
    fn write_packet_linear(&mut self, index: usize, _align: Align, packet: PacketOf<Self>) {
        let lanes = <PacketOf<E> as Packet>::LANES;
        let source = self.inner.size() - index - lanes;
        self.inner
            .write_packet_linear(source, Align::Unaligned, packet.reverse())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprExt;
    use crate::scalar::Scalar;
    use crate::storage::{Matrix, RowMajor};

    #[test]
    fn reversed_coefficients() {
        let m = Matrix::<f64>::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!((&m).reverse().to_vec(), vec![6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!((&m).reverse_rows().to_vec(), vec![4.0, 5.0, 6.0, 1.0, 2.0, 3.0]);
        assert_eq!((&m).reverse_cols().to_vec(), vec![3.0, 2.0, 1.0, 6.0, 5.0, 4.0]);
    }

    #[test]
    fn reversed_packets_match_coefficients() {
        let lanes = <f32 as Scalar>::Packet::LANES;
        let rows = 2 * lanes + 1;
        let m = Matrix::<f32>::from_fn(rows, 3, |r, c| (r * 10 + c) as f32);
        let rev = (&m).reverse();
        let p = rev.packet(1, 2, Align::Unaligned);
        for lane in 0..lanes {
            assert_eq!(p.lane(lane), rev.coeff(1 + lane, 2));
        }

        let rm = Matrix::<f32, RowMajor>::from_fn(3, rows, |r, c| (r * 10 + c) as f32);
        let rev_cols = (&rm).reverse_cols();
        let p = rev_cols.packet(2, 1, Align::Unaligned);
        for lane in 0..lanes {
            assert_eq!(p.lane(lane), rev_cols.coeff(2, 1 + lane));
        }
        // rows reversed in a row-major matrix: packets keep their lane order
        let rev_rows = (&rm).reverse_rows();
        let p = rev_rows.packet(0, 0, Align::Unaligned);
        for lane in 0..lanes {
            assert_eq!(p.lane(lane), rev_rows.coeff(0, lane));
        }
    }

    #[test]
    fn reverse_flags() {
        type Full<'a> = Reverse<&'a Matrix<f32>, Both>;
        type Rows<'a> = Reverse<&'a Matrix<f32>, Vertical>;
        assert!(Full::FLAGS.has(Flags::LINEAR_ACCESS.or(Flags::PACKET_ACCESS)));
        assert!(!Full::FLAGS.has(Flags::ALIGNED));
        assert!(!Full::FLAGS.has(Flags::DIRECT_ACCESS));
        assert!(!Rows::FLAGS.has(Flags::LINEAR_ACCESS));
        assert!(Rows::FLAGS.has(Flags::PACKET_ACCESS));
    }
}
