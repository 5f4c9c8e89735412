use std::slice;

use crate::expr::{Expr, ExprMut, PacketOf};
use crate::flags::{Cost, Flags, Shape};
use crate::scalar::Scalar;
use crate::simd::Align;
use crate::storage::{load_from, store_into, ColMajor, StorageOrder};

/// A column-major `R x C` matrix stored inline.
///
/// Its dimensions are part of the type, so small fixed-size assignments can
/// be unrolled completely. The storage is 32-byte aligned, which covers the
/// widest packet type.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C, align(32))]
pub struct SMatrix<T, const R: usize, const C: usize> {
    data: [[T; R]; C],
}

impl<T: Scalar, const R: usize, const C: usize> SMatrix<T, R, C> {
    pub fn zeros() -> Self {
        SMatrix {
            data: [[T::zero(); R]; C],
        }
    }

    /// Builds the matrix from its columns.
    pub fn from_columns(columns: [[T; R]; C]) -> Self {
        SMatrix { data: columns }
    }

    pub fn from_rows(rows: &[[T; C]; R]) -> Self {
        Self::from_fn(|r, c| rows[r][c])
    }

    pub fn from_fn<F: FnMut(usize, usize) -> T>(mut f: F) -> Self {
        let mut m = Self::zeros();
        for c in 0..C {
            for r in 0..R {
                m.data[c][r] = f(r, c);
            }
        }
        m
    }

    /// Coefficients in column-major order.
    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[[T; R]; C]` is `R * C` contiguous `T`s.
        unsafe { slice::from_raw_parts(self.data.as_ptr().cast::<T>(), R * C) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above.
        unsafe { slice::from_raw_parts_mut(self.data.as_mut_ptr().cast::<T>(), R * C) }
    }
}

impl<T: Scalar, const R: usize, const C: usize> Default for SMatrix<T, R, C> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<T: Scalar, const R: usize, const C: usize> Expr for SMatrix<T, R, C> {
    type Scalar = T;

    const SHAPE: Shape = Shape::fixed(R, C);
    const FLAGS: Flags = ColMajor::FLAGS
        .or(Flags::DIRECT_ACCESS)
        .or(Flags::LINEAR_ACCESS)
        .or(Flags::PACKET_ACCESS)
        .or(Flags::ALIGNED);
    const COST: Cost = Cost::READ;

    #[inline(always)]
    fn rows(&self) -> usize {
        R
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        C
    }

    #[inline(always)]
    fn coeff(&self, row: usize, col: usize) -> T {
        self.data[col][row]
    }

    #[inline(always)]
    fn coeff_linear(&self, index: usize) -> T {
        self.as_slice()[index]
    }

    #[inline(always)]
    fn packet(&self, row: usize, col: usize, align: Align) -> PacketOf<Self> {
        load_from(self.as_slice(), ColMajor::index(row, col, R), align)
    }

    #[inline(always)]
    fn packet_linear(&self, index: usize, align: Align) -> PacketOf<Self> {
        load_from(self.as_slice(), index, align)
    }
}

impl<T: Scalar, const R: usize, const C: usize> ExprMut for SMatrix<T, R, C> {
    #[inline(always)]
    fn coeff_ref(&mut self, row: usize, col: usize) -> &mut T {
        &mut self.data[col][row]
    }

    #[inline(always)]
    fn coeff_ref_linear(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }

    #[inline(always)]
    fn write_packet(&mut self, row: usize, col: usize, align: Align, packet: PacketOf<Self>) {
        store_into(self.as_mut_slice(), ColMajor::index(row, col, R), align, packet)
    }

    #[inline(always)]
    fn write_packet_linear(&mut self, index: usize, align: Align, packet: PacketOf<Self>) {
        store_into(self.as_mut_slice(), index, align, packet)
    }

    #[inline(always)]
    fn data_ptr(&self) -> *const T {
        self.as_slice().as_ptr()
    }

    #[inline(always)]
    fn data_ptr_mut(&mut self) -> *mut T {
        self.as_mut_slice().as_mut_ptr()
    }

    #[inline(always)]
    fn outer_stride(&self) -> usize {
        R
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_ALIGN;

    #[test]
    fn fixed_matrix_layout() {
        let m = SMatrix::<f32, 2, 3>::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(m.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(m.coeff(1, 2), 6.0);
        assert_eq!(SMatrix::<f32, 2, 3>::SHAPE.size().value(), Some(6));
        assert_eq!(m.data_ptr() as usize % MAX_ALIGN, 0);
    }

    #[test]
    fn fixed_matrix_rejects_resize() {
        let mut m = SMatrix::<f64, 2, 2>::zeros();
        assert!(m.resize(2, 2).is_ok());
        assert!(m.resize(3, 2).is_err());
    }
}
