use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use rand::Rng;

use crate::error::{validation_error, Result};
use crate::expr::{Expr, ExprMut, PacketOf};
use crate::flags::{Cost, Flags, Shape};
use crate::scalar::Scalar;
use crate::simd::Align;
use crate::storage::view::{MatrixView, MatrixViewMut};
use crate::storage::{load_from, store_into, ColMajor, Contiguous, StorageOrder};
use crate::utils::AlignedVec;
use crate::MAX_ALIGN;

/// A dense, heap-allocated matrix with run-time dimensions.
///
/// Coefficients are stored contiguously in the order `O` with the first
/// element aligned to [`MAX_ALIGN`] bytes, so a `Matrix` advertises every
/// capability: direct, linear and packet access on aligned memory.
///
/// # Examples
///
/// ```
/// use simdexpr::prelude::*;
///
/// let a = Matrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
/// let mut b = Matrix::<f64>::zeros(2, 2);
/// b.assign_from((&a).plus(&a));
/// assert_eq!(b[(1, 0)], 6.0);
/// ```
pub struct Matrix<T, O = ColMajor> {
    data: AlignedVec<T>,
    rows: usize,
    cols: usize,
    order: PhantomData<O>,
}

impl<T: Scalar, O: StorageOrder> Matrix<T, O> {
    /// A `rows x cols` matrix of zeros.
    ///
    /// # Errors
    ///
    /// Fails when the byte size overflows or the allocator refuses the request.
    pub fn try_zeros(rows: usize, cols: usize) -> Result<Self> {
        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| validation_error(format!("{rows}x{cols} matrix is too large")))?;
        Ok(Matrix {
            data: AlignedVec::try_filled(len, MAX_ALIGN, T::zero())?,
            rows,
            cols,
            order: PhantomData,
        })
    }

    /// # Panics
    ///
    /// Panics if the allocation cannot be made.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        match Self::try_zeros(rows, cols) {
            Ok(m) => m,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn from_fn<F: FnMut(usize, usize) -> T>(rows: usize, cols: usize, mut f: F) -> Self {
        let mut m = Self::zeros(rows, cols);
        for row in 0..rows {
            for col in 0..cols {
                m[(row, col)] = f(row, col);
            }
        }
        m
    }

    /// Builds a matrix from a list of rows.
    pub fn from_rows<const C: usize>(rows: &[[T; C]]) -> Self {
        Self::from_fn(rows.len(), C, |r, c| rows[r][c])
    }

    /// Builds a matrix from coefficients listed row by row.
    ///
    /// # Errors
    ///
    /// Fails if `values.len() != rows * cols`.
    pub fn from_row_slice(rows: usize, cols: usize, values: &[T]) -> Result<Self> {
        if rows.checked_mul(cols) != Some(values.len()) {
            return Err(validation_error(format!(
                "{} values cannot fill a {rows}x{cols} matrix",
                values.len()
            )));
        }
        let mut m = Self::try_zeros(rows, cols)?;
        for (index, &value) in values.iter().enumerate() {
            m[(index / cols, index % cols)] = value;
        }
        Ok(m)
    }

    /// A column vector holding `values`.
    pub fn column(values: &[T]) -> Self {
        Self::from_fn(values.len(), 1, |r, _| values[r])
    }

    pub fn identity(size: usize) -> Self {
        Self::from_fn(size, size, |r, c| if r == c { T::one() } else { T::zero() })
    }

    /// Coefficients drawn from the thread-local generator.
    pub fn random(rows: usize, cols: usize) -> Self {
        Self::random_with(rows, cols, &mut rand::rng())
    }

    pub fn random_with<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let mut m = Self::zeros(rows, cols);
        for value in m.data.iter_mut() {
            *value = T::sample(rng);
        }
        m
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Coefficients in storage order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline(always)]
    fn stride(&self) -> usize {
        if O::ROW_MAJOR {
            self.cols
        } else {
            self.rows
        }
    }

    #[inline(always)]
    fn index_of(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        O::index(row, col, self.stride())
    }

    pub fn view(&self) -> MatrixView<'_, T, O, Contiguous> {
        MatrixView::new(&self.data, self.rows, self.cols)
    }

    pub fn view_mut(&mut self) -> MatrixViewMut<'_, T, O, Contiguous> {
        let (rows, cols) = (self.rows, self.cols);
        MatrixViewMut::new(&mut self.data, rows, cols)
    }
}

impl<T: Scalar, O: StorageOrder> Expr for Matrix<T, O> {
    type Scalar = T;

    const SHAPE: Shape = Shape::DYNAMIC;
    const FLAGS: Flags = O::FLAGS
        .or(Flags::DIRECT_ACCESS)
        .or(Flags::LINEAR_ACCESS)
        .or(Flags::PACKET_ACCESS)
        .or(Flags::ALIGNED);
    const COST: Cost = Cost::READ;

    #[inline(always)]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    fn coeff(&self, row: usize, col: usize) -> T {
        self.data[self.index_of(row, col)]
    }

    #[inline(always)]
    fn coeff_linear(&self, index: usize) -> T {
        self.data[index]
    }

    #[inline(always)]
    fn packet(&self, row: usize, col: usize, align: Align) -> PacketOf<Self> {
        load_from(&self.data, self.index_of(row, col), align)
    }

    #[inline(always)]
    fn packet_linear(&self, index: usize, align: Align) -> PacketOf<Self> {
        load_from(&self.data, index, align)
    }
}

impl<T: Scalar, O: StorageOrder> ExprMut for Matrix<T, O> {
    #[inline(always)]
    fn coeff_ref(&mut self, row: usize, col: usize) -> &mut T {
        let index = self.index_of(row, col);
        &mut self.data[index]
    }

    #[inline(always)]
    fn coeff_ref_linear(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }

    #[inline(always)]
    fn write_packet(&mut self, row: usize, col: usize, align: Align, packet: PacketOf<Self>) {
        let index = self.index_of(row, col);
        store_into(&mut self.data, index, align, packet)
    }

    #[inline(always)]
    fn write_packet_linear(&mut self, index: usize, align: Align, packet: PacketOf<Self>) {
        store_into(&mut self.data, index, align, packet)
    }

    #[inline(always)]
    fn data_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    #[inline(always)]
    fn data_ptr_mut(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    #[inline(always)]
    fn outer_stride(&self) -> usize {
        self.stride()
    }

    /// Reallocates (zero-filled) only when the number of coefficients changes.
    fn resize(&mut self, rows: usize, cols: usize) -> Result<()> {
        if (rows, cols) == (self.rows, self.cols) {
            return Ok(());
        }
        if rows.checked_mul(cols) != Some(self.data.len()) {
            *self = Self::try_zeros(rows, cols)?;
        } else {
            self.rows = rows;
            self.cols = cols;
        }
        Ok(())
    }
}

impl<T: Scalar, O: StorageOrder> Index<(usize, usize)> for Matrix<T, O> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for a {}x{} matrix",
            self.rows,
            self.cols
        );
        &self.data[O::index(row, col, self.stride())]
    }
}

impl<T: Scalar, O: StorageOrder> IndexMut<(usize, usize)> for Matrix<T, O> {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for a {}x{} matrix",
            self.rows,
            self.cols
        );
        let index = O::index(row, col, self.stride());
        &mut self.data[index]
    }
}

impl<T: Scalar, O> Clone for Matrix<T, O> {
    fn clone(&self) -> Self {
        Matrix {
            data: self.data.clone(),
            rows: self.rows,
            cols: self.cols,
            order: PhantomData,
        }
    }
}

impl<T: Scalar, O> PartialEq for Matrix<T, O> {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && *self.data == *other.data
    }
}

impl<T: Scalar, O: StorageOrder> fmt::Debug for Matrix<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Matrix {}x{} ({})",
            self.rows,
            self.cols,
            if O::ROW_MAJOR { "row-major" } else { "column-major" }
        )?;
        for row in 0..self.rows {
            let values: Vec<String> = (0..self.cols)
                .map(|col| format!("{}", self[(row, col)]))
                .collect();
            writeln!(f, "  [{}]", values.join(", "))?;
        }
        Ok(())
    }
}
