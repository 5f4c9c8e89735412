//! Bridges to `ndarray`.
//!
//! Two-dimensional `ndarray` views take part in expressions as leaves. Their
//! strides are arbitrary, so they only offer coefficient access and are
//! always traversed one coefficient at a time; copy into a [`Matrix`] first
//! when the vectorized paths matter.

use ::ndarray::{Array2, ArrayBase, ArrayView2, ArrayViewMut2, Data, Ix2};

use crate::expr::{Expr, ExprMut};
use crate::flags::{Cost, Flags, Shape};
use crate::scalar::Scalar;
use crate::storage::{Matrix, StorageOrder};

impl<'a, T: Scalar> Expr for ArrayView2<'a, T> {
    type Scalar = T;

    const SHAPE: Shape = Shape::DYNAMIC;
    const FLAGS: Flags = Flags::ROW_MAJOR;
    const COST: Cost = Cost::READ;

    #[inline]
    fn rows(&self) -> usize {
        self.nrows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.ncols()
    }

    #[inline]
    fn coeff(&self, row: usize, col: usize) -> T {
        self[[row, col]]
    }
}

impl<'a, T: Scalar> Expr for ArrayViewMut2<'a, T> {
    type Scalar = T;

    const SHAPE: Shape = Shape::DYNAMIC;
    const FLAGS: Flags = Flags::ROW_MAJOR;
    const COST: Cost = Cost::READ;

    #[inline]
    fn rows(&self) -> usize {
        self.nrows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.ncols()
    }

    #[inline]
    fn coeff(&self, row: usize, col: usize) -> T {
        self[[row, col]]
    }
}

impl<'a, T: Scalar> ExprMut for ArrayViewMut2<'a, T> {
    #[inline]
    fn coeff_ref(&mut self, row: usize, col: usize) -> &mut T {
        &mut self[[row, col]]
    }
}

impl<T: Scalar, O: StorageOrder> Matrix<T, O> {
    /// Copies any two-dimensional `ndarray` array.
    pub fn from_ndarray<S: Data<Elem = T>>(array: &ArrayBase<S, Ix2>) -> Self {
        Self::from_fn(array.nrows(), array.ncols(), |r, c| array[[r, c]])
    }

    /// Copies into a standard-layout `ndarray` array.
    pub fn to_ndarray(&self) -> Array2<T> {
        Array2::from_shape_fn((self.rows(), self.cols()), |(r, c)| self.coeff(r, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExprExt, ExprMutExt};
    use ::ndarray::array;

    #[test]
    fn ndarray_views_are_expressions() {
        let a = array![[1.0f64, 2.0], [3.0, 4.0]];
        let m = Matrix::<f64>::from_rows(&[[10.0, 20.0], [30.0, 40.0]]);
        let sum = a.view().plus(&m).eval();
        assert_eq!(sum.to_vec(), vec![11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn assign_into_ndarray() {
        let mut out = Array2::<f32>::zeros((2, 3));
        let m = Matrix::<f32>::from_fn(2, 3, |r, c| (r * 3 + c) as f32);
        out.view_mut().assign_from((&m).scale(2.0));
        assert_eq!(out[[1, 2]], 10.0);
        assert_eq!(Matrix::<f32>::from_ndarray(&out).to_ndarray(), out);
    }
}
