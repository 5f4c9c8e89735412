//! Borrowed matrix views over caller-owned buffers.

use std::marker::PhantomData;

use crate::error::{validation_error, Result};
use crate::expr::{Expr, ExprMut, PacketOf};
use crate::flags::{Cost, Flags, Shape};
use crate::scalar::Scalar;
use crate::simd::{Align, Packet};
use crate::storage::{load_at, load_from, store_at, Contiguous, StorageOrder, Stride, Strided};

/// Number of elements a `rows x cols` view with the given outer stride spans.
fn required_len<O: StorageOrder>(rows: usize, cols: usize, stride: usize) -> Option<usize> {
    let (outer, inner) = if O::ROW_MAJOR {
        (rows, cols)
    } else {
        (cols, rows)
    };
    if outer == 0 || inner == 0 {
        return Some(0);
    }
    stride.checked_mul(outer - 1)?.checked_add(inner)
}

fn check_layout<O: StorageOrder>(len: usize, rows: usize, cols: usize, stride: usize) -> Result<()> {
    let inner = if O::ROW_MAJOR { cols } else { rows };
    if stride < inner {
        return Err(validation_error(format!(
            "outer stride {stride} is smaller than the inner size {inner}"
        )));
    }
    match required_len::<O>(rows, cols, stride) {
        Some(needed) if needed <= len => Ok(()),
        _ => Err(validation_error(format!(
            "a {rows}x{cols} view with stride {stride} does not fit in {len} elements"
        ))),
    }
}

fn inner_of<O: StorageOrder>(rows: usize, cols: usize) -> usize {
    if O::ROW_MAJOR {
        cols
    } else {
        rows
    }
}

/// Read-only view of a `rows x cols` matrix stored in a slice.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a, T, O, S = Contiguous> {
    data: &'a [T],
    rows: usize,
    cols: usize,
    stride: usize,
    layout: PhantomData<(O, S)>,
}

impl<'a, T: Scalar, O: StorageOrder> MatrixView<'a, T, O, Contiguous> {
    /// A view whose outer slices are packed back to back.
    ///
    /// # Errors
    ///
    /// Fails if `data` is too short.
    pub fn from_slice(data: &'a [T], rows: usize, cols: usize) -> Result<Self> {
        let stride = inner_of::<O>(rows, cols);
        check_layout::<O>(data.len(), rows, cols, stride)?;
        Ok(Self::new(data, rows, cols))
    }

    pub(crate) fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        MatrixView {
            data,
            rows,
            cols,
            stride: inner_of::<O>(rows, cols),
            layout: PhantomData,
        }
    }
}

impl<'a, T: Scalar, O: StorageOrder> MatrixView<'a, T, O, Strided> {
    /// A view with `stride` elements between the starts of consecutive outer
    /// slices.
    pub fn with_stride(data: &'a [T], rows: usize, cols: usize, stride: usize) -> Result<Self> {
        check_layout::<O>(data.len(), rows, cols, stride)?;
        Ok(MatrixView {
            data,
            rows,
            cols,
            stride,
            layout: PhantomData,
        })
    }
}

impl<'a, T: Scalar, O: StorageOrder, S: Stride> MatrixView<'a, T, O, S> {
    #[inline(always)]
    fn index_of(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        O::index(row, col, self.stride)
    }
}

impl<'a, T: Scalar, O: StorageOrder, S: Stride> Expr for MatrixView<'a, T, O, S> {
    type Scalar = T;

    const SHAPE: Shape = Shape::DYNAMIC;
    const FLAGS: Flags = O::FLAGS
        .or(Flags::DIRECT_ACCESS)
        .or(Flags::PACKET_ACCESS)
        .with_if(Flags::LINEAR_ACCESS, S::CONTIGUOUS);
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
        load_from(self.data, self.index_of(row, col), align)
    }

    #[inline(always)]
    fn packet_linear(&self, index: usize, align: Align) -> PacketOf<Self> {
        load_from(self.data, index, align)
    }
}

/// Writable view of a `rows x cols` matrix.
///
/// Holds a raw pointer rather than a slice so that several views may cover
/// interleaved, non-overlapping parts of one buffer (the blocks of a
/// parallel assignment, for instance).
#[derive(Debug)]
pub struct MatrixViewMut<'a, T, O, S = Contiguous> {
    ptr: *mut T,
    rows: usize,
    cols: usize,
    stride: usize,
    marker: PhantomData<(&'a mut [T], O, S)>,
}

// SAFETY: a view is an exclusive borrow of the elements it covers.
unsafe impl<T: Send, O, S> Send for MatrixViewMut<'_, T, O, S> {}
// SAFETY: shared access only reads.
unsafe impl<T: Sync, O, S> Sync for MatrixViewMut<'_, T, O, S> {}

impl<'a, T: Scalar, O: StorageOrder> MatrixViewMut<'a, T, O, Contiguous> {
    pub fn from_slice_mut(data: &'a mut [T], rows: usize, cols: usize) -> Result<Self> {
        let stride = inner_of::<O>(rows, cols);
        check_layout::<O>(data.len(), rows, cols, stride)?;
        Ok(Self::new(data, rows, cols))
    }

    pub(crate) fn new(data: &'a mut [T], rows: usize, cols: usize) -> Self {
        MatrixViewMut {
            ptr: data.as_mut_ptr(),
            rows,
            cols,
            stride: inner_of::<O>(rows, cols),
            marker: PhantomData,
        }
    }
}

impl<'a, T: Scalar, O: StorageOrder> MatrixViewMut<'a, T, O, Strided> {
    pub fn with_stride_mut(
        data: &'a mut [T],
        rows: usize,
        cols: usize,
        stride: usize,
    ) -> Result<Self> {
        check_layout::<O>(data.len(), rows, cols, stride)?;
        Ok(MatrixViewMut {
            ptr: data.as_mut_ptr(),
            rows,
            cols,
            stride,
            marker: PhantomData,
        })
    }

    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of every element
    /// `O::index(r, c, stride)` with `r < rows`, `c < cols`, for `'a`, and no
    /// other live reference may access those elements.
    pub unsafe fn from_raw_parts(ptr: *mut T, rows: usize, cols: usize, stride: usize) -> Self {
        MatrixViewMut {
            ptr,
            rows,
            cols,
            stride,
            marker: PhantomData,
        }
    }
}

impl<'a, T: Scalar, O: StorageOrder, S: Stride> MatrixViewMut<'a, T, O, S> {
    #[inline(always)]
    fn index_of(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for a {}x{} view",
            self.rows,
            self.cols
        );
        O::index(row, col, self.stride)
    }

    /// Flat index of a packet, checked to stay inside one outer slice.
    #[inline(always)]
    fn packet_index(&self, row: usize, col: usize) -> usize {
        let lanes = <T::Packet as Packet>::LANES;
        let (inner, inner_size) = if O::ROW_MAJOR {
            (col, self.cols)
        } else {
            (row, self.rows)
        };
        assert!(inner + lanes <= inner_size, "packet crosses the end of an outer slice");
        self.index_of(row, col)
    }

    #[inline(always)]
    fn linear_index(&self, index: usize, span: usize) -> usize {
        assert!(index + span <= self.rows * self.cols, "linear index {index} out of bounds");
        index
    }
}

impl<'a, T: Scalar, O: StorageOrder, S: Stride> Expr for MatrixViewMut<'a, T, O, S> {
    type Scalar = T;

    const SHAPE: Shape = Shape::DYNAMIC;
    const FLAGS: Flags = O::FLAGS
        .or(Flags::DIRECT_ACCESS)
        .or(Flags::PACKET_ACCESS)
        .with_if(Flags::LINEAR_ACCESS, S::CONTIGUOUS);
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
        // SAFETY: `index_of` checked the position against the view's shape.
        unsafe { *self.ptr.add(self.index_of(row, col)) }
    }

    #[inline(always)]
    fn coeff_linear(&self, index: usize) -> T {
        // SAFETY: contiguous views cover `rows * cols` elements.
        unsafe { *self.ptr.add(self.linear_index(index, 1)) }
    }

    #[inline(always)]
    fn packet(&self, row: usize, col: usize, align: Align) -> PacketOf<Self> {
        // SAFETY: `packet_index` keeps the packet inside one outer slice.
        unsafe { load_at(self.ptr.add(self.packet_index(row, col)), align) }
    }

    #[inline(always)]
    fn packet_linear(&self, index: usize, align: Align) -> PacketOf<Self> {
        let lanes = <T::Packet as Packet>::LANES;
        // SAFETY: bounds checked by `linear_index`.
        unsafe { load_at(self.ptr.add(self.linear_index(index, lanes)), align) }
    }
}

impl<'a, T: Scalar, O: StorageOrder, S: Stride> ExprMut for MatrixViewMut<'a, T, O, S> {
    #[inline(always)]
    fn coeff_ref(&mut self, row: usize, col: usize) -> &mut T {
        let index = self.index_of(row, col);
        // SAFETY: in bounds, and `&mut self` keeps the reference exclusive.
        unsafe { &mut *self.ptr.add(index) }
    }

    #[inline(always)]
    fn coeff_ref_linear(&mut self, index: usize) -> &mut T {
        let index = self.linear_index(index, 1);
        // SAFETY: as above.
        unsafe { &mut *self.ptr.add(index) }
    }

    #[inline(always)]
    fn write_packet(&mut self, row: usize, col: usize, align: Align, packet: PacketOf<Self>) {
        let index = self.packet_index(row, col);
        // SAFETY: as in `packet`.
        unsafe { store_at(self.ptr.add(index), align, packet) }
    }

    #[inline(always)]
    fn write_packet_linear(&mut self, index: usize, align: Align, packet: PacketOf<Self>) {
        let lanes = <T::Packet as Packet>::LANES;
        let index = self.linear_index(index, lanes);
        // SAFETY: as in `packet_linear`.
        unsafe { store_at(self.ptr.add(index), align, packet) }
    }

    #[inline(always)]
    fn data_ptr(&self) -> *const T {
        self.ptr
    }

    #[inline(always)]
    fn data_ptr_mut(&mut self) -> *mut T {
        self.ptr
    }

    #[inline(always)]
    fn outer_stride(&self) -> usize {
        self.stride
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprMutExt;
    use crate::storage::{ColMajor, RowMajor};

    #[test]
    fn strided_view_reads_with_gaps() {
        let data: Vec<f64> = (0..12).map(f64::from).collect();
        let v = MatrixView::<f64, ColMajor, Strided>::with_stride(&data, 2, 3, 4).unwrap();
        assert_eq!(v.coeff(1, 2), 9.0);
        assert!(!MatrixView::<f64, ColMajor, Strided>::FLAGS.has(Flags::LINEAR_ACCESS));
        assert!(MatrixView::<f64, ColMajor>::FLAGS.has(Flags::LINEAR_ACCESS));
    }

    #[test]
    fn layout_is_validated() {
        let data = [0.0f32; 5];
        assert!(MatrixView::<f32, RowMajor>::from_slice(&data, 2, 3).is_err());
        assert!(MatrixView::<f32, RowMajor, Strided>::with_stride(&data, 2, 2, 1).is_err());
        assert!(MatrixView::<f32, RowMajor, Strided>::with_stride(&data, 2, 2, 3).is_ok());
    }

    #[test]
    fn mutable_view_writes_through() {
        let mut data = vec![0.0f64; 6];
        {
            let mut v = MatrixViewMut::<f64, RowMajor>::from_slice_mut(&mut data, 2, 3).unwrap();
            *v.coeff_ref(1, 0) = 7.0;
            v.row_mut(0).set_constant(1.0);
        }
        assert_eq!(data, vec![1.0, 1.0, 1.0, 7.0, 0.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn mutable_view_checks_bounds() {
        let mut data = vec![0.0f64; 4];
        let v = MatrixViewMut::<f64, ColMajor>::from_slice_mut(&mut data, 2, 2).unwrap();
        let _ = v.coeff(0, 2);
    }
}
