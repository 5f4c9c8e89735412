//! Aligned storage and alignment probing.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::error::{allocation_error, layout_error, Result};

/// A heap buffer of `Copy` elements whose first element is aligned to a
/// caller-chosen boundary.
///
/// Dense matrices store their coefficients in an `AlignedVec` so that the
/// assignment classifier may claim the [`ALIGNED`](crate::Flags::ALIGNED)
/// capability for them: every packet load starting at a multiple of the
/// packet width is then an aligned load.
///
/// # Memory Safety
///
/// - Uses `std::alloc::alloc()` for allocation and `std::alloc::dealloc()` for cleanup
///   with the exact same `Layout`
/// - Every element is initialized before the buffer is handed out
/// - Zero-length buffers never touch the allocator
pub struct AlignedVec<T> {
    ptr: NonNull<T>,
    len: usize,
    layout: Layout,
}

// SAFETY: `AlignedVec` owns its elements exclusively, like `Vec<T>`.
unsafe impl<T: Send> Send for AlignedVec<T> {}
// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: Sync> Sync for AlignedVec<T> {}

impl<T: Copy> AlignedVec<T> {
    fn layout_for(len: usize, align: usize) -> Result<Layout> {
        if !align.is_power_of_two() || align < mem::align_of::<T>() {
            return Err(layout_error(
                len.saturating_mul(mem::size_of::<T>()),
                align,
                "alignment must be a power of two no smaller than the element alignment",
            ));
        }
        let size = len.checked_mul(mem::size_of::<T>()).ok_or_else(|| {
            layout_error(usize::MAX, align, "requested element count overflows usize")
        })?;
        Layout::from_size_align(size, align)
            .map_err(|err| layout_error(size, align, err.to_string()))
    }

    /// Allocates `len` elements aligned to `align` bytes, all set to `value`.
    ///
    /// # Errors
    ///
    /// - [`ExprError::LayoutError`](crate::ExprError::LayoutError) if `align` is not a
    ///   power of two, is below the natural alignment of `T`, or the byte size overflows
    /// - [`ExprError::AllocationError`](crate::ExprError::AllocationError) if the
    ///   allocator cannot satisfy the request
    pub fn try_filled(len: usize, align: usize, value: T) -> Result<Self> {
        let layout = Self::layout_for(len, align)?;

        if layout.size() == 0 {
            return Ok(AlignedVec {
                ptr: NonNull::dangling(),
                len,
                layout,
            });
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc(layout) } as *mut T;
        let ptr = NonNull::new(raw).ok_or_else(|| {
            allocation_error(layout.size(), layout.align(), "aligned buffer request failed")
        })?;

        for i in 0..len {
            // SAFETY: `i < len` and the allocation holds `len` elements.
            unsafe { ptr.as_ptr().add(i).write(value) };
        }

        Ok(AlignedVec { ptr, len, layout })
    }

    /// Copies `values` into a new buffer aligned to `align` bytes.
    pub fn try_from_slice(values: &[T], align: usize) -> Result<Self> {
        let layout = Self::layout_for(values.len(), align)?;

        if layout.size() == 0 {
            return Ok(AlignedVec {
                ptr: NonNull::dangling(),
                len: values.len(),
                layout,
            });
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc(layout) } as *mut T;
        let ptr = NonNull::new(raw).ok_or_else(|| {
            allocation_error(layout.size(), layout.align(), "aligned buffer request failed")
        })?;

        // SAFETY: source and destination both hold `values.len()` elements and
        // cannot overlap since the destination was just allocated.
        unsafe {
            std::ptr::copy_nonoverlapping(values.as_ptr(), ptr.as_ptr(), values.len());
        }

        Ok(AlignedVec {
            ptr,
            len: values.len(),
            layout,
        })
    }

    /// Infallible variant of [`try_filled`](Self::try_filled).
    ///
    /// # Panics
    ///
    /// Panics on an invalid alignment; aborts through `handle_alloc_error` if
    /// memory is exhausted, mirroring `Vec`.
    pub fn filled(len: usize, align: usize, value: T) -> Self {
        match Self::try_filled(len, align, value) {
            Ok(buffer) => buffer,
            Err(err) => Self::fail(len, align, err),
        }
    }

    /// Infallible variant of [`try_from_slice`](Self::try_from_slice).
    pub fn from_slice(values: &[T], align: usize) -> Self {
        match Self::try_from_slice(values, align) {
            Ok(buffer) => buffer,
            Err(err) => Self::fail(values.len(), align, err),
        }
    }

    #[cold]
    fn fail(len: usize, align: usize, err: crate::ExprError) -> ! {
        match Self::layout_for(len, align) {
            Ok(layout) => handle_alloc_error(layout),
            Err(_) => panic!("{err}"),
        }
    }

    /// Alignment of the first element in bytes.
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }
}

impl<T> Drop for AlignedVec<T> {
    fn drop(&mut self) {
        if self.layout.size() > 0 {
            // SAFETY: the pointer came from `alloc` with this exact layout.
            unsafe {
                dealloc(self.ptr.as_ptr() as *mut u8, self.layout);
            }
        }
    }
}

impl<T> Deref for AlignedVec<T> {
    type Target = [T];
    fn deref(&self) -> &Self::Target {
        // SAFETY: `len` initialized elements live at `ptr` (or `len` is zero-sized).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> DerefMut for AlignedVec<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: as in `deref`, with exclusive access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy> Clone for AlignedVec<T> {
    fn clone(&self) -> Self {
        Self::from_slice(self, self.layout.align())
    }
}

impl<T: fmt::Debug> fmt::Debug for AlignedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Copy> From<AlignedVec<T>> for Vec<T> {
    fn from(aligned_vec: AlignedVec<T>) -> Self {
        aligned_vec.to_vec()
    }
}

/// Distance in elements from `ptr` to the next address aligned to
/// `lanes * size_of::<T>()` bytes, without capping.
///
/// Returns `None` when `ptr` is not even aligned on `T` itself; no amount of
/// whole-element stepping reaches a packet boundary in that case.
#[inline]
pub fn alignment_offset<T>(ptr: *const T, lanes: usize) -> Option<usize> {
    debug_assert!(lanes.is_power_of_two());
    let elem = mem::size_of::<T>();
    if elem == 0 {
        return Some(0);
    }
    let addr = ptr as usize;
    if addr % elem != 0 {
        return None;
    }
    let mask = lanes - 1;
    Some((lanes - ((addr / elem) & mask)) & mask)
}

/// Index of the first element at or after `ptr` that starts an aligned
/// packet, capped at `size`.
///
/// # Examples
///
/// ```
/// use simdexpr::utils::first_aligned;
///
/// let data = [0.0f64; 8];
/// let index = first_aligned(data.as_ptr(), 4, data.len());
/// assert!(index < 4);
/// assert_eq!(first_aligned(data.as_ptr(), 4, 0), 0);
/// ```
#[inline]
pub fn first_aligned<T>(ptr: *const T, lanes: usize, size: usize) -> usize {
    match alignment_offset(ptr, lanes) {
        Some(offset) => offset.min(size),
        None => size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExprError;

    #[test]
    fn test_filled_is_aligned_and_initialized() {
        let buffer = AlignedVec::filled(13, 32, 1.5f32);
        assert_eq!(buffer.len(), 13);
        assert_eq!(buffer.as_ptr() as usize % 32, 0);
        assert!(buffer.iter().all(|&x| x == 1.5));
    }

    #[test]
    fn test_zero_length_buffer() {
        let buffer = AlignedVec::<f64>::try_filled(0, 32, 0.0).unwrap();
        assert!(buffer.is_empty());
        let cloned = buffer.clone();
        assert!(cloned.is_empty());
    }

    #[test]
    fn test_invalid_alignment_is_layout_error() {
        let err = AlignedVec::<f32>::try_filled(4, 24, 0.0).unwrap_err();
        assert!(matches!(err, ExprError::LayoutError { alignment: 24, .. }));
    }

    #[test]
    fn test_overflowing_request_is_rejected() {
        let err = AlignedVec::<f64>::try_filled(usize::MAX, 32, 0.0).unwrap_err();
        assert!(matches!(err, ExprError::LayoutError { .. }));
    }

    #[test]
    fn test_from_slice_round_trip() {
        let values = [1.0f64, 2.0, 3.0];
        let buffer = AlignedVec::from_slice(&values, 32);
        let back: Vec<f64> = buffer.into();
        assert_eq!(back, values);
    }

    #[test]
    fn test_first_aligned_on_aligned_base() {
        let buffer = AlignedVec::filled(16, 32, 0.0f32);
        assert_eq!(first_aligned(buffer.as_ptr(), 8, buffer.len()), 0);
        // one element in, the next 32-byte boundary is seven floats away
        let shifted = unsafe { buffer.as_ptr().add(1) };
        assert_eq!(first_aligned(shifted, 8, 15), 7);
        assert_eq!(first_aligned(shifted, 8, 3), 3);
    }

    #[test]
    fn test_misaligned_element_pointer_probes_to_size() {
        let words = [0u32; 4];
        let ptr = (words.as_ptr() as *const u8).wrapping_add(1) as *const f32;
        assert_eq!(first_aligned(ptr, 4, 3), 3);
        assert_eq!(alignment_offset(ptr, 4), None);
    }
}
