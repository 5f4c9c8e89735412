//! Concrete coefficient storage: heap matrices, fixed-size matrices, and
//! borrowed views.

pub mod fixed;
pub mod interop;
pub mod matrix;
pub mod view;

pub use fixed::SMatrix;
pub use matrix::Matrix;
pub use view::{MatrixView, MatrixViewMut};

use crate::flags::Flags;
use crate::simd::{Align, Packet};

/// Memory layout of a two-dimensional buffer.
pub trait StorageOrder: Copy + Send + Sync + 'static {
    const ROW_MAJOR: bool;

    /// [`Flags::ROW_MAJOR`] or nothing.
    const FLAGS: Flags = Flags::empty().with_if(Flags::ROW_MAJOR, Self::ROW_MAJOR);

    /// Flat index of (`row`, `col`) with `stride` elements between the
    /// starts of consecutive outer slices.
    #[inline(always)]
    fn index(row: usize, col: usize, stride: usize) -> usize {
        if Self::ROW_MAJOR {
            row * stride + col
        } else {
            col * stride + row
        }
    }
}

/// Columns stored one after another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColMajor;

/// Rows stored one after another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowMajor;

impl StorageOrder for ColMajor {
    const ROW_MAJOR: bool = false;
}

impl StorageOrder for RowMajor {
    const ROW_MAJOR: bool = true;
}

/// Whether a view's outer slices follow one another without gaps.
pub trait Stride: Copy + Send + Sync + 'static {
    const CONTIGUOUS: bool;
}

/// Outer stride equals the inner size; flat indexing is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct Contiguous;

/// Arbitrary outer stride.
#[derive(Debug, Clone, Copy, Default)]
pub struct Strided;

impl Stride for Contiguous {
    const CONTIGUOUS: bool = true;
}

impl Stride for Strided {
    const CONTIGUOUS: bool = false;
}

/// Loads `LANES` elements starting at `data[index]`.
///
/// An aligned request on a misaligned address trips a debug assertion and is
/// served unaligned in release builds.
#[inline(always)]
pub(crate) fn load_from<P: Packet>(data: &[P::Scalar], index: usize, align: Align) -> P {
    let lanes = &data[index..index + P::LANES];
    let ptr = lanes.as_ptr();
    // SAFETY: `lanes` holds exactly `P::LANES` initialized elements.
    unsafe { load_at(ptr, align) }
}

/// Stores `packet` into `data[index..index + LANES]`.
#[inline(always)]
pub(crate) fn store_into<P: Packet>(data: &mut [P::Scalar], index: usize, align: Align, packet: P) {
    let lanes = &mut data[index..index + P::LANES];
    let ptr = lanes.as_mut_ptr();
    // SAFETY: as in `load_from`.
    unsafe { store_at(ptr, align, packet) }
}

/// Loads `LANES` elements starting at `ptr`.
///
/// # Safety
///
/// `ptr` must be valid for reading `P::LANES` elements.
#[inline(always)]
pub(crate) unsafe fn load_at<P: Packet>(ptr: *const P::Scalar, align: Align) -> P {
    let align = verified::<P>(ptr, align);
    P::load(ptr, align)
}

/// Stores `packet` at `ptr`.
///
/// # Safety
///
/// `ptr` must be valid for writing `P::LANES` elements.
#[inline(always)]
pub(crate) unsafe fn store_at<P: Packet>(ptr: *mut P::Scalar, align: Align, packet: P) {
    let align = verified::<P>(ptr, align);
    packet.store(ptr, align)
}

#[inline(always)]
fn verified<P: Packet>(ptr: *const P::Scalar, align: Align) -> Align {
    match align {
        Align::Aligned if !P::is_aligned(ptr) => {
            debug_assert!(false, "aligned packet access on a misaligned address");
            Align::Unaligned
        }
        other => other,
    }
}
