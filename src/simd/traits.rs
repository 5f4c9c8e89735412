use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};

/// Alignment promise attached to a packet load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Align {
    /// The address is a multiple of [`Packet::ALIGNMENT`].
    Aligned,
    /// No alignment is known.
    Unaligned,
}

impl Align {
    #[inline(always)]
    pub const fn from_bool(aligned: bool) -> Align {
        if aligned {
            Align::Aligned
        } else {
            Align::Unaligned
        }
    }
}

/// A fixed-width group of scalars processed by one SIMD instruction.
///
/// Every packet type is `LANES * size_of::<Scalar>()` bytes wide and its
/// aligned loads and stores require that many bytes of alignment; the
/// alignment probe in [`crate::utils::first_aligned`] relies on it.
pub trait Packet:
    Copy
    + Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
    type Scalar: Copy;

    /// Number of scalars in one packet.
    const LANES: usize;

    /// Byte alignment required by [`Align::Aligned`] accesses.
    const ALIGNMENT: usize = Self::LANES * std::mem::size_of::<Self::Scalar>();

    #[inline(always)]
    fn is_aligned(ptr: *const Self::Scalar) -> bool {
        (ptr as usize) % Self::ALIGNMENT == 0
    }

    /// Loads `LANES` consecutive scalars starting at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reading `LANES` scalars, and aligned to
    /// [`Self::ALIGNMENT`] when `align` is [`Align::Aligned`].
    unsafe fn load(ptr: *const Self::Scalar, align: Align) -> Self;

    /// Stores all lanes to `LANES` consecutive scalars starting at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writing `LANES` scalars, and aligned to
    /// [`Self::ALIGNMENT`] when `align` is [`Align::Aligned`].
    unsafe fn store(self, ptr: *mut Self::Scalar, align: Align);

    fn splat(value: Self::Scalar) -> Self;

    /// Builds a packet lane by lane; used by nodes without contiguous memory.
    fn from_fn<F: FnMut(usize) -> Self::Scalar>(f: F) -> Self;

    fn lane(self, index: usize) -> Self::Scalar;

    /// Lane-wise complex conjugate; the identity for real scalars.
    fn conj(self) -> Self;

    /// Lane-wise absolute value (modulus for complex lanes).
    fn abs(self) -> Self;

    /// Reverses the order of the lanes.
    fn reverse(self) -> Self;

    /// `self * b + c`, rounded as two separate operations so that packet
    /// accumulation matches scalar accumulation exactly.
    #[inline(always)]
    fn mul_add(self, b: Self, c: Self) -> Self {
        self * b + c
    }
}
