//! Array-backed packets used where no native SIMD type is selected, and
//! for complex scalars on every platform.

use std::ops::{Add, Mul, Neg, Sub};
use std::ptr;

use crate::scalar::Scalar;
use crate::simd::{Align, Packet};

/// `N` scalars handled as one packet.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct Lanes<T, const N: usize>(pub [T; N]);

impl<T: Scalar, const N: usize> Lanes<T, N> {
    #[inline(always)]
    fn map(self, f: impl Fn(T) -> T) -> Self {
        Lanes(self.0.map(f))
    }

    #[inline(always)]
    fn zip(self, rhs: Self, f: impl Fn(T, T) -> T) -> Self {
        let mut out = self.0;
        for (o, r) in out.iter_mut().zip(rhs.0) {
            *o = f(*o, r);
        }
        Lanes(out)
    }
}

impl<T: Scalar, const N: usize> Add for Lanes<T, N> {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a + b)
    }
}

impl<T: Scalar, const N: usize> Sub for Lanes<T, N> {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a - b)
    }
}

impl<T: Scalar, const N: usize> Mul for Lanes<T, N> {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a * b)
    }
}

impl<T: Scalar, const N: usize> Neg for Lanes<T, N> {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        self.map(|a| -a)
    }
}

impl<T: Scalar, const N: usize> Packet for Lanes<T, N> {
    type Scalar = T;
    const LANES: usize = N;

    #[inline(always)]
    unsafe fn load(ptr: *const T, align: Align) -> Self {
        debug_assert!(align == Align::Unaligned || Self::is_aligned(ptr));
        Lanes(ptr::read_unaligned(ptr as *const [T; N]))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut T, align: Align) {
        debug_assert!(align == Align::Unaligned || Self::is_aligned(ptr));
        ptr::write_unaligned(ptr as *mut [T; N], self.0);
    }

    #[inline(always)]
    fn splat(value: T) -> Self {
        Lanes([value; N])
    }

    #[inline(always)]
    fn from_fn<F: FnMut(usize) -> T>(f: F) -> Self {
        Lanes(std::array::from_fn(f))
    }

    #[inline(always)]
    fn lane(self, index: usize) -> T {
        self.0[index]
    }

    #[inline(always)]
    fn conj(self) -> Self {
        self.map(T::conj)
    }

    #[inline(always)]
    fn abs(self) -> Self {
        self.map(|a| T::from_real(Scalar::abs(a)))
    }

    #[inline(always)]
    fn reverse(self) -> Self {
        let mut out = self.0;
        out.reverse();
        Lanes(out)
    }
}
