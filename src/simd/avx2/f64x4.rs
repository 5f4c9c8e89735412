//! AVX2 4-lane f64 packet.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use std::ops::{Add, Mul, Neg, Sub};

use crate::simd::{Align, Packet};

/// Number of f64 elements that fit in an AVX2 256-bit vector.
pub const LANE_COUNT: usize = 4;

/// AVX2 register holding 4 packed f64 values.
#[derive(Copy, Clone, Debug)]
pub struct F64x4 {
    pub elements: __m256d,
}

impl F64x4 {
    #[inline(always)]
    fn to_array(self) -> [f64; LANE_COUNT] {
        let mut out = [0.0f64; LANE_COUNT];
        unsafe { _mm256_storeu_pd(out.as_mut_ptr(), self.elements) };
        out
    }
}

impl Packet for F64x4 {
    type Scalar = f64;
    const LANES: usize = LANE_COUNT;

    #[inline(always)]
    unsafe fn load(ptr: *const f64, align: Align) -> Self {
        let elements = match align {
            Align::Aligned => {
                debug_assert!(Self::is_aligned(ptr));
                _mm256_load_pd(ptr)
            }
            Align::Unaligned => _mm256_loadu_pd(ptr),
        };
        F64x4 { elements }
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut f64, align: Align) {
        match align {
            Align::Aligned => {
                debug_assert!(Self::is_aligned(ptr));
                _mm256_store_pd(ptr, self.elements)
            }
            Align::Unaligned => _mm256_storeu_pd(ptr, self.elements),
        }
    }

    #[inline(always)]
    fn splat(value: f64) -> Self {
        F64x4 {
            elements: unsafe { _mm256_set1_pd(value) },
        }
    }

    #[inline(always)]
    fn from_fn<F: FnMut(usize) -> f64>(f: F) -> Self {
        let lanes: [f64; LANE_COUNT] = std::array::from_fn(f);
        unsafe { Self::load(lanes.as_ptr(), Align::Unaligned) }
    }

    #[inline(always)]
    fn lane(self, index: usize) -> f64 {
        self.to_array()[index]
    }

    #[inline(always)]
    fn conj(self) -> Self {
        self
    }

    #[inline(always)]
    fn abs(self) -> Self {
        F64x4 {
            elements: unsafe { _mm256_andnot_pd(_mm256_set1_pd(-0.0), self.elements) },
        }
    }

    #[inline(always)]
    fn reverse(self) -> Self {
        F64x4 {
            elements: unsafe { _mm256_permute4x64_pd::<0x1B>(self.elements) },
        }
    }
}

impl Add for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        F64x4 {
            elements: unsafe { _mm256_add_pd(self.elements, rhs.elements) },
        }
    }
}

impl Sub for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        F64x4 {
            elements: unsafe { _mm256_sub_pd(self.elements, rhs.elements) },
        }
    }
}

impl Mul for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        F64x4 {
            elements: unsafe { _mm256_mul_pd(self.elements, rhs.elements) },
        }
    }
}

impl Neg for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        F64x4 {
            elements: unsafe { _mm256_xor_pd(self.elements, _mm256_set1_pd(-0.0)) },
        }
    }
}
