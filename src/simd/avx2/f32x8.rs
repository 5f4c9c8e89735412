//! AVX2 8-lane f32 packet.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use std::ops::{Add, Mul, Neg, Sub};

use crate::simd::{Align, Packet};

/// Number of f32 elements that fit in an AVX2 256-bit vector.
pub const LANE_COUNT: usize = 8;

/// AVX2 register holding 8 packed f32 values.
#[derive(Copy, Clone, Debug)]
pub struct F32x8 {
    pub elements: __m256,
}

impl F32x8 {
    #[inline(always)]
    fn to_array(self) -> [f32; LANE_COUNT] {
        let mut out = [0.0f32; LANE_COUNT];
        unsafe { _mm256_storeu_ps(out.as_mut_ptr(), self.elements) };
        out
    }
}

impl Packet for F32x8 {
    type Scalar = f32;
    const LANES: usize = LANE_COUNT;

    #[inline(always)]
    unsafe fn load(ptr: *const f32, align: Align) -> Self {
        let elements = match align {
            Align::Aligned => {
                debug_assert!(Self::is_aligned(ptr));
                _mm256_load_ps(ptr)
            }
            Align::Unaligned => _mm256_loadu_ps(ptr),
        };
        F32x8 { elements }
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut f32, align: Align) {
        match align {
            Align::Aligned => {
                debug_assert!(Self::is_aligned(ptr));
                _mm256_store_ps(ptr, self.elements)
            }
            Align::Unaligned => _mm256_storeu_ps(ptr, self.elements),
        }
    }

    #[inline(always)]
    fn splat(value: f32) -> Self {
        F32x8 {
            elements: unsafe { _mm256_set1_ps(value) },
        }
    }

    #[inline(always)]
    fn from_fn<F: FnMut(usize) -> f32>(f: F) -> Self {
        let lanes: [f32; LANE_COUNT] = std::array::from_fn(f);
        unsafe { Self::load(lanes.as_ptr(), Align::Unaligned) }
    }

    #[inline(always)]
    fn lane(self, index: usize) -> f32 {
        self.to_array()[index]
    }

    #[inline(always)]
    fn conj(self) -> Self {
        self
    }

    #[inline(always)]
    fn abs(self) -> Self {
        F32x8 {
            elements: unsafe { _mm256_andnot_ps(_mm256_set1_ps(-0.0), self.elements) },
        }
    }

    #[inline(always)]
    fn reverse(self) -> Self {
        F32x8 {
            elements: unsafe {
                _mm256_permutevar8x32_ps(self.elements, _mm256_setr_epi32(7, 6, 5, 4, 3, 2, 1, 0))
            },
        }
    }
}

impl Add for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        F32x8 {
            elements: unsafe { _mm256_add_ps(self.elements, rhs.elements) },
        }
    }
}

impl Sub for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        F32x8 {
            elements: unsafe { _mm256_sub_ps(self.elements, rhs.elements) },
        }
    }
}

impl Mul for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        F32x8 {
            elements: unsafe { _mm256_mul_ps(self.elements, rhs.elements) },
        }
    }
}

impl Neg for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        F32x8 {
            elements: unsafe { _mm256_xor_ps(self.elements, _mm256_set1_ps(-0.0)) },
        }
    }
}
