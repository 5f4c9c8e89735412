//! NEON 2-lane f64 packet.

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

use std::ops::{Add, Mul, Neg, Sub};

use crate::simd::{Align, Packet};

pub const LANE_COUNT: usize = 2;

/// NEON register holding 2 packed f64 values.
#[derive(Copy, Clone, Debug)]
pub struct F64x2 {
    pub elements: float64x2_t,
}

impl F64x2 {
    #[inline(always)]
    fn to_array(self) -> [f64; LANE_COUNT] {
        let mut out = [0.0f64; LANE_COUNT];
        unsafe { vst1q_f64(out.as_mut_ptr(), self.elements) };
        out
    }
}

impl Packet for F64x2 {
    type Scalar = f64;
    const LANES: usize = LANE_COUNT;

    // NEON loads have no separate aligned form.
    #[inline(always)]
    unsafe fn load(ptr: *const f64, align: Align) -> Self {
        debug_assert!(align == Align::Unaligned || Self::is_aligned(ptr));
        F64x2 {
            elements: vld1q_f64(ptr),
        }
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut f64, align: Align) {
        debug_assert!(align == Align::Unaligned || Self::is_aligned(ptr));
        vst1q_f64(ptr, self.elements)
    }

    #[inline(always)]
    fn splat(value: f64) -> Self {
        F64x2 {
            elements: unsafe { vdupq_n_f64(value) },
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
        F64x2 {
            elements: unsafe { vabsq_f64(self.elements) },
        }
    }

    #[inline(always)]
    fn reverse(self) -> Self {
        F64x2 {
            elements: unsafe { vextq_f64::<1>(self.elements, self.elements) },
        }
    }
}

impl Add for F64x2 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        F64x2 {
            elements: unsafe { vaddq_f64(self.elements, rhs.elements) },
        }
    }
}

impl Sub for F64x2 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        F64x2 {
            elements: unsafe { vsubq_f64(self.elements, rhs.elements) },
        }
    }
}

impl Mul for F64x2 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        F64x2 {
            elements: unsafe { vmulq_f64(self.elements, rhs.elements) },
        }
    }
}

impl Neg for F64x2 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        F64x2 {
            elements: unsafe { vnegq_f64(self.elements) },
        }
    }
}
