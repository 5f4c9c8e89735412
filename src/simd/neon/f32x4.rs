//! NEON 4-lane f32 packet.

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

use std::ops::{Add, Mul, Neg, Sub};

use crate::simd::{Align, Packet};

pub const LANE_COUNT: usize = 4;

/// NEON register holding 4 packed f32 values.
#[derive(Copy, Clone, Debug)]
pub struct F32x4 {
    pub elements: float32x4_t,
}

impl F32x4 {
    #[inline(always)]
    fn to_array(self) -> [f32; LANE_COUNT] {
        let mut out = [0.0f32; LANE_COUNT];
        unsafe { vst1q_f32(out.as_mut_ptr(), self.elements) };
        out
    }
}

impl Packet for F32x4 {
    type Scalar = f32;
    const LANES: usize = LANE_COUNT;

    // NEON loads have no separate aligned form.
    #[inline(always)]
    unsafe fn load(ptr: *const f32, align: Align) -> Self {
        debug_assert!(align == Align::Unaligned || Self::is_aligned(ptr));
        F32x4 {
            elements: vld1q_f32(ptr),
        }
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut f32, align: Align) {
        debug_assert!(align == Align::Unaligned || Self::is_aligned(ptr));
        vst1q_f32(ptr, self.elements)
    }

    #[inline(always)]
    fn splat(value: f32) -> Self {
        F32x4 {
            elements: unsafe { vdupq_n_f32(value) },
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
        F32x4 {
            elements: unsafe { vabsq_f32(self.elements) },
        }
    }

    #[inline(always)]
    fn reverse(self) -> Self {
        F32x4 {
            elements: unsafe {
                let swapped = vrev64q_f32(self.elements);
                vextq_f32::<2>(swapped, swapped)
            },
        }
    }
}

impl Add for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        F32x4 {
            elements: unsafe { vaddq_f32(self.elements, rhs.elements) },
        }
    }
}

impl Sub for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        F32x4 {
            elements: unsafe { vsubq_f32(self.elements, rhs.elements) },
        }
    }
}

impl Mul for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        F32x4 {
            elements: unsafe { vmulq_f32(self.elements, rhs.elements) },
        }
    }
}

impl Neg for F32x4 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        F32x4 {
            elements: unsafe { vnegq_f32(self.elements) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_and_lanes() {
        let p = F32x4::from_fn(|i| i as f32);
        let r = p.reverse();
        for i in 0..LANE_COUNT {
            assert_eq!(r.lane(i), (LANE_COUNT - 1 - i) as f32);
        }
    }
}
