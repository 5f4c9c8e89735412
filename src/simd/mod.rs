//! Packet abstraction and the per-platform packet types.
//!
//! `build.rs` emits exactly one of `avx2`, `neon`, `sse` or `fallback`.
//! AVX2 and NEON select native register types for `f32`/`f64`; every other
//! configuration, and complex scalars everywhere, use [`portable::Lanes`].

#[cfg(avx2)]
pub mod avx2;

#[cfg(neon)]
pub mod neon;

pub mod portable;
pub mod traits;

pub use traits::{Align, Packet};

use num::Complex;
use portable::Lanes;

#[cfg(avx2)]
pub type F32Packet = avx2::F32x8;
#[cfg(avx2)]
pub type F64Packet = avx2::F64x4;

#[cfg(neon)]
pub type F32Packet = neon::F32x4;
#[cfg(neon)]
pub type F64Packet = neon::F64x2;

#[cfg(not(any(avx2, neon)))]
pub type F32Packet = Lanes<f32, 4>;
#[cfg(not(any(avx2, neon)))]
pub type F64Packet = Lanes<f64, 2>;

pub type Complex32Packet = Lanes<Complex<f32>, 2>;
pub type Complex64Packet = Lanes<Complex<f64>, 2>;
