//! AVX2 packets (256-bit vectors).
//!
//! Compiled only when `build.rs` detects AVX2 on the host of a native x86
//! build. Both packet types need 32-byte alignment for aligned accesses,
//! which matches the crate-wide [`MAX_ALIGN`](crate::MAX_ALIGN).

pub mod f32x8;
pub mod f64x4;

pub use f32x8::F32x8;
pub use f64x4::F64x4;
