//! NEON packets (128-bit vectors) for aarch64 builds.

pub mod f32x4;
pub mod f64x2;

pub use f32x4::F32x4;
pub use f64x2::F64x2;
