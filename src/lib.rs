//! Lazy dense matrix expressions with a SIMD-aware assignment engine.
//!
//! Expressions ([`expr`]) are plain values composed from storage leaves
//! ([`storage`]); nothing is computed until one is assigned to a writable
//! destination. Assignment ([`assign`]) classifies the destination/source
//! pair from their static descriptors, picks a traversal and an unrolling
//! level, and runs the matching executor, optionally split across Rayon
//! workers ([`parallel`]).
//!
//! ```
//! use simdexpr::prelude::*;
//!
//! let a = Matrix::<f32>::from_fn(4, 4, |r, c| (r * 4 + c) as f32);
//! let mut b = Matrix::<f32>::zeros(4, 4);
//! b.assign_from((&a).transpose().plus(&a).scale(0.5));
//! assert_eq!(b[(1, 2)], (6.0 + 9.0) * 0.5);
//! ```

pub mod assign;
pub mod error;
pub mod expr;
pub mod flags;
pub mod householder;
pub mod parallel;
pub mod scalar;
pub mod simd;
pub mod storage;
pub mod utils;

pub use error::{ExprError, Result};

/// Operation budget for unrolling, per packet when vectorized.
pub const UNROLLING_LIMIT: usize = 16;

/// Left-operand columns consumed per pass of the blocked product.
pub const PRODUCT_BLOCK_DEPTH: usize = 4;

/// Destination size, in elements, from which assignments are split across
/// workers.
pub const PARALLEL_THRESHOLD: usize = 1 << 16;

/// Byte alignment of heap and fixed-size storage.
pub const MAX_ALIGN: usize = 32;

pub mod prelude {
    pub use crate::assign::{AssignConfig, Strategy, Traversal, Unrolling};
    pub use crate::expr::{Expr, ExprExt, ExprMut, ExprMutExt};
    pub use crate::householder::{make_householder, HouseholderSequence};
    pub use crate::scalar::{RealScalar, Scalar};
    pub use crate::storage::{ColMajor, Matrix, MatrixView, MatrixViewMut, RowMajor, SMatrix};
    pub use crate::ExprError;
}
