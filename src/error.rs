//! Error types for simdexpr operations.
//!
//! Recoverable failures (allocation, layout, resizing a destination to an
//! incompatible shape) are reported through [`ExprError`]. Caller bugs such
//! as out-of-bounds indices or invoking an access mode a node does not
//! advertise are precondition violations and panic at the call site.

use std::fmt;

/// Errors that can occur while building or evaluating expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// Memory allocation failed.
    AllocationError {
        /// The size that was requested to be allocated.
        requested_size: usize,
        /// The alignment that was requested.
        requested_alignment: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Invalid layout parameters were provided.
    LayoutError {
        /// The size parameter that caused the error.
        size: usize,
        /// The alignment parameter that caused the error.
        alignment: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Two operands (or a destination and its source) disagree on shape.
    ShapeMismatch {
        /// Shape required by the operation, as (rows, cols).
        expected: (usize, usize),
        /// Shape actually supplied, as (rows, cols).
        found: (usize, usize),
        /// Operation that detected the mismatch.
        context: &'static str,
    },
    /// Input validation error.
    ValidationError {
        /// Human-readable error message.
        message: String,
    },
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::AllocationError {
                requested_size,
                requested_alignment,
                message,
            } => write!(
                f,
                "Memory allocation failed: {} (requested {} bytes with {} byte alignment)",
                message, requested_size, requested_alignment
            ),
            ExprError::LayoutError {
                size,
                alignment,
                message,
            } => write!(
                f,
                "Invalid memory layout: {} (size: {}, alignment: {})",
                message, size, alignment
            ),
            ExprError::ShapeMismatch {
                expected,
                found,
                context,
            } => write!(
                f,
                "Shape mismatch in {}: expected {}x{}, found {}x{}",
                context, expected.0, expected.1, found.0, found.1
            ),
            ExprError::ValidationError { message } => {
                write!(f, "Validation error: {}", message)
            }
        }
    }
}

impl std::error::Error for ExprError {}

/// Result type alias for simdexpr operations.
pub type Result<T> = std::result::Result<T, ExprError>;

/// Creates an allocation error.
pub fn allocation_error(size: usize, alignment: usize, message: impl Into<String>) -> ExprError {
    ExprError::AllocationError {
        requested_size: size,
        requested_alignment: alignment,
        message: message.into(),
    }
}

/// Creates a layout error.
pub fn layout_error(size: usize, alignment: usize, message: impl Into<String>) -> ExprError {
    ExprError::LayoutError {
        size,
        alignment,
        message: message.into(),
    }
}

/// Creates a shape mismatch error.
pub fn shape_mismatch(
    context: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> ExprError {
    ExprError::ShapeMismatch {
        expected,
        found,
        context,
    }
}

/// Creates a validation error.
pub fn validation_error(message: impl Into<String>) -> ExprError {
    ExprError::ValidationError {
        message: message.into(),
    }
}

/// Returns `Ok(())` when both shapes agree, a [`ExprError::ShapeMismatch`] otherwise.
pub fn ensure_same_shape(
    context: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(shape_mismatch(context, expected, found))
    }
}
