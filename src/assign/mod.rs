//! Assignment of an expression into a writable destination.
//!
//! Every assignment goes through the same three steps: the destination is
//! resized to the source's shape (or the shapes are checked), the
//! [`Strategy`] for the pair of types is looked up, and the matching
//! executor walks the destination. Large destinations with direct access
//! are first cut along their outer dimension and each part is assigned on
//! its own worker.
//!
//! ```
//! use simdexpr::prelude::*;
//!
//! let a = Matrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
//! let mut out = Matrix::<f64>::zeros(0, 0);
//! simdexpr::assign::assign(&mut out, (&a).plus(&a));
//! assert_eq!(out[(1, 0)], 6.0);
//! ```

mod executors;
pub mod kernel;
pub mod strategy;

use log::{debug, trace};

pub use kernel::{AddTo, Assign, AssignOp, MulTo, SubFrom};
pub use strategy::{
    analyze, AssignTraits, Descriptor, Strategy, Traversal, Unrolling, ALL_STRATEGIES,
};

use crate::error::{ensure_same_shape, Result};
use crate::expr::{Block, Expr, ExprMut};
use crate::flags::Flags;
use crate::parallel::{self, SharedMut};
use crate::storage::{ColMajor, MatrixViewMut, RowMajor, StorageOrder, Stride, Strided};
use crate::PARALLEL_THRESHOLD;

/// Run-time knobs for assignment and evaluated products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignConfig {
    /// Allows splitting large assignments across workers.
    pub parallel: bool,
    /// Minimum destination size, in elements, before splitting.
    pub parallel_threshold: usize,
    /// Upper bound on the number of workers.
    pub max_workers: usize,
}

impl Default for AssignConfig {
    fn default() -> Self {
        AssignConfig {
            parallel: true,
            parallel_threshold: PARALLEL_THRESHOLD,
            max_workers: parallel::available_workers(),
        }
    }
}

impl AssignConfig {
    /// Never splits.
    pub fn sequential() -> Self {
        AssignConfig {
            parallel: false,
            max_workers: 1,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, parallel_threshold: usize) -> Self {
        self.parallel_threshold = parallel_threshold;
        self
    }

    pub fn with_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }
}

/// `dst = src`.
///
/// # Panics
///
/// Panics if the shapes differ and `dst` cannot be resized; see
/// [`try_assign`].
#[track_caller]
pub fn assign<D, S>(dst: &mut D, src: S)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
{
    if let Err(err) = try_assign(dst, src) {
        panic!("{err}");
    }
}

/// `dst = src` with the default [`AssignConfig`].
///
/// # Errors
///
/// [`crate::ExprError::ShapeMismatch`] when `dst` cannot take the source's
/// shape, [`crate::ExprError::AllocationError`] when resizing fails.
pub fn try_assign<D, S>(dst: &mut D, src: S) -> Result<()>
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
{
    assign_with(&AssignConfig::default(), dst, src)
}

pub fn assign_with<D, S>(config: &AssignConfig, dst: &mut D, src: S) -> Result<()>
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
{
    dst.resize(src.rows(), src.cols())?;
    dispatch(config, dst, &src, Assign);
    Ok(())
}

/// `dst = src` with a caller-chosen strategy, on the current thread.
///
/// # Panics
///
/// Panics with "capability mismatch" when `strategy` cannot run on these
/// operands (see [`Strategy::check_applicable`]).
#[track_caller]
pub fn assign_using<D, S>(strategy: Strategy, dst: &mut D, src: S) -> Result<()>
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
{
    dst.resize(src.rows(), src.cols())?;
    if let Err(reason) = strategy.check_applicable(dst, &src) {
        panic!("capability mismatch: {reason}");
    }
    executors::run(dst, &src, Assign, strategy);
    Ok(())
}

/// `dst += src`. The destination is never resized.
pub fn add_assign<D, S>(dst: &mut D, src: S) -> Result<()>
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
{
    compound_assign(dst, src, AddTo)
}

/// `dst -= src`. The destination is never resized.
pub fn sub_assign<D, S>(dst: &mut D, src: S) -> Result<()>
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
{
    compound_assign(dst, src, SubFrom)
}

/// `dst[pos] = op(dst[pos], src[pos])` for every position.
pub fn compound_assign<D, S, Op>(dst: &mut D, src: S, op: Op) -> Result<()>
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    ensure_same_shape(
        "compound assignment",
        (dst.rows(), dst.cols()),
        (src.rows(), src.cols()),
    )?;
    dispatch(&AssignConfig::default(), dst, &src, op);
    Ok(())
}

/// Shape-checked by the caller.
pub(crate) fn run_compound<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    dispatch(&AssignConfig::default(), dst, src, op);
}

fn should_split<D: ExprMut>(config: &AssignConfig, dst: &D) -> bool {
    config.parallel
        && config.max_workers > 1
        && D::FLAGS.has(Flags::DIRECT_ACCESS)
        && dst.size() >= config.parallel_threshold
        && dst.outer_size() > 1
}

fn dispatch<D, S, Op>(config: &AssignConfig, dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    if should_split(config, dst) {
        parallel_assign(config, dst, src, op);
        return;
    }
    let strategy = Strategy::select::<D, S>();
    trace!(
        "assigning {}x{} with {strategy}",
        dst.rows(),
        dst.cols()
    );
    executors::run(dst, src, op, strategy);
}

/// Splits the outer dimension of `dst` into one contiguous range per
/// worker. Each worker gets a strided view over its own outer slices and
/// the matching block of `src`; the pair is classified again since the
/// parts have lost the whole's static shape and alignment.
fn parallel_assign<D, S, Op>(config: &AssignConfig, dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let (rows, cols) = (dst.rows(), dst.cols());
    let outer = dst.outer_size();
    let stride = dst.outer_stride();
    let workers = config.max_workers.min(outer);
    debug!("assigning {rows}x{cols} over {workers} workers along the outer dimension");

    let base = SharedMut::new(dst.data_ptr_mut());
    parallel::run_1d(outer, workers, true, |range| {
        // SAFETY: `base` points at coefficient (0, 0) of a destination with
        // unit inner stride and `stride` between outer slices; the ranges
        // are disjoint and `dst` stays mutably borrowed until the join.
        let start = unsafe { base.get().add(range.start * stride) };
        if D::FLAGS.is_row_major() {
            let mut part = unsafe {
                MatrixViewMut::<D::Scalar, RowMajor, Strided>::from_raw_parts(
                    start, range.len, cols, stride,
                )
            };
            assign_part(&mut part, &Block::new(src, range.start, 0, range.len, cols), op);
        } else {
            let mut part = unsafe {
                MatrixViewMut::<D::Scalar, ColMajor, Strided>::from_raw_parts(
                    start, rows, range.len, stride,
                )
            };
            assign_part(&mut part, &Block::new(src, 0, range.start, rows, range.len), op);
        }
    });
}

fn assign_part<O, St, S, Op>(
    part: &mut MatrixViewMut<'_, S::Scalar, O, St>,
    src: &Block<&S>,
    op: Op,
) where
    O: StorageOrder,
    St: Stride,
    S: Expr,
    Op: AssignOp<S::Scalar>,
{
    let strategy = Strategy::select::<MatrixViewMut<'_, S::Scalar, O, St>, Block<&S>>();
    trace!(
        "assigning a {}x{} part with {strategy}",
        part.rows(),
        part.cols()
    );
    executors::run(part, src, op, strategy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExprExt, ExprMutExt};
    use crate::storage::{Matrix, SMatrix};
    use crate::ExprError;

    #[test]
    fn assign_resizes_growable_destinations() {
        let src = Matrix::<f64>::from_fn(3, 4, |r, c| (r * 4 + c) as f64);
        let mut dst = Matrix::<f64>::zeros(1, 1);
        assign(&mut dst, &src);
        assert_eq!(dst, src);
    }

    #[test]
    fn fixed_destinations_reject_other_shapes() {
        let mut dst = SMatrix::<f64, 2, 2>::zeros();
        let src = Matrix::<f64>::zeros(3, 2);
        assert!(matches!(
            try_assign(&mut dst, &src),
            Err(ExprError::ShapeMismatch { context: "resize", .. })
        ));
    }

    #[test]
    fn compound_assignment_checks_shapes_without_resizing() {
        let mut dst = Matrix::<f32>::zeros(2, 2);
        let src = Matrix::<f32>::zeros(2, 3);
        assert!(add_assign(&mut dst, &src).is_err());
        assert_eq!(dst.shape(), (2, 2));

        let ones = Matrix::<f32>::from_fn(2, 2, |_, _| 1.0);
        add_assign(&mut dst, &ones).unwrap();
        add_assign(&mut dst, &ones).unwrap();
        sub_assign(&mut dst, &ones).unwrap();
        assert_eq!(dst.to_vec(), vec![1.0; 4]);
    }

    #[test]
    fn parallel_split_matches_sequential() {
        let src = Matrix::<f64>::from_fn(37, 29, |r, c| (r as f64) * 0.5 - c as f64);
        let config = AssignConfig::default().with_threshold(1).with_workers(4);
        let mut dst = Matrix::<f64>::zeros(37, 29);
        assign_with(&config, &mut dst, (&src).scale(2.0)).unwrap();
        let mut expected = Matrix::<f64>::zeros(37, 29);
        assign_with(&AssignConfig::sequential(), &mut expected, (&src).scale(2.0)).unwrap();
        assert_eq!(dst, expected);

        let mut row_major = Matrix::<f64, crate::storage::RowMajor>::zeros(37, 29);
        assign_with(&config, &mut row_major, &src).unwrap();
        assert_eq!(row_major.to_vec(), src.to_vec());
    }

    #[test]
    #[should_panic(expected = "capability mismatch")]
    fn forced_strategy_must_apply() {
        let mut dst = Matrix::<f32>::zeros(2, 2);
        let src = Matrix::<f32>::zeros(2, 2);
        let lazy = (&src).lazy_product(&src);
        let _ = assign_using(
            Strategy::new(Traversal::LinearVectorized, Unrolling::None),
            &mut dst,
            lazy,
        );
    }

    #[test]
    fn scale_assign_multiplies_in_place() {
        let mut m = Matrix::<f64>::from_fn(3, 3, |r, c| (r + c) as f64);
        m.scale_assign(2.0);
        assert_eq!(m[(2, 2)], 8.0);
    }
}
