//! Matrix products: the lazy coefficient node and the cache-blocked
//! evaluate-before-assign kernels.

use log::debug;
use num::Zero;

use crate::assign::AssignConfig;
use crate::error::{shape_mismatch, Result};
use crate::expr::{Block, Expr, ExprMut, ExprMutExt};
use crate::flags::{Cost, Dim, Flags, Shape};
use crate::parallel::{self, SharedMut, MAX_GRID_WORKERS};
use crate::scalar::Scalar;
use crate::simd::{Align, Packet};
use crate::storage::{ColMajor, Matrix, MatrixViewMut, RowMajor, Strided};
use crate::PRODUCT_BLOCK_DEPTH;

/// The lhs column count must equal the rhs row count. On mismatch the error
/// carries both operand shapes.
fn check_product_shapes<L: Expr, R: Expr>(lhs: &L, rhs: &R) -> Result<()> {
    if lhs.cols() == rhs.rows() {
        Ok(())
    } else {
        Err(shape_mismatch(
            "product inner dimension",
            (lhs.rows(), lhs.cols()),
            (rhs.rows(), rhs.cols()),
        ))
    }
}

/// `lhs * rhs`, one coefficient at a time.
///
/// Each coefficient is the dot product of a lhs row and a rhs column,
/// accumulated in increasing `k`. Assigning a lazy product re-reads both
/// operands once per destination cell; [`evaluate`] is the better choice
/// for anything but small fixed sizes.
#[derive(Debug, Clone, Copy)]
pub struct Product<L, R> {
    lhs: L,
    rhs: R,
}

impl<L, R> Product<L, R>
where
    L: Expr,
    R: Expr<Scalar = L::Scalar>,
{
    /// # Panics
    ///
    /// Panics if `lhs.cols() != rhs.rows()`.
    #[track_caller]
    pub fn new(lhs: L, rhs: R) -> Self {
        match Self::try_new(lhs, rhs) {
            Ok(product) => product,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_new(lhs: L, rhs: R) -> Result<Self> {
        check_product_shapes(&lhs, &rhs)?;
        Ok(Product { lhs, rhs })
    }

    pub fn lhs(&self) -> &L {
        &self.lhs
    }

    pub fn rhs(&self) -> &R {
        &self.rhs
    }

    /// Statically known depth of the sum, if any.
    const DEPTH: Dim = L::SHAPE.cols.merge(R::SHAPE.rows);
}

impl<L, R> Expr for Product<L, R>
where
    L: Expr,
    R: Expr<Scalar = L::Scalar>,
{
    type Scalar = L::Scalar;

    const SHAPE: Shape = Shape {
        rows: L::SHAPE.rows,
        cols: R::SHAPE.cols,
        max_rows: L::SHAPE.max_rows,
        max_cols: R::SHAPE.max_cols,
    };
    const FLAGS: Flags = Flags::ROW_MAJOR.and(L::FLAGS).and(R::FLAGS);
    const COST: Cost = L::COST
        .plus(R::COST)
        .add(<L::Scalar as Scalar>::MUL_COST + <L::Scalar as Scalar>::ADD_COST)
        .repeated(Self::DEPTH);

    #[inline(always)]
    fn rows(&self) -> usize {
        self.lhs.rows()
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.rhs.cols()
    }

    #[inline]
    fn coeff(&self, row: usize, col: usize) -> L::Scalar {
        // constant bound for fixed depths, so the chain unrolls
        let depth = Self::DEPTH.or(self.lhs.cols());
        if depth == 0 {
            return <L::Scalar as Zero>::zero();
        }
        let mut acc = self.lhs.coeff(row, 0) * self.rhs.coeff(0, col);
        for k in 1..depth {
            acc = acc + self.lhs.coeff(row, k) * self.rhs.coeff(k, col);
        }
        acc
    }
}

/// Whether [`accumulate_product`] can stream packets down the columns of
/// `lhs` and `dst`.
const fn uses_packet_kernel<D: Expr, L: Expr>() -> bool {
    !D::FLAGS.is_row_major()
        && D::FLAGS.has(Flags::DIRECT_ACCESS.or(Flags::PACKET_ACCESS))
        && !L::FLAGS.is_row_major()
        && L::FLAGS.has(Flags::PACKET_ACCESS)
}

/// `dst += lhs * rhs` with the depth consumed [`PRODUCT_BLOCK_DEPTH`] lhs
/// columns at a time.
///
/// For each depth block and destination column, the block's rhs
/// coefficients are loaded once and every destination cell accumulates
/// `acc = acc + l(i, k) * r(k, j)` in increasing `k`, so a zero-initialized
/// destination receives exactly the lazy [`Product`] coefficients.
pub fn accumulate_product<D, L, R>(dst: &mut D, lhs: &L, rhs: &R)
where
    D: ExprMut,
    L: Expr<Scalar = D::Scalar>,
    R: Expr<Scalar = D::Scalar>,
{
    let (rows, cols, depth) = (lhs.rows(), rhs.cols(), lhs.cols());
    debug_assert_eq!((dst.rows(), dst.cols()), (rows, cols));

    let lanes = <<D::Scalar as Scalar>::Packet as Packet>::LANES;
    let vector_end = if uses_packet_kernel::<D, L>() {
        rows - rows % lanes
    } else {
        0
    };

    let mut b = [<D::Scalar as Zero>::zero(); PRODUCT_BLOCK_DEPTH];
    for k0 in (0..depth).step_by(PRODUCT_BLOCK_DEPTH) {
        let kb = PRODUCT_BLOCK_DEPTH.min(depth - k0);
        for j in 0..cols {
            for (kk, slot) in b[..kb].iter_mut().enumerate() {
                *slot = rhs.coeff(k0 + kk, j);
            }

            for i in (0..vector_end).step_by(lanes) {
                let mut acc = dst.packet(i, j, Align::Unaligned);
                for (kk, &bk) in b[..kb].iter().enumerate() {
                    acc = lhs
                        .packet(i, k0 + kk, Align::Unaligned)
                        .mul_add(Packet::splat(bk), acc);
                }
                dst.write_packet(i, j, Align::Unaligned, acc);
            }

            for i in vector_end..rows {
                let mut acc = dst.coeff(i, j);
                for (kk, &bk) in b[..kb].iter().enumerate() {
                    acc = acc + lhs.coeff(i, k0 + kk) * bk;
                }
                *dst.coeff_ref(i, j) = acc;
            }
        }
    }
}

/// `dst = lhs * rhs` through [`accumulate_product`].
///
/// # Errors
///
/// [`ShapeMismatch`](crate::ExprError::ShapeMismatch) when the inner
/// dimensions differ or `dst` cannot take the result's shape.
pub fn eval_product_into<D, L, R>(dst: &mut D, lhs: &L, rhs: &R) -> Result<()>
where
    D: ExprMut,
    L: Expr<Scalar = D::Scalar>,
    R: Expr<Scalar = D::Scalar>,
{
    check_product_shapes(lhs, rhs)?;
    dst.resize(lhs.rows(), rhs.cols())?;
    dst.set_zero();
    accumulate_product(dst, lhs, rhs);
    Ok(())
}

/// Like [`eval_product_into`], with the destination cut into a grid of
/// `workers` blocks (at most 16) evaluated concurrently.
///
/// Each block multiplies a horizontal slice of `lhs` by a vertical slice of
/// `rhs`, so per-cell summation order is the same as the sequential path.
/// Destinations without direct access are evaluated sequentially.
pub fn par_eval_product_into<D, L, R>(dst: &mut D, lhs: &L, rhs: &R, workers: usize) -> Result<()>
where
    D: ExprMut,
    L: Expr<Scalar = D::Scalar>,
    R: Expr<Scalar = D::Scalar>,
{
    check_product_shapes(lhs, rhs)?;
    dst.resize(lhs.rows(), rhs.cols())?;
    dst.set_zero();
    accumulate_in_blocks(dst, lhs, rhs, workers);
    Ok(())
}

fn accumulate_in_blocks<D, L, R>(dst: &mut D, lhs: &L, rhs: &R, workers: usize)
where
    D: ExprMut,
    L: Expr<Scalar = D::Scalar>,
    R: Expr<Scalar = D::Scalar>,
{
    let workers = workers.clamp(1, MAX_GRID_WORKERS);
    if !D::FLAGS.has(Flags::DIRECT_ACCESS) || workers == 1 {
        accumulate_product(dst, lhs, rhs);
        return;
    }

    let (rows, cols, depth) = (lhs.rows(), rhs.cols(), lhs.cols());
    debug!("product {rows}x{depth} * {depth}x{cols} split over {workers} workers");

    let stride = dst.outer_stride();
    let base = SharedMut::new(dst.data_ptr_mut());
    parallel::run_2d(rows, cols, workers, true, |cell| {
        let (r0, nr) = (cell.axis1.start, cell.axis1.len);
        let (c0, nc) = (cell.axis2.start, cell.axis2.len);
        let lhs_rows = Block::new(lhs, r0, 0, nr, depth);
        let rhs_cols = Block::new(rhs, 0, c0, depth, nc);

        // SAFETY: grid cells are disjoint and lie inside the destination,
        // whose exclusive borrow outlives the parallel section.
        if D::FLAGS.is_row_major() {
            let mut view = unsafe {
                MatrixViewMut::<D::Scalar, RowMajor, Strided>::from_raw_parts(
                    base.get().add(r0 * stride + c0),
                    nr,
                    nc,
                    stride,
                )
            };
            accumulate_product(&mut view, &lhs_rows, &rhs_cols);
        } else {
            let mut view = unsafe {
                MatrixViewMut::<D::Scalar, ColMajor, Strided>::from_raw_parts(
                    base.get().add(c0 * stride + r0),
                    nr,
                    nc,
                    stride,
                )
            };
            accumulate_product(&mut view, &lhs_rows, &rhs_cols);
        }
    });
}

/// `lhs * rhs` evaluated into a new column-major matrix with the default
/// [`AssignConfig`].
pub fn evaluate<L, R>(lhs: &L, rhs: &R) -> Result<Matrix<L::Scalar>>
where
    L: Expr,
    R: Expr<Scalar = L::Scalar>,
{
    evaluate_with(&AssignConfig::default(), lhs, rhs)
}

/// `lhs * rhs` evaluated into a new matrix; the blocked kernel is split
/// across workers once `rows * cols * depth` reaches the configured
/// threshold.
///
/// # Errors
///
/// Shape mismatch between the operands, or allocation failure of the result.
pub fn evaluate_with<L, R>(config: &AssignConfig, lhs: &L, rhs: &R) -> Result<Matrix<L::Scalar>>
where
    L: Expr,
    R: Expr<Scalar = L::Scalar>,
{
    check_product_shapes(lhs, rhs)?;
    let (rows, cols, depth) = (lhs.rows(), rhs.cols(), lhs.cols());
    let mut out = Matrix::try_zeros(rows, cols)?;

    let work = rows.saturating_mul(cols).saturating_mul(depth);
    if config.parallel && config.max_workers > 1 && work >= config.parallel_threshold {
        accumulate_in_blocks(&mut out, lhs, rhs, config.max_workers);
    } else {
        accumulate_product(&mut out, lhs, rhs);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprExt;
    use crate::storage::SMatrix;

    fn scenario() -> (Matrix<f64>, Matrix<f64>) {
        (
            Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]),
            Matrix::from_rows(&[[7.0, 8.0], [9.0, 10.0], [11.0, 12.0]]),
        )
    }

    #[test]
    fn lazy_product_coefficients() {
        let (a, b) = scenario();
        let p = (&a).lazy_product(&b);
        assert_eq!(p.to_vec(), vec![58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn product_descriptor() {
        type P<'a> = Product<&'a SMatrix<f32, 2, 3>, &'a SMatrix<f32, 3, 4>>;
        assert_eq!(P::SHAPE, Shape::fixed(2, 4));
        assert_eq!(P::COST, Cost::Fixed(3 * (1 + 1 + 1 + 1)));
        assert!(P::FLAGS.is_empty());
        type D<'a> = Product<&'a Matrix<f32>, &'a Matrix<f32>>;
        assert_eq!(D::COST, Cost::Dynamic);
        type RR<'a> = Product<&'a Matrix<f32, RowMajor>, &'a Matrix<f32, RowMajor>>;
        assert!(RR::FLAGS.is_row_major());
    }

    #[test]
    fn empty_depth_gives_zeros() {
        let a = Matrix::<f64>::zeros(2, 0);
        let b = Matrix::<f64>::zeros(0, 3);
        assert_eq!((&a).lazy_product(&b).coeff(1, 2), 0.0);
        assert_eq!(evaluate(&a, &b).unwrap(), Matrix::zeros(2, 3));
    }

    #[test]
    fn blocked_matches_lazy() {
        let a = Matrix::<f64>::random(11, 9);
        let b = Matrix::<f64>::random(9, 5);
        let blocked = evaluate(&a, &b).unwrap();
        let lazy = (&a).lazy_product(&b).eval();
        assert_eq!(blocked, lazy);

        let mut row_major = Matrix::<f64, RowMajor>::zeros(1, 1);
        eval_product_into(&mut row_major, &a, &b).unwrap();
        assert_eq!(row_major.to_vec(), lazy.to_vec());
    }

    #[test]
    fn parallel_blocks_match_sequential() {
        let a = Matrix::<f32>::random(37, 13);
        let b = Matrix::<f32>::random(13, 29);
        let mut par = Matrix::<f32>::zeros(37, 29);
        par_eval_product_into(&mut par, &a, &b, 6).unwrap();
        assert_eq!(par, evaluate(&a, &b).unwrap());

        let mut par_rm = Matrix::<f32, RowMajor>::zeros(37, 29);
        par_eval_product_into(&mut par_rm, &a, &b, 4).unwrap();
        assert_eq!(par_rm.to_vec(), par.to_vec());
    }

    #[test]
    fn mismatched_depth_is_an_error() {
        let (a, _) = scenario();
        assert!(evaluate(&a, &a).is_err());
        assert!((&a).try_lazy_product(&a).is_err());
    }
}
