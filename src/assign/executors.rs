//! One executor per (traversal, unrolling) pair.
//!
//! Unrolled executors take their trip counts from the static shape of the
//! destination and expand them through [`unroll`] into straight-line
//! sequences of coefficient or packet operations.

use log::trace;

use super::kernel::{copy_coeff, copy_coeff_linear, copy_packet, copy_packet_linear, AssignOp};
use super::strategy::{Strategy, Traversal, Unrolling};
use crate::expr::{position, Expr, ExprMut, PacketOf};
use crate::flags::Flags;
use crate::simd::{Align, Packet};
use crate::utils::{alignment_offset, first_aligned};
use crate::UNROLLING_LIMIT;

/// Runs `strategy` over every position of `dst`.
///
/// The caller guarantees matching shapes and an applicable strategy.
pub(crate) fn run<D, S, Op>(dst: &mut D, src: &S, op: Op, strategy: Strategy)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    debug_assert_eq!((dst.rows(), dst.cols()), (src.rows(), src.cols()));
    trace!(
        "running {strategy} on a {}x{} destination",
        dst.rows(),
        dst.cols()
    );

    match (strategy.traversal, strategy.unrolling) {
        (Traversal::Default, Unrolling::None) => default_traversal(dst, src, op),
        (Traversal::Default, Unrolling::Inner) => default_inner_unrolled(dst, src, op),
        (Traversal::Default, Unrolling::Complete) => default_complete_unrolled(dst, src, op),
        (Traversal::Linear, Unrolling::None) => linear_traversal(dst, src, op),
        (Traversal::Linear, Unrolling::Complete) => linear_complete_unrolled(dst, src, op),
        (Traversal::InnerVectorized, Unrolling::None) => inner_vectorized(dst, src, op),
        (Traversal::InnerVectorized, Unrolling::Inner) => {
            inner_vectorized_inner_unrolled(dst, src, op)
        }
        (Traversal::InnerVectorized, Unrolling::Complete) => {
            inner_vectorized_complete_unrolled(dst, src, op)
        }
        (Traversal::LinearVectorized, Unrolling::None) => linear_vectorized(dst, src, op),
        (Traversal::LinearVectorized, Unrolling::Complete) => {
            linear_vectorized_complete_unrolled(dst, src, op)
        }
        (Traversal::SliceVectorized, Unrolling::None) => slice_vectorized(dst, src, op),
        (traversal, unrolling) => {
            panic!("capability mismatch: no executor for {traversal}/{unrolling}")
        }
    }
}

#[inline(always)]
fn lanes<D: Expr>() -> usize {
    <PacketOf<D> as Packet>::LANES
}

#[inline(always)]
fn static_align<E: Expr>() -> Align {
    Align::from_bool(E::FLAGS.has(Flags::ALIGNED))
}

/// Static inner extent of `D` if known, else `runtime`.
#[inline(always)]
fn static_inner<D: Expr>(runtime: usize) -> usize {
    D::SHAPE.inner(D::FLAGS.is_row_major()).or(runtime)
}

#[inline(always)]
fn static_outer<D: Expr>(runtime: usize) -> usize {
    D::SHAPE.inner(!D::FLAGS.is_row_major()).or(runtime)
}

// The arms of `unroll` are written out up to this limit.
const _: () = assert!(UNROLLING_LIMIT == 16);

macro_rules! unrolled_calls {
    ($f:ident; $($i:literal)*) => {{ $( $f($i); )* }};
}

/// Calls `f(0)` up to `f(count - 1)` as a straight-line sequence.
///
/// `count` is a static extent in the unrolled executors, so only one arm
/// survives monomorphization. Counts above [`UNROLLING_LIMIT`] (dynamic
/// shapes reaching an unrolled executor) fall back to a loop.
#[inline(always)]
fn unroll<F: FnMut(usize)>(count: usize, mut f: F) {
    match count {
        0 => {}
        1 => unrolled_calls!(f; 0),
        2 => unrolled_calls!(f; 0 1),
        3 => unrolled_calls!(f; 0 1 2),
        4 => unrolled_calls!(f; 0 1 2 3),
        5 => unrolled_calls!(f; 0 1 2 3 4),
        6 => unrolled_calls!(f; 0 1 2 3 4 5),
        7 => unrolled_calls!(f; 0 1 2 3 4 5 6),
        8 => unrolled_calls!(f; 0 1 2 3 4 5 6 7),
        9 => unrolled_calls!(f; 0 1 2 3 4 5 6 7 8),
        10 => unrolled_calls!(f; 0 1 2 3 4 5 6 7 8 9),
        11 => unrolled_calls!(f; 0 1 2 3 4 5 6 7 8 9 10),
        12 => unrolled_calls!(f; 0 1 2 3 4 5 6 7 8 9 10 11),
        13 => unrolled_calls!(f; 0 1 2 3 4 5 6 7 8 9 10 11 12),
        14 => unrolled_calls!(f; 0 1 2 3 4 5 6 7 8 9 10 11 12 13),
        15 => unrolled_calls!(f; 0 1 2 3 4 5 6 7 8 9 10 11 12 13 14),
        16 => unrolled_calls!(f; 0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15),
        _ => (0..count).for_each(f),
    }
}

#[inline(always)]
fn nested_coeffs<D, S, Op>(dst: &mut D, src: &S, op: Op, outer_size: usize, inner_size: usize)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    for outer in 0..outer_size {
        for inner in 0..inner_size {
            let (row, col) = position::<D>(outer, inner);
            copy_coeff(dst, src, op, row, col);
        }
    }
}

fn default_traversal<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let (outer, inner) = (dst.outer_size(), dst.inner_size());
    nested_coeffs(dst, src, op, outer, inner);
}

fn default_inner_unrolled<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let outer = dst.outer_size();
    let inner = static_inner::<D>(dst.inner_size());
    for o in 0..outer {
        unroll(inner, |i| {
            let (row, col) = position::<D>(o, i);
            copy_coeff(dst, src, op, row, col);
        });
    }
}

fn default_complete_unrolled<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let outer = static_outer::<D>(dst.outer_size());
    let inner = static_inner::<D>(dst.inner_size());
    unroll(outer, |o| {
        unroll(inner, |i| {
            let (row, col) = position::<D>(o, i);
            copy_coeff(dst, src, op, row, col);
        })
    });
}

#[inline(always)]
fn linear_coeffs<D, S, Op>(dst: &mut D, src: &S, op: Op, range: std::ops::Range<usize>)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    for index in range {
        copy_coeff_linear(dst, src, op, index);
    }
}

fn linear_traversal<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let size = dst.size();
    linear_coeffs(dst, src, op, 0..size);
}

fn linear_complete_unrolled<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let size = D::SHAPE.size().or(dst.size());
    unroll(size, |index| copy_coeff_linear(dst, src, op, index));
}

/// Packets along every inner slice. Positions are multiples of the packet
/// width from the start of the slice, so a side that is statically aligned
/// is aligned at every one of them.
#[inline(always)]
fn nested_packets<D, S, Op>(dst: &mut D, src: &S, op: Op, outer_size: usize, inner_size: usize)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let step = lanes::<D>();
    let (dst_align, src_align) = (static_align::<D>(), static_align::<S>());
    for outer in 0..outer_size {
        for inner in (0..inner_size).step_by(step) {
            copy_packet(dst, src, op, position::<D>(outer, inner), dst_align, src_align);
        }
    }
}

fn inner_vectorized<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let (outer, inner) = (dst.outer_size(), dst.inner_size());
    nested_packets(dst, src, op, outer, inner);
}

fn inner_vectorized_inner_unrolled<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let step = lanes::<D>();
    let (dst_align, src_align) = (static_align::<D>(), static_align::<S>());
    let outer = dst.outer_size();
    let packets = static_inner::<D>(dst.inner_size()) / step;
    for o in 0..outer {
        unroll(packets, |k| {
            copy_packet(dst, src, op, position::<D>(o, k * step), dst_align, src_align)
        });
    }
}

fn inner_vectorized_complete_unrolled<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let step = lanes::<D>();
    let (dst_align, src_align) = (static_align::<D>(), static_align::<S>());
    let outer = static_outer::<D>(dst.outer_size());
    let packets = static_inner::<D>(dst.inner_size()) / step;
    unroll(outer, |o| {
        unroll(packets, |k| {
            copy_packet(dst, src, op, position::<D>(o, k * step), dst_align, src_align)
        })
    });
}

/// Scalar prefix `[0, start)`, packets over `[start, end)`, scalar tail.
#[inline(always)]
fn linear_packets<D, S, Op>(dst: &mut D, src: &S, op: Op, size: usize, start: usize)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let step = lanes::<D>();
    let end = start + (size - start) / step * step;
    // The source shares the destination's packet boundaries only when both
    // start aligned and the prefix is empty.
    let src_align = Align::from_bool(S::FLAGS.has(Flags::ALIGNED) && start == 0);

    linear_coeffs(dst, src, op, 0..start);
    for index in (start..end).step_by(step) {
        copy_packet_linear(dst, src, op, index, Align::Aligned, src_align);
    }
    linear_coeffs(dst, src, op, end..size);
}

fn linear_vectorized<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let size = dst.size();
    let start = if D::FLAGS.has(Flags::ALIGNED) {
        0
    } else {
        first_aligned(dst.data_ptr(), lanes::<D>(), size)
    };
    linear_packets(dst, src, op, size, start);
}

fn linear_vectorized_complete_unrolled<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let step = lanes::<D>();
    let size = D::SHAPE.size().or(dst.size());
    let end = size / step * step;
    let src_align = static_align::<S>();
    unroll(size / step, |k| {
        copy_packet_linear(dst, src, op, k * step, Align::Aligned, src_align)
    });
    unroll(size - end, |j| copy_coeff_linear(dst, src, op, end + j));
}

/// Per outer slice: scalars up to the first aligned destination address,
/// aligned packets, then the scalar remainder. The aligned offset of each
/// slice follows from the previous one and the outer stride.
fn slice_vectorized<D, S, Op>(dst: &mut D, src: &S, op: Op)
where
    D: ExprMut,
    S: Expr<Scalar = D::Scalar>,
    Op: AssignOp<D::Scalar>,
{
    let step = lanes::<D>();
    let mask = step - 1;
    let (outer_size, inner_size) = (dst.outer_size(), dst.inner_size());
    if outer_size == 0 || inner_size == 0 {
        return;
    }

    let Some(mut offset) = alignment_offset(dst.data_ptr(), step) else {
        // Not even element-aligned: no packet boundary is reachable.
        nested_coeffs(dst, src, op, outer_size, inner_size);
        return;
    };
    let aligned_step = (step - dst.outer_stride() % step) & mask;

    for outer in 0..outer_size {
        let start = offset.min(inner_size);
        let end = start + (inner_size - start) / step * step;

        for inner in 0..start {
            let (row, col) = position::<D>(outer, inner);
            copy_coeff(dst, src, op, row, col);
        }
        for inner in (start..end).step_by(step) {
            copy_packet(
                dst,
                src,
                op,
                position::<D>(outer, inner),
                Align::Aligned,
                Align::Unaligned,
            );
        }
        for inner in end..inner_size {
            let (row, col) = position::<D>(outer, inner);
            copy_coeff(dst, src, op, row, col);
        }

        offset = (offset + aligned_step) & mask;
    }
}

#[cfg(test)]
mod tests {
    use super::super::kernel::{AddTo, Assign};
    use super::super::strategy::ALL_STRATEGIES;
    use super::*;
    use crate::expr::{ExprExt, ExprMutExt};
    use crate::storage::{ColMajor, Matrix, MatrixViewMut, SMatrix};

    fn source(rows: usize, cols: usize) -> Matrix<f32> {
        Matrix::from_fn(rows, cols, |r, c| (r * 100 + c) as f32)
    }

    #[test]
    fn every_applicable_strategy_matches_the_reference() {
        let lanes = <<f32 as crate::scalar::Scalar>::Packet as Packet>::LANES;
        let rows = lanes * 3;
        let src = source(rows, 5);
        let expected = src.to_vec();
        for strategy in ALL_STRATEGIES {
            let mut dst = Matrix::<f32>::zeros(rows, 5);
            if strategy.check_applicable(&dst, &&src).is_err() {
                continue;
            }
            run(&mut dst, &&src, Assign, strategy);
            assert_eq!(dst.to_vec(), expected, "{strategy}");
        }
    }

    #[test]
    fn slice_traversal_covers_misaligned_blocks() {
        let src = source(13, 11);
        for (row, col) in [(0, 0), (1, 0), (3, 2), (5, 4)] {
            let mut dst = Matrix::<f32>::zeros(13, 11);
            let (rows, cols) = (13 - row, 11 - col);
            let mut block = dst.block_mut(row, col, rows, cols);
            let part = (&src).block(row, col, rows, cols);
            slice_vectorized(&mut block, &part, Assign);
            for r in 0..13 {
                for c in 0..11 {
                    let want = if r >= row && c >= col { src[(r, c)] } else { 0.0 };
                    assert_eq!(dst[(r, c)], want, "block at ({row}, {col}), coefficient ({r}, {c})");
                }
            }
        }
    }

    #[test]
    fn linear_vectorized_with_unaligned_start() {
        let src = source(23, 1);
        let mut backing = Matrix::<f32>::zeros(24, 1);
        // Starts one element past an aligned buffer.
        let mut view = MatrixViewMut::<f32, ColMajor>::from_slice_mut(
            &mut backing.as_mut_slice()[1..],
            23,
            1,
        )
        .unwrap();
        linear_vectorized(&mut view, &&src, Assign);
        assert_eq!(view.to_vec(), src.to_vec());
        assert_eq!(backing[(0, 0)], 0.0);
        assert_eq!(backing[(23, 0)], 2200.0);
    }

    #[test]
    fn unroll_visits_each_index_in_order() {
        for count in 0..=UNROLLING_LIMIT + 3 {
            let mut seen = Vec::new();
            unroll(count, |i| seen.push(i));
            assert_eq!(seen, (0..count).collect::<Vec<_>>(), "count {count}");
        }
    }

    #[test]
    fn unrolled_executors_on_fixed_shapes() {
        let src = SMatrix::<f32, 4, 4>::from_fn(|r, c| (r * 4 + c) as f32 - 7.5);
        let plain = Strategy::new(Traversal::Default, Unrolling::None);
        let mut expected = SMatrix::<f32, 4, 4>::zeros();
        run(&mut expected, &&src, Assign, plain);

        let mut ran = 0;
        for strategy in ALL_STRATEGIES {
            if strategy.unrolling == Unrolling::None {
                continue;
            }
            let mut dst = SMatrix::<f32, 4, 4>::zeros();
            if strategy.check_applicable(&dst, &&src).is_err() {
                continue;
            }
            run(&mut dst, &&src, Assign, strategy);
            assert_eq!(dst, expected, "{strategy}");
            ran += 1;
        }
        assert!(ran >= 3, "only {ran} unrolled strategies applied");
    }

    #[test]
    fn compound_operators_read_the_destination() {
        let mut dst = SMatrix::<f64, 4, 4>::from_fn(|r, c| (r + c) as f64);
        let src = SMatrix::<f64, 4, 4>::from_fn(|_, _| 1.0);
        let strategy = Strategy::select::<SMatrix<f64, 4, 4>, &SMatrix<f64, 4, 4>>();
        run(&mut dst, &&src, AddTo, strategy);
        assert_eq!(dst.coeff(3, 2), 6.0);
        assert_eq!(dst.coeff(0, 0), 1.0);
    }
}
