use simdexpr::assign::{self, AssignConfig, Strategy, Traversal, Unrolling, ALL_STRATEGIES};
use simdexpr::expr::Expr;
use simdexpr::prelude::*;
use simdexpr::simd::Packet;
use simdexpr::ExprError;

const F32_LANES: usize = <<f32 as Scalar>::Packet as Packet>::LANES;

fn baseline() -> Strategy {
    Strategy::new(Traversal::Default, Unrolling::None)
}

/// Assigns `src` with every strategy that applies and checks each result
/// against the plain nested loop. Returns how many strategies ran.
fn check_all_strategies<D, S>(make_dst: impl Fn() -> D, src: S) -> usize
where
    D: ExprMut<Scalar = f32>,
    S: Expr<Scalar = f32> + Copy,
{
    let mut expected = make_dst();
    assign::assign_using(baseline(), &mut expected, src).unwrap();
    let expected = expected.to_vec();

    let mut ran = 0;
    for strategy in ALL_STRATEGIES {
        let mut dst = make_dst();
        if strategy.check_applicable(&dst, &src).is_err() {
            continue;
        }
        assign::assign_using(strategy, &mut dst, src).unwrap();
        assert_eq!(dst.to_vec(), expected, "strategy {strategy} diverged");
        ran += 1;
    }
    ran
}

fn sample(rows: usize, cols: usize) -> Matrix<f32> {
    Matrix::from_fn(rows, cols, |r, c| (r as f32) * 1.5 - (c as f32) * 0.25 + 0.125)
}

#[test]
fn test_scenario_three_by_three_copy() {
    let src = Matrix::<f64, RowMajor>::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
    let mut dst = Matrix::<f64>::zeros(3, 3);
    dst.assign_from(&src);
    assert_eq!(dst.to_vec(), src.to_vec());
    assert_eq!(dst[(2, 0)], 7.0);
}

#[test]
fn test_growable_destination_takes_source_shape() {
    for (rows, cols) in [(0, 0), (1, 1), (0, 5), (7, 3), (3, 7)] {
        let mut dst = Matrix::<f32>::zeros(2, 2);
        dst.assign_from(&sample(rows, cols));
        assert_eq!((dst.rows(), dst.cols()), (rows, cols));
    }
}

#[test]
fn test_fixed_destination_shape_mismatch_is_an_error() {
    let mut dst = SMatrix::<f32, 3, 3>::zeros();
    let err = dst.try_assign_from(&sample(3, 4)).unwrap_err();
    assert_eq!(
        err,
        ExprError::ShapeMismatch {
            expected: (3, 3),
            found: (3, 4),
            context: "resize",
        }
    );
}

#[test]
#[should_panic(expected = "Shape mismatch")]
fn test_plain_assign_panics_on_mismatch() {
    let mut dst = SMatrix::<f32, 2, 2>::zeros();
    dst.assign_from(&sample(3, 3));
}

#[test]
fn test_strategies_agree_at_vector_boundaries() {
    let p = F32_LANES;
    for size in [0, 1, p - 1, p, p + 1, 2 * p] {
        let src = sample(size, 3);
        let ran = check_all_strategies(|| Matrix::<f32>::zeros(size, 3), &src);
        assert!(ran >= 3, "only {ran} strategies applied for size {size}");

        let row = sample(1, size);
        check_all_strategies(|| Matrix::<f32>::zeros(1, size), &row);
    }
}

#[test]
fn test_strategies_agree_for_derived_sources() {
    let p = F32_LANES;
    let rows = 2 * p + 1;
    let a = sample(rows, 5);
    let b = sample(rows, 5);

    check_all_strategies(|| Matrix::<f32>::zeros(rows, 5), (&a).plus(&b));
    check_all_strategies(|| Matrix::<f32>::zeros(rows, 5), (&a).scale(3.0).negated());
    check_all_strategies(|| Matrix::<f32>::zeros(rows, 5), (&a).reverse());
    check_all_strategies(|| Matrix::<f32>::zeros(rows, 5), (&a).reverse_rows());
    check_all_strategies(|| Matrix::<f32>::zeros(5, rows), (&a).transpose());
    check_all_strategies(|| Matrix::<f32, RowMajor>::zeros(5, rows), (&a).transpose());
}

#[test]
fn test_strategies_agree_for_strided_destinations() {
    let p = F32_LANES;
    let rows = 3 * p + 2;
    let src = sample(rows - 1, 4);
    let backing = sample(rows, 6);
    for offset in 0..2 {
        let part = (&src).block(0, 0, rows - 1, 4);
        let mut expected = backing.clone();
        assign::assign_using(
            baseline(),
            &mut expected.block_mut(offset, 1, rows - 1, 4),
            part,
        )
        .unwrap();

        let mut dst = backing.clone();
        let slice = Strategy::new(Traversal::SliceVectorized, Unrolling::None);
        assign::assign_using(slice, &mut dst.block_mut(offset, 1, rows - 1, 4), part).unwrap();
        assert_eq!(dst, expected, "offset {offset}");
    }
}

#[test]
fn test_classifier_choices_for_common_pairs() {
    assert_eq!(
        Strategy::select::<SMatrix<f32, 4, 4>, &SMatrix<f32, 4, 4>>().unrolling,
        Unrolling::Complete
    );
    assert_eq!(
        Strategy::select::<Matrix<f32>, &Matrix<f32>>(),
        Strategy::new(Traversal::LinearVectorized, Unrolling::None)
    );
    type Strided<'a> = simdexpr::expr::Block<&'a mut Matrix<f32>>;
    assert_eq!(
        Strategy::select::<Strided<'_>, &Matrix<f32>>().traversal,
        Traversal::SliceVectorized
    );
    let lazy = Strategy::select::<Matrix<f32>, simdexpr::expr::Product<&Matrix<f32>, &Matrix<f32>>>();
    assert_eq!(lazy, Strategy::new(Traversal::Default, Unrolling::None));
}

#[test]
fn test_fixed_size_unrolled_assignments() {
    let a = SMatrix::<f64, 3, 3>::from_fn(|r, c| (r * 3 + c) as f64);
    let mut b = SMatrix::<f64, 3, 3>::zeros();
    b.assign_from((&a).plus(&a));
    assert_eq!(b.coeff(2, 1), 14.0);

    let mut empty = SMatrix::<f64, 0, 3>::zeros();
    empty.assign_from(&SMatrix::<f64, 0, 3>::zeros());
    assert_eq!(empty.size(), 0);

    let mut single = SMatrix::<f64, 1, 1>::zeros();
    single.assign_from(&SMatrix::<f64, 1, 1>::from_fn(|_, _| 4.0));
    assert_eq!(single.coeff(0, 0), 4.0);
}

#[test]
fn test_compound_assignment_operators() {
    let a = sample(9, 7);
    let mut acc = Matrix::<f32>::zeros(9, 7);
    acc.plus_assign(&a);
    acc.plus_assign(&a);
    acc.minus_assign((&a).scale(0.5));
    assert!(acc.is_approx(&(&a).scale(1.5), 1e-6));

    acc.scale_assign(2.0);
    assert!(acc.is_approx(&(&a).scale(3.0), 1e-6));
}

#[test]
fn test_parallel_assign_matches_sequential() {
    let src = sample(301, 257);
    let parallel = AssignConfig::default().with_threshold(1024).with_workers(8);

    let mut split = Matrix::<f32>::zeros(301, 257);
    assign::assign_with(&parallel, &mut split, (&src).reverse()).unwrap();
    let mut whole = Matrix::<f32>::zeros(301, 257);
    assign::assign_with(&AssignConfig::sequential(), &mut whole, (&src).reverse()).unwrap();
    assert_eq!(split, whole);

    let mut transposed = Matrix::<f32, RowMajor>::zeros(257, 301);
    assign::assign_with(&parallel, &mut transposed, (&src).transpose()).unwrap();
    assert_eq!(transposed.to_vec(), (&src).transpose().to_vec());
}

#[test]
fn test_views_over_slices_are_destinations() {
    let mut buffer = vec![0.0f32; 12];
    {
        let mut view = MatrixViewMut::<f32, RowMajor>::from_slice_mut(&mut buffer, 3, 4).unwrap();
        view.assign_from(&sample(3, 4));
    }
    let view = MatrixView::<f32, RowMajor>::from_slice(&buffer, 3, 4).unwrap();
    assert_eq!(view.to_vec(), sample(3, 4).to_vec());
    assert!(MatrixView::<f32, RowMajor>::from_slice(&buffer, 5, 4).is_err());
}
