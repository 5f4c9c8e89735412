//! Householder reflections and sequences of them.
//!
//! A reflector is `H = I - tau * v * v^*` with `v = [1; essential]`. It is
//! built by [`make_householder`] so that `H x = [beta, 0, ..., 0]^T`, and
//! applied to a block of a matrix by [`apply_householder_on_the_left`] or
//! [`apply_householder_on_the_right`]. Every update is expressed as an
//! assignment of a lazy expression, so the strategy machinery of
//! [`crate::assign`] does the work.
//!
//! [`HouseholderSequence`] represents `H = H_0 * H_1 * ... * H_{n-1}`, the
//! form in which QR-style decompositions return their orthogonal factor,
//! without forming it.

use log::trace;
use num::{Float, One, Zero};

use crate::assign::{self, AssignConfig};
use crate::error::{ensure_same_shape, validation_error, Result};
use crate::expr::{Expr, ExprExt, ExprMut, ExprMutExt};
use crate::flags::{Cost, Flags, Shape};
use crate::scalar::Scalar;
use crate::storage::Matrix;

/// Coefficient `index` of a row or column vector.
#[inline]
fn vector_at<E: Expr>(v: &E, index: usize) -> E::Scalar {
    if v.rows() == 1 {
        v.coeff(0, index)
    } else {
        v.coeff(index, 0)
    }
}

/// An elementary reflector `I - tau * [1; essential] * [1; essential]^*`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reflector<T: Scalar> {
    /// Column vector of length `n - 1`.
    pub essential: Matrix<T>,
    pub tau: T,
    /// First coefficient of `H x`.
    pub beta: T::Real,
}

/// Builds the reflector that maps the vector `x` onto a multiple of the
/// first unit vector.
///
/// When the tail of `x` is already zero (and its head is real), the
/// reflector degenerates to the identity: `tau = 0`, `beta = x[0]`.
///
/// # Panics
///
/// Panics unless `x` is a non-empty row or column vector.
pub fn make_householder<X: Expr>(x: &X) -> Result<Reflector<X::Scalar>> {
    assert!(
        (x.rows() == 1 || x.cols() == 1) && x.size() > 0,
        "a reflector needs a non-empty vector, got {}x{}",
        x.rows(),
        x.cols()
    );
    let n = x.size();
    let head = vector_at(x, 0);
    let mut tail_squared_norm = <<X::Scalar as Scalar>::Real as Zero>::zero();
    for i in 1..n {
        tail_squared_norm = tail_squared_norm + vector_at(x, i).abs2();
    }

    let mut essential = Matrix::<X::Scalar>::try_zeros(n - 1, 1)?;
    let tolerance = <<X::Scalar as Scalar>::Real as Float>::min_positive_value();
    let imag = head.imag();
    if tail_squared_norm <= tolerance && imag * imag <= tolerance {
        return Ok(Reflector {
            essential,
            tau: <X::Scalar as Zero>::zero(),
            beta: head.real(),
        });
    }

    let mut beta = (head.abs2() + tail_squared_norm).sqrt();
    if head.real() >= <<X::Scalar as Scalar>::Real as Zero>::zero() {
        beta = -beta;
    }
    let beta_scalar = X::Scalar::from_real(beta);
    let denominator = head - beta_scalar;
    for i in 1..n {
        essential[(i - 1, 0)] = vector_at(x, i) / denominator;
    }
    let tau = ((beta_scalar - head) / beta_scalar).conj();
    Ok(Reflector {
        essential,
        tau,
        beta,
    })
}

/// `dst = H * dst` for `H = I - tau * [1; essential] * [1; essential]^*`.
///
/// `essential` must be a column vector with `dst.rows() - 1` entries. A
/// row workspace of `dst.cols()` elements is allocated per call.
pub fn apply_householder_on_the_left<D, E>(
    dst: &mut D,
    essential: &E,
    tau: D::Scalar,
) -> Result<()>
where
    D: ExprMut,
    E: Expr<Scalar = D::Scalar>,
{
    let (rows, cols) = (dst.rows(), dst.cols());
    trace!("reflecting a {rows}x{cols} block from the left");
    if rows == 1 {
        dst.scale_assign(<D::Scalar as One>::one() - tau);
        return Ok(());
    }
    if tau == <D::Scalar as Zero>::zero() || rows == 0 {
        return Ok(());
    }
    ensure_same_shape(
        "householder essential vector",
        (rows - 1, 1),
        (essential.rows(), essential.cols()),
    )?;

    // workspace = essential^* * dst[1.., ..] + dst[0, ..]
    let mut workspace = Matrix::<D::Scalar>::try_zeros(1, cols)?;
    let sequential = AssignConfig::sequential();
    let bottom = (&*dst).block(1, 0, rows - 1, cols);
    assign::assign_with(&sequential, &mut workspace, essential.adjoint().lazy_product(bottom))?;
    assign::add_assign(&mut workspace, (&*dst).row(0))?;

    assign::sub_assign(&mut dst.row_mut(0), (&workspace).scale(tau))?;
    assign::sub_assign(
        &mut dst.block_mut(1, 0, rows - 1, cols),
        essential.lazy_product(&workspace).scale(tau),
    )
}

/// `dst = dst * H` for `H = I - tau * [1; essential] * [1; essential]^*`.
///
/// `essential` must be a column vector with `dst.cols() - 1` entries. A
/// column workspace of `dst.rows()` elements is allocated per call.
pub fn apply_householder_on_the_right<D, E>(
    dst: &mut D,
    essential: &E,
    tau: D::Scalar,
) -> Result<()>
where
    D: ExprMut,
    E: Expr<Scalar = D::Scalar>,
{
    let (rows, cols) = (dst.rows(), dst.cols());
    trace!("reflecting a {rows}x{cols} block from the right");
    if cols == 1 {
        dst.scale_assign(<D::Scalar as One>::one() - tau);
        return Ok(());
    }
    if tau == <D::Scalar as Zero>::zero() || cols == 0 {
        return Ok(());
    }
    ensure_same_shape(
        "householder essential vector",
        (cols - 1, 1),
        (essential.rows(), essential.cols()),
    )?;

    // workspace = dst[.., 1..] * essential + dst[.., 0]
    let mut workspace = Matrix::<D::Scalar>::try_zeros(rows, 1)?;
    let sequential = AssignConfig::sequential();
    let right = (&*dst).block(0, 1, rows, cols - 1);
    assign::assign_with(&sequential, &mut workspace, right.lazy_product(essential))?;
    assign::add_assign(&mut workspace, (&*dst).col(0))?;

    assign::sub_assign(&mut dst.col_mut(0), (&workspace).scale(tau))?;
    assign::sub_assign(
        &mut dst.block_mut(0, 1, rows, cols - 1),
        (&workspace).lazy_product(essential.adjoint()).scale(tau),
    )
}

/// Which dimension of the vectors storage holds the reflectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Reflector `k` is stored below row `k + shift` of column `k`.
    Left,
    /// Reflector `k` is stored right of column `k + shift` of row `k`.
    Right,
}

/// Essential part of one reflector, read in place from the vectors
/// storage of a [`HouseholderSequence`], as a column vector.
#[derive(Debug, Clone, Copy)]
pub struct EssentialVector<'a, V> {
    vectors: &'a V,
    index: usize,
    start: usize,
    len: usize,
    side: Side,
    conjugate: bool,
}

impl<V: Expr> Expr for EssentialVector<'_, V> {
    type Scalar = V::Scalar;

    const SHAPE: Shape = Shape::DYNAMIC;
    const FLAGS: Flags = Flags::empty();
    const COST: Cost = V::COST;

    fn rows(&self) -> usize {
        self.len
    }

    fn cols(&self) -> usize {
        1
    }

    #[inline]
    fn coeff(&self, row: usize, _col: usize) -> V::Scalar {
        debug_assert!(row < self.len);
        let value = match self.side {
            Side::Left => self.vectors.coeff(self.start + row, self.index),
            Side::Right => self.vectors.coeff(self.index, self.start + row),
        };
        if self.conjugate {
            value.conj()
        } else {
            value
        }
    }
}

/// The product `H_0 * H_1 * ... * H_{length-1}` of reflectors stored in
/// the strictly lower (or upper, for [`Side::Right`]) part of `vectors`
/// with coefficients `coeffs`.
///
/// `transpose`, `conjugate`, `adjoint` and `inverse` only flip flags; the
/// reflectors are read lazily whenever the sequence is applied or
/// evaluated.
#[derive(Debug, Clone, Copy)]
pub struct HouseholderSequence<V, C> {
    vectors: V,
    coeffs: C,
    side: Side,
    transposed: bool,
    conjugated: bool,
    length: usize,
    shift: usize,
}

impl<V, C> HouseholderSequence<V, C>
where
    V: Expr,
    C: Expr<Scalar = V::Scalar>,
{
    /// Reflectors stored column by column, applied from the left.
    pub fn new(vectors: V, coeffs: C) -> Self {
        Self::with_side(vectors, coeffs, Side::Left)
    }

    /// Reflectors stored row by row.
    pub fn on_the_right(vectors: V, coeffs: C) -> Self {
        Self::with_side(vectors, coeffs, Side::Right)
    }

    fn with_side(vectors: V, coeffs: C, side: Side) -> Self {
        let length = vectors.rows().min(vectors.cols());
        HouseholderSequence {
            vectors,
            coeffs,
            side,
            transposed: false,
            conjugated: false,
            length,
            shift: 0,
        }
    }

    /// Uses only the first `length` reflectors.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Offsets every reflector by `shift` rows (or columns), as in the
    /// tridiagonal form where the first one starts below the subdiagonal.
    pub fn with_shift(mut self, shift: usize) -> Self {
        self.shift = shift;
        self
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn shift(&self) -> usize {
        self.shift
    }

    pub fn is_transposed(&self) -> bool {
        self.transposed
    }

    /// Order of the (square) matrix the sequence represents.
    pub fn size(&self) -> usize {
        match self.side {
            Side::Left => self.vectors.rows(),
            Side::Right => self.vectors.cols(),
        }
    }

    pub fn transpose(mut self) -> Self {
        self.transposed = !self.transposed;
        self
    }

    pub fn conjugate(mut self) -> Self {
        self.conjugated = !self.conjugated;
        self
    }

    pub fn adjoint(self) -> Self {
        self.conjugate().transpose()
    }

    /// Reflectors are unitary, so this is the adjoint.
    pub fn inverse(self) -> Self {
        self.adjoint()
    }

    /// `tau` of factor `k` as currently viewed.
    pub fn coeff(&self, k: usize) -> V::Scalar {
        let tau = vector_at(&self.coeffs, k);
        if self.conjugated {
            tau.conj()
        } else {
            tau
        }
    }

    /// Essential part of factor `k` as currently viewed.
    ///
    /// Factor `k` of the (possibly transposed or conjugated) sequence is
    /// `I - coeff(k) * u * u^*` with `u = [1; essential_vector(k)]`.
    ///
    /// # Panics
    ///
    /// Panics if `k >= length()`.
    #[track_caller]
    pub fn essential_vector(&self, k: usize) -> EssentialVector<'_, V> {
        assert!(
            k < self.length,
            "reflector {k} out of range for a sequence of length {}",
            self.length
        );
        let start = k + 1 + self.shift;
        EssentialVector {
            vectors: &self.vectors,
            index: k,
            start,
            len: self.size().saturating_sub(start),
            side: self.side,
            // conj(H)^T keeps v; conj(H) and H^T both conjugate it
            conjugate: self.conjugated != self.transposed,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.length + self.shift > self.size() {
            return Err(validation_error(format!(
                "{} reflectors shifted by {} do not fit a sequence of order {}",
                self.length,
                self.shift,
                self.size()
            )));
        }
        if self.coeffs.size() < self.length {
            return Err(validation_error(format!(
                "{} reflectors need as many coefficients, got {}",
                self.length,
                self.coeffs.size()
            )));
        }
        Ok(())
    }

    /// Writes the dense matrix of the sequence into `dst`, resizing it.
    pub fn eval_to<D>(&self, dst: &mut D) -> Result<()>
    where
        D: ExprMut<Scalar = V::Scalar>,
    {
        self.validate()?;
        let n = self.size();
        dst.resize(n, n)?;
        dst.set_identity();
        for k in (0..self.length).rev() {
            let corner = n - k - self.shift;
            let mut block = dst.block_mut(n - corner, n - corner, corner, corner);
            let essential = self.essential_vector(k);
            if self.transposed {
                apply_householder_on_the_right(&mut block, &essential, self.coeff(k))?;
            } else {
                apply_householder_on_the_left(&mut block, &essential, self.coeff(k))?;
            }
        }
        Ok(())
    }

    pub fn eval(&self) -> Result<Matrix<V::Scalar>> {
        let n = self.size();
        let mut out = Matrix::<V::Scalar>::try_zeros(n, n)?;
        self.eval_to(&mut out)?;
        Ok(out)
    }

    /// `dst = self * dst`.
    pub fn apply_on_the_left<D>(&self, dst: &mut D) -> Result<()>
    where
        D: ExprMut<Scalar = V::Scalar>,
    {
        self.validate()?;
        let n = self.size();
        ensure_same_shape(
            "householder sequence on the left",
            (n, dst.cols()),
            (dst.rows(), dst.cols()),
        )?;
        let cols = dst.cols();
        for step in 0..self.length {
            let k = if self.transposed { step } else { self.length - step - 1 };
            let start = self.shift + k;
            let mut bottom = dst.block_mut(start, 0, n - start, cols);
            apply_householder_on_the_left(&mut bottom, &self.essential_vector(k), self.coeff(k))?;
        }
        Ok(())
    }

    /// `dst = dst * self`.
    pub fn apply_on_the_right<D>(&self, dst: &mut D) -> Result<()>
    where
        D: ExprMut<Scalar = V::Scalar>,
    {
        self.validate()?;
        let n = self.size();
        ensure_same_shape(
            "householder sequence on the right",
            (dst.rows(), n),
            (dst.rows(), dst.cols()),
        )?;
        let rows = dst.rows();
        for step in 0..self.length {
            let k = if self.transposed { self.length - step - 1 } else { step };
            let start = self.shift + k;
            let mut right = dst.block_mut(0, start, rows, n - start);
            apply_householder_on_the_right(&mut right, &self.essential_vector(k), self.coeff(k))?;
        }
        Ok(())
    }
}

impl<'v, M, C> HouseholderSequence<&'v M, C>
where
    M: ExprMut,
    C: Expr<Scalar = M::Scalar>,
{
    /// Overwrites the square storage `vectors`, which holds the reflectors
    /// of a left sequence below its diagonal, with the dense matrix of that
    /// sequence. The result equals [`HouseholderSequence::eval`] on the
    /// original storage.
    ///
    /// Each reflector is copied out of its column right before the column
    /// is cleared, so the only extra memory is one vector at a time.
    pub fn eval_in_place(vectors: &mut M, coeffs: &C, shift: usize) -> Result<()> {
        let n = vectors.rows();
        ensure_same_shape(
            "in-place householder reconstruction",
            (n, n),
            (vectors.rows(), vectors.cols()),
        )?;
        let length = coeffs.size();
        if length + shift > n {
            return Err(validation_error(format!(
                "{length} reflectors shifted by {shift} do not fit a {n}x{n} matrix"
            )));
        }

        let (zero, one) = (<M::Scalar as Zero>::zero(), <M::Scalar as One>::one());
        for col in 0..n {
            for row in 0..n {
                if row == col {
                    *vectors.coeff_ref(row, col) = one;
                } else if row < col || col >= length {
                    *vectors.coeff_ref(row, col) = zero;
                }
            }
        }

        for k in (0..length).rev() {
            let start = k + 1 + shift;
            let mut essential = Matrix::<M::Scalar>::try_zeros(n - start, 1)?;
            assign::try_assign(&mut essential, (&*vectors).block(start, k, n - start, 1))?;
            vectors.block_mut(k + 1, k, n - k - 1, 1).set_zero();

            let corner = n - k - shift;
            let mut block = vectors.block_mut(k + shift, k + shift, corner, corner);
            apply_householder_on_the_left(&mut block, &essential, vector_at(coeffs, k))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RowMajor;
    use approx::assert_relative_eq;
    use num::Complex;

    #[test]
    fn reflector_annihilates_the_tail() {
        let x = Matrix::<f64>::column(&[3.0, 4.0, 0.0]);
        let h = make_householder(&x).unwrap();
        assert_relative_eq!(h.beta, -5.0);
        let mut y = x.clone();
        apply_householder_on_the_left(&mut y, &h.essential, h.tau).unwrap();
        assert_relative_eq!(y[(0, 0)], -5.0, epsilon = 1e-12);
        assert_relative_eq!(y[(1, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(y[(2, 0)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_vector_gives_identity_reflector() {
        let x = Matrix::<f64>::column(&[-2.0, 0.0]);
        let h = make_householder(&x).unwrap();
        assert_eq!(h.tau, 0.0);
        assert_eq!(h.beta, -2.0);
        assert_eq!(h.essential.to_vec(), vec![0.0]);
    }

    #[test]
    fn complex_reflector_is_unitary() {
        let x = Matrix::<Complex<f64>>::column(&[
            Complex::new(1.0, 1.0),
            Complex::new(0.0, 2.0),
            Complex::new(-1.0, 0.5),
        ]);
        let h = make_householder(&x).unwrap();
        let mut y = x.clone();
        apply_householder_on_the_left(&mut y, &h.essential, h.tau).unwrap();
        assert_relative_eq!(y[(0, 0)].re, h.beta, epsilon = 1e-12);
        assert_relative_eq!(y[(0, 0)].im, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y[(1, 0)].norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(y[(2, 0)].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn right_application_matches_transposed_left() {
        let a = Matrix::<f64>::from_fn(3, 4, |r, c| (r * 4 + c) as f64 - 5.0);
        let v = Matrix::<f64>::column(&[0.5, -1.0, 2.0]);
        let mut right = a.clone();
        apply_householder_on_the_right(&mut right, &v, 0.3).unwrap();
        let mut left = (&a).transpose().eval();
        apply_householder_on_the_left(&mut left, &v, 0.3).unwrap();
        assert!(right.is_approx(&(&left).transpose(), 1e-12));
    }

    #[test]
    fn sequence_flags_and_essential_vectors() {
        let v = Matrix::<f64, RowMajor>::from_fn(4, 4, |r, c| (r * 4 + c) as f64);
        let tau = Matrix::<f64>::column(&[1.0, 2.0, 3.0]);
        let h = HouseholderSequence::new(&v, &tau).with_length(2).with_shift(1);
        assert_eq!((h.size(), h.length(), h.shift()), (4, 2, 1));
        assert_eq!(h.side(), Side::Left);
        assert_eq!(h.essential_vector(0).to_vec(), vec![8.0, 12.0]);
        assert!(h.transpose().is_transposed());
        assert!(!h.inverse().inverse().is_transposed());

        let r = HouseholderSequence::on_the_right(&v, &tau);
        assert_eq!(r.essential_vector(1).to_vec(), vec![6.0, 7.0]);
    }
}
