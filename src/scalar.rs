//! Element types the engine evaluates over.
//!
//! The engine never names a concrete numeric type: every node reads and
//! combines coefficients through [`Scalar`], and vectorized paths go through
//! the scalar's associated [`Packet`].

use std::fmt::{Debug, Display};
use std::ops::{Add, Div, Mul, Neg, Sub};

use num::{Complex, Float, One, Zero};
use rand::Rng;

use crate::simd::{Complex32Packet, Complex64Packet, F32Packet, F64Packet, Packet};

/// A matrix coefficient type.
pub trait Scalar:
    Copy
    + Debug
    + Display
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Zero
    + One
{
    /// The real type underlying this scalar (itself for real types).
    type Real: RealScalar;

    /// Native packet type for this scalar on the current platform.
    type Packet: Packet<Scalar = Self>;

    const IS_REAL: bool;

    /// Whether conjugation has a vectorized packet form.
    const PACKET_CONJ: bool;

    /// Relative cost of one addition, in units of a coefficient read.
    const ADD_COST: usize;

    /// Relative cost of one multiplication.
    const MUL_COST: usize;

    fn conj(self) -> Self;
    fn real(self) -> Self::Real;
    fn imag(self) -> Self::Real;

    /// Absolute value (modulus for complex scalars).
    fn abs(self) -> Self::Real;

    /// Squared absolute value.
    fn abs2(self) -> Self::Real;

    fn from_real(re: Self::Real) -> Self;

    /// Lossy conversion from `f64`, used by tests and benches to build inputs.
    fn from_f64(value: f64) -> Self;

    /// Default relative precision for approximate comparisons.
    fn dummy_precision() -> Self::Real;

    /// `|self - other| <= prec * min(|self|, |other|)`.
    #[inline]
    fn is_approx(self, other: Self, prec: Self::Real) -> bool {
        let smaller = Float::min(Scalar::abs(self), Scalar::abs(other));
        Scalar::abs(self - other) <= smaller * prec
    }

    /// `|self| <= |other| * prec`.
    #[inline]
    fn is_much_smaller_than(self, other: Self::Real, prec: Self::Real) -> bool {
        Scalar::abs(self) <= Float::abs(other) * prec
    }

    /// Draws a value uniformly from `[-1, 1)` (both parts for complex scalars).
    fn sample<R: Rng>(rng: &mut R) -> Self;
}

/// A real [`Scalar`] with the usual floating-point operations.
pub trait RealScalar: Scalar<Real = Self> + Float {}

macro_rules! impl_real_scalar {
    ($t:ty, $packet:ty, $precision:expr) => {
        impl Scalar for $t {
            type Real = $t;
            type Packet = $packet;

            const IS_REAL: bool = true;
            const PACKET_CONJ: bool = true;
            const ADD_COST: usize = 1;
            const MUL_COST: usize = 1;

            #[inline(always)]
            fn conj(self) -> Self {
                self
            }

            #[inline(always)]
            fn real(self) -> Self {
                self
            }

            #[inline(always)]
            fn imag(self) -> Self {
                0.0
            }

            #[inline(always)]
            fn abs(self) -> Self {
                <$t>::abs(self)
            }

            #[inline(always)]
            fn abs2(self) -> Self {
                self * self
            }

            #[inline(always)]
            fn from_real(re: Self) -> Self {
                re
            }

            #[inline(always)]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            #[inline(always)]
            fn dummy_precision() -> Self {
                $precision
            }

            #[inline]
            fn sample<R: Rng>(rng: &mut R) -> Self {
                rng.random_range(-1.0..1.0)
            }
        }

        impl RealScalar for $t {}
    };
}

impl_real_scalar!(f32, F32Packet, 1e-5);
impl_real_scalar!(f64, F64Packet, 1e-12);

macro_rules! impl_complex_scalar {
    ($t:ty, $packet:ty) => {
        impl Scalar for Complex<$t> {
            type Real = $t;
            type Packet = $packet;

            const IS_REAL: bool = false;
            const PACKET_CONJ: bool = false;
            const ADD_COST: usize = 2;
            const MUL_COST: usize = 6;

            #[inline(always)]
            fn conj(self) -> Self {
                Complex::new(self.re, -self.im)
            }

            #[inline(always)]
            fn real(self) -> $t {
                self.re
            }

            #[inline(always)]
            fn imag(self) -> $t {
                self.im
            }

            #[inline(always)]
            fn abs(self) -> $t {
                self.norm()
            }

            #[inline(always)]
            fn abs2(self) -> $t {
                self.norm_sqr()
            }

            #[inline(always)]
            fn from_real(re: $t) -> Self {
                Complex::new(re, 0.0)
            }

            #[inline(always)]
            fn from_f64(value: f64) -> Self {
                Complex::new(value as $t, 0.0)
            }

            #[inline(always)]
            fn dummy_precision() -> $t {
                <$t as Scalar>::dummy_precision()
            }

            #[inline]
            fn sample<R: Rng>(rng: &mut R) -> Self {
                Complex::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0))
            }
        }
    };
}

impl_complex_scalar!(f32, Complex32Packet);
impl_complex_scalar!(f64, Complex64Packet);
