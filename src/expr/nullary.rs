//! Expressions without children.

use std::marker::PhantomData;

use crate::expr::{Expr, PacketOf};
use crate::flags::{Cost, Flags, Shape};
use crate::scalar::Scalar;
use crate::simd::{Align, Packet};

/// Every coefficient equals `value`.
///
/// The storage order is a type parameter so that a constant can match the
/// order of the destination it fills and keep the vectorized traversals.
#[derive(Debug, Clone, Copy)]
pub struct Constant<T, const ROW_MAJOR: bool = false> {
    rows: usize,
    cols: usize,
    value: T,
}

impl<T: Scalar, const ROW_MAJOR: bool> Constant<T, ROW_MAJOR> {
    pub fn new(rows: usize, cols: usize, value: T) -> Self {
        Constant { rows, cols, value }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::new(rows, cols, T::zero())
    }
}

impl<T: Scalar, const ROW_MAJOR: bool> Expr for Constant<T, ROW_MAJOR> {
    type Scalar = T;

    const SHAPE: Shape = Shape::DYNAMIC;
    const FLAGS: Flags = Flags::LINEAR_ACCESS
        .or(Flags::PACKET_ACCESS)
        .with_if(Flags::ROW_MAJOR, ROW_MAJOR);
    const COST: Cost = Cost::READ;

    #[inline(always)]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    fn coeff(&self, row: usize, col: usize) -> T {
        debug_assert!(row < self.rows && col < self.cols);
        self.value
    }

    #[inline(always)]
    fn coeff_linear(&self, index: usize) -> T {
        debug_assert!(index < self.rows * self.cols);
        self.value
    }

    #[inline(always)]
    fn packet(&self, _row: usize, _col: usize, _align: Align) -> PacketOf<Self> {
        T::Packet::splat(self.value)
    }

    #[inline(always)]
    fn packet_linear(&self, _index: usize, _align: Align) -> PacketOf<Self> {
        T::Packet::splat(self.value)
    }
}

/// Ones on the main diagonal, zeros elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct Identity<T> {
    rows: usize,
    cols: usize,
    scalar: PhantomData<T>,
}

impl<T: Scalar> Identity<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Identity {
            rows,
            cols,
            scalar: PhantomData,
        }
    }
}

impl<T: Scalar> Expr for Identity<T> {
    type Scalar = T;

    const SHAPE: Shape = Shape::DYNAMIC;
    const FLAGS: Flags = Flags::TRIANGULAR;
    const COST: Cost = Cost::READ;

    #[inline(always)]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    fn coeff(&self, row: usize, col: usize) -> T {
        if row == col {
            T::one()
        } else {
            T::zero()
        }
    }
}
