//! Static descriptors attached to every expression node: capability bits,
//! shape and per-coefficient read cost.
//!
//! Everything here is usable in `const` context so that a node's descriptor
//! can be an associated constant computed from its children's.

use bitflags::bitflags;

bitflags! {
    /// Access capabilities an expression guarantees.
    ///
    /// A node may only advertise a bit its accessor implementations honour;
    /// derived nodes compute their bits from their children's.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u32 {
        /// Row-major storage; absent means column-major.
        const ROW_MAJOR = 1 << 0;
        /// Exposes a raw pointer with unit inner stride and an outer stride.
        const DIRECT_ACCESS = 1 << 1;
        /// Supports a single flattened index over inner-then-outer order.
        const LINEAR_ACCESS = 1 << 2;
        /// Supports packet reads (and writes, for writable nodes).
        const PACKET_ACCESS = 1 << 3;
        /// The first coefficient sits on a packet boundary and every outer
        /// slice starts `inner_size` elements after the previous one.
        const ALIGNED = 1 << 4;
        /// Coefficients strictly below the diagonal are structurally zero.
        const UPPER_TRIANGULAR = 1 << 5;
        /// Coefficients strictly above the diagonal are structurally zero.
        const LOWER_TRIANGULAR = 1 << 6;
    }
}

impl Flags {
    /// Bits that describe how elements can be reached.
    pub const ACCESS: Flags = Flags::from_bits_retain(
        Flags::DIRECT_ACCESS.bits()
            | Flags::LINEAR_ACCESS.bits()
            | Flags::PACKET_ACCESS.bits()
            | Flags::ALIGNED.bits(),
    );

    /// Both triangular hints.
    pub const TRIANGULAR: Flags = Flags::from_bits_retain(
        Flags::UPPER_TRIANGULAR.bits() | Flags::LOWER_TRIANGULAR.bits(),
    );

    /// `true` when every bit of `other` is set.
    #[inline]
    pub const fn has(self, other: Flags) -> bool {
        self.bits() & other.bits() == other.bits()
    }

    #[inline]
    pub const fn and(self, other: Flags) -> Flags {
        Flags::from_bits_retain(self.bits() & other.bits())
    }

    #[inline]
    pub const fn or(self, other: Flags) -> Flags {
        Flags::from_bits_retain(self.bits() | other.bits())
    }

    #[inline]
    pub const fn without(self, other: Flags) -> Flags {
        Flags::from_bits_retain(self.bits() & !other.bits())
    }

    /// Adds `other` when `condition` holds.
    #[inline]
    pub const fn with_if(self, other: Flags, condition: bool) -> Flags {
        if condition {
            self.or(other)
        } else {
            self
        }
    }

    #[inline]
    pub const fn is_row_major(self) -> bool {
        self.has(Flags::ROW_MAJOR)
    }

    /// Exchanges the upper and lower triangular hints.
    #[inline]
    pub const fn swap_triangular(self) -> Flags {
        let upper = self.has(Flags::UPPER_TRIANGULAR);
        let lower = self.has(Flags::LOWER_TRIANGULAR);
        self.without(Flags::TRIANGULAR)
            .with_if(Flags::LOWER_TRIANGULAR, upper)
            .with_if(Flags::UPPER_TRIANGULAR, lower)
    }

    /// Flips the storage order bit.
    #[inline]
    pub const fn toggle_order(self) -> Flags {
        Flags::from_bits_retain(self.bits() ^ Flags::ROW_MAJOR.bits())
    }
}

/// One extent of a shape: known from the type, or only at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    Fixed(usize),
    Dynamic,
}

impl Dim {
    #[inline]
    pub const fn value(self) -> Option<usize> {
        match self {
            Dim::Fixed(n) => Some(n),
            Dim::Dynamic => None,
        }
    }

    #[inline]
    pub const fn is_fixed(self) -> bool {
        matches!(self, Dim::Fixed(_))
    }

    #[inline]
    pub const fn is_dynamic(self) -> bool {
        matches!(self, Dim::Dynamic)
    }

    /// The fixed value, or `runtime` when the extent is dynamic.
    #[inline]
    pub const fn or(self, runtime: usize) -> usize {
        match self {
            Dim::Fixed(n) => n,
            Dim::Dynamic => runtime,
        }
    }

    #[inline]
    pub const fn times(self, other: Dim) -> Dim {
        match (self, other) {
            (Dim::Fixed(a), Dim::Fixed(b)) => Dim::Fixed(a * b),
            _ => Dim::Dynamic,
        }
    }

    /// Combines the extents of two operands that must agree, preferring
    /// whichever one is known statically.
    #[inline]
    pub const fn merge(self, other: Dim) -> Dim {
        match (self, other) {
            (Dim::Fixed(a), _) => Dim::Fixed(a),
            (_, Dim::Fixed(b)) => Dim::Fixed(b),
            _ => Dim::Dynamic,
        }
    }
}

/// Static shape of an expression.
///
/// `max_rows`/`max_cols` bound a dynamic extent when an upper limit is known
/// (a dynamic block of a fixed matrix, for instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub rows: Dim,
    pub cols: Dim,
    pub max_rows: Dim,
    pub max_cols: Dim,
}

impl Shape {
    pub const DYNAMIC: Shape = Shape {
        rows: Dim::Dynamic,
        cols: Dim::Dynamic,
        max_rows: Dim::Dynamic,
        max_cols: Dim::Dynamic,
    };

    pub const fn fixed(rows: usize, cols: usize) -> Shape {
        Shape {
            rows: Dim::Fixed(rows),
            cols: Dim::Fixed(cols),
            max_rows: Dim::Fixed(rows),
            max_cols: Dim::Fixed(cols),
        }
    }

    pub const fn size(self) -> Dim {
        self.rows.times(self.cols)
    }

    pub const fn max_size(self) -> Dim {
        self.max_rows.times(self.max_cols)
    }

    pub const fn transposed(self) -> Shape {
        Shape {
            rows: self.cols,
            cols: self.rows,
            max_rows: self.max_cols,
            max_cols: self.max_rows,
        }
    }

    /// Inner extent for the given storage order.
    pub const fn inner(self, row_major: bool) -> Dim {
        if row_major {
            self.cols
        } else {
            self.rows
        }
    }

    pub const fn max_inner(self, row_major: bool) -> Dim {
        if row_major {
            self.max_cols
        } else {
            self.max_rows
        }
    }

    /// Shape of a coefficient-wise combination of two equally shaped operands.
    pub const fn merge(self, other: Shape) -> Shape {
        Shape {
            rows: self.rows.merge(other.rows),
            cols: self.cols.merge(other.cols),
            max_rows: self.max_rows.merge(other.max_rows),
            max_cols: self.max_cols.merge(other.max_cols),
        }
    }

    /// Dynamic extents bounded by `self`'s maxima.
    pub const fn bounded_dynamic(self) -> Shape {
        Shape {
            rows: Dim::Dynamic,
            cols: Dim::Dynamic,
            max_rows: self.max_rows,
            max_cols: self.max_cols,
        }
    }
}

/// Estimated cost of reading one coefficient, used to bound unrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cost {
    Fixed(usize),
    Dynamic,
}

impl Cost {
    /// Cost of reading a stored coefficient.
    pub const READ: Cost = Cost::Fixed(1);

    #[inline]
    pub const fn value(self) -> Option<usize> {
        match self {
            Cost::Fixed(n) => Some(n),
            Cost::Dynamic => None,
        }
    }

    #[inline]
    pub const fn plus(self, other: Cost) -> Cost {
        match (self, other) {
            (Cost::Fixed(a), Cost::Fixed(b)) => Cost::Fixed(a.saturating_add(b)),
            _ => Cost::Dynamic,
        }
    }

    #[inline]
    pub const fn add(self, amount: usize) -> Cost {
        self.plus(Cost::Fixed(amount))
    }

    /// Cost repeated once per element of a (possibly dynamic) extent.
    #[inline]
    pub const fn repeated(self, count: Dim) -> Cost {
        match (self, count) {
            (Cost::Fixed(a), Dim::Fixed(n)) => Cost::Fixed(a.saturating_mul(n)),
            _ => Cost::Dynamic,
        }
    }
}
