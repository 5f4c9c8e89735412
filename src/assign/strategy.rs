//! The assignment classifier.
//!
//! [`analyze`] turns the static descriptors of a destination and a source
//! into a [`Strategy`]: how to traverse the positions and how much of the
//! traversal to unroll. It is a `const fn` over plain data, so
//! [`Strategy::select`] is resolved at compile time for every pair of
//! expression types, and the same function can be exercised directly with
//! hand-written descriptors.

use std::fmt;

use crate::expr::{Expr, PacketOf};
use crate::flags::{Cost, Dim, Flags, Shape};
use crate::simd::Packet;
use crate::UNROLLING_LIMIT;

/// Order and granularity in which positions are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Traversal {
    /// Outer then inner loop, one coefficient at a time.
    Default,
    /// One flat index over every coefficient.
    Linear,
    /// Outer loop, packets along the inner dimension.
    InnerVectorized,
    /// Flat index with a scalar prefix up to the first aligned
    /// destination address, packets, and a scalar tail.
    LinearVectorized,
    /// Per outer slice: scalar prefix, aligned packets, scalar tail.
    SliceVectorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unrolling {
    None,
    /// The inner loop has a compile-time trip count.
    Inner,
    /// Every loop has a compile-time trip count.
    Complete,
}

/// A (traversal, unrolling) pair naming one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Strategy {
    pub traversal: Traversal,
    pub unrolling: Unrolling,
}

/// Every executor that exists.
pub const ALL_STRATEGIES: [Strategy; 11] = [
    Strategy::new(Traversal::Default, Unrolling::None),
    Strategy::new(Traversal::Default, Unrolling::Inner),
    Strategy::new(Traversal::Default, Unrolling::Complete),
    Strategy::new(Traversal::Linear, Unrolling::None),
    Strategy::new(Traversal::Linear, Unrolling::Complete),
    Strategy::new(Traversal::InnerVectorized, Unrolling::None),
    Strategy::new(Traversal::InnerVectorized, Unrolling::Inner),
    Strategy::new(Traversal::InnerVectorized, Unrolling::Complete),
    Strategy::new(Traversal::LinearVectorized, Unrolling::None),
    Strategy::new(Traversal::LinearVectorized, Unrolling::Complete),
    Strategy::new(Traversal::SliceVectorized, Unrolling::None),
];

/// Static description of one side of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub shape: Shape,
    pub flags: Flags,
    pub cost: Cost,
}

impl Descriptor {
    pub const fn of<E: Expr + ?Sized>() -> Descriptor {
        Descriptor {
            shape: E::SHAPE,
            flags: E::FLAGS,
            cost: E::COST,
        }
    }

    const fn row_major(&self) -> bool {
        self.flags.is_row_major()
    }

    const fn inner(&self) -> Dim {
        self.shape.inner(self.row_major())
    }
}

/// Every intermediate decision of [`analyze`], for inspection and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignTraits {
    pub storage_orders_agree: bool,
    pub might_vectorize: bool,
    pub may_inner_vectorize: bool,
    pub may_linearize: bool,
    pub may_linear_vectorize: bool,
    pub may_slice_vectorize: bool,
    pub vectorized: bool,
    /// Operation budget for unrolling, already scaled by the packet width
    /// for vectorized traversals.
    pub unrolling_limit: usize,
    pub may_unroll_completely: bool,
    pub may_unroll_inner: bool,
    pub strategy: Strategy,
}

/// `size * cost <= limit`, false when either factor is dynamic.
const fn within_budget(size: Dim, cost: Cost, limit: usize) -> bool {
    match (size.value(), cost.value()) {
        (Some(n), Some(c)) => match n.checked_mul(c) {
            Some(total) => total <= limit,
            None => false,
        },
        _ => false,
    }
}

/// Chooses the traversal and unrolling for assigning `src` to `dst`.
///
/// Rules are applied in a fixed priority order: inner vectorization, then
/// linear vectorization, then slice vectorization, then plain linear, then
/// the default nested loop.
pub const fn analyze(
    dst: Descriptor,
    src: Descriptor,
    packet_size: usize,
    unrolling_limit: usize,
) -> AssignTraits {
    let storage_orders_agree = dst.row_major() == src.row_major();
    let might_vectorize = storage_orders_agree
        && dst.flags.has(Flags::PACKET_ACCESS)
        && src.flags.has(Flags::PACKET_ACCESS);

    let both_aligned = dst.flags.has(Flags::ALIGNED) && src.flags.has(Flags::ALIGNED);
    let may_inner_vectorize = might_vectorize
        && both_aligned
        && match dst.inner().value() {
            Some(inner) => inner % packet_size == 0,
            None => false,
        };

    let may_linearize = storage_orders_agree
        && dst.flags.has(Flags::LINEAR_ACCESS)
        && src.flags.has(Flags::LINEAR_ACCESS);

    let dst_direct = dst.flags.has(Flags::DIRECT_ACCESS);
    let dst_aligned = dst.flags.has(Flags::ALIGNED);
    let may_linear_vectorize = might_vectorize
        && may_linearize
        && dst_direct
        && (dst_aligned || dst.shape.size().is_dynamic());

    let may_slice_vectorize = might_vectorize
        && dst_direct
        && match dst.shape.max_inner(dst.row_major()).value() {
            Some(max_inner) => max_inner >= 3 * packet_size,
            None => true,
        };

    let traversal = if may_inner_vectorize {
        Traversal::InnerVectorized
    } else if may_linear_vectorize {
        Traversal::LinearVectorized
    } else if may_slice_vectorize {
        Traversal::SliceVectorized
    } else if may_linearize {
        Traversal::Linear
    } else {
        Traversal::Default
    };

    let vectorized = matches!(
        traversal,
        Traversal::InnerVectorized | Traversal::LinearVectorized | Traversal::SliceVectorized
    );
    let limit = if vectorized {
        unrolling_limit * packet_size
    } else {
        unrolling_limit
    };

    let may_unroll_completely = within_budget(dst.shape.size(), src.cost, limit);
    let may_unroll_inner = within_budget(dst.inner(), src.cost, limit);

    let unrolling = match traversal {
        Traversal::Default | Traversal::InnerVectorized => {
            if may_unroll_completely {
                Unrolling::Complete
            } else if may_unroll_inner {
                Unrolling::Inner
            } else {
                Unrolling::None
            }
        }
        Traversal::LinearVectorized => {
            if may_unroll_completely && dst_aligned {
                Unrolling::Complete
            } else {
                Unrolling::None
            }
        }
        Traversal::Linear => {
            if may_unroll_completely {
                Unrolling::Complete
            } else {
                Unrolling::None
            }
        }
        Traversal::SliceVectorized => Unrolling::None,
    };

    AssignTraits {
        storage_orders_agree,
        might_vectorize,
        may_inner_vectorize,
        may_linearize,
        may_linear_vectorize,
        may_slice_vectorize,
        vectorized,
        unrolling_limit: limit,
        may_unroll_completely,
        may_unroll_inner,
        strategy: Strategy {
            traversal,
            unrolling,
        },
    }
}

impl Strategy {
    pub const fn new(traversal: Traversal, unrolling: Unrolling) -> Strategy {
        Strategy {
            traversal,
            unrolling,
        }
    }

    /// Full classification for assigning an `S` to a `D`.
    pub const fn traits<D: Expr, S: Expr>() -> AssignTraits {
        analyze(
            Descriptor::of::<D>(),
            Descriptor::of::<S>(),
            <PacketOf<D> as Packet>::LANES,
            UNROLLING_LIMIT,
        )
    }

    /// The strategy [`crate::assign::assign`] uses for this pair of types.
    pub const fn select<D: Expr, S: Expr>() -> Strategy {
        Self::traits::<D, S>().strategy
    }

    pub const fn is_vectorized(self) -> bool {
        matches!(
            self.traversal,
            Traversal::InnerVectorized | Traversal::LinearVectorized | Traversal::SliceVectorized
        )
    }

    /// Whether this strategy's executor can run on `dst` and `src`.
    ///
    /// The classifier only picks applicable strategies; this check guards
    /// strategies forced through [`crate::assign::assign_using`]. The error
    /// names the missing capability.
    pub fn check_applicable<D, S>(self, dst: &D, _src: &S) -> Result<(), String>
    where
        D: Expr,
        S: Expr<Scalar = D::Scalar>,
    {
        let orders_agree = D::FLAGS.is_row_major() == S::FLAGS.is_row_major();
        let both = |flags: Flags| D::FLAGS.has(flags) && S::FLAGS.has(flags);
        let lanes = <PacketOf<D> as Packet>::LANES;

        match self.traversal {
            Traversal::Default => {}
            Traversal::Linear => {
                if !(orders_agree && both(Flags::LINEAR_ACCESS)) {
                    return Err("linear traversal needs linear access on both sides in the same storage order".into());
                }
            }
            Traversal::InnerVectorized => {
                if !(orders_agree && both(Flags::PACKET_ACCESS)) {
                    return Err("inner vectorization needs packet access on both sides in the same storage order".into());
                }
                if dst.inner_size() % lanes != 0 {
                    return Err(format!(
                        "inner vectorization needs an inner size divisible by {lanes}, got {}",
                        dst.inner_size()
                    ));
                }
            }
            Traversal::LinearVectorized => {
                if !(orders_agree && both(Flags::LINEAR_ACCESS.or(Flags::PACKET_ACCESS))) {
                    return Err("linear vectorization needs linear packet access on both sides in the same storage order".into());
                }
                if !D::FLAGS.has(Flags::DIRECT_ACCESS) {
                    return Err("linear vectorization needs direct access to the destination".into());
                }
                if self.unrolling == Unrolling::Complete && !D::FLAGS.has(Flags::ALIGNED) {
                    return Err("unrolled linear vectorization needs an aligned destination".into());
                }
            }
            Traversal::SliceVectorized => {
                if !(orders_agree && both(Flags::PACKET_ACCESS)) {
                    return Err("slice vectorization needs packet access on both sides in the same storage order".into());
                }
                if !D::FLAGS.has(Flags::DIRECT_ACCESS) {
                    return Err("slice vectorization needs direct access to the destination".into());
                }
            }
        }

        match (self.traversal, self.unrolling) {
            (Traversal::Linear | Traversal::LinearVectorized, Unrolling::Inner) => {
                Err(format!("{self} has no inner loop to unroll"))
            }
            (Traversal::SliceVectorized, Unrolling::Inner | Unrolling::Complete) => {
                Err("slice vectorization cannot be unrolled".into())
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Traversal::Default => "Default",
            Traversal::Linear => "Linear",
            Traversal::InnerVectorized => "InnerVectorized",
            Traversal::LinearVectorized => "LinearVectorized",
            Traversal::SliceVectorized => "SliceVectorized",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Unrolling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Unrolling::None => "NoUnrolling",
            Unrolling::Inner => "InnerUnrolling",
            Unrolling::Complete => "CompleteUnrolling",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.traversal, self.unrolling)
    }
}
