use std::fmt::{Display, Formatter};

use crate::analysis::domain::{AbstractDomain, CallKind, ValueDomain};
use crate::ir::program::{BinOp, Constant, UnOp};

//
// Taint domains: a two-level may-taint lattice and a three-level variant
// with an explicit Top. Both have finite height, so widening is plain join
// and narrowing has nothing to refine.
//

/// A domain shared by all taint lattices, consumed by the taint checker
pub trait TaintDomain: ValueDomain {
    fn tainted() -> Self;

    fn clean() -> Self;

    /// True only when the value is definitely tainted
    fn is_always_tainted(&self) -> bool;

    /// True when the value might be tainted
    fn is_possibly_tainted(&self) -> bool;
}

/// The two-level taint lattice
///
/// ```text
///   Tainted     (might be tainted; doubles as Top)
///      |
///    Clean      (definitely clean)
///      |
///    Bottom     (error state)
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Taint {
    Bottom,
    Clean,
    Tainted,
}

impl AbstractDomain for Taint {
    fn bottom() -> Self {
        Self::Bottom
    }

    fn top() -> Self {
        Self::Tainted
    }

    fn join(&self, other: &Self) -> Self {
        use Taint::*;
        match (self, other) {
            (Bottom, x) | (x, Bottom) => *x,
            (Tainted, _) | (_, Tainted) => Tainted,
            (Clean, Clean) => Clean,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        use Taint::*;
        match (self, other) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Clean, _) | (_, Clean) => Clean,
            (Tainted, Tainted) => Tainted,
        }
    }

    fn leq(&self, other: &Self) -> bool {
        use Taint::*;
        matches!(
            (self, other),
            (Bottom, _) | (Clean, Clean) | (Clean, Tainted) | (Tainted, Tainted)
        )
    }
}

impl ValueDomain for Taint {
    fn eval_constant(_constant: &Constant) -> Self {
        Self::Clean
    }

    fn eval_unary(_op: UnOp, arg: &Self) -> Self {
        *arg
    }

    fn eval_binary(_op: BinOp, lhs: &Self, rhs: &Self) -> Self {
        use Taint::*;
        match (lhs, rhs) {
            // an already-erroneous path propagates immediately
            (Bottom, _) | (_, Bottom) => Bottom,
            (Tainted, _) | (_, Tainted) => Tainted,
            (Clean, Clean) => Clean,
        }
    }

    fn eval_call(kind: CallKind, args: &[Self]) -> Self {
        eval_taint_call(kind, args)
    }
}

impl TaintDomain for Taint {
    fn tainted() -> Self {
        Self::Tainted
    }

    fn clean() -> Self {
        Self::Clean
    }

    /// Always false: Tainted only means "might be tainted" in this lattice
    fn is_always_tainted(&self) -> bool {
        false
    }

    fn is_possibly_tainted(&self) -> bool {
        matches!(self, Self::Tainted)
    }
}

impl Display for Taint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bottom => write!(f, "_|_"),
            Self::Clean => write!(f, "_"),
            Self::Tainted => write!(f, "#"),
        }
    }
}

/// The three-level taint lattice
///
/// ```text
///        Top        (might be tainted or clean)
///       /   \
///  Tainted  Clean   (definitely tainted / definitely clean)
///       \   /
///      Bottom       (error state)
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TaintThreeLevels {
    Bottom,
    Clean,
    Tainted,
    Top,
}

impl AbstractDomain for TaintThreeLevels {
    fn bottom() -> Self {
        Self::Bottom
    }

    fn top() -> Self {
        Self::Top
    }

    fn join(&self, other: &Self) -> Self {
        use TaintThreeLevels::*;
        match (self, other) {
            (Bottom, x) | (x, Bottom) => *x,
            (Top, _) | (_, Top) => Top,
            (Tainted, Tainted) => Tainted,
            (Clean, Clean) => Clean,
            (Tainted, Clean) | (Clean, Tainted) => Top,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        use TaintThreeLevels::*;
        match (self, other) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Top, x) | (x, Top) => *x,
            (Tainted, Tainted) => Tainted,
            (Clean, Clean) => Clean,
            (Tainted, Clean) | (Clean, Tainted) => Bottom,
        }
    }

    fn leq(&self, other: &Self) -> bool {
        use TaintThreeLevels::*;
        match (self, other) {
            (Bottom, _) => true,
            (_, Top) => true,
            (Tainted, Tainted) | (Clean, Clean) => true,
            _ => false,
        }
    }
}

impl ValueDomain for TaintThreeLevels {
    fn eval_constant(_constant: &Constant) -> Self {
        Self::Clean
    }

    fn eval_unary(_op: UnOp, arg: &Self) -> Self {
        *arg
    }

    fn eval_binary(_op: BinOp, lhs: &Self, rhs: &Self) -> Self {
        use TaintThreeLevels::*;
        match (lhs, rhs) {
            // an already-erroneous path propagates immediately
            (Bottom, _) | (_, Bottom) => Bottom,
            (Tainted, _) | (_, Tainted) => Tainted,
            (Top, _) | (_, Top) => Top,
            (Clean, Clean) => Clean,
        }
    }

    fn eval_call(kind: CallKind, args: &[Self]) -> Self {
        eval_taint_call(kind, args)
    }
}

impl TaintDomain for TaintThreeLevels {
    fn tainted() -> Self {
        Self::Tainted
    }

    fn clean() -> Self {
        Self::Clean
    }

    fn is_always_tainted(&self) -> bool {
        matches!(self, Self::Tainted)
    }

    fn is_possibly_tainted(&self) -> bool {
        matches!(self, Self::Tainted | Self::Top)
    }
}

impl Display for TaintThreeLevels {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bottom => write!(f, "_|_"),
            Self::Clean => write!(f, "_"),
            Self::Tainted => write!(f, "#"),
            Self::Top => write!(f, "T"),
        }
    }
}

/// Shared call-return policy for taint lattices: source and sanitizer
/// annotations override the result, otherwise the taint of the arguments
/// flows through the call
fn eval_taint_call<D: TaintDomain>(kind: CallKind, args: &[D]) -> D {
    match kind {
        CallKind::Source => D::tainted(),
        CallKind::Sanitizer => D::clean(),
        CallKind::Opaque => {
            if args.is_empty() {
                return D::top();
            }
            args.iter().fold(D::bottom(), |acc, arg| acc.join(arg))
        }
    }
}
