use std::fmt::{Display, Formatter};

use crate::analysis::domain::{AbstractDomain, ValueDomain};
use crate::ir::program::{BinOp, Constant, UnOp};

/// The parity lattice, a diamond identical in shape to three-level taint
///
/// ```text
///       Top
///      /   \
///   Even   Odd
///      \   /
///     Bottom
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Parity {
    Bottom,
    Even,
    Odd,
    Top,
}

impl AbstractDomain for Parity {
    fn bottom() -> Self {
        Self::Bottom
    }

    fn top() -> Self {
        Self::Top
    }

    fn join(&self, other: &Self) -> Self {
        use Parity::*;
        match (self, other) {
            (Bottom, x) | (x, Bottom) => *x,
            (Top, _) | (_, Top) => Top,
            (Even, Even) => Even,
            (Odd, Odd) => Odd,
            (Even, Odd) | (Odd, Even) => Top,
        }
    }

    /// Parity carries no sub-interval information to intersect: differing
    /// definite parities meet at Bottom
    fn meet(&self, other: &Self) -> Self {
        use Parity::*;
        match (self, other) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Top, x) | (x, Top) => *x,
            (Even, Even) => Even,
            (Odd, Odd) => Odd,
            (Even, Odd) | (Odd, Even) => Bottom,
        }
    }

    fn leq(&self, other: &Self) -> bool {
        use Parity::*;
        match (self, other) {
            (Bottom, _) => true,
            (_, Top) => true,
            (Even, Even) | (Odd, Odd) => true,
            _ => false,
        }
    }
}

impl ValueDomain for Parity {
    fn eval_constant(constant: &Constant) -> Self {
        match constant {
            Constant::Int(v) => {
                if v % 2 == 0 {
                    Self::Even
                } else {
                    Self::Odd
                }
            }
            Constant::Float(..) => Self::Top,
        }
    }

    /// Negation preserves parity
    fn eval_unary(op: UnOp, arg: &Self) -> Self {
        match op {
            UnOp::Neg => *arg,
        }
    }

    fn eval_binary(op: BinOp, lhs: &Self, rhs: &Self) -> Self {
        use Parity::*;
        match op {
            BinOp::Add | BinOp::Sub => match (lhs, rhs) {
                (Bottom, _) | (_, Bottom) => Bottom,
                (Top, _) | (_, Top) => Top,
                (Even, Even) | (Odd, Odd) => Even,
                (Even, Odd) | (Odd, Even) => Odd,
            },
            BinOp::Mul => match (lhs, rhs) {
                (Bottom, _) | (_, Bottom) => Bottom,
                (Even, _) | (_, Even) => Even,
                (Top, _) | (_, Top) => Top,
                (Odd, Odd) => Odd,
            },
            // division and comparisons are not modeled by this domain
            _ => Top,
        }
    }
}

impl Display for Parity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bottom => write!(f, "_|_"),
            Self::Even => write!(f, "EVEN"),
            Self::Odd => write!(f, "ODD"),
            Self::Top => write!(f, "T"),
        }
    }
}
