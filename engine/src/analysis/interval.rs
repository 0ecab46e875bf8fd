use std::fmt::{Display, Formatter};

use crate::analysis::domain::{AbstractDomain, ValueDomain};
use crate::ir::program::{BinOp, Constant, UnOp};

//
// Numeric intervals over extended integers, with explicit widening and
// narrowing. The shape follows the classic interval abstract domain:
// https://github.com/llvm/llvm-project/blob/main/llvm/lib/IR/ConstantRange.cpp
//

/// An extended integer: -Inf, a finite value, or +Inf
///
/// The derived ordering is exactly the extended-integer ordering. Finite
/// arithmetic saturates at the i64 limits; an infinity absorbs any finite
/// operand.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub enum Bound {
    NegInf,
    Int(i64),
    PosInf,
}

impl Bound {
    pub fn is_finite(&self) -> bool {
        matches!(self, Self::Int(..))
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Self::NegInf => f64::NEG_INFINITY,
            Self::Int(v) => *v as f64,
            Self::PosInf => f64::INFINITY,
        }
    }

    pub fn neg(self) -> Self {
        match self {
            Self::NegInf => Self::PosInf,
            Self::Int(v) => Self::Int(v.saturating_neg()),
            Self::PosInf => Self::NegInf,
        }
    }

    pub fn add(self, other: Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.saturating_add(b)),
            // mixed infinities never arise when adding matched bounds
            (Self::NegInf, _) | (_, Self::NegInf) => Self::NegInf,
            (Self::PosInf, _) | (_, Self::PosInf) => Self::PosInf,
        }
    }

    pub fn sub(self, other: Self) -> Self {
        self.add(other.neg())
    }

    pub fn mul(self, other: Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.saturating_mul(b)),
            // zero absorbs an infinity in the cross products
            (Self::Int(0), _) | (_, Self::Int(0)) => Self::Int(0),
            (Self::NegInf, Self::NegInf) | (Self::PosInf, Self::PosInf) => Self::PosInf,
            (Self::NegInf, Self::PosInf) | (Self::PosInf, Self::NegInf) => Self::NegInf,
            (Self::NegInf, Self::Int(v)) | (Self::Int(v), Self::NegInf) => {
                if v > 0 {
                    Self::NegInf
                } else {
                    Self::PosInf
                }
            }
            (Self::PosInf, Self::Int(v)) | (Self::Int(v), Self::PosInf) => {
                if v > 0 {
                    Self::PosInf
                } else {
                    Self::NegInf
                }
            }
        }
    }

    /// Divisor bounds are never zero here: division is only performed once
    /// the divisor range is known to exclude zero.
    pub fn div(self, other: Self) -> Self {
        match (self, other) {
            // saturates at i64::MAX for MIN / -1
            (Self::Int(a), Self::Int(b)) => Self::Int(a.saturating_div(b)),
            // a finite value vanishes against an infinite divisor; an
            // infinite dividend keeps its magnitude, flipping on sign
            (Self::Int(_), Self::NegInf | Self::PosInf) => Self::Int(0),
            (Self::NegInf | Self::PosInf, Self::NegInf | Self::PosInf) => Self::Int(0),
            (Self::NegInf, Self::Int(v)) => {
                if v > 0 {
                    Self::NegInf
                } else {
                    Self::PosInf
                }
            }
            (Self::PosInf, Self::Int(v)) => {
                if v > 0 {
                    Self::PosInf
                } else {
                    Self::NegInf
                }
            }
        }
    }
}

impl Display for Bound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegInf => write!(f, "-Inf"),
            Self::Int(v) => write!(f, "{}", v),
            Self::PosInf => write!(f, "+Inf"),
        }
    }
}

/// The interval abstract domain: Bottom, or a closed range over extended
/// integers; Top is `[-Inf, +Inf]`
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Interval {
    Bottom,
    Range(Bound, Bound),
}

impl Interval {
    /// Build a range, collapsing inconsistent bounds to Bottom
    pub fn range(low: Bound, high: Bound) -> Self {
        if low > high {
            Self::Bottom
        } else {
            Self::Range(low, high)
        }
    }

    pub fn constant(value: i64) -> Self {
        Self::Range(Bound::Int(value), Bound::Int(value))
    }

    fn bounds(&self) -> Option<(Bound, Bound)> {
        match self {
            Self::Bottom => None,
            Self::Range(low, high) => Some((*low, *high)),
        }
    }

    /// Whether the range includes zero
    pub fn contains_zero(&self) -> bool {
        match self.bounds() {
            None => false,
            Some((low, high)) => low <= Bound::Int(0) && Bound::Int(0) <= high,
        }
    }

    /// Whether the range is exactly `[0, 0]`
    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Range(Bound::Int(0), Bound::Int(0)))
    }

    fn cross_products<F: Fn(Bound, Bound) -> Bound>(
        (la, ha): (Bound, Bound),
        (lb, hb): (Bound, Bound),
        op: F,
    ) -> Self {
        let products = [op(la, lb), op(la, hb), op(ha, lb), op(ha, hb)];
        let min = *products.iter().min().unwrap();
        let max = *products.iter().max().unwrap();
        Self::range(min, max)
    }
}

impl AbstractDomain for Interval {
    fn bottom() -> Self {
        Self::Bottom
    }

    fn top() -> Self {
        Self::Range(Bound::NegInf, Bound::PosInf)
    }

    fn join(&self, other: &Self) -> Self {
        match (self.bounds(), other.bounds()) {
            (None, _) => *other,
            (_, None) => *self,
            (Some((la, ha)), Some((lb, hb))) => Self::range(la.min(lb), ha.max(hb)),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Self::Bottom,
            (Some((la, ha)), Some((lb, hb))) => Self::range(la.max(lb), ha.min(hb)),
        }
    }

    fn leq(&self, other: &Self) -> bool {
        match (self.bounds(), other.bounds()) {
            (None, _) => true,
            (_, None) => false,
            (Some((la, ha)), Some((lb, hb))) => lb <= la && ha <= hb,
        }
    }

    fn widen(&self, other: &Self) -> Self {
        match (self.bounds(), other.bounds()) {
            (None, _) => *other,
            (_, None) => *self,
            (Some((la, ha)), Some((lb, hb))) => {
                let high = if hb > ha { Bound::PosInf } else { ha };
                let low = if lb < la { Bound::NegInf } else { la };
                Self::range(low, high)
            }
        }
    }

    fn narrow(&self, other: &Self) -> Self {
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Self::Bottom,
            (Some((la, ha)), Some((lb, hb))) => {
                // only bounds that widening sent to an infinity are refined
                let low = if la.is_finite() { la } else { lb };
                let high = if ha.is_finite() { ha } else { hb };
                Self::range(low, high)
            }
        }
    }
}

impl ValueDomain for Interval {
    fn eval_constant(constant: &Constant) -> Self {
        match constant {
            Constant::Int(v) => Self::constant(*v),
            // the domain is integer-based: float constants are truncated to
            // an integer singleton, losing fractional precision by design
            Constant::Float(bits) => Self::constant(f64::from_bits(*bits) as i64),
        }
    }

    fn eval_unary(op: UnOp, arg: &Self) -> Self {
        match (op, arg.bounds()) {
            (_, None) => Self::Bottom,
            // -[a, b] = [-b, -a]
            (UnOp::Neg, Some((low, high))) => Self::range(high.neg(), low.neg()),
        }
    }

    fn eval_binary(op: BinOp, lhs: &Self, rhs: &Self) -> Self {
        let (a, b) = match (lhs.bounds(), rhs.bounds()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Self::Bottom,
        };
        match op {
            // [a,b] + [c,d] = [a+c, b+d]
            BinOp::Add => Self::range(a.0.add(b.0), a.1.add(b.1)),
            // [a,b] - [c,d] = [a-d, b-c]
            BinOp::Sub => Self::range(a.0.sub(b.1), a.1.sub(b.0)),
            // [a,b] * [c,d] = [min(ac,ad,bc,bd), max(ac,ad,bc,bd)]
            BinOp::Mul => Self::cross_products(a, b, Bound::mul),
            BinOp::Div => {
                // a divisor range containing zero degrades to Top: a live
                // program may still divide by a non-zero runtime value
                if rhs.contains_zero() {
                    return Self::top();
                }
                Self::cross_products(a, b, Bound::div)
            }
            // comparisons are not modeled by this domain
            _ => Self::top(),
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bottom => write!(f, "_|_"),
            Self::Range(low, high) => write!(f, "[{},{}]", low, high),
        }
    }
}
