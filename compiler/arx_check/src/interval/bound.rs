//! Interval lattice with symbolic array-length bounds.
//!
//! A bound is a constant, an infinity, or `len(array) + offset`. The symbolic
//! form is what lets `i < len(arr)` prove `arr[i]` in bounds without knowing
//! the length. Every operation only relies on `len(array) >= 0`.
//!
//! Arithmetic saturates to the matching infinity instead of wrapping.

use std::fmt;

use crate::ir::LocalId;

/// One end of an [`Interval`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bound {
    NegInf,
    Finite(i64),
    /// `len(array) + offset`.
    Len {
        array: LocalId,
        offset: i64,
    },
    PosInf,
}

impl Bound {
    /// Provably `self <= other`.
    pub fn le(self, other: Bound) -> bool {
        match (self, other) {
            (Bound::NegInf, _) | (_, Bound::PosInf) => true,
            (Bound::PosInf, _) | (_, Bound::NegInf) => false,
            (Bound::Finite(a), Bound::Finite(b)) => a <= b,
            // len >= 0, so len + o >= o.
            (Bound::Finite(a), Bound::Len { offset, .. }) => a <= offset,
            (Bound::Len { .. }, Bound::Finite(_)) => false,
            (
                Bound::Len {
                    array: a1,
                    offset: o1,
                },
                Bound::Len {
                    array: a2,
                    offset: o2,
                },
            ) => a1 == a2 && o1 <= o2,
        }
    }

    /// Shift by a constant.
    fn shift(self, by: i64, upper: bool) -> Bound {
        let overflow = if upper { Bound::PosInf } else { Bound::NegInf };
        match self {
            Bound::NegInf | Bound::PosInf => self,
            Bound::Finite(v) => v.checked_add(by).map_or(overflow, Bound::Finite),
            Bound::Len { array, offset } => offset
                .checked_add(by)
                .map_or(overflow, |offset| Bound::Len { array, offset }),
        }
    }

    /// `self + other` for two bounds on the same side.
    fn add(self, other: Bound, upper: bool) -> Bound {
        match (self, other) {
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
            (Bound::Finite(c), b) | (b, Bound::Finite(c)) => b.shift(c, upper),
            (Bound::Len { offset: o1, .. }, Bound::Len { offset: o2, .. }) => {
                if upper {
                    Bound::PosInf
                } else {
                    // len1 + len2 + o1 + o2 >= o1 + o2
                    Bound::Finite(o1.saturating_add(o2))
                }
            }
        }
    }

    /// `self - other`, where `self` and `other` sit on opposite sides
    /// (`lo - hi` for a lower bound, `hi - lo` for an upper one).
    fn sub(self, other: Bound, upper: bool) -> Bound {
        match (self, other) {
            (Bound::NegInf, _) | (_, Bound::PosInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::NegInf) => Bound::PosInf,
            (x, Bound::Finite(c)) => match c.checked_neg() {
                Some(neg) => x.shift(neg, upper),
                None if upper => Bound::PosInf,
                None => Bound::NegInf,
            },
            (
                Bound::Len {
                    array: a1,
                    offset: o1,
                },
                Bound::Len {
                    array: a2,
                    offset: o2,
                },
            ) if a1 == a2 => o1
                .checked_sub(o2)
                .map_or(if upper { Bound::PosInf } else { Bound::NegInf }, Bound::Finite),
            // x - (len + o) <= x - o
            (x, Bound::Len { offset, .. }) if upper => x.sub(Bound::Finite(offset), true),
            (_, Bound::Len { .. }) => Bound::NegInf,
        }
    }

    /// Smallest bound known to be `>=` both (join of upper bounds).
    fn join_upper(self, other: Bound) -> Bound {
        if self.le(other) {
            return other;
        }
        if other.le(self) {
            return self;
        }
        match (self, other) {
            (Bound::Finite(c), Bound::Len { array, offset })
            | (Bound::Len { array, offset }, Bound::Finite(c)) => Bound::Len {
                array,
                offset: offset.max(c),
            },
            _ => Bound::PosInf,
        }
    }

    /// Largest bound known to be `<=` both (join of lower bounds).
    fn join_lower(self, other: Bound) -> Bound {
        if self.le(other) {
            return self;
        }
        if other.le(self) {
            return other;
        }
        match (self, other) {
            (Bound::Finite(c), Bound::Len { offset, .. })
            | (Bound::Len { offset, .. }, Bound::Finite(c)) => Bound::Finite(c.min(offset)),
            (Bound::Len { offset: o1, .. }, Bound::Len { offset: o2, .. }) => {
                Bound::Finite(o1.min(o2))
            }
            _ => Bound::NegInf,
        }
    }

    /// The tighter of two valid upper bounds. Symbolic wins a tie.
    fn meet_upper(self, other: Bound) -> Bound {
        if self.le(other) {
            self
        } else if other.le(self) {
            other
        } else if matches!(other, Bound::Len { .. }) {
            other
        } else {
            self
        }
    }

    /// The tighter of two valid lower bounds. Constant wins a tie.
    fn meet_lower(self, other: Bound) -> Bound {
        if other.le(self) {
            self
        } else if self.le(other) {
            other
        } else if matches!(other, Bound::Finite(_)) {
            other
        } else {
            self
        }
    }

    fn as_finite(self) -> Option<i64> {
        match self {
            Bound::Finite(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-inf"),
            Bound::PosInf => write!(f, "+inf"),
            Bound::Finite(v) => write!(f, "{v}"),
            Bound::Len { array, offset: 0 } => write!(f, "len({array})"),
            Bound::Len { array, offset } if *offset < 0 => {
                write!(f, "len({array}) - {}", offset.unsigned_abs())
            }
            Bound::Len { array, offset } => write!(f, "len({array}) + {offset}"),
        }
    }
}

/// Closed range `[lo, hi]`. `lo > hi` (with infinities) is the empty range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    pub lo: Bound,
    pub hi: Bound,
}

impl Interval {
    pub const TOP: Interval = Interval {
        lo: Bound::NegInf,
        hi: Bound::PosInf,
    };

    /// No value; the starting assumption at a loop header.
    pub const BOTTOM: Interval = Interval {
        lo: Bound::PosInf,
        hi: Bound::NegInf,
    };

    pub const NON_NEGATIVE: Interval = Interval {
        lo: Bound::Finite(0),
        hi: Bound::PosInf,
    };

    pub const fn constant(v: i64) -> Self {
        Interval {
            lo: Bound::Finite(v),
            hi: Bound::Finite(v),
        }
    }

    pub const fn new(lo: Bound, hi: Bound) -> Self {
        Interval { lo, hi }
    }

    /// Exactly `len(array)`.
    pub const fn len_of(array: LocalId) -> Self {
        let b = Bound::Len { array, offset: 0 };
        Interval { lo: b, hi: b }
    }

    pub fn is_bottom(self) -> bool {
        self.lo == Bound::PosInf
            || self.hi == Bound::NegInf
            || matches!((self.lo, self.hi), (Bound::Finite(l), Bound::Finite(h)) if l > h)
    }

    pub fn is_top(self) -> bool {
        self == Self::TOP
    }

    /// Least upper bound.
    pub fn join(self, other: Interval) -> Interval {
        if self.is_bottom() {
            return other;
        }
        if other.is_bottom() {
            return self;
        }
        Interval {
            lo: self.lo.join_lower(other.lo),
            hi: self.hi.join_upper(other.hi),
        }
    }

    /// Intersection, as tight as the bounds allow to prove.
    pub fn meet(self, other: Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Self::BOTTOM;
        }
        Interval {
            lo: self.lo.meet_lower(other.lo),
            hi: self.hi.meet_upper(other.hi),
        }
        .normalize()
    }

    /// Standard widening: any bound that moved goes to infinity.
    pub fn widen(self, next: Interval) -> Interval {
        if self.is_bottom() {
            return next;
        }
        if next.is_bottom() {
            return self;
        }
        Interval {
            lo: if self.lo.le(next.lo) {
                self.lo
            } else {
                Bound::NegInf
            },
            hi: if next.hi.le(self.hi) {
                self.hi
            } else {
                Bound::PosInf
            },
        }
    }

    fn normalize(self) -> Interval {
        if self.is_bottom() {
            Self::BOTTOM
        } else {
            self
        }
    }

    pub fn add(self, other: Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Self::BOTTOM;
        }
        Interval {
            lo: self.lo.add(other.lo, false),
            hi: self.hi.add(other.hi, true),
        }
    }

    pub fn sub(self, other: Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Self::BOTTOM;
        }
        Interval {
            lo: self.lo.sub(other.hi, false),
            hi: self.hi.sub(other.lo, true),
        }
    }

    /// Multiplication is only modelled for constant bounds; symbolic
    /// operands fall back to a sign-based approximation.
    pub fn mul(self, other: Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Self::BOTTOM;
        }
        if self == Self::constant(1) {
            return other;
        }
        if other == Self::constant(1) {
            return self;
        }
        if self == Self::constant(0) || other == Self::constant(0) {
            return Self::constant(0);
        }
        let finite = (
            self.lo.as_finite(),
            self.hi.as_finite(),
            other.lo.as_finite(),
            other.hi.as_finite(),
        );
        if let (Some(a), Some(b), Some(c), Some(d)) = finite {
            let products = [
                a.checked_mul(c),
                a.checked_mul(d),
                b.checked_mul(c),
                b.checked_mul(d),
            ];
            if products.iter().all(Option::is_some) {
                let values = products.iter().flatten();
                let lo = values.clone().copied().min().unwrap_or(i64::MIN);
                let hi = values.copied().max().unwrap_or(i64::MAX);
                return Interval::new(Bound::Finite(lo), Bound::Finite(hi));
            }
        }
        if self.is_non_negative() && other.is_non_negative() {
            return Self::NON_NEGATIVE;
        }
        Self::TOP
    }

    pub fn is_non_negative(self) -> bool {
        Bound::Finite(0).le(self.lo)
    }

    /// Provably does not contain `value`.
    pub fn excludes(self, value: i64) -> bool {
        if self.is_bottom() {
            return true;
        }
        let below = value
            .checked_add(1)
            .is_some_and(|next| Bound::Finite(next).le(self.lo));
        let above = value
            .checked_sub(1)
            .is_some_and(|prev| self.hi.le(Bound::Finite(prev)));
        below || above
    }

    /// Provably a valid index for `array` (of `fixed_len` elements if known).
    pub fn within_len(self, array: LocalId, fixed_len: Option<u32>) -> bool {
        if self.is_bottom() {
            return true;
        }
        let upper = match fixed_len {
            Some(len) => Bound::Finite(i64::from(len) - 1),
            None => Bound::Len { array, offset: -1 },
        };
        self.is_non_negative() && self.hi.le(upper)
    }

    /// Narrow `self` given that `self op other` holds.
    pub fn refine(self, op: crate::ir::CmpOp, other: Interval) -> Interval {
        use crate::ir::CmpOp;

        if self.is_bottom() || other.is_bottom() {
            return Self::BOTTOM;
        }
        let refined = match op {
            CmpOp::Lt => Interval {
                lo: self.lo,
                hi: self.hi.meet_upper(other.hi.shift(-1, true)),
            },
            CmpOp::Le => Interval {
                lo: self.lo,
                hi: self.hi.meet_upper(other.hi),
            },
            CmpOp::Gt => Interval {
                lo: self.lo.meet_lower(other.lo.shift(1, false)),
                hi: self.hi,
            },
            CmpOp::Ge => Interval {
                lo: self.lo.meet_lower(other.lo),
                hi: self.hi,
            },
            CmpOp::Eq => return self.meet(other),
            CmpOp::Ne => match (other.lo, other.hi) {
                (Bound::Finite(c), Bound::Finite(d)) if c == d => Interval {
                    lo: if self.lo == Bound::Finite(c) {
                        self.lo.shift(1, false)
                    } else {
                        self.lo
                    },
                    hi: if self.hi == Bound::Finite(c) {
                        self.hi.shift(-1, true)
                    } else {
                        self.hi
                    },
                },
                _ => self,
            },
        };
        refined.normalize()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "empty")
        } else {
            write!(f, "[{}, {}]", self.lo, self.hi)
        }
    }
}
