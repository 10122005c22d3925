//! Handle validity lattice.

use std::fmt;

/// What is known about a handle local at one program point.
///
/// Totally ordered `Invalid < Unknown < Valid < Fresh`. Merging two paths
/// takes the minimum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Typestate {
    /// Proven stale.
    Invalid,
    /// Not proven either way.
    Unknown,
    /// Proven valid by a check or access.
    Valid,
    /// Produced by an insert with no structural mutation of its arena since.
    Fresh,
}

impl Typestate {
    /// Merge at a control-flow join.
    #[inline]
    #[must_use]
    pub fn meet(self, other: Typestate) -> Typestate {
        self.min(other)
    }

    /// A structural mutation of the arena happened.
    #[inline]
    #[must_use]
    pub fn widen(self) -> Typestate {
        match self {
            Typestate::Fresh | Typestate::Valid => Typestate::Unknown,
            s => s,
        }
    }

    /// Whether a runtime check on this handle can never fail.
    #[inline]
    pub fn is_proven_valid(self) -> bool {
        self >= Typestate::Valid
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Typestate::Invalid => "invalid",
            Typestate::Unknown => "unknown",
            Typestate::Valid => "valid",
            Typestate::Fresh => "fresh",
        }
    }
}

impl fmt::Display for Typestate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
