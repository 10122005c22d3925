//! Interned identifiers.

use std::fmt;

/// Index of a string in the [`StringInterner`](crate::StringInterner)
/// that produced it.
///
/// Function and local names are compared far more often than they are
/// printed: every call edge, effect lookup and summary lookup keys on a
/// `Name`, while the text is only needed when a diagnostic is rendered.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// The empty string, interned by every interner at index 0.
    pub const EMPTY: Name = Name(0);

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Rebuild a name from [`raw`](Self::raw). Tests use this to name
    /// functions without going through an interner.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trips() {
        assert_eq!(Name::from_raw(Name::from_raw(7).raw()), Name::from_raw(7));
        assert_eq!(Name::default(), Name::EMPTY);
    }

    #[test]
    fn debug_shows_index() {
        assert_eq!(format!("{:?}", Name::from_raw(12)), "Name(12)");
    }
}
