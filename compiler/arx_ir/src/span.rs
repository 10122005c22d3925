//! Byte-offset source spans.
//!
//! The analyses never see source text. Each statement arrives with the span
//! the front end assigned to it, and diagnostics hand those spans back so
//! the front end can render lines and carets.

use std::fmt;

/// Half-open byte range `start..end`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Placeholder for statements the front end synthesized.
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    #[inline]
    pub const fn is_dummy(self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// Smallest span covering both.
    #[must_use]
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_spans_both() {
        assert_eq!(Span::new(10, 20).cover(Span::new(15, 30)), Span::new(10, 30));
        assert_eq!(Span::new(15, 30).cover(Span::new(10, 12)), Span::new(10, 30));
    }

    #[test]
    fn renders_as_range() {
        assert_eq!(Span::new(4, 9).to_string(), "4..9");
        assert_eq!(format!("{:?}", Span::new(4, 9)), "4..9");
    }

    #[test]
    fn dummy_detection() {
        assert!(Span::DUMMY.is_dummy());
        assert!(!Span::new(0, 1).is_dummy());
    }
}
