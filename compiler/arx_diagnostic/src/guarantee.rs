use std::fmt;

/// Proof that at least one hard error was reported.
///
/// Only the diagnostic queue (and [`from_error_count`](Self::from_error_count))
/// can produce one, so a function returning `Result<_, ErrorGuaranteed>`
/// cannot fail without having reported why.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    pub(crate) fn new() -> Self {
        ErrorGuaranteed(())
    }

    /// Produce a guarantee when `count` errors have already been reported.
    pub fn from_error_count(count: usize) -> Option<Self> {
        (count > 0).then(Self::new)
    }
}

impl fmt::Display for ErrorGuaranteed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error(s) emitted")
    }
}

impl std::error::Error for ErrorGuaranteed {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_error_count_nonzero() {
        assert!(ErrorGuaranteed::from_error_count(1).is_some());
        assert!(ErrorGuaranteed::from_error_count(0).is_none());
    }

    #[test]
    fn display_shows_error_message() {
        let shown = ErrorGuaranteed::from_error_count(2).map(|g| g.to_string());
        assert_eq!(shown.as_deref(), Some("error(s) emitted"));
    }
}
