use std::fmt;

/// Error codes for all analysis diagnostics.
///
/// Format: `E####` for errors, `W####` for notes and warnings. The first
/// digit groups the producing phase:
/// - E5xxx / W5xxx: handle-safety analyses
/// - E9xxx: internal errors (malformed input)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum ErrorCode {
    /// Access through a handle proven stale
    E5001,
    /// Growing or shrinking an arena from a frozen context
    E5002,
    /// Public function without an explicit effect context
    E5003,
    /// Bounds check could not be eliminated
    W5001,
    /// Malformed control-flow input
    E9001,
    /// Too many errors
    E9002,
}

impl ErrorCode {
    /// Get the code as a string (e.g., "E5001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E5001 => "E5001",
            ErrorCode::E5002 => "E5002",
            ErrorCode::E5003 => "E5003",
            ErrorCode::W5001 => "W5001",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
        }
    }

    /// Short rule name shown to tooling alongside the code.
    pub fn rule(&self) -> &'static str {
        match self {
            ErrorCode::E5001 => "stale-handle-access",
            ErrorCode::E5002 => "frozen-context-violation",
            ErrorCode::E5003 => "missing-effect-context",
            ErrorCode::W5001 => "bounds-check-retained",
            ErrorCode::E9001 => "malformed-input",
            ErrorCode::E9002 => "too-many-errors",
        }
    }

    /// Check if this is a warning or note code (`W` prefix).
    pub fn is_warning(&self) -> bool {
        self.as_str().starts_with('W')
    }

    /// Check if this is an internal error (E9xxx range).
    pub fn is_internal(&self) -> bool {
        self.as_str().starts_with("E9")
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_display() {
        assert_eq!(ErrorCode::E5001.to_string(), "E5001");
        assert_eq!(ErrorCode::W5001.as_str(), "W5001");
    }

    #[test]
    fn warning_and_internal_ranges() {
        assert!(ErrorCode::W5001.is_warning());
        assert!(!ErrorCode::E5002.is_warning());
        assert!(ErrorCode::E9001.is_internal());
        assert!(!ErrorCode::E5003.is_internal());
    }

    #[test]
    fn rules_are_distinct() {
        let codes = [
            ErrorCode::E5001,
            ErrorCode::E5002,
            ErrorCode::E5003,
            ErrorCode::W5001,
            ErrorCode::E9001,
            ErrorCode::E9002,
        ];
        let mut rules: Vec<_> = codes.iter().map(ErrorCode::rule).collect();
        rules.sort_unstable();
        rules.dedup();
        assert_eq!(rules.len(), codes.len());
    }
}
