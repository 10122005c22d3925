//! Output formats for analysis findings.
//!
//! The terminal form is what a developer reads after a failed build; the
//! JSON form feeds editors that draw stale-handle squiggles and CI jobs
//! that track how many runtime checks a change added.

mod json;
mod terminal;

pub use json::JsonEmitter;
pub use terminal::{ColorMode, TerminalEmitter};

use std::fmt::Write;

use crate::Diagnostic;

/// Returns `","` when `index` is not the last element, `""` otherwise.
pub(crate) fn trailing_comma(index: usize, total: usize) -> &'static str {
    if index + 1 < total {
        ","
    } else {
        ""
    }
}

/// Sink for a batch of findings.
pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: &Diagnostic);

    fn emit_all(&mut self, diagnostics: &[Diagnostic]) {
        for diag in diagnostics {
            self.emit(diag);
        }
    }

    fn flush(&mut self);

    /// Closing line once the batch is done. `note_count` covers findings
    /// that did not block compilation.
    fn emit_summary(&mut self, error_count: usize, note_count: usize);
}

/// Escape a message for a JSON string literal.
pub fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(result, "\\u{:04x}", c as u32);
            }
            c => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_json_handles_quotes_and_control() {
        assert_eq!(escape_json("plain"), "plain");
        assert_eq!(escape_json("`h` is \"stale\""), "`h` is \\\"stale\\\"");
        assert_eq!(escape_json("a\nb\tc"), "a\\nb\\tc");
        assert_eq!(escape_json("\u{1}"), "\\u0001");
    }

    #[test]
    fn trailing_comma_skips_last() {
        assert_eq!(trailing_comma(0, 2), ",");
        assert_eq!(trailing_comma(1, 2), "");
    }
}
