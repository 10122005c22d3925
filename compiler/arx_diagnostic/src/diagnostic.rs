//! The diagnostic value itself.
//!
//! Handle-safety findings come in two kinds: errors that reject the program
//! (a provably stale handle, an effect a `frozen` scope forbids) and notes
//! that explain a retained runtime check. A diagnostic points at the
//! offending site with a primary label and at the cause (the removal, the
//! frozen declaration) with secondary labels.

use std::fmt;

use arx_ir::Span;

use crate::ErrorCode;

/// Whether a finding rejects the program.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Note,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Note => "note",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much an editor may trust a structured fix.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Applicability {
    MachineApplicable,
    /// Plausible, but changes meaning (e.g. relaxing a `frozen` contract).
    MaybeIncorrect,
    /// The snippet holds a placeholder such as `…` the user fills in.
    HasPlaceholders,
}

impl Applicability {
    pub fn is_machine_applicable(&self) -> bool {
        matches!(self, Applicability::MachineApplicable)
    }

    /// Heading used when rendering a suggestion.
    pub fn as_str(self) -> &'static str {
        match self {
            Applicability::MachineApplicable => "fix",
            Applicability::MaybeIncorrect => "possible fix",
            Applicability::HasPlaceholders => "template",
        }
    }
}

/// Replace `span` with `snippet`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Substitution {
    pub span: Span,
    pub snippet: String,
}

/// An edit tooling can offer alongside the message.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Suggestion {
    pub message: String,
    pub substitutions: Vec<Substitution>,
    pub applicability: Applicability,
}

impl Suggestion {
    fn single(
        message: impl Into<String>,
        span: Span,
        snippet: impl Into<String>,
        applicability: Applicability,
    ) -> Self {
        Suggestion {
            message: message.into(),
            substitutions: vec![Substitution {
                span,
                snippet: snippet.into(),
            }],
            applicability,
        }
    }

    pub fn machine_applicable(
        message: impl Into<String>,
        span: Span,
        snippet: impl Into<String>,
    ) -> Self {
        Self::single(message, span, snippet, Applicability::MachineApplicable)
    }

    pub fn maybe_incorrect(
        message: impl Into<String>,
        span: Span,
        snippet: impl Into<String>,
    ) -> Self {
        Self::single(message, span, snippet, Applicability::MaybeIncorrect)
    }

    pub fn has_placeholders(
        message: impl Into<String>,
        span: Span,
        snippet: impl Into<String>,
    ) -> Self {
        Self::single(message, span, snippet, Applicability::HasPlaceholders)
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.applicability.as_str(), self.message)?;
        for sub in &self.substitutions {
            write!(f, " [{:?} => `{}`]", sub.span, sub.snippet)?;
        }
        Ok(())
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label {
    pub span: Span,
    pub message: String,
    /// The site the finding is about; secondary labels show causes.
    pub is_primary: bool,
}

/// A handle-safety finding ready for an emitter.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    /// Free-text advice, rendered as `help:` lines.
    pub suggestions: Vec<String>,
    pub structured_suggestions: Vec<Suggestion>,
}

impl Diagnostic {
    fn with_severity(code: ErrorCode, severity: Severity) -> Self {
        Diagnostic {
            code,
            severity,
            message: String::new(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestions: Vec::new(),
            structured_suggestions: Vec::new(),
        }
    }

    pub fn error(code: ErrorCode) -> Self {
        Self::with_severity(code, Severity::Error)
    }

    /// An explanation that never blocks compilation.
    pub fn note(code: ErrorCode) -> Self {
        Self::with_severity(code, Severity::Note)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn push_label(mut self, span: Span, message: impl Into<String>, is_primary: bool) -> Self {
        self.labels.push(Label {
            span,
            message: message.into(),
            is_primary,
        });
        self
    }

    /// Label the site the finding is about.
    pub fn with_label(self, span: Span, message: impl Into<String>) -> Self {
        self.push_label(span, message, true)
    }

    /// Label a cause, such as the removal that invalidated a handle.
    pub fn with_secondary_label(self, span: Span, message: impl Into<String>) -> Self {
        self.push_label(span, message, false)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_structured_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.structured_suggestions.push(suggestion);
        self
    }

    pub fn primary_span(&self) -> Option<Span> {
        self.labels.iter().find(|l| l.is_primary).map(|l| l.span)
    }

    pub fn secondary_spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.labels.iter().filter(|l| !l.is_primary).map(|l| l.span)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Rule name of the code, e.g. `stale-handle-access`.
    pub fn rule(&self) -> &'static str {
        self.code.rule()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity,
            self.code,
            self.rule(),
            self.message
        )?;
        for label in &self.labels {
            let marker = if label.is_primary { "at" } else { "see" };
            write!(f, "\n  {marker} {:?}: {}", label.span, label.message)?;
        }
        for note in &self.notes {
            write!(f, "\n  = note: {note}")?;
        }
        for suggestion in &self.suggestions {
            write!(f, "\n  = help: {suggestion}")?;
        }
        for suggestion in &self.structured_suggestions {
            write!(f, "\n  = {suggestion}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
