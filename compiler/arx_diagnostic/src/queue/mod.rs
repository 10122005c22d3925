//! Collects findings from every per-function analysis and hands them back
//! in source order.
//!
//! The same stale handle can be reported twice when two analyses reach it
//! (say, a direct access and a call argument at one span), so identical
//! findings collapse. Past the error limit, errors are counted instead of
//! kept and one E9002 marker closes the batch.

use crate::{Diagnostic, ErrorCode, ErrorGuaranteed};

/// How the queue treats a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    /// Hard error - always reported, not suppressed by other errors.
    Hard,
    /// Soft error - suppressed after a hard error to reduce noise.
    Soft,
}

/// Configuration for diagnostic processing.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Maximum number of errors before stopping (0 = unlimited).
    pub error_limit: usize,
    /// Drop diagnostics with the same code and primary span as one already queued.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 50,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// Create a config with no limits (for testing).
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            deduplicate: false,
        }
    }
}

/// Where a finding sorts: its primary span start, span-less findings last.
fn position(diag: &Diagnostic) -> u32 {
    diag.primary_span().map_or(u32::MAX, |span| span.start)
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    /// Errors dropped once the limit was reached.
    suppressed: usize,
    has_hard_error: bool,
    config: DiagnosticConfig,
}

impl Default for DiagnosticQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticQueue {
    /// Create a new diagnostic queue with default configuration.
    pub fn new() -> Self {
        Self::with_config(DiagnosticConfig::default())
    }

    /// Create a diagnostic queue with custom configuration.
    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            diagnostics: Vec::new(),
            error_count: 0,
            suppressed: 0,
            has_hard_error: false,
            config,
        }
    }

    /// Queue a finding. Returns `false` if it was filtered out.
    pub fn add(&mut self, diag: Diagnostic, severity: DiagnosticSeverity) -> bool {
        let is_error = diag.is_error();
        let soft = matches!(severity, DiagnosticSeverity::Soft);

        if is_error && self.limit_reached() {
            self.suppressed += 1;
            return false;
        }

        if soft && self.has_hard_error {
            return false;
        }

        if self.config.deduplicate && self.is_duplicate(&diag) {
            return false;
        }

        if is_error && !soft {
            self.has_hard_error = true;
        }
        if is_error {
            self.error_count += 1;
        }

        self.diagnostics.push(diag);
        true
    }

    /// Add every diagnostic of a batch with the same severity.
    pub fn extend(
        &mut self,
        diags: impl IntoIterator<Item = Diagnostic>,
        severity: DiagnosticSeverity,
    ) {
        for diag in diags {
            self.add(diag, severity);
        }
    }

    /// Queue a hard error and get proof it was reported.
    pub fn emit_error(&mut self, diag: Diagnostic) -> ErrorGuaranteed {
        self.add(diag, DiagnosticSeverity::Hard);
        ErrorGuaranteed::new()
    }

    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.error_count >= self.config.error_limit
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Number of diagnostics currently queued, errors and notes alike.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn has_errors(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count)
    }

    /// Drain the queue in source order and reset it.
    ///
    /// Findings at the same position keep their insertion order. If the
    /// limit dropped any errors, a trailing E9002 says how many.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let mut result = std::mem::take(&mut self.diagnostics);
        result.sort_by_key(position);

        if self.suppressed > 0 {
            result.push(
                Diagnostic::error(ErrorCode::E9002)
                    .with_message(format!(
                        "aborting after {} errors; {} more suppressed",
                        self.error_count, self.suppressed
                    ))
                    .with_note("raise the error limit to see every finding"),
            );
        }

        self.error_count = 0;
        self.suppressed = 0;
        self.has_hard_error = false;
        result
    }

    /// Queued findings in insertion order, without draining.
    pub fn peek(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    fn is_duplicate(&self, diag: &Diagnostic) -> bool {
        let span = diag.primary_span();
        self.diagnostics.iter().any(|queued| {
            queued.code == diag.code
                && queued.message == diag.message
                && queued.primary_span() == span
        })
    }
}

#[cfg(test)]
mod tests;
