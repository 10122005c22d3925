//! Human-readable output.
//!
//! ```text
//! error[E5001]: use of stale handle `node`
//!   --> 40..48: `node` may be stale here
//!   ::: 10..22: removed here
//!    = note: a removed slot may be reused by a later insertion
//!    = help: test the handle with `contains(node)` first
//!    = possible fix: guard the access [40..48 => `if arena.contains(node) { … }`]
//! ```
//!
//! Spans are printed as byte ranges; resolving them to lines is the
//! caller's job since this crate never sees source text.

use std::io::{self, Write};

use crate::{Diagnostic, Label, Severity};

use super::DiagnosticEmitter;

mod ansi {
    pub const RED: &str = "\x1b[1;31m";
    pub const CYAN: &str = "\x1b[1;36m";
    pub const BLUE: &str = "\x1b[1;34m";
    pub const GREEN: &str = "\x1b[1;32m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => ansi::RED,
        Severity::Note => ansi::CYAN,
    }
}

fn counted(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Color only when writing to a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
        }
    }

    pub fn stderr(mode: ColorMode, is_tty: bool) -> TerminalEmitter<io::Stderr> {
        TerminalEmitter::with_color_mode(io::stderr(), mode, is_tty)
    }

    fn paint(&mut self, text: &str, color: &str) {
        let _ = if self.colors {
            write!(self.writer, "{color}{text}{}", ansi::RESET)
        } else {
            write!(self.writer, "{text}")
        };
    }

    fn label(&mut self, label: &Label, severity: Severity) {
        let (marker, color) = if label.is_primary {
            ("-->", severity_color(severity))
        } else {
            (":::", ansi::BLUE)
        };
        let _ = write!(self.writer, "  {marker} {:?}: ", label.span);
        self.paint(&label.message, color);
        let _ = writeln!(self.writer);
    }

    fn trailer(&mut self, kind: &str, color: &str, text: &str) {
        let _ = write!(self.writer, "   = ");
        self.paint(kind, color);
        let _ = writeln!(self.writer, ": {text}");
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        self.paint(
            diagnostic.severity.as_str(),
            severity_color(diagnostic.severity),
        );
        let header = format!("[{}]", diagnostic.code);
        self.paint(&header, ansi::BOLD);
        let _ = writeln!(self.writer, ": {}", diagnostic.message);

        // Primary site first, then causes in the order they were attached.
        let (primary, causes): (Vec<&Label>, Vec<&Label>) =
            diagnostic.labels.iter().partition(|l| l.is_primary);
        for label in primary.into_iter().chain(causes) {
            self.label(label, diagnostic.severity);
        }

        for note in &diagnostic.notes {
            self.trailer("note", ansi::BOLD, note);
        }
        for help in &diagnostic.suggestions {
            self.trailer("help", ansi::GREEN, help);
        }
        for suggestion in &diagnostic.structured_suggestions {
            let mut text = suggestion.message.clone();
            for sub in &suggestion.substitutions {
                text.push_str(&format!(" [{:?} => `{}`]", sub.span, sub.snippet));
            }
            self.trailer(suggestion.applicability.as_str(), ansi::GREEN, &text);
        }

        let _ = writeln!(self.writer);
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }

    fn emit_summary(&mut self, error_count: usize, note_count: usize) {
        let notes = (note_count > 0).then(|| counted(note_count, "note"));
        if error_count > 0 {
            self.paint("error", ansi::RED);
            let _ = write!(
                self.writer,
                ": handle checking failed with {}",
                counted(error_count, "error")
            );
            if let Some(notes) = notes {
                let _ = write!(self.writer, " and {notes}");
            }
            let _ = writeln!(self.writer);
        } else if let Some(notes) = notes {
            self.paint("note", ansi::CYAN);
            let _ = writeln!(self.writer, ": {notes} emitted");
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
