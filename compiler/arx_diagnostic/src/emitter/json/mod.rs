//! Machine-readable findings, one object per diagnostic inside a top-level
//! array. Editors key squiggles on `rule` and the label offsets; the
//! `applicability` string tells them whether a fix may be applied blindly.

use std::io::Write;

use crate::Diagnostic;

use super::{escape_json, trailing_comma, DiagnosticEmitter};

pub struct JsonEmitter<W: Write> {
    writer: W,
    first: bool,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        JsonEmitter {
            writer,
            first: true,
        }
    }

    /// Open the array. Call once before the first `emit`.
    pub fn begin(&mut self) {
        let _ = writeln!(self.writer, "[");
    }

    pub fn end(&mut self) {
        let _ = writeln!(self.writer, "\n]");
    }

    /// Consume the emitter and hand back the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        if !self.first {
            let _ = writeln!(self.writer, ",");
        }
        self.first = false;

        let _ = writeln!(self.writer, "  {{");
        let _ = writeln!(self.writer, "    \"code\": \"{}\",", diagnostic.code);
        let _ = writeln!(self.writer, "    \"rule\": \"{}\",", diagnostic.rule());
        let _ = writeln!(self.writer, "    \"severity\": \"{}\",", diagnostic.severity);
        let _ = writeln!(
            self.writer,
            "    \"message\": \"{}\",",
            escape_json(&diagnostic.message)
        );

        let _ = writeln!(self.writer, "    \"labels\": [");
        for (i, label) in diagnostic.labels.iter().enumerate() {
            let comma = trailing_comma(i, diagnostic.labels.len());
            let _ = writeln!(
                self.writer,
                "      {{ \"start\": {}, \"end\": {}, \"message\": \"{}\", \"primary\": {} }}{comma}",
                label.span.start,
                label.span.end,
                escape_json(&label.message),
                label.is_primary,
            );
        }
        let _ = writeln!(self.writer, "    ],");

        let _ = writeln!(self.writer, "    \"notes\": [");
        for (i, note) in diagnostic.notes.iter().enumerate() {
            let comma = trailing_comma(i, diagnostic.notes.len());
            let _ = writeln!(self.writer, "      \"{}\"{comma}", escape_json(note));
        }
        let _ = writeln!(self.writer, "    ],");

        let _ = writeln!(self.writer, "    \"suggestions\": [");
        for (i, suggestion) in diagnostic.suggestions.iter().enumerate() {
            let comma = trailing_comma(i, diagnostic.suggestions.len());
            let _ = writeln!(self.writer, "      \"{}\"{comma}", escape_json(suggestion));
        }
        let _ = writeln!(self.writer, "    ],");

        let _ = writeln!(self.writer, "    \"structured_suggestions\": [");
        for (i, suggestion) in diagnostic.structured_suggestions.iter().enumerate() {
            let comma = trailing_comma(i, diagnostic.structured_suggestions.len());
            let _ = writeln!(self.writer, "      {{");
            let _ = writeln!(
                self.writer,
                "        \"message\": \"{}\",",
                escape_json(&suggestion.message)
            );
            let _ = writeln!(
                self.writer,
                "        \"applicability\": \"{}\",",
                suggestion.applicability.as_str()
            );
            let _ = writeln!(
                self.writer,
                "        \"machine_applicable\": {},",
                suggestion.applicability.is_machine_applicable()
            );
            let _ = writeln!(self.writer, "        \"substitutions\": [");
            for (j, sub) in suggestion.substitutions.iter().enumerate() {
                let inner = trailing_comma(j, suggestion.substitutions.len());
                let _ = writeln!(
                    self.writer,
                    "          {{ \"start\": {}, \"end\": {}, \"snippet\": \"{}\" }}{inner}",
                    sub.span.start,
                    sub.span.end,
                    escape_json(&sub.snippet),
                );
            }
            let _ = writeln!(self.writer, "        ]");
            let _ = writeln!(self.writer, "      }}{comma}");
        }
        let _ = writeln!(self.writer, "    ]");

        let _ = write!(self.writer, "  }}");
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }

    fn emit_summary(&mut self, _error_count: usize, _note_count: usize) {
        // The array already carries every finding.
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
