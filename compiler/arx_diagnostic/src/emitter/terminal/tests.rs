use arx_ir::Span;

use super::*;
use crate::{ErrorCode, Suggestion};

fn sample() -> Diagnostic {
    Diagnostic::error(ErrorCode::E5002)
        .with_message("`grow` called from frozen function `walk`")
        .with_secondary_label(Span::new(0, 14), "declared frozen here")
        .with_label(Span::new(30, 42), "arena grows here")
        .with_note("frozen functions may only read and write existing slots")
        .with_suggestion("declare `walk` as mutable")
        .with_structured_suggestion(Suggestion::maybe_incorrect(
            "relax the contract",
            Span::new(0, 6),
            "mutable",
        ))
}

fn render_with(mode: ColorMode, f: impl FnOnce(&mut TerminalEmitter<&mut Vec<u8>>)) -> String {
    let mut output = Vec::new();
    let mut emitter = TerminalEmitter::with_color_mode(&mut output, mode, false);
    f(&mut emitter);
    emitter.flush();
    String::from_utf8(output).unwrap()
}

#[test]
fn plain_output_has_all_parts() {
    let text = render_with(ColorMode::Never, |e| e.emit(&sample()));
    assert!(text.starts_with("error[E5002]: `grow` called"));
    assert!(text.contains("  --> 30..42: arena grows here\n"));
    assert!(text.contains("  ::: 0..14: declared frozen here\n"));
    assert!(text.contains("   = note: frozen functions"));
    assert!(text.contains("   = help: declare `walk` as mutable"));
    assert!(text.contains("   = possible fix: relax the contract [0..6 => `mutable`]"));
    assert!(!text.contains("\x1b["));
}

#[test]
fn primary_label_printed_before_causes() {
    let text = render_with(ColorMode::Never, |e| e.emit(&sample()));
    let primary = text.find("-->").unwrap();
    let cause = text.find(":::").unwrap();
    assert!(primary < cause);
}

#[test]
fn colored_output_uses_ansi() {
    let text = render_with(ColorMode::Always, |e| e.emit(&sample()));
    assert!(text.contains("\x1b[1;31merror\x1b[0m"));
    assert!(text.contains("\x1b[1m[E5002]\x1b[0m"));

    let note = Diagnostic::note(ErrorCode::W5001).with_message("bounds check retained");
    let text = render_with(ColorMode::Always, |e| e.emit(&note));
    assert!(text.starts_with("\x1b[1;36mnote\x1b[0m"));
}

#[test]
fn auto_mode_follows_tty() {
    assert!(ColorMode::Auto.should_use_colors(true));
    assert!(!ColorMode::Auto.should_use_colors(false));
}

#[test]
fn summary_counts_errors_and_notes() {
    let text = render_with(ColorMode::Never, |e| e.emit_summary(2, 1));
    assert_eq!(text, "error: handle checking failed with 2 errors and 1 note\n");

    let text = render_with(ColorMode::Never, |e| e.emit_summary(1, 0));
    assert_eq!(text, "error: handle checking failed with 1 error\n");

    let text = render_with(ColorMode::Never, |e| e.emit_summary(0, 3));
    assert_eq!(text, "note: 3 notes emitted\n");

    let text = render_with(ColorMode::Never, |e| e.emit_summary(0, 0));
    assert_eq!(text, "");
}
