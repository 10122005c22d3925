use arx_ir::Span;

use super::*;
use crate::{ErrorCode, Suggestion};

fn sample() -> Diagnostic {
    Diagnostic::error(ErrorCode::E5001)
        .with_message("use of stale handle `h`")
        .with_label(Span::new(20, 21), "accessed here")
        .with_secondary_label(Span::new(4, 12), "removed here")
        .with_note("the slot was freed by \"remove\"")
        .with_suggestion("test the handle with `contains` first")
}

fn render(diags: &[Diagnostic]) -> String {
    let mut emitter = JsonEmitter::new(Vec::new());
    emitter.begin();
    emitter.emit_all(diags);
    emitter.end();
    emitter.flush();
    String::from_utf8(emitter.into_inner()).unwrap()
}

#[test]
fn json_contains_code_rule_and_spans() {
    let text = render(&[sample()]);
    assert!(text.starts_with("[\n"));
    assert!(text.contains("\"code\": \"E5001\""));
    assert!(text.contains("\"rule\": \"stale-handle-access\""));
    assert!(text.contains("\"severity\": \"error\""));
    assert!(text.contains("\"start\": 20, \"end\": 21"));
    assert!(text.contains("\"primary\": false"));
    assert!(text.contains("freed by \\\"remove\\\""));
}

#[test]
fn json_separates_entries_with_commas() {
    let second = Diagnostic::note(ErrorCode::W5001).with_message("bounds check retained");
    let text = render(&[sample(), second]);
    assert!(text.contains("  },\n  {"));
    assert!(text.contains("\"severity\": \"note\""));
}

#[test]
fn json_renders_structured_suggestions() {
    let diag = Diagnostic::error(ErrorCode::E5003).with_structured_suggestion(
        Suggestion::has_placeholders("declare a context", Span::new(0, 2), "#[frozen] fn"),
    );
    let text = render(&[diag]);
    assert!(text.contains("\"applicability\": \"template\""));
    assert!(text.contains("\"machine_applicable\": false"));
    assert!(text.contains("\"snippet\": \"#[frozen] fn\""));
}
