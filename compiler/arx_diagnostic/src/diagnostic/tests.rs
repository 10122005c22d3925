use pretty_assertions::assert_eq;

use super::*;

fn stale_access() -> Diagnostic {
    Diagnostic::error(ErrorCode::E5001)
        .with_message("use of stale handle `node`")
        .with_label(Span::new(40, 48), "handle accessed here")
        .with_secondary_label(Span::new(10, 22), "handle removed here")
        .with_note("a removed slot may be reused by a later insertion")
        .with_suggestion("re-check the handle with `contains` before accessing it")
}

#[test]
fn builder_collects_labels_in_order() {
    let diag = stale_access();
    assert_eq!(diag.labels.len(), 2);
    assert!(diag.labels[0].is_primary);
    assert!(!diag.labels[1].is_primary);
    assert_eq!(diag.primary_span(), Some(Span::new(40, 48)));
    assert_eq!(
        diag.secondary_spans().collect::<Vec<_>>(),
        vec![Span::new(10, 22)]
    );
}

#[test]
fn primary_span_skips_leading_causes() {
    let diag = Diagnostic::error(ErrorCode::E5002)
        .with_secondary_label(Span::new(0, 4), "declared frozen here")
        .with_label(Span::new(30, 36), "arena shrinks here");
    assert_eq!(diag.primary_span(), Some(Span::new(30, 36)));
}

#[test]
fn notes_are_not_errors() {
    let diag = Diagnostic::note(ErrorCode::W5001).with_message("bounds check retained");
    assert!(!diag.is_error());
    assert_eq!(diag.severity, Severity::Note);
    assert!(stale_access().is_error());
}

#[test]
fn display_names_code_and_rule() {
    let text = stale_access().to_string();
    assert!(text.starts_with("error [E5001] stale-handle-access: use of stale handle `node`"));
    assert!(text.contains("\n  at 40..48: handle accessed here"));
    assert!(text.contains("\n  see 10..22: handle removed here"));
    assert!(text.contains("= note: a removed slot"));
    assert!(text.contains("= help: re-check the handle"));
}

#[test]
fn structured_suggestion_display() {
    let diag = Diagnostic::error(ErrorCode::E5002).with_structured_suggestion(
        Suggestion::maybe_incorrect("declare the function mutable", Span::new(0, 3), "mut fn"),
    );
    let suggestion = &diag.structured_suggestions[0];
    assert_eq!(suggestion.applicability, Applicability::MaybeIncorrect);
    assert!(!suggestion.applicability.is_machine_applicable());
    assert_eq!(suggestion.substitutions[0].snippet, "mut fn");
    assert_eq!(
        suggestion.to_string(),
        "possible fix: declare the function mutable [0..3 => `mut fn`]"
    );
    assert!(diag.to_string().contains("\n  = possible fix:"));
}

#[test]
fn machine_applicable_fix() {
    let fix = Suggestion::machine_applicable("test first", Span::new(5, 6), "if ok {");
    assert!(fix.applicability.is_machine_applicable());
    assert!(fix.to_string().starts_with("fix: test first"));
}

#[test]
fn severity_display() {
    assert_eq!(Severity::Error.to_string(), "error");
    assert_eq!(Severity::Note.to_string(), "note");
    assert!(Severity::Error < Severity::Note);
}
