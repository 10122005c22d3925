use arx_ir::Span;

use pretty_assertions::assert_eq;

use super::*;

fn stale_at(start: u32) -> Diagnostic {
    Diagnostic::error(ErrorCode::E5001)
        .with_message("use of stale handle")
        .with_label(Span::new(start, start + 4), "accessed here")
}

fn retained_at(start: u32) -> Diagnostic {
    Diagnostic::note(ErrorCode::W5001)
        .with_message("bounds check retained")
        .with_label(Span::new(start, start + 2), "index here")
}

#[test]
fn flush_sorts_by_primary_span() {
    let mut queue = DiagnosticQueue::with_config(DiagnosticConfig::unlimited());
    queue.add(stale_at(30), DiagnosticSeverity::Hard);
    queue.add(retained_at(5), DiagnosticSeverity::Soft);
    queue.add(stale_at(12), DiagnosticSeverity::Hard);

    let starts: Vec<_> = queue
        .flush()
        .iter()
        .filter_map(Diagnostic::primary_span)
        .map(|s| s.start)
        .collect();
    assert_eq!(starts, vec![5, 12, 30]);
}

#[test]
fn spanless_diagnostics_sort_last() {
    let mut queue = DiagnosticQueue::new();
    queue.add(
        Diagnostic::error(ErrorCode::E5003).with_message("missing context"),
        DiagnosticSeverity::Hard,
    );
    queue.add(stale_at(3), DiagnosticSeverity::Hard);
    let flushed = queue.flush();
    assert_eq!(flushed[0].code, ErrorCode::E5001);
    assert_eq!(flushed[1].code, ErrorCode::E5003);
}

#[test]
fn duplicates_are_dropped() {
    let mut queue = DiagnosticQueue::new();
    assert!(queue.add(stale_at(8), DiagnosticSeverity::Hard));
    assert!(!queue.add(stale_at(8), DiagnosticSeverity::Hard));
    assert_eq!(queue.error_count(), 1);
}

#[test]
fn soft_errors_suppressed_after_hard() {
    let mut queue = DiagnosticQueue::new();
    queue.add(stale_at(1), DiagnosticSeverity::Hard);
    let soft = Diagnostic::error(ErrorCode::E5002).with_label(Span::new(9, 10), "grows here");
    assert!(!queue.add(soft, DiagnosticSeverity::Soft));
}

#[test]
fn notes_do_not_count_as_errors() {
    let mut queue = DiagnosticQueue::new();
    queue.add(retained_at(0), DiagnosticSeverity::Soft);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.error_count(), 0);
    assert!(queue.has_errors().is_none());
}

#[test]
fn limit_appends_marker() {
    let mut queue = DiagnosticQueue::with_config(DiagnosticConfig {
        error_limit: 2,
        deduplicate: true,
    });
    for start in [0, 10, 20, 30] {
        queue.add(stale_at(start), DiagnosticSeverity::Hard);
    }
    assert!(queue.limit_reached());
    assert!(queue.has_errors().is_some());

    let flushed = queue.flush();
    assert_eq!(flushed.len(), 3);
    assert_eq!(flushed[2].code, ErrorCode::E9002);
    assert!(flushed[2].message.contains("2 more suppressed"));
    assert!(queue.is_empty());
    assert_eq!(queue.error_count(), 0);
}

#[test]
fn emit_error_returns_guarantee() {
    let mut queue = DiagnosticQueue::new();
    let _guarantee: ErrorGuaranteed = queue.emit_error(stale_at(4));
    assert_eq!(queue.peek().count(), 1);
}
