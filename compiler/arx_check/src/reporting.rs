//! Turn analysis problems into diagnostics.
//!
//! Each problem kind renders in one function. Spans come from the
//! function's span table; names from the program interner.

use arx_diagnostic::{Diagnostic, ErrorCode, Suggestion};
use arx_ir::{Name, Span, StringInterner};

use crate::annotate::CheckKind;
use crate::effects::EffectSet;
use crate::ir::{CheckFunction, Operand, Program, Stmt};
use crate::problem::{BoundsProblem, EffectProblem, HandleProblem, InvalidationCause, IrProblem};

fn quoted(interner: &StringInterner, name: Name) -> String {
    format!("`{}`", interner.lookup(name))
}

/// E5001.
pub fn report_handle_problem(
    problem: &HandleProblem,
    func: &CheckFunction,
    interner: &StringInterner,
) -> Diagnostic {
    let HandleProblem::StaleHandleAccess {
        site,
        handle,
        kind,
        invalidation,
        ..
    } = problem;
    let name = func.local_name(*handle, interner);
    let message = match kind {
        CheckKind::Access => format!("use of stale handle `{name}`"),
        CheckKind::Remove => format!("removal of already-stale handle `{name}`"),
        CheckKind::CallArgument { index } => {
            let callee = match func.stmt(*site) {
                Stmt::Call { callee, .. } => quoted(interner, *callee),
                _ => "the callee".to_owned(),
            };
            format!("stale handle `{name}` passed as argument {index} to {callee}")
        }
    };
    let cause = match invalidation.cause {
        InvalidationCause::Removed => {
            let removed = invalidation.via.map_or_else(
                || name.clone(),
                |via| func.local_name(via, interner),
            );
            format!("`{removed}` removed here")
        }
        InvalidationCause::Cleared => "arena cleared here".to_owned(),
    };

    let mut diag = Diagnostic::error(ErrorCode::E5001)
        .with_message(message)
        .with_label(func.span_of(*site), format!("`{name}` may be stale here"))
        .with_secondary_label(func.span_of(invalidation.site), cause);
    if let Some(via) = invalidation.via {
        diag = diag.with_note(format!(
            "`{name}` holds the same handle as `{}`",
            func.local_name(via, interner)
        ));
    }
    diag.with_note("the slot's generation changed, so every copy of the handle is stale")
        .with_suggestion(format!(
            "guard the use with `contains({name})`, or obtain a fresh handle from `insert`"
        ))
}

/// E5002 and E5003.
pub fn report_effect_problem(problem: &EffectProblem, program: &Program) -> Diagnostic {
    let interner = &program.interner;
    match problem {
        EffectProblem::FrozenContextViolation {
            function,
            site,
            effects,
            callee,
        } => {
            let span = program
                .function(*function)
                .map_or(Span::DUMMY, |f| f.span_of(*site));
            let what = describe_structural(*effects);
            let message = match callee {
                Some(callee) => format!(
                    "call to {} may {what} an arena from frozen function {}",
                    quoted(interner, *callee),
                    quoted(interner, *function)
                ),
                None => format!(
                    "frozen function {} may not {what} an arena",
                    quoted(interner, *function)
                ),
            };
            Diagnostic::error(ErrorCode::E5002)
                .with_message(message)
                .with_label(span, format!("performs {effects}"))
                .with_note("a frozen function may only read and write existing slots, for its whole extent")
                .with_suggestion(format!(
                    "declare {} mutable, or move the structural change out of it",
                    quoted(interner, *function)
                ))
        }
        EffectProblem::MissingEffectContext { function, inferred } => {
            let span = program.function(*function).map_or(Span::DUMMY, |f| f.span);
            Diagnostic::error(ErrorCode::E5003)
                .with_message(format!(
                    "public function {} has no declared effect context",
                    quoted(interner, *function)
                ))
                .with_label(span, "context required here")
                .with_note("public signatures must not depend on what private helpers happen to do")
                .with_structured_suggestion(Suggestion::maybe_incorrect(
                    format!("the body needs `{inferred}`"),
                    span,
                    inferred.as_str(),
                ))
        }
    }
}

fn describe_structural(effects: EffectSet) -> &'static str {
    match (
        effects.contains(EffectSet::GROW),
        effects.contains(EffectSet::SHRINK),
    ) {
        (true, true) => "grow or shrink",
        (true, false) => "grow",
        _ => "shrink",
    }
}

/// W5001.
pub fn report_bounds_problem(
    problem: &BoundsProblem,
    func: &CheckFunction,
    interner: &StringInterner,
) -> Diagnostic {
    let array = func.local_name(problem.array, interner);
    let index = match problem.index {
        Operand::Local(l) => func.local_name(l, interner),
        Operand::Const(c) => c.to_string(),
    };
    Diagnostic::note(ErrorCode::W5001)
        .with_message(format!("bounds check on `{array}[{index}]` retained"))
        .with_label(
            func.span_of(problem.site),
            format!("`{index}` is in {}", problem.interval),
        )
        .with_note(problem.reason.as_str())
}

/// E9001.
pub fn report_ir_problem(problem: &IrProblem, program: &Program) -> Diagnostic {
    let interner = &program.interner;
    let func = program.function(problem.function());
    let span = match (func, problem.site()) {
        (Some(f), Some(site)) => f.span_of(site),
        (Some(f), _) => f.span,
        (None, _) => Span::DUMMY,
    };
    let detail = match problem {
        IrProblem::NoBlocks { .. } => "function has no blocks".to_owned(),
        IrProblem::EntryOutOfRange { entry, .. } => format!("entry block {entry} does not exist"),
        IrProblem::BlockIdMismatch { index, found, .. } => {
            format!("block at position {index} is labeled {found}")
        }
        IrProblem::UnknownTarget { block, target, .. } => {
            format!("{block} jumps to missing block {target}")
        }
        IrProblem::UnknownLocal { local, .. } => format!("local {local} is not declared"),
        IrProblem::KindMismatch {
            local, expected, ..
        } => format!("local {local} should be {expected}"),
        IrProblem::SpanTableMismatch { block, .. } => {
            format!("span table does not match the statements of {block}")
        }
        IrProblem::DuplicateFunction { .. } => "function is defined more than once".to_owned(),
    };
    Diagnostic::error(ErrorCode::E9001)
        .with_message(format!(
            "malformed input for {}: {detail}",
            quoted(interner, problem.function())
        ))
        .with_label(span, "skipped by handle analysis")
        .with_note("this is a bug in the compiler frontend, not in the program")
}
