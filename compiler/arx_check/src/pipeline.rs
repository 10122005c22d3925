//! Whole-program driver.
//!
//! Ordering matters in one place only: effect inference must finish before
//! any per-function pass, because typestate and coalescing consult callee
//! effects and summaries. After that every function is independent and may
//! run on the rayon pool.

use arx_diagnostic::{Diagnostic, DiagnosticQueue, DiagnosticSeverity, ErrorGuaranteed};
use arx_ir::Name;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::annotate::{BoundsAnnotation, CheckAnnotation, HoverInfo};
use crate::coalesce::coalesce_checks;
use crate::config::CheckConfig;
use crate::effects::{infer_effects, EffectAnalysis};
use crate::graph::ControlFlow;
use crate::interval::{check_bounds, BoundsStatus, IntervalStats};
use crate::ir::{CheckFunction, Program};
use crate::problem::{BoundsProblem, HandleProblem};
use crate::reporting::{
    report_bounds_problem, report_effect_problem, report_handle_problem, report_ir_problem,
};
use crate::summary::{summarize, FunctionSummary, Summaries};
use crate::typestate::analyze_handles;
use crate::validate::validate_program;

/// Everything the analyses concluded about one function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionReport {
    pub name: Name,
    /// One annotation per generation-check site, in site order.
    pub checks: Vec<CheckAnnotation>,
    /// One annotation per index site, in site order.
    pub bounds: Vec<BoundsAnnotation>,
    pub hover: Vec<HoverInfo>,
    pub summary: FunctionSummary,
    pub interval_stats: IntervalStats,
}

impl FunctionReport {
    /// Generation checks the backend must still emit.
    pub fn runtime_checks(&self) -> usize {
        self.checks.iter().filter(|c| c.status.is_retained()).count()
    }

    /// Bounds checks the backend must still emit.
    pub fn runtime_bounds_checks(&self) -> usize {
        self.bounds
            .iter()
            .filter(|b| !b.status.is_eliminated())
            .count()
    }
}

/// Result of [`check_program`].
#[derive(Clone, Debug, Default)]
pub struct ProgramReport {
    /// Reports for every well-formed function, in program order.
    pub functions: Vec<FunctionReport>,
    /// Sorted by position.
    pub diagnostics: Vec<Diagnostic>,
    pub error_count: usize,
}

impl ProgramReport {
    /// Proof that compilation must stop, if it must.
    pub fn has_errors(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count)
    }

    pub fn function(&self, name: Name) -> Option<&FunctionReport> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Total generation checks left in the program.
    pub fn runtime_checks(&self) -> usize {
        self.functions.iter().map(FunctionReport::runtime_checks).sum()
    }

    /// Summaries for callers in other compilation units.
    pub fn summaries(&self) -> impl Iterator<Item = &FunctionSummary> {
        self.functions.iter().map(|f| &f.summary)
    }
}

struct FunctionOutcome {
    report: FunctionReport,
    handle_problems: Vec<HandleProblem>,
    bounds_problems: Vec<BoundsProblem>,
}

/// Run every analysis over a program and collect the results.
///
/// Malformed functions are reported (E9001) and skipped; the rest are
/// analyzed as if the skipped ones were external and unknown.
pub fn check_program(program: &Program, config: &CheckConfig) -> ProgramReport {
    let mut queue = DiagnosticQueue::new();

    let ir_problems = validate_program(program);
    let malformed: FxHashSet<Name> = ir_problems.iter().map(|p| p.function()).collect();
    for problem in &ir_problems {
        queue.add(report_ir_problem(problem, program), DiagnosticSeverity::Hard);
    }
    let functions: Vec<&CheckFunction> = program
        .functions
        .iter()
        .filter(|f| !malformed.contains(&f.name))
        .collect();

    let effects = infer_effects(functions.iter().copied(), &program.externs);
    let summaries = summarize(functions.iter().copied(), &effects);

    let outcomes: Vec<FunctionOutcome> = if config.parallel {
        functions
            .par_iter()
            .map(|func| analyze_function(func, &effects, &summaries, config))
            .collect()
    } else {
        functions
            .iter()
            .map(|func| analyze_function(func, &effects, &summaries, config))
            .collect()
    };

    for problem in &effects.problems {
        queue.add(
            report_effect_problem(problem, program),
            DiagnosticSeverity::Hard,
        );
    }
    for (func, outcome) in functions.iter().zip(&outcomes) {
        for problem in &outcome.handle_problems {
            queue.add(
                report_handle_problem(problem, func, &program.interner),
                DiagnosticSeverity::Hard,
            );
        }
        if config.report_retained_bounds {
            for problem in &outcome.bounds_problems {
                // Notes never count as errors, so queueing them as hard only
                // keeps them from being dropped after a real error.
                queue.add(
                    report_bounds_problem(problem, func, &program.interner),
                    DiagnosticSeverity::Hard,
                );
            }
        }
    }

    let diagnostics = queue.flush();
    let error_count = diagnostics.iter().filter(|d| d.is_error()).count();
    let functions: Vec<FunctionReport> = outcomes.into_iter().map(|o| o.report).collect();

    tracing::debug!(
        functions = functions.len(),
        skipped = malformed.len(),
        errors = error_count,
        runtime_checks = functions.iter().map(FunctionReport::runtime_checks).sum::<usize>(),
        "program checked"
    );

    ProgramReport {
        functions,
        diagnostics,
        error_count,
    }
}

fn analyze_function(
    func: &CheckFunction,
    effects: &EffectAnalysis,
    summaries: &Summaries,
    config: &CheckConfig,
) -> FunctionOutcome {
    let cfg = ControlFlow::build(func);
    let typestate = analyze_handles(func, &cfg, effects, summaries);
    let summary = summaries
        .get(&func.name)
        .cloned()
        .unwrap_or_else(|| FunctionSummary::compute(func, effects));
    let checks = coalesce_checks(func, &cfg, &typestate.checks, &summary, config);

    let (verdicts, interval_stats) = check_bounds(func, &cfg, config);
    let mut bounds = Vec::with_capacity(verdicts.len());
    let mut bounds_problems = Vec::new();
    for (site, array, index, verdict) in verdicts {
        if let BoundsStatus::Retained(reason) = verdict.status {
            bounds_problems.push(BoundsProblem {
                function: func.name,
                site,
                array,
                index,
                interval: verdict.interval,
                reason,
            });
        }
        bounds.push(BoundsAnnotation {
            site,
            array,
            status: verdict.status,
            interval: verdict.interval,
        });
    }

    let report = FunctionReport {
        name: func.name,
        checks,
        bounds,
        hover: typestate.hover,
        summary,
        interval_stats,
    };
    tracing::debug!(
        function = func.name.raw(),
        blocks = func.blocks.len(),
        loops = cfg.loop_count(),
        checks = report.checks.len(),
        retained = report.runtime_checks(),
        bounds = report.bounds.len(),
        bounds_retained = report.runtime_bounds_checks(),
        stale = typestate.problems.len(),
        "function analyzed"
    );

    FunctionOutcome {
        report,
        handle_problems: typestate.problems,
        bounds_problems,
    }
}
