//! Handle-safety analyses for the Arx compiler.
//!
//! Arx stores graph-shaped data in generational arenas (see `arx_pool`).
//! A handle is a plain `(index, generation)` pair, so every access through
//! one needs a runtime generation check. This crate proves as many of those
//! checks redundant as it can, and rejects programs that provably use a
//! stale handle.
//!
//! This crate provides:
//!
//! - **Control-flow model** ([`ir`]): basic blocks of arena-tagged
//!   statements, the input handed over by the surrounding compiler, plus a
//!   [`validate`] pass that rejects malformed input.
//!
//! - **Handle typestate** ([`typestate`]): a forward dataflow over the
//!   [`lattice::Typestate`] lattice (`Invalid < Unknown < Valid < Fresh`)
//!   with must-alias tracking ([`alias`]), so removing one copy of a handle
//!   invalidates all of them.
//!
//! - **Effects** ([`effects`]): call-graph fixpoint inferring which
//!   functions grow or shrink arenas, and enforcement of `frozen` contexts.
//!
//! - **Intervals** ([`interval`]): demand-driven range analysis that
//!   removes array bounds checks.
//!
//! - **Coalescing** ([`coalesce`]): collapses repeated generation checks on
//!   the same handle into one. Never changes program behavior, only how many
//!   checks run, so it can be switched off ([`CheckConfig::coalesce`]).
//!
//! # Pipeline
//!
//! [`check_program`] validates, infers effects for the whole program, then
//! runs typestate, intervals and coalescing per function (in parallel when
//! [`CheckConfig::parallel`] is set). Findings become diagnostics
//! ([`reporting`]); per-site verdicts become annotations ([`annotate`]).
//!
//! # Crate Dependencies
//!
//! `arx_check` depends on `arx_ir` (for `Name`, `Span`, the interner) and
//! `arx_diagnostic` (for `Diagnostic` and the queue). It has no backend
//! dependency; the annotations are backend-independent.

pub mod alias;
pub mod annotate;
pub mod coalesce;
pub mod config;
pub mod effects;
pub mod graph;
pub mod interval;
pub mod ir;
pub mod lattice;
pub mod pipeline;
pub mod problem;
pub mod reporting;
pub mod summary;
pub mod typestate;
pub mod validate;

#[cfg(test)]
mod test_helpers;

use std::sync::Once;

pub use annotate::{
    annotations_json, BoundsAnnotation, CheckAnnotation, CheckKind, CheckStatus, HoverInfo,
};
pub use config::CheckConfig;
pub use effects::{infer_effects, EffectAnalysis, EffectContext, EffectSet};
pub use graph::ControlFlow;
pub use interval::{check_bounds, BoundsStatus, Interval, RetainReason};
pub use ir::{CheckFunction, Program};
pub use lattice::Typestate;
pub use pipeline::{check_program, FunctionReport, ProgramReport};
pub use problem::{BoundsProblem, EffectProblem, HandleProblem, IrProblem};
pub use summary::{summarize, FunctionSummary, Summaries};
pub use typestate::analyze_handles;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=arx_check=debug` or `RUST_LOG=arx_check=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
