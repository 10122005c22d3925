//! Per-function summaries exported to callers.
//!
//! A summary is everything a caller needs without looking at the body:
//! the effect set, the effective context, and which handle parameters the
//! caller must check before the call. A parameter requires a check when the
//! callee is frozen, never overwrites the parameter, never suspends, and
//! accesses the parameter on every path from entry to return. The caller's
//! check then fails exactly when the callee's first access would, so moving
//! it changes where the fault is raised but not whether. With coalescing
//! enabled the callee runs with no checks on that parameter at all; with it
//! disabled both sides keep their checks.

use arx_ir::Name;
use rustc_hash::FxHashMap;

use crate::effects::{EffectAnalysis, EffectContext, EffectSet};
use crate::graph::successor_block_ids;
use crate::ir::{CheckFunction, LocalId, Stmt};

/// Summaries of every analyzed function, keyed by name.
pub type Summaries = FxHashMap<Name, FunctionSummary>;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionSummary {
    pub name: Name,
    /// Inferred effects of the body, callees included.
    pub effects: EffectSet,
    /// Declared context, or the narrowest one the body needs.
    pub context: EffectContext,
    /// Indexed like the parameter list. `true` only for handle parameters.
    pub param_requires_check: Vec<bool>,
}

impl FunctionSummary {
    pub fn compute(func: &CheckFunction, effects: &EffectAnalysis) -> Self {
        let (body, context) = effects
            .function(func.name)
            .map_or((EffectSet::all(), EffectContext::Mutable), |f| {
                (f.body, f.context)
            });
        let hoist = context == EffectContext::Frozen && !func.has_suspend();
        let param_requires_check = func
            .params
            .iter()
            .map(|&p| {
                hoist
                    && func.arena_of(p).is_some()
                    && !func.is_redefined(p)
                    && accessed_on_every_path(func, p)
            })
            .collect();
        FunctionSummary {
            name: func.name,
            effects: body,
            context,
            param_requires_check,
        }
    }

    /// Whether the caller must check argument `index` before the call.
    pub fn requires_check(&self, index: usize) -> bool {
        self.param_requires_check.get(index).copied().unwrap_or(false)
    }

    /// Parameters the caller checks on this function's behalf.
    pub fn checked_params<'f>(
        &'f self,
        func: &'f CheckFunction,
    ) -> impl Iterator<Item = LocalId> + 'f {
        func.params
            .iter()
            .zip(&self.param_requires_check)
            .filter(|&(_, &req)| req)
            .map(|(&p, _)| p)
    }
}

/// Whether every path from entry to a return accesses `param`.
///
/// Least fixpoint of `ant(b) = accesses(b) || (b has successors && all
/// successors ant)`, so paths that never terminate do not count as accessing.
fn accessed_on_every_path(func: &CheckFunction, param: LocalId) -> bool {
    let mut ant: Vec<bool> = func
        .blocks
        .iter()
        .map(|b| {
            b.body
                .iter()
                .any(|s| matches!(s, Stmt::Access { handle, .. } if *handle == param))
        })
        .collect();
    let mut changed = true;
    while changed {
        changed = false;
        for (i, block) in func.blocks.iter().enumerate() {
            if ant[i] {
                continue;
            }
            let succs = successor_block_ids(&block.terminator);
            if !succs.is_empty() && succs.iter().all(|s| ant.get(s.index()) == Some(&true)) {
                ant[i] = true;
                changed = true;
            }
        }
    }
    ant.get(func.entry.index()).copied().unwrap_or(false)
}

/// Summarize every function.
pub fn summarize<'a>(
    functions: impl IntoIterator<Item = &'a CheckFunction>,
    effects: &EffectAnalysis,
) -> Summaries {
    functions
        .into_iter()
        .map(|f| (f.name, FunctionSummary::compute(f, effects)))
        .collect()
}

#[cfg(test)]
mod tests {
    use arx_ir::Name;
    use pretty_assertions::assert_eq;
    use rustc_hash::FxHashMap;

    use super::{summarize, FunctionSummary};
    use crate::effects::{infer_effects, EffectContext, EffectSet};
    use crate::ir::Terminator;
    use crate::test_helpers::{
        access, block, boolean, branch, copy, goto, handle, insert, int, l, make_func_named,
        opaque, A0,
    };

    fn frozen_reader() -> crate::ir::CheckFunction {
        make_func_named(
            Name::from_raw(2),
            Some(EffectContext::Frozen),
            &[0, 1],
            vec![handle(A0), int(), handle(A0)],
            vec![block(0, vec![access(0), copy(2, 0)], Terminator::Return)],
        )
    }

    #[test]
    fn frozen_handle_params_require_check() {
        let func = frozen_reader();
        let effects = infer_effects([&func], &FxHashMap::default());
        let summary = FunctionSummary::compute(&func, &effects);
        assert_eq!(summary.context, EffectContext::Frozen);
        assert_eq!(summary.effects, EffectSet::ACCESS);
        assert_eq!(summary.param_requires_check, vec![true, false]);
        assert!(!summary.requires_check(7));
    }

    #[test]
    fn mutable_function_hoists_nothing() {
        let mut func = frozen_reader();
        func.context = Some(EffectContext::Mutable);
        func.blocks[0].body.push(insert(2, A0));
        func.spans[0].push(None);
        let effects = infer_effects([&func], &FxHashMap::default());
        let summaries = summarize([&func], &effects);
        let summary = &summaries[&func.name];
        assert_eq!(summary.context, EffectContext::Mutable);
        assert_eq!(summary.param_requires_check, vec![false, false]);
        assert_eq!(summary.checked_params(&func).count(), 0);
    }

    #[test]
    fn redefined_param_not_hoisted() {
        let mut func = frozen_reader();
        func.blocks[0].body.push(copy(0, 2));
        func.spans[0].push(None);
        let effects = infer_effects([&func], &FxHashMap::default());
        let summary = FunctionSummary::compute(&func, &effects);
        assert_eq!(summary.param_requires_check, vec![false, false]);
    }

    #[test]
    fn checked_params_lists_locals() {
        let func = frozen_reader();
        let effects = infer_effects([&func], &FxHashMap::default());
        let summary = FunctionSummary::compute(&func, &effects);
        assert_eq!(summary.checked_params(&func).collect::<Vec<_>>(), vec![l(0)]);
    }

    /// Frozen function over one handle and a flag, with `then`/`else`
    /// bodies joining at a return block.
    fn frozen_branches(
        then_body: Vec<crate::ir::Stmt>,
        else_body: Vec<crate::ir::Stmt>,
    ) -> crate::ir::CheckFunction {
        make_func_named(
            Name::from_raw(3),
            Some(EffectContext::Frozen),
            &[0],
            vec![handle(A0), boolean()],
            vec![
                block(0, vec![opaque(1)], branch(1, 1, 2)),
                block(1, then_body, goto(3)),
                block(2, else_body, goto(3)),
                block(3, vec![], Terminator::Return),
            ],
        )
    }

    fn hoisted(func: &crate::ir::CheckFunction) -> Vec<bool> {
        let effects = infer_effects([func], &FxHashMap::default());
        FunctionSummary::compute(func, &effects).param_requires_check
    }

    #[test]
    fn untouched_param_not_hoisted() {
        let func = make_func_named(
            Name::from_raw(4),
            Some(EffectContext::Frozen),
            &[0],
            vec![handle(A0)],
            vec![block(0, vec![], Terminator::Return)],
        );
        assert_eq!(hoisted(&func), vec![false]);
    }

    #[test]
    fn param_accessed_on_one_branch_not_hoisted() {
        assert_eq!(hoisted(&frozen_branches(vec![access(0)], vec![])), vec![false]);
        assert_eq!(hoisted(&frozen_branches(vec![], vec![access(0)])), vec![false]);
    }

    #[test]
    fn param_accessed_on_both_branches_hoisted() {
        assert_eq!(
            hoisted(&frozen_branches(vec![access(0)], vec![access(0)])),
            vec![true]
        );
    }

    #[test]
    fn access_only_inside_loop_body_not_hoisted() {
        // bb1 loops through bb2 (which accesses) or exits to bb3.
        let func = make_func_named(
            Name::from_raw(5),
            Some(EffectContext::Frozen),
            &[0],
            vec![handle(A0), boolean()],
            vec![
                block(0, vec![], goto(1)),
                block(1, vec![opaque(1)], branch(1, 2, 3)),
                block(2, vec![access(0)], goto(1)),
                block(3, vec![], Terminator::Return),
            ],
        );
        assert_eq!(hoisted(&func), vec![false]);
    }

    #[test]
    fn endless_loop_never_counts_as_access() {
        let func = make_func_named(
            Name::from_raw(6),
            Some(EffectContext::Frozen),
            &[0],
            vec![handle(A0)],
            vec![block(0, vec![], goto(0))],
        );
        assert_eq!(hoisted(&func), vec![false]);
    }
}
