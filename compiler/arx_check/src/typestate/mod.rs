//! Handle typestate with must-alias tracking.
//!
//! One forward pass in reverse postorder. Each block's entry state is the
//! meet of its forward predecessors' exit states; back edges are never
//! followed. A loop header instead applies a summary of its loop body to
//! the pre-loop state: every local the loop overwrites drops to at most
//! `Unknown`, and every proven handle of an arena the loop structurally
//! mutates widens to `Unknown`. That keeps the pass at one visit per block
//! while staying sound for every iteration.
//!
//! # Transfer rules
//!
//! | Statement | State | Aliases |
//! |---|---|---|
//! | `h = insert` | `h := Fresh`, others in the arena widen | `h` isolated |
//! | `access(h)` | error if `Invalid`; then at least `Valid` | unchanged |
//! | `remove(h)` | `h` and its aliases `Invalid`, others widen | class dissolved |
//! | `clear` | every handle of the arena `Invalid` | classes dissolved |
//! | `h2 = h1` | copies state and invalidation origin | `h2` joins `h1` |
//! | other `h = ..` | `Unknown` | `h` isolated |
//! | call | checked arguments as accesses; exclusive arena with structural effects widens | exclusive arena classes dissolved |
//! | suspend | every proven handle widens | unchanged |
//!
//! A `contains(h)` test narrows `h` to `Valid` along the branch edge taken
//! when it succeeds. Narrowing is not propagated to aliases.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::alias::MustAlias;
use crate::annotate::{CheckKind, HoverInfo};
use crate::effects::EffectAnalysis;
use crate::graph::ControlFlow;
use crate::ir::{
    ArenaId, BlockId, CheckFunction, LocalId, Operand, PassMode, Rvalue, SiteId, Stmt, Terminator,
};
use crate::lattice::Typestate;
use crate::problem::{HandleProblem, Invalidation, InvalidationCause};
use crate::summary::Summaries;

/// One generation-check site as the typestate pass saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckFact {
    pub site: SiteId,
    pub handle: LocalId,
    pub kind: CheckKind,
    /// State of `handle` just before the site.
    pub state: Typestate,
    /// Must-aliases of `handle` just before the site.
    pub aliases: SmallVec<[LocalId; 4]>,
    /// `false` for sites in blocks no path reaches.
    pub reachable: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TypestateResult {
    /// Every check site, in site order.
    pub checks: Vec<CheckFact>,
    pub hover: Vec<HoverInfo>,
    pub problems: Vec<HandleProblem>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Tracked {
    state: Typestate,
    /// Set while `state` is `Invalid`.
    origin: Option<Invalidation>,
}

impl Tracked {
    const UNKNOWN: Tracked = Tracked {
        state: Typestate::Unknown,
        origin: None,
    };

    fn meet(self, other: Tracked) -> Tracked {
        if other.state < self.state {
            other
        } else {
            self
        }
    }

    fn widen(&mut self) {
        self.state = self.state.widen();
    }

    /// A check on this handle just succeeded.
    fn validate(&mut self) {
        if self.state < Typestate::Valid {
            *self = Tracked {
                state: Typestate::Valid,
                origin: None,
            };
        }
    }
}

/// Abstract state at one program point.
#[derive(Clone, Debug)]
struct FlowState {
    /// Indexed by local. Non-handle locals stay `Unknown` and are ignored.
    handles: Vec<Tracked>,
    aliases: MustAlias,
}

impl FlowState {
    fn entry(func: &CheckFunction) -> Self {
        FlowState {
            handles: vec![Tracked::UNKNOWN; func.locals.len()],
            aliases: MustAlias::new(func.locals.len()),
        }
    }

    fn get(&self, local: LocalId) -> Tracked {
        self.handles
            .get(local.index())
            .copied()
            .unwrap_or(Tracked::UNKNOWN)
    }

    fn set(&mut self, local: LocalId, tracked: Tracked) {
        if let Some(slot) = self.handles.get_mut(local.index()) {
            *slot = tracked;
        }
    }

    fn meet(&self, other: &FlowState) -> FlowState {
        FlowState {
            handles: self
                .handles
                .iter()
                .zip(&other.handles)
                .map(|(&a, &b)| a.meet(b))
                .collect(),
            aliases: self.aliases.meet(&other.aliases),
        }
    }

    /// Widen every handle into `arena` except `keep`.
    fn widen_arena(&mut self, func: &CheckFunction, arena: ArenaId, keep: Option<LocalId>) {
        for (local, a) in func.handle_locals() {
            if a == arena && Some(local) != keep {
                self.handles[local.index()].widen();
            }
        }
    }

    fn widen_all(&mut self) {
        for tracked in &mut self.handles {
            tracked.widen();
        }
    }

    /// `local` was overwritten with something untracked.
    fn reset(&mut self, local: LocalId) {
        self.set(local, Tracked::UNKNOWN);
        self.aliases.kill(local);
    }
}

/// What a loop body may do, applied at its header.
#[derive(Default)]
struct LoopSummary {
    defined: FxHashSet<LocalId>,
    mutated_arenas: FxHashSet<ArenaId>,
    suspends: bool,
}

impl LoopSummary {
    fn compute(
        func: &CheckFunction,
        cfg: &ControlFlow,
        effects: &EffectAnalysis,
        header: BlockId,
    ) -> Self {
        let mut summary = LoopSummary::default();
        for block in cfg.loop_body(header) {
            for stmt in &func.block(block).body {
                summary.defined.extend(stmt.defined_locals());
                if matches!(stmt, Stmt::Suspend) {
                    summary.suspends = true;
                }
                summary
                    .mutated_arenas
                    .extend(structurally_mutated(func, effects, stmt));
            }
        }
        summary
    }

    fn apply(&self, func: &CheckFunction, state: &mut FlowState) {
        for (local, arena) in func.handle_locals() {
            let tracked = &mut state.handles[local.index()];
            if self.defined.contains(&local) {
                if tracked.state > Typestate::Unknown {
                    *tracked = Tracked::UNKNOWN;
                }
                state.aliases.kill(local);
            } else if self.suspends || self.mutated_arenas.contains(&arena) {
                tracked.widen();
            }
        }
    }
}

/// Arenas a statement may grow or shrink.
fn structurally_mutated(
    func: &CheckFunction,
    effects: &EffectAnalysis,
    stmt: &Stmt,
) -> SmallVec<[ArenaId; 2]> {
    match stmt {
        Stmt::Insert { arena, .. } | Stmt::Clear { arena } => SmallVec::from_elem(*arena, 1),
        Stmt::Remove { handle } => func.arena_of(*handle).into_iter().collect(),
        Stmt::Call { callee, arenas, .. } => {
            if effects.callee_effects(*callee, arenas).is_structural() {
                arenas
                    .iter()
                    .filter(|r| r.mode == PassMode::Exclusive)
                    .map(|r| r.arena)
                    .collect()
            } else {
                SmallVec::new()
            }
        }
        _ => SmallVec::new(),
    }
}

/// Whether `stmt` may invalidate a generation check on a handle into
/// `arena`, regardless of what callees actually do.
pub(crate) fn kills_checks(func: &CheckFunction, stmt: &Stmt, arena: ArenaId) -> bool {
    match stmt {
        Stmt::Insert { arena: a, .. } | Stmt::Clear { arena: a } => *a == arena,
        Stmt::Remove { handle } => func.arena_of(*handle) == Some(arena),
        Stmt::Call { arenas, .. } => arenas
            .iter()
            .any(|r| r.arena == arena && r.mode == PassMode::Exclusive),
        Stmt::Suspend => true,
        _ => false,
    }
}

/// A `contains(h)` whose result decides the block's branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NarrowingTest {
    pub site: SiteId,
    pub handle: LocalId,
    /// Successor entered when the test succeeds.
    pub then_block: BlockId,
}

/// The narrowing test at the end of `block`, if its terminator branches on
/// a `contains` result that nothing after the test could have invalidated.
pub(crate) fn narrowing_test(func: &CheckFunction, block: BlockId) -> Option<NarrowingTest> {
    let block_data = func.block(block);
    let Terminator::Branch {
        cond,
        then_block,
        else_block,
    } = block_data.terminator
    else {
        return None;
    };
    if then_block == else_block {
        return None;
    }
    let def = block_data.body.iter().rposition(|s| s.defines(cond))?;
    let Stmt::ValidityTest { handle, .. } = block_data.body[def] else {
        return None;
    };
    let arena = func.arena_of(handle)?;
    let tail = &block_data.body[def + 1..];
    if tail
        .iter()
        .any(|s| s.defines(handle) || kills_checks(func, s, arena))
    {
        return None;
    }
    Some(NarrowingTest {
        site: SiteId::at(block, def),
        handle,
        then_block,
    })
}

struct Analyzer<'a> {
    func: &'a CheckFunction,
    effects: &'a EffectAnalysis,
    summaries: &'a Summaries,
    result: TypestateResult,
}

/// Run typestate and must-alias analysis over one function.
pub fn analyze_handles(
    func: &CheckFunction,
    cfg: &ControlFlow,
    effects: &EffectAnalysis,
    summaries: &Summaries,
) -> TypestateResult {
    let mut analyzer = Analyzer {
        func,
        effects,
        summaries,
        result: TypestateResult::default(),
    };
    let mut exits: Vec<Option<FlowState>> = vec![None; func.blocks.len()];

    for block in cfg.reverse_postorder() {
        let mut state = analyzer.entry_state(cfg, block, &exits);
        for (i, stmt) in func.block(block).body.iter().enumerate() {
            analyzer.transfer(SiteId::at(block, i), stmt, &mut state);
        }
        exits[block.index()] = Some(state);
    }

    analyzer.record_unreachable(cfg);
    let mut result = analyzer.result;
    result.checks.sort_by_key(|c| c.site);
    result.hover.sort_by_key(|h| (h.site, h.local));

    tracing::debug!(
        function = func.name.raw(),
        blocks = func.blocks.len(),
        loops = cfg.loop_count(),
        checks = result.checks.len(),
        errors = result.problems.len(),
        "handle typestate done"
    );
    result
}

impl Analyzer<'_> {
    fn entry_state(
        &self,
        cfg: &ControlFlow,
        block: BlockId,
        exits: &[Option<FlowState>],
    ) -> FlowState {
        let func = self.func;
        let mut merged: Option<FlowState> = None;
        for pred in cfg.forward_predecessors(block) {
            let Some(exit) = &exits[pred.index()] else {
                continue;
            };
            let mut incoming = exit.clone();
            if let Some(test) = narrowing_test(func, pred) {
                if test.then_block == block {
                    let mut tracked = incoming.get(test.handle);
                    tracked.validate();
                    incoming.set(test.handle, tracked);
                }
            }
            merged = Some(match merged {
                None => incoming,
                Some(prev) => prev.meet(&incoming),
            });
        }
        let mut state = merged.unwrap_or_else(|| FlowState::entry(func));

        if cfg.is_loop_header(block) {
            LoopSummary::compute(func, cfg, self.effects, block).apply(func, &mut state);
        }
        state
    }

    fn transfer(&mut self, site: SiteId, stmt: &Stmt, state: &mut FlowState) {
        let func = self.func;
        self.record_hover(site, stmt, state, true);

        match stmt {
            Stmt::Insert { dst, arena } => {
                state.widen_arena(func, *arena, Some(*dst));
                state.set(
                    *dst,
                    Tracked {
                        state: Typestate::Fresh,
                        origin: None,
                    },
                );
                state.aliases.kill(*dst);
            }
            Stmt::Remove { handle } => {
                self.check(site, *handle, CheckKind::Remove, state);
                if let Some(arena) = func.arena_of(*handle) {
                    state.widen_arena(func, arena, None);
                }
                let aliases = state.aliases.aliases_of(*handle);
                let origin = Invalidation {
                    site,
                    cause: InvalidationCause::Removed,
                    via: None,
                };
                state.set(
                    *handle,
                    Tracked {
                        state: Typestate::Invalid,
                        origin: Some(origin),
                    },
                );
                state.aliases.kill(*handle);
                for alias in aliases {
                    state.set(
                        alias,
                        Tracked {
                            state: Typestate::Invalid,
                            origin: Some(Invalidation {
                                via: Some(*handle),
                                ..origin
                            }),
                        },
                    );
                    state.aliases.kill(alias);
                }
            }
            Stmt::Clear { arena } => {
                let origin = Invalidation {
                    site,
                    cause: InvalidationCause::Cleared,
                    via: None,
                };
                for (local, a) in func.handle_locals() {
                    if a == *arena {
                        state.set(
                            local,
                            Tracked {
                                state: Typestate::Invalid,
                                origin: Some(origin),
                            },
                        );
                        state.aliases.kill(local);
                    }
                }
            }
            Stmt::Access { handle, .. } => {
                self.check(site, *handle, CheckKind::Access, state);
            }
            Stmt::Assign { dst, value } => {
                if func.arena_of(*dst).is_none() {
                    return;
                }
                match value {
                    Rvalue::Use(Operand::Local(src)) if func.arena_of(*src).is_some() => {
                        state.set(*dst, state.get(*src));
                        state.aliases.copy(*dst, *src);
                    }
                    _ => state.reset(*dst),
                }
            }
            Stmt::Call { arenas, .. } => {
                for (handle, kind) in check_sites(func, self.summaries, stmt) {
                    self.check(site, handle, kind, state);
                }
                for arena in structurally_mutated(func, self.effects, stmt) {
                    state.widen_arena(func, arena, None);
                }
                for r in arenas.iter().filter(|r| r.mode == PassMode::Exclusive) {
                    tracing::trace!(%site, arena = %r.arena, "alias precision lost across call");
                    state
                        .aliases
                        .kill_where(|local| func.arena_of(local) == Some(r.arena));
                }
                for local in stmt.defined_locals() {
                    if func.arena_of(local).is_some() {
                        state.reset(local);
                    }
                }
            }
            Stmt::Suspend => state.widen_all(),
            Stmt::ValidityTest { .. } | Stmt::Index { .. } => {}
        }

        self.record_hover(site, stmt, state, false);
    }

    /// A runtime generation check on `handle` happens here.
    fn check(&mut self, site: SiteId, handle: LocalId, kind: CheckKind, state: &mut FlowState) {
        let mut tracked = state.get(handle);
        if tracked.state == Typestate::Invalid {
            let invalidation = tracked.origin.unwrap_or(Invalidation {
                site,
                cause: InvalidationCause::Removed,
                via: None,
            });
            self.result.problems.push(HandleProblem::StaleHandleAccess {
                function: self.func.name,
                site,
                handle,
                kind,
                invalidation,
            });
        }
        self.result.checks.push(CheckFact {
            site,
            handle,
            kind,
            state: tracked.state,
            aliases: state.aliases.aliases_of(handle),
            reachable: true,
        });
        tracked.validate();
        state.set(handle, tracked);
    }

    /// Hover records: handles read by `stmt` before it runs, handles it
    /// writes after.
    fn record_hover(&mut self, site: SiteId, stmt: &Stmt, state: &FlowState, before: bool) {
        let locals = if before {
            stmt.used_locals()
        } else {
            stmt.defined_locals().into_iter().collect()
        };
        for local in locals {
            if self.func.arena_of(local).is_none() {
                continue;
            }
            if before && stmt.defines(local) {
                continue;
            }
            self.result.hover.push(HoverInfo {
                site,
                local,
                state: state.get(local).state,
                aliases: state.aliases.aliases_of(local),
            });
        }
    }

    /// Check sites in unreachable blocks keep their checks and never error.
    fn record_unreachable(&mut self, cfg: &ControlFlow) {
        let func = self.func;
        for block in &func.blocks {
            if cfg.is_reachable(block.id) {
                continue;
            }
            for (i, stmt) in block.body.iter().enumerate() {
                let site = SiteId::at(block.id, i);
                for (handle, kind) in check_sites(func, self.summaries, stmt) {
                    self.result.checks.push(CheckFact {
                        site,
                        handle,
                        kind,
                        state: Typestate::Unknown,
                        aliases: SmallVec::new(),
                        reachable: false,
                    });
                }
            }
        }
    }
}

/// Generation checks a statement performs.
pub(crate) fn check_sites(
    func: &CheckFunction,
    summaries: &Summaries,
    stmt: &Stmt,
) -> SmallVec<[(LocalId, CheckKind); 2]> {
    match stmt {
        Stmt::Access { handle, .. } => SmallVec::from_elem((*handle, CheckKind::Access), 1),
        Stmt::Remove { handle } => SmallVec::from_elem((*handle, CheckKind::Remove), 1),
        Stmt::Call { callee, args, .. } => {
            let Some(summary) = summaries.get(callee) else {
                return SmallVec::new();
            };
            args.iter()
                .enumerate()
                .filter(|(i, arg)| summary.requires_check(*i) && func.arena_of(arg.value).is_some())
                .map(|(i, arg)| {
                    let index = u32::try_from(i).unwrap_or(u32::MAX);
                    (arg.value, CheckKind::CallArgument { index })
                })
                .collect()
        }
        _ => SmallVec::new(),
    }
}
