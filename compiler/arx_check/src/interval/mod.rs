//! Demand-driven interval analysis for bounds-check elimination.
//!
//! Nothing is computed up front. A query asks for the range of one local
//! just before one statement; the analysis walks backward to the reaching
//! definition, and through block entries to predecessor edges, applying
//! interval arithmetic on the way. Conditional edges refine the range with
//! the branch comparison.
//!
//! # Loops
//!
//! A loop header's entry value is a fixpoint. The header starts at
//! [`Interval::BOTTOM`] as an *assumption*; re-entering the header while it
//! is being solved returns the assumption. Each round joins the new
//! incoming value, and after `widening_limit` rounds every moving bound is
//! widened to infinity, which converges in at most two more rounds.
//!
//! # Caching
//!
//! * `cache` holds final values computed with no assumption in flight.
//! * `scratch` holds values computed under the current assumptions. It is
//!   dropped whenever an assumption changes and promoted to `cache` once
//!   the outermost header is solved.
//!
//! # Budget
//!
//! Each query gets `interval_fuel` steps. Running out marks the query timed
//! out, returns the widest range for every pending value, and caches
//! nothing. The check is then retained.

mod bound;

use std::fmt;

pub use bound::{Bound, Interval};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::CheckConfig;
use crate::graph::ControlFlow;
use crate::ir::{
    BinOp, BlockId, CheckFunction, LocalId, LocalKind, Operand, Rvalue, SiteId, Stmt, Terminator,
};

/// Minimum stack space to keep available before recursing further.
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Queries recurse once per block on the backward path.
#[inline]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// Extra rounds allowed after widening starts before giving up on a header.
const WIDENING_GRACE: u32 = 4;

/// Why a bounds check was kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetainReason {
    /// The index range is not provably inside the array.
    Unproven,
    /// The query ran out of fuel.
    Timeout,
    /// The array may be replaced inside the function, so its length is
    /// not a stable bound.
    ArrayMutated,
}

impl RetainReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RetainReason::Unproven => "index range not provably within bounds",
            RetainReason::Timeout => "range analysis ran out of budget",
            RetainReason::ArrayMutated => "array may be reassigned, so its length is not stable",
        }
    }
}

impl fmt::Display for RetainReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one index site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundsStatus {
    Eliminated,
    Retained(RetainReason),
}

impl BoundsStatus {
    pub fn is_eliminated(self) -> bool {
        matches!(self, BoundsStatus::Eliminated)
    }
}

/// Result of one bounds query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundsVerdict {
    pub status: BoundsStatus,
    /// Range found for the index. `TOP` on timeout.
    pub interval: Interval,
}

/// Counters for one function's queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntervalStats {
    pub queries: u32,
    /// Fixpoint rounds run at loop headers.
    pub header_rounds: u32,
    pub timeouts: u32,
}

type Key = (LocalId, BlockId);

/// Range queries over one function.
pub struct IntervalAnalysis<'a> {
    func: &'a CheckFunction,
    cfg: &'a ControlFlow,
    widening_limit: u32,
    fuel_budget: u32,
    fuel: u32,
    timed_out: bool,
    /// Arrays whose length cannot change within the function.
    stable_arrays: FxHashSet<LocalId>,
    cache: FxHashMap<Key, Interval>,
    scratch: FxHashMap<Key, Interval>,
    assumptions: FxHashMap<Key, Interval>,
    pub stats: IntervalStats,
}

impl<'a> IntervalAnalysis<'a> {
    pub fn new(func: &'a CheckFunction, cfg: &'a ControlFlow, config: &CheckConfig) -> Self {
        let stable_arrays = func
            .locals
            .iter()
            .enumerate()
            .filter(|(_, d)| matches!(d.kind, LocalKind::Array { .. }))
            .map(|(i, _)| LocalId::from_index(i))
            .filter(|&arr| !func.is_redefined(arr))
            .collect();
        IntervalAnalysis {
            func,
            cfg,
            widening_limit: config.widening_limit,
            fuel_budget: config.interval_fuel,
            fuel: config.interval_fuel,
            timed_out: false,
            stable_arrays,
            cache: FxHashMap::default(),
            scratch: FxHashMap::default(),
            assumptions: FxHashMap::default(),
            stats: IntervalStats::default(),
        }
    }

    /// Decide whether `array[index]` at `site` needs its bounds check.
    pub fn check_index(&mut self, site: SiteId, array: LocalId, index: Operand) -> BoundsVerdict {
        let interval = self.query(index, site);
        if self.timed_out {
            tracing::trace!(%site, "interval query timed out");
            return BoundsVerdict {
                status: BoundsStatus::Retained(RetainReason::Timeout),
                interval: Interval::TOP,
            };
        }

        let fixed_len = match self.func.local_kind(array) {
            LocalKind::Array { len } => len,
            _ => None,
        };
        let status = if interval.within_len(array, fixed_len) {
            BoundsStatus::Eliminated
        } else if fixed_len.is_none() && !self.stable_arrays.contains(&array) {
            BoundsStatus::Retained(RetainReason::ArrayMutated)
        } else {
            BoundsStatus::Retained(RetainReason::Unproven)
        };
        BoundsVerdict { status, interval }
    }

    /// Whether `local` provably never holds `value` just before `site`.
    ///
    /// Used for niche-encoding decisions. A timeout answers `false`.
    pub fn excludes(&mut self, local: LocalId, site: SiteId, value: i64) -> bool {
        let interval = self.query(Operand::Local(local), site);
        !self.timed_out && interval.excludes(value)
    }

    /// Range of `operand` just before `site`.
    pub fn interval_at(&mut self, operand: Operand, site: SiteId) -> Interval {
        let interval = self.query(operand, site);
        if self.timed_out {
            Interval::TOP
        } else {
            interval
        }
    }

    fn query(&mut self, operand: Operand, site: SiteId) -> Interval {
        self.stats.queries += 1;
        self.fuel = self.fuel_budget;
        self.timed_out = false;
        let result = self.operand_before(operand, site.block, site.stmt_index());
        if self.timed_out {
            self.stats.timeouts += 1;
            self.scratch.clear();
            self.assumptions.clear();
        }
        result
    }

    fn top_for(&self, local: LocalId) -> Interval {
        match self.func.local_kind(local) {
            LocalKind::Int { unsigned: true } | LocalKind::Array { .. } => Interval::NON_NEGATIVE,
            LocalKind::Bool => Interval::new(Bound::Finite(0), Bound::Finite(1)),
            _ => Interval::TOP,
        }
    }

    /// Unsigned results keep their range only when it is provably
    /// non-negative; anything that may wrap is unknown.
    fn clamp(&self, local: LocalId, value: Interval) -> Interval {
        match self.func.local_kind(local) {
            LocalKind::Int { unsigned: true } if !Bound::Finite(0).le(value.lo) => {
                self.top_for(local)
            }
            _ => value,
        }
    }

    fn operand_before(&mut self, operand: Operand, block: BlockId, pos: usize) -> Interval {
        match operand {
            Operand::Const(v) => Interval::constant(v),
            Operand::Local(local) => self.local_before(local, block, pos),
        }
    }

    /// Range of `local` just before statement `pos` of `block`.
    fn local_before(&mut self, local: LocalId, block: BlockId, pos: usize) -> Interval {
        let func = self.func;
        let body = &func.block(block).body;
        let end = pos.min(body.len());
        match body[..end].iter().rposition(|s| s.defines(local)) {
            Some(def) => self.eval_def(local, block, def),
            None => self.entry_value(local, block),
        }
    }

    /// Value `local` receives from the statement at `def`.
    fn eval_def(&mut self, local: LocalId, block: BlockId, def: usize) -> Interval {
        let func = self.func;
        let value = match &func.block(block).body[def] {
            Stmt::Assign { value, .. } => match *value {
                Rvalue::Use(op) => self.operand_before(op, block, def),
                Rvalue::Binary { op, lhs, rhs } => {
                    let l = self.operand_before(lhs, block, def);
                    let r = self.operand_before(rhs, block, def);
                    match op {
                        BinOp::Add => l.add(r),
                        BinOp::Sub => l.sub(r),
                        BinOp::Mul => l.mul(r),
                        BinOp::Other => self.top_for(local),
                    }
                }
                Rvalue::Compare { .. } => Interval::new(Bound::Finite(0), Bound::Finite(1)),
                Rvalue::Len(array) => self.len_of(array),
                Rvalue::Opaque => self.top_for(local),
            },
            Stmt::ValidityTest { .. } => Interval::new(Bound::Finite(0), Bound::Finite(1)),
            _ => self.top_for(local),
        };
        self.clamp(local, value)
    }

    fn len_of(&self, array: LocalId) -> Interval {
        match self.func.local_kind(array) {
            LocalKind::Array { len: Some(n) } => Interval::constant(i64::from(n)),
            LocalKind::Array { len: None } if self.stable_arrays.contains(&array) => {
                Interval::len_of(array)
            }
            _ => Interval::NON_NEGATIVE,
        }
    }

    /// Range of `local` on entry to `block`.
    fn entry_value(&mut self, local: LocalId, block: BlockId) -> Interval {
        if self.fuel == 0 {
            self.timed_out = true;
        }
        if self.timed_out {
            return self.top_for(local);
        }
        self.fuel -= 1;

        if !self.cfg.is_reachable(block) {
            return Interval::BOTTOM;
        }
        let key = (local, block);
        if let Some(&v) = self.cache.get(&key) {
            return v;
        }
        if let Some(&v) = self.scratch.get(&key) {
            return v;
        }
        if let Some(&v) = self.assumptions.get(&key) {
            return v;
        }

        let value = if self.cfg.is_loop_header(block) {
            self.solve_header(local, block)
        } else {
            ensure_sufficient_stack(|| self.merge_incoming(local, block))
        };

        if !self.timed_out {
            if self.assumptions.is_empty() {
                self.cache.insert(key, value);
            } else {
                self.scratch.insert(key, value);
            }
        }
        value
    }

    /// Fixpoint for a loop header with join-then-widen.
    fn solve_header(&mut self, local: LocalId, block: BlockId) -> Interval {
        let key = (local, block);
        let mut current = Interval::BOTTOM;
        let mut round = 0;
        let converged = loop {
            self.assumptions.insert(key, current);
            self.scratch.clear();
            self.stats.header_rounds += 1;

            let incoming = ensure_sufficient_stack(|| self.merge_incoming(local, block));
            if self.timed_out {
                break false;
            }
            let joined = current.join(incoming);
            let next = if round < self.widening_limit {
                joined
            } else {
                current.widen(joined)
            };
            if next == current {
                break true;
            }
            current = next;
            round += 1;
            if round > self.widening_limit + WIDENING_GRACE {
                break false;
            }
        };
        self.assumptions.remove(&key);

        if !converged {
            self.scratch.clear();
            return self.top_for(local);
        }
        tracing::trace!(%local, %block, rounds = round, value = %current, "loop header solved");
        if self.assumptions.is_empty() && !self.timed_out {
            let promoted: Vec<_> = self.scratch.drain().collect();
            self.cache.extend(promoted);
        }
        current
    }

    /// Join of every incoming edge, plus the initial value at the entry.
    fn merge_incoming(&mut self, local: LocalId, block: BlockId) -> Interval {
        let mut value = if block == self.func.entry {
            // Parameters and not-yet-assigned locals alike.
            self.top_for(local)
        } else {
            Interval::BOTTOM
        };
        let preds: Vec<BlockId> = self.cfg.predecessors(block).collect();
        for pred in preds {
            if !self.cfg.is_reachable(pred) {
                continue;
            }
            let edge = self.edge_value(local, pred, block);
            value = value.join(edge);
            if self.timed_out {
                return self.top_for(local);
            }
        }
        value
    }

    /// Value of `local` along the edge `pred -> succ`, refined by the
    /// branch condition when the edge is conditional.
    fn edge_value(&mut self, local: LocalId, pred: BlockId, succ: BlockId) -> Interval {
        let func = self.func;
        let pred_block = func.block(pred);
        let end = pred_block.body.len();
        let value = self.local_before(local, pred, end);

        let Terminator::Branch {
            cond,
            then_block,
            else_block,
        } = pred_block.terminator
        else {
            return value;
        };
        if then_block == else_block {
            return value;
        }
        let Some(def) = pred_block.body.iter().rposition(|s| s.defines(cond)) else {
            return value;
        };
        let Stmt::Assign {
            value: Rvalue::Compare { op, lhs, rhs },
            ..
        } = pred_block.body[def]
        else {
            return value;
        };
        if pred_block.body[def + 1..].iter().any(|s| s.defines(local)) {
            return value;
        }

        let op = if succ == then_block { op } else { op.negate() };
        if lhs == Operand::Local(local) {
            let other = self.operand_before(rhs, pred, def);
            value.refine(op, other)
        } else if rhs == Operand::Local(local) {
            let other = self.operand_before(lhs, pred, def);
            value.refine(op.flip(), other)
        } else {
            value
        }
    }
}

/// Bounds verdicts for every index site of a function, in site order.
pub fn check_bounds(
    func: &CheckFunction,
    cfg: &ControlFlow,
    config: &CheckConfig,
) -> (Vec<(SiteId, LocalId, Operand, BoundsVerdict)>, IntervalStats) {
    let mut analysis = IntervalAnalysis::new(func, cfg, config);
    let mut out = Vec::new();
    for (site, stmt) in func.sites() {
        if let Stmt::Index { array, index } = *stmt {
            let verdict = analysis.check_index(site, array, index);
            out.push((site, array, index, verdict));
        }
    }
    tracing::debug!(
        queries = analysis.stats.queries,
        header_rounds = analysis.stats.header_rounds,
        timeouts = analysis.stats.timeouts,
        eliminated = out.iter().filter(|(.., v)| v.status.is_eliminated()).count(),
        "bounds queries answered"
    );
    (out, analysis.stats)
}
