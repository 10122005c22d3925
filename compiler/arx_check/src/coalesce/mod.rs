//! Generation-check coalescing.
//!
//! Decides, per check site, whether the runtime generation check is needed.
//! A forward pass tracks *available checks*: `avail[h] = s` means every path
//! to this point ran the check at `s` on `h` (or on a must-alias of `h`) and
//! nothing since could have invalidated it. A later check on `h` is then
//! `CoalescedInto(s)`.
//!
//! Availability is killed by:
//! - overwriting the local;
//! - insert, remove or clear on the same arena;
//! - a call taking the arena by exclusive reference;
//! - a suspension point (kills everything).
//!
//! Block entry is the intersection of every predecessor's exit, keeping an
//! entry only when all predecessors agree on the origin. Loop headers start
//! empty, so nothing coalesces across a back edge. The success edge of a
//! `contains(h)` branch makes the test itself the available check.
//!
//! Independently of availability:
//! - a `Fresh` handle needs no check;
//! - in a frozen function, a handle rooted in a parameter the callers check
//!   needs no check;
//! - a handle proven `Invalid` keeps its check (it is a compile error anyway).
//!
//! With coalescing disabled every site keeps its check.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::annotate::{CheckAnnotation, CheckStatus};
use crate::config::CheckConfig;
use crate::effects::EffectContext;
use crate::graph::ControlFlow;
use crate::ir::{BlockId, CheckFunction, LocalId, SiteId};
use crate::lattice::Typestate;
use crate::summary::FunctionSummary;
use crate::typestate::{kills_checks, narrowing_test, CheckFact};

type Avail = FxHashMap<LocalId, SiteId>;

/// Annotate every check site with its status. Output follows `facts` order.
pub fn coalesce_checks(
    func: &CheckFunction,
    cfg: &ControlFlow,
    facts: &[CheckFact],
    summary: &FunctionSummary,
    config: &CheckConfig,
) -> Vec<CheckAnnotation> {
    let mut statuses = vec![CheckStatus::Retained; facts.len()];
    if config.coalesce {
        Coalescer {
            func,
            cfg,
            facts,
            roots: frozen_roots(func, summary),
            statuses: &mut statuses,
        }
        .run();
    }

    let annotations: Vec<CheckAnnotation> = facts
        .iter()
        .zip(statuses)
        .map(|(fact, status)| CheckAnnotation {
            site: fact.site,
            handle: fact.handle,
            kind: fact.kind,
            status,
        })
        .collect();

    tracing::debug!(
        function = func.name.raw(),
        sites = annotations.len(),
        retained = annotations.iter().filter(|a| a.status.is_retained()).count(),
        coalesce = config.coalesce,
        "generation checks annotated"
    );
    annotations
}

/// Parameters whose validity the callers guarantee for the whole body.
fn frozen_roots(func: &CheckFunction, summary: &FunctionSummary) -> FxHashSet<LocalId> {
    if summary.context != EffectContext::Frozen {
        return FxHashSet::default();
    }
    summary.checked_params(func).collect()
}

struct Coalescer<'a> {
    func: &'a CheckFunction,
    cfg: &'a ControlFlow,
    facts: &'a [CheckFact],
    roots: FxHashSet<LocalId>,
    statuses: &'a mut [CheckStatus],
}

impl Coalescer<'_> {
    fn run(&mut self) {
        let mut by_site: FxHashMap<SiteId, SmallVec<[usize; 1]>> = FxHashMap::default();
        for (i, fact) in self.facts.iter().enumerate() {
            by_site.entry(fact.site).or_default().push(i);
        }

        let func = self.func;
        let mut exits: Vec<Option<Avail>> = vec![None; func.blocks.len()];
        let order: Vec<BlockId> = self.cfg.reverse_postorder().collect();
        for block in order {
            let mut avail = self.entry_avail(block, &exits);
            for (i, stmt) in func.block(block).body.iter().enumerate() {
                let site = SiteId::at(block, i);
                if let Some(indices) = by_site.get(&site) {
                    for &fact_index in indices {
                        self.decide(fact_index, &mut avail);
                    }
                }

                let defined = stmt.defined_locals();
                avail.retain(|local, _| {
                    !defined.contains(local)
                        && func
                            .arena_of(*local)
                            .is_some_and(|arena| !kills_checks(func, stmt, arena))
                });
            }
            exits[block.index()] = Some(avail);
        }
    }

    fn entry_avail(&self, block: BlockId, exits: &[Option<Avail>]) -> Avail {
        if self.cfg.is_loop_header(block) {
            return Avail::default();
        }
        let mut merged: Option<Avail> = None;
        for pred in self.cfg.predecessors(block) {
            if !self.cfg.is_reachable(pred) {
                continue;
            }
            // Non-headers have only forward predecessors, all visited.
            let Some(exit) = &exits[pred.index()] else {
                return Avail::default();
            };
            let mut incoming = exit.clone();
            if let Some(test) = narrowing_test(self.func, pred) {
                if test.then_block == block {
                    incoming.insert(test.handle, test.site);
                }
            }
            merged = Some(match merged {
                None => incoming,
                Some(mut prev) => {
                    prev.retain(|local, origin| incoming.get(local) == Some(origin));
                    prev
                }
            });
        }
        merged.unwrap_or_default()
    }

    fn decide(&mut self, fact_index: usize, avail: &mut Avail) {
        let fact = &self.facts[fact_index];
        let status = if !fact.reachable || fact.state == Typestate::Invalid {
            CheckStatus::Retained
        } else if fact.state == Typestate::Fresh || self.is_frozen_rooted(fact) {
            CheckStatus::Eliminated
        } else if let Some(&origin) = avail.get(&fact.handle) {
            CheckStatus::CoalescedInto(origin)
        } else {
            avail.insert(fact.handle, fact.site);
            for &alias in &fact.aliases {
                avail.insert(alias, fact.site);
            }
            CheckStatus::Retained
        };
        tracing::trace!(site = %fact.site, handle = %fact.handle, %status, "check decided");
        self.statuses[fact_index] = status;
    }

    fn is_frozen_rooted(&self, fact: &CheckFact) -> bool {
        self.roots.contains(&fact.handle) || fact.aliases.iter().any(|a| self.roots.contains(a))
    }
}
