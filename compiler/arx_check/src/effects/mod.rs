//! Effect inference over the call graph.
//!
//! Every function either performs structural arena mutation or it does not.
//! The three effects are `ACCESS` (read/write an existing slot), `GROW`
//! (insert) and `SHRINK` (remove, clear).
//!
//! # Algorithm
//!
//! 1. **Initialize**: each function's body set is the union of its own
//!    statements' effects, ignoring calls.
//! 2. **Scan**: walk every call; union the callee's *contract* into the
//!    caller's body set. A callee's contract is its declared context when it
//!    has one (public functions must), otherwise its inferred body set.
//! 3. **Iterate** until no set changes.
//!
//! Sets only grow and there are three bits per function, so the loop
//! converges in at most `3 * functions + 1` rounds.
//!
//! Public functions publish only what they declare. That keeps a private
//! helper's footprint from silently changing a public signature.

use std::fmt;

use arx_ir::Name;
use bitflags::bitflags;
use rustc_hash::FxHashMap;

use crate::ir::{ArenaRef, CheckFunction, PassMode, SiteId, Stmt, Visibility};
use crate::problem::EffectProblem;

bitflags! {
    /// What a function may do to arenas it can reach.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct EffectSet: u8 {
        const ACCESS = 1 << 0;
        const GROW = 1 << 1;
        const SHRINK = 1 << 2;
    }
}

impl EffectSet {
    /// Effects that change which handles are valid.
    pub const STRUCTURAL: EffectSet = EffectSet::GROW.union(EffectSet::SHRINK);

    pub fn is_structural(self) -> bool {
        self.intersects(Self::STRUCTURAL)
    }

    /// Effects of a single statement, not counting callees.
    pub fn of_stmt(stmt: &Stmt) -> EffectSet {
        match stmt {
            Stmt::Insert { .. } => EffectSet::GROW,
            Stmt::Remove { .. } | Stmt::Clear { .. } => EffectSet::SHRINK,
            Stmt::Access { .. } | Stmt::ValidityTest { .. } => EffectSet::ACCESS,
            Stmt::Assign { .. } | Stmt::Index { .. } | Stmt::Call { .. } | Stmt::Suspend => {
                EffectSet::empty()
            }
        }
    }

    /// Effects assumed for a callee we know nothing about.
    ///
    /// Without a shared or exclusive arena reference the callee cannot touch
    /// any arena this function sees.
    pub fn for_unknown_callee(arenas: &[ArenaRef]) -> EffectSet {
        arenas.iter().fold(EffectSet::empty(), |acc, r| match r.mode {
            PassMode::Exclusive => acc | EffectSet::all(),
            PassMode::Shared | PassMode::Copy => acc | EffectSet::ACCESS,
        })
    }
}

impl fmt::Display for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "pure");
        }
        let mut first = true;
        for (name, flag) in [
            ("access", EffectSet::ACCESS),
            ("grow", EffectSet::GROW),
            ("shrink", EffectSet::SHRINK),
        ] {
            if self.contains(flag) {
                if !first {
                    write!(f, " + ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Mutation capability of a function scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectContext {
    /// Only `ACCESS`. No structural mutation for the whole dynamic extent.
    Frozen,
    Mutable,
}

impl EffectContext {
    /// Effects a scope with this context may perform.
    pub fn allowed(self) -> EffectSet {
        match self {
            EffectContext::Frozen => EffectSet::ACCESS,
            EffectContext::Mutable => EffectSet::all(),
        }
    }

    pub fn permits(self, effects: EffectSet) -> bool {
        self.allowed().contains(effects)
    }

    /// The narrowest context that permits `effects`.
    pub fn for_effects(effects: EffectSet) -> Self {
        if effects.is_structural() {
            EffectContext::Mutable
        } else {
            EffectContext::Frozen
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EffectContext::Frozen => "frozen",
            EffectContext::Mutable => "mutable",
        }
    }
}

impl fmt::Display for EffectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inference result for one function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionEffects {
    /// Union of everything the body does, callees included.
    pub body: EffectSet,
    /// Declared context, or the narrowest context permitting `body`.
    pub context: EffectContext,
    /// Whether `context` was written by the user.
    pub declared: bool,
    pub visibility: Visibility,
}

impl FunctionEffects {
    /// What callers see.
    pub fn contract(&self) -> EffectSet {
        if self.declared {
            self.context.allowed()
        } else if self.visibility == Visibility::Public {
            // Missing context on a public function is already an error;
            // callers assume the worst.
            EffectSet::all()
        } else {
            self.body
        }
    }
}

/// Effect information for a whole program.
#[derive(Clone, Debug, Default)]
pub struct EffectAnalysis {
    functions: FxHashMap<Name, FunctionEffects>,
    externs: FxHashMap<Name, EffectSet>,
    pub problems: Vec<EffectProblem>,
    /// Fixpoint rounds until convergence.
    pub iterations: usize,
}

impl EffectAnalysis {
    pub fn function(&self, name: Name) -> Option<&FunctionEffects> {
        self.functions.get(&name)
    }

    /// Effects a call statement may perform.
    pub fn callee_effects(&self, callee: Name, arenas: &[ArenaRef]) -> EffectSet {
        callee_view(&self.functions, &self.externs, callee, arenas)
    }

    /// Effects of a statement, callees included.
    pub fn stmt_effects(&self, stmt: &Stmt) -> EffectSet {
        match stmt {
            Stmt::Call { callee, arenas, .. } => self.callee_effects(*callee, arenas),
            _ => EffectSet::of_stmt(stmt),
        }
    }

    /// Effective context of an analyzed function. Unknown functions are mutable.
    pub fn context_of(&self, name: Name) -> EffectContext {
        self.functions
            .get(&name)
            .map_or(EffectContext::Mutable, |f| f.context)
    }
}

fn callee_view(
    functions: &FxHashMap<Name, FunctionEffects>,
    externs: &FxHashMap<Name, EffectSet>,
    callee: Name,
    arenas: &[ArenaRef],
) -> EffectSet {
    if let Some(f) = functions.get(&callee) {
        f.contract()
    } else if let Some(&e) = externs.get(&callee) {
        e
    } else {
        EffectSet::for_unknown_callee(arenas)
    }
}

/// Infer effect sets for a set of (possibly mutually recursive) functions
/// and check declared contexts.
///
/// `externs` supplies the effect sets of functions defined elsewhere.
pub fn infer_effects<'a>(
    functions: impl IntoIterator<Item = &'a CheckFunction>,
    externs: &FxHashMap<Name, EffectSet>,
) -> EffectAnalysis {
    let functions: Vec<&CheckFunction> = functions.into_iter().collect();
    let mut map = initialize(&functions);

    let mut iterations = 0;
    let mut changed = true;
    while changed {
        changed = false;
        iterations += 1;
        for func in &functions {
            let Some(mut body) = map.get(&func.name).map(|f| f.body) else {
                continue;
            };
            for (_, stmt) in func.sites() {
                if let Stmt::Call { callee, arenas, .. } = stmt {
                    body |= callee_view(&map, externs, *callee, arenas);
                }
            }
            if let Some(entry) = map.get_mut(&func.name) {
                if entry.body != body {
                    entry.body = body;
                    if !entry.declared {
                        entry.context = EffectContext::for_effects(body);
                    }
                    changed = true;
                }
            }
        }
    }

    tracing::debug!(
        functions = functions.len(),
        iterations,
        "effect inference converged"
    );

    let mut analysis = EffectAnalysis {
        functions: map,
        externs: externs.clone(),
        problems: Vec::new(),
        iterations,
    };
    for func in &functions {
        check_declared_context(func, &mut analysis);
    }
    analysis
}

fn initialize(functions: &[&CheckFunction]) -> FxHashMap<Name, FunctionEffects> {
    let mut map = FxHashMap::default();
    map.reserve(functions.len());

    for func in functions {
        let body = func
            .sites()
            .fold(EffectSet::empty(), |acc, (_, stmt)| acc | EffectSet::of_stmt(stmt));
        map.insert(
            func.name,
            FunctionEffects {
                body,
                context: func.context.unwrap_or(EffectContext::for_effects(body)),
                declared: func.context.is_some(),
                visibility: func.visibility,
            },
        );
    }

    map
}

fn check_declared_context(func: &CheckFunction, analysis: &mut EffectAnalysis) {
    match func.context {
        None if func.visibility == Visibility::Public => {
            analysis
                .problems
                .push(EffectProblem::MissingEffectContext {
                    function: func.name,
                    inferred: analysis
                        .function(func.name)
                        .map_or(EffectContext::Mutable, |f| {
                            EffectContext::for_effects(f.body)
                        }),
                });
        }
        Some(EffectContext::Frozen) => {
            let mut violations: Vec<(SiteId, EffectSet, Option<Name>)> = Vec::new();
            for (site, stmt) in func.sites() {
                let effects = analysis.stmt_effects(stmt) & EffectSet::STRUCTURAL;
                if !effects.is_empty() {
                    let callee = match stmt {
                        Stmt::Call { callee, .. } => Some(*callee),
                        _ => None,
                    };
                    violations.push((site, effects, callee));
                }
            }
            for (site, effects, callee) in violations {
                analysis
                    .problems
                    .push(EffectProblem::FrozenContextViolation {
                        function: func.name,
                        site,
                        effects,
                        callee,
                    });
            }
        }
        None | Some(EffectContext::Mutable) => {}
    }
}
