//! Structural checks on incoming function bodies.
//!
//! The analyses index blocks and locals directly, so malformed input is
//! rejected here first. A function with any problem is skipped by every
//! later pass and reported as an internal error.

use rustc_hash::FxHashSet;

use crate::graph::successor_block_ids;
use crate::ir::{
    BlockId, CheckFunction, LocalId, LocalKind, Operand, Program, Rvalue, SiteId, Stmt, Terminator,
};
use crate::problem::IrProblem;

/// Validate every function of a program.
pub fn validate_program(program: &Program) -> Vec<IrProblem> {
    let mut problems = Vec::new();
    let mut seen = FxHashSet::default();
    for func in &program.functions {
        if !seen.insert(func.name) {
            problems.push(IrProblem::DuplicateFunction {
                function: func.name,
            });
        }
        problems.extend(validate_function(func));
    }
    problems
}

/// Validate one function body.
pub fn validate_function(func: &CheckFunction) -> Vec<IrProblem> {
    let mut v = Validator {
        func,
        problems: Vec::new(),
    };
    v.run();
    v.problems
}

struct Validator<'a> {
    func: &'a CheckFunction,
    problems: Vec<IrProblem>,
}

impl Validator<'_> {
    fn run(&mut self) {
        let func = self.func;
        if func.blocks.is_empty() {
            self.problems.push(IrProblem::NoBlocks {
                function: func.name,
            });
            return;
        }
        if func.entry.index() >= func.blocks.len() {
            self.problems.push(IrProblem::EntryOutOfRange {
                function: func.name,
                entry: func.entry,
            });
        }
        for &param in &func.params {
            self.local(None, param);
        }

        for (index, block) in func.blocks.iter().enumerate() {
            if block.id.index() != index {
                self.problems.push(IrProblem::BlockIdMismatch {
                    function: func.name,
                    index,
                    found: block.id,
                });
            }
            if func.spans.get(index).map(Vec::len) != Some(block.body.len()) {
                self.problems.push(IrProblem::SpanTableMismatch {
                    function: func.name,
                    block: block.id,
                });
            }
            for target in successor_block_ids(&block.terminator) {
                if target.index() >= func.blocks.len() {
                    self.problems.push(IrProblem::UnknownTarget {
                        function: func.name,
                        block: block.id,
                        target,
                    });
                }
            }
            if let Terminator::Branch { cond, .. } = block.terminator {
                self.local(None, cond);
            }
            for (i, stmt) in block.body.iter().enumerate() {
                self.stmt(SiteId::at(BlockId::from_index(index), i), stmt);
            }
        }
    }

    fn stmt(&mut self, site: SiteId, stmt: &Stmt) {
        for local in stmt.used_locals().into_iter().chain(stmt.defined_locals()) {
            self.local(Some(site), local);
        }
        match stmt {
            Stmt::Insert { dst, arena } => {
                if self.kind(*dst).is_some_and(|k| k.arena() != Some(*arena)) {
                    self.mismatch(site, *dst, "a handle into the inserted arena");
                }
            }
            Stmt::Remove { handle } | Stmt::Access { handle, .. } => {
                self.expect_handle(site, *handle);
            }
            Stmt::ValidityTest { dst, handle } => {
                self.expect_handle(site, *handle);
                if self.kind(*dst).is_some_and(|k| k != LocalKind::Bool) {
                    self.mismatch(site, *dst, "a boolean");
                }
            }
            Stmt::Index { array, index } => {
                if self
                    .kind(*array)
                    .is_some_and(|k| !matches!(k, LocalKind::Array { .. }))
                {
                    self.mismatch(site, *array, "an array");
                }
                if let Operand::Local(idx) = index {
                    if self.kind(*idx).is_some_and(|k| !k.is_int()) {
                        self.mismatch(site, *idx, "an integer");
                    }
                }
            }
            Stmt::Assign {
                dst,
                value: Rvalue::Len(array),
            } => {
                if self
                    .kind(*array)
                    .is_some_and(|k| !matches!(k, LocalKind::Array { .. }))
                {
                    self.mismatch(site, *array, "an array");
                }
                if self.kind(*dst).is_some_and(|k| !k.is_int()) {
                    self.mismatch(site, *dst, "an integer");
                }
            }
            Stmt::Assign {
                dst,
                value: Rvalue::Use(Operand::Local(src)),
            } => {
                let (d, s) = (self.kind(*dst), self.kind(*src));
                if let (Some(d), Some(s)) = (d, s) {
                    if d.arena().is_some() && s.arena().is_some() && d != s {
                        self.mismatch(site, *dst, "a handle into the same arena as its source");
                    }
                }
            }
            Stmt::Clear { .. } | Stmt::Assign { .. } | Stmt::Call { .. } | Stmt::Suspend => {}
        }
    }

    fn kind(&self, local: LocalId) -> Option<LocalKind> {
        self.func.locals.get(local.index()).map(|d| d.kind)
    }

    fn local(&mut self, site: Option<SiteId>, local: LocalId) {
        if local.index() >= self.func.locals.len() {
            self.problems.push(IrProblem::UnknownLocal {
                function: self.func.name,
                site,
                local,
            });
        }
    }

    fn expect_handle(&mut self, site: SiteId, local: LocalId) {
        if self.kind(local).is_some_and(|k| k.arena().is_none()) {
            self.mismatch(site, local, "a handle");
        }
    }

    fn mismatch(&mut self, site: SiteId, local: LocalId, expected: &'static str) {
        self.problems.push(IrProblem::KindMismatch {
            function: self.func.name,
            site: Some(site),
            local,
            expected,
        });
    }
}
