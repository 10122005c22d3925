//! Shared builders for analysis tests. Only compiled in test builds.

use arx_ir::{Name, Span};

use crate::effects::EffectContext;
use crate::ir::{
    AccessKind, ArenaId, Block, BlockId, CheckFunction, CmpOp, LocalDecl, LocalId, LocalKind,
    Operand, Rvalue, Stmt, Terminator, Visibility,
};

/// Shorthand for `LocalId::new(n)`.
pub(crate) fn l(n: u32) -> LocalId {
    LocalId::new(n)
}

/// Shorthand for `BlockId::new(n)`.
pub(crate) fn b(n: u32) -> BlockId {
    BlockId::new(n)
}

pub(crate) const A0: ArenaId = ArenaId::new(0);
pub(crate) const A1: ArenaId = ArenaId::new(1);

pub(crate) fn handle(arena: ArenaId) -> LocalDecl {
    LocalDecl {
        kind: LocalKind::Handle { arena },
        name: None,
    }
}

pub(crate) fn int() -> LocalDecl {
    LocalDecl {
        kind: LocalKind::Int { unsigned: false },
        name: None,
    }
}

pub(crate) fn uint() -> LocalDecl {
    LocalDecl {
        kind: LocalKind::Int { unsigned: true },
        name: None,
    }
}

pub(crate) fn array(len: Option<u32>) -> LocalDecl {
    LocalDecl {
        kind: LocalKind::Array { len },
        name: None,
    }
}

pub(crate) fn boolean() -> LocalDecl {
    LocalDecl {
        kind: LocalKind::Bool,
        name: None,
    }
}

pub(crate) fn block(id: u32, body: Vec<Stmt>, terminator: Terminator) -> Block {
    Block {
        id: b(id),
        body,
        terminator,
    }
}

/// Build a private function with no declared context named `Name::from_raw(1)`.
pub(crate) fn make_func(params: &[u32], locals: Vec<LocalDecl>, blocks: Vec<Block>) -> CheckFunction {
    make_func_named(Name::from_raw(1), None, params, locals, blocks)
}

/// Build a function with an explicit name and declared context.
///
/// A declared context makes it public. Statement spans are synthesized as
/// `block * 100 + stmt * 10 .. +5` so diagnostics have distinct positions.
pub(crate) fn make_func_named(
    name: Name,
    context: Option<EffectContext>,
    params: &[u32],
    locals: Vec<LocalDecl>,
    blocks: Vec<Block>,
) -> CheckFunction {
    let spans = blocks
        .iter()
        .map(|bl| {
            (0..bl.body.len())
                .map(|i| {
                    #[expect(clippy::cast_possible_truncation, reason = "test bodies are tiny")]
                    let start = bl.id.raw() * 100 + i as u32 * 10 + 10;
                    Some(Span::new(start, start + 5))
                })
                .collect()
        })
        .collect();
    CheckFunction {
        name,
        visibility: if context.is_some() {
            Visibility::Public
        } else {
            Visibility::Private
        },
        context,
        params: params.iter().map(|&p| l(p)).collect(),
        locals,
        blocks,
        entry: b(0),
        span: Span::new(0, 8),
        spans,
    }
}

// ── Statement shorthands ────────────────────────────────────────────

pub(crate) fn insert(dst: u32, arena: ArenaId) -> Stmt {
    Stmt::Insert { dst: l(dst), arena }
}

pub(crate) fn remove(h: u32) -> Stmt {
    Stmt::Remove { handle: l(h) }
}

pub(crate) fn access(h: u32) -> Stmt {
    Stmt::Access {
        handle: l(h),
        field: 0,
        kind: AccessKind::Write,
    }
}

pub(crate) fn copy(dst: u32, src: u32) -> Stmt {
    Stmt::Assign {
        dst: l(dst),
        value: Rvalue::Use(Operand::Local(l(src))),
    }
}

pub(crate) fn opaque(dst: u32) -> Stmt {
    Stmt::Assign {
        dst: l(dst),
        value: Rvalue::Opaque,
    }
}

pub(crate) fn constant(dst: u32, value: i64) -> Stmt {
    Stmt::Assign {
        dst: l(dst),
        value: Rvalue::Use(Operand::Const(value)),
    }
}

pub(crate) fn compare(dst: u32, op: CmpOp, lhs: Operand, rhs: Operand) -> Stmt {
    Stmt::Assign {
        dst: l(dst),
        value: Rvalue::Compare { op, lhs, rhs },
    }
}

pub(crate) fn local(n: u32) -> Operand {
    Operand::Local(l(n))
}

pub(crate) fn goto(target: u32) -> Terminator {
    Terminator::Goto { target: b(target) }
}

pub(crate) fn branch(cond: u32, then_block: u32, else_block: u32) -> Terminator {
    Terminator::Branch {
        cond: l(cond),
        then_block: b(then_block),
        else_block: b(else_block),
    }
}
