//! Control-flow model the analyses run on.
//!
//! A function body is a list of basic blocks. Each block holds sequential
//! [`Stmt`]s and ends in a [`Terminator`]. Every arena operation is already
//! classified by the frontend: insertion, removal, clear, in-place field
//! access, validity test, or a call passing arenas by shared or exclusive
//! reference. Locals are not SSA; a local may be assigned many times.
//!
//! The model is read-only for every pass. Results are reported per
//! [`SiteId`] (block + statement index) instead of rewriting the body.

use std::fmt;

use arx_ir::{Name, Span, StringInterner};
use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use crate::effects::{EffectContext, EffectSet};

// ── ID newtypes ─────────────────────────────────────────────────────

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Index for `Vec` lookups.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Build from a `Vec` position.
            ///
            /// # Panics
            ///
            /// Panics if `index` does not fit in `u32`.
            #[inline]
            pub fn from_index(index: usize) -> Self {
                Self(
                    u32::try_from(index)
                        .unwrap_or_else(|_| panic!("{} index exceeds u32::MAX", $prefix)),
                )
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

define_id!(
    /// A local variable slot within one function.
    LocalId,
    "_"
);
define_id!(
    /// A basic block within one function.
    BlockId,
    "bb"
);
define_id!(
    /// Identifies one arena (one `Pool` value) a handle type points into.
    ArenaId,
    "arena"
);

/// A statement position: `block` + index into its body.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SiteId {
    pub block: BlockId,
    pub stmt: u32,
}

impl SiteId {
    #[inline]
    pub const fn new(block: BlockId, stmt: u32) -> Self {
        SiteId { block, stmt }
    }

    /// Build from a body position.
    ///
    /// # Panics
    ///
    /// Panics if `stmt` does not fit in `u32`.
    #[inline]
    pub fn at(block: BlockId, stmt: usize) -> Self {
        let stmt =
            u32::try_from(stmt).unwrap_or_else(|_| panic!("statement index exceeds u32::MAX"));
        SiteId { block, stmt }
    }

    #[inline]
    pub const fn stmt_index(self) -> usize {
        self.stmt as usize
    }
}

impl fmt::Debug for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.block, self.stmt)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── Locals ──────────────────────────────────────────────────────────

/// What a local holds, as far as the analyses care.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocalKind {
    /// A handle into `arena`.
    Handle { arena: ArenaId },
    /// An integer. Unsigned integers are known to be `>= 0`.
    Int { unsigned: bool },
    /// An indexable array or slice. `len` is set for fixed-size arrays.
    Array { len: Option<u32> },
    Bool,
    Other,
}

impl LocalKind {
    pub fn arena(self) -> Option<ArenaId> {
        match self {
            LocalKind::Handle { arena } => Some(arena),
            _ => None,
        }
    }

    pub fn is_int(self) -> bool {
        matches!(self, LocalKind::Int { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocalDecl {
    pub kind: LocalKind,
    /// Source name, if the local is user-visible.
    pub name: Option<Name>,
}

// ── Operands and values ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    Local(LocalId),
    Const(i64),
}

impl Operand {
    pub fn local(self) -> Option<LocalId> {
        match self {
            Operand::Local(l) => Some(l),
            Operand::Const(_) => None,
        }
    }
}

/// Arithmetic operators the interval analysis models. Everything else
/// (division, bit operations, shifts) is `Other` and yields an unknown range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    /// The operator that holds when this one does not.
    pub fn negate(self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
        }
    }

    /// The operator with operands swapped: `a < b` iff `b > a`.
    pub fn flip(self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
            CmpOp::Eq | CmpOp::Ne => self,
        }
    }
}

/// Right-hand side of an assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rvalue {
    /// Copy of an operand. For handle locals this is a handle copy.
    Use(Operand),
    Binary {
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    Compare {
        op: CmpOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// Length of an array local.
    Len(LocalId),
    /// A value the analyses cannot see into (field load, cast, ...).
    Opaque,
}

// ── Statements ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

/// How a value is handed to a callee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassMode {
    /// By value. Handles are plain copies.
    Copy,
    /// By shared reference.
    Shared,
    /// By exclusive reference; the callee may overwrite or resize it.
    Exclusive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallArg {
    pub value: LocalId,
    pub mode: PassMode,
}

/// An arena the callee can reach, and how.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArenaRef {
    pub arena: ArenaId,
    pub mode: PassMode,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stmt {
    /// `dst = arena.insert(..)`
    Insert { dst: LocalId, arena: ArenaId },
    /// `arena.remove(handle)`
    Remove { handle: LocalId },
    /// `arena.clear()`
    Clear { arena: ArenaId },
    /// Checked field read or write through `handle`.
    Access {
        handle: LocalId,
        field: u32,
        kind: AccessKind,
    },
    /// `dst = arena.contains(handle)`
    ValidityTest { dst: LocalId, handle: LocalId },
    Assign { dst: LocalId, value: Rvalue },
    /// Bounds-checked `array[index]`.
    Index { array: LocalId, index: Operand },
    Call {
        dst: Option<LocalId>,
        callee: Name,
        args: Vec<CallArg>,
        arenas: Vec<ArenaRef>,
    },
    /// Cooperative suspension point (`await`, `yield`).
    Suspend,
}

impl Stmt {
    /// Locals this statement may overwrite.
    ///
    /// Arguments passed by exclusive reference count as definitions: the
    /// callee is free to store a new value into them.
    pub fn defined_locals(&self) -> SmallVec<[LocalId; 2]> {
        match self {
            Stmt::Insert { dst, .. }
            | Stmt::ValidityTest { dst, .. }
            | Stmt::Assign { dst, .. } => smallvec![*dst],
            Stmt::Call { dst, args, .. } => {
                let mut defs: SmallVec<[LocalId; 2]> = dst.iter().copied().collect();
                defs.extend(
                    args.iter()
                        .filter(|a| a.mode == PassMode::Exclusive)
                        .map(|a| a.value),
                );
                defs
            }
            Stmt::Remove { .. }
            | Stmt::Clear { .. }
            | Stmt::Access { .. }
            | Stmt::Index { .. }
            | Stmt::Suspend => SmallVec::new(),
        }
    }

    /// Whether this statement may overwrite `local`.
    pub fn defines(&self, local: LocalId) -> bool {
        self.defined_locals().contains(&local)
    }

    /// Every local read by this statement.
    pub fn used_locals(&self) -> SmallVec<[LocalId; 4]> {
        fn operand(out: &mut SmallVec<[LocalId; 4]>, op: Operand) {
            if let Operand::Local(l) = op {
                out.push(l);
            }
        }

        let mut out = SmallVec::new();
        match self {
            Stmt::Remove { handle }
            | Stmt::Access { handle, .. }
            | Stmt::ValidityTest { handle, .. } => out.push(*handle),
            Stmt::Assign { value, .. } => match *value {
                Rvalue::Use(op) => operand(&mut out, op),
                Rvalue::Binary { lhs, rhs, .. } | Rvalue::Compare { lhs, rhs, .. } => {
                    operand(&mut out, lhs);
                    operand(&mut out, rhs);
                }
                Rvalue::Len(array) => out.push(array),
                Rvalue::Opaque => {}
            },
            Stmt::Index { array, index } => {
                out.push(*array);
                operand(&mut out, *index);
            }
            Stmt::Call { args, .. } => out.extend(args.iter().map(|a| a.value)),
            Stmt::Insert { .. } | Stmt::Clear { .. } | Stmt::Suspend => {}
        }
        out
    }
}

// ── Terminators and blocks ──────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Terminator {
    Goto {
        target: BlockId,
    },
    /// Two-way branch on a boolean local.
    Branch {
        cond: LocalId,
        then_block: BlockId,
        else_block: BlockId,
    },
    Return,
    Unreachable,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    pub id: BlockId,
    pub body: Vec<Stmt>,
    pub terminator: Terminator,
}

// ── Functions ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Private,
}

/// One function body plus the metadata the analyses need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckFunction {
    pub name: Name,
    pub visibility: Visibility,
    /// Declared effect context. Required for public functions.
    pub context: Option<EffectContext>,
    /// Parameter locals, in call-argument order.
    pub params: Vec<LocalId>,
    /// Declaration of every local, indexed by `LocalId::index()`.
    pub locals: Vec<LocalDecl>,
    /// Basic blocks in definition order. `blocks[entry.index()]` is the entry.
    pub blocks: Vec<Block>,
    pub entry: BlockId,
    /// Span of the function signature.
    pub span: Span,
    /// Source spans, indexed by `[block_index][stmt_index]`.
    pub spans: Vec<Vec<Option<Span>>>,
}

impl CheckFunction {
    pub fn new(name: Name, visibility: Visibility, context: Option<EffectContext>) -> Self {
        CheckFunction {
            name,
            visibility,
            context,
            params: Vec::new(),
            locals: Vec::new(),
            blocks: Vec::new(),
            entry: BlockId::new(0),
            span: Span::DUMMY,
            spans: Vec::new(),
        }
    }

    /// Declare a new local and return its id.
    pub fn add_local(&mut self, kind: LocalKind, name: Option<Name>) -> LocalId {
        let id = LocalId::from_index(self.locals.len());
        self.locals.push(LocalDecl { kind, name });
        id
    }

    /// Declare a new parameter local.
    pub fn add_param(&mut self, kind: LocalKind, name: Option<Name>) -> LocalId {
        let id = self.add_local(kind, name);
        self.params.push(id);
        id
    }

    /// Append a block. Its id must be the next sequential index.
    ///
    /// # Panics
    ///
    /// Debug-panics if `block.id` does not match the expected index.
    pub fn push_block(&mut self, block: Block) {
        debug_assert_eq!(
            block.id.index(),
            self.blocks.len(),
            "block id {} does not match expected index {}",
            block.id,
            self.blocks.len(),
        );
        self.spans.push(vec![None; block.body.len()]);
        self.blocks.push(block);
    }

    pub fn next_block_id(&self) -> BlockId {
        BlockId::from_index(self.blocks.len())
    }

    /// Kind of a local. Out-of-range ids (rejected by validation) read as `Other`.
    #[inline]
    pub fn local_kind(&self, local: LocalId) -> LocalKind {
        self.locals
            .get(local.index())
            .map_or(LocalKind::Other, |decl| decl.kind)
    }

    /// Arena a handle local points into.
    #[inline]
    pub fn arena_of(&self, local: LocalId) -> Option<ArenaId> {
        self.local_kind(local).arena()
    }

    pub fn is_param(&self, local: LocalId) -> bool {
        self.params.contains(&local)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn stmt(&self, site: SiteId) -> &Stmt {
        &self.blocks[site.block.index()].body[site.stmt_index()]
    }

    /// Source span of a statement, falling back to the function span.
    pub fn span_of(&self, site: SiteId) -> Span {
        self.spans
            .get(site.block.index())
            .and_then(|b| b.get(site.stmt_index()))
            .copied()
            .flatten()
            .unwrap_or(self.span)
    }

    /// Attach a source span to a statement.
    pub fn set_span(&mut self, site: SiteId, span: Span) {
        if let Some(slot) = self
            .spans
            .get_mut(site.block.index())
            .and_then(|b| b.get_mut(site.stmt_index()))
        {
            *slot = Some(span);
        }
    }

    /// Handle locals, in declaration order.
    pub fn handle_locals(&self) -> impl Iterator<Item = (LocalId, ArenaId)> + '_ {
        self.locals
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.kind.arena().map(|a| (LocalId::from_index(i), a)))
    }

    /// Whether any statement may overwrite `local`.
    pub fn is_redefined(&self, local: LocalId) -> bool {
        self.blocks
            .iter()
            .flat_map(|b| &b.body)
            .any(|s| s.defines(local))
    }

    /// Whether the function contains a cooperative suspension point.
    pub fn has_suspend(&self) -> bool {
        self.blocks
            .iter()
            .flat_map(|b| &b.body)
            .any(|s| matches!(s, Stmt::Suspend))
    }

    /// Iterate all statements with their sites.
    pub fn sites(&self) -> impl Iterator<Item = (SiteId, &Stmt)> + '_ {
        self.blocks.iter().flat_map(|block| {
            block
                .body
                .iter()
                .enumerate()
                .map(move |(i, stmt)| (SiteId::at(block.id, i), stmt))
        })
    }

    /// User-visible name of a local, or its id.
    pub fn local_name(&self, local: LocalId, interner: &StringInterner) -> String {
        match self.locals.get(local.index()).and_then(|d| d.name) {
            Some(name) => interner.lookup(name).to_owned(),
            None => local.to_string(),
        }
    }
}

/// Every function of one compilation unit, plus the effect sets of
/// functions defined elsewhere.
pub struct Program {
    pub functions: Vec<CheckFunction>,
    /// Effect sets of external functions, keyed by name.
    pub externs: FxHashMap<Name, EffectSet>,
    pub interner: StringInterner,
}

impl Program {
    pub fn new(interner: StringInterner) -> Self {
        Program {
            functions: Vec::new(),
            externs: FxHashMap::default(),
            interner,
        }
    }

    pub fn function(&self, name: Name) -> Option<&CheckFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new(StringInterner::new())
    }
}

#[cfg(test)]
mod tests;
