//! Analysis findings as plain data.
//!
//! Passes produce problems; [`crate::reporting`] turns them into
//! diagnostics. Keeping the two apart lets tests assert on structure
//! instead of message text.

use arx_ir::Name;

use crate::annotate::CheckKind;
use crate::effects::{EffectContext, EffectSet};
use crate::interval::{Interval, RetainReason};
use crate::ir::{BlockId, LocalId, Operand, SiteId};

/// What made a handle stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvalidationCause {
    Removed,
    Cleared,
}

/// Where a handle became stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Invalidation {
    pub site: SiteId,
    pub cause: InvalidationCause,
    /// The must-alias that was removed, when the stale local was not itself
    /// the removed one.
    pub via: Option<LocalId>,
}

/// Handle typestate findings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HandleProblem {
    /// A checked use of a handle proven `Invalid`.
    StaleHandleAccess {
        function: Name,
        site: SiteId,
        handle: LocalId,
        kind: CheckKind,
        invalidation: Invalidation,
    },
}

/// Effect system findings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EffectProblem {
    /// `GROW`/`SHRINK` reached from a function declared frozen.
    FrozenContextViolation {
        function: Name,
        site: SiteId,
        effects: EffectSet,
        /// Set when the effect comes from a call.
        callee: Option<Name>,
    },
    /// A public function without a declared context.
    MissingEffectContext {
        function: Name,
        /// The context its body would need, offered as a fix.
        inferred: EffectContext,
    },
}

/// A bounds check the interval analysis could not remove.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoundsProblem {
    pub function: Name,
    pub site: SiteId,
    pub array: LocalId,
    pub index: Operand,
    /// Best range found for the index (top on timeout).
    pub interval: Interval,
    pub reason: RetainReason,
}

/// Malformed control-flow input. The function is skipped.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IrProblem {
    NoBlocks {
        function: Name,
    },
    EntryOutOfRange {
        function: Name,
        entry: BlockId,
    },
    BlockIdMismatch {
        function: Name,
        index: usize,
        found: BlockId,
    },
    UnknownTarget {
        function: Name,
        block: BlockId,
        target: BlockId,
    },
    UnknownLocal {
        function: Name,
        site: Option<SiteId>,
        local: LocalId,
    },
    KindMismatch {
        function: Name,
        site: Option<SiteId>,
        local: LocalId,
        expected: &'static str,
    },
    SpanTableMismatch {
        function: Name,
        block: BlockId,
    },
    DuplicateFunction {
        function: Name,
    },
}

impl IrProblem {
    pub fn function(&self) -> Name {
        match self {
            IrProblem::NoBlocks { function }
            | IrProblem::EntryOutOfRange { function, .. }
            | IrProblem::BlockIdMismatch { function, .. }
            | IrProblem::UnknownTarget { function, .. }
            | IrProblem::UnknownLocal { function, .. }
            | IrProblem::KindMismatch { function, .. }
            | IrProblem::SpanTableMismatch { function, .. }
            | IrProblem::DuplicateFunction { function } => *function,
        }
    }

    /// Statement the problem points at, if any.
    pub fn site(&self) -> Option<SiteId> {
        match self {
            IrProblem::UnknownLocal { site, .. } | IrProblem::KindMismatch { site, .. } => *site,
            _ => None,
        }
    }
}
