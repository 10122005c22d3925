use arx_ir::{Name, Span, StringInterner};
use pretty_assertions::assert_eq;
use smallvec::SmallVec;

use super::{
    BlockId, CallArg, CheckFunction, CmpOp, LocalId, LocalKind, Operand, PassMode, Program,
    Rvalue, SiteId, Stmt, Terminator, Visibility,
};
use crate::effects::EffectContext;
use crate::test_helpers::{access, b, block, copy, handle, int, l, make_func, A0, A1};

#[test]
fn builder_assigns_sequential_ids() {
    let interner = StringInterner::new();
    let mut func = CheckFunction::new(interner.intern("walk"), Visibility::Public, None);
    let node = func.add_param(LocalKind::Handle { arena: A0 }, Some(interner.intern("node")));
    let count = func.add_local(LocalKind::Int { unsigned: true }, None);
    assert_eq!((node, count), (l(0), l(1)));
    assert!(func.is_param(node));
    assert!(!func.is_param(count));

    assert_eq!(func.next_block_id(), b(0));
    func.push_block(block(0, vec![access(0)], Terminator::Return));
    assert_eq!(func.next_block_id(), b(1));

    let site = SiteId::new(b(0), 0);
    assert_eq!(func.span_of(site), Span::DUMMY);
    func.set_span(site, Span::new(4, 9));
    assert_eq!(func.span_of(site), Span::new(4, 9));
    // Out-of-range sites are ignored and fall back to the function span.
    func.set_span(SiteId::new(b(3), 0), Span::new(1, 2));
    assert_eq!(func.span_of(SiteId::new(b(3), 0)), Span::DUMMY);

    assert_eq!(func.local_name(node, &interner), "node");
    assert_eq!(func.local_name(count, &interner), "_1");
}

#[test]
fn site_display() {
    assert_eq!(SiteId::new(b(2), 5).to_string(), "bb2[5]");
    assert_eq!(SiteId::at(BlockId::new(0), 1), SiteId::new(b(0), 1));
    assert!(SiteId::new(b(0), 9) < SiteId::new(b(1), 0));
}

#[test]
fn exclusive_arguments_count_as_definitions() {
    let call = Stmt::Call {
        dst: Some(l(0)),
        callee: Name::from_raw(9),
        args: vec![
            CallArg {
                value: l(1),
                mode: PassMode::Copy,
            },
            CallArg {
                value: l(2),
                mode: PassMode::Exclusive,
            },
        ],
        arenas: vec![],
    };
    assert_eq!(call.defined_locals().as_slice(), &[l(0), l(2)]);
    assert_eq!(call.used_locals().as_slice(), &[l(1), l(2)]);
    assert!(call.defines(l(2)));
    assert!(!call.defines(l(1)));
}

#[test]
fn used_locals_skip_constants() {
    let cmp = Stmt::Assign {
        dst: l(3),
        value: Rvalue::Compare {
            op: CmpOp::Lt,
            lhs: Operand::Local(l(1)),
            rhs: Operand::Const(10),
        },
    };
    let expected: SmallVec<[LocalId; 4]> = SmallVec::from_slice(&[l(1)]);
    assert_eq!(cmp.used_locals(), expected);
    assert_eq!(Operand::Const(3).local(), None);
}

#[test]
fn comparison_algebra() {
    for op in [CmpOp::Lt, CmpOp::Le, CmpOp::Gt, CmpOp::Ge, CmpOp::Eq, CmpOp::Ne] {
        assert_eq!(op.negate().negate(), op);
        assert_eq!(op.flip().flip(), op);
    }
    assert_eq!(CmpOp::Lt.negate(), CmpOp::Ge);
    assert_eq!(CmpOp::Lt.flip(), CmpOp::Gt);
    assert_eq!(CmpOp::Ne.flip(), CmpOp::Ne);
}

#[test]
fn whole_body_queries() {
    let func = make_func(
        &[0],
        vec![handle(A0), handle(A1), int()],
        vec![
            block(0, vec![copy(1, 0)], Terminator::Goto { target: b(1) }),
            block(1, vec![Stmt::Suspend, access(1)], Terminator::Return),
        ],
    );
    assert_eq!(
        func.handle_locals().collect::<Vec<_>>(),
        vec![(l(0), A0), (l(1), A1)]
    );
    assert!(func.is_redefined(l(1)));
    assert!(!func.is_redefined(l(0)));
    assert!(func.has_suspend());
    assert_eq!(func.arena_of(l(2)), None);
    assert_eq!(func.local_kind(l(40)), LocalKind::Other);
    assert_eq!(
        func.sites().map(|(site, _)| site).collect::<Vec<_>>(),
        vec![
            SiteId::new(b(0), 0),
            SiteId::new(b(1), 0),
            SiteId::new(b(1), 1)
        ]
    );
    assert_eq!(func.stmt(SiteId::new(b(1), 1)), &access(1));
}

#[test]
fn program_lookup_by_name() {
    let interner = StringInterner::new();
    let name = interner.intern("main");
    let mut program = Program::new(interner);
    program.functions.push(CheckFunction::new(
        name,
        Visibility::Public,
        Some(EffectContext::Mutable),
    ));
    assert!(program.function(name).is_some());
    assert!(program.function(Name::EMPTY).is_none());
    assert!(Program::default().functions.is_empty());
}
