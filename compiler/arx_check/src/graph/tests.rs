use pretty_assertions::assert_eq;

use crate::ir::Terminator;
use crate::test_helpers::{b, block, boolean, branch, goto, make_func};

use super::*;

/// bb0 -> bb1 (header) -> bb2 (body) -> bb1; bb1 -> bb3 (exit)
fn simple_loop() -> CheckFunction {
    make_func(
        &[],
        vec![boolean()],
        vec![
            block(0, vec![], goto(1)),
            block(1, vec![], branch(0, 2, 3)),
            block(2, vec![], goto(1)),
            block(3, vec![], Terminator::Return),
        ],
    )
}

#[test]
fn rpo_starts_at_entry_and_respects_forward_edges() {
    let cfg = ControlFlow::build(&simple_loop());
    let order: Vec<_> = cfg.reverse_postorder().collect();
    assert_eq!(order[0], b(0));
    assert_eq!(order[1], b(1));
    assert_eq!(order.len(), 4);
}

#[test]
fn back_edge_is_retreating() {
    let cfg = ControlFlow::build(&simple_loop());
    assert!(cfg.is_retreating(b(2), b(1)));
    assert!(!cfg.is_retreating(b(1), b(2)));
    assert!(cfg.is_loop_header(b(1)));
    assert!(!cfg.is_loop_header(b(3)));
    assert_eq!(cfg.loop_count(), 1);
}

#[test]
fn forward_predecessors_skip_back_edges() {
    let cfg = ControlFlow::build(&simple_loop());
    let fwd: Vec<_> = cfg.forward_predecessors(b(1)).collect();
    assert_eq!(fwd, vec![b(0)]);
    let all: Vec<_> = cfg.predecessors(b(1)).collect();
    assert_eq!(all, vec![b(0), b(2)]);
}

#[test]
fn loop_body_contains_header_and_latch() {
    let cfg = ControlFlow::build(&simple_loop());
    let body = cfg.loop_body(b(1));
    assert!(body.contains(&b(1)));
    assert!(body.contains(&b(2)));
    assert!(!body.contains(&b(0)));
    assert!(!body.contains(&b(3)));
}

#[test]
fn unreachable_blocks_are_excluded() {
    let func = make_func(
        &[],
        vec![],
        vec![
            block(0, vec![], Terminator::Return),
            block(1, vec![], goto(0)),
        ],
    );
    let cfg = ControlFlow::build(&func);
    assert!(cfg.is_reachable(b(0)));
    assert!(!cfg.is_reachable(b(1)));
    assert_eq!(cfg.num_blocks(), 2);
    assert_eq!(cfg.forward_predecessors(b(0)).count(), 0);
}

#[test]
fn irreducible_cycle_has_a_retreating_edge() {
    // bb0 branches into both bb1 and bb2, which jump to each other.
    let func = make_func(
        &[],
        vec![boolean()],
        vec![
            block(0, vec![], branch(0, 1, 2)),
            block(1, vec![], goto(2)),
            block(2, vec![], goto(1)),
        ],
    );
    let cfg = ControlFlow::build(&func);
    assert_eq!(cfg.loop_count(), 1);
    assert!(cfg.is_loop_header(b(1)));
    // The second entry edge pulls bb0 into the over-approximated body.
    let body = cfg.loop_body(b(1));
    assert!(body.contains(&b(1)) && body.contains(&b(2)));
    assert!(body.contains(&b(0)));
}

#[test]
fn self_loop() {
    let func = make_func(
        &[],
        vec![boolean()],
        vec![
            block(0, vec![], goto(1)),
            block(1, vec![], branch(0, 1, 2)),
            block(2, vec![], Terminator::Return),
        ],
    );
    let cfg = ControlFlow::build(&func);
    assert!(cfg.is_retreating(b(1), b(1)));
    assert_eq!(cfg.loop_body(b(1)).len(), 1);
}
