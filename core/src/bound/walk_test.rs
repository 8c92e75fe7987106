use bumpalo::Bump;
use pretty_assertions::assert_eq;

use super::walk::{Node, Walk, contains_await, contains_suspension, left_spine, walk};
use super::{AwaitInfo, BinaryOp, BoundBuilder, ExprKind, LocalId, StmtKind};
use crate::symbols::{MethodId, TypeId};
use crate::syntax::Span;
use crate::Vec;

fn await_info() -> AwaitInfo {
    AwaitInfo {
        get_awaiter: MethodId(0),
        is_completed: MethodId(1),
        get_result: MethodId(2),
    }
}

#[test]
fn test_walk_visits_in_evaluation_order() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let x = b.local(LocalId(0), TypeId::INT32);
    let sum = b.binary(BinaryOp::Add, x, b.int32(1), TypeId::INT32);
    let body = b.block(&[b.assign_stmt(x, sum), b.ret(Some(x))]);

    let mut seen = Vec::new();
    walk(Node::Stmt(&body), |node| {
        if let Node::Expr(expr) = node {
            seen.push(expr.node_name());
        }
        Walk::Recurse
    });
    assert_eq!(seen, ["assignment", "local", "binary", "local", "literal", "local"]);
}

#[test]
fn test_walk_skip_and_stop() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let body = b.block(&[b.expr_stmt(b.int32(1)), b.expr_stmt(b.int32(2))]);

    let mut count = 0;
    let finished = walk(Node::Stmt(&body), |node| {
        count += 1;
        match node {
            Node::Stmt(stmt) if matches!(stmt.kind, StmtKind::Expression(_)) => Walk::Skip,
            _ => Walk::Recurse,
        }
    });
    assert!(finished);
    assert_eq!(count, 3);

    let finished = walk(Node::Stmt(&body), |_| Walk::Stop);
    assert!(!finished);
}

#[test]
fn test_suspension_detection() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let task = b.default_of(TypeId::OBJECT);
    let awaited = b.expr(TypeId::INT32, ExprKind::Await { operand: task, info: await_info() }, Span::EMPTY);
    let nested = b.binary(BinaryOp::Add, b.int32(1), awaited, TypeId::INT32);

    assert!(contains_await(nested));
    assert!(!contains_await(b.int32(1)));
    assert!(contains_suspension(&b.block(&[b.ret(Some(nested))])));
    assert!(!contains_suspension(&b.block(&[b.ret(Some(b.int32(1)))])));

    let yield_break = b.stmt(StmtKind::YieldBreak, Span::EMPTY);
    assert!(contains_suspension(&b.block(&[yield_break])));
}

#[test]
fn test_left_spine_of_deep_chain() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let mut expr = b.int32(0);
    for i in 1..=10_000 {
        expr = b.binary(BinaryOp::Add, expr, b.int32(i), TypeId::INT32);
    }
    let spine = left_spine(expr);
    assert_eq!(spine.nodes.len(), 10_000);
    assert_eq!(spine.leaf.kind, ExprKind::Literal(super::ConstantValue::Int32(0)));
    match spine.nodes[0].kind {
        ExprKind::Binary { right, .. } => assert_eq!(right.constant, Some(super::ConstantValue::Int32(1))),
        _ => panic!("expected binary"),
    }
    assert!(core::ptr::eq(*spine.nodes.last().unwrap(), expr));
}
