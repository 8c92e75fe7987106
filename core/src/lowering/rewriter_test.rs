use bumpalo::Bump;
use cinder_types::ConversionKind;
use pretty_assertions::assert_eq;

use super::LocalRewriter;
use crate::bound::{
    BinaryOp, BoundBuilder, ConstantValue, Expr, ExprKind, LabelGen, LabelId, LocalTable,
    MemberInit, Stmt, StmtKind,
};
use crate::error::CompileError;
use crate::symbols::{MethodDef, MethodFlags, Param, SymbolTable, TypeDef, TypeId};
use crate::syntax::Span;
use crate::vec;

fn rewrite<'a>(
    b: BoundBuilder<'a>,
    symbols: &SymbolTable,
    locals: &mut LocalTable,
    labels: &mut LabelGen,
    instrument: bool,
    body: &'a Stmt<'a>,
) -> Result<&'a Stmt<'a>, CompileError> {
    LocalRewriter::new(b, symbols, locals, labels)
        .instrument(instrument)
        .rewrite_body(body)
}

fn block_items<'a>(stmt: &'a Stmt<'a>) -> &'a [Stmt<'a>] {
    match stmt.kind {
        StmtKind::Block { stmts, .. } => stmts,
        _ => panic!("expected block, found {}", stmt.node_name()),
    }
}

#[test]
fn test_while_becomes_labels_and_gotos() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let symbols = SymbolTable::new();
    let mut locals = LocalTable::new();
    let i = locals.declare("i", TypeId::INT32);
    let i_ref = b.local(i, TypeId::INT32);
    let cond = b.binary(BinaryOp::Lt, i_ref, b.int32(10), TypeId::BOOL);
    let body = b.block(&[b.stmt(StmtKind::Break, Span::EMPTY)]);
    let loop_stmt = b.stmt(
        StmtKind::While {
            cond,
            body: b.alloc(body),
        },
        Span::EMPTY,
    );

    let mut labels = LabelGen::new();
    let lowered = rewrite(b, &symbols, &mut locals, &mut labels, false, b.alloc(loop_stmt)).unwrap();

    let (start, cont, brk) = (LabelId(0), LabelId(1), LabelId(2));
    let items = block_items(lowered);
    assert_eq!(items.len(), 6);
    assert_eq!(items[0].kind, StmtKind::Goto(cont));
    assert_eq!(items[1].kind, StmtKind::Label(start));
    assert_eq!(block_items(&items[2])[0].kind, StmtKind::Goto(brk));
    assert_eq!(items[3].kind, StmtKind::Label(cont));
    assert!(matches!(
        items[4].kind,
        StmtKind::ConditionalGoto { jump_if: true, label, .. } if label == start
    ));
    assert_eq!(items[5].kind, StmtKind::Label(brk));
}

#[test]
fn test_break_outside_loop_is_rejected() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let symbols = SymbolTable::new();
    let body = b.block(&[b.stmt(StmtKind::Break, Span::new(4, 10))]);

    let err = rewrite(b, &symbols, &mut LocalTable::new(), &mut LabelGen::new(), false, b.alloc(body))
        .unwrap_err();
    assert_eq!(err.code(), "C0001");
    assert_eq!(err.span(), Span::new(4, 10));
}

#[test]
fn test_constants_and_constant_conversions_fold() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let symbols = SymbolTable::new();
    let mut locals = LocalTable::new();
    let mut labels = LabelGen::new();

    // (2 + 3) carries its folded value from the binder.
    let sum = b.alloc(
        Expr::new(
            TypeId::INT32,
            ExprKind::Binary {
                op: BinaryOp::Add,
                operand_ty: TypeId::INT32,
                left: b.int32(2),
                right: b.int32(3),
            },
            Span::EMPTY,
        )
        .with_constant(ConstantValue::Int32(5)),
    );
    let widened = b.convert(b.int32(7), TypeId::INT64, ConversionKind::ImplicitNumeric);

    let mut rewriter = LocalRewriter::new(b, &symbols, &mut locals, &mut labels);
    assert_eq!(rewriter.rewrite_expr(sum).unwrap().kind, ExprKind::Literal(ConstantValue::Int32(5)));
    let folded = rewriter.rewrite_expr(widened).unwrap();
    assert_eq!(folded.ty, TypeId::INT64);
    assert_eq!(folded.kind, ExprKind::Literal(ConstantValue::Int64(7)));
}

#[test]
fn test_binary_operands_are_coerced() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let symbols = SymbolTable::new();
    let mut locals = LocalTable::new();
    let x = locals.declare("x", TypeId::INT32);
    let y = locals.declare("y", TypeId::INT64);
    let sum = b.expr(
        TypeId::INT64,
        ExprKind::Binary {
            op: BinaryOp::Add,
            operand_ty: TypeId::INT64,
            left: b.local(x, TypeId::INT32),
            right: b.local(y, TypeId::INT64),
        },
        Span::EMPTY,
    );

    let mut labels = LabelGen::new();
    let mut rewriter = LocalRewriter::new(b, &symbols, &mut locals, &mut labels);
    let lowered = rewriter.rewrite_expr(sum).unwrap();
    let ExprKind::Binary { left, right, .. } = lowered.kind else {
        panic!("expected binary");
    };
    assert_eq!(left.ty, TypeId::INT64);
    assert!(matches!(
        left.kind,
        ExprKind::Conversion { kind: ConversionKind::ImplicitNumeric, .. }
    ));
    assert_eq!(right.kind, ExprKind::Local(y));
}

#[test]
fn test_missing_conversion_is_an_error() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let mut symbols = SymbolTable::new();
    let point = symbols.add_type(TypeDef::value_struct("Point"));
    let mut locals = LocalTable::new();
    let p = locals.declare("p", point);
    let decl = b.stmt(
        StmtKind::LocalDeclaration {
            local: p,
            init: Some(b.string("origin")),
        },
        Span::EMPTY,
    );

    let err = rewrite(b, &symbols, &mut locals, &mut LabelGen::new(), false, b.alloc(decl)).unwrap_err();
    assert_eq!(
        err,
        CompileError::MissingConversion {
            from: "string".into(),
            to: "Point".into(),
        }
    );
}

#[test]
fn test_compound_assignment_evaluates_receiver_once() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let mut symbols = SymbolTable::new();
    let counter = symbols.add_type(TypeDef::class("Counter").with_base(TypeId::OBJECT));
    let count = symbols.add_field(counter, "count", TypeId::INT32, false);
    let next = symbols.add_method(MethodDef::new(counter, "Next", vec![], counter).with_flags(MethodFlags::STATIC));

    let receiver = b.call(None, next, &[], counter);
    let target = b.field(Some(receiver), count, TypeId::INT32);
    let compound = b.expr(
        TypeId::INT32,
        ExprKind::CompoundAssignment {
            op: BinaryOp::Add,
            operand_ty: TypeId::INT32,
            target,
            value: b.int32(1),
        },
        Span::EMPTY,
    );

    let mut locals = LocalTable::new();
    let mut labels = LabelGen::new();
    let mut rewriter = LocalRewriter::new(b, &symbols, &mut locals, &mut labels);
    let lowered = rewriter.rewrite_expr(compound).unwrap();
    drop(rewriter);

    let ExprKind::Sequence { effects, value } = lowered.kind else {
        panic!("expected sequence, found {}", lowered.node_name());
    };
    assert_eq!(locals.len(), 1);
    assert_eq!(effects.len(), 1);
    let ExprKind::Assignment { target: temp, value: call } = effects[0].kind else {
        panic!("expected temp assignment");
    };
    assert_eq!(call.kind, receiver.kind);
    let ExprKind::Assignment { target, value } = value.kind else {
        panic!("expected assignment");
    };
    assert_eq!(target.kind, ExprKind::FieldAccess { receiver: Some(temp), field: count });
    let ExprKind::Binary { left, .. } = value.kind else {
        panic!("expected binary");
    };
    assert_eq!(left, target);
}

#[test]
fn test_compound_assignment_narrows_back_to_target() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let symbols = SymbolTable::new();
    let mut locals = LocalTable::new();
    let small = locals.declare("small", TypeId::BYTE);
    let target = b.local(small, TypeId::BYTE);
    let compound = b.expr(
        TypeId::BYTE,
        ExprKind::CompoundAssignment {
            op: BinaryOp::Add,
            operand_ty: TypeId::INT32,
            target,
            value: b.int32(200),
        },
        Span::EMPTY,
    );

    let mut labels = LabelGen::new();
    let mut rewriter = LocalRewriter::new(b, &symbols, &mut locals, &mut labels);
    let lowered = rewriter.rewrite_expr(compound).unwrap();
    let ExprKind::Assignment { value, .. } = lowered.kind else {
        panic!("expected assignment");
    };
    assert_eq!(value.ty, TypeId::BYTE);
    assert!(matches!(
        value.kind,
        ExprKind::Conversion { kind: ConversionKind::ExplicitNumeric, .. }
    ));
}

#[test]
fn test_anonymous_object_uses_parameter_order() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let mut symbols = SymbolTable::new();
    let pair = symbols.add_type(TypeDef::class("<>f__AnonymousType0").with_base(TypeId::OBJECT));
    let ctor = symbols.add_method(
        MethodDef::new(
            pair,
            ".ctor",
            vec![Param::new("Name", TypeId::STRING), Param::new("Age", TypeId::INT32)],
            TypeId::VOID,
        )
        .with_flags(MethodFlags::CONSTRUCTOR),
    );
    let mut locals = LocalTable::new();
    let age = locals.declare("age", TypeId::INT32);
    let age_plus_one = b.binary(BinaryOp::Add, b.local(age, TypeId::INT32), b.int32(1), TypeId::INT32);
    let members = arena.alloc_slice_copy(&[
        MemberInit {
            name: "Age",
            value: *age_plus_one,
        },
        MemberInit {
            name: "Name",
            value: *b.string("Ada"),
        },
    ]);
    let anonymous = b.expr(pair, ExprKind::AnonymousObject { ctor, members }, Span::EMPTY);

    let mut labels = LabelGen::new();
    let mut rewriter = LocalRewriter::new(b, &symbols, &mut locals, &mut labels);
    let lowered = rewriter.rewrite_expr(anonymous).unwrap();
    let ExprKind::Sequence { effects, value } = lowered.kind else {
        panic!("expected sequence");
    };
    // `Age` is computed first, into a temp, and passed second.
    assert_eq!(effects.len(), 1);
    let ExprKind::ObjectCreation { ctor: called, args } = value.kind else {
        panic!("expected object creation");
    };
    assert_eq!(called, ctor);
    assert_eq!(args[0].kind, ExprKind::Literal(ConstantValue::String("Ada")));
    assert!(matches!(args[1].kind, ExprKind::Local(_)));
}

#[test]
fn test_rewriting_is_idempotent() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let mut symbols = SymbolTable::new();
    let holder = symbols.add_type(TypeDef::class("Holder").with_base(TypeId::OBJECT));
    let items = symbols.add_field(holder, "items", TypeId::INT64, false);
    let make = symbols.add_method(MethodDef::new(holder, "Make", vec![], holder).with_flags(MethodFlags::STATIC));

    let mut locals = LocalTable::new();
    let i = locals.declare("i", TypeId::INT32);
    let total = locals.declare("total", TypeId::INT64);
    let i_ref = b.local(i, TypeId::INT32);
    let total_ref = b.local(total, TypeId::INT64);

    let add_to_field = b.expr(
        TypeId::INT64,
        ExprKind::CompoundAssignment {
            op: BinaryOp::Add,
            operand_ty: TypeId::INT64,
            target: b.field(Some(b.call(None, make, &[], holder)), items, TypeId::INT64),
            value: i_ref,
        },
        Span::EMPTY,
    );
    let body_stmts = [
        b.stmt(StmtKind::LocalDeclaration { local: total, init: Some(b.int32(0)) }, Span::new(0, 5)),
        b.stmt(
            StmtKind::For {
                init: b.stmts(&[b.stmt(
                    StmtKind::LocalDeclaration { local: i, init: Some(b.int32(0)) },
                    Span::EMPTY,
                )]),
                cond: Some(b.binary(BinaryOp::Lt, i_ref, b.int32(3), TypeId::BOOL)),
                step: b.exprs(&[*b.assign(i_ref, b.binary(BinaryOp::Add, i_ref, b.int32(1), TypeId::INT32))]),
                body: b.alloc(b.block(&[
                    b.assign_stmt(total_ref, b.binary(BinaryOp::Add, total_ref, i_ref, TypeId::INT64)),
                    b.expr_stmt(add_to_field),
                    b.stmt(
                        StmtKind::If {
                            cond: b.binary(BinaryOp::Gt, total_ref, b.literal(TypeId::INT64, ConstantValue::Int64(2)), TypeId::BOOL),
                            then: b.alloc(b.stmt(StmtKind::Continue, Span::EMPTY)),
                            otherwise: Some(b.alloc(b.stmt(StmtKind::Break, Span::EMPTY))),
                        },
                        Span::EMPTY,
                    ),
                ])),
            },
            Span::new(6, 40),
        ),
        b.ret(None),
    ];
    let body = b.alloc(b.block(&body_stmts));

    for instrument in [false, true] {
        let mut locals = locals.clone();
        let mut labels = LabelGen::new();
        let once = rewrite(b, &symbols, &mut locals, &mut labels, instrument, body).unwrap();
        let (local_count, label_count) = (locals.len(), labels.count());
        let twice = rewrite(b, &symbols, &mut locals, &mut labels, instrument, once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(locals.len(), local_count);
        assert_eq!(labels.count(), label_count);
    }
}

#[test]
fn test_markers_wrap_user_statements() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let symbols = SymbolTable::new();
    let body = b.alloc(b.block(&[b.expr_stmt(b.int32(1)), b.ret(None)]));

    let lowered = rewrite(b, &symbols, &mut LocalTable::new(), &mut LabelGen::new(), true, body).unwrap();
    let items = block_items(lowered);
    assert!(items.iter().all(|stmt| matches!(stmt.kind, StmtKind::Marker(_))));
}
