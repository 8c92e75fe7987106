use bumpalo::Bump;
use cinder_types::{ConversionKind, PrimitiveKind};
use pretty_assertions::assert_eq;

use super::*;
use crate::bound::{
    ArrayInitializer, BinaryOp, BoundBuilder, CatchClause, ConstantValue, DecimalValue, ExprKind, InitItem, LabelGen,
    LabelId, LocalTable, Stmt, StmtKind,
};
use crate::symbols::{CoreLibrary, MethodDef, MethodFlags, Param, TypeDef, WellKnownMember, declare_core_library};
use crate::{Vec, vec};

struct Fixture {
    symbols: SymbolTable,
    core: CoreLibrary,
    owner: TypeId,
    /// `static void Work()`
    work: MethodId,
}

impl Fixture {
    fn new() -> Self {
        let mut symbols = SymbolTable::new();
        let core = declare_core_library(&mut symbols);
        let owner = symbols.add_type(TypeDef::class("Program").with_base(TypeId::OBJECT));
        let work = symbols.add_method(MethodDef::new(owner, "Work", vec![], TypeId::VOID).with_flags(MethodFlags::STATIC));
        Fixture {
            symbols,
            core,
            owner,
            work,
        }
    }

    fn static_method(&mut self, params: Vec<Param>, ret: TypeId) -> MethodId {
        self.symbols
            .add_method(MethodDef::new(self.owner, "Subject", params, ret).with_flags(MethodFlags::STATIC))
    }

    fn emit(&self, method: MethodId, body: Stmt<'_>, locals: LocalTable, options: &CompileOptions) -> (MethodCode, TokenTable) {
        let arena = Bump::new();
        let mut tokens = TokenTable::new();
        let body = arena.alloc(body);
        let bound = BoundMethod::new(method, body, locals, LabelGen::new());
        let code = generate(&self.symbols, &mut tokens, &bound, options).unwrap();
        (code, tokens)
    }

    fn emit_err(&self, method: MethodId, body: Stmt<'_>) -> CompileError {
        let mut tokens = TokenTable::new();
        let arena = Bump::new();
        let bound = BoundMethod::new(method, arena.alloc(body), LocalTable::new(), LabelGen::new());
        generate(&self.symbols, &mut tokens, &bound, &CompileOptions::release()).unwrap_err()
    }
}

fn release() -> CompileOptions {
    CompileOptions::release()
}

const WORK_SHAPE: CallShape = CallShape {
    args: 0,
    has_this: false,
    returns: false,
};

#[test]
fn test_returns_constant() {
    crate::test_utils::init_test_logging();
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![], TypeId::INT32);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let (code, _) = fx.emit(method, b.block(&[b.ret(Some(b.int32(42)))]), LocalTable::new(), &release());
    assert_eq!(code.instructions, vec![Instruction::LoadInt32(42), Instruction::Return]);
    assert_eq!(code.max_stack, 1);
    assert!(code.returns_value);
}

#[test]
fn test_left_deep_chain_is_flat() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![], TypeId::INT32);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let sum = b.binary(
        BinaryOp::Add,
        b.binary(BinaryOp::Add, b.int32(1), b.int32(2), TypeId::INT32),
        b.int32(3),
        TypeId::INT32,
    );
    let (code, _) = fx.emit(method, b.block(&[b.ret(Some(sum))]), LocalTable::new(), &release());
    assert_eq!(
        code.instructions,
        vec![
            Instruction::LoadInt32(1),
            Instruction::LoadInt32(2),
            Instruction::Add,
            Instruction::LoadInt32(3),
            Instruction::Add,
            Instruction::Return,
        ]
    );
    assert_eq!(code.max_stack, 2);
}

#[test]
fn test_logical_and_keeps_left_value_when_false() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![Param::new("a", TypeId::BOOL), Param::new("b", TypeId::BOOL)], TypeId::BOOL);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let both = b.binary(
        BinaryOp::LogicalAnd,
        b.parameter(0, TypeId::BOOL),
        b.parameter(1, TypeId::BOOL),
        TypeId::BOOL,
    );
    let (code, _) = fx.emit(method, b.block(&[b.ret(Some(both))]), LocalTable::new(), &release());
    assert_eq!(
        code.instructions,
        vec![
            Instruction::LoadArg(0),
            Instruction::Dup,
            Instruction::BranchFalse(5),
            Instruction::Pop,
            Instruction::LoadArg(1),
            Instruction::Return,
        ]
    );
}

#[test]
fn test_unsigned_less_or_equal() {
    let mut fx = Fixture::new();
    let uint = TypeId::of_kind(PrimitiveKind::UInt32);
    let method = fx.static_method(vec![Param::new("a", uint), Param::new("b", uint)], TypeId::BOOL);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let le = b.binary(BinaryOp::Le, b.parameter(0, uint), b.parameter(1, uint), TypeId::BOOL);
    let (code, _) = fx.emit(method, b.block(&[b.ret(Some(le))]), LocalTable::new(), &release());
    assert_eq!(
        code.instructions,
        vec![
            Instruction::LoadArg(0),
            Instruction::LoadArg(1),
            Instruction::CompareGreaterUnsigned,
            Instruction::LoadInt32(0),
            Instruction::CompareEqual,
            Instruction::Return,
        ]
    );
}

#[test]
fn test_instance_parameters_skip_this() {
    let mut fx = Fixture::new();
    let method = fx
        .symbols
        .add_method(MethodDef::new(fx.owner, "Echo", vec![Param::new("x", TypeId::INT32)], TypeId::INT32));
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let (code, _) = fx.emit(
        method,
        b.block(&[b.ret(Some(b.parameter(0, TypeId::INT32)))]),
        LocalTable::new(),
        &release(),
    );
    assert_eq!(code.instructions, vec![Instruction::LoadArg(1), Instruction::Return]);
}

#[test]
fn test_numeric_conversions() {
    let mut fx = Fixture::new();
    let uint = TypeId::of_kind(PrimitiveKind::UInt32);
    let method = fx.static_method(vec![Param::new("x", uint)], TypeId::DOUBLE);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let widened = b.convert(b.parameter(0, uint), TypeId::DOUBLE, ConversionKind::ImplicitNumeric);
    let (code, _) = fx.emit(method, b.block(&[b.ret(Some(widened))]), LocalTable::new(), &release());
    assert_eq!(
        code.instructions,
        vec![
            Instruction::LoadArg(0),
            Instruction::Convert(NumericTarget::RUn),
            Instruction::Convert(NumericTarget::R8),
            Instruction::Return,
        ]
    );
}

#[test]
fn test_decimal_literal_uses_constructor() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![], TypeId::DECIMAL);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let value = DecimalValue {
        lo: 15,
        mid: 0,
        hi: 0,
        negative: true,
        scale: 1,
    };
    let literal = b.literal(TypeId::DECIMAL, ConstantValue::Decimal(value));
    let (code, mut tokens) = fx.emit(method, b.block(&[b.ret(Some(literal))]), LocalTable::new(), &release());

    let ctor = fx.symbols.well_known_method(WellKnownMember::DecimalCtor).unwrap();
    let ctor = tokens.method(&fx.symbols, ctor).unwrap();
    assert_eq!(
        code.instructions,
        vec![
            Instruction::LoadInt32(15),
            Instruction::LoadInt32(0),
            Instruction::LoadInt32(0),
            Instruction::LoadInt32(1),
            Instruction::LoadInt32(1),
            Instruction::NewObject(
                ctor,
                CallShape {
                    args: 5,
                    has_this: true,
                    returns: false,
                }
            ),
            Instruction::Return,
        ]
    );
    assert_eq!(code.max_stack, 5);
}

#[test]
fn test_try_catch_region() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![], TypeId::VOID);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let catch = CatchClause {
        exception_type: fx.core.exception,
        local: None,
        body: b.alloc(b.block(&[])),
    };
    let body = b.block(&[b.try_stmt(
        b.block(&[b.expr_stmt(b.call(None, fx.work, &[], TypeId::VOID))]),
        &[catch],
        None,
    )]);
    let (code, mut tokens) = fx.emit(method, body, LocalTable::new(), &release());

    let work = tokens.method(&fx.symbols, fx.work).unwrap();
    let exception = tokens.type_token(&fx.symbols, fx.core.exception).unwrap();
    assert_eq!(
        code.instructions,
        vec![
            Instruction::Call(work, WORK_SHAPE),
            Instruction::Leave(4),
            Instruction::Pop,
            Instruction::Leave(4),
            Instruction::Return,
        ]
    );
    assert_eq!(
        code.regions,
        vec![ExceptionRegion {
            kind: RegionKind::Catch(exception),
            try_start: 0,
            try_end: 2,
            handler_start: 2,
            handler_end: 4,
        }]
    );
}

#[test]
fn test_return_inside_try_leaves_through_shared_exit() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![], TypeId::INT32);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let body = b.block(&[b.try_stmt(
        b.block(&[b.ret(Some(b.int32(1)))]),
        &[],
        Some(b.block(&[b.expr_stmt(b.call(None, fx.work, &[], TypeId::VOID))])),
    )]);
    let (code, mut tokens) = fx.emit(method, body, LocalTable::new(), &release());

    let work = tokens.method(&fx.symbols, fx.work).unwrap();
    assert_eq!(
        code.instructions,
        vec![
            Instruction::LoadInt32(1),
            Instruction::StoreLocal(0),
            Instruction::Leave(5),
            Instruction::Call(work, WORK_SHAPE),
            Instruction::EndFinally,
            Instruction::LoadLocal(0),
            Instruction::Return,
        ]
    );
    assert_eq!(code.locals, vec![TypeId::INT32]);
    assert_eq!(
        code.regions,
        vec![ExceptionRegion {
            kind: RegionKind::Finally,
            try_start: 0,
            try_end: 3,
            handler_start: 3,
            handler_end: 5,
        }]
    );
}

#[test]
fn test_conditional_goto_out_of_try_becomes_leave() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![Param::new("done", TypeId::BOOL)], TypeId::VOID);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let out = LabelId(0);

    let catch = CatchClause {
        exception_type: fx.core.exception,
        local: None,
        body: b.alloc(b.block(&[])),
    };
    let body = b.block(&[
        b.try_stmt(
            b.block(&[b.cond_goto(b.parameter(0, TypeId::BOOL), true, out)]),
            &[catch],
            None,
        ),
        b.label(out),
    ]);
    let (code, _) = fx.emit(method, body, LocalTable::new(), &release());
    assert_eq!(
        code.instructions,
        vec![
            Instruction::LoadArg(0),
            Instruction::BranchFalse(3),
            Instruction::Leave(6),
            Instruction::Leave(6),
            Instruction::Pop,
            Instruction::Leave(6),
            Instruction::Return,
        ]
    );
}

#[test]
fn test_branch_into_try_is_rejected() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![], TypeId::VOID);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let inside = LabelId(3);

    let catch = CatchClause {
        exception_type: fx.core.exception,
        local: None,
        body: b.alloc(b.block(&[])),
    };
    let body = b.block(&[
        b.goto(inside),
        b.try_stmt(b.block(&[b.label(inside)]), &[catch], None),
    ]);
    assert_eq!(fx.emit_err(method, body), CompileError::BranchIntoProtectedRegion(3));
}

#[test]
fn test_rethrow_requires_a_catch_handler() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![], TypeId::VOID);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    assert_eq!(fx.emit_err(method, b.block(&[b.throw(None)])), CompileError::RethrowOutsideCatch);
}

#[test]
fn test_switch_targets_are_resolved() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![Param::new("state", TypeId::INT32)], TypeId::VOID);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let (first, second) = (LabelId(0), LabelId(1));

    let body = b.block(&[
        b.switch(b.parameter(0, TypeId::INT32), &[first, second]),
        b.label(first),
        b.ret(None),
        b.label(second),
        b.ret(None),
    ]);
    let (code, _) = fx.emit(method, body, LocalTable::new(), &release());
    assert_eq!(
        code.instructions,
        vec![
            Instruction::LoadArg(0),
            Instruction::Switch(vec![2, 3]),
            Instruction::Return,
            Instruction::Return,
        ]
    );
}

#[test]
fn test_markers_record_sequence_points() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![], TypeId::VOID);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let span = crate::syntax::Span::new(4, 9);
    let statement = b.stmt(StmtKind::Expression(b.call(None, fx.work, &[], TypeId::VOID)), span);

    let (debug, mut tokens) = fx.emit(method, b.block(&[b.marker(statement)]), LocalTable::new(), &CompileOptions::default());
    let work = tokens.method(&fx.symbols, fx.work).unwrap();
    assert_eq!(
        debug.instructions,
        vec![Instruction::Nop, Instruction::Call(work, WORK_SHAPE), Instruction::Return]
    );
    assert_eq!(debug.sequence_points, vec![SequencePoint { offset: 0, span }]);

    let (optimized, _) = fx.emit(method, b.block(&[b.marker(statement)]), LocalTable::new(), &release());
    assert_eq!(optimized.instructions.len(), 2);
    assert_eq!(optimized.sequence_points, vec![SequencePoint { offset: 0, span }]);
}

#[test]
fn test_constant_int_array_uses_block_copy() {
    let mut fx = Fixture::new();
    let int_array = fx.symbols.array_of(TypeId::INT32, 1);
    let method = fx.static_method(vec![], int_array);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let items: Vec<InitItem<'_>> = (1..=4).map(|n| InitItem::Value(*b.int32(n))).collect();
    let array = b.expr(
        int_array,
        ExprKind::ArrayCreation {
            element: TypeId::INT32,
            sizes: b.exprs(&[*b.int32(4)]),
            initializer: Some(ArrayInitializer {
                items: arena.alloc_slice_copy(&items),
            }),
        },
        crate::syntax::Span::EMPTY,
    );
    let (code, mut tokens) = fx.emit(method, b.block(&[b.ret(Some(array))]), LocalTable::new(), &release());

    let element = tokens.type_token(&fx.symbols, TypeId::INT32).unwrap();
    let blob = tokens.blob(vec![1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0]);
    let init = tokens.method(&fx.symbols, fx.core.initialize_array).unwrap();
    assert_eq!(
        code.instructions,
        vec![
            Instruction::LoadInt32(4),
            Instruction::NewArray(element),
            Instruction::Dup,
            Instruction::LoadToken(blob),
            Instruction::Call(
                init,
                CallShape {
                    args: 2,
                    has_this: false,
                    returns: false,
                }
            ),
            Instruction::Return,
        ]
    );
}

#[test]
fn test_constant_bytes_wrap_without_array() {
    let mut fx = Fixture::new();
    let byte_array = fx.symbols.array_of(TypeId::BYTE, 1);
    let span_ty = fx.core.byte_span;
    let method = fx.static_method(vec![], span_ty);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let items: Vec<InitItem<'_>> = [7u8, 8, 9]
        .iter()
        .map(|n| InitItem::Value(*b.literal(TypeId::BYTE, ConstantValue::Byte(*n))))
        .collect();
    let array = b.expr(
        byte_array,
        ExprKind::ArrayCreation {
            element: TypeId::BYTE,
            sizes: b.exprs(&[*b.int32(3)]),
            initializer: Some(ArrayInitializer {
                items: arena.alloc_slice_copy(&items),
            }),
        },
        crate::syntax::Span::EMPTY,
    );
    let span = b.expr(
        span_ty,
        ExprKind::SpanFromArray {
            array,
            ctor: fx.core.byte_span_from_array,
        },
        crate::syntax::Span::EMPTY,
    );
    let (code, mut tokens) = fx.emit(method, b.block(&[b.ret(Some(span))]), LocalTable::new(), &release());

    let data = tokens.blob(vec![7, 8, 9]);
    let from_pointer = tokens.method(&fx.symbols, fx.core.byte_span_from_pointer).unwrap();
    assert_eq!(
        code.instructions,
        vec![
            Instruction::LoadDataAddress(data),
            Instruction::LoadInt32(3),
            Instruction::NewObject(
                from_pointer,
                CallShape {
                    args: 2,
                    has_this: true,
                    returns: false,
                }
            ),
            Instruction::Return,
        ]
    );
}

#[test]
fn test_value_method_must_not_fall_off_the_end() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![], TypeId::INT32);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let err = fx.emit_err(method, b.block(&[]));
    assert!(matches!(err, CompileError::UnsupportedOperand(_)), "{err:?}");
}

#[test]
fn test_structured_statements_are_rejected() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![], TypeId::VOID);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    let err = fx.emit_err(method, b.block(&[b.stmt(StmtKind::YieldBreak, crate::syntax::Span::new(1, 2))]));
    assert_eq!(
        err,
        CompileError::UnexpectedNode {
            stage: crate::error::Stage::Emit,
            node: "yield break",
            span: crate::syntax::Span::new(1, 2),
        }
    );
}

#[test]
fn test_encoding_is_deterministic() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![], TypeId::STRING);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let body = b.block(&[b.ret(Some(b.string("hello")))]);

    let (first, _) = fx.emit(method, body, LocalTable::new(), &release());
    let (second, _) = fx.emit(method, body, LocalTable::new(), &release());
    let bytes = first.encode().unwrap();
    assert_eq!(bytes, second.encode().unwrap());
    assert_eq!(MethodCode::decode(&bytes).unwrap(), first);
}

#[test]
fn test_conditional_arms_must_agree_on_stack() {
    let mut fx = Fixture::new();
    let method = fx.static_method(vec![Param::new("flag", TypeId::BOOL)], TypeId::INT32);
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);

    // flag ? 1 : Work()
    let mismatched = b.expr(
        TypeId::INT32,
        ExprKind::Conditional {
            cond: b.parameter(0, TypeId::BOOL),
            when_true: b.int32(1),
            when_false: b.call(None, fx.work, &[], TypeId::VOID),
        },
        crate::syntax::Span::EMPTY,
    );
    let err = fx.emit_err(method, b.block(&[b.ret(Some(mismatched))]));
    assert_eq!(
        err,
        CompileError::StackImbalance {
            offset: 5,
            expected: 1,
            actual: 0,
        }
    );
}
