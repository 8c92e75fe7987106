use bumpalo::Bump;
use pretty_assertions::assert_eq;

use super::lower_method;
use crate::api::CompileOptions;
use crate::bound::{AwaitInfo, BoundBuilder, BoundMethod, ExprKind, LabelGen, LocalTable, StmtKind};
use crate::error::{CompileError, Stage};
use crate::symbols::{MethodDef, MethodFlags, SymbolTable, TypeDef, TypeId, declare_core_library};
use crate::syntax::Span;
use crate::vec;

#[test]
fn test_ordinary_method_has_no_state_machine() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let mut symbols = SymbolTable::new();
    let owner = symbols.add_type(TypeDef::class("Program").with_base(TypeId::OBJECT));
    let method = symbols.add_method(
        MethodDef::new(owner, "Answer", vec![], TypeId::INT32).with_flags(MethodFlags::STATIC),
    );
    let body = b.block(&[b.ret(Some(b.int32(42)))]);

    let bound = BoundMethod::new(method, b.alloc(body), LocalTable::new(), LabelGen::new());
    let lowered = lower_method(&arena, &mut symbols, bound, &CompileOptions::release()).unwrap();
    assert!(lowered.state_machine.is_none());
    assert!(lowered.synthesized.is_empty());
    assert_eq!(lowered.bodies().count(), 1);
    assert_eq!(lowered.kickoff.method, method);
}

#[test]
fn test_await_in_ordinary_method_is_internal_error() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let mut symbols = SymbolTable::new();
    let core = declare_core_library(&mut symbols);
    let owner = symbols.add_type(TypeDef::class("Program").with_base(TypeId::OBJECT));
    let fetch = symbols.add_method(MethodDef::new(owner, "Fetch", vec![], core.task).with_flags(MethodFlags::STATIC));
    let method = symbols.add_method(MethodDef::new(owner, "Run", vec![], TypeId::VOID).with_flags(MethodFlags::STATIC));

    let info = AwaitInfo {
        get_awaiter: core.task_get_awaiter,
        is_completed: symbols.find_method(core.task_awaiter, "get_IsCompleted").unwrap(),
        get_result: symbols.find_method(core.task_awaiter, "GetResult").unwrap(),
    };
    let operand = b.call(None, fetch, &[], core.task);
    let awaited = b.expr(TypeId::VOID, ExprKind::Await { operand, info }, Span::new(3, 14));
    let body = b.block(&[b.expr_stmt(awaited)]);

    let bound = BoundMethod::new(method, b.alloc(body), LocalTable::new(), LabelGen::new());
    let err = lower_method(&arena, &mut symbols, bound, &CompileOptions::release()).unwrap_err();
    assert_eq!(
        err,
        CompileError::UnexpectedNode {
            stage: Stage::Lowering,
            node: "await",
            span: Span::new(3, 14),
        }
    );
}

#[test]
fn test_yield_break_in_ordinary_method_is_internal_error() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let mut symbols = SymbolTable::new();
    let owner = symbols.add_type(TypeDef::class("Program").with_base(TypeId::OBJECT));
    let method = symbols.add_method(MethodDef::new(owner, "Run", vec![], TypeId::VOID).with_flags(MethodFlags::STATIC));
    let body = b.block(&[b.stmt(StmtKind::YieldBreak, Span::new(0, 11))]);

    let bound = BoundMethod::new(method, b.alloc(body), LocalTable::new(), LabelGen::new());
    let err = lower_method(&arena, &mut symbols, bound, &CompileOptions::default()).unwrap_err();
    assert_eq!(err.code(), "C0001");
    assert_eq!(err.span(), Span::new(0, 11));
}
