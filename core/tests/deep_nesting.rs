//! Generated code can chain operators far deeper than any hand-written
//! source. Every stage must handle such chains without recursing per level.

use bumpalo::Bump;
use cinder_core::api::{CompileOptions, Compiler};
use cinder_core::bound::{BinaryOp, BoundBuilder, BoundMethod, LabelGen, LocalTable};
use cinder_core::codegen::Instruction;
use cinder_core::symbols::{MethodDef, MethodFlags, Param, SymbolTable, TypeDef, TypeId};
use pretty_assertions::assert_eq;

const DEPTH: usize = 10_000;

#[test]
fn test_deep_left_chain_compiles() {
    let arena = Bump::new();
    let b = BoundBuilder::new(&arena);
    let mut symbols = SymbolTable::new();
    let owner = symbols.add_type(TypeDef::class("Generated").with_base(TypeId::OBJECT));
    let method = symbols.add_method(
        MethodDef::new(owner, "Sum", vec![Param::new("x", TypeId::INT32)], TypeId::INT32)
            .with_flags(MethodFlags::STATIC),
    );

    // ((x + 1) + 1) + ... + 1
    let mut expr = b.parameter(0, TypeId::INT32);
    for _ in 0..DEPTH {
        expr = b.binary(BinaryOp::Add, expr, b.int32(1), TypeId::INT32);
    }
    let body = b.alloc(b.block(&[b.ret(Some(expr))]));

    for options in [CompileOptions::release(), CompileOptions::default()] {
        let mut compiler = Compiler::new(&arena, symbols.clone(), options);
        compiler
            .compile(
                BoundMethod::new(method, body, LocalTable::new(), LabelGen::new()),
                Default::default(),
            )
            .unwrap();
        let module = compiler.finish();
        let code = module.method(method).unwrap();

        // A left chain never holds more than the running sum and one operand.
        assert_eq!(code.max_stack, 2);
        let adds = code
            .instructions
            .iter()
            .filter(|instruction| matches!(instruction, Instruction::Add))
            .count();
        assert_eq!(adds, DEPTH);
        assert!(code.instructions.contains(&Instruction::LoadArg(0)));
        assert_eq!(code.instructions.last(), Some(&Instruction::Return));
    }
}
