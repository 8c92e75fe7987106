//! Cinder - the back end of a C#-like compiler
//!
//! # Overview
//!
//! Cinder takes type-checked, symbol-resolved method bodies (the bound tree)
//! and turns them into stack-machine instructions:
//!
//! - Local rewriting removes structured control flow, compound assignments
//!   and constant-valued expressions.
//! - Async methods and iterators become synthesized state machine types.
//! - The code generator emits instructions, exception regions, sequence
//!   points and a token table, and can verify the stack discipline of its
//!   own output.
//!
//! # Quick Start
//!
//! ```
//! use bumpalo::Bump;
//! use cinder::bound::{BoundBuilder, BoundMethod, LabelGen, LocalTable};
//! use cinder::symbols::{MethodDef, MethodFlags, SymbolTable, TypeDef, TypeId};
//! use cinder::{CompileOptions, Compiler};
//!
//! let arena = Bump::new();
//! let mut symbols = SymbolTable::new();
//! let program = symbols.add_type(TypeDef::class("Program").with_base(TypeId::OBJECT));
//! let answer = symbols.add_method(
//!     MethodDef::new(program, "Answer", vec![], TypeId::INT32).with_flags(MethodFlags::STATIC),
//! );
//!
//! let b = BoundBuilder::new(&arena);
//! let body = b.alloc(b.block(&[b.ret(Some(b.int32(42)))]));
//!
//! let mut compiler = Compiler::new(&arena, symbols, CompileOptions::default());
//! compiler
//!     .compile(BoundMethod::new(answer, body, LocalTable::new(), LabelGen::new()), Default::default())
//!     .unwrap();
//! let module = compiler.finish();
//! assert_eq!(module.method(answer).unwrap().max_stack, 1);
//! ```
//!
//! # Failures
//!
//! Bound trees are assumed to be valid; anything the back end cannot handle
//! is an internal error. The failing method is abandoned and reported as an
//! [`Error`] carrying a [`Diagnostic`], which [`render_error_to`] formats
//! against the original source.

// Error rendering utilities
pub mod error_renderer;
pub use error_renderer::{RenderConfig, render_error_to};

// Re-export public API from cinder_core
pub use cinder_core::api::{
    CompileOptions, CompileOptionsOverride, CompiledMethod, Compiler, Diagnostic, Error, Module,
    OptimizationLevel, RelatedInfo, Severity,
};

// Re-export the stage modules hosts build input with and read output from
pub use cinder_core::{bound, codegen, lowering, symbols, syntax};
pub use cinder_types::{ConversionKind, PrimitiveKind, PrimitiveType};
