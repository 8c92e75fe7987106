//! Public API for the Cinder back end.
//!
//! [`Compiler`] drives lowering and emission for the methods of one module
//! and returns a [`Module`]. Internal failures surface as [`Error`] values
//! carrying a [`Diagnostic`].
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use cinder_core::api::{CompileOptions, Compiler};
//! use cinder_core::bound::{BoundBuilder, BoundMethod, LabelGen, LocalTable};
//! use cinder_core::symbols::{MethodDef, MethodFlags, SymbolTable, TypeDef, TypeId};
//!
//! let arena = Bump::new();
//! let mut symbols = SymbolTable::new();
//! let program = symbols.add_type(TypeDef::class("Program").with_base(TypeId::OBJECT));
//! let main = symbols.add_method(
//!     MethodDef::new(program, "Main", vec![], TypeId::VOID).with_flags(MethodFlags::STATIC),
//! );
//!
//! let b = BoundBuilder::new(&arena);
//! let body = b.alloc(b.block(&[]));
//!
//! let mut compiler = Compiler::new(&arena, symbols, CompileOptions::default());
//! let errors = compiler.compile_all([BoundMethod::new(main, body, LocalTable::new(), LabelGen::new())]);
//! assert!(errors.is_empty());
//!
//! let module = compiler.finish();
//! let bytes = module.encode().unwrap();
//! assert!(!bytes.is_empty());
//! ```

pub mod compiler;
pub mod error;
pub mod module;
pub mod options;

pub use compiler::{CompiledMethod, Compiler};
pub use error::{Diagnostic, Error, RelatedInfo, Severity};
pub use module::Module;
pub use options::{CompileOptions, CompileOptionsOverride, OptimizationLevel};
