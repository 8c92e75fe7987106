//! The per-module compilation driver.

use bumpalo::Bump;
use tracing::{trace, warn};

use super::{CompileOptions, CompileOptionsOverride, Error, Module};
use crate::bound::BoundMethod;
use crate::codegen::{self, MethodCode, TokenTable};
use crate::error::CompileError;
use crate::lowering::{self, StateMachineInfo};
use crate::symbols::{MethodId, SymbolTable};
use crate::{String, Vec, format};

/// What compiling one method produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledMethod {
    pub method: MethodId,
    /// Every method that received a body: the method itself, then the
    /// members of its state machine, if any.
    pub emitted: Vec<MethodId>,
    pub state_machine: Option<StateMachineInfo>,
}

/// Lowers and emits the methods of one module.
///
/// The compiler owns the module-wide symbol and token tables. A method that
/// hits an internal error is abandoned: everything it added to either table
/// is rolled back and the remaining methods compile as if it had never been
/// seen.
///
/// # Lifetimes
///
/// - `'arena`: Lifetime of the arena holding the bound trees. Lowered trees
///   are allocated in the same arena.
///
/// # Example
///
/// ```
/// use bumpalo::Bump;
/// use cinder_core::api::{CompileOptions, Compiler};
/// use cinder_core::bound::{BoundBuilder, BoundMethod, LabelGen, LocalTable};
/// use cinder_core::symbols::{MethodDef, MethodFlags, SymbolTable, TypeDef, TypeId};
///
/// let arena = Bump::new();
/// let mut symbols = SymbolTable::new();
/// let program = symbols.add_type(TypeDef::class("Program").with_base(TypeId::OBJECT));
/// let answer = symbols.add_method(
///     MethodDef::new(program, "Answer", vec![], TypeId::INT32).with_flags(MethodFlags::STATIC),
/// );
///
/// let b = BoundBuilder::new(&arena);
/// let body = b.alloc(b.block(&[b.ret(Some(b.int32(42)))]));
///
/// let mut compiler = Compiler::new(&arena, symbols, CompileOptions::release());
/// compiler
///     .compile(BoundMethod::new(answer, body, LocalTable::new(), LabelGen::new()), Default::default())
///     .unwrap();
/// let module = compiler.finish();
/// assert_eq!(module.methods.len(), 1);
/// ```
pub struct Compiler<'arena> {
    arena: &'arena Bump,
    symbols: SymbolTable,
    tokens: TokenTable,
    options: CompileOptions,
    methods: Vec<MethodCode>,
}

impl<'arena> Compiler<'arena> {
    pub fn new(arena: &'arena Bump, symbols: SymbolTable, options: CompileOptions) -> Self {
        Self {
            arena,
            symbols,
            tokens: TokenTable::new(),
            options,
            methods: Vec::new(),
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Mutable access for hosts that declare types between methods.
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Bodies emitted so far, in emission order.
    pub fn methods(&self) -> &[MethodCode] {
        &self.methods
    }

    /// Compiles one method with the compiler's options merged with
    /// `options_override`.
    pub fn compile(
        &mut self,
        method: BoundMethod<'arena>,
        options_override: CompileOptionsOverride,
    ) -> Result<CompiledMethod, Error> {
        let id = method.method;
        let Some(def) = self.symbols.methods().get(id.0 as usize) else {
            return Err(Error::Api(format!("unknown method #{}", id.0)));
        };
        let name = String::from(def.name.as_str());

        let mut options = self.options.clone();
        options.override_with(&options_override);

        let symbols_checkpoint = self.symbols.checkpoint();
        let tokens_checkpoint = self.tokens.checkpoint();
        let emitted_before = self.methods.len();

        trace!(method = %name, "compiling method");
        match self.compile_method(method, &options) {
            Ok(compiled) => Ok(compiled),
            Err(err) => {
                self.symbols.rollback(symbols_checkpoint);
                self.tokens.rollback(tokens_checkpoint);
                self.methods.truncate(emitted_before);
                warn!(method = %name, code = err.code(), error = %err, "abandoning method after internal error");
                Err(Error::Internal {
                    method: name,
                    diagnostic: err.to_diagnostic(),
                })
            }
        }
    }

    fn compile_method(
        &mut self,
        method: BoundMethod<'arena>,
        options: &CompileOptions,
    ) -> Result<CompiledMethod, CompileError> {
        let id = method.method;
        let lowered = lowering::lower_method(self.arena, &mut self.symbols, method, options)?;
        let mut emitted = Vec::new();
        for body in lowered.bodies() {
            let code = codegen::generate(&self.symbols, &mut self.tokens, body, options)?;
            emitted.push(code.method);
            self.methods.push(code);
        }
        Ok(CompiledMethod {
            method: id,
            emitted,
            state_machine: lowered.state_machine,
        })
    }

    /// Compiles every method, continuing past failures.
    ///
    /// Returns the errors of the abandoned methods in input order.
    pub fn compile_all(&mut self, methods: impl IntoIterator<Item = BoundMethod<'arena>>) -> Vec<Error> {
        methods
            .into_iter()
            .filter_map(|method| self.compile(method, CompileOptionsOverride::default()).err())
            .collect()
    }

    pub fn finish(self) -> Module {
        Module {
            symbols: self.symbols,
            tokens: self.tokens,
            methods: self.methods,
        }
    }
}
