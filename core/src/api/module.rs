//! The compiled output of one module.

use serde::Serialize;

use super::Error;
use crate::Vec;
use crate::codegen::{MethodCode, TokenEntry, TokenTable};
use crate::symbols::{MethodId, SymbolTable};

/// Symbols, tokens and method bodies handed to the module writer.
#[derive(Clone, Debug)]
pub struct Module {
    /// Input symbols plus every synthesized state machine type.
    pub symbols: SymbolTable,
    pub tokens: TokenTable,
    pub methods: Vec<MethodCode>,
}

/// Serialized form: the token table and the method bodies.
#[derive(Serialize)]
struct Image<'m> {
    tokens: &'m [TokenEntry],
    methods: &'m [MethodCode],
}

impl Module {
    pub fn method(&self, id: MethodId) -> Option<&MethodCode> {
        self.methods.iter().find(|code| code.method == id)
    }

    /// Stable binary image. Compiling the same input twice yields the same
    /// bytes.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let image = Image {
            tokens: self.tokens.entries(),
            methods: &self.methods,
        };
        Ok(postcard::to_allocvec(&image)?)
    }

    /// Appends the bodies and tokens of `other`, rewriting its tokens to
    /// this module's rows. Symbols of `other` are not carried over; both
    /// modules must have been compiled against the same symbol table.
    pub fn absorb(&mut self, other: Module) {
        let remap = self.tokens.merge(&other.tokens);
        self.methods.extend(other.methods.into_iter().map(|mut code| {
            code.remap(&remap);
            code
        }));
    }
}
