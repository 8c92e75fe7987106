//! Instruction emission for lowered method bodies.
//!
//! [`generate`] turns one lowered [`BoundMethod`] into a [`MethodCode`]: a
//! flat instruction stream with resolved branch targets, typed local slots,
//! exception regions, and sequence points. Symbol references go through the
//! module-wide [`TokenTable`].

pub mod array_init;
mod emitter;
pub mod instruction;
mod slots;
pub mod tokens;
pub mod verify;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use instruction::{CallShape, Instruction, NumericTarget, StackEffect};
pub use tokens::{Token, TokenCheckpoint, TokenEntry, TokenKey, TokenRemap, TokenTable, TokenTag};

use crate::Vec;
use crate::api::CompileOptions;
use crate::bound::BoundMethod;
use crate::error::CompileError;
use crate::symbols::{MethodId, SymbolTable, TypeId};
use crate::syntax::Span;
use emitter::Emitter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    /// Catches exceptions assignable to the token's type.
    Catch(Token),
    Finally,
}

/// A protected range and its handler, as half-open instruction ranges.
///
/// Regions are listed innermost first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExceptionRegion {
    pub kind: RegionKind,
    pub try_start: u32,
    pub try_end: u32,
    pub handler_start: u32,
    pub handler_end: u32,
}

/// Maps an instruction offset back to the user statement starting there.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequencePoint {
    pub offset: u32,
    pub span: Span,
}

/// Emitted body of one method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCode {
    pub method: MethodId,
    pub instructions: Vec<Instruction>,
    /// Type of each local slot.
    pub locals: Vec<TypeId>,
    pub max_stack: u32,
    pub regions: Vec<ExceptionRegion>,
    pub sequence_points: Vec<SequencePoint>,
    pub returns_value: bool,
}

impl MethodCode {
    /// Stable binary form. Equal inputs always produce equal bytes.
    pub fn encode(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    /// Rewrites every token after the table that issued them was merged
    /// into another.
    pub fn remap(&mut self, remap: &TokenRemap) {
        for instruction in &mut self.instructions {
            if let Some(token) = instruction.token_mut() {
                *token = remap.apply(*token);
            }
        }
        for region in &mut self.regions {
            if let RegionKind::Catch(token) = &mut region.kind {
                *token = remap.apply(*token);
            }
        }
    }
}

/// Emits one lowered method body.
///
/// The body must already be lowered: structured statements, `await`,
/// `yield` and compound assignments are rejected as unexpected nodes.
pub fn generate(
    symbols: &SymbolTable,
    tokens: &mut TokenTable,
    method: &BoundMethod<'_>,
    options: &CompileOptions,
) -> Result<MethodCode, CompileError> {
    let def = symbols.method(method.method);
    let emitted = Emitter::new(symbols, tokens, method.method, method.body, &method.locals, options)?
        .emit_body(method.body)?;

    if options.verify {
        let verified = verify::verify(&emitted.instructions, &emitted.regions, def.returns_value())?;
        debug_assert!(verified <= emitted.max_stack);
    }

    debug!(
        method = %def.name,
        instructions = emitted.instructions.len(),
        locals = emitted.locals.len(),
        max_stack = emitted.max_stack,
        regions = emitted.regions.len(),
        "emitted method body"
    );

    Ok(MethodCode {
        method: method.method,
        instructions: emitted.instructions,
        locals: emitted.locals,
        max_stack: emitted.max_stack,
        regions: emitted.regions,
        sequence_points: emitted.sequence_points,
        returns_value: def.returns_value(),
    })
}

#[cfg(test)]
#[path = "emitter_test.rs"]
mod emitter_test;
