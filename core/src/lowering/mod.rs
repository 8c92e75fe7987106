//! Tree-to-tree lowering of one method body.
//!
//! [`lower_method`] runs the [`LocalRewriter`] and, for async and iterator
//! methods, [`state_machine`] lowering. The result only contains the node
//! shapes the code generator accepts.

pub mod rewriter;
pub mod state_machine;

pub use rewriter::LocalRewriter;
pub use state_machine::{Capabilities, StateMachineInfo, StateMachineKind, capabilities};

use bumpalo::Bump;
use tracing::trace;

use crate::Vec;
use crate::api::CompileOptions;
use crate::bound::walk::{Node, Walk, walk};
use crate::bound::{BoundBuilder, BoundMethod, Expr, ExprKind, Stmt, StmtKind};
use crate::error::{CompileError, Stage};
use crate::symbols::{MethodKind, SymbolTable, TypeId};

/// Output of [`lower_method`].
#[derive(Debug)]
pub struct LoweredMethod<'a> {
    /// The original method. For state machines its body only creates and
    /// starts the machine.
    pub kickoff: BoundMethod<'a>,
    /// Methods of the synthesized state machine type, if any.
    pub synthesized: Vec<BoundMethod<'a>>,
    pub state_machine: Option<StateMachineInfo>,
}

impl<'a> LoweredMethod<'a> {
    /// Every body to hand to the code generator, kickoff first.
    pub fn bodies(&self) -> impl Iterator<Item = &BoundMethod<'a>> {
        core::iter::once(&self.kickoff).chain(self.synthesized.iter())
    }
}

/// Lowers one bound method.
///
/// Whether a state machine is built is decided by the declared
/// [`MethodKind`]: an async method without any `await` still gets one, and an
/// ordinary method containing a suspension point is an internal error.
pub fn lower_method<'a>(
    arena: &'a Bump,
    symbols: &mut SymbolTable,
    method: BoundMethod<'a>,
    options: &CompileOptions,
) -> Result<LoweredMethod<'a>, CompileError> {
    let b = BoundBuilder::new(arena);
    let def = symbols.method(method.method);
    let kind = def.kind;
    trace!(method = %def.name, ?kind, "lowering method");

    let return_ty = direct_return_type(symbols, kind, def.ret)?;
    let BoundMethod {
        method: id,
        body,
        mut locals,
        mut labels,
    } = method;
    let body = LocalRewriter::new(b, symbols, &mut locals, &mut labels)
        .instrument(options.instrument)
        .returning(return_ty)
        .rewrite_body(body)?;
    let method = BoundMethod::new(id, body, locals, labels);

    match StateMachineKind::of(kind) {
        Some(machine) => state_machine::lower_state_machine(b, symbols, method, machine, options),
        None => {
            if let Some(node) = first_suspension(body) {
                return Err(CompileError::unexpected(Stage::Lowering, node.0, node.1));
            }
            Ok(LoweredMethod {
                kickoff: method,
                synthesized: Vec::new(),
                state_machine: None,
            })
        }
    }
}

/// Type a `return` statement's value has after lowering: the declared return
/// type for ordinary methods, the builder's result type for async methods.
fn direct_return_type(
    symbols: &SymbolTable,
    kind: MethodKind,
    ret: TypeId,
) -> Result<Option<TypeId>, CompileError> {
    Ok(match kind {
        MethodKind::Ordinary if ret != TypeId::VOID => Some(ret),
        MethodKind::Async { builder } => {
            let set_result = symbols.require_method(builder, "SetResult")?;
            symbols.method(set_result).params.first().map(|param| param.ty)
        }
        _ => None,
    })
}

/// Name and span of the first `await`, `yield return` or `yield break`.
pub(crate) fn first_suspension(stmt: &Stmt<'_>) -> Option<(&'static str, crate::syntax::Span)> {
    let mut found = None;
    walk(Node::Stmt(stmt), |node| match node {
        Node::Stmt(Stmt {
            kind: kind @ (StmtKind::YieldReturn(_) | StmtKind::YieldBreak),
            span,
        }) => {
            found = Some((kind.name(), *span));
            Walk::Stop
        }
        Node::Expr(Expr {
            kind: kind @ ExprKind::Await { .. },
            span,
            ..
        }) => {
            found = Some((kind.name(), *span));
            Walk::Stop
        }
        _ => Walk::Recurse,
    });
    found
}

#[cfg(test)]
mod lowering_test;
