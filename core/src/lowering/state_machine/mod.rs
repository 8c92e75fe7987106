//! Lowering of suspending methods into resumable state machines.
//!
//! The pipeline is: reject suspension inside handlers, move awaits to
//! statement position ([`spill`]), choose locals that must survive
//! suspension ([`hoisting`]), declare the machine type, rewrite the body into
//! `MoveNext` ([`rewrite`]) and build the remaining members
//! ([`synthesize`]).
//!
//! States: [`INITIAL_STATE`] before the first call, `1..=n` for the
//! suspension points in lexical order, [`RUNNING_STATE`] while executing and
//! [`FINISHED_STATE`] once done.

mod hoisting;
mod rewrite;
mod spill;
mod synthesize;

use bitflags::bitflags;
use tracing::debug;

use super::LoweredMethod;
use crate::Vec;
use crate::api::CompileOptions;
use crate::bound::walk::{Node, Walk, walk};
use crate::bound::{BoundBuilder, BoundMethod, LocalId, Stmt, StmtKind};
use crate::error::CompileError;
use crate::symbols::{FieldId, MethodId, MethodKind, SymbolTable, TypeId};

pub const INITIAL_STATE: i32 = 0;
pub const RUNNING_STATE: i32 = -1;
pub const FINISHED_STATE: i32 = -2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StateMachineKind {
    Async,
    SyncIterator,
    AsyncIterator,
}

impl StateMachineKind {
    /// Machine kind for a method kind; `None` for ordinary methods.
    pub fn of(kind: MethodKind) -> Option<Self> {
        match kind {
            MethodKind::Ordinary => None,
            MethodKind::Async { .. } => Some(StateMachineKind::Async),
            MethodKind::Iterator { .. } => Some(StateMachineKind::SyncIterator),
            MethodKind::AsyncIterator { .. } => Some(StateMachineKind::AsyncIterator),
        }
    }

    pub fn is_iterator(self) -> bool {
        !matches!(self, StateMachineKind::Async)
    }
}

bitflags! {
    /// What a state machine must support.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// `MoveNext`.
        const ADVANCE = 1;
        /// Builder completion plus `AwaitOnCompleted`.
        const AWAIT_HOOKUP = 1 << 1;
        /// `Current` accessor.
        const CURRENT = 1 << 2;
        const DISPOSE = 1 << 3;
    }
}

pub const fn capabilities(kind: StateMachineKind) -> Capabilities {
    match kind {
        StateMachineKind::Async => Capabilities::ADVANCE.union(Capabilities::AWAIT_HOOKUP),
        StateMachineKind::SyncIterator => Capabilities::ADVANCE
            .union(Capabilities::CURRENT)
            .union(Capabilities::DISPOSE),
        StateMachineKind::AsyncIterator => Capabilities::ADVANCE
            .union(Capabilities::CURRENT)
            .union(Capabilities::DISPOSE)
            .union(Capabilities::AWAIT_HOOKUP),
    }
}

/// The synthesized type and members of one lowered method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateMachineInfo {
    pub kind: StateMachineKind,
    pub ty: TypeId,
    pub state_field: FieldId,
    pub builder_field: Option<FieldId>,
    pub current_field: Option<FieldId>,
    /// Locals that became fields, by local id.
    pub hoisted: Vec<(LocalId, FieldId)>,
    /// Resume states in lexical order, `1..=n`.
    pub resume_states: Vec<i32>,
    pub constructor: MethodId,
    pub move_next: MethodId,
    pub current: Option<MethodId>,
    pub dispose: Option<MethodId>,
}

impl StateMachineInfo {
    pub fn capabilities(&self) -> Capabilities {
        capabilities(self.kind)
    }

    /// States the top-level dispatch can jump on: the initial state plus one
    /// per resume point.
    pub fn dispatch_states(&self) -> usize {
        1 + self.resume_states.len()
    }
}

pub(crate) fn lower_state_machine<'a>(
    b: BoundBuilder<'a>,
    symbols: &mut SymbolTable,
    method: BoundMethod<'a>,
    kind: StateMachineKind,
    options: &CompileOptions,
) -> Result<LoweredMethod<'a>, CompileError> {
    let BoundMethod {
        method: id,
        body,
        mut locals,
        mut labels,
    } = method;

    check_handlers(body)?;
    let body = spill::spill_awaits(b, symbols, &mut locals, &mut labels, body)?;
    let hoisted = hoisting::hoisted_locals(body, &locals, options.optimization);
    let mut layout = synthesize::declare_machine(symbols, id, kind, &locals, &hoisted)?;
    let move_next = rewrite::rewrite_move_next(b, symbols, &mut locals, &mut labels, &mut layout, body)?;
    let lowered = synthesize::synthesize_members(b, symbols, &layout, move_next, locals, labels, id)?;

    if let Some(info) = &lowered.state_machine {
        debug!(
            machine = %symbols.type_name(info.ty),
            ?kind,
            states = info.resume_states.len(),
            hoisted = info.hoisted.len(),
            "synthesized state machine"
        );
    }
    Ok(lowered)
}

/// Suspending inside a catch or finally handler is not supported.
fn check_handlers(body: &Stmt<'_>) -> Result<(), CompileError> {
    let mut error = None;
    walk(Node::Stmt(body), |node| {
        if let Node::Stmt(Stmt {
            kind: StmtKind::Try { catches, finally, .. },
            ..
        }) = node
        {
            let handlers = catches.iter().map(|clause| clause.body).chain(*finally);
            for handler in handlers {
                if let Some((_, span)) = super::first_suspension(handler) {
                    error = Some(CompileError::SuspensionInHandler { span });
                    return Walk::Stop;
                }
            }
        }
        Walk::Recurse
    });
    match error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
