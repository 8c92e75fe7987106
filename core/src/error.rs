//! Internal compiler errors.
//!
//! Every error here means the back end met input it cannot handle or broke
//! one of its own invariants. Errors are fatal for the method being compiled
//! and are reported to the host as [`crate::api::Error`] values.

use crate::api::{Diagnostic, Severity};
use crate::symbols::WellKnownMember;
use crate::syntax::Span;
use crate::{String, ToString, Vec};

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lowering,
    StateMachine,
    Emit,
    Verify,
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Stage::Lowering => "lowering",
            Stage::StateMachine => "state machine lowering",
            Stage::Emit => "emission",
            Stage::Verify => "verification",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("unexpected {node} node during {stage}")]
    UnexpectedNode {
        stage: Stage,
        node: &'static str,
        span: Span,
    },

    #[error("evaluation stack underflow at instruction {offset}")]
    StackUnderflow { offset: usize },

    #[error("stack height mismatch at instruction {offset}: expected {expected}, found {actual}")]
    StackImbalance {
        offset: usize,
        expected: u32,
        actual: u32,
    },

    #[error("no token can be produced for {0}")]
    UnresolvedSymbol(String),

    #[error("well-known member {0:?} is not registered")]
    MissingWellKnownMember(WellKnownMember),

    #[error("type `{owner}` has no member `{name}`")]
    MissingMember { owner: String, name: String },

    #[error("unsupported operand: {0}")]
    UnsupportedOperand(String),

    #[error("no conversion from `{from}` to `{to}`")]
    MissingConversion { from: String, to: String },

    #[error("method needs more than 65535 local slots")]
    TooManyLocals,

    #[error("label L{0} is referenced but never placed")]
    UndefinedLabel(u32),

    #[error("branch to label L{0} enters a protected region")]
    BranchIntoProtectedRegion(u32),

    #[error("suspension point inside a catch or finally handler")]
    SuspensionInHandler { span: Span },

    #[error("rethrow outside of a catch handler")]
    RethrowOutsideCatch,
}

impl CompileError {
    pub(crate) fn unexpected(stage: Stage, node: &'static str, span: Span) -> Self {
        CompileError::UnexpectedNode { stage, node, span }
    }

    pub fn span(&self) -> Span {
        match self {
            CompileError::UnexpectedNode { span, .. }
            | CompileError::SuspensionInHandler { span } => *span,
            _ => Span::EMPTY,
        }
    }

    /// Stable code for documentation lookup.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::UnexpectedNode { .. } => "C0001",
            CompileError::StackUnderflow { .. } => "C0002",
            CompileError::StackImbalance { .. } => "C0003",
            CompileError::UnresolvedSymbol(_) => "C0004",
            CompileError::MissingWellKnownMember(_) => "C0005",
            CompileError::MissingMember { .. } => "C0006",
            CompileError::UnsupportedOperand(_) => "C0007",
            CompileError::MissingConversion { .. } => "C0008",
            CompileError::TooManyLocals => "C0009",
            CompileError::UndefinedLabel(_) => "C0010",
            CompileError::BranchIntoProtectedRegion(_) => "C0011",
            CompileError::SuspensionInHandler { .. } => "C0012",
            CompileError::RethrowOutsideCatch => "C0013",
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut help = Vec::new();
        match self {
            CompileError::MissingWellKnownMember(_) => {
                help.push("register the member with `SymbolTable::register_well_known` or call `declare_core_library`".to_string());
            }
            CompileError::SuspensionInHandler { .. } => {
                help.push("move the await or yield out of the handler".to_string());
            }
            _ => {}
        }
        Diagnostic {
            severity: Severity::Error,
            message: self.to_string(),
            span: self.span(),
            related: Vec::new(),
            help,
            code: Some(self.code().to_string()),
        }
    }
}
