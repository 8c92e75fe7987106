use super::{Expr, LabelId, LocalId};
use crate::symbols::TypeId;
use crate::syntax::Span;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Stmt<'a> {
    pub kind: StmtKind<'a>,
    pub span: Span,
}

impl<'a> Stmt<'a> {
    pub fn new(kind: StmtKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn node_name(&self) -> &'static str {
        self.kind.name()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CatchClause<'a> {
    pub exception_type: TypeId,
    /// Local receiving the caught exception, if the clause names one.
    pub local: Option<LocalId>,
    pub body: &'a Stmt<'a>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StmtKind<'a> {
    Block {
        locals: &'a [LocalId],
        stmts: &'a [Stmt<'a>],
    },
    Expression(&'a Expr<'a>),
    LocalDeclaration {
        local: LocalId,
        init: Option<&'a Expr<'a>>,
    },
    If {
        cond: &'a Expr<'a>,
        then: &'a Stmt<'a>,
        otherwise: Option<&'a Stmt<'a>>,
    },
    While {
        cond: &'a Expr<'a>,
        body: &'a Stmt<'a>,
    },
    DoWhile {
        body: &'a Stmt<'a>,
        cond: &'a Expr<'a>,
    },
    For {
        init: &'a [Stmt<'a>],
        cond: Option<&'a Expr<'a>>,
        step: &'a [Expr<'a>],
        body: &'a Stmt<'a>,
    },
    Labeled {
        label: LabelId,
        stmt: &'a Stmt<'a>,
    },
    Goto(LabelId),
    Break,
    Continue,
    Return(Option<&'a Expr<'a>>),
    /// `None` re-throws the exception being handled.
    Throw(Option<&'a Expr<'a>>),
    Try {
        body: &'a Stmt<'a>,
        catches: &'a [CatchClause<'a>],
        finally: Option<&'a Stmt<'a>>,
    },
    YieldReturn(&'a Expr<'a>),
    YieldBreak,
    Label(LabelId),
    ConditionalGoto {
        cond: &'a Expr<'a>,
        jump_if: bool,
        label: LabelId,
    },
    /// Jumps to `targets[value]` when `value` is in range, falls through
    /// otherwise.
    Switch {
        value: &'a Expr<'a>,
        targets: &'a [LabelId],
    },
    /// Instrumentation wrapper marking a user statement for debug mapping.
    Marker(&'a Stmt<'a>),
}

impl StmtKind<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            StmtKind::Block { .. } => "block",
            StmtKind::Expression(_) => "expression statement",
            StmtKind::LocalDeclaration { .. } => "local declaration",
            StmtKind::If { .. } => "if",
            StmtKind::While { .. } => "while",
            StmtKind::DoWhile { .. } => "do",
            StmtKind::For { .. } => "for",
            StmtKind::Labeled { .. } => "labeled statement",
            StmtKind::Goto(_) => "goto",
            StmtKind::Break => "break",
            StmtKind::Continue => "continue",
            StmtKind::Return(_) => "return",
            StmtKind::Throw(_) => "throw",
            StmtKind::Try { .. } => "try",
            StmtKind::YieldReturn(_) => "yield return",
            StmtKind::YieldBreak => "yield break",
            StmtKind::Label(_) => "label",
            StmtKind::ConditionalGoto { .. } => "conditional goto",
            StmtKind::Switch { .. } => "switch",
            StmtKind::Marker(_) => "marker",
        }
    }
}
