use cinder_types::ConversionKind;

use super::{ConstantValue, LocalId};
use crate::symbols::{FieldId, MethodId, TypeId};
use crate::syntax::Span;

/// A typed expression node.
///
/// `constant` is set when the binder proved the value at compile time; the
/// rewriter replaces such nodes with literals.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Expr<'a> {
    pub ty: TypeId,
    pub kind: ExprKind<'a>,
    pub constant: Option<ConstantValue<'a>>,
    pub span: Span,
}

impl<'a> Expr<'a> {
    pub fn new(ty: TypeId, kind: ExprKind<'a>, span: Span) -> Self {
        Self {
            ty,
            kind,
            constant: None,
            span,
        }
    }

    pub fn with_constant(mut self, value: ConstantValue<'a>) -> Self {
        self.constant = Some(value);
        self
    }

    pub fn is_void(&self) -> bool {
        self.ty == TypeId::VOID
    }

    /// Node name used in internal error messages.
    pub fn node_name(&self) -> &'static str {
        self.kind.name()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    /// Bitwise complement.
    Not,
    LogicalNot,
}

/// Members resolved by the binder for one `await`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AwaitInfo {
    pub get_awaiter: MethodId,
    pub is_completed: MethodId,
    pub get_result: MethodId,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MemberInit<'a> {
    pub name: &'a str,
    pub value: Expr<'a>,
}

/// Nested initializer of an array creation, one level per dimension.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ArrayInitializer<'a> {
    pub items: &'a [InitItem<'a>],
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InitItem<'a> {
    Value(Expr<'a>),
    Nested(ArrayInitializer<'a>),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ExprKind<'a> {
    Literal(ConstantValue<'a>),
    /// Zero value of the node's type; `null` for references.
    Default,
    Local(LocalId),
    Parameter(u16),
    This,
    Binary {
        op: BinaryOp,
        /// Type both operands are converted to before the operation.
        operand_ty: TypeId,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Unary {
        op: UnaryOp,
        operand: &'a Expr<'a>,
    },
    Conversion {
        operand: &'a Expr<'a>,
        kind: ConversionKind,
    },
    Conditional {
        cond: &'a Expr<'a>,
        when_true: &'a Expr<'a>,
        when_false: &'a Expr<'a>,
    },
    Call {
        receiver: Option<&'a Expr<'a>>,
        method: MethodId,
        args: &'a [Expr<'a>],
    },
    ObjectCreation {
        ctor: MethodId,
        args: &'a [Expr<'a>],
    },
    /// Record-like literal with named members, lowered to positional
    /// construction.
    AnonymousObject {
        ctor: MethodId,
        members: &'a [MemberInit<'a>],
    },
    FieldAccess {
        /// `None` for static fields.
        receiver: Option<&'a Expr<'a>>,
        field: FieldId,
    },
    ArrayElement {
        array: &'a Expr<'a>,
        indices: &'a [Expr<'a>],
    },
    ArrayLength {
        array: &'a Expr<'a>,
    },
    ArrayCreation {
        element: TypeId,
        sizes: &'a [Expr<'a>],
        initializer: Option<ArrayInitializer<'a>>,
    },
    /// Read-only span over a fresh array; `ctor` takes the array.
    SpanFromArray {
        array: &'a Expr<'a>,
        ctor: MethodId,
    },
    Assignment {
        target: &'a Expr<'a>,
        value: &'a Expr<'a>,
    },
    CompoundAssignment {
        op: BinaryOp,
        operand_ty: TypeId,
        target: &'a Expr<'a>,
        value: &'a Expr<'a>,
    },
    Await {
        operand: &'a Expr<'a>,
        info: AwaitInfo,
    },
    Throw {
        exception: &'a Expr<'a>,
    },
    /// Evaluates `effects` for their side effects, then `value`.
    Sequence {
        effects: &'a [Expr<'a>],
        value: &'a Expr<'a>,
    },
}

impl ExprKind<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::Literal(_) => "literal",
            ExprKind::Default => "default",
            ExprKind::Local(_) => "local",
            ExprKind::Parameter(_) => "parameter",
            ExprKind::This => "this",
            ExprKind::Binary { .. } => "binary",
            ExprKind::Unary { .. } => "unary",
            ExprKind::Conversion { .. } => "conversion",
            ExprKind::Conditional { .. } => "conditional",
            ExprKind::Call { .. } => "call",
            ExprKind::ObjectCreation { .. } => "object creation",
            ExprKind::AnonymousObject { .. } => "anonymous object",
            ExprKind::FieldAccess { .. } => "field access",
            ExprKind::ArrayElement { .. } => "array element",
            ExprKind::ArrayLength { .. } => "array length",
            ExprKind::ArrayCreation { .. } => "array creation",
            ExprKind::SpanFromArray { .. } => "span from array",
            ExprKind::Assignment { .. } => "assignment",
            ExprKind::CompoundAssignment { .. } => "compound assignment",
            ExprKind::Await { .. } => "await",
            ExprKind::Throw { .. } => "throw expression",
            ExprKind::Sequence { .. } => "sequence",
        }
    }
}
