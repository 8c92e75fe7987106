use bumpalo::Bump;
use cinder_types::ConversionKind;

use super::{
    BinaryOp, CatchClause, ConstantValue, Expr, ExprKind, LabelId, LocalId, Stmt, StmtKind,
    UnaryOp,
};
use crate::symbols::{FieldId, MethodId, TypeId};
use crate::syntax::Span;

/// Arena-backed constructors for bound nodes.
///
/// Lowering passes build synthesized nodes through this; hosts can use it to
/// assemble bound trees by hand.
#[derive(Copy, Clone)]
pub struct BoundBuilder<'a> {
    arena: &'a Bump,
}

impl<'a> BoundBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self { arena }
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    pub fn alloc<T>(&self, value: T) -> &'a T {
        self.arena.alloc(value)
    }

    pub fn expr(&self, ty: TypeId, kind: ExprKind<'a>, span: Span) -> &'a Expr<'a> {
        self.arena.alloc(Expr::new(ty, kind, span))
    }

    pub fn stmt(&self, kind: StmtKind<'a>, span: Span) -> Stmt<'a> {
        Stmt::new(kind, span)
    }

    pub fn exprs(&self, items: &[Expr<'a>]) -> &'a [Expr<'a>] {
        self.arena.alloc_slice_copy(items)
    }

    pub fn stmts(&self, items: &[Stmt<'a>]) -> &'a [Stmt<'a>] {
        self.arena.alloc_slice_copy(items)
    }

    // === Expressions ===

    pub fn literal(&self, ty: TypeId, value: ConstantValue<'a>) -> &'a Expr<'a> {
        self.arena
            .alloc(Expr::new(ty, ExprKind::Literal(value), Span::EMPTY).with_constant(value))
    }

    pub fn int32(&self, value: i32) -> &'a Expr<'a> {
        self.literal(TypeId::INT32, ConstantValue::Int32(value))
    }

    pub fn bool(&self, value: bool) -> &'a Expr<'a> {
        self.literal(TypeId::BOOL, ConstantValue::Bool(value))
    }

    pub fn string(&self, value: &str) -> &'a Expr<'a> {
        let value = self.arena.alloc_str(value);
        self.literal(TypeId::STRING, ConstantValue::String(value))
    }

    pub fn default_of(&self, ty: TypeId) -> &'a Expr<'a> {
        self.expr(ty, ExprKind::Default, Span::EMPTY)
    }

    pub fn local(&self, id: LocalId, ty: TypeId) -> &'a Expr<'a> {
        self.expr(ty, ExprKind::Local(id), Span::EMPTY)
    }

    pub fn parameter(&self, index: u16, ty: TypeId) -> &'a Expr<'a> {
        self.expr(ty, ExprKind::Parameter(index), Span::EMPTY)
    }

    pub fn this(&self, ty: TypeId) -> &'a Expr<'a> {
        self.expr(ty, ExprKind::This, Span::EMPTY)
    }

    /// Binary operation whose operands already have `operand_ty`.
    pub fn binary(&self, op: BinaryOp, left: &'a Expr<'a>, right: &'a Expr<'a>, ty: TypeId) -> &'a Expr<'a> {
        self.expr(
            ty,
            ExprKind::Binary {
                op,
                operand_ty: left.ty,
                left,
                right,
            },
            left.span.merge(right.span),
        )
    }

    pub fn unary(&self, op: UnaryOp, operand: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(operand.ty, ExprKind::Unary { op, operand }, operand.span)
    }

    pub fn convert(&self, operand: &'a Expr<'a>, ty: TypeId, kind: ConversionKind) -> &'a Expr<'a> {
        self.expr(ty, ExprKind::Conversion { operand, kind }, operand.span)
    }

    pub fn call(
        &self,
        receiver: Option<&'a Expr<'a>>,
        method: MethodId,
        args: &[Expr<'a>],
        ret: TypeId,
    ) -> &'a Expr<'a> {
        self.expr(
            ret,
            ExprKind::Call {
                receiver,
                method,
                args: self.exprs(args),
            },
            Span::EMPTY,
        )
    }

    pub fn new_object(&self, ctor: MethodId, args: &[Expr<'a>], ty: TypeId) -> &'a Expr<'a> {
        self.expr(
            ty,
            ExprKind::ObjectCreation {
                ctor,
                args: self.exprs(args),
            },
            Span::EMPTY,
        )
    }

    pub fn field(&self, receiver: Option<&'a Expr<'a>>, field: FieldId, ty: TypeId) -> &'a Expr<'a> {
        self.expr(ty, ExprKind::FieldAccess { receiver, field }, Span::EMPTY)
    }

    pub fn assign(&self, target: &'a Expr<'a>, value: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(
            target.ty,
            ExprKind::Assignment { target, value },
            target.span.merge(value.span),
        )
    }

    // === Statements ===

    pub fn expr_stmt(&self, expr: &'a Expr<'a>) -> Stmt<'a> {
        Stmt::new(StmtKind::Expression(expr), expr.span)
    }

    pub fn assign_stmt(&self, target: &'a Expr<'a>, value: &'a Expr<'a>) -> Stmt<'a> {
        self.expr_stmt(self.assign(target, value))
    }

    pub fn block(&self, stmts: &[Stmt<'a>]) -> Stmt<'a> {
        self.block_with_locals(&[], stmts)
    }

    pub fn block_with_locals(&self, locals: &[LocalId], stmts: &[Stmt<'a>]) -> Stmt<'a> {
        Stmt::new(
            StmtKind::Block {
                locals: self.arena.alloc_slice_copy(locals),
                stmts: self.stmts(stmts),
            },
            Span::EMPTY,
        )
    }

    pub fn label(&self, label: LabelId) -> Stmt<'a> {
        Stmt::new(StmtKind::Label(label), Span::EMPTY)
    }

    pub fn goto(&self, label: LabelId) -> Stmt<'a> {
        Stmt::new(StmtKind::Goto(label), Span::EMPTY)
    }

    pub fn cond_goto(&self, cond: &'a Expr<'a>, jump_if: bool, label: LabelId) -> Stmt<'a> {
        Stmt::new(StmtKind::ConditionalGoto { cond, jump_if, label }, cond.span)
    }

    pub fn switch(&self, value: &'a Expr<'a>, targets: &[LabelId]) -> Stmt<'a> {
        Stmt::new(
            StmtKind::Switch {
                value,
                targets: self.arena.alloc_slice_copy(targets),
            },
            Span::EMPTY,
        )
    }

    pub fn ret(&self, value: Option<&'a Expr<'a>>) -> Stmt<'a> {
        Stmt::new(StmtKind::Return(value), Span::EMPTY)
    }

    pub fn throw(&self, value: Option<&'a Expr<'a>>) -> Stmt<'a> {
        Stmt::new(StmtKind::Throw(value), Span::EMPTY)
    }

    pub fn try_stmt(&self, body: Stmt<'a>, catches: &[CatchClause<'a>], finally: Option<Stmt<'a>>) -> Stmt<'a> {
        Stmt::new(
            StmtKind::Try {
                body: self.alloc(body),
                catches: self.arena.alloc_slice_copy(catches),
                finally: finally.map(|stmt| self.alloc(stmt)),
            },
            Span::EMPTY,
        )
    }

    pub fn marker(&self, stmt: Stmt<'a>) -> Stmt<'a> {
        let span = stmt.span;
        Stmt::new(StmtKind::Marker(self.alloc(stmt)), span)
    }
}
