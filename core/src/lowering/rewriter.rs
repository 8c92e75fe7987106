//! Lowering of structured control flow and expression sugar.
//!
//! The output only contains blocks, labels, gotos, conditional gotos,
//! switches, returns, throws, try regions, yields and markers at statement
//! level. Running the rewriter over its own output changes nothing.

use cinder_types::ConversionKind;

use crate::bound::walk::{left_spine, map_children, map_initializer};
use crate::bound::{
    BinaryOp, BoundBuilder, CatchClause, ConstantValue, Expr, ExprKind, LabelGen, LabelId,
    LocalTable, MemberInit, Stmt, StmtKind, UnaryOp,
};
use crate::error::{CompileError, Stage};
use crate::symbols::{MethodId, SymbolTable, TypeId};
use crate::syntax::Span;
use crate::{ToString, Vec, format};

#[derive(Copy, Clone, Debug)]
struct LoopLabels {
    brk: LabelId,
    cont: LabelId,
}

pub struct LocalRewriter<'a, 's> {
    b: BoundBuilder<'a>,
    symbols: &'s SymbolTable,
    locals: &'s mut LocalTable,
    labels: &'s mut LabelGen,
    instrument: bool,
    /// Type `return` values are converted to, when the method returns one
    /// directly.
    return_ty: Option<TypeId>,
    loops: Vec<LoopLabels>,
}

impl<'a, 's> LocalRewriter<'a, 's> {
    pub fn new(
        b: BoundBuilder<'a>,
        symbols: &'s SymbolTable,
        locals: &'s mut LocalTable,
        labels: &'s mut LabelGen,
    ) -> Self {
        Self {
            b,
            symbols,
            locals,
            labels,
            instrument: false,
            return_ty: None,
            loops: Vec::new(),
        }
    }

    /// Wrap user statements in instrumentation markers.
    pub fn instrument(mut self, instrument: bool) -> Self {
        self.instrument = instrument;
        self
    }

    pub fn returning(mut self, return_ty: Option<TypeId>) -> Self {
        self.return_ty = return_ty;
        self
    }

    pub fn rewrite_body(&mut self, body: &'a Stmt<'a>) -> Result<&'a Stmt<'a>, CompileError> {
        let lowered = self.rewrite_stmt(body)?;
        Ok(self.b.alloc(lowered))
    }

    // === Statements ===

    fn rewrite_stmt(&mut self, stmt: &'a Stmt<'a>) -> Result<Stmt<'a>, CompileError> {
        self.lower_stmt(stmt, true)
    }

    fn mark(&self, stmt: Stmt<'a>, mark: bool) -> Stmt<'a> {
        if mark && self.instrument {
            self.b.marker(stmt)
        } else {
            stmt
        }
    }

    fn block(&self, stmts: &[Stmt<'a>], span: Span) -> Stmt<'a> {
        Stmt::new(
            StmtKind::Block {
                locals: &[],
                stmts: self.b.stmts(stmts),
            },
            span,
        )
    }

    /// `mark` is false for the statement directly under an existing marker.
    fn lower_stmt(&mut self, stmt: &'a Stmt<'a>, mark: bool) -> Result<Stmt<'a>, CompileError> {
        let b = self.b;
        let span = stmt.span;
        Ok(match stmt.kind {
            StmtKind::Block { locals, stmts } => {
                let mut lowered = Vec::with_capacity(stmts.len());
                for stmt in stmts {
                    lowered.push(self.rewrite_stmt(stmt)?);
                }
                Stmt::new(
                    StmtKind::Block {
                        locals,
                        stmts: b.stmts(&lowered),
                    },
                    span,
                )
            }
            StmtKind::Expression(expr) => {
                let lowered = self.expression_stmt(expr, span)?;
                self.mark(lowered, mark)
            }
            StmtKind::LocalDeclaration { local, init: Some(init) } => {
                let ty = self.locals.get(local).ty;
                let target = b.expr(ty, ExprKind::Local(local), span);
                let value = self.rewrite_expr(init)?;
                let value = self.coerce(value, ty)?;
                let assign = b.assign(target, value);
                self.mark(Stmt::new(StmtKind::Expression(assign), span), mark)
            }
            StmtKind::LocalDeclaration { init: None, .. } => self.block(&[], span),
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.condition(cond)?;
                let then = self.rewrite_stmt(then)?;
                match otherwise {
                    None => {
                        let end = self.labels.fresh();
                        let test = self.mark(b.cond_goto(cond, false, end), mark);
                        self.block(&[test, then, b.label(end)], span)
                    }
                    Some(otherwise) => {
                        let otherwise = self.rewrite_stmt(otherwise)?;
                        let (else_label, end) = (self.labels.fresh(), self.labels.fresh());
                        let test = self.mark(b.cond_goto(cond, false, else_label), mark);
                        self.block(
                            &[
                                test,
                                then,
                                b.goto(end),
                                b.label(else_label),
                                otherwise,
                                b.label(end),
                            ],
                            span,
                        )
                    }
                }
            }
            StmtKind::While { cond, body } => {
                let (start, cont, brk) = (self.labels.fresh(), self.labels.fresh(), self.labels.fresh());
                let body = self.loop_body(body, brk, cont)?;
                let cond = self.condition(cond)?;
                let test = self.mark(b.cond_goto(cond, true, start), mark);
                self.block(
                    &[
                        b.goto(cont),
                        b.label(start),
                        body,
                        b.label(cont),
                        test,
                        b.label(brk),
                    ],
                    span,
                )
            }
            StmtKind::DoWhile { body, cond } => {
                let (start, cont, brk) = (self.labels.fresh(), self.labels.fresh(), self.labels.fresh());
                let body = self.loop_body(body, brk, cont)?;
                let cond = self.condition(cond)?;
                let test = self.mark(b.cond_goto(cond, true, start), mark);
                self.block(&[b.label(start), body, b.label(cont), test, b.label(brk)], span)
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => self.lower_for(init, cond, step, body, span, mark)?,
            StmtKind::Labeled { label, stmt } => {
                let stmt = self.rewrite_stmt(stmt)?;
                self.block(&[b.label(label), stmt], span)
            }
            StmtKind::Goto(_) | StmtKind::Label(_) => *stmt,
            StmtKind::Break => match self.loops.last() {
                Some(labels) => Stmt::new(StmtKind::Goto(labels.brk), span),
                None => return Err(CompileError::unexpected(Stage::Lowering, "break", span)),
            },
            StmtKind::Continue => match self.loops.last() {
                Some(labels) => Stmt::new(StmtKind::Goto(labels.cont), span),
                None => return Err(CompileError::unexpected(Stage::Lowering, "continue", span)),
            },
            StmtKind::Return(value) => {
                let value = match value {
                    Some(value) => {
                        let value = self.rewrite_expr(value)?;
                        Some(match self.return_ty {
                            Some(ty) => self.coerce(value, ty)?,
                            None => value,
                        })
                    }
                    None => None,
                };
                self.mark(Stmt::new(StmtKind::Return(value), span), mark)
            }
            StmtKind::Throw(value) => {
                let value = match value {
                    Some(value) => Some(self.rewrite_expr(value)?),
                    None => None,
                };
                self.mark(Stmt::new(StmtKind::Throw(value), span), mark)
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                let body = self.rewrite_stmt(body)?;
                let mut lowered = Vec::with_capacity(catches.len());
                for clause in catches {
                    let handler = self.rewrite_stmt(clause.body)?;
                    lowered.push(CatchClause {
                        body: b.alloc(handler),
                        ..*clause
                    });
                }
                let finally = match finally {
                    Some(finally) => Some(self.rewrite_stmt(finally)?),
                    None => None,
                };
                let mut lowered_try = b.try_stmt(body, &lowered, finally);
                lowered_try.span = span;
                lowered_try
            }
            StmtKind::YieldReturn(value) => {
                let value = self.rewrite_expr(value)?;
                self.mark(Stmt::new(StmtKind::YieldReturn(value), span), mark)
            }
            StmtKind::YieldBreak => self.mark(*stmt, mark),
            StmtKind::ConditionalGoto {
                cond,
                jump_if,
                label,
            } => {
                let cond = self.condition(cond)?;
                Stmt::new(StmtKind::ConditionalGoto { cond, jump_if, label }, span)
            }
            StmtKind::Switch { value, targets } => {
                let value = self.rewrite_expr(value)?;
                Stmt::new(StmtKind::Switch { value, targets }, span)
            }
            StmtKind::Marker(inner) => {
                let inner = self.lower_stmt(inner, false)?;
                Stmt::new(StmtKind::Marker(b.alloc(inner)), span)
            }
        })
    }

    fn expression_stmt(&mut self, expr: &'a Expr<'a>, span: Span) -> Result<Stmt<'a>, CompileError> {
        Ok(match expr.kind {
            ExprKind::Throw { exception } => {
                let exception = self.rewrite_expr(exception)?;
                Stmt::new(StmtKind::Throw(Some(exception)), span)
            }
            _ => Stmt::new(StmtKind::Expression(self.rewrite_expr(expr)?), span),
        })
    }

    fn loop_body(&mut self, body: &'a Stmt<'a>, brk: LabelId, cont: LabelId) -> Result<Stmt<'a>, CompileError> {
        self.loops.push(LoopLabels { brk, cont });
        let lowered = self.rewrite_stmt(body);
        self.loops.pop();
        lowered
    }

    fn lower_for(
        &mut self,
        init: &'a [Stmt<'a>],
        cond: Option<&'a Expr<'a>>,
        step: &'a [Expr<'a>],
        body: &'a Stmt<'a>,
        span: Span,
        mark: bool,
    ) -> Result<Stmt<'a>, CompileError> {
        let b = self.b;
        let mut out = Vec::with_capacity(init.len() + step.len() + 6);
        for stmt in init {
            out.push(self.rewrite_stmt(stmt)?);
        }
        let (start, cont, brk) = (self.labels.fresh(), self.labels.fresh(), self.labels.fresh());
        let body = self.loop_body(body, brk, cont)?;
        let mut steps = Vec::with_capacity(step.len());
        for expr in step {
            let lowered = self.expression_stmt(expr, expr.span)?;
            steps.push(self.mark(lowered, true));
        }
        match cond {
            Some(cond) => {
                let test_label = self.labels.fresh();
                let cond = self.condition(cond)?;
                out.push(b.goto(test_label));
                out.push(b.label(start));
                out.push(body);
                out.push(b.label(cont));
                out.extend(steps);
                out.push(b.label(test_label));
                out.push(self.mark(b.cond_goto(cond, true, start), mark));
            }
            None => {
                out.push(b.label(start));
                out.push(body);
                out.push(b.label(cont));
                out.extend(steps);
                out.push(b.goto(start));
            }
        }
        out.push(b.label(brk));
        Ok(self.block(&out, span))
    }

    // === Expressions ===

    pub fn rewrite_expr(&mut self, expr: &'a Expr<'a>) -> Result<&'a Expr<'a>, CompileError> {
        if let Some(folded) = self.fold_constant(expr) {
            return Ok(folded);
        }
        let b = self.b;
        match expr.kind {
            ExprKind::Binary { .. } => self.rewrite_binary_chain(expr),
            ExprKind::Unary { op, operand } => {
                let operand = self.rewrite_expr(operand)?;
                let operand = if op == UnaryOp::LogicalNot {
                    self.coerce(operand, TypeId::BOOL)?
                } else {
                    operand
                };
                Ok(rebuild(b, expr, ExprKind::Unary { op, operand }))
            }
            ExprKind::Conversion { operand, kind } => {
                let operand = self.rewrite_expr(operand)?;
                if operand.ty == expr.ty {
                    return Ok(operand);
                }
                if let Some(folded) = self.fold_conversion(operand, expr.ty, kind, expr.span) {
                    return Ok(folded);
                }
                Ok(rebuild(b, expr, ExprKind::Conversion { operand, kind }))
            }
            ExprKind::Conditional {
                cond,
                when_true,
                when_false,
            } => {
                let cond = self.condition(cond)?;
                let when_true = self.rewrite_expr(when_true)?;
                let when_true = self.coerce(when_true, expr.ty)?;
                let when_false = self.rewrite_expr(when_false)?;
                let when_false = self.coerce(when_false, expr.ty)?;
                Ok(rebuild(
                    b,
                    expr,
                    ExprKind::Conditional {
                        cond,
                        when_true,
                        when_false,
                    },
                ))
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => {
                let receiver = match receiver {
                    Some(receiver) => Some(self.rewrite_expr(receiver)?),
                    None => None,
                };
                let args = self.rewrite_args(method, args)?;
                Ok(rebuild(
                    b,
                    expr,
                    ExprKind::Call {
                        receiver,
                        method,
                        args,
                    },
                ))
            }
            ExprKind::ObjectCreation { ctor, args } => {
                let args = self.rewrite_args(ctor, args)?;
                Ok(rebuild(b, expr, ExprKind::ObjectCreation { ctor, args }))
            }
            ExprKind::AnonymousObject { ctor, members } => self.rewrite_anonymous(expr, ctor, members),
            ExprKind::Assignment { target, value } => {
                let target = self.rewrite_expr(target)?;
                let value = self.rewrite_expr(value)?;
                let value = self.coerce(value, target.ty)?;
                Ok(rebuild(b, expr, ExprKind::Assignment { target, value }))
            }
            ExprKind::CompoundAssignment {
                op,
                operand_ty,
                target,
                value,
            } => self.lower_compound(expr, op, operand_ty, target, value),
            ExprKind::ArrayCreation {
                element,
                sizes,
                initializer,
            } => {
                let mut lowered = Vec::with_capacity(sizes.len());
                for size in sizes {
                    lowered.push(*self.rewrite_expr(size)?);
                }
                let initializer = match initializer {
                    Some(init) => Some(map_initializer(b, &init, &mut |value| {
                        let value = self.rewrite_expr(value)?;
                        self.coerce(value, element)
                    })?),
                    None => None,
                };
                Ok(rebuild(
                    b,
                    expr,
                    ExprKind::ArrayCreation {
                        element,
                        sizes: b.exprs(&lowered),
                        initializer,
                    },
                ))
            }
            _ => map_children(b, expr, |child| self.rewrite_expr(child)),
        }
    }

    /// Left-leaning chains are walked with a loop; only right operands
    /// recurse.
    fn rewrite_binary_chain(&mut self, expr: &'a Expr<'a>) -> Result<&'a Expr<'a>, CompileError> {
        let spine = left_spine(expr);
        let mut acc = self.rewrite_expr(spine.leaf)?;
        for node in spine.nodes {
            if let Some(folded) = self.fold_constant(node) {
                acc = folded;
                continue;
            }
            let ExprKind::Binary {
                op,
                operand_ty,
                right,
                ..
            } = node.kind
            else {
                return Err(CompileError::unexpected(Stage::Lowering, node.node_name(), node.span));
            };
            let right = self.rewrite_expr(right)?;
            acc = self.build_binary(node.ty, node.span, op, operand_ty, acc, right)?;
        }
        Ok(acc)
    }

    fn build_binary(
        &mut self,
        ty: TypeId,
        span: Span,
        op: BinaryOp,
        operand_ty: TypeId,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> Result<&'a Expr<'a>, CompileError> {
        let (left_ty, right_ty) = if op.is_logical() {
            (TypeId::BOOL, TypeId::BOOL)
        } else if op.is_shift() {
            (operand_ty, TypeId::INT32)
        } else {
            (operand_ty, operand_ty)
        };
        let left = self.coerce(left, left_ty)?;
        let right = self.coerce(right, right_ty)?;
        Ok(self.b.expr(
            ty,
            ExprKind::Binary {
                op,
                operand_ty,
                left,
                right,
            },
            span,
        ))
    }

    fn condition(&mut self, cond: &'a Expr<'a>) -> Result<&'a Expr<'a>, CompileError> {
        let cond = self.rewrite_expr(cond)?;
        self.coerce(cond, TypeId::BOOL)
    }

    fn rewrite_args(&mut self, method: MethodId, args: &'a [Expr<'a>]) -> Result<&'a [Expr<'a>], CompileError> {
        let symbols = self.symbols;
        let params = &symbols.method(method).params;
        let mut lowered = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let mut arg = self.rewrite_expr(arg)?;
            if let Some(param) = params.get(i) {
                if !param.by_ref {
                    arg = self.coerce(arg, param.ty)?;
                }
            }
            lowered.push(*arg);
        }
        Ok(self.b.exprs(&lowered))
    }

    /// Named members become positional constructor arguments. Members are
    /// still evaluated in source order: when that differs from parameter
    /// order, non-trivial values go through temps first.
    fn rewrite_anonymous(
        &mut self,
        expr: &'a Expr<'a>,
        ctor: MethodId,
        members: &'a [MemberInit<'a>],
    ) -> Result<&'a Expr<'a>, CompileError> {
        let b = self.b;
        let symbols = self.symbols;
        let params = &symbols.method(ctor).params;
        let missing = |name: &str| CompileError::MissingMember {
            owner: symbols.type_name(expr.ty),
            name: name.to_string(),
        };

        let mut param_of = Vec::with_capacity(members.len());
        for member in members {
            let index = params
                .iter()
                .position(|param| param.name == member.name)
                .ok_or_else(|| missing(member.name))?;
            param_of.push(index);
        }
        if let Some(param) = params
            .iter()
            .find(|param| !members.iter().any(|member| member.name == param.name))
        {
            return Err(missing(&param.name));
        }

        let in_order = param_of.iter().enumerate().all(|(i, index)| i == *index);
        let mut effects = Vec::new();
        let mut args: Vec<Option<Expr<'a>>> = crate::vec![None; params.len()];
        for (member, index) in members.iter().zip(param_of) {
            let value = self.rewrite_expr(&member.value)?;
            let mut value = self.coerce(value, params[index].ty)?;
            if !in_order && !is_stable(value) {
                let temp = self.locals.temp(value.ty);
                let local = b.local(temp, value.ty);
                effects.push(*b.assign(local, value));
                value = local;
            }
            args[index] = Some(*value);
        }
        let args: Vec<Expr<'a>> = args.into_iter().flatten().collect();
        let creation = b.expr(
            expr.ty,
            ExprKind::ObjectCreation {
                ctor,
                args: b.exprs(&args),
            },
            expr.span,
        );
        if effects.is_empty() {
            return Ok(creation);
        }
        Ok(b.expr(
            expr.ty,
            ExprKind::Sequence {
                effects: b.exprs(&effects),
                value: creation,
            },
            expr.span,
        ))
    }

    /// `target op= value` becomes `target = (T)(target op value)` with the
    /// receiver and indices of `target` evaluated once.
    fn lower_compound(
        &mut self,
        expr: &'a Expr<'a>,
        op: BinaryOp,
        operand_ty: TypeId,
        target: &'a Expr<'a>,
        value: &'a Expr<'a>,
    ) -> Result<&'a Expr<'a>, CompileError> {
        let b = self.b;
        let mut effects = Vec::new();
        let lvalue = match target.kind {
            ExprKind::Local(_) | ExprKind::Parameter(_) | ExprKind::FieldAccess { receiver: None, .. } => target,
            ExprKind::FieldAccess {
                receiver: Some(receiver),
                field,
            } => {
                let receiver = self.rewrite_expr(receiver)?;
                let receiver = self.stabilize(receiver, true, &mut effects)?;
                rebuild(
                    b,
                    target,
                    ExprKind::FieldAccess {
                        receiver: Some(receiver),
                        field,
                    },
                )
            }
            ExprKind::ArrayElement { array, indices } => {
                let array = self.rewrite_expr(array)?;
                let array = self.stabilize(array, false, &mut effects)?;
                let mut stable = Vec::with_capacity(indices.len());
                for index in indices {
                    let index = self.rewrite_expr(index)?;
                    stable.push(*self.stabilize(index, false, &mut effects)?);
                }
                rebuild(
                    b,
                    target,
                    ExprKind::ArrayElement {
                        array,
                        indices: b.exprs(&stable),
                    },
                )
            }
            _ => {
                return Err(CompileError::UnsupportedOperand(format!(
                    "compound assignment to {}",
                    target.node_name()
                )));
            }
        };

        let value = self.rewrite_expr(value)?;
        let operation = self.build_binary(operand_ty, expr.span, op, operand_ty, lvalue, value)?;
        let result = self.coerce(operation, target.ty)?;
        let assign = b.expr(
            target.ty,
            ExprKind::Assignment {
                target: lvalue,
                value: result,
            },
            expr.span,
        );
        if effects.is_empty() {
            return Ok(assign);
        }
        Ok(b.expr(
            target.ty,
            ExprKind::Sequence {
                effects: b.exprs(&effects),
                value: assign,
            },
            expr.span,
        ))
    }

    /// Evaluates `expr` into a temp unless reading it twice is harmless.
    fn stabilize(
        &mut self,
        expr: &'a Expr<'a>,
        receiver: bool,
        effects: &mut Vec<Expr<'a>>,
    ) -> Result<&'a Expr<'a>, CompileError> {
        if is_stable(expr) {
            return Ok(expr);
        }
        if receiver && self.symbols.is_value_type(expr.ty) {
            return Err(CompileError::UnsupportedOperand(format!(
                "value-type receiver {} of a compound assignment",
                expr.node_name()
            )));
        }
        let temp = self.locals.temp(expr.ty);
        let local = self.b.local(temp, expr.ty);
        effects.push(*self.b.assign(local, expr));
        Ok(local)
    }

    // === Conversions and constants ===

    fn fold_constant(&self, expr: &'a Expr<'a>) -> Option<&'a Expr<'a>> {
        match (expr.constant, expr.kind) {
            (_, ExprKind::Literal(_)) | (None, _) => None,
            (Some(value), _) => Some(self.literal(expr.ty, value, expr.span)),
        }
    }

    fn literal(&self, ty: TypeId, value: ConstantValue<'a>, span: Span) -> &'a Expr<'a> {
        self.b
            .alloc(Expr::new(ty, ExprKind::Literal(value), span).with_constant(value))
    }

    fn fold_conversion(
        &self,
        operand: &'a Expr<'a>,
        ty: TypeId,
        kind: ConversionKind,
        span: Span,
    ) -> Option<&'a Expr<'a>> {
        if !matches!(kind, ConversionKind::ImplicitNumeric | ConversionKind::ExplicitNumeric) {
            return None;
        }
        let target = self.symbols.primitive_of(ty)?;
        if target.is_nullable() {
            return None;
        }
        let folded = operand.constant?.convert(target.kind())?;
        Some(self.literal(ty, folded, span))
    }

    /// Converts `expr` to `ty`, inserting an explicit conversion node when
    /// the types differ.
    pub fn coerce(&mut self, expr: &'a Expr<'a>, ty: TypeId) -> Result<&'a Expr<'a>, CompileError> {
        if expr.ty == ty {
            return Ok(expr);
        }
        if let ExprKind::Literal(ConstantValue::Null) = expr.kind {
            let nullable = self.symbols.primitive_of(ty).is_some_and(|p| p.is_nullable());
            if nullable {
                return Ok(self.b.expr(ty, ExprKind::Default, expr.span));
            }
            if !self.symbols.is_value_type(ty) {
                return Ok(self.literal(ty, ConstantValue::Null, expr.span));
            }
        }
        let kind = self.symbols.classify_conversion(expr.ty, ty);
        if !kind.exists() {
            return Err(CompileError::MissingConversion {
                from: self.symbols.type_name(expr.ty),
                to: self.symbols.type_name(ty),
            });
        }
        if let Some(folded) = self.fold_conversion(expr, ty, kind, expr.span) {
            return Ok(folded);
        }
        Ok(self.b.convert(expr, ty, kind))
    }
}

/// Reading these twice yields the same value with no side effects.
pub(super) fn is_stable(expr: &Expr<'_>) -> bool {
    matches!(
        expr.kind,
        ExprKind::Literal(_) | ExprKind::Default | ExprKind::Local(_) | ExprKind::Parameter(_) | ExprKind::This
    )
}

/// Same type, constant and span as `expr`, new shape.
pub(super) fn rebuild<'a>(b: BoundBuilder<'a>, expr: &'a Expr<'a>, kind: ExprKind<'a>) -> &'a Expr<'a> {
    b.alloc(Expr {
        ty: expr.ty,
        kind,
        constant: expr.constant,
        span: expr.span,
    })
}

#[cfg(test)]
#[path = "rewriter_test.rs"]
mod rewriter_test;
