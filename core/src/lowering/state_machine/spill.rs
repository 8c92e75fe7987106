//! Moves every `await` to statement position.
//!
//! After this pass an await only appears as `await e;` or `local = await e;`
//! with an await-free `e`. Operands evaluated before an await are stored in
//! temps first unless re-reading them is harmless, so evaluation order is
//! preserved across the suspension.

use core::convert::Infallible;

use crate::bound::walk::{Node, Walk, contains_await, left_spine, map_children, walk};
use crate::bound::{
    BinaryOp, BoundBuilder, Expr, ExprKind, LabelGen, LocalTable, Stmt, StmtKind,
};
use crate::error::{CompileError, Stage};
use crate::lowering::rewriter::{is_stable, rebuild};
use crate::symbols::{SymbolTable, TypeId};
use crate::syntax::Span;
use crate::{Vec, format};

pub(super) fn spill_awaits<'a>(
    b: BoundBuilder<'a>,
    symbols: &SymbolTable,
    locals: &mut LocalTable,
    labels: &mut LabelGen,
    body: &'a Stmt<'a>,
) -> Result<&'a Stmt<'a>, CompileError> {
    let mut spiller = Spiller {
        b,
        symbols,
        locals,
        labels,
        prefix: Vec::new(),
    };
    let spilled = spiller.spill_stmt(body)?;
    Ok(b.alloc(spilled))
}

struct Spiller<'a, 's> {
    b: BoundBuilder<'a>,
    symbols: &'s SymbolTable,
    locals: &'s mut LocalTable,
    labels: &'s mut LabelGen,
    /// Statements that must run before the expression being spilled.
    prefix: Vec<Stmt<'a>>,
}

impl<'a> Spiller<'a, '_> {
    fn spill_stmt(&mut self, stmt: &'a Stmt<'a>) -> Result<Stmt<'a>, CompileError> {
        let b = self.b;
        let span = stmt.span;
        match stmt.kind {
            StmtKind::Block { locals, stmts } => {
                let mut spilled = Vec::with_capacity(stmts.len());
                for stmt in stmts {
                    spilled.push(self.spill_stmt(stmt)?);
                }
                Ok(Stmt::new(
                    StmtKind::Block {
                        locals,
                        stmts: b.stmts(&spilled),
                    },
                    span,
                ))
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                let body = self.spill_stmt(body)?;
                let mut lowered = b.try_stmt(body, catches, finally.copied());
                lowered.span = span;
                Ok(lowered)
            }
            StmtKind::Marker(inner) => {
                let inner = self.spill_stmt(inner)?;
                Ok(Stmt::new(StmtKind::Marker(b.alloc(inner)), span))
            }
            StmtKind::Label(_)
            | StmtKind::Goto(_)
            | StmtKind::YieldBreak
            | StmtKind::Return(None)
            | StmtKind::Throw(None) => Ok(*stmt),
            StmtKind::Expression(expr) => {
                if !contains_await(expr) {
                    return Ok(*stmt);
                }
                self.spill_effect(expr)?;
                Ok(self.flush(span))
            }
            StmtKind::Return(Some(value)) => self.spill_operand(stmt, value, |value| StmtKind::Return(Some(value))),
            StmtKind::Throw(Some(value)) => self.spill_operand(stmt, value, |value| StmtKind::Throw(Some(value))),
            StmtKind::YieldReturn(value) => self.spill_operand(stmt, value, StmtKind::YieldReturn),
            StmtKind::ConditionalGoto {
                cond,
                jump_if,
                label,
            } => self.spill_operand(stmt, cond, |cond| StmtKind::ConditionalGoto { cond, jump_if, label }),
            StmtKind::Switch { value, targets } => {
                self.spill_operand(stmt, value, |value| StmtKind::Switch { value, targets })
            }
            _ => Err(CompileError::unexpected(Stage::StateMachine, stmt.node_name(), span)),
        }
    }

    fn spill_operand(
        &mut self,
        stmt: &'a Stmt<'a>,
        operand: &'a Expr<'a>,
        rebuild: impl FnOnce(&'a Expr<'a>) -> StmtKind<'a>,
    ) -> Result<Stmt<'a>, CompileError> {
        if !contains_await(operand) {
            return Ok(*stmt);
        }
        let operand = self.spill(operand)?;
        self.prefix.push(Stmt::new(rebuild(operand), stmt.span));
        Ok(self.flush(stmt.span))
    }

    fn flush(&mut self, span: Span) -> Stmt<'a> {
        let stmts = core::mem::take(&mut self.prefix);
        Stmt::new(
            StmtKind::Block {
                locals: &[],
                stmts: self.b.stmts(&stmts),
            },
            span,
        )
    }

    /// Spills an expression evaluated only for its effects.
    fn spill_effect(&mut self, expr: &'a Expr<'a>) -> Result<(), CompileError> {
        let b = self.b;
        match expr.kind {
            ExprKind::Await { operand, info } => {
                let operand = self.spill(operand)?;
                let awaited = rebuild(b, expr, ExprKind::Await { operand, info });
                self.prefix.push(b.expr_stmt(awaited));
            }
            ExprKind::Assignment {
                target,
                value: value @ &Expr {
                    kind: ExprKind::Await { operand, info },
                    ..
                },
            } if matches!(target.kind, ExprKind::Local(_) | ExprKind::Parameter(_)) => {
                let operand = self.spill(operand)?;
                let awaited = rebuild(b, value, ExprKind::Await { operand, info });
                self.prefix.push(b.expr_stmt(rebuild(
                    b,
                    expr,
                    ExprKind::Assignment {
                        target,
                        value: awaited,
                    },
                )));
            }
            ExprKind::Sequence { effects, value } => {
                for effect in effects {
                    self.spill_effect(effect)?;
                }
                self.spill_effect(value)?;
            }
            _ => {
                let spilled = self.spill(expr)?;
                self.prefix.push(b.expr_stmt(spilled));
            }
        }
        Ok(())
    }

    /// Returns an await-free expression with the same value, pushing whatever
    /// has to run first onto the prefix.
    fn spill(&mut self, expr: &'a Expr<'a>) -> Result<&'a Expr<'a>, CompileError> {
        if !contains_await(expr) {
            return Ok(expr);
        }
        let b = self.b;
        match expr.kind {
            ExprKind::Await { operand, info } => {
                if expr.ty == TypeId::VOID {
                    return Err(CompileError::UnsupportedOperand(
                        "void await used as a value".into(),
                    ));
                }
                let operand = self.spill(operand)?;
                let awaited = rebuild(b, expr, ExprKind::Await { operand, info });
                Ok(self.store_in_temp(awaited))
            }
            ExprKind::Binary { .. } => self.spill_binary_chain(expr),
            ExprKind::Conditional {
                cond,
                when_true,
                when_false,
            } if contains_await(when_true) || contains_await(when_false) => {
                let cond = self.spill(cond)?;
                let temp = self.locals.temp(expr.ty);
                let result = b.local(temp, expr.ty);
                let (otherwise, end) = (self.labels.fresh(), self.labels.fresh());
                self.prefix.push(b.cond_goto(cond, false, otherwise));
                let value = self.spill(when_true)?;
                self.prefix.push(b.assign_stmt(result, value));
                self.prefix.push(b.goto(end));
                self.prefix.push(b.label(otherwise));
                let value = self.spill(when_false)?;
                self.prefix.push(b.assign_stmt(result, value));
                self.prefix.push(b.label(end));
                Ok(result)
            }
            ExprKind::Assignment { target, value } => {
                let later = [value];
                let target = match target.kind {
                    ExprKind::Local(_) | ExprKind::Parameter(_) | ExprKind::FieldAccess { receiver: None, .. } => target,
                    ExprKind::FieldAccess {
                        receiver: Some(receiver),
                        field,
                    } => {
                        if self.symbols.is_value_type(receiver.ty) && !is_stable(receiver) {
                            return Err(CompileError::UnsupportedOperand(format!(
                                "value-type {} assigned through across an await",
                                receiver.node_name()
                            )));
                        }
                        let receiver = self.spill(receiver)?;
                        let receiver = self.stabilize(receiver, &later)?;
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
                        let array = self.spill(array)?;
                        let array = self.stabilize(array, &later)?;
                        let mut stable = Vec::with_capacity(indices.len());
                        for index in indices {
                            let index = self.spill(index)?;
                            stable.push(*self.stabilize(index, &later)?);
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
                            "assignment to {} across an await",
                            target.node_name()
                        )));
                    }
                };
                let value = self.spill(value)?;
                Ok(rebuild(b, expr, ExprKind::Assignment { target, value }))
            }
            ExprKind::Sequence { effects, value } => {
                for effect in effects {
                    self.spill_effect(effect)?;
                }
                self.spill(value)
            }
            _ => self.spill_children(expr),
        }
    }

    /// Operands before the last one containing an await are stabilized so
    /// they are evaluated before it.
    fn spill_children(&mut self, expr: &'a Expr<'a>) -> Result<&'a Expr<'a>, CompileError> {
        let mut children = Vec::new();
        let _ = map_children(self.b, expr, |child| {
            children.push(child);
            Ok::<_, Infallible>(child)
        });
        let last_await = children.iter().rposition(|child| contains_await(child));

        let mut index = 0;
        map_children(self.b, expr, |child| {
            let position = index;
            index += 1;
            let spilled = self.spill(child)?;
            match last_await {
                Some(last) if position < last => self.stabilize(spilled, &children[position + 1..]),
                _ => Ok(spilled),
            }
        })
    }

    fn spill_binary_chain(&mut self, expr: &'a Expr<'a>) -> Result<&'a Expr<'a>, CompileError> {
        let b = self.b;
        let spine = left_spine(expr);
        let mut acc = self.spill(spine.leaf)?;
        for node in spine.nodes {
            let ExprKind::Binary {
                op,
                operand_ty,
                right,
                ..
            } = node.kind
            else {
                return Err(CompileError::unexpected(Stage::StateMachine, node.node_name(), node.span));
            };
            if !contains_await(right) {
                acc = rebuild(
                    b,
                    node,
                    ExprKind::Binary {
                        op,
                        operand_ty,
                        left: acc,
                        right,
                    },
                );
                continue;
            }
            if op.is_logical() {
                // t = left; if (t != short-circuit value) t = right;
                let temp = self.locals.temp(node.ty);
                let result = b.local(temp, node.ty);
                let skip = self.labels.fresh();
                self.prefix.push(b.assign_stmt(result, acc));
                self.prefix.push(b.cond_goto(result, op == BinaryOp::LogicalOr, skip));
                let value = self.spill(right)?;
                self.prefix.push(b.assign_stmt(result, value));
                self.prefix.push(b.label(skip));
                acc = result;
                continue;
            }
            let left = self.stabilize(acc, &[right])?;
            let right = self.spill(right)?;
            acc = rebuild(
                b,
                node,
                ExprKind::Binary {
                    op,
                    operand_ty,
                    left,
                    right,
                },
            );
        }
        Ok(acc)
    }

    /// Keeps `expr` if re-reading it after `later` runs yields the same value,
    /// otherwise evaluates it into a temp now.
    fn stabilize(&mut self, expr: &'a Expr<'a>, later: &[&'a Expr<'a>]) -> Result<&'a Expr<'a>, CompileError> {
        let stable = match expr.kind {
            ExprKind::Literal(_) | ExprKind::Default | ExprKind::This => true,
            ExprKind::Local(_) | ExprKind::Parameter(_) => !later.iter().any(|later| assigns(later, expr)),
            _ => false,
        };
        if stable {
            return Ok(expr);
        }
        if expr.ty == TypeId::VOID {
            return Err(CompileError::UnsupportedOperand(format!(
                "void {} before an await",
                expr.node_name()
            )));
        }
        Ok(self.store_in_temp(expr))
    }

    fn store_in_temp(&mut self, value: &'a Expr<'a>) -> &'a Expr<'a> {
        let temp = self.locals.temp(value.ty);
        let local = self.b.local(temp, value.ty);
        self.prefix.push(self.b.assign_stmt(local, value));
        local
    }
}

/// Whether `expr` assigns the local or parameter `target`.
fn assigns(expr: &Expr<'_>, target: &Expr<'_>) -> bool {
    !walk(Node::Expr(expr), |node| match node {
        Node::Expr(Expr {
            kind:
                ExprKind::Assignment { target: assigned, .. }
                | ExprKind::CompoundAssignment { target: assigned, .. },
            ..
        }) if assigned.kind == target.kind => Walk::Stop,
        _ => Walk::Recurse,
    })
}
