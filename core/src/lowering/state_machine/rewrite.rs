//! Rewrites a spilled body into the `MoveNext` method of its state machine.
//!
//! `MoveNext` starts with `switch (state)` over the initial state and every
//! resume state. A resume point inside a `try` cannot be jumped to from
//! outside, so the outer switch targets a label in front of the outermost
//! enclosing `try` and each such `try` begins with its own switch over the
//! states it contains.

use smallvec::SmallVec;

use super::synthesize::MachineLayout;
use super::{FINISHED_STATE, RUNNING_STATE, StateMachineKind};
use crate::bound::walk::{contains_resume_point, left_spine, map_children};
use crate::bound::{
    AwaitInfo, BinaryOp, BoundBuilder, CatchClause, Expr, ExprKind, LabelGen, LabelId, LocalId,
    LocalTable, Stmt, StmtKind,
};
use crate::error::{CompileError, Stage};
use crate::symbols::{SymbolTable, TypeId, WellKnownMember};
use crate::syntax::Span;
use crate::{Vec, vec};

#[derive(Debug)]
pub(super) struct ResumePoint {
    pub state: i32,
    pub label: LabelId,
    /// Enclosing tries, outermost first.
    pub tries: SmallVec<[usize; 4]>,
}

#[derive(Debug)]
pub(super) struct TryInfo<'a> {
    pub parent: Option<usize>,
    /// Placed just before the `try`; outer dispatches jump here.
    pub entry: LabelId,
    /// First and last resume state inside the protected body.
    pub states: Option<(i32, i32)>,
    /// The finally block without its state guard.
    pub finally: Option<&'a Stmt<'a>>,
}

#[derive(Debug)]
pub(super) struct MoveNextBody<'a> {
    pub body: &'a Stmt<'a>,
    pub resumes: Vec<ResumePoint>,
    pub tries: Vec<TryInfo<'a>>,
}

pub(super) fn rewrite_move_next<'a>(
    b: BoundBuilder<'a>,
    symbols: &mut SymbolTable,
    locals: &mut LocalTable,
    labels: &mut LabelGen,
    layout: &mut MachineLayout,
    body: &'a Stmt<'a>,
) -> Result<MoveNextBody<'a>, CompileError> {
    let result = layout.result_ty.map(|ty| locals.temp(ty));
    let exit = labels.fresh();
    let mut rewriter = MachineRewriter {
        b,
        this: b.this(layout.ty),
        symbols,
        locals,
        labels,
        layout,
        resumes: Vec::new(),
        tries: Vec::new(),
        open_tries: SmallVec::new(),
        exit,
        result,
    };
    let body = rewriter.rewrite_stmt(body)?;
    rewriter.finish(body)
}

struct MachineRewriter<'a, 's> {
    b: BoundBuilder<'a>,
    this: &'a Expr<'a>,
    symbols: &'s mut SymbolTable,
    locals: &'s mut LocalTable,
    labels: &'s mut LabelGen,
    layout: &'s mut MachineLayout,
    resumes: Vec<ResumePoint>,
    tries: Vec<TryInfo<'a>>,
    open_tries: SmallVec<[usize; 4]>,
    /// End of the user body; `yield break` and `return` jump here.
    exit: LabelId,
    /// Pending result of an async method returning a value.
    result: Option<LocalId>,
}

impl<'a> MachineRewriter<'a, '_> {
    fn state(&self) -> &'a Expr<'a> {
        self.b.field(Some(self.this), self.layout.state, TypeId::INT32)
    }

    fn set_state(&self, state: i32) -> Stmt<'a> {
        self.b.assign_stmt(self.state(), self.b.int32(state))
    }

    fn builder(&self, span: Span) -> Result<(&'a Expr<'a>, TypeId), CompileError> {
        match self.layout.builder {
            Some((field, ty)) => Ok((self.b.field(Some(self.this), field, ty), ty)),
            None => Err(CompileError::unexpected(Stage::StateMachine, "await", span)),
        }
    }

    fn block(&self, stmts: &[Stmt<'a>], span: Span) -> Stmt<'a> {
        let mut block = self.b.block(stmts);
        block.span = span;
        block
    }

    /// Allocates the next state for a suspension point about to be emitted.
    fn resume_point(&mut self) -> (i32, LabelId) {
        let state = self.resumes.len() as i32 + 1;
        let label = self.labels.fresh();
        self.resumes.push(ResumePoint {
            state,
            label,
            tries: self.open_tries.clone(),
        });
        (state, label)
    }

    /// Where a switch at try depth `depth` sends resume point `index`.
    fn dispatch_target(&self, index: usize, depth: usize) -> LabelId {
        let resume = &self.resumes[index];
        match resume.tries.get(depth) {
            Some(&inner) => self.tries[inner].entry,
            None => resume.label,
        }
    }

    fn rewrite_stmt(&mut self, stmt: &'a Stmt<'a>) -> Result<Stmt<'a>, CompileError> {
        let b = self.b;
        let span = stmt.span;
        match stmt.kind {
            StmtKind::Block { locals, stmts } => {
                let kept: Vec<LocalId> = locals
                    .iter()
                    .copied()
                    .filter(|local| self.layout.hoisted_field(*local).is_none())
                    .collect();
                let mut rewritten = Vec::with_capacity(stmts.len());
                for stmt in stmts {
                    rewritten.push(self.rewrite_stmt(stmt)?);
                }
                let mut block = b.block_with_locals(&kept, &rewritten);
                block.span = span;
                Ok(block)
            }
            StmtKind::Marker(inner) => {
                let inner = self.rewrite_stmt(inner)?;
                Ok(Stmt::new(StmtKind::Marker(b.alloc(inner)), span))
            }
            StmtKind::Expression(Expr {
                kind: ExprKind::Await { operand, info },
                ty,
                ..
            }) => self.rewrite_await(None, *operand, *info, *ty, span),
            StmtKind::Expression(Expr {
                kind:
                    ExprKind::Assignment {
                        target,
                        value:
                            Expr {
                                kind: ExprKind::Await { operand, info },
                                ty,
                                ..
                            },
                    },
                ..
            }) => self.rewrite_await(Some(*target), *operand, *info, *ty, span),
            StmtKind::Expression(expr) => Ok(Stmt::new(StmtKind::Expression(self.substitute(expr)?), span)),
            StmtKind::YieldReturn(value) => self.rewrite_yield(value, span),
            StmtKind::YieldBreak | StmtKind::Return(None) => Ok(Stmt::new(StmtKind::Goto(self.exit), span)),
            StmtKind::Return(Some(value)) => {
                let (Some(result), Some(ty)) = (self.result, self.layout.result_ty) else {
                    return Err(CompileError::unexpected(Stage::StateMachine, stmt.node_name(), span));
                };
                let value = self.substitute(value)?;
                Ok(self.block(&[b.assign_stmt(b.local(result, ty), value), b.goto(self.exit)], span))
            }
            StmtKind::Throw(value) => {
                let value = match value {
                    Some(value) => Some(self.substitute(value)?),
                    None => None,
                };
                Ok(Stmt::new(StmtKind::Throw(value), span))
            }
            StmtKind::ConditionalGoto { cond, jump_if, label } => Ok(Stmt::new(
                StmtKind::ConditionalGoto {
                    cond: self.substitute(cond)?,
                    jump_if,
                    label,
                },
                span,
            )),
            StmtKind::Switch { value, targets } => Ok(Stmt::new(
                StmtKind::Switch {
                    value: self.substitute(value)?,
                    targets,
                },
                span,
            )),
            StmtKind::Label(_) | StmtKind::Goto(_) => Ok(*stmt),
            StmtKind::Try { body, catches, finally } => self.rewrite_try(stmt, body, catches, finally),
            _ => Err(CompileError::unexpected(Stage::StateMachine, stmt.node_name(), span)),
        }
    }

    /// ```text
    ///     aw = operand.GetAwaiter();
    ///     if (aw.IsCompleted) goto ready;
    ///     state = k; <>u = aw;
    ///     builder.AwaitOnCompleted(ref <>u, ref this);
    ///     return;
    /// resume_k:
    ///     aw = <>u; <>u = default; state = -1;
    /// ready:
    ///     [target =] aw.GetResult();
    /// ```
    fn rewrite_await(
        &mut self,
        target: Option<&'a Expr<'a>>,
        operand: &'a Expr<'a>,
        info: AwaitInfo,
        result_ty: TypeId,
        span: Span,
    ) -> Result<Stmt<'a>, CompileError> {
        let b = self.b;
        let (builder, builder_ty) = self.builder(span)?;
        let await_on_completed = self.symbols.require_method(builder_ty, "AwaitOnCompleted")?;

        let operand = self.substitute(operand)?;
        let awaiter_ty = self.symbols.method(info.get_awaiter).ret;
        let awaiter = b.local(self.locals.temp(awaiter_ty), awaiter_ty);
        let awaiter_field = self.layout.awaiter_field(self.symbols, awaiter_ty);
        let pending = b.field(Some(self.this), awaiter_field, awaiter_ty);
        let ready = self.labels.fresh();
        let (state, resume) = self.resume_point();

        let get_result = b.call(Some(awaiter), info.get_result, &[], result_ty);
        let completion = match target {
            Some(target) => b.assign_stmt(self.substitute(target)?, get_result),
            None => b.expr_stmt(get_result),
        };
        let stmts = [
            b.assign_stmt(awaiter, b.call(Some(operand), info.get_awaiter, &[], awaiter_ty)),
            b.cond_goto(b.call(Some(awaiter), info.is_completed, &[], TypeId::BOOL), true, ready),
            self.set_state(state),
            b.assign_stmt(pending, awaiter),
            b.expr_stmt(b.call(Some(builder), await_on_completed, &[*pending, *self.this], TypeId::VOID)),
            b.ret(None),
            b.label(resume),
            b.assign_stmt(awaiter, pending),
            b.assign_stmt(pending, b.default_of(awaiter_ty)),
            self.set_state(RUNNING_STATE),
            b.label(ready),
            Stmt::new(completion.kind, span),
        ];
        Ok(self.block(&stmts, span))
    }

    fn rewrite_yield(&mut self, value: &'a Expr<'a>, span: Span) -> Result<Stmt<'a>, CompileError> {
        let b = self.b;
        let Some((current_field, element)) = self.layout.current else {
            return Err(CompileError::unexpected(Stage::StateMachine, "yield return", span));
        };
        let value = self.substitute(value)?;
        let (state, resume) = self.resume_point();

        let mut stmts = vec![
            b.assign_stmt(b.field(Some(self.this), current_field, element), value),
            self.set_state(state),
        ];
        if self.layout.kind == StateMachineKind::AsyncIterator {
            let (builder, builder_ty) = self.builder(span)?;
            let set_result = self.symbols.require_method(builder_ty, "SetResult")?;
            stmts.push(b.expr_stmt(b.call(Some(builder), set_result, &[*b.bool(true)], TypeId::VOID)));
            stmts.push(b.ret(None));
        } else {
            stmts.push(b.ret(Some(b.bool(true))));
        }
        stmts.push(b.label(resume));
        stmts.push(self.set_state(RUNNING_STATE));
        Ok(self.block(&stmts, span))
    }

    fn rewrite_try(
        &mut self,
        stmt: &'a Stmt<'a>,
        body: &'a Stmt<'a>,
        catches: &'a [CatchClause<'a>],
        finally: Option<&'a Stmt<'a>>,
    ) -> Result<Stmt<'a>, CompileError> {
        let b = self.b;
        let suspends = contains_resume_point(body);
        let index = self.tries.len();
        let depth = self.open_tries.len();
        if suspends {
            self.tries.push(TryInfo {
                parent: self.open_tries.last().copied(),
                entry: self.labels.fresh(),
                states: None,
                finally: None,
            });
            self.open_tries.push(index);
        }
        let first_resume = self.resumes.len();
        let body = self.rewrite_stmt(body)?;
        if suspends {
            self.open_tries.pop();
        }

        let mut rewritten_catches = Vec::with_capacity(catches.len());
        for clause in catches {
            let mut handler = self.rewrite_stmt(clause.body)?;
            let mut local = clause.local;
            if let Some(field) = clause.local.and_then(|local| self.layout.hoisted_field(local)) {
                let ty = clause.exception_type;
                let caught = self.locals.temp(ty);
                local = Some(caught);
                handler = b.block(&[
                    b.assign_stmt(b.field(Some(self.this), field, ty), b.local(caught, ty)),
                    handler,
                ]);
            }
            rewritten_catches.push(CatchClause {
                exception_type: clause.exception_type,
                local,
                body: b.alloc(handler),
            });
        }
        let finally = match finally {
            Some(finally) => Some(self.rewrite_stmt(finally)?),
            None => None,
        };

        let resumes = first_resume..self.resumes.len();
        if !suspends || resumes.is_empty() {
            let mut lowered = b.try_stmt(body, &rewritten_catches, finally);
            lowered.span = stmt.span;
            return Ok(lowered);
        }

        let first = self.resumes[resumes.start].state;
        let last = self.resumes[resumes.end - 1].state;
        let targets: Vec<LabelId> = resumes.map(|resume| self.dispatch_target(resume, depth + 1)).collect();
        let relative = b.binary(BinaryOp::Sub, self.state(), b.int32(first), TypeId::INT32);
        let body = b.block(&[b.switch(relative, &targets), body]);

        // Suspending leaves the try with a non-negative state; the finally
        // only runs when the body completes or throws.
        let guarded = finally.map(|finally| {
            let skip = self.labels.fresh();
            let suspended = b.binary(BinaryOp::Ge, self.state(), b.int32(0), TypeId::BOOL);
            b.block(&[b.cond_goto(suspended, true, skip), finally, b.label(skip)])
        });

        let info = &mut self.tries[index];
        info.states = Some((first, last));
        info.finally = finally.map(|finally| b.alloc(finally));

        let mut lowered = b.try_stmt(body, &rewritten_catches, guarded);
        lowered.span = stmt.span;
        Ok(b.block(&[b.label(info.entry), lowered]))
    }

    /// Replaces hoisted locals, parameters and `this` with fields of the
    /// machine.
    fn substitute(&mut self, expr: &'a Expr<'a>) -> Result<&'a Expr<'a>, CompileError> {
        let b = self.b;
        let field = match expr.kind {
            ExprKind::Local(local) => self.layout.hoisted_field(local),
            ExprKind::Parameter(index) => match self.layout.params.get(index as usize) {
                Some(field) => Some(*field),
                None => return Err(CompileError::unexpected(Stage::StateMachine, expr.node_name(), expr.span)),
            },
            ExprKind::This => match self.layout.this_proxy {
                Some((field, _)) => Some(field),
                None => return Err(CompileError::unexpected(Stage::StateMachine, expr.node_name(), expr.span)),
            },
            ExprKind::Await { .. } => {
                return Err(CompileError::unexpected(Stage::StateMachine, expr.node_name(), expr.span));
            }
            ExprKind::Binary { .. } => return self.substitute_chain(expr),
            _ => return map_children(b, expr, |child| self.substitute(child)),
        };
        Ok(match field {
            Some(field) => b.expr(
                expr.ty,
                ExprKind::FieldAccess {
                    receiver: Some(self.this),
                    field,
                },
                expr.span,
            ),
            None => expr,
        })
    }

    fn substitute_chain(&mut self, expr: &'a Expr<'a>) -> Result<&'a Expr<'a>, CompileError> {
        let spine = left_spine(expr);
        let mut acc = self.substitute(spine.leaf)?;
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
            let right = self.substitute(right)?;
            acc = self.b.alloc(Expr {
                ty: node.ty,
                kind: ExprKind::Binary {
                    op,
                    operand_ty,
                    left: acc,
                    right,
                },
                constant: node.constant,
                span: node.span,
            });
        }
        Ok(acc)
    }

    /// Wraps the rewritten body in the dispatch and completion logic.
    fn finish(self, body: Stmt<'a>) -> Result<MoveNextBody<'a>, CompileError> {
        let b = self.b;
        let start = self.labels.fresh();
        let mut targets = vec![start];
        targets.extend((0..self.resumes.len()).map(|resume| self.dispatch_target(resume, 0)));

        // States the switch does not list (finished, running) skip the body.
        let completed = (self.layout.kind == StateMachineKind::AsyncIterator).then(|| self.labels.fresh());
        let mut stmts = vec![b.switch(self.state(), &targets)];
        stmts.push(match (self.layout.kind, completed) {
            (_, Some(completed)) => b.goto(completed),
            (StateMachineKind::SyncIterator, None) => b.ret(Some(b.bool(false))),
            (_, None) => b.ret(None),
        });
        stmts.push(b.label(start));
        stmts.push(self.set_state(RUNNING_STATE));
        stmts.push(body);
        stmts.push(b.label(self.exit));

        let body = match self.layout.kind {
            StateMachineKind::SyncIterator => {
                stmts.push(self.set_state(FINISHED_STATE));
                stmts.push(b.ret(Some(b.bool(false))));
                b.block(&stmts)
            }
            StateMachineKind::Async | StateMachineKind::AsyncIterator => {
                let (builder, builder_ty) = self.builder(Span::EMPTY)?;
                let exception_ty = self.symbols.well_known_type(WellKnownMember::Exception)?;
                let set_exception = self.symbols.require_method(builder_ty, "SetException")?;
                let set_result = self.symbols.require_method(builder_ty, "SetResult")?;

                let caught = self.locals.temp(exception_ty);
                let handler = b.block(&[
                    self.set_state(FINISHED_STATE),
                    b.expr_stmt(b.call(
                        Some(builder),
                        set_exception,
                        &[*b.local(caught, exception_ty)],
                        TypeId::VOID,
                    )),
                    b.ret(None),
                ]);
                let protected = b.try_stmt(
                    b.block(&stmts),
                    &[CatchClause {
                        exception_type: exception_ty,
                        local: Some(caught),
                        body: b.alloc(handler),
                    }],
                    None,
                );

                let result = match (self.layout.kind, self.result, self.layout.result_ty) {
                    (StateMachineKind::AsyncIterator, _, _) => vec![*b.bool(false)],
                    (_, Some(result), Some(ty)) => vec![*b.local(result, ty)],
                    _ => Vec::new(),
                };
                let mut tail = vec![protected];
                tail.extend(completed.map(|completed| b.label(completed)));
                tail.extend([
                    self.set_state(FINISHED_STATE),
                    b.expr_stmt(b.call(Some(builder), set_result, &result, TypeId::VOID)),
                    b.ret(None),
                ]);
                b.block(&tail)
            }
        };

        Ok(MoveNextBody {
            body: b.alloc(body),
            resumes: self.resumes,
            tries: self.tries,
        })
    }
}
