//! Stack-based traversal of bound trees.
//!
//! Generated code can nest far deeper than the native stack allows (long
//! operator chains in particular), so the walkers here never recurse.

use smallvec::SmallVec;

use super::{
    ArrayInitializer, BoundBuilder, Expr, ExprKind, InitItem, MemberInit, Stmt, StmtKind,
};
use crate::{Vec, vec};

#[derive(Copy, Clone, Debug)]
pub enum Node<'a> {
    Stmt(&'a Stmt<'a>),
    Expr(&'a Expr<'a>),
    Init(&'a ArrayInitializer<'a>),
}

/// Control flow for [`walk`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Walk {
    /// Visit the children of this node.
    Recurse,
    /// Do not visit the children of this node.
    Skip,
    /// End the traversal.
    Stop,
}

/// Visits `root` and its descendants in pre-order, children in evaluation
/// order. Returns `false` if the visitor stopped early.
pub fn walk<'a>(root: Node<'a>, mut visit: impl FnMut(Node<'a>) -> Walk) -> bool {
    let mut stack = vec![root];
    let mut scratch: SmallVec<[Node<'a>; 8]> = SmallVec::new();
    while let Some(node) = stack.pop() {
        match visit(node) {
            Walk::Stop => return false,
            Walk::Skip => {}
            Walk::Recurse => {
                scratch.clear();
                push_children(node, &mut scratch);
                stack.extend(scratch.drain(..).rev());
            }
        }
    }
    true
}

/// Children of `node` in evaluation order.
pub fn push_children<'a>(node: Node<'a>, out: &mut SmallVec<[Node<'a>; 8]>) {
    match node {
        Node::Stmt(stmt) => push_stmt_children(stmt, out),
        Node::Expr(expr) => push_expr_children(expr, out),
        Node::Init(init) => {
            for item in init.items {
                match item {
                    InitItem::Value(expr) => out.push(Node::Expr(expr)),
                    InitItem::Nested(nested) => out.push(Node::Init(nested)),
                }
            }
        }
    }
}

fn push_stmt_children<'a>(stmt: &'a Stmt<'a>, out: &mut SmallVec<[Node<'a>; 8]>) {
    match &stmt.kind {
        StmtKind::Block { stmts, .. } => out.extend(stmts.iter().map(Node::Stmt)),
        StmtKind::Expression(expr)
        | StmtKind::YieldReturn(expr)
        | StmtKind::ConditionalGoto { cond: expr, .. }
        | StmtKind::Switch { value: expr, .. } => out.push(Node::Expr(expr)),
        StmtKind::LocalDeclaration { init, .. } => out.extend(init.map(Node::Expr)),
        StmtKind::Return(value) | StmtKind::Throw(value) => out.extend(value.map(Node::Expr)),
        StmtKind::If { cond, then, otherwise } => {
            out.push(Node::Expr(cond));
            out.push(Node::Stmt(then));
            out.extend(otherwise.map(Node::Stmt));
        }
        StmtKind::While { cond, body } => {
            out.push(Node::Expr(cond));
            out.push(Node::Stmt(body));
        }
        StmtKind::DoWhile { body, cond } => {
            out.push(Node::Stmt(body));
            out.push(Node::Expr(cond));
        }
        StmtKind::For { init, cond, step, body } => {
            out.extend(init.iter().map(Node::Stmt));
            out.extend(cond.map(Node::Expr));
            out.push(Node::Stmt(body));
            out.extend(step.iter().map(Node::Expr));
        }
        StmtKind::Labeled { stmt, .. } | StmtKind::Marker(stmt) => out.push(Node::Stmt(stmt)),
        StmtKind::Try { body, catches, finally } => {
            out.push(Node::Stmt(body));
            out.extend(catches.iter().map(|clause| Node::Stmt(clause.body)));
            out.extend(finally.map(Node::Stmt));
        }
        StmtKind::Goto(_)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::YieldBreak
        | StmtKind::Label(_) => {}
    }
}

fn push_expr_children<'a>(expr: &'a Expr<'a>, out: &mut SmallVec<[Node<'a>; 8]>) {
    match &expr.kind {
        ExprKind::Literal(_)
        | ExprKind::Default
        | ExprKind::Local(_)
        | ExprKind::Parameter(_)
        | ExprKind::This => {}
        ExprKind::Binary { left, right, .. }
        | ExprKind::Assignment { target: left, value: right }
        | ExprKind::CompoundAssignment { target: left, value: right, .. } => {
            out.push(Node::Expr(left));
            out.push(Node::Expr(right));
        }
        ExprKind::Unary { operand, .. }
        | ExprKind::Conversion { operand, .. }
        | ExprKind::Await { operand, .. }
        | ExprKind::Throw { exception: operand }
        | ExprKind::ArrayLength { array: operand }
        | ExprKind::SpanFromArray { array: operand, .. } => out.push(Node::Expr(operand)),
        ExprKind::Conditional { cond, when_true, when_false } => {
            out.push(Node::Expr(cond));
            out.push(Node::Expr(when_true));
            out.push(Node::Expr(when_false));
        }
        ExprKind::Call { receiver, args, .. } => {
            out.extend(receiver.map(Node::Expr));
            out.extend(args.iter().map(Node::Expr));
        }
        ExprKind::ObjectCreation { args, .. } => out.extend(args.iter().map(Node::Expr)),
        ExprKind::AnonymousObject { members, .. } => {
            out.extend(members.iter().map(|member| Node::Expr(&member.value)))
        }
        ExprKind::FieldAccess { receiver, .. } => out.extend(receiver.map(Node::Expr)),
        ExprKind::ArrayElement { array, indices } => {
            out.push(Node::Expr(array));
            out.extend(indices.iter().map(Node::Expr));
        }
        ExprKind::ArrayCreation { sizes, initializer, .. } => {
            out.extend(sizes.iter().map(Node::Expr));
            if let Some(init) = initializer {
                out.push(Node::Init(init));
            }
        }
        ExprKind::Sequence { effects, value } => {
            out.extend(effects.iter().map(Node::Expr));
            out.push(Node::Expr(value));
        }
    }
}

/// Whether `stmt` contains an `await`, `yield return` or `yield break`.
pub fn contains_suspension(stmt: &Stmt<'_>) -> bool {
    !walk(Node::Stmt(stmt), |node| match node {
        Node::Stmt(Stmt {
            kind: StmtKind::YieldReturn(_) | StmtKind::YieldBreak,
            ..
        }) => Walk::Stop,
        Node::Expr(Expr {
            kind: ExprKind::Await { .. },
            ..
        }) => Walk::Stop,
        _ => Walk::Recurse,
    })
}

/// Whether `stmt` suspends: `await` or `yield return`. Unlike
/// [`contains_suspension`], `yield break` does not count.
pub fn contains_resume_point(stmt: &Stmt<'_>) -> bool {
    !walk(Node::Stmt(stmt), |node| match node {
        Node::Stmt(Stmt {
            kind: StmtKind::YieldReturn(_),
            ..
        }) => Walk::Stop,
        Node::Expr(Expr {
            kind: ExprKind::Await { .. },
            ..
        }) => Walk::Stop,
        _ => Walk::Recurse,
    })
}

pub fn contains_await(expr: &Expr<'_>) -> bool {
    !walk(Node::Expr(expr), |node| match node {
        Node::Expr(Expr {
            kind: ExprKind::Await { .. },
            ..
        }) => Walk::Stop,
        _ => Walk::Recurse,
    })
}

/// A left-leaning chain of binary nodes.
pub struct LeftSpine<'a> {
    /// Leftmost operand that is not itself a binary node.
    pub leaf: &'a Expr<'a>,
    /// Binary nodes from the innermost (applied first) to the root.
    pub nodes: SmallVec<[&'a Expr<'a>; 8]>,
}

/// Splits `expr` into its leftmost non-binary operand and the binary nodes
/// above it.
pub fn left_spine<'a>(expr: &'a Expr<'a>) -> LeftSpine<'a> {
    let mut nodes: SmallVec<[&'a Expr<'a>; 8]> = SmallVec::new();
    let mut current = expr;
    while let ExprKind::Binary { left, .. } = &current.kind {
        nodes.push(current);
        current = left;
    }
    nodes.reverse();
    LeftSpine {
        leaf: current,
        nodes,
    }
}

/// Rebuilds `expr` with each direct child replaced by `map(child)`, visiting
/// children in evaluation order. Leaves are returned as they are. Binary nodes are rebuilt from their mapped
/// operands, so callers that must not recurse down a left spine should split
/// it with [`left_spine`] first.
pub fn map_children<'a, E>(
    b: BoundBuilder<'a>,
    expr: &'a Expr<'a>,
    mut map: impl FnMut(&'a Expr<'a>) -> Result<&'a Expr<'a>, E>,
) -> Result<&'a Expr<'a>, E> {
    let kind = match expr.kind {
        ExprKind::Literal(_)
        | ExprKind::Default
        | ExprKind::Local(_)
        | ExprKind::Parameter(_)
        | ExprKind::This => return Ok(expr),
        ExprKind::Binary {
            op,
            operand_ty,
            left,
            right,
        } => ExprKind::Binary {
            op,
            operand_ty,
            left: map(left)?,
            right: map(right)?,
        },
        ExprKind::Unary { op, operand } => ExprKind::Unary {
            op,
            operand: map(operand)?,
        },
        ExprKind::Conversion { operand, kind } => ExprKind::Conversion {
            operand: map(operand)?,
            kind,
        },
        ExprKind::Conditional {
            cond,
            when_true,
            when_false,
        } => ExprKind::Conditional {
            cond: map(cond)?,
            when_true: map(when_true)?,
            when_false: map(when_false)?,
        },
        ExprKind::Call {
            receiver,
            method,
            args,
        } => {
            let receiver = match receiver {
                Some(receiver) => Some(map(receiver)?),
                None => None,
            };
            ExprKind::Call {
                receiver,
                method,
                args: map_slice(b, args, &mut map)?,
            }
        }
        ExprKind::ObjectCreation { ctor, args } => ExprKind::ObjectCreation {
            ctor,
            args: map_slice(b, args, &mut map)?,
        },
        ExprKind::AnonymousObject { ctor, members } => {
            let mut mapped = Vec::with_capacity(members.len());
            for member in members {
                mapped.push(MemberInit {
                    name: member.name,
                    value: *map(&member.value)?,
                });
            }
            ExprKind::AnonymousObject {
                ctor,
                members: b.arena().alloc_slice_copy(&mapped),
            }
        }
        ExprKind::FieldAccess { receiver, field } => ExprKind::FieldAccess {
            receiver: match receiver {
                Some(receiver) => Some(map(receiver)?),
                None => None,
            },
            field,
        },
        ExprKind::ArrayElement { array, indices } => ExprKind::ArrayElement {
            array: map(array)?,
            indices: map_slice(b, indices, &mut map)?,
        },
        ExprKind::ArrayLength { array } => ExprKind::ArrayLength { array: map(array)? },
        ExprKind::ArrayCreation {
            element,
            sizes,
            initializer,
        } => {
            let sizes = map_slice(b, sizes, &mut map)?;
            let initializer = match initializer {
                Some(init) => Some(map_initializer(b, &init, &mut map)?),
                None => None,
            };
            ExprKind::ArrayCreation {
                element,
                sizes,
                initializer,
            }
        }
        ExprKind::SpanFromArray { array, ctor } => ExprKind::SpanFromArray {
            array: map(array)?,
            ctor,
        },
        ExprKind::Assignment { target, value } => ExprKind::Assignment {
            target: map(target)?,
            value: map(value)?,
        },
        ExprKind::CompoundAssignment {
            op,
            operand_ty,
            target,
            value,
        } => ExprKind::CompoundAssignment {
            op,
            operand_ty,
            target: map(target)?,
            value: map(value)?,
        },
        ExprKind::Await { operand, info } => ExprKind::Await {
            operand: map(operand)?,
            info,
        },
        ExprKind::Throw { exception } => ExprKind::Throw {
            exception: map(exception)?,
        },
        ExprKind::Sequence { effects, value } => ExprKind::Sequence {
            effects: map_slice(b, effects, &mut map)?,
            value: map(value)?,
        },
    };
    Ok(b.alloc(Expr {
        ty: expr.ty,
        kind,
        constant: expr.constant,
        span: expr.span,
    }))
}

fn map_slice<'a, E>(
    b: BoundBuilder<'a>,
    items: &'a [Expr<'a>],
    map: &mut impl FnMut(&'a Expr<'a>) -> Result<&'a Expr<'a>, E>,
) -> Result<&'a [Expr<'a>], E> {
    let mut mapped = Vec::with_capacity(items.len());
    for item in items {
        mapped.push(*map(item)?);
    }
    Ok(b.exprs(&mapped))
}

/// Maps every value of a nested initializer. Nesting depth equals the array
/// rank, so recursion here is bounded.
pub fn map_initializer<'a, E>(
    b: BoundBuilder<'a>,
    init: &ArrayInitializer<'a>,
    map: &mut impl FnMut(&'a Expr<'a>) -> Result<&'a Expr<'a>, E>,
) -> Result<ArrayInitializer<'a>, E> {
    let mut items = Vec::with_capacity(init.items.len());
    for item in init.items {
        items.push(match item {
            InitItem::Value(value) => InitItem::Value(*map(value)?),
            InitItem::Nested(nested) => InitItem::Nested(map_initializer(b, nested, map)?),
        });
    }
    Ok(ArrayInitializer {
        items: b.arena().alloc_slice_copy(&items),
    })
}
