//! Chooses the locals that must live in fields of the state machine.
//!
//! The body is linearized in evaluation order. A local is hoisted when its
//! value can be observed on both sides of a suspension: some suspension lies
//! between two of its references, or it is referenced inside a loop whose
//! body suspends. Debug builds hoist every user local so debuggers can show
//! them at any point.

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::api::OptimizationLevel;
use crate::bound::walk::{Node, push_children};
use crate::bound::{Expr, ExprKind, LabelId, LocalId, LocalKind, LocalTable, Stmt, StmtKind};
use crate::{Vec, vec};

enum Task<'a> {
    Visit(Node<'a>),
    /// A read or write of a local, recorded after anything pushed before it.
    Reference(LocalId),
    Suspend,
    /// Recorded after the jump's operand is evaluated.
    Jump(LabelId),
}

#[derive(Default)]
struct Timeline {
    references: HashMap<LocalId, Vec<usize>>,
    suspensions: Vec<usize>,
    labels: HashMap<LabelId, usize>,
    jumps: Vec<(usize, LabelId)>,
}

impl Timeline {
    fn reference(&mut self, local: LocalId, position: usize) {
        self.references.entry(local).or_default().push(position);
    }

    /// Whether a suspension lies strictly between `from` and `to`.
    fn suspends_between(&self, from: usize, to: usize) -> bool {
        let next = self.suspensions.partition_point(|&s| s <= from);
        self.suspensions.get(next).is_some_and(|&s| s < to)
    }

    /// `[label, jump]` ranges of backward jumps whose range suspends.
    fn suspending_loops(&self) -> Vec<(usize, usize)> {
        self.jumps
            .iter()
            .filter_map(|&(jump, label)| {
                let start = *self.labels.get(&label)?;
                (start < jump && self.suspends_between(start, jump)).then_some((start, jump))
            })
            .collect()
    }
}

pub(super) fn hoisted_locals(body: &Stmt<'_>, locals: &LocalTable, level: OptimizationLevel) -> Vec<LocalId> {
    let timeline = linearize(body);
    let loops = timeline.suspending_loops();

    let mut hoisted: Vec<LocalId> = timeline
        .references
        .iter()
        .filter(|(_, positions)| {
            let (first, last) = (positions[0], positions[positions.len() - 1]);
            timeline.suspends_between(first, last)
                || loops
                    .iter()
                    .any(|&(start, end)| positions.iter().any(|&p| start <= p && p <= end))
        })
        .map(|(&local, _)| local)
        .collect();

    if level == OptimizationLevel::Debug {
        hoisted.extend(
            locals
                .iter()
                .filter(|(_, decl)| decl.kind == LocalKind::User)
                .map(|(id, _)| id),
        );
    }
    hoisted.sort_unstable();
    hoisted.dedup();

    trace!(
        hoisted = hoisted.len(),
        locals = locals.len(),
        suspensions = timeline.suspensions.len(),
        "chose hoisted locals"
    );
    hoisted
}

fn linearize<'a>(body: &'a Stmt<'a>) -> Timeline {
    let mut timeline = Timeline::default();
    let mut stack = vec![Task::Visit(Node::Stmt(body))];
    let mut children: SmallVec<[Node<'a>; 8]> = SmallVec::new();
    let mut position = 0;

    while let Some(task) = stack.pop() {
        position += 1;
        let node = match task {
            Task::Reference(local) => {
                timeline.reference(local, position);
                continue;
            }
            Task::Suspend => {
                timeline.suspensions.push(position);
                continue;
            }
            Task::Jump(label) => {
                timeline.jumps.push((position, label));
                continue;
            }
            Task::Visit(node) => node,
        };

        match node {
            Node::Expr(Expr {
                kind: ExprKind::Local(local),
                ..
            }) => timeline.reference(*local, position),
            Node::Expr(Expr {
                kind:
                    ExprKind::Assignment {
                        target:
                            Expr {
                                kind: ExprKind::Local(local),
                                ..
                            },
                        value,
                    },
                ..
            }) => {
                stack.push(Task::Reference(*local));
                stack.push(Task::Visit(Node::Expr(value)));
            }
            Node::Expr(Expr {
                kind: ExprKind::Await { operand, .. },
                ..
            }) => {
                stack.push(Task::Suspend);
                stack.push(Task::Visit(Node::Expr(operand)));
            }
            Node::Stmt(Stmt {
                kind: StmtKind::YieldReturn(value),
                ..
            }) => {
                stack.push(Task::Suspend);
                stack.push(Task::Visit(Node::Expr(value)));
            }
            Node::Stmt(Stmt {
                kind: StmtKind::Label(label),
                ..
            }) => {
                timeline.labels.insert(*label, position);
            }
            Node::Stmt(Stmt {
                kind: StmtKind::Try { body, catches, finally },
                ..
            }) => {
                if let Some(finally) = finally {
                    stack.push(Task::Visit(Node::Stmt(finally)));
                }
                for clause in catches.iter().rev() {
                    stack.push(Task::Visit(Node::Stmt(clause.body)));
                    if let Some(local) = clause.local {
                        stack.push(Task::Reference(local));
                    }
                }
                stack.push(Task::Visit(Node::Stmt(body)));
            }
            _ => {
                if let Node::Stmt(stmt) = node {
                    match stmt.kind {
                        StmtKind::Goto(label) | StmtKind::ConditionalGoto { label, .. } => {
                            stack.push(Task::Jump(label));
                        }
                        StmtKind::Switch { targets, .. } => {
                            stack.extend(targets.iter().map(|&label| Task::Jump(label)));
                        }
                        _ => {}
                    }
                }
                children.clear();
                push_children(node, &mut children);
                stack.extend(children.drain(..).rev().map(Task::Visit));
            }
        }
    }
    timeline
}
