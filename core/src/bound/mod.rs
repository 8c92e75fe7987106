//! The bound tree: the type-checked, symbol-resolved input of the back end.
//!
//! Nodes live in a `bumpalo` arena and are never mutated. Every rewriting pass
//! builds new nodes and shares untouched subtrees.

mod builder;
mod constant;
mod expr;
mod stmt;
pub mod walk;

pub use builder::BoundBuilder;
pub use constant::{ConstantValue, DecimalValue};
pub use expr::{
    ArrayInitializer, AwaitInfo, BinaryOp, Expr, ExprKind, InitItem, MemberInit, UnaryOp,
};
pub use stmt::{CatchClause, Stmt, StmtKind};

use crate::symbols::{MethodId, TypeId};
use crate::{String, Vec};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LocalKind {
    /// Declared in source.
    User,
    /// Introduced by lowering.
    Temp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalDecl {
    pub name: String,
    pub ty: TypeId,
    pub kind: LocalKind,
}

/// Locals of one method body, indexed by [`LocalId`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalTable {
    locals: Vec<LocalDecl>,
}

impl LocalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, ty: TypeId) -> LocalId {
        self.push(name.into(), ty, LocalKind::User)
    }

    pub fn temp(&mut self, ty: TypeId) -> LocalId {
        let name = crate::format!("<>t{}", self.locals.len());
        self.push(name, ty, LocalKind::Temp)
    }

    fn push(&mut self, name: String, ty: TypeId, kind: LocalKind) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalDecl { name, ty, kind });
        id
    }

    pub fn get(&self, id: LocalId) -> &LocalDecl {
        &self.locals[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocalId, &LocalDecl)> {
        self.locals
            .iter()
            .enumerate()
            .map(|(i, decl)| (LocalId(i as u32), decl))
    }
}

/// Source of fresh labels for one method body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelGen {
    next: u32,
}

impl LabelGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues numbering after `first`, for bodies that already use labels.
    pub fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    pub fn fresh(&mut self) -> LabelId {
        let id = LabelId(self.next);
        self.next += 1;
        id
    }

    pub fn count(&self) -> u32 {
        self.next
    }
}

/// One method body ready for lowering or emission.
#[derive(Clone, Debug)]
pub struct BoundMethod<'a> {
    pub method: MethodId,
    pub body: &'a Stmt<'a>,
    pub locals: LocalTable,
    pub labels: LabelGen,
}

impl<'a> BoundMethod<'a> {
    pub fn new(method: MethodId, body: &'a Stmt<'a>, locals: LocalTable, labels: LabelGen) -> Self {
        Self {
            method,
            body,
            locals,
            labels,
        }
    }
}

#[cfg(test)]
mod constant_test;
#[cfg(test)]
mod walk_test;
