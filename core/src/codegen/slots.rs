//! Local slot allocation.

use hashbrown::HashMap;

use crate::Vec;
use crate::bound::walk::{Node, Walk, walk};
use crate::bound::{ExprKind, LocalId, LocalTable, Stmt, StmtKind};
use crate::error::CompileError;
use crate::symbols::TypeId;

/// Slot index and type of every local the emitted body uses.
///
/// Bound locals get slots in the order the body first mentions them, so the
/// layout depends only on the tree. Emitter temps are appended after them.
#[derive(Debug, Clone, Default)]
pub struct SlotMap {
    slots: HashMap<LocalId, u16>,
    types: Vec<TypeId>,
}

impl SlotMap {
    pub fn allocate(body: &Stmt<'_>, locals: &LocalTable) -> Result<Self, CompileError> {
        let mut map = SlotMap::default();
        let mut result = Ok(());
        let mut declare = |map: &mut SlotMap, id: LocalId| {
            if result.is_ok() && !map.slots.contains_key(&id) {
                result = map.push(locals.get(id).ty).map(|slot| {
                    map.slots.insert(id, slot);
                });
            }
        };
        walk(Node::Stmt(body), |node| {
            match node {
                Node::Stmt(stmt) => match stmt.kind {
                    StmtKind::Block { locals: declared, .. } => {
                        declared.iter().for_each(|id| declare(&mut map, *id))
                    }
                    StmtKind::LocalDeclaration { local, .. } => declare(&mut map, local),
                    StmtKind::Try { catches, .. } => catches
                        .iter()
                        .filter_map(|clause| clause.local)
                        .for_each(|id| declare(&mut map, id)),
                    _ => {}
                },
                Node::Expr(expr) => {
                    if let ExprKind::Local(id) = expr.kind {
                        declare(&mut map, id);
                    }
                }
                Node::Init(_) => {}
            }
            Walk::Recurse
        });
        result.map(|()| map)
    }

    fn push(&mut self, ty: TypeId) -> Result<u16, CompileError> {
        let slot: u16 = self
            .types
            .len()
            .try_into()
            .map_err(|_| CompileError::TooManyLocals)?;
        self.types.push(ty);
        Ok(slot)
    }

    /// Slot of a bound local. Locals the body never mentioned get one on
    /// demand.
    pub fn slot(&mut self, id: LocalId, locals: &LocalTable) -> Result<u16, CompileError> {
        if let Some(slot) = self.slots.get(&id) {
            return Ok(*slot);
        }
        let slot = self.push(locals.get(id).ty)?;
        self.slots.insert(id, slot);
        Ok(slot)
    }

    /// A fresh slot for an emitter temp.
    pub fn temp(&mut self, ty: TypeId) -> Result<u16, CompileError> {
        self.push(ty)
    }

    pub fn into_types(self) -> Vec<TypeId> {
        self.types
    }
}
