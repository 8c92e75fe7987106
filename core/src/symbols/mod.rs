//! Module-wide symbol model: types, fields and methods.
//!
//! Ids are dense indices into the [`SymbolTable`]. Void and the 32 primitive
//! categories are interned at construction so their ids are fixed and can be
//! used as constants.

mod core_library;
mod table;
mod well_known;

pub use core_library::{CoreLibrary, declare_core_library};
pub use table::{Checkpoint, SymbolTable};
pub use well_known::{WellKnownMember, WellKnownSymbol};

use bitflags::bitflags;
use cinder_types::{PrimitiveKind, PrimitiveType};
use serde::{Deserialize, Serialize};

use crate::{String, Vec};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub u32);

impl TypeId {
    pub const VOID: TypeId = TypeId(0);
    pub const OBJECT: TypeId = TypeId::primitive(PrimitiveType::new(PrimitiveKind::Object));
    pub const STRING: TypeId = TypeId::primitive(PrimitiveType::new(PrimitiveKind::String));
    pub const BOOL: TypeId = TypeId::primitive(PrimitiveType::new(PrimitiveKind::Bool));
    pub const CHAR: TypeId = TypeId::primitive(PrimitiveType::new(PrimitiveKind::Char));
    pub const BYTE: TypeId = TypeId::primitive(PrimitiveType::new(PrimitiveKind::Byte));
    pub const INT32: TypeId = TypeId::primitive(PrimitiveType::new(PrimitiveKind::Int32));
    pub const INT64: TypeId = TypeId::primitive(PrimitiveType::new(PrimitiveKind::Int64));
    pub const DOUBLE: TypeId = TypeId::primitive(PrimitiveType::new(PrimitiveKind::Double));
    pub const DECIMAL: TypeId = TypeId::primitive(PrimitiveType::new(PrimitiveKind::Decimal));

    /// Fixed id of an interned primitive category.
    pub const fn primitive(ty: PrimitiveType) -> TypeId {
        TypeId(1 + ty.index() as u32)
    }

    pub const fn of_kind(kind: PrimitiveKind) -> TypeId {
        TypeId::primitive(PrimitiveType::new(kind))
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Number of ids reserved for void plus the primitive categories.
pub(crate) const FIXED_TYPE_COUNT: usize = 1 + PrimitiveType::COUNT;

static_assertions::const_assert_eq!(FIXED_TYPE_COUNT, 33);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Void,
    Primitive(PrimitiveType),
    Class,
    Struct,
    Interface,
    Array { element: TypeId, rank: u8 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    pub base: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    /// Type this one is nested in, if any.
    pub enclosing: Option<TypeId>,
    pub fields: Vec<FieldId>,
    pub methods: Vec<MethodId>,
    pub synthesized: bool,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            base: None,
            interfaces: Vec::new(),
            enclosing: None,
            fields: Vec::new(),
            methods: Vec::new(),
            synthesized: false,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    pub fn value_struct(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Struct)
    }

    pub fn with_base(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub owner: TypeId,
    pub name: String,
    pub ty: TypeId,
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeId,
    /// Passed by reference: the caller supplies an address.
    pub by_ref: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            by_ref: false,
        }
    }

    pub fn by_ref(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            by_ref: true,
        }
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MethodFlags: u8 {
        const STATIC = 1;
        const CONSTRUCTOR = 1 << 1;
        const VIRTUAL = 1 << 2;
        /// Produced by the back end rather than declared in source.
        const SYNTHESIZED = 1 << 3;
    }
}

/// What a method body does when it runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    Ordinary,
    /// Completes through `builder`, a struct with `Create`, `Start`,
    /// `AwaitOnCompleted`, `SetResult` and `SetException`.
    Async { builder: TypeId },
    Iterator { element: TypeId },
    AsyncIterator { builder: TypeId, element: TypeId },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
    pub owner: TypeId,
    pub name: String,
    pub params: Vec<Param>,
    pub ret: TypeId,
    pub flags: MethodFlags,
    pub kind: MethodKind,
}

impl MethodDef {
    pub fn new(owner: TypeId, name: impl Into<String>, params: Vec<Param>, ret: TypeId) -> Self {
        Self {
            owner,
            name: name.into(),
            params,
            ret,
            flags: MethodFlags::empty(),
            kind: MethodKind::Ordinary,
        }
    }

    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_kind(mut self, kind: MethodKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodFlags::CONSTRUCTOR)
    }

    /// Whether calls push a receiver before the arguments.
    pub fn has_this(&self) -> bool {
        !self.is_static()
    }

    pub fn returns_value(&self) -> bool {
        self.ret != TypeId::VOID
    }
}

#[cfg(test)]
#[path = "symbols_test.rs"]
mod symbols_test;
