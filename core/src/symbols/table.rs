use cinder_types::{ConversionKind, PrimitiveKind, PrimitiveType};
use hashbrown::HashMap;

use super::{
    FIXED_TYPE_COUNT, FieldDef, FieldId, MethodDef, MethodFlags, MethodId, TypeDef, TypeId,
    TypeKind, WellKnownMember, WellKnownSymbol,
};
use crate::error::CompileError;
use crate::{String, ToString, Vec, format};

/// All types, fields and methods of the module being compiled.
///
/// Ids are handed out monotonically. A [`Checkpoint`] taken before compiling a
/// method lets the driver discard whatever that method added if it fails.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    types: Vec<TypeDef>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
    arrays: HashMap<(TypeId, u8), TypeId>,
    well_known: HashMap<WellKnownMember, WellKnownSymbol>,
    /// Ordinal used to name the next synthesized type.
    next_synthesized: u32,
}

/// Snapshot of table sizes for [`SymbolTable::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    types: usize,
    fields: usize,
    methods: usize,
    next_synthesized: u32,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut types = Vec::with_capacity(FIXED_TYPE_COUNT);
        types.push(TypeDef::new("void", TypeKind::Void));
        for ty in PrimitiveType::all() {
            let mut def = TypeDef::new(format!("{}", ty), TypeKind::Primitive(ty));
            if ty.kind() != PrimitiveKind::Object {
                def.base = Some(TypeId::OBJECT);
            }
            types.push(def);
        }
        debug_assert_eq!(types.len(), FIXED_TYPE_COUNT);

        Self {
            types,
            fields: Vec::new(),
            methods: Vec::new(),
            arrays: HashMap::new(),
            well_known: HashMap::new(),
            next_synthesized: 0,
        }
    }

    // === Types ===

    pub fn add_type(&mut self, def: TypeDef) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(def);
        id
    }

    /// Interned array type. Arrays of the same element and rank share an id.
    pub fn array_of(&mut self, element: TypeId, rank: u8) -> TypeId {
        if let Some(id) = self.arrays.get(&(element, rank)) {
            return *id;
        }
        let name = if rank <= 1 {
            format!("{}[]", self.type_name(element))
        } else {
            let commas: String = core::iter::repeat_n(',', rank as usize - 1).collect();
            format!("{}[{}]", self.type_name(element), commas)
        };
        let id = self.add_type(TypeDef::new(name, TypeKind::Array { element, rank }).with_base(TypeId::OBJECT));
        self.arrays.insert((element, rank), id);
        id
    }

    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.index()]
    }

    pub fn type_def_mut(&mut self, id: TypeId) -> &mut TypeDef {
        &mut self.types[id.index()]
    }

    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    pub fn type_name(&self, id: TypeId) -> String {
        match self.types.get(id.index()) {
            Some(def) => def.name.clone(),
            None => format!("<type {}>", id.0),
        }
    }

    pub fn primitive_of(&self, id: TypeId) -> Option<PrimitiveType> {
        match self.types.get(id.index())?.kind {
            TypeKind::Primitive(ty) => Some(ty),
            _ => None,
        }
    }

    /// Element type and rank for array types.
    pub fn array_info(&self, id: TypeId) -> Option<(TypeId, u8)> {
        match self.types.get(id.index())?.kind {
            TypeKind::Array { element, rank } => Some((element, rank)),
            _ => None,
        }
    }

    /// Value types are copied on assignment and need an address to be used as
    /// a call receiver.
    pub fn is_value_type(&self, id: TypeId) -> bool {
        match self.types.get(id.index()).map(|def| def.kind) {
            Some(TypeKind::Primitive(ty)) => !ty.kind().is_reference(),
            Some(TypeKind::Struct) => true,
            _ => false,
        }
    }

    /// Whether `ty` is `ancestor`, inherits from it or implements it. Every
    /// type other than void derives from object.
    pub fn derives_from(&self, ty: TypeId, ancestor: TypeId) -> bool {
        if ancestor == TypeId::OBJECT {
            return ty != TypeId::VOID;
        }
        let mut current = Some(ty);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            let Some(def) = self.types.get(id.index()) else {
                return false;
            };
            if def.interfaces.contains(&ancestor) {
                return true;
            }
            current = def.base;
        }
        false
    }

    /// Conversion from `from` to `to`.
    ///
    /// Primitive pairs go through the static table; other pairs are decided by
    /// the inheritance graph.
    pub fn classify_conversion(&self, from: TypeId, to: TypeId) -> ConversionKind {
        if from == to {
            return ConversionKind::Identity;
        }
        if from == TypeId::VOID || to == TypeId::VOID {
            return ConversionKind::NoConversion;
        }
        if let (Some(source), Some(target)) = (self.primitive_of(from), self.primitive_of(to)) {
            return cinder_types::classify(Some(source), Some(target));
        }
        match (self.is_value_type(from), self.is_value_type(to)) {
            (true, false) if self.derives_from(from, to) => ConversionKind::Boxing,
            (false, true) if self.derives_from(to, from) => ConversionKind::Unboxing,
            (false, false) if self.derives_from(from, to) => ConversionKind::ImplicitReference,
            (false, false) if self.derives_from(to, from) => ConversionKind::ExplicitReference,
            _ => ConversionKind::NoConversion,
        }
    }

    // === Members ===

    pub fn add_field(&mut self, owner: TypeId, name: impl Into<String>, ty: TypeId, is_static: bool) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(FieldDef {
            owner,
            name: name.into(),
            ty,
            is_static,
        });
        self.types[owner.index()].fields.push(id);
        id
    }

    pub fn add_method(&mut self, def: MethodDef) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        let owner = def.owner;
        self.methods.push(def);
        self.types[owner.index()].methods.push(id);
        id
    }

    pub fn field(&self, id: FieldId) -> &FieldDef {
        &self.fields[id.0 as usize]
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn method(&self, id: MethodId) -> &MethodDef {
        &self.methods[id.0 as usize]
    }

    pub fn method_mut(&mut self, id: MethodId) -> &mut MethodDef {
        &mut self.methods[id.0 as usize]
    }

    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    /// First method of `owner` called `name`, in declaration order.
    pub fn find_method(&self, owner: TypeId, name: &str) -> Option<MethodId> {
        self.type_def(owner)
            .methods
            .iter()
            .copied()
            .find(|id| self.method(*id).name == name)
    }

    pub fn find_field(&self, owner: TypeId, name: &str) -> Option<FieldId> {
        self.type_def(owner)
            .fields
            .iter()
            .copied()
            .find(|id| self.field(*id).name == name)
    }

    /// Like [`find_method`](Self::find_method) but a missing member is an error.
    pub fn require_method(&self, owner: TypeId, name: &str) -> Result<MethodId, CompileError> {
        self.find_method(owner, name)
            .ok_or_else(|| CompileError::MissingMember {
                owner: self.type_name(owner),
                name: name.to_string(),
            })
    }

    /// The instance constructor of `owner`, if it declares one.
    pub fn constructor(&self, owner: TypeId) -> Option<MethodId> {
        self.type_def(owner)
            .methods
            .iter()
            .copied()
            .find(|id| {
                let def = self.method(*id);
                def.flags.contains(MethodFlags::CONSTRUCTOR) && !def.is_static()
            })
    }

    // === Well-known members ===

    pub fn register_well_known(&mut self, member: WellKnownMember, symbol: WellKnownSymbol) {
        self.well_known.insert(member, symbol);
    }

    pub fn well_known_method(&self, member: WellKnownMember) -> Result<MethodId, CompileError> {
        match self.well_known.get(&member) {
            Some(WellKnownSymbol::Method(id)) => Ok(*id),
            _ => Err(CompileError::MissingWellKnownMember(member)),
        }
    }

    pub fn well_known_type(&self, member: WellKnownMember) -> Result<TypeId, CompileError> {
        match self.well_known.get(&member) {
            Some(WellKnownSymbol::Type(id)) => Ok(*id),
            _ => Err(CompileError::MissingWellKnownMember(member)),
        }
    }

    // === Synthesis support ===

    /// Returns a fresh ordinal for naming a synthesized type.
    pub fn next_synthesized_ordinal(&mut self) -> u32 {
        let ordinal = self.next_synthesized;
        self.next_synthesized += 1;
        ordinal
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            types: self.types.len(),
            fields: self.fields.len(),
            methods: self.methods.len(),
            next_synthesized: self.next_synthesized,
        }
    }

    /// Drops everything added after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.types.truncate(checkpoint.types);
        self.fields.truncate(checkpoint.fields);
        self.methods.truncate(checkpoint.methods);
        self.next_synthesized = checkpoint.next_synthesized;

        let (fields, methods) = (checkpoint.fields as u32, checkpoint.methods as u32);
        for def in &mut self.types {
            def.fields.retain(|id| id.0 < fields);
            def.methods.retain(|id| id.0 < methods);
        }
        let types = checkpoint.types as u32;
        self.arrays.retain(|_, id| id.0 < types);
        self.well_known.retain(|_, symbol| match symbol {
            WellKnownSymbol::Type(id) => id.0 < types,
            WellKnownSymbol::Method(id) => id.0 < methods,
            WellKnownSymbol::Field(id) => id.0 < fields,
        });
    }
}
