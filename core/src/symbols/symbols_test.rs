use cinder_types::{PrimitiveKind, PrimitiveType};
use pretty_assertions::assert_eq;

use super::*;
use crate::CompileError;
use crate::vec;

#[test]
fn test_primitives_are_interned_at_fixed_ids() {
    let symbols = SymbolTable::new();
    for ty in PrimitiveType::all() {
        let id = TypeId::primitive(ty);
        assert_eq!(symbols.primitive_of(id), Some(ty));
    }
    assert_eq!(symbols.type_def(TypeId::VOID).kind, TypeKind::Void);
    assert_eq!(symbols.type_name(TypeId::INT32), "int");
    let nullable = PrimitiveType::nullable(PrimitiveKind::Int64).unwrap();
    assert_eq!(symbols.type_name(TypeId::primitive(nullable)), "long?");
}

#[test]
fn test_value_types() {
    let mut symbols = SymbolTable::new();
    let point = symbols.add_type(TypeDef::value_struct("Point"));
    let widget = symbols.add_type(TypeDef::class("Widget"));
    assert!(symbols.is_value_type(TypeId::INT32));
    assert!(symbols.is_value_type(point));
    assert!(!symbols.is_value_type(TypeId::STRING));
    assert!(!symbols.is_value_type(widget));
    assert!(!symbols.is_value_type(TypeId::VOID));
}

#[test]
fn test_arrays_are_interned() {
    let mut symbols = SymbolTable::new();
    let a = symbols.array_of(TypeId::INT32, 1);
    let b = symbols.array_of(TypeId::INT32, 1);
    let c = symbols.array_of(TypeId::INT32, 2);
    assert_eq!(a, b);
    assert!(a != c);
    assert_eq!(symbols.type_name(a), "int[]");
    assert_eq!(symbols.type_name(c), "int[,]");
    assert_eq!(symbols.array_info(c), Some((TypeId::INT32, 2)));
}

#[test]
fn test_member_lookup() {
    let mut symbols = SymbolTable::new();
    let widget = symbols.add_type(TypeDef::class("Widget"));
    let size = symbols.add_field(widget, "size", TypeId::INT32, false);
    let grow = symbols.add_method(MethodDef::new(widget, "Grow", vec![Param::new("by", TypeId::INT32)], TypeId::VOID));

    assert_eq!(symbols.find_field(widget, "size"), Some(size));
    assert_eq!(symbols.find_method(widget, "Grow"), Some(grow));
    assert_eq!(
        symbols.require_method(widget, "Shrink"),
        Err(CompileError::MissingMember {
            owner: "Widget".into(),
            name: "Shrink".into(),
        })
    );
}

#[test]
fn test_rollback_discards_additions() {
    let mut symbols = SymbolTable::new();
    let widget = symbols.add_type(TypeDef::class("Widget"));
    let checkpoint = symbols.checkpoint();

    let helper = symbols.add_type(TypeDef::class("<Run>d__0"));
    symbols.add_field(helper, "<>1__state", TypeId::INT32, false);
    symbols.add_field(widget, "extra", TypeId::INT32, false);
    symbols.add_method(MethodDef::new(widget, "Extra", vec![], TypeId::VOID));
    symbols.array_of(helper, 1);
    assert_eq!(symbols.next_synthesized_ordinal(), 0);

    symbols.rollback(checkpoint);

    assert_eq!(symbols.checkpoint(), checkpoint);
    assert!(symbols.type_def(widget).fields.is_empty());
    assert!(symbols.type_def(widget).methods.is_empty());
    assert_eq!(symbols.next_synthesized_ordinal(), 0);
}

#[test]
fn test_well_known_members() {
    let mut symbols = SymbolTable::new();
    assert_eq!(
        symbols.well_known_method(WellKnownMember::ObjectCtor),
        Err(CompileError::MissingWellKnownMember(WellKnownMember::ObjectCtor))
    );

    let core = declare_core_library(&mut symbols);
    assert_eq!(symbols.well_known_method(WellKnownMember::ObjectCtor), Ok(core.object_ctor));
    assert_eq!(symbols.well_known_type(WellKnownMember::Exception), Ok(core.exception));
    assert!(symbols.well_known_method(WellKnownMember::DecimalFromInt64).is_ok());
    // A type is not a method.
    assert!(symbols.well_known_method(WellKnownMember::Exception).is_err());
}

#[test]
fn test_core_library_builders() {
    let mut symbols = SymbolTable::new();
    let core = declare_core_library(&mut symbols);

    for builder in [core.async_builder, core.async_builder_of_int, core.async_iterator_builder] {
        for name in ["Create", "Start", "AwaitOnCompleted", "SetResult", "SetException"] {
            assert!(symbols.find_method(builder, name).is_some(), "{}", name);
        }
    }
    let set_result = symbols.require_method(core.async_builder_of_int, "SetResult").unwrap();
    assert_eq!(symbols.method(set_result).params[0].ty, TypeId::INT32);

    let get_result = symbols.require_method(core.task_awaiter_of_int, "GetResult").unwrap();
    assert_eq!(symbols.method(get_result).ret, TypeId::INT32);
    assert_eq!(symbols.method(core.task_get_awaiter).ret, core.task_awaiter);
}

#[test]
fn test_classify_conversion_between_symbols() {
    use cinder_types::ConversionKind;

    let mut symbols = SymbolTable::new();
    let shape = symbols.add_type(TypeDef::class("Shape").with_base(TypeId::OBJECT));
    let circle = symbols.add_type(TypeDef::class("Circle").with_base(shape));
    let point = symbols.add_type(TypeDef::value_struct("Point"));

    assert_eq!(symbols.classify_conversion(circle, shape), ConversionKind::ImplicitReference);
    assert_eq!(symbols.classify_conversion(shape, circle), ConversionKind::ExplicitReference);
    assert_eq!(symbols.classify_conversion(point, TypeId::OBJECT), ConversionKind::Boxing);
    assert_eq!(symbols.classify_conversion(TypeId::OBJECT, point), ConversionKind::Unboxing);
    assert_eq!(symbols.classify_conversion(point, shape), ConversionKind::NoConversion);
    assert_eq!(symbols.classify_conversion(TypeId::INT32, TypeId::INT64), ConversionKind::ImplicitNumeric);
    assert_eq!(symbols.classify_conversion(TypeId::VOID, TypeId::OBJECT), ConversionKind::NoConversion);
}

#[test]
fn test_type_defs_survive_encoding() {
    let mut symbols = SymbolTable::new();
    let nullable = TypeId::primitive(PrimitiveType::nullable(PrimitiveKind::Int32).unwrap());
    let array = symbols.array_of(nullable, 1);
    for id in [TypeId::INT32, nullable, array] {
        let def = symbols.type_def(id);
        let bytes = postcard::to_allocvec(def).unwrap();
        let decoded: TypeDef = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(&decoded, def);
    }
}
