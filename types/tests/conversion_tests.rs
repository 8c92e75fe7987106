//! The classification table checked against the range-based algorithm.

use cinder_types::{
    ConversionKind, PrimitiveKind, PrimitiveType, classify, classify_general, classify_index,
};
use pretty_assertions::assert_eq;

fn plain(kind: PrimitiveKind) -> PrimitiveType {
    PrimitiveType::new(kind)
}

fn nullable(kind: PrimitiveKind) -> PrimitiveType {
    PrimitiveType::nullable(kind).unwrap()
}

#[test]
fn test_table_agrees_with_general_algorithm() {
    let mut mismatches = Vec::new();
    for source in PrimitiveType::all() {
        for target in PrimitiveType::all() {
            let fast = classify(Some(source), Some(target));
            let slow = classify_general(source, target);
            if fast != slow {
                mismatches.push(format!("{} -> {}: table {:?}, general {:?}", source, target, fast, slow));
            }
        }
    }
    assert_eq!(mismatches, Vec::<String>::new());
}

#[test]
fn test_identity_on_diagonal() {
    for ty in PrimitiveType::all() {
        assert_eq!(classify(Some(ty), Some(ty)), ConversionKind::Identity, "{}", ty);
    }
}

#[test]
fn test_int32_int64() {
    let int = plain(PrimitiveKind::Int32);
    let long = plain(PrimitiveKind::Int64);
    assert_eq!(classify(Some(int), Some(long)), ConversionKind::ImplicitNumeric);
    assert_eq!(classify(Some(long), Some(int)), ConversionKind::ExplicitNumeric);
}

#[test]
fn test_non_primitive_sentinel() {
    let int = plain(PrimitiveKind::Int32);
    assert_eq!(classify(None, Some(int)), ConversionKind::NoConversion);
    assert_eq!(classify(Some(int), None), ConversionKind::NoConversion);
    assert_eq!(classify(None, None), ConversionKind::NoConversion);
    assert_eq!(classify_index(0, PrimitiveType::COUNT), ConversionKind::NoConversion);
    assert_eq!(classify_index(usize::MAX, 0), ConversionKind::NoConversion);
}

#[test]
fn test_reference_and_boxing() {
    let object = plain(PrimitiveKind::Object);
    let string = plain(PrimitiveKind::String);
    let int = plain(PrimitiveKind::Int32);
    assert_eq!(classify(Some(string), Some(object)), ConversionKind::ImplicitReference);
    assert_eq!(classify(Some(object), Some(string)), ConversionKind::ExplicitReference);
    assert_eq!(classify(Some(int), Some(object)), ConversionKind::Boxing);
    assert_eq!(classify(Some(object), Some(int)), ConversionKind::Unboxing);
    assert_eq!(classify(Some(nullable(PrimitiveKind::Int32)), Some(object)), ConversionKind::Boxing);
}

#[test]
fn test_nullable_lifting() {
    let int = plain(PrimitiveKind::Int32);
    let long = plain(PrimitiveKind::Int64);
    assert_eq!(classify(Some(int), Some(nullable(PrimitiveKind::Int32))), ConversionKind::ImplicitNullable);
    assert_eq!(classify(Some(int), Some(nullable(PrimitiveKind::Int64))), ConversionKind::ImplicitNullable);
    assert_eq!(classify(Some(long), Some(nullable(PrimitiveKind::Int32))), ConversionKind::ExplicitNullable);
    assert_eq!(classify(Some(nullable(PrimitiveKind::Int32)), Some(int)), ConversionKind::ExplicitNullable);
    assert_eq!(classify(Some(nullable(PrimitiveKind::Bool)), Some(int)), ConversionKind::NoConversion);
}

#[test]
fn test_native_integers_use_platform_safe_ranges() {
    let nint = plain(PrimitiveKind::NInt);
    let int = plain(PrimitiveKind::Int32);
    let long = plain(PrimitiveKind::Int64);
    assert_eq!(classify(Some(int), Some(nint)), ConversionKind::ImplicitNumeric);
    assert_eq!(classify(Some(nint), Some(long)), ConversionKind::ImplicitNumeric);
    assert_eq!(classify(Some(long), Some(nint)), ConversionKind::ExplicitNumeric);
    assert_eq!(classify(Some(nint), Some(int)), ConversionKind::ExplicitNumeric);
}

#[test]
fn test_char_and_bool_are_special() {
    let char = plain(PrimitiveKind::Char);
    let bool = plain(PrimitiveKind::Bool);
    let ushort = plain(PrimitiveKind::UInt16);
    let int = plain(PrimitiveKind::Int32);
    assert_eq!(classify(Some(char), Some(ushort)), ConversionKind::ImplicitNumeric);
    assert_eq!(classify(Some(ushort), Some(char)), ConversionKind::ExplicitNumeric);
    assert_eq!(classify(Some(bool), Some(int)), ConversionKind::NoConversion);
    assert_eq!(classify(Some(int), Some(bool)), ConversionKind::NoConversion);
}

#[test]
fn test_every_lookup_has_a_defined_kind() {
    for source in 0..=PrimitiveType::COUNT {
        for target in 0..=PrimitiveType::COUNT {
            let kind = classify_index(source, target);
            assert!(!(kind.is_implicit() && kind.is_explicit()));
        }
    }
}
