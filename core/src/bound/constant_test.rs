use cinder_types::PrimitiveKind;
use pretty_assertions::assert_eq;

use super::{ConstantValue, DecimalValue};
use crate::Vec;

#[test]
fn test_integral_conversions_wrap() {
    assert_eq!(ConstantValue::Int32(300).convert(PrimitiveKind::Byte), Some(ConstantValue::Byte(44)));
    assert_eq!(ConstantValue::Int32(-1).convert(PrimitiveKind::UInt32), Some(ConstantValue::UInt32(u32::MAX)));
    assert_eq!(ConstantValue::Byte(7).convert(PrimitiveKind::Int64), Some(ConstantValue::Int64(7)));
    assert_eq!(ConstantValue::Char(65).convert(PrimitiveKind::Int32), Some(ConstantValue::Int32(65)));
}

#[test]
fn test_native_integers_fold_only_in_32_bit_range() {
    assert_eq!(ConstantValue::Int32(5).convert(PrimitiveKind::NInt), Some(ConstantValue::NInt(5)));
    assert_eq!(ConstantValue::Int64(1 << 40).convert(PrimitiveKind::NInt), None);
    assert_eq!(ConstantValue::Int64(-1).convert(PrimitiveKind::NUInt), None);
}

#[test]
fn test_floating_conversions() {
    assert_eq!(ConstantValue::Double(3.9).convert(PrimitiveKind::Int32), Some(ConstantValue::Int32(3)));
    assert_eq!(ConstantValue::Double(-3.9).convert(PrimitiveKind::Int32), Some(ConstantValue::Int32(-3)));
    assert_eq!(ConstantValue::Double(1e20).convert(PrimitiveKind::Int32), None);
    assert_eq!(ConstantValue::Double(f64::NAN).convert(PrimitiveKind::Int64), None);
    assert_eq!(ConstantValue::Int32(2).convert(PrimitiveKind::Double), Some(ConstantValue::Double(2.0)));
    assert_eq!(ConstantValue::Double(0.5).convert(PrimitiveKind::Decimal), None);
}

#[test]
fn test_floating_conversions_at_integral_bounds() {
    let two_pow_63 = 9_223_372_036_854_775_808.0_f64;
    let two_pow_64 = 18_446_744_073_709_551_616.0_f64;
    assert_eq!(ConstantValue::Double(two_pow_63).convert(PrimitiveKind::Int64), None);
    assert_eq!(ConstantValue::Double(two_pow_64).convert(PrimitiveKind::UInt64), None);
    assert_eq!(
        ConstantValue::Double(-two_pow_63).convert(PrimitiveKind::Int64),
        Some(ConstantValue::Int64(i64::MIN))
    );
    assert_eq!(
        ConstantValue::Double(two_pow_63).convert(PrimitiveKind::UInt64),
        Some(ConstantValue::UInt64(1 << 63))
    );
    assert_eq!(
        ConstantValue::Double(2_147_483_647.0).convert(PrimitiveKind::Int32),
        Some(ConstantValue::Int32(i32::MAX))
    );
    assert_eq!(ConstantValue::Double(2_147_483_648.0).convert(PrimitiveKind::Int32), None);
}

#[test]
fn test_decimal_from_integral() {
    assert_eq!(
        ConstantValue::Int64(-5).convert(PrimitiveKind::Decimal),
        Some(ConstantValue::Decimal(DecimalValue {
            lo: 5,
            mid: 0,
            hi: 0,
            negative: true,
            scale: 0,
        }))
    );
    let big = DecimalValue::from_i128(1i128 << 70).unwrap();
    assert_eq!((big.lo, big.mid, big.hi), (0, 0, 1 << 6));
    assert_eq!(DecimalValue::from_i128(1i128 << 100), None);
}

#[test]
fn test_non_numeric_values_do_not_convert() {
    assert_eq!(ConstantValue::Bool(true).convert(PrimitiveKind::Int32), None);
    assert_eq!(ConstantValue::String("x").convert(PrimitiveKind::Int32), None);
    assert_eq!(ConstantValue::Null.convert(PrimitiveKind::Int32), None);
}

#[test]
fn test_default_values() {
    assert!(ConstantValue::Int32(0).is_default());
    assert!(ConstantValue::Bool(false).is_default());
    assert!(ConstantValue::Null.is_default());
    assert!(ConstantValue::Double(0.0).is_default());
    assert!(!ConstantValue::Double(-0.0).is_default());
    assert!(!ConstantValue::String("").is_default());
    for kind in PrimitiveKind::ALL {
        assert!(ConstantValue::default_of(kind).is_default(), "{:?}", kind);
    }
}

#[test]
fn test_little_endian_images() {
    let mut out = Vec::new();
    assert!(ConstantValue::Int32(0x0102_0304).write_le(&mut out));
    assert!(ConstantValue::Byte(9).write_le(&mut out));
    assert!(ConstantValue::Char(0x4142).write_le(&mut out));
    assert_eq!(out, [4, 3, 2, 1, 9, 0x42, 0x41]);

    assert!(!ConstantValue::String("s").write_le(&mut out));
    assert!(!ConstantValue::NInt(1).write_le(&mut out));
    assert_eq!(out.len(), 7);
}
