use super::ConversionKind;
use crate::primitive::{PrimitiveKind, PrimitiveType};

/// Classifies a conversion from category rules and value ranges alone.
///
/// Slower than the table but independent of it.
pub fn classify_general(source: PrimitiveType, target: PrimitiveType) -> ConversionKind {
    if source == target {
        return ConversionKind::Identity;
    }
    if !source.is_nullable() && !target.is_nullable() {
        return classify_plain(source.kind(), target.kind());
    }

    // At least one side is nullable from here on.
    if target == PrimitiveType::new(PrimitiveKind::Object) {
        return ConversionKind::Boxing;
    }
    if source == PrimitiveType::new(PrimitiveKind::Object) {
        return ConversionKind::Unboxing;
    }
    if source.kind() == PrimitiveKind::String || target.kind() == PrimitiveKind::String {
        return ConversionKind::NoConversion;
    }

    let underlying = classify_plain(source.kind(), target.kind());
    if target.is_nullable() {
        match underlying {
            ConversionKind::Identity | ConversionKind::ImplicitNumeric => {
                ConversionKind::ImplicitNullable
            }
            ConversionKind::ExplicitNumeric => ConversionKind::ExplicitNullable,
            _ => ConversionKind::NoConversion,
        }
    } else {
        match underlying {
            ConversionKind::Identity
            | ConversionKind::ImplicitNumeric
            | ConversionKind::ExplicitNumeric => ConversionKind::ExplicitNullable,
            _ => ConversionKind::NoConversion,
        }
    }
}

fn classify_plain(source: PrimitiveKind, target: PrimitiveKind) -> ConversionKind {
    use PrimitiveKind::*;

    if source == target {
        return ConversionKind::Identity;
    }
    if target == Object {
        return if source == String {
            ConversionKind::ImplicitReference
        } else {
            ConversionKind::Boxing
        };
    }
    if source == Object {
        return if target == String {
            ConversionKind::ExplicitReference
        } else {
            ConversionKind::Unboxing
        };
    }
    if matches!(source, String | Bool) || matches!(target, String | Bool) {
        return ConversionKind::NoConversion;
    }
    if implicit_numeric(source, target) {
        ConversionKind::ImplicitNumeric
    } else {
        ConversionKind::ExplicitNumeric
    }
}

fn implicit_numeric(source: PrimitiveKind, target: PrimitiveKind) -> bool {
    use PrimitiveKind::*;

    if target == Char {
        return false;
    }
    match source {
        Single => return target == Double,
        Double | Decimal => return false,
        _ => {}
    }
    if matches!(target, Single | Double | Decimal) {
        return source.is_integral();
    }
    match (possible_range(source), guaranteed_range(target)) {
        (Some((smin, smax)), Some((tmin, tmax))) => tmin <= smin && smax <= tmax,
        _ => false,
    }
}

/// Every value the source category can hold on any platform.
fn possible_range(kind: PrimitiveKind) -> Option<(i128, i128)> {
    use PrimitiveKind::*;
    Some(match kind {
        NInt => (i64::MIN as i128, i64::MAX as i128),
        NUInt => (0, u64::MAX as i128),
        _ => return fixed_range(kind),
    })
}

/// Values the target category can hold on every platform.
fn guaranteed_range(kind: PrimitiveKind) -> Option<(i128, i128)> {
    use PrimitiveKind::*;
    Some(match kind {
        NInt => (i32::MIN as i128, i32::MAX as i128),
        NUInt => (0, u32::MAX as i128),
        _ => return fixed_range(kind),
    })
}

fn fixed_range(kind: PrimitiveKind) -> Option<(i128, i128)> {
    use PrimitiveKind::*;
    Some(match kind {
        Char | UInt16 => (0, u16::MAX as i128),
        SByte => (i8::MIN as i128, i8::MAX as i128),
        Byte => (0, u8::MAX as i128),
        Int16 => (i16::MIN as i128, i16::MAX as i128),
        Int32 => (i32::MIN as i128, i32::MAX as i128),
        UInt32 => (0, u32::MAX as i128),
        Int64 => (i64::MIN as i128, i64::MAX as i128),
        UInt64 => (0, u64::MAX as i128),
        _ => return None,
    })
}
