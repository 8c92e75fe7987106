use cinder_types::PrimitiveKind;

use crate::Vec;

/// A 96-bit scaled decimal in its storage form.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecimalValue {
    pub lo: u32,
    pub mid: u32,
    pub hi: u32,
    pub negative: bool,
    pub scale: u8,
}

impl DecimalValue {
    pub const ZERO: DecimalValue = DecimalValue {
        lo: 0,
        mid: 0,
        hi: 0,
        negative: false,
        scale: 0,
    };

    /// Exact integral value, if its magnitude fits in 96 bits.
    pub fn from_i128(value: i128) -> Option<Self> {
        let magnitude = value.unsigned_abs();
        if magnitude >> 96 != 0 {
            return None;
        }
        Some(Self {
            lo: magnitude as u32,
            mid: (magnitude >> 32) as u32,
            hi: (magnitude >> 64) as u32,
            negative: value < 0,
            scale: 0,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.lo == 0 && self.mid == 0 && self.hi == 0
    }
}

/// A compile-time value of a primitive category.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConstantValue<'a> {
    Null,
    Bool(bool),
    Char(u16),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    NInt(i64),
    NUInt(u64),
    Single(f32),
    Double(f64),
    Decimal(DecimalValue),
    String(&'a str),
}

enum Numeric {
    Int(i128),
    Float(f64),
}

impl<'a> ConstantValue<'a> {
    pub fn kind(&self) -> Option<PrimitiveKind> {
        use ConstantValue::*;
        Some(match self {
            Null => return None,
            Bool(_) => PrimitiveKind::Bool,
            Char(_) => PrimitiveKind::Char,
            SByte(_) => PrimitiveKind::SByte,
            Byte(_) => PrimitiveKind::Byte,
            Int16(_) => PrimitiveKind::Int16,
            UInt16(_) => PrimitiveKind::UInt16,
            Int32(_) => PrimitiveKind::Int32,
            UInt32(_) => PrimitiveKind::UInt32,
            Int64(_) => PrimitiveKind::Int64,
            UInt64(_) => PrimitiveKind::UInt64,
            NInt(_) => PrimitiveKind::NInt,
            NUInt(_) => PrimitiveKind::NUInt,
            Single(_) => PrimitiveKind::Single,
            Double(_) => PrimitiveKind::Double,
            Decimal(_) => PrimitiveKind::Decimal,
            String(_) => PrimitiveKind::String,
        })
    }

    /// True when the value equals the zero-initialized memory of its type.
    ///
    /// Floating-point negative zero is not a default value: its bit pattern
    /// is not all zeros.
    pub fn is_default(&self) -> bool {
        use ConstantValue::*;
        match *self {
            Null => true,
            Bool(v) => !v,
            Char(v) | UInt16(v) => v == 0,
            SByte(v) => v == 0,
            Byte(v) => v == 0,
            Int16(v) => v == 0,
            Int32(v) => v == 0,
            UInt32(v) => v == 0,
            Int64(v) | NInt(v) => v == 0,
            UInt64(v) | NUInt(v) => v == 0,
            Single(v) => v.to_bits() == 0,
            Double(v) => v.to_bits() == 0,
            Decimal(v) => v.is_zero() && !v.negative && v.scale == 0,
            String(_) => false,
        }
    }

    /// Zero value of a primitive category.
    pub fn default_of(kind: PrimitiveKind) -> ConstantValue<'a> {
        use PrimitiveKind as K;
        match kind {
            K::Object | K::String => ConstantValue::Null,
            K::Bool => ConstantValue::Bool(false),
            K::Char => ConstantValue::Char(0),
            K::SByte => ConstantValue::SByte(0),
            K::Byte => ConstantValue::Byte(0),
            K::Int16 => ConstantValue::Int16(0),
            K::UInt16 => ConstantValue::UInt16(0),
            K::Int32 => ConstantValue::Int32(0),
            K::UInt32 => ConstantValue::UInt32(0),
            K::Int64 => ConstantValue::Int64(0),
            K::UInt64 => ConstantValue::UInt64(0),
            K::NInt => ConstantValue::NInt(0),
            K::NUInt => ConstantValue::NUInt(0),
            K::Single => ConstantValue::Single(0.0),
            K::Double => ConstantValue::Double(0.0),
            K::Decimal => ConstantValue::Decimal(DecimalValue::ZERO),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstantValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn numeric(&self) -> Option<Numeric> {
        use ConstantValue::*;
        Some(match *self {
            Char(v) | UInt16(v) => Numeric::Int(v as i128),
            SByte(v) => Numeric::Int(v as i128),
            Byte(v) => Numeric::Int(v as i128),
            Int16(v) => Numeric::Int(v as i128),
            Int32(v) => Numeric::Int(v as i128),
            UInt32(v) => Numeric::Int(v as i128),
            Int64(v) | NInt(v) => Numeric::Int(v as i128),
            UInt64(v) | NUInt(v) => Numeric::Int(v as i128),
            Single(v) => Numeric::Float(v as f64),
            Double(v) => Numeric::Float(v),
            Decimal(v) if v.scale == 0 => {
                let magnitude = (v.hi as i128) << 64 | (v.mid as i128) << 32 | v.lo as i128;
                Numeric::Int(if v.negative { -magnitude } else { magnitude })
            }
            _ => return None,
        })
    }

    /// Folds an unchecked numeric conversion.
    ///
    /// Integral targets wrap. Returns `None` when the result would depend on
    /// the platform (native integers out of 32-bit range) or on runtime
    /// behavior (out-of-range floating to integral), leaving the conversion
    /// to run at execution time.
    pub fn convert(&self, target: PrimitiveKind) -> Option<ConstantValue<'a>> {
        match self.numeric()? {
            Numeric::Int(v) => Self::from_int(v, target),
            Numeric::Float(v) => match target {
                PrimitiveKind::Single => Some(ConstantValue::Single(v as f32)),
                PrimitiveKind::Double => Some(ConstantValue::Double(v)),
                PrimitiveKind::Decimal => None,
                _ if v.is_finite() => {
                    let truncated = trunc_toward_zero(v);
                    let (min, max) = integral_range(target)?;
                    // `max` itself may round up when cast; the exclusive bound is exact.
                    if truncated < min as f64 || truncated >= (max + 1) as f64 {
                        None
                    } else {
                        Self::from_int(truncated as i128, target)
                    }
                }
                _ => None,
            },
        }
    }

    fn from_int(v: i128, target: PrimitiveKind) -> Option<ConstantValue<'a>> {
        use PrimitiveKind as K;
        Some(match target {
            K::Char => ConstantValue::Char(v as u16),
            K::SByte => ConstantValue::SByte(v as i8),
            K::Byte => ConstantValue::Byte(v as u8),
            K::Int16 => ConstantValue::Int16(v as i16),
            K::UInt16 => ConstantValue::UInt16(v as u16),
            K::Int32 => ConstantValue::Int32(v as i32),
            K::UInt32 => ConstantValue::UInt32(v as u32),
            K::Int64 => ConstantValue::Int64(v as i64),
            K::UInt64 => ConstantValue::UInt64(v as u64),
            K::NInt if i32::try_from(v).is_ok() => ConstantValue::NInt(v as i64),
            K::NUInt if u32::try_from(v).is_ok() => ConstantValue::NUInt(v as u64),
            K::Single => ConstantValue::Single(v as f32),
            K::Double => ConstantValue::Double(v as f64),
            K::Decimal => ConstantValue::Decimal(DecimalValue::from_i128(v)?),
            K::NInt | K::NUInt | K::Bool | K::Object | K::String => return None,
        })
    }

    /// Appends the little-endian memory image of a blittable value.
    ///
    /// Returns `false`, writing nothing, for values without a fixed layout.
    pub fn write_le(&self, out: &mut Vec<u8>) -> bool {
        use ConstantValue::*;
        match *self {
            Bool(v) => out.push(v as u8),
            Char(v) | UInt16(v) => out.extend_from_slice(&v.to_le_bytes()),
            SByte(v) => out.extend_from_slice(&v.to_le_bytes()),
            Byte(v) => out.push(v),
            Int16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            UInt32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
            UInt64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Single(v) => out.extend_from_slice(&v.to_le_bytes()),
            Double(v) => out.extend_from_slice(&v.to_le_bytes()),
            Null | NInt(_) | NUInt(_) | Decimal(_) | String(_) => return false,
        }
        true
    }
}

fn integral_range(kind: PrimitiveKind) -> Option<(i128, i128)> {
    use PrimitiveKind as K;
    Some(match kind {
        K::Char | K::UInt16 => (0, u16::MAX as i128),
        K::SByte => (i8::MIN as i128, i8::MAX as i128),
        K::Byte => (0, u8::MAX as i128),
        K::Int16 => (i16::MIN as i128, i16::MAX as i128),
        K::Int32 | K::NInt => (i32::MIN as i128, i32::MAX as i128),
        K::UInt32 | K::NUInt => (0, u32::MAX as i128),
        K::Int64 => (i64::MIN as i128, i64::MAX as i128),
        K::UInt64 => (0, u64::MAX as i128),
        _ => return None,
    })
}

/// Truncation toward zero without `std`.
fn trunc_toward_zero(v: f64) -> f64 {
    // Beyond 2^52 every finite double is already integral.
    const INTEGRAL_FROM: f64 = 4_503_599_627_370_496.0;
    if v >= INTEGRAL_FROM || v <= -INTEGRAL_FROM {
        v
    } else {
        (v as i64) as f64
    }
}
