use core::fmt;

use serde::{Deserialize, Serialize};

use crate::flags::PrimFlags;

/// The closed set of primitive categories known to the back end.
///
/// The discriminant doubles as the row/column index of the non-nullable part
/// of the conversion table, so the order here is load-bearing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PrimitiveKind {
    Object,
    String,
    Bool,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    NInt,
    NUInt,
    Single,
    Double,
    Decimal,
}

impl PrimitiveKind {
    pub const COUNT: usize = 17;

    pub const ALL: [PrimitiveKind; Self::COUNT] = [
        PrimitiveKind::Object,
        PrimitiveKind::String,
        PrimitiveKind::Bool,
        PrimitiveKind::Char,
        PrimitiveKind::SByte,
        PrimitiveKind::Byte,
        PrimitiveKind::Int16,
        PrimitiveKind::UInt16,
        PrimitiveKind::Int32,
        PrimitiveKind::UInt32,
        PrimitiveKind::Int64,
        PrimitiveKind::UInt64,
        PrimitiveKind::NInt,
        PrimitiveKind::NUInt,
        PrimitiveKind::Single,
        PrimitiveKind::Double,
        PrimitiveKind::Decimal,
    ];

    pub const fn flags(self) -> PrimFlags {
        use PrimitiveKind::*;
        const INT: u8 = PrimFlags::INTEGRAL.bits() | PrimFlags::NUMERIC.bits();
        const SIGNED_INT: u8 = INT | PrimFlags::SIGNED.bits();
        const BLIT: u8 = PrimFlags::BLITTABLE.bits();
        let bits = match self {
            Object | String => PrimFlags::REFERENCE.bits(),
            Bool => BLIT,
            Char => PrimFlags::INTEGRAL.bits() | BLIT,
            SByte | Int16 | Int32 | Int64 => SIGNED_INT | BLIT,
            Byte | UInt16 | UInt32 | UInt64 => INT | BLIT,
            NInt => SIGNED_INT,
            NUInt => INT,
            Single | Double => {
                PrimFlags::FLOATING.bits()
                    | PrimFlags::NUMERIC.bits()
                    | PrimFlags::SIGNED.bits()
                    | BLIT
            }
            Decimal => PrimFlags::NUMERIC.bits() | PrimFlags::SIGNED.bits(),
        };
        PrimFlags::from_bits_truncate(bits)
    }

    /// Width in bytes of a blittable category, `None` for everything else.
    ///
    /// Native-sized integers are excluded because their width depends on the
    /// platform the module eventually runs on.
    pub const fn byte_width(self) -> Option<u8> {
        use PrimitiveKind::*;
        match self {
            Bool | SByte | Byte => Some(1),
            Char | Int16 | UInt16 => Some(2),
            Int32 | UInt32 | Single => Some(4),
            Int64 | UInt64 | Double => Some(8),
            Object | String | NInt | NUInt | Decimal => None,
        }
    }

    pub const fn is_reference(self) -> bool {
        self.flags().contains(PrimFlags::REFERENCE)
    }

    pub const fn is_integral(self) -> bool {
        self.flags().contains(PrimFlags::INTEGRAL)
    }

    pub const fn is_unsigned_integral(self) -> bool {
        let flags = self.flags();
        flags.contains(PrimFlags::INTEGRAL) && !flags.contains(PrimFlags::SIGNED)
    }

    pub const fn is_floating(self) -> bool {
        self.flags().contains(PrimFlags::FLOATING)
    }

    pub const fn is_blittable(self) -> bool {
        self.flags().contains(PrimFlags::BLITTABLE)
    }

    pub const fn name(self) -> &'static str {
        use PrimitiveKind::*;
        match self {
            Object => "object",
            String => "string",
            Bool => "bool",
            Char => "char",
            SByte => "sbyte",
            Byte => "byte",
            Int16 => "short",
            UInt16 => "ushort",
            Int32 => "int",
            UInt32 => "uint",
            Int64 => "long",
            UInt64 => "ulong",
            NInt => "nint",
            NUInt => "nuint",
            Single => "float",
            Double => "double",
            Decimal => "decimal",
        }
    }
}

/// A primitive category, optionally wrapped as nullable.
///
/// Only value categories have a nullable form; `object` and `string` are
/// already nullable references.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrimitiveType {
    kind: PrimitiveKind,
    nullable: bool,
}

/// First table index used by nullable categories.
const NULLABLE_BASE: usize = PrimitiveKind::COUNT;
/// `object` and `string` have no nullable row.
const FIRST_VALUE_KIND: usize = PrimitiveKind::Bool as usize;

impl PrimitiveType {
    /// Size of the classifier's index space: 17 plain plus 15 nullable.
    pub const COUNT: usize = PrimitiveKind::COUNT + (PrimitiveKind::COUNT - FIRST_VALUE_KIND);

    pub const fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub const fn nullable(kind: PrimitiveKind) -> Option<Self> {
        if kind.is_reference() {
            None
        } else {
            Some(Self {
                kind,
                nullable: true,
            })
        }
    }

    pub const fn kind(self) -> PrimitiveKind {
        self.kind
    }

    pub const fn is_nullable(self) -> bool {
        self.nullable
    }

    /// The non-nullable form of this category.
    pub const fn underlying(self) -> Self {
        Self::new(self.kind)
    }

    pub const fn index(self) -> usize {
        if self.nullable {
            NULLABLE_BASE + (self.kind as usize - FIRST_VALUE_KIND)
        } else {
            self.kind as usize
        }
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        if index < NULLABLE_BASE {
            Some(Self::new(PrimitiveKind::ALL[index]))
        } else if index < Self::COUNT {
            Self::nullable(PrimitiveKind::ALL[index - NULLABLE_BASE + FIRST_VALUE_KIND])
        } else {
            None
        }
    }

    /// Every category in index order.
    pub fn all() -> impl Iterator<Item = PrimitiveType> {
        (0..Self::COUNT).filter_map(Self::from_index)
    }
}

impl From<PrimitiveKind> for PrimitiveType {
    fn from(kind: PrimitiveKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())?;
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

static_assertions::const_assert_eq!(PrimitiveType::COUNT, 32);
