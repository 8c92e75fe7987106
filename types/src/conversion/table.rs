//! The precomputed 32×32 classification table.
//!
//! Rows are sources, columns are targets, both in `PrimitiveType::index` order.
//! `general.rs` derives every cell from first principles; the two must agree.

use super::ConversionKind::{self, *};
use crate::primitive::PrimitiveType;

const IDN: ConversionKind = Identity;
const IMN: ConversionKind = ImplicitNumeric;
const XNM: ConversionKind = ExplicitNumeric;
const INL: ConversionKind = ImplicitNullable;
const XNL: ConversionKind = ExplicitNullable;
const IRF: ConversionKind = ImplicitReference;
const XRF: ConversionKind = ExplicitReference;
const BOX: ConversionKind = Boxing;
const UNB: ConversionKind = Unboxing;
const NOC: ConversionKind = NoConversion;

const N: usize = PrimitiveType::COUNT;

#[rustfmt::skip]
static TABLE: [[ConversionKind; N]; N] = [
    /*   Object */ [IDN, XRF, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB, UNB],
    /*   String */ [IRF, IDN, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC],
    /*     Bool */ [BOX, NOC, IDN, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, INL, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC],
    /*     Char */ [BOX, NOC, NOC, IDN, XNM, XNM, XNM, IMN, IMN, IMN, IMN, IMN, IMN, IMN, IMN, IMN, IMN, NOC, INL, XNL, XNL, XNL, INL, INL, INL, INL, INL, INL, INL, INL, INL, INL],
    /*    SByte */ [BOX, NOC, NOC, XNM, IDN, XNM, IMN, XNM, IMN, XNM, IMN, XNM, IMN, XNM, IMN, IMN, IMN, NOC, XNL, INL, XNL, INL, XNL, INL, XNL, INL, XNL, INL, XNL, INL, INL, INL],
    /*     Byte */ [BOX, NOC, NOC, XNM, XNM, IDN, IMN, IMN, IMN, IMN, IMN, IMN, IMN, IMN, IMN, IMN, IMN, NOC, XNL, XNL, INL, INL, INL, INL, INL, INL, INL, INL, INL, INL, INL, INL],
    /*    Int16 */ [BOX, NOC, NOC, XNM, XNM, XNM, IDN, XNM, IMN, XNM, IMN, XNM, IMN, XNM, IMN, IMN, IMN, NOC, XNL, XNL, XNL, INL, XNL, INL, XNL, INL, XNL, INL, XNL, INL, INL, INL],
    /*   UInt16 */ [BOX, NOC, NOC, XNM, XNM, XNM, XNM, IDN, IMN, IMN, IMN, IMN, IMN, IMN, IMN, IMN, IMN, NOC, XNL, XNL, XNL, XNL, INL, INL, INL, INL, INL, INL, INL, INL, INL, INL],
    /*    Int32 */ [BOX, NOC, NOC, XNM, XNM, XNM, XNM, XNM, IDN, XNM, IMN, XNM, IMN, XNM, IMN, IMN, IMN, NOC, XNL, XNL, XNL, XNL, XNL, INL, XNL, INL, XNL, INL, XNL, INL, INL, INL],
    /*   UInt32 */ [BOX, NOC, NOC, XNM, XNM, XNM, XNM, XNM, XNM, IDN, IMN, IMN, XNM, IMN, IMN, IMN, IMN, NOC, XNL, XNL, XNL, XNL, XNL, XNL, INL, INL, INL, XNL, INL, INL, INL, INL],
    /*    Int64 */ [BOX, NOC, NOC, XNM, XNM, XNM, XNM, XNM, XNM, XNM, IDN, XNM, XNM, XNM, IMN, IMN, IMN, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, INL, XNL, XNL, XNL, INL, INL, INL],
    /*   UInt64 */ [BOX, NOC, NOC, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, IDN, XNM, XNM, IMN, IMN, IMN, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, INL, XNL, XNL, INL, INL, INL],
    /*     NInt */ [BOX, NOC, NOC, XNM, XNM, XNM, XNM, XNM, XNM, XNM, IMN, XNM, IDN, XNM, IMN, IMN, IMN, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, INL, XNL, INL, XNL, INL, INL, INL],
    /*    NUInt */ [BOX, NOC, NOC, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, IMN, XNM, IDN, IMN, IMN, IMN, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, INL, XNL, INL, INL, INL, INL],
    /*   Single */ [BOX, NOC, NOC, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, IDN, IMN, XNM, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, INL, INL, XNL],
    /*   Double */ [BOX, NOC, NOC, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, IDN, XNM, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, INL, XNL],
    /*  Decimal */ [BOX, NOC, NOC, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, XNM, IDN, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, INL],
    /*    Bool? */ [BOX, NOC, XNL, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, IDN, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC, NOC],
    /*    Char? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, IDN, XNL, XNL, XNL, INL, INL, INL, INL, INL, INL, INL, INL, INL, INL],
    /*   SByte? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, IDN, XNL, INL, XNL, INL, XNL, INL, XNL, INL, XNL, INL, INL, INL],
    /*    Byte? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, IDN, INL, INL, INL, INL, INL, INL, INL, INL, INL, INL, INL],
    /*   Int16? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, XNL, IDN, XNL, INL, XNL, INL, XNL, INL, XNL, INL, INL, INL],
    /*  UInt16? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, XNL, XNL, IDN, INL, INL, INL, INL, INL, INL, INL, INL, INL],
    /*   Int32? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, XNL, XNL, XNL, IDN, XNL, INL, XNL, INL, XNL, INL, INL, INL],
    /*  UInt32? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, XNL, XNL, XNL, XNL, IDN, INL, INL, XNL, INL, INL, INL, INL],
    /*   Int64? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, IDN, XNL, XNL, XNL, INL, INL, INL],
    /*  UInt64? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, IDN, XNL, XNL, INL, INL, INL],
    /*    NInt? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, INL, XNL, IDN, XNL, INL, INL, INL],
    /*   NUInt? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, INL, XNL, IDN, INL, INL, INL],
    /*  Single? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, IDN, INL, XNL],
    /*  Double? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, IDN, XNL],
    /* Decimal? */ [BOX, NOC, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, NOC, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, XNL, IDN],
];

/// Classifies by raw table index. Indices outside the primitive space are
/// treated as "not primitive".
pub fn classify_index(source: usize, target: usize) -> ConversionKind {
    match TABLE.get(source).and_then(|row| row.get(target)) {
        Some(kind) => *kind,
        None => NoConversion,
    }
}

/// Classifies a conversion between two categories. `None` on either side
/// stands for a non-primitive type; callers fall back to the general
/// conversion search in that case.
pub fn classify(source: Option<PrimitiveType>, target: Option<PrimitiveType>) -> ConversionKind {
    match (source, target) {
        (Some(source), Some(target)) => TABLE[source.index()][target.index()],
        _ => NoConversion,
    }
}

static_assertions::const_assert_eq!(N, 32);
