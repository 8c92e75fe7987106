//! Primitive-to-primitive conversion classification.
//!
//! [`classify`] is the O(1) fast path used by lowering. [`classify_general`]
//! computes the same answer from category rules and value ranges and exists so
//! the table can be checked against it.

mod general;
mod table;

pub use general::classify_general;
pub use table::{classify, classify_index};

/// How a value of one primitive category converts to another.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    Identity,
    ImplicitNumeric,
    ExplicitNumeric,
    ImplicitNullable,
    ExplicitNullable,
    ImplicitReference,
    ExplicitReference,
    Boxing,
    Unboxing,
    NoConversion,
}

impl ConversionKind {
    /// True for conversions the language applies without a cast.
    pub const fn is_implicit(self) -> bool {
        matches!(
            self,
            ConversionKind::Identity
                | ConversionKind::ImplicitNumeric
                | ConversionKind::ImplicitNullable
                | ConversionKind::ImplicitReference
                | ConversionKind::Boxing
        )
    }

    pub const fn is_explicit(self) -> bool {
        matches!(
            self,
            ConversionKind::ExplicitNumeric
                | ConversionKind::ExplicitNullable
                | ConversionKind::ExplicitReference
                | ConversionKind::Unboxing
        )
    }

    pub const fn exists(self) -> bool {
        !matches!(self, ConversionKind::NoConversion)
    }
}
