use super::{FieldId, MethodId, TypeId};

/// Runtime members the back end emits references to on its own initiative.
///
/// The host registers them, usually through
/// [`declare_core_library`](super::declare_core_library). Lowering a construct
/// that needs an unregistered member fails with
/// [`CompileError::MissingWellKnownMember`](crate::CompileError::MissingWellKnownMember).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WellKnownMember {
    /// `object..ctor()`, chained from synthesized constructors.
    ObjectCtor,
    /// Root exception type caught by async bodies.
    Exception,
    /// `InitializeArray(array, field handle)`.
    InitializeArray,
    /// `ReadOnlySpan<byte>..ctor(pointer, length)`.
    ByteSpanFromPointer,
    /// `decimal..ctor(lo, mid, hi, negative, scale)`.
    DecimalCtor,
    DecimalFromInt64,
    DecimalFromUInt64,
    DecimalFromDouble,
    DecimalToInt64,
    DecimalToUInt64,
    DecimalToDouble,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    Type(TypeId),
    Method(MethodId),
    Field(FieldId),
}
