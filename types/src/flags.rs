use bitflags::bitflags;

bitflags! {
    /// Static properties of a primitive category.
    ///
    /// Flags are fixed per [`PrimitiveKind`](crate::PrimitiveKind) and never
    /// depend on nullability; ask the wrapped kind for those.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct PrimFlags: u8 {
        /// Values are heap references (`object`, `string`).
        const REFERENCE = 1;
        /// Whole-number representation, including `char`.
        const INTEGRAL = 1 << 1;
        /// Two's complement or sign-magnitude signed representation.
        const SIGNED = 1 << 2;
        /// IEEE 754 binary floating point.
        const FLOATING = 1 << 3;
        /// Participates in arithmetic operators.
        const NUMERIC = 1 << 4;
        /// Fixed width, copyable byte-for-byte into a data blob.
        const BLITTABLE = 1 << 5;
    }
}
