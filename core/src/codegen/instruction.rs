//! Stack-machine instruction set.
//!
//! Branch operands are instruction indices once a method is finished; while
//! emitting they hold placeholders that are patched when labels are placed.

use serde::{Deserialize, Serialize};

use super::tokens::Token;

/// Pop and push counts of a call site.
///
/// Calls compute `delta = pushes - receiver - args`; carrying the shape in the
/// instruction lets the verifier work without the symbol table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallShape {
    pub args: u16,
    pub has_this: bool,
    pub returns: bool,
}

impl CallShape {
    pub fn pops(self) -> u32 {
        self.args as u32 + self.has_this as u32
    }

    pub fn pushes(self) -> u32 {
        self.returns as u32
    }

    pub fn delta(self) -> i32 {
        self.pushes() as i32 - self.pops() as i32
    }
}

/// Target width of a numeric conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericTarget {
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    I,
    U,
    R4,
    R8,
    /// Unsigned integer to floating point, before `R4`/`R8`.
    RUn,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    Nop,
    Pop,
    Dup,

    // === Constants ===
    LoadNull,
    LoadInt32(i32),
    LoadInt64(i64),
    /// Bit pattern of an `f32`.
    LoadFloat32(u32),
    /// Bit pattern of an `f64`.
    LoadFloat64(u64),
    LoadString(Token),
    /// Pushes the address of a data blob.
    LoadDataAddress(Token),
    /// Pushes a runtime handle for a field, type or data blob.
    LoadToken(Token),

    // === Locals and arguments ===
    LoadLocal(u16),
    StoreLocal(u16),
    LoadLocalAddress(u16),
    LoadArg(u16),
    StoreArg(u16),
    LoadArgAddress(u16),

    // === Fields ===
    LoadField(Token),
    StoreField(Token),
    LoadFieldAddress(Token),
    LoadStaticField(Token),
    StoreStaticField(Token),
    LoadStaticFieldAddress(Token),

    // === Arithmetic and bitwise ===
    Add,
    Sub,
    Mul,
    Div,
    DivUnsigned,
    Rem,
    RemUnsigned,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    ShrUnsigned,
    Neg,
    Not,

    // === Comparison ===
    CompareEqual,
    CompareGreater,
    CompareGreaterUnsigned,
    CompareLess,
    CompareLessUnsigned,

    // === Conversions ===
    Convert(NumericTarget),
    Box(Token),
    UnboxAny(Token),
    CastClass(Token),

    // === Objects and calls ===
    NewObject(Token, CallShape),
    Call(Token, CallShape),
    CallVirtual(Token, CallShape),
    /// Zero-initializes the value type at the address on the stack.
    InitObject(Token),

    // === Arrays ===
    NewArray(Token),
    LoadLength,
    LoadElement(Token),
    StoreElement(Token),
    LoadElementAddress(Token),

    // === Control flow ===
    Branch(u32),
    BranchTrue(u32),
    BranchFalse(u32),
    Switch(Vec<u32>),
    /// Exits a protected region, emptying the stack.
    Leave(u32),
    EndFinally,
    Throw,
    Rethrow,
    Return,
}

/// Values an instruction pops and pushes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StackEffect {
    pub pops: u32,
    pub pushes: u32,
}

impl StackEffect {
    const fn new(pops: u32, pushes: u32) -> Self {
        Self { pops, pushes }
    }
}

impl Instruction {
    /// Stack effect, except for `Return`, whose pop count depends on the
    /// method signature and is checked by the caller.
    pub fn stack_effect(&self) -> StackEffect {
        use Instruction::*;
        match self {
            Nop | Branch(_) | Leave(_) | EndFinally | Rethrow | Return => StackEffect::new(0, 0),
            Pop | StoreLocal(_) | StoreArg(_) | StoreStaticField(_) | BranchTrue(_) | BranchFalse(_)
            | Switch(_) | Throw => StackEffect::new(1, 0),
            Dup => StackEffect::new(1, 2),
            LoadNull
            | LoadInt32(_)
            | LoadInt64(_)
            | LoadFloat32(_)
            | LoadFloat64(_)
            | LoadString(_)
            | LoadDataAddress(_)
            | LoadToken(_)
            | LoadLocal(_)
            | LoadLocalAddress(_)
            | LoadArg(_)
            | LoadArgAddress(_)
            | LoadStaticField(_)
            | LoadStaticFieldAddress(_) => StackEffect::new(0, 1),
            LoadField(_)
            | LoadFieldAddress(_)
            | Neg
            | Not
            | Convert(_)
            | Box(_)
            | UnboxAny(_)
            | CastClass(_)
            | NewArray(_)
            | LoadLength => StackEffect::new(1, 1),
            StoreField(_) => StackEffect::new(2, 0),
            InitObject(_) => StackEffect::new(1, 0),
            Add
            | Sub
            | Mul
            | Div
            | DivUnsigned
            | Rem
            | RemUnsigned
            | And
            | Or
            | Xor
            | Shl
            | Shr
            | ShrUnsigned
            | CompareEqual
            | CompareGreater
            | CompareGreaterUnsigned
            | CompareLess
            | CompareLessUnsigned
            | LoadElement(_)
            | LoadElementAddress(_) => StackEffect::new(2, 1),
            StoreElement(_) => StackEffect::new(3, 0),
            NewObject(_, shape) => StackEffect::new(shape.args as u32, 1),
            Call(_, shape) | CallVirtual(_, shape) => StackEffect::new(shape.pops(), shape.pushes()),
        }
    }

    /// Control never reaches the next instruction.
    pub fn ends_block(&self) -> bool {
        matches!(
            self,
            Instruction::Branch(_)
                | Instruction::Leave(_)
                | Instruction::EndFinally
                | Instruction::Throw
                | Instruction::Rethrow
                | Instruction::Return
        )
    }

    /// Branch targets, for instructions that have them.
    pub fn targets(&self) -> &[u32] {
        match self {
            Instruction::Branch(target)
            | Instruction::BranchTrue(target)
            | Instruction::BranchFalse(target)
            | Instruction::Leave(target) => core::slice::from_ref(target),
            Instruction::Switch(targets) => targets,
            _ => &[],
        }
    }

    pub fn targets_mut(&mut self) -> &mut [u32] {
        match self {
            Instruction::Branch(target)
            | Instruction::BranchTrue(target)
            | Instruction::BranchFalse(target)
            | Instruction::Leave(target) => core::slice::from_mut(target),
            Instruction::Switch(targets) => targets,
            _ => &mut [],
        }
    }

    pub fn token(&self) -> Option<Token> {
        use Instruction::*;
        match *self {
            LoadString(token)
            | LoadDataAddress(token)
            | LoadToken(token)
            | LoadField(token)
            | StoreField(token)
            | LoadFieldAddress(token)
            | LoadStaticField(token)
            | StoreStaticField(token)
            | LoadStaticFieldAddress(token)
            | Box(token)
            | UnboxAny(token)
            | CastClass(token)
            | NewObject(token, _)
            | Call(token, _)
            | CallVirtual(token, _)
            | InitObject(token)
            | NewArray(token)
            | LoadElement(token)
            | StoreElement(token)
            | LoadElementAddress(token) => Some(token),
            _ => None,
        }
    }

    pub fn token_mut(&mut self) -> Option<&mut Token> {
        use Instruction::*;
        match self {
            LoadString(token)
            | LoadDataAddress(token)
            | LoadToken(token)
            | LoadField(token)
            | StoreField(token)
            | LoadFieldAddress(token)
            | LoadStaticField(token)
            | StoreStaticField(token)
            | LoadStaticFieldAddress(token)
            | Box(token)
            | UnboxAny(token)
            | CastClass(token)
            | NewObject(token, _)
            | Call(token, _)
            | CallVirtual(token, _)
            | InitObject(token)
            | NewArray(token)
            | LoadElement(token)
            | StoreElement(token)
            | LoadElementAddress(token) => Some(token),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec;

    #[test]
    fn test_call_delta() {
        let shape = CallShape {
            args: 2,
            has_this: true,
            returns: true,
        };
        assert_eq!(shape.delta(), -2);
        let static_void = CallShape {
            args: 0,
            has_this: false,
            returns: false,
        };
        assert_eq!(static_void.delta(), 0);
    }

    #[test]
    fn test_switch_targets_are_visible() {
        let mut switch = Instruction::Switch(vec![3, 7]);
        assert_eq!(switch.targets(), &[3, 7]);
        switch.targets_mut()[1] = 9;
        assert_eq!(switch, Instruction::Switch(vec![3, 9]));
        assert!(!switch.ends_block());
        assert!(Instruction::Leave(0).ends_block());
    }
}
