use pretty_assertions::assert_eq;

use super::*;
use crate::codegen::tokens::{Token, TokenTag};
use crate::vec;

use Instruction as I;

#[test]
fn test_straight_line_max_height() {
    let code = [I::LoadInt32(1), I::LoadInt32(2), I::Add, I::Return];
    assert_eq!(verify(&code, &[], true), Ok(2));
}

#[test]
fn test_underflow_is_reported_at_offset() {
    let code = [I::LoadInt32(1), I::Add, I::Return];
    assert_eq!(verify(&code, &[], true), Err(CompileError::StackUnderflow { offset: 1 }));
}

#[test]
fn test_join_with_different_heights_is_rejected() {
    // One path reaches 3 with an extra value on the stack.
    let code = [
        I::LoadInt32(0),
        I::BranchTrue(3),
        I::LoadInt32(7),
        I::Return,
    ];
    assert_eq!(
        verify(&code, &[], false),
        Err(CompileError::StackImbalance {
            offset: 3,
            expected: 0,
            actual: 1,
        })
    );
}

#[test]
fn test_return_height_must_match_signature() {
    let code = [I::LoadInt32(1), I::Return];
    assert_eq!(
        verify(&code, &[], false),
        Err(CompileError::StackImbalance {
            offset: 1,
            expected: 0,
            actual: 1,
        })
    );
}

#[test]
fn test_catch_handler_starts_with_exception() {
    let exception = Token::new(TokenTag::TypeDef, 1);
    let code = [
        I::Nop,
        I::Leave(4),
        I::Pop,
        I::Leave(4),
        I::Return,
    ];
    let regions = [ExceptionRegion {
        kind: RegionKind::Catch(exception),
        try_start: 0,
        try_end: 2,
        handler_start: 2,
        handler_end: 4,
    }];
    assert_eq!(verify(&code, &regions, false), Ok(1));
}

#[test]
fn test_leave_empties_the_stack() {
    let code = [I::LoadInt32(1), I::Leave(2), I::Return];
    assert_eq!(verify(&code, &[], false), Ok(1));
}

#[test]
fn test_falling_off_the_end_is_rejected() {
    let code = [I::Nop];
    assert!(matches!(verify(&code, &[], false), Err(CompileError::UnsupportedOperand(_))));
}

#[test]
fn test_branch_out_of_range_is_rejected() {
    let code = vec![I::Branch(9)];
    assert_eq!(verify(&code, &[], false), Err(CompileError::UndefinedLabel(9)));
}

#[test]
fn test_unreachable_code_is_ignored() {
    // The `Add` after the return would underflow if it were reachable.
    let code = [I::Return, I::Add, I::Return];
    assert_eq!(verify(&code, &[], false), Ok(0));
}
