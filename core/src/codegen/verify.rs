//! Stack-height verification of an emitted body.
//!
//! Independent of the emitter's own bookkeeping: walks every reachable
//! instruction from the entry point and from each handler, and requires that
//! all paths into an instruction agree on the stack height.

use super::instruction::Instruction;
use super::{ExceptionRegion, RegionKind};
use crate::error::CompileError;
use crate::{String, Vec, vec};

/// Checks `instructions` and returns the maximum stack height.
pub fn verify(
    instructions: &[Instruction],
    regions: &[ExceptionRegion],
    returns_value: bool,
) -> Result<u32, CompileError> {
    let mut state = Flow {
        heights: vec![None; instructions.len()],
        worklist: Vec::new(),
        max: 0,
    };
    if instructions.is_empty() {
        return Err(CompileError::UnsupportedOperand(String::from("empty method body")));
    }

    state.enter(0, 0)?;
    for region in regions {
        // A catch handler starts with the exception on the stack.
        let depth = match region.kind {
            RegionKind::Catch(_) => 1,
            RegionKind::Finally => 0,
        };
        state.enter(region.handler_start as usize, depth)?;
    }

    while let Some(pc) = state.worklist.pop() {
        let depth = state.heights[pc].unwrap_or(0);
        let instruction = &instructions[pc];
        match instruction {
            Instruction::Return => {
                let expected = returns_value as u32;
                if depth != expected {
                    return Err(CompileError::StackImbalance {
                        offset: pc,
                        expected,
                        actual: depth,
                    });
                }
                continue;
            }
            // `leave` empties the stack.
            Instruction::Leave(target) => {
                state.enter(*target as usize, 0)?;
                continue;
            }
            _ => {}
        }

        let effect = instruction.stack_effect();
        if depth < effect.pops {
            return Err(CompileError::StackUnderflow { offset: pc });
        }
        let after = depth - effect.pops + effect.pushes;
        state.max = state.max.max(after);

        for target in instruction.targets() {
            state.enter(*target as usize, after)?;
        }
        if !instruction.ends_block() {
            if pc + 1 == instructions.len() {
                return Err(CompileError::UnsupportedOperand(String::from(
                    "control falls off the end of the method body",
                )));
            }
            state.enter(pc + 1, after)?;
        }
    }
    Ok(state.max)
}

struct Flow {
    heights: Vec<Option<u32>>,
    worklist: Vec<usize>,
    max: u32,
}

impl Flow {
    fn enter(&mut self, at: usize, depth: u32) -> Result<(), CompileError> {
        let Some(slot) = self.heights.get_mut(at) else {
            return Err(CompileError::UndefinedLabel(at as u32));
        };
        match *slot {
            None => {
                *slot = Some(depth);
                self.max = self.max.max(depth);
                self.worklist.push(at);
            }
            Some(expected) if expected != depth => {
                return Err(CompileError::StackImbalance {
                    offset: at,
                    expected,
                    actual: depth,
                });
            }
            Some(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "verify_test.rs"]
mod verify_test;
