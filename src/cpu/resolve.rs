//! Operand resolution.
//!
//! Turns the raw parameter words of a fetched instruction into input
//! operand values and, for writing instructions, the target address.
//! Resolution is a pure function of (parameter words, modes, memory,
//! relative base); uninitialized reads are reported as notes alongside
//! the result rather than through a side effect.

use crate::cpu::decode::{Decoded, ParamMode};
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::{Diagnostic, Word};
use thiserror::Error;

/// The resolved operands of one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operands {
    /// One value per input operand, in parameter order.
    pub inputs: Vec<Word>,
    /// The write-target address, for instructions that store a result.
    pub target: Option<Word>,
    /// Diagnostics gathered during resolution.
    pub notes: Vec<Diagnostic>,
}

/// Resolve the operands of a decoded instruction.
///
/// `params` are the raw words following the opcode word, one per
/// parameter. Input operands become values; the final parameter of a
/// writing instruction becomes an address and is never dereferenced here.
pub fn resolve(
    params: &[Word],
    decoded: &Decoded,
    mem: &Memory,
    relative_base: Word,
) -> Result<Operands, ResolveError> {
    let spec = decoded.opcode.spec();
    let mut notes = Vec::new();
    let mut inputs = Vec::with_capacity(spec.inputs);

    for i in 0..spec.inputs {
        let raw = params[i];
        let value = match decoded.modes[i] {
            ParamMode::Immediate => raw,
            ParamMode::Positional => read_noted(mem, raw, &mut notes)?,
            ParamMode::Relative => read_noted(mem, relative_base + raw, &mut notes)?,
        };
        inputs.push(value);
    }

    let target = if spec.writes {
        let raw = params[params.len() - 1];
        let addr = match decoded.modes[decoded.modes.len() - 1] {
            ParamMode::Positional => raw,
            ParamMode::Relative => relative_base + raw,
            ParamMode::Immediate => return Err(ResolveError::ImmediateTarget(raw)),
        };
        Some(addr)
    } else {
        None
    };

    Ok(Operands { inputs, target, notes })
}

fn read_noted(mem: &Memory, addr: Word, notes: &mut Vec<Diagnostic>) -> Result<Word, MemoryError> {
    if addr >= 0 && !mem.is_set(addr) {
        notes.push(Diagnostic::UninitializedRead(addr));
    }
    mem.read(addr)
}

/// Errors that can occur during operand resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// Immediate mode names no address, so it cannot describe a write target.
    #[error("immediate mode on the write target (raw word {0})")]
    ImmediateTarget(Word),
}
