//! The word machine core.
//!
//! This module implements the complete fetch-decode-execute engine:
//! - sparse, unbounded word memory
//! - 2 registers: instruction pointer and relative base
//! - ten-operation instruction set with three addressing modes
//! - an injectable I/O boundary for the input/output operations

pub mod bus;
pub mod decode;
pub mod execute;
pub mod memory;
pub mod registers;
pub mod resolve;

pub use bus::{Bus, BusError, ScriptedBus, StdioBus};
pub use decode::{decode, DecodeError, Decoded, OpSpec, Opcode, ParamMode};
pub use execute::{Fault, Instr, Machine, RunState};
pub use memory::{Memory, MemoryError};
pub use registers::Registers;
pub use resolve::{resolve, Operands, ResolveError};

use serde::{Deserialize, Serialize};

/// One machine word: the unit of memory and of instruction encoding.
pub type Word = i64;

/// Non-fatal observations emitted while the machine runs.
///
/// Diagnostics are a side channel: they never alter control flow or
/// computed results. The engine buffers them; callers inspect or drain
/// them as they see fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// A never-written address was read (it returned 0).
    UninitializedRead(Word),
    /// The relative base register went negative after an adjustment.
    NegativeRelativeBase(Word),
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UninitializedRead(addr) => {
                write!(f, "read of unset address {addr}")
            }
            Diagnostic::NegativeRelativeBase(base) => {
                write!(f, "relative base went negative: {base}")
            }
        }
    }
}
