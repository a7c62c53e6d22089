//! # wordvm
//!
//! An emulator for a word-code virtual machine: programs are flat
//! sequences of signed integers in which each word is an opcode, a
//! parameter, or raw data. The machine offers a ten-operation instruction
//! set (arithmetic, conditional branching, comparison, relative
//! addressing, interactive I/O, halt) over a sparse, effectively
//! unbounded memory.

pub mod cpu;
pub mod program;

// Re-export commonly used types
pub use cpu::{
    decode, Bus, BusError, DecodeError, Decoded, Diagnostic, Fault, Instr, Machine, Memory,
    MemoryError, OpSpec, Opcode, ParamMode, Registers, ResolveError, RunState, ScriptedBus,
    StdioBus, Word,
};
pub use program::{disassemble, disassemble_instruction, load_image, parse_image, ImageError};
