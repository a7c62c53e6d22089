//! Instruction word decoder.
//!
//! An instruction word packs two things into its decimal digits: the opcode
//! in the low two digits, and one addressing-mode digit per parameter in the
//! remaining digits (hundreds digit = first parameter). Missing mode digits
//! default to positional.

use crate::cpu::Word;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameter addressing mode.
///
/// Controls how a raw parameter word is turned into an operand value or a
/// write-target address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamMode {
    /// The parameter is a memory address (mode digit 0).
    Positional,
    /// The parameter is the value itself (mode digit 1).
    Immediate,
    /// The parameter is an offset from the relative base (mode digit 2).
    Relative,
}

impl ParamMode {
    /// Create from a decimal mode digit.
    pub fn from_digit(digit: Word) -> Result<Self, DecodeError> {
        match digit {
            0 => Ok(ParamMode::Positional),
            1 => Ok(ParamMode::Immediate),
            2 => Ok(ParamMode::Relative),
            other => Err(DecodeError::UnrecognizedMode(other)),
        }
    }
}

/// The ten operations of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Write the sum of two inputs to the target (code 1).
    Add,
    /// Write the product of two inputs to the target (code 2).
    Multiply,
    /// Pull one value from the input channel, write it to the target (code 3).
    Input,
    /// Emit one input operand on the output channel (code 4).
    Output,
    /// If input 1 is non-zero, jump to input 2 (code 5).
    JumpIfTrue,
    /// If input 1 is zero, jump to input 2 (code 6).
    JumpIfFalse,
    /// Write 1 to the target if input 1 < input 2, else 0 (code 7).
    LessThan,
    /// Write 1 to the target if input 1 = input 2, else 0 (code 8).
    Equals,
    /// Add the single input to the relative base register (code 9).
    AdjustBase,
    /// Stop the machine (code 99).
    Halt,
}

/// Static description of one operation: how many words the instruction
/// occupies, how many of its parameters are inputs, and whether the last
/// parameter is a write target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpSpec {
    /// Total instruction length in words, opcode included.
    pub len: Word,
    /// Number of input operands.
    pub inputs: usize,
    /// Whether the final parameter is a write-target address.
    pub writes: bool,
    /// Human-readable name.
    pub mnemonic: &'static str,
}

impl Opcode {
    /// Look up an opcode from a raw instruction word.
    ///
    /// The opcode is the low two decimal digits of the word's absolute
    /// value; anything outside the ten defined codes is an
    /// [`DecodeError::UnknownOpcode`].
    pub fn from_word(word: Word) -> Result<Self, DecodeError> {
        // (word % 100).abs() == word.abs() % 100, without overflowing on MIN
        match (word % 100).abs() {
            1 => Ok(Opcode::Add),
            2 => Ok(Opcode::Multiply),
            3 => Ok(Opcode::Input),
            4 => Ok(Opcode::Output),
            5 => Ok(Opcode::JumpIfTrue),
            6 => Ok(Opcode::JumpIfFalse),
            7 => Ok(Opcode::LessThan),
            8 => Ok(Opcode::Equals),
            9 => Ok(Opcode::AdjustBase),
            99 => Ok(Opcode::Halt),
            code => Err(DecodeError::UnknownOpcode(code)),
        }
    }

    /// The catalog entry for this operation.
    pub const fn spec(self) -> OpSpec {
        match self {
            Opcode::Add => OpSpec { len: 4, inputs: 2, writes: true, mnemonic: "add" },
            Opcode::Multiply => OpSpec { len: 4, inputs: 2, writes: true, mnemonic: "multiply" },
            Opcode::Input => OpSpec { len: 2, inputs: 0, writes: true, mnemonic: "input" },
            Opcode::Output => OpSpec { len: 2, inputs: 1, writes: false, mnemonic: "output" },
            Opcode::JumpIfTrue => OpSpec { len: 3, inputs: 2, writes: false, mnemonic: "jump-if-true" },
            Opcode::JumpIfFalse => OpSpec { len: 3, inputs: 2, writes: false, mnemonic: "jump-if-false" },
            Opcode::LessThan => OpSpec { len: 4, inputs: 2, writes: true, mnemonic: "less-than" },
            Opcode::Equals => OpSpec { len: 4, inputs: 2, writes: true, mnemonic: "equals" },
            Opcode::AdjustBase => OpSpec { len: 2, inputs: 1, writes: false, mnemonic: "adjust-relative-base" },
            Opcode::Halt => OpSpec { len: 1, inputs: 0, writes: false, mnemonic: "halt" },
        }
    }

    /// Human-readable name of the operation.
    pub const fn mnemonic(self) -> &'static str {
        self.spec().mnemonic
    }
}

/// A decoded instruction word: the operation plus one addressing mode per
/// parameter, in parameter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub opcode: Opcode,
    pub modes: Vec<ParamMode>,
}

/// Decode a raw instruction word.
///
/// Mode digits are read from the low end upward: the hundreds digit is the
/// first parameter's mode, the thousands digit the second's, and so on.
/// Parameters without a digit get positional mode. The word's sign carries
/// no meaning; the absolute value is decoded.
pub fn decode(word: Word) -> Result<Decoded, DecodeError> {
    let opcode = Opcode::from_word(word)?;
    let params = (opcode.spec().len - 1) as usize;

    let mut modes = vec![ParamMode::Positional; params];
    let mut digits = (word / 100).abs();
    for slot in modes.iter_mut() {
        if digits == 0 {
            break;
        }
        *slot = ParamMode::from_digit(digits % 10)?;
        digits /= 10;
    }

    Ok(Decoded { opcode, modes })
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(Word),

    #[error("unrecognized parameter mode {0}")]
    UnrecognizedMode(Word),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_bare_add() {
        let decoded = decode(1).unwrap();

        assert_eq!(decoded.opcode, Opcode::Add);
        assert_eq!(
            decoded.modes,
            vec![ParamMode::Positional, ParamMode::Positional, ParamMode::Positional]
        );
    }

    #[test]
    fn test_decode_multiply_with_mode_digits() {
        // 1002: opcode 02, mode digits 10 -> modes [0, 1, 0]
        let decoded = decode(1002).unwrap();

        assert_eq!(decoded.opcode, Opcode::Multiply);
        assert_eq!(
            decoded.modes,
            vec![ParamMode::Positional, ParamMode::Immediate, ParamMode::Positional]
        );
    }

    #[test]
    fn test_decode_relative_output() {
        let decoded = decode(204).unwrap();

        assert_eq!(decoded.opcode, Opcode::Output);
        assert_eq!(decoded.modes, vec![ParamMode::Relative]);
    }

    #[test]
    fn test_decode_ignores_sign() {
        let decoded = decode(-1002).unwrap();

        assert_eq!(decoded.opcode, Opcode::Multiply);
        assert_eq!(
            decoded.modes,
            vec![ParamMode::Positional, ParamMode::Immediate, ParamMode::Positional]
        );
    }

    #[test]
    fn test_decode_halt() {
        let decoded = decode(99).unwrap();

        assert_eq!(decoded.opcode, Opcode::Halt);
        assert!(decoded.modes.is_empty());
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(decode(98), Err(DecodeError::UnknownOpcode(98)));
        assert_eq!(decode(0), Err(DecodeError::UnknownOpcode(0)));
        assert_eq!(decode(1234567), Err(DecodeError::UnknownOpcode(67)));
    }

    #[test]
    fn test_unrecognized_mode_digit() {
        // 302: opcode 02, first parameter mode digit 3
        assert_eq!(decode(302), Err(DecodeError::UnrecognizedMode(3)));
    }

    #[test]
    fn test_catalog_lengths() {
        let table = [
            (Opcode::Add, 4, 2),
            (Opcode::Multiply, 4, 2),
            (Opcode::Input, 2, 0),
            (Opcode::Output, 2, 1),
            (Opcode::JumpIfTrue, 3, 2),
            (Opcode::JumpIfFalse, 3, 2),
            (Opcode::LessThan, 4, 2),
            (Opcode::Equals, 4, 2),
            (Opcode::AdjustBase, 2, 1),
            (Opcode::Halt, 1, 0),
        ];

        for (op, len, inputs) in table {
            assert_eq!(op.spec().len, len, "{}", op.mnemonic());
            assert_eq!(op.spec().inputs, inputs, "{}", op.mnemonic());
        }
    }

    #[test]
    fn test_writes_flag_matches_catalog() {
        // Exactly the five writing operations carry a target parameter
        for op in [
            Opcode::Add,
            Opcode::Multiply,
            Opcode::Input,
            Opcode::LessThan,
            Opcode::Equals,
        ] {
            assert!(op.spec().writes, "{}", op.mnemonic());
        }
        for op in [
            Opcode::Output,
            Opcode::JumpIfTrue,
            Opcode::JumpIfFalse,
            Opcode::AdjustBase,
            Opcode::Halt,
        ] {
            assert!(!op.spec().writes, "{}", op.mnemonic());
        }
    }

    proptest! {
        #[test]
        fn prop_decode_never_panics(word: Word) {
            let _ = decode(word);
        }

        #[test]
        fn prop_decoded_mode_count_matches_catalog(word: Word) {
            if let Ok(decoded) = decode(word) {
                let spec = decoded.opcode.spec();
                prop_assert_eq!(decoded.modes.len() as Word, spec.len - 1);
                prop_assert!(spec.inputs as Word <= spec.len - 1);
            }
        }
    }
}
