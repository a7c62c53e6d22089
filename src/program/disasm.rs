//! Disassembler for word-code images.
//!
//! Renders instruction words back to readable mnemonics with their
//! operands annotated by addressing mode.

use crate::cpu::decode::{decode, Decoded, ParamMode};
use crate::cpu::Word;

/// Disassemble one fetched instruction (opcode word plus parameters).
///
/// A word that does not decode, or that is missing parameter words, is
/// rendered as data.
pub fn disassemble_instruction(words: &[Word]) -> String {
    let Some(&opcode_word) = words.first() else {
        return String::new();
    };

    match decode(opcode_word) {
        Ok(decoded) if words.len() >= decoded.opcode.spec().len as usize => {
            format_instruction(&decoded, &words[1..])
        }
        _ => format!("dat {opcode_word}"),
    }
}

/// Disassemble a whole image.
///
/// Walks from address 0, consuming whole instructions where the words
/// decode and single data words where they do not.
pub fn disassemble(image: &[Word]) -> String {
    let mut output = String::new();
    let mut addr = 0usize;

    while addr < image.len() {
        let len = match decode(image[addr]) {
            Ok(decoded) => {
                let len = decoded.opcode.spec().len as usize;
                if addr + len <= image.len() {
                    len
                } else {
                    1
                }
            }
            Err(_) => 1,
        };

        let line = disassemble_instruction(&image[addr..addr + len]);
        output.push_str(&format!("{:>4}: {}\n", addr, line));
        addr += len;
    }

    output
}

fn format_instruction(decoded: &Decoded, params: &[Word]) -> String {
    let spec = decoded.opcode.spec();
    let mut line = spec.mnemonic.to_string();

    for (i, &raw) in params.iter().take(spec.len as usize - 1).enumerate() {
        line.push(if i == 0 { ' ' } else { ',' });
        if i > 0 {
            line.push(' ');
        }
        line.push_str(&format_operand(raw, decoded.modes[i]));
    }

    line
}

/// Format one operand: `#n` immediate, `[n]` positional, `[rb+n]` relative.
fn format_operand(raw: Word, mode: ParamMode) -> String {
    match mode {
        ParamMode::Immediate => format!("#{raw}"),
        ParamMode::Positional => format!("[{raw}]"),
        ParamMode::Relative if raw < 0 => format!("[rb-{}]", -raw),
        ParamMode::Relative => format!("[rb+{raw}]"),
    }
}
