//! Program image handling: loading comma-separated images from disk and
//! rendering them back as readable word-code.

pub mod disasm;
pub mod image;

pub use disasm::{disassemble, disassemble_instruction};
pub use image::{load_image, parse_image, ImageError};
