//! Assembler and disassembler for CHIP-8 programs.
//!
//! This module provides:
//! - A simple two-pass assembler (text → program image)
//! - A disassembler (program image → readable text)
//! - Loading and saving of raw ROM images

pub mod assembler;
pub mod disasm;
pub mod rom;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_instruction};
pub use rom::{load_rom, save_rom, RomError};
