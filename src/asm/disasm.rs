//! Disassembler for CHIP-8 programs.
//!
//! Converts big-endian instruction words back to readable assembly, using
//! the conventional mnemonics the assembler also accepts.

use crate::cpu::decode::{decode, Instruction};
use crate::cpu::memory::PROGRAM_ADDR;

/// Disassemble a single instruction word to text.
pub fn disassemble_instruction(word: u16) -> String {
    format_instruction(&decode(word))
}

/// Disassemble a program image loaded at 0x200.
///
/// A trailing odd byte is listed as data.
pub fn disassemble(program: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; CHIP-8 Disassembly\n");
    output.push_str("; ------------------\n\n");

    for (i, chunk) in program.chunks(2).enumerate() {
        let addr = PROGRAM_ADDR as usize + i * 2;
        match chunk {
            [hi, lo] => {
                let word = u16::from_be_bytes([*hi, *lo]);
                let line = disassemble_instruction(word);
                output.push_str(&format!("{:03X}: {:04X}  {}\n", addr, word, line));
            }
            [byte] => {
                output.push_str(&format!("{:03X}: {:02X}    DB 0x{:02X}\n", addr, byte, byte));
            }
            _ => {}
        }
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        // System
        Instruction::Cls => "CLS".to_string(),
        Instruction::Ret => "RET".to_string(),
        Instruction::Sys { addr } => format!("SYS 0x{:03X}", addr),

        // Control
        Instruction::Jump { addr } => format!("JP 0x{:03X}", addr),
        Instruction::Call { addr } => format!("CALL 0x{:03X}", addr),
        Instruction::JumpOffset { addr } => format!("JP V0, 0x{:03X}", addr),
        Instruction::SkipEqImm { x, nn } => format!("SE V{:X}, 0x{:02X}", x, nn),
        Instruction::SkipNeImm { x, nn } => format!("SNE V{:X}, 0x{:02X}", x, nn),
        Instruction::SkipEqReg { x, y } => format!("SE V{:X}, V{:X}", x, y),
        Instruction::SkipNeReg { x, y } => format!("SNE V{:X}, V{:X}", x, y),

        // Immediate
        Instruction::LoadImm { x, nn } => format!("LD V{:X}, 0x{:02X}", x, nn),
        Instruction::AddImm { x, nn } => format!("ADD V{:X}, 0x{:02X}", x, nn),

        // ALU
        Instruction::Move { x, y } => format!("LD V{:X}, V{:X}", x, y),
        Instruction::Or { x, y } => format!("OR V{:X}, V{:X}", x, y),
        Instruction::And { x, y } => format!("AND V{:X}, V{:X}", x, y),
        Instruction::Xor { x, y } => format!("XOR V{:X}, V{:X}", x, y),
        Instruction::Add { x, y } => format!("ADD V{:X}, V{:X}", x, y),
        Instruction::Sub { x, y } => format!("SUB V{:X}, V{:X}", x, y),
        Instruction::Shr { x, y } => format!("SHR V{:X}, V{:X}", x, y),
        Instruction::SubN { x, y } => format!("SUBN V{:X}, V{:X}", x, y),
        Instruction::Shl { x, y } => format!("SHL V{:X}, V{:X}", x, y),

        // Index, random, display
        Instruction::LoadIndex { addr } => format!("LD I, 0x{:03X}", addr),
        Instruction::Random { x, nn } => format!("RND V{:X}, 0x{:02X}", x, nn),
        Instruction::Draw { x, y, n } => format!("DRW V{:X}, V{:X}, {}", x, y, n),

        // Keys
        Instruction::SkipKey { x } => format!("SKP V{:X}", x),
        Instruction::SkipNotKey { x } => format!("SKNP V{:X}", x),

        // Timers and misc
        Instruction::LoadDelay { x } => format!("LD V{:X}, DT", x),
        Instruction::WaitKey { x } => format!("LD V{:X}, K", x),
        Instruction::SetDelay { x } => format!("LD DT, V{:X}", x),
        Instruction::SetSound { x } => format!("LD ST, V{:X}", x),
        Instruction::AddIndex { x } => format!("ADD I, V{:X}", x),
        Instruction::LoadFont { x } => format!("LD F, V{:X}", x),
        Instruction::StoreBcd { x } => format!("LD B, V{:X}", x),
        Instruction::StoreRegs { x } => format!("LD [I], V{:X}", x),
        Instruction::LoadRegs { x } => format!("LD V{:X}, [I]", x),

        Instruction::Unknown(word) => format!("DW 0x{:04X}", word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassemble_cls() {
        assert_eq!(disassemble_instruction(0x00E0), "CLS");
    }

    #[test]
    fn test_disassemble_operands() {
        assert_eq!(disassemble_instruction(0x6A05), "LD VA, 0x05");
        assert_eq!(disassemble_instruction(0xD125), "DRW V1, V2, 5");
        assert_eq!(disassemble_instruction(0xF30A), "LD V3, K");
        assert_eq!(disassemble_instruction(0xB310), "JP V0, 0x310");
    }

    #[test]
    fn test_disassemble_unknown_as_data() {
        assert_eq!(disassemble_instruction(0x5121), "DW 0x5121");
    }

    #[test]
    fn test_disassemble_listing() {
        let listing = disassemble(&[0x12, 0x00, 0xFF]);
        assert!(listing.contains("200: 1200  JP 0x200"));
        assert!(listing.contains("202: FF    DB 0xFF"));
    }
}
