//! Simple assembler for CHIP-8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! start:              ; Define a label
//!     LD V0, 0x0A     ; VX = byte
//!     LD I, sprite    ; Labels resolve to absolute addresses
//!     DRW V0, V1, 5
//!     JP start
//! sprite:
//!     DB 0xF0, 0x90, 0b11110000
//!     DW 0x1234
//! ```
//!
//! Mnemonics follow the disassembler's output, so a disassembled
//! instruction assembles back to the same word.

use crate::cpu::decode::{encode, Instruction};
use crate::cpu::memory::{MAX_PROGRAM_SIZE, PROGRAM_ADDR};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a program image for 0x200.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// Which part of the output a label reference patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fixup {
    /// Low 12 bits of an instruction word.
    Address,
    /// A whole data word.
    Word,
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> address).
    symbols: HashMap<String, u16>,
    /// Pending references: (output offset, label, kind, source line).
    pending: Vec<(usize, String, Fixup, usize)>,
    /// Output bytes.
    output: Vec<u8>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: resolve forward references
        self.resolve_references()?;

        if self.output.len() > MAX_PROGRAM_SIZE {
            return Err(AssemblerError::ProgramTooLarge { size: self.output.len() });
        }

        Ok(std::mem::take(&mut self.output))
    }

    fn current_addr(&self) -> u16 {
        PROGRAM_ADDR.wrapping_add(self.output.len() as u16)
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut line = line.trim();

        // Label definition
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if !is_identifier(&label) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label '{}'", label),
                });
            }
            if self.symbols.insert(label.clone(), self.current_addr()).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }
            line = line[colon_idx + 1..].trim();
        }

        if line.is_empty() {
            return Ok(());
        }

        let (mnemonic, rest) = match line.find(char::is_whitespace) {
            Some(idx) => (&line[..idx], line[idx..].trim()),
            None => (line, ""),
        };
        let mnemonic = mnemonic.to_uppercase();
        let operands: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };

        self.process_statement(&mnemonic, &operands, line_num)
    }

    fn process_statement(&mut self, mnemonic: &str, ops: &[&str], line_num: usize) -> Result<(), AssemblerError> {
        match mnemonic {
            // Directives
            "DB" => {
                if ops.is_empty() {
                    return Err(AssemblerError::SyntaxError { line: line_num, message: "DB requires values".into() });
                }
                for op in ops {
                    let value = parse_number(op, line_num)?;
                    self.output.push(check_range(value, 0xFF, line_num)? as u8);
                }
            }

            "DW" => {
                if ops.is_empty() {
                    return Err(AssemblerError::SyntaxError { line: line_num, message: "DW requires values".into() });
                }
                for op in ops {
                    let word = self.value(op, 0xFFFF, Fixup::Word, line_num)?;
                    self.emit(word);
                }
            }

            // Instructions
            _ => {
                let instr = self.parse_instruction(mnemonic, ops, line_num)?;
                self.emit(encode(&instr));
            }
        }

        Ok(())
    }

    fn parse_instruction(&mut self, mnemonic: &str, ops: &[&str], line_num: usize)
        -> Result<Instruction, AssemblerError>
    {
        let bad_operands = || AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid operands for {}: '{}'", mnemonic, ops.join(", ")),
        };

        let instr = match (mnemonic, ops) {
            // System
            ("CLS", []) => Instruction::Cls,
            ("RET", []) => Instruction::Ret,
            ("SYS", [addr]) => Instruction::Sys { addr: self.address(addr, line_num)? },

            // Control flow
            ("JP", [addr]) => Instruction::Jump { addr: self.address(addr, line_num)? },
            ("JP", [base, addr]) if base.eq_ignore_ascii_case("V0") => {
                Instruction::JumpOffset { addr: self.address(addr, line_num)? }
            }
            ("CALL", [addr]) => Instruction::Call { addr: self.address(addr, line_num)? },

            ("SE", [vx, rhs]) => {
                let x = register(vx).ok_or_else(bad_operands)?;
                match register(rhs) {
                    Some(y) => Instruction::SkipEqReg { x, y },
                    None => Instruction::SkipEqImm { x, nn: byte(rhs, line_num)? },
                }
            }
            ("SNE", [vx, rhs]) => {
                let x = register(vx).ok_or_else(bad_operands)?;
                match register(rhs) {
                    Some(y) => Instruction::SkipNeReg { x, y },
                    None => Instruction::SkipNeImm { x, nn: byte(rhs, line_num)? },
                }
            }

            // Loads
            ("LD", [dst, src]) => match (dst.to_uppercase().as_str(), src.to_uppercase().as_str()) {
                ("I", _) => Instruction::LoadIndex { addr: self.address(src, line_num)? },
                ("DT", _) => Instruction::SetDelay { x: register(src).ok_or_else(bad_operands)? },
                ("ST", _) => Instruction::SetSound { x: register(src).ok_or_else(bad_operands)? },
                ("F", _) => Instruction::LoadFont { x: register(src).ok_or_else(bad_operands)? },
                ("B", _) => Instruction::StoreBcd { x: register(src).ok_or_else(bad_operands)? },
                ("[I]", _) => Instruction::StoreRegs { x: register(src).ok_or_else(bad_operands)? },
                (_, source) => {
                    let x = register(dst).ok_or_else(bad_operands)?;
                    match source {
                        "DT" => Instruction::LoadDelay { x },
                        "K" => Instruction::WaitKey { x },
                        "[I]" => Instruction::LoadRegs { x },
                        _ => match register(src) {
                            Some(y) => Instruction::Move { x, y },
                            None => Instruction::LoadImm { x, nn: byte(src, line_num)? },
                        },
                    }
                }
            },

            // Arithmetic
            ("ADD", [dst, src]) if dst.eq_ignore_ascii_case("I") => {
                Instruction::AddIndex { x: register(src).ok_or_else(bad_operands)? }
            }
            ("ADD", [vx, rhs]) => {
                let x = register(vx).ok_or_else(bad_operands)?;
                match register(rhs) {
                    Some(y) => Instruction::Add { x, y },
                    None => Instruction::AddImm { x, nn: byte(rhs, line_num)? },
                }
            }
            ("OR" | "AND" | "XOR" | "SUB" | "SUBN", [vx, vy]) => {
                let x = register(vx).ok_or_else(bad_operands)?;
                let y = register(vy).ok_or_else(bad_operands)?;
                match mnemonic {
                    "OR" => Instruction::Or { x, y },
                    "AND" => Instruction::And { x, y },
                    "XOR" => Instruction::Xor { x, y },
                    "SUB" => Instruction::Sub { x, y },
                    _ => Instruction::SubN { x, y },
                }
            }

            // Shifts; a lone register shifts itself
            ("SHR" | "SHL", [vx, rest @ ..]) if rest.len() <= 1 => {
                let x = register(vx).ok_or_else(bad_operands)?;
                let y = match rest {
                    [vy] => register(vy).ok_or_else(bad_operands)?,
                    _ => x,
                };
                if mnemonic == "SHR" {
                    Instruction::Shr { x, y }
                } else {
                    Instruction::Shl { x, y }
                }
            }

            ("RND", [vx, nn]) => Instruction::Random {
                x: register(vx).ok_or_else(bad_operands)?,
                nn: byte(nn, line_num)?,
            },

            ("DRW", [vx, vy, n]) => Instruction::Draw {
                x: register(vx).ok_or_else(bad_operands)?,
                y: register(vy).ok_or_else(bad_operands)?,
                n: check_range(parse_number(n, line_num)?, 0xF, line_num)? as u8,
            },

            ("SKP", [vx]) => Instruction::SkipKey { x: register(vx).ok_or_else(bad_operands)? },
            ("SKNP", [vx]) => Instruction::SkipNotKey { x: register(vx).ok_or_else(bad_operands)? },

            (
                "CLS" | "RET" | "SYS" | "JP" | "CALL" | "SE" | "SNE" | "LD" | "ADD" | "OR" | "AND"
                | "XOR" | "SUB" | "SUBN" | "SHR" | "SHL" | "RND" | "DRW" | "SKP" | "SKNP",
                _,
            ) => return Err(bad_operands()),

            _ => return Err(AssemblerError::UnknownMnemonic {
                line: line_num,
                mnemonic: mnemonic.to_string(),
            }),
        };

        Ok(instr)
    }

    /// A 12-bit address: a number or a label.
    fn address(&mut self, operand: &str, line_num: usize) -> Result<u16, AssemblerError> {
        self.value(operand, 0x0FFF, Fixup::Address, line_num)
    }

    /// A number up to `max`, or a label to patch once all labels are known.
    fn value(&mut self, operand: &str, max: u32, fixup: Fixup, line_num: usize) -> Result<u16, AssemblerError> {
        if operand.starts_with(|c: char| c.is_ascii_digit()) {
            let value = parse_number(operand, line_num)?;
            return Ok(check_range(value, max, line_num)? as u16);
        }

        let label = operand.to_uppercase();
        if !is_identifier(&label) {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("expected number or label, found '{}'", operand),
            });
        }

        // Placeholder, patched in pass 2
        self.pending.push((self.output.len(), label, fixup, line_num));
        Ok(0)
    }

    fn emit(&mut self, word: u16) {
        self.output.extend_from_slice(&word.to_be_bytes());
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (offset, label, fixup, line_num) in &self.pending {
            let addr = *self.symbols.get(label)
                .ok_or_else(|| AssemblerError::UndefinedLabel {
                    line: *line_num,
                    label: label.clone(),
                })?;

            let current = u16::from_be_bytes([self.output[*offset], self.output[*offset + 1]]);
            let patched = match fixup {
                Fixup::Address => (current & 0xF000) | (addr & 0x0FFF),
                Fixup::Word => addr,
            };
            self.output[*offset..*offset + 2].copy_from_slice(&patched.to_be_bytes());
        }
        Ok(())
    }
}

/// `V0`..`VF`, case-insensitive.
fn register(operand: &str) -> Option<u8> {
    let mut chars = operand.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('V' | 'v'), Some(digit), None) => digit.to_digit(16).map(|d| d as u8),
        _ => None,
    }
}

fn byte(operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
    let value = parse_number(operand, line_num)?;
    Ok(check_range(value, 0xFF, line_num)? as u8)
}

/// Decimal, `0x` hex or `0b` binary.
fn parse_number(operand: &str, line_num: usize) -> Result<u32, AssemblerError> {
    let lower = operand.to_lowercase();
    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u32::from_str_radix(bin, 2)
    } else {
        lower.parse::<u32>()
    };

    parsed.map_err(|_| AssemblerError::SyntaxError {
        line: line_num,
        message: format!("invalid number '{}'", operand),
    })
}

fn check_range(value: u32, max: u32, line_num: usize) -> Result<u32, AssemblerError> {
    if value > max {
        return Err(AssemblerError::ValueOutOfRange { line: line_num, value });
    }
    Ok(value)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: u32 },

    #[error("program too large: {size} bytes")]
    ProgramTooLarge { size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::disasm::disassemble_instruction;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test program
            CLS
            LD VA, 5
            ADD VA, 0x03
            JP 0x200
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![0x00, 0xE0, 0x6A, 0x05, 0x7A, 0x03, 0x12, 0x00]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        start:
            LD I, sprite
            JP end
            CLS
        end: JP start
        sprite:
            DB 0b11110000, 0x90
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![0xA2, 0x08, 0x12, 0x06, 0x00, 0xE0, 0x12, 0x00, 0xF0, 0x90]);
    }

    #[test]
    fn test_assemble_data() {
        let source = r#"
            DW 0x1234, here
        here:
            DB 1, 2, 255
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![0x12, 0x34, 0x02, 0x04, 1, 2, 255]);
    }

    #[test]
    fn test_assemble_special_registers() {
        let source = "LD V3, K\nLD DT, V3\nLD V4, DT\nLD [I], V7\nLD V7, [I]\nADD I, V2\nLD F, V1\nLD B, V1";
        let result = assemble(source).unwrap();
        let words: Vec<u16> = result
            .chunks(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(words, vec![0xF30A, 0xF315, 0xF407, 0xF755, 0xF765, 0xF21E, 0xF129, 0xF133]);
    }

    #[test]
    fn test_disassembly_reassembles() {
        for word in [0x00EE, 0x2345, 0x3A10, 0x5120, 0x8126, 0x812E, 0x9AB0, 0xB123, 0xC7FF, 0xDABF, 0xE59E, 0xE5A1, 0xF018, 0x8AB9] {
            let text = disassemble_instruction(word);
            let bytes = assemble(&text).unwrap();
            assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]), word, "{}", text);
        }
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert!(matches!(
            assemble("CLS\nFOO V1"),
            Err(AssemblerError::UnknownMnemonic { line: 2, .. })
        ));
        assert!(matches!(
            assemble("JP nowhere"),
            Err(AssemblerError::UndefinedLabel { line: 1, .. })
        ));
        assert!(matches!(
            assemble("\n\nLD V0, 256"),
            Err(AssemblerError::ValueOutOfRange { line: 3, value: 256 })
        ));
        assert!(matches!(
            assemble("a:\na:"),
            Err(AssemblerError::DuplicateLabel { line: 2, .. })
        ));
        assert!(matches!(
            assemble("DRW V1, V2"),
            Err(AssemblerError::SyntaxError { line: 1, .. })
        ));
    }
}
