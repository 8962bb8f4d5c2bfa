//! Instruction decoder for CHIP-8.
//!
//! Every instruction is one big-endian 16-bit word, split into four nibbles:
//!
//! ```text
//!  15    12 11     8 7      4 3      0
//! +--------+--------+--------+--------+
//! | family |   X    |   Y    |   N    |
//! +--------+--------+--------+--------+
//!                   |       NN        |
//!          |          NNN             |
//! ```
//!
//! Decoding never fails. Words with no meaning become
//! [`Instruction::Unknown`]; it is executing them that is an error.

use serde::{Serialize, Deserialize};

/// Raw operand fields of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    /// The full word.
    pub word: u16,
    /// First nibble: the instruction family.
    pub family: u8,
    /// Second nibble, usually a register index.
    pub x: u8,
    /// Third nibble, usually a register index.
    pub y: u8,
    /// Fourth nibble.
    pub n: u8,
    /// Low byte: 8-bit immediate.
    pub nn: u8,
    /// Low 12 bits: address.
    pub nnn: u16,
}

impl From<u16> for Opcode {
    fn from(word: u16) -> Self {
        Self {
            word,
            family: (word >> 12) as u8,
            x: ((word >> 8) & 0x0F) as u8,
            y: ((word >> 4) & 0x0F) as u8,
            n: (word & 0x0F) as u8,
            nn: (word & 0xFF) as u8,
            nnn: word & 0x0FFF,
        }
    }
}

/// Decoded CHIP-8 instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== System ====================

    /// 00E0: clear the display
    Cls,

    /// 00EE: return from subroutine
    Ret,

    /// 0NNN: call machine code routine (ignored)
    Sys { addr: u16 },

    // ==================== Control Flow ====================

    /// 1NNN: PC := NNN
    Jump { addr: u16 },

    /// 2NNN: push PC, PC := NNN
    Call { addr: u16 },

    /// BNNN: PC := NNN + V0 (or VX, see `Quirks::jump_uses_vx`)
    JumpOffset { addr: u16 },

    /// 3XNN: skip if VX == NN
    SkipEqImm { x: u8, nn: u8 },

    /// 4XNN: skip if VX != NN
    SkipNeImm { x: u8, nn: u8 },

    /// 5XY0: skip if VX == VY
    SkipEqReg { x: u8, y: u8 },

    /// 9XY0: skip if VX != VY
    SkipNeReg { x: u8, y: u8 },

    // ==================== Immediate ====================

    /// 6XNN: VX := NN
    LoadImm { x: u8, nn: u8 },

    /// 7XNN: VX := VX + NN, VF untouched
    AddImm { x: u8, nn: u8 },

    // ==================== Arithmetic / Logic ====================

    /// 8XY0: VX := VY
    Move { x: u8, y: u8 },

    /// 8XY1: VX := VX | VY
    Or { x: u8, y: u8 },

    /// 8XY2: VX := VX & VY
    And { x: u8, y: u8 },

    /// 8XY3: VX := VX ^ VY
    Xor { x: u8, y: u8 },

    /// 8XY4: VX := VX + VY, VF := carry
    Add { x: u8, y: u8 },

    /// 8XY5: VX := VX - VY, VF := no borrow
    Sub { x: u8, y: u8 },

    /// 8XY6: VX := VX >> 1, VF := bit shifted out
    Shr { x: u8, y: u8 },

    /// 8XY7: VX := VY - VX, VF := no borrow
    SubN { x: u8, y: u8 },

    /// 8XYE: VX := VX << 1, VF := bit shifted out
    Shl { x: u8, y: u8 },

    // ==================== Index / Random / Display ====================

    /// ANNN: I := NNN
    LoadIndex { addr: u16 },

    /// CXNN: VX := random & NN
    Random { x: u8, nn: u8 },

    /// DXYN: draw N-row sprite at (VX, VY) from memory[I]
    Draw { x: u8, y: u8, n: u8 },

    // ==================== Keypad ====================

    /// EX9E: skip if key VX is down
    SkipKey { x: u8 },

    /// EXA1: skip if key VX is up
    SkipNotKey { x: u8 },

    // ==================== Timers / Misc ====================

    /// FX07: VX := delay timer
    LoadDelay { x: u8 },

    /// FX0A: wait for a key press, VX := key
    WaitKey { x: u8 },

    /// FX15: delay timer := VX
    SetDelay { x: u8 },

    /// FX18: sound timer := VX
    SetSound { x: u8 },

    /// FX1E: I := I + VX
    AddIndex { x: u8 },

    /// FX29: I := address of font glyph for VX
    LoadFont { x: u8 },

    /// FX33: memory[I..I+3] := BCD of VX
    StoreBcd { x: u8 },

    /// FX55: memory[I..=I+X] := V0..=VX
    StoreRegs { x: u8 },

    /// FX65: V0..=VX := memory[I..=I+X]
    LoadRegs { x: u8 },

    /// Any word that is not a valid instruction.
    Unknown(u16),
}

/// Decode an instruction word.
pub fn decode(word: u16) -> Instruction {
    let Opcode { family, x, y, n, nn, nnn, .. } = Opcode::from(word);

    match family {
        0x0 => match word {
            0x00E0 => Instruction::Cls,
            0x00EE => Instruction::Ret,
            _ => Instruction::Sys { addr: nnn },
        },
        0x1 => Instruction::Jump { addr: nnn },
        0x2 => Instruction::Call { addr: nnn },
        0x3 => Instruction::SkipEqImm { x, nn },
        0x4 => Instruction::SkipNeImm { x, nn },
        0x5 if n == 0 => Instruction::SkipEqReg { x, y },
        0x6 => Instruction::LoadImm { x, nn },
        0x7 => Instruction::AddImm { x, nn },
        0x8 => decode_alu(word, x, y, n),
        0x9 if n == 0 => Instruction::SkipNeReg { x, y },
        0xA => Instruction::LoadIndex { addr: nnn },
        0xB => Instruction::JumpOffset { addr: nnn },
        0xC => Instruction::Random { x, nn },
        0xD => Instruction::Draw { x, y, n },
        0xE => match nn {
            0x9E => Instruction::SkipKey { x },
            0xA1 => Instruction::SkipNotKey { x },
            _ => Instruction::Unknown(word),
        },
        0xF => decode_misc(word, x, nn),
        _ => Instruction::Unknown(word),
    }
}

/// 8XYN arithmetic/logic family.
fn decode_alu(word: u16, x: u8, y: u8, n: u8) -> Instruction {
    match n {
        0x0 => Instruction::Move { x, y },
        0x1 => Instruction::Or { x, y },
        0x2 => Instruction::And { x, y },
        0x3 => Instruction::Xor { x, y },
        0x4 => Instruction::Add { x, y },
        0x5 => Instruction::Sub { x, y },
        0x6 => Instruction::Shr { x, y },
        0x7 => Instruction::SubN { x, y },
        0xE => Instruction::Shl { x, y },
        _ => Instruction::Unknown(word),
    }
}

/// FXNN timer/IO/memory family.
fn decode_misc(word: u16, x: u8, nn: u8) -> Instruction {
    match nn {
        0x07 => Instruction::LoadDelay { x },
        0x0A => Instruction::WaitKey { x },
        0x15 => Instruction::SetDelay { x },
        0x18 => Instruction::SetSound { x },
        0x1E => Instruction::AddIndex { x },
        0x29 => Instruction::LoadFont { x },
        0x33 => Instruction::StoreBcd { x },
        0x55 => Instruction::StoreRegs { x },
        0x65 => Instruction::LoadRegs { x },
        _ => Instruction::Unknown(word),
    }
}

/// Encode an instruction back to its word.
pub fn encode(instr: &Instruction) -> u16 {
    fn xy(family: u16, x: u8, y: u8, n: u16) -> u16 {
        (family << 12) | ((x as u16 & 0xF) << 8) | ((y as u16 & 0xF) << 4) | (n & 0xF)
    }
    fn xnn(family: u16, x: u8, nn: u8) -> u16 {
        (family << 12) | ((x as u16 & 0xF) << 8) | nn as u16
    }
    fn nnn(family: u16, addr: u16) -> u16 {
        (family << 12) | (addr & 0x0FFF)
    }

    match *instr {
        Instruction::Cls => 0x00E0,
        Instruction::Ret => 0x00EE,
        Instruction::Sys { addr } => nnn(0x0, addr),
        Instruction::Jump { addr } => nnn(0x1, addr),
        Instruction::Call { addr } => nnn(0x2, addr),
        Instruction::JumpOffset { addr } => nnn(0xB, addr),
        Instruction::SkipEqImm { x, nn } => xnn(0x3, x, nn),
        Instruction::SkipNeImm { x, nn } => xnn(0x4, x, nn),
        Instruction::SkipEqReg { x, y } => xy(0x5, x, y, 0x0),
        Instruction::SkipNeReg { x, y } => xy(0x9, x, y, 0x0),
        Instruction::LoadImm { x, nn } => xnn(0x6, x, nn),
        Instruction::AddImm { x, nn } => xnn(0x7, x, nn),
        Instruction::Move { x, y } => xy(0x8, x, y, 0x0),
        Instruction::Or { x, y } => xy(0x8, x, y, 0x1),
        Instruction::And { x, y } => xy(0x8, x, y, 0x2),
        Instruction::Xor { x, y } => xy(0x8, x, y, 0x3),
        Instruction::Add { x, y } => xy(0x8, x, y, 0x4),
        Instruction::Sub { x, y } => xy(0x8, x, y, 0x5),
        Instruction::Shr { x, y } => xy(0x8, x, y, 0x6),
        Instruction::SubN { x, y } => xy(0x8, x, y, 0x7),
        Instruction::Shl { x, y } => xy(0x8, x, y, 0xE),
        Instruction::LoadIndex { addr } => nnn(0xA, addr),
        Instruction::Random { x, nn } => xnn(0xC, x, nn),
        Instruction::Draw { x, y, n } => xy(0xD, x, y, n as u16),
        Instruction::SkipKey { x } => xnn(0xE, x, 0x9E),
        Instruction::SkipNotKey { x } => xnn(0xE, x, 0xA1),
        Instruction::LoadDelay { x } => xnn(0xF, x, 0x07),
        Instruction::WaitKey { x } => xnn(0xF, x, 0x0A),
        Instruction::SetDelay { x } => xnn(0xF, x, 0x15),
        Instruction::SetSound { x } => xnn(0xF, x, 0x18),
        Instruction::AddIndex { x } => xnn(0xF, x, 0x1E),
        Instruction::LoadFont { x } => xnn(0xF, x, 0x29),
        Instruction::StoreBcd { x } => xnn(0xF, x, 0x33),
        Instruction::StoreRegs { x } => xnn(0xF, x, 0x55),
        Instruction::LoadRegs { x } => xnn(0xF, x, 0x65),
        Instruction::Unknown(word) => word,
    }
}
