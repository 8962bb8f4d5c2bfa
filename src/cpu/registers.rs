//! CHIP-8 registers.
//!
//! - V0-VF: 8-bit general registers; VF doubles as the carry/borrow/collision flag
//! - I: 16-bit index register used for memory addressing
//! - PC: program counter

use crate::cpu::memory::PROGRAM_ADDR;
use serde::{Serialize, Deserialize};

/// Index of the flag register.
pub const VF: u8 = 0xF;

/// Size of one instruction in bytes.
pub const INSTRUCTION_SIZE: u16 = 2;

/// The CHIP-8 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// V0-VF general purpose registers
    pub v: [u8; 16],

    /// I: index register
    pub i: u16,

    /// PC: address of the next instruction to fetch
    pub pc: u16,
}

impl Registers {
    /// Zeroed registers with PC at the program start.
    pub fn new() -> Self {
        Self {
            v: [0; 16],
            i: 0,
            pc: PROGRAM_ADDR,
        }
    }

    /// Reset to power-on values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a general register. Only the low nibble of `index` is used.
    #[inline]
    pub fn get(&self, index: u8) -> u8 {
        self.v[(index & 0x0F) as usize]
    }

    /// Write a general register. Only the low nibble of `index` is used.
    #[inline]
    pub fn set(&mut self, index: u8, value: u8) {
        self.v[(index & 0x0F) as usize] = value;
    }

    /// Write VF from a boolean condition.
    #[inline]
    pub fn set_flag(&mut self, flag: bool) {
        self.v[VF as usize] = flag as u8;
    }

    /// Current VF value.
    pub fn flag(&self) -> u8 {
        self.v[VF as usize]
    }

    /// Advance PC past one instruction.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(INSTRUCTION_SIZE);
        old
    }

    /// Step PC back onto the instruction that was just fetched.
    pub fn rewind_pc(&mut self) {
        self.pc = self.pc.wrapping_sub(INSTRUCTION_SIZE);
    }

    /// Skip the next instruction if `condition` holds.
    pub fn skip_if(&mut self, condition: bool) {
        if condition {
            self.advance_pc();
        }
    }

    /// Set PC to an absolute address.
    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registers() {
        let regs = Registers::new();
        assert_eq!(regs.v, [0; 16]);
        assert_eq!(regs.i, 0);
        assert_eq!(regs.pc, 0x200);
    }

    #[test]
    fn test_set_flag() {
        let mut regs = Registers::new();
        regs.set_flag(true);
        assert_eq!(regs.flag(), 1);
        regs.set_flag(false);
        assert_eq!(regs.flag(), 0);
    }

    #[test]
    fn test_advance_and_rewind_pc() {
        let mut regs = Registers::new();
        let old = regs.advance_pc();
        assert_eq!(old, 0x200);
        assert_eq!(regs.pc, 0x202);
        regs.rewind_pc();
        assert_eq!(regs.pc, 0x200);
    }

    #[test]
    fn test_skip_if() {
        let mut regs = Registers::new();
        regs.skip_if(false);
        assert_eq!(regs.pc, 0x200);
        regs.skip_if(true);
        assert_eq!(regs.pc, 0x202);
    }

    #[test]
    fn test_register_index_masked() {
        let mut regs = Registers::new();
        regs.set(0x1A, 9);
        assert_eq!(regs.get(0xA), 9);
    }
}
