//! CHIP-8 memory subsystem.
//!
//! 4096 bytes, laid out as:
//! - `0x000-0x04F` reserved (the interpreter lived here on the COSMAC VIP)
//! - `0x050-0x09F` built-in hex font, 5 bytes per glyph
//! - `0x200-0xFFF` program space

use serde::{Serialize, Deserialize};

/// Total addressable memory in bytes.
pub const MEMORY_SIZE: usize = 4096;

/// Mask applied to every address; the address bus is 12 bits wide.
pub const ADDRESS_MASK: u16 = 0x0FFF;

/// Where the font table starts.
pub const FONT_ADDR: u16 = 0x050;

/// Bytes per font glyph.
pub const FONT_GLYPH_SIZE: u16 = 5;

/// Where programs are loaded and where execution starts.
pub const PROGRAM_ADDR: u16 = 0x200;

/// Largest program that fits between `PROGRAM_ADDR` and the top of memory.
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_ADDR as usize;

/// Hex digit glyphs 0-F, each 4 pixels wide and 5 rows tall.
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// CHIP-8 RAM.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Create memory with the font table loaded and everything else zeroed.
    pub fn new() -> Self {
        let mut mem = Self {
            bytes: vec![0; MEMORY_SIZE],
        };
        mem.load_font();
        mem
    }

    /// Read a byte. The address is masked to 12 bits.
    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[(addr & ADDRESS_MASK) as usize]
    }

    /// Write a byte. The address is masked to 12 bits.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        self.bytes[(addr & ADDRESS_MASK) as usize] = value;
    }

    /// Read a big-endian instruction word starting at `addr`.
    pub fn read_word(&self, addr: u16) -> u16 {
        let hi = self.read(addr) as u16;
        let lo = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Address of the glyph for hex digit `digit` (only the low nibble counts).
    pub fn glyph_addr(digit: u8) -> u16 {
        FONT_ADDR + FONT_GLYPH_SIZE * (digit & 0x0F) as u16
    }

    /// Zero everything and reload the font.
    pub fn clear(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
        self.load_font();
    }

    /// Copy a program image to `PROGRAM_ADDR`.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        if program.len() > MAX_PROGRAM_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: MAX_PROGRAM_SIZE,
            });
        }

        let start = PROGRAM_ADDR as usize;
        self.bytes[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Borrow a range of memory (for debugger views).
    pub fn slice(&self, start: u16, len: usize) -> &[u8] {
        let start = (start & ADDRESS_MASK) as usize;
        let end = (start + len).min(MEMORY_SIZE);
        &self.bytes[start..end]
    }

    fn load_font(&mut self) {
        let start = FONT_ADDR as usize;
        self.bytes[start..start + FONT.len()].copy_from_slice(&FONT);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Program space only; the font is always there
        let used = self.bytes[PROGRAM_ADDR as usize..]
            .iter()
            .filter(|b| **b != 0)
            .count();

        f.debug_struct("Memory")
            .field("non_zero_program_bytes", &used)
            .field("total_bytes", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// Program is too large to fit in memory.
    ProgramTooLarge { size: usize, available: usize },
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::ProgramTooLarge { size, available } => {
                write!(f, "program size {} exceeds available space {}", size, available)
            }
        }
    }
}

impl std::error::Error for MemoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_loaded() {
        let mem = Memory::new();
        assert_eq!(mem.slice(FONT_ADDR, 80), &FONT[..]);
        assert_eq!(mem.read(0x04F), 0);
        assert_eq!(mem.read(0x0A0), 0);
    }

    #[test]
    fn test_program_space_zeroed() {
        let mem = Memory::new();
        assert!(mem.slice(PROGRAM_ADDR, MAX_PROGRAM_SIZE).iter().all(|b| *b == 0));
    }

    #[test]
    fn test_read_word_big_endian() {
        let mut mem = Memory::new();
        mem.load_program(&[0x12, 0x34]).unwrap();
        assert_eq!(mem.read_word(0x200), 0x1234);
    }

    #[test]
    fn test_address_wraps_at_12_bits() {
        let mut mem = Memory::new();
        mem.write(0x1205, 7);
        assert_eq!(mem.read(0x205), 7);
        mem.write(0xFFF, 0xAB);
        mem.write(0x000, 0xCD);
        assert_eq!(mem.read_word(0xFFF), 0xABCD);
    }

    #[test]
    fn test_glyph_addr() {
        assert_eq!(Memory::glyph_addr(0x0), 0x050);
        assert_eq!(Memory::glyph_addr(0xA), 0x050 + 50);
        assert_eq!(Memory::glyph_addr(0x1F), 0x050 + 75);
    }

    #[test]
    fn test_load_program_max_size() {
        let mut mem = Memory::new();
        let program = vec![0xAA; MAX_PROGRAM_SIZE];
        mem.load_program(&program).unwrap();
        assert_eq!(mem.read(0xFFF), 0xAA);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut mem = Memory::new();
        let program = vec![0; MAX_PROGRAM_SIZE + 1];
        assert_eq!(
            mem.load_program(&program),
            Err(MemoryError::ProgramTooLarge { size: MAX_PROGRAM_SIZE + 1, available: MAX_PROGRAM_SIZE })
        );
    }

    #[test]
    fn test_clear_keeps_font() {
        let mut mem = Memory::new();
        mem.load_program(&[1, 2, 3]).unwrap();
        mem.clear();
        assert_eq!(mem.read(0x200), 0);
        assert_eq!(mem.read(FONT_ADDR), FONT[0]);
    }
}
