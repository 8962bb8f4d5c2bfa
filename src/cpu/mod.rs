//! CPU emulation for the CHIP-8 virtual machine.
//!
//! This module implements the complete machine:
//! - 4KB of byte-addressed memory with the hex font at 0x050
//! - 16 general registers V0-VF, the index register I and the PC
//! - A 16-deep call stack and the 60 Hz delay and sound timers
//! - The 35-instruction set, decoded into a typed [`Instruction`]

pub mod memory;
pub mod registers;
pub mod stack;
pub mod timer;
pub mod display;
pub mod keypad;
pub mod quirks;
pub mod decode;
pub mod execute;

pub use memory::{Memory, MemoryError};
pub use registers::Registers;
pub use stack::{CallStack, StackFault};
pub use timer::{Timers, Ticker};
pub use quirks::{Quirks, QuirksError};
pub use decode::{decode, encode, Instruction, Opcode};
pub use execute::{Cpu, CpuError, CpuState, StepOutcome, Snapshot};
