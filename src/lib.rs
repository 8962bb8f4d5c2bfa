//! # CHIP-8 Virtual Machine
//!
//! An interpreter for the CHIP-8 instruction set: 16 general registers,
//! 4KB of memory, a 16-deep call stack, delay and sound timers, a 64x32
//! monochrome display and a 16-key hex keypad.
//!
//! The core (`cpu`) owns no presentation or input handles. A host drives it
//! by calling [`Cpu::step`] with a [`Surface`] and a [`Keypad`], and by
//! calling [`Cpu::tick_timers`] at 60 Hz.

pub mod cpu;
pub mod asm;
pub mod driver;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, StepOutcome, Snapshot, Memory, Registers, Instruction, Quirks};
pub use cpu::display::{Surface, NullSurface, FrameBuffer};
pub use cpu::keypad::{Keypad, NoKeys, ScriptedKeypad};
pub use asm::{assemble, disassemble, AssemblerError, RomError, load_rom, save_rom};
pub use driver::{ErrorPolicy, run_headless};

#[cfg(feature = "tui")]
pub use tui::{run_debugger, run_terminal, RunConfig};
