//! Terminal front ends for the CHIP-8 machine.
//!
//! Provides:
//! - A real-time runner drawing the display with half-block glyphs
//! - An interactive debugger with step/run/breakpoint controls,
//!   registers, stack, memory and disassembly views
//! - A QWERTY keypad mapping shared by both

mod app;
mod keypad;
mod runner;
mod screen;
mod ui;

pub use app::{DebuggerApp, run_debugger};
pub use keypad::{map_key, TerminalKeypad, HOLD_TIMEOUT};
pub use runner::{run_terminal, RunConfig, RunError};
pub use screen::{half_block_rows, TerminalSurface};
