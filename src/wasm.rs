//! WebAssembly bindings for the CHIP-8 machine.
//!
//! This module provides JavaScript-friendly wrappers around the core. The
//! page owns the loop: call `run_frame` from `requestAnimationFrame` and
//! paint `framebuffer()` afterwards.

use wasm_bindgen::prelude::*;
use crate::asm::assembler::assemble;
use crate::asm::disasm::disassemble_instruction;
use crate::asm::rom;
use crate::cpu::decode::encode;
use crate::cpu::display::{NullSurface, HEIGHT, WIDTH};
use crate::cpu::keypad::{Keypad, ScriptedKeypad};
use crate::{Cpu, StepOutcome};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    cpu: Cpu,
    keypad: ScriptedKeypad,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a new machine with a random seed.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            keypad: ScriptedKeypad::new(),
        }
    }

    /// Create a new machine with reproducible CXNN results.
    #[wasm_bindgen]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            cpu: Cpu::with_seed(seed),
            keypad: ScriptedKeypad::new(),
        }
    }

    /// Load a ROM image. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_rom(&mut self, bytes: &[u8]) -> Result<usize, JsError> {
        rom::validate(bytes).map_err(|e| JsError::new(&e.to_string()))?;
        self.load(bytes)
    }

    /// Load a program from assembly source code. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let program = assemble(source).map_err(|e| JsError::new(&e.to_string()))?;
        self.load(&program)
    }

    fn load(&mut self, program: &[u8]) -> Result<usize, JsError> {
        self.cpu.load_program(program).map_err(|e| JsError::new(&e.to_string()))?;
        self.cpu.reset();
        self.keypad = ScriptedKeypad::new();
        Ok(program.len())
    }

    /// Step one instruction. Returns the disassembled instruction, or an
    /// empty string while waiting for a key.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        self.cpu.sync_keys(&self.keypad);
        match self.cpu.step(&mut NullSurface, &mut self.keypad) {
            Ok(StepOutcome::Executed(instr)) => Ok(disassemble_instruction(encode(&instr))),
            Ok(StepOutcome::AwaitingInput) => Ok(String::new()),
            Err(e) => Err(JsError::new(&e.to_string())),
        }
    }

    /// One 60 Hz frame: run `instructions` steps, then tick the timers once.
    /// Returns the number of instructions that completed.
    #[wasm_bindgen]
    pub fn run_frame(&mut self, instructions: u32) -> Result<u32, JsError> {
        let start = self.cpu.cycles;
        for _ in 0..instructions {
            self.step()?;
        }
        self.cpu.tick_timers();
        Ok((self.cpu.cycles - start) as u32)
    }

    /// Advance the timers by one 60 Hz tick.
    #[wasm_bindgen]
    pub fn tick_timers(&mut self) {
        self.cpu.tick_timers();
    }

    /// Press a key (0-F).
    #[wasm_bindgen]
    pub fn key_down(&mut self, key: u8) {
        if !self.keypad.is_key_down(key) {
            self.keypad.press(key);
        }
        self.keypad.hold(key, true);
    }

    /// Release a key (0-F).
    #[wasm_bindgen]
    pub fn key_up(&mut self, key: u8) {
        self.keypad.hold(key, false);
    }

    /// Reset to the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.keypad = ScriptedKeypad::new();
    }

    /// Display pixels, row-major, one byte (0 or 1) per pixel.
    #[wasm_bindgen]
    pub fn framebuffer(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(&self.cpu.display.to_bytes()[..])
    }

    #[wasm_bindgen]
    pub fn width() -> usize {
        WIDTH
    }

    #[wasm_bindgen]
    pub fn height() -> usize {
        HEIGHT
    }

    /// Whether the sound timer is running.
    #[wasm_bindgen]
    pub fn is_beeping(&self) -> bool {
        self.cpu.timers.is_beeping()
    }

    /// Whether FX0A is waiting for a key.
    #[wasm_bindgen]
    pub fn is_awaiting_input(&self) -> bool {
        self.cpu.is_awaiting_input()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.regs.pc
    }

    /// Get memory byte at address.
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: u16) -> u8 {
        self.cpu.mem.read(addr)
    }

    /// Get registers, timers and state as a JSON string.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.snapshot()).map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the program image.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<Vec<u8>, JsError> {
    assemble(source).map_err(|e| JsError::new(&e.to_string()))
}

/// Disassemble a single instruction word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: u16) -> String {
    disassemble_instruction(word)
}
