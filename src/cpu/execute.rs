//! CPU execution engine for CHIP-8.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::{Memory, Registers, Quirks};
use crate::cpu::decode::{self, Instruction};
use crate::cpu::display::{FrameBuffer, Surface, WIDTH, HEIGHT};
use crate::cpu::keypad::{Keypad, Keys};
use crate::cpu::memory::{MemoryError, ADDRESS_MASK};
use crate::cpu::stack::{CallStack, StackFault};
use crate::cpu::timer::Timers;
use log::{debug, info, trace, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// Fetching and executing normally.
    Running,
    /// Blocked in FX0A until a key press is delivered into `register`.
    AwaitingKey { register: u8 },
}

/// What a call to [`Cpu::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// An instruction completed.
    Executed(Instruction),
    /// Still waiting for a key; nothing changed.
    AwaitingInput,
}

/// The CHIP-8 machine.
#[derive(Clone)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Return addresses.
    pub stack: CallStack,
    /// Delay and sound timers.
    pub timers: Timers,
    /// Logical display.
    pub display: FrameBuffer,
    /// Held keys, as last reported by the host.
    pub keys: Keys,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction semantics switches.
    pub quirks: Quirks,
    /// Instruction count (for profiling).
    pub cycles: u64,
    rng: StdRng,
    seed: u64,
    program: Vec<u8>,
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU with zeroed state and a randomly seeded generator.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create a new CPU whose CXNN results are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            stack: CallStack::new(),
            timers: Timers::new(),
            display: FrameBuffer::new(),
            keys: Keys::new(),
            state: CpuState::Running,
            quirks: Quirks::default(),
            cycles: 0,
            rng: StdRng::seed_from_u64(seed),
            seed,
            program: Vec::new(),
            last_instr: None,
        }
    }

    /// Replace the quirk settings.
    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    /// Reset to power-on state and reload the last program.
    ///
    /// The random generator is reseeded with the original seed, so a reset
    /// run replays exactly.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.stack.clear();
        self.timers = Timers::new();
        self.display.clear();
        self.keys.release_all();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.rng = StdRng::seed_from_u64(self.seed);
        self.last_instr = None;
        // Only images that `load_program` accepted are kept, so this reload fits
        let program = std::mem::take(&mut self.program);
        if let Err(e) = self.mem.load_program(&program) {
            warn!("program not reloaded on reset: {}", e);
        }
        self.program = program;
        info!("reset, {} byte program reloaded", self.program.len());
    }

    /// Load a program image at 0x200.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(program)?;
        self.program = program.to_vec();
        info!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// While awaiting a key (FX0A) this polls `keypad` instead and returns
    /// [`StepOutcome::AwaitingInput`] until a key arrives.
    pub fn step(
        &mut self,
        surface: &mut impl Surface,
        keypad: &mut impl Keypad,
    ) -> Result<StepOutcome, CpuError> {
        if let CpuState::AwaitingKey { register } = self.state {
            return Ok(self.poll_key(register, keypad));
        }

        // Fetch
        let pc = self.regs.pc;
        let word = self.mem.read_word(pc);

        // Advance PC before execute (jumps and skips build on this)
        self.regs.advance_pc();

        // Decode
        let instr = decode::decode(word);
        trace!("{:03X}: {:04X} {:?}", pc, word, instr);

        // Execute
        self.execute(instr, surface)?;

        if self.is_awaiting_input() {
            // Only presses made after the wait began may satisfy it
            let stale = std::iter::from_fn(|| keypad.poll_next_key_down()).count();
            if stale > 0 {
                debug!("dropped {} key presses queued before FX0A", stale);
            }
            return Ok(StepOutcome::AwaitingInput);
        }

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(StepOutcome::Executed(instr))
    }

    /// Run for at most `max_steps` calls to [`Cpu::step`].
    ///
    /// Returns the number of instructions that completed. Timers are not
    /// ticked; that is the caller's cadence to keep.
    pub fn run_limited(
        &mut self,
        max_steps: u64,
        surface: &mut impl Surface,
        keypad: &mut impl Keypad,
    ) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        for _ in 0..max_steps {
            self.step(surface, keypad)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// One 60 Hz timer tick.
    pub fn tick_timers(&mut self) {
        self.timers.tick();
    }

    /// Whether FX0A is blocking on a key press.
    pub fn is_awaiting_input(&self) -> bool {
        matches!(self.state, CpuState::AwaitingKey { .. })
    }

    /// Refresh held keys from the host's input source.
    pub fn sync_keys(&mut self, keypad: &impl Keypad) {
        self.keys.sync(keypad);
    }

    /// Set one key's held state.
    pub fn set_key(&mut self, key: u8, down: bool) {
        self.keys.set(key, down);
    }

    /// Execute a decoded instruction.
    ///
    /// PC is expected to already point past the instruction.
    pub fn execute(&mut self, instr: Instruction, surface: &mut impl Surface) -> Result<(), CpuError> {
        match instr {
            // ==================== System ====================

            Instruction::Cls => {
                self.display.clear();
                surface.clear();
                surface.present();
            }

            Instruction::Ret => {
                let addr = self.stack.pop()?;
                self.regs.jump(addr);
            }

            Instruction::Sys { addr } => {
                debug!("ignoring machine code call to {:03X}", addr);
            }

            // ==================== Control Flow ====================

            Instruction::Jump { addr } => {
                self.regs.jump(addr);
            }

            Instruction::Call { addr } => {
                self.stack.push(self.regs.pc)?;
                self.regs.jump(addr);
            }

            Instruction::JumpOffset { addr } => {
                let reg = if self.quirks.jump_uses_vx { (addr >> 8) as u8 } else { 0 };
                let target = addr + self.regs.get(reg) as u16;
                self.regs.jump(target);
            }

            Instruction::SkipEqImm { x, nn } => {
                let cond = self.regs.get(x) == nn;
                self.regs.skip_if(cond);
            }

            Instruction::SkipNeImm { x, nn } => {
                let cond = self.regs.get(x) != nn;
                self.regs.skip_if(cond);
            }

            Instruction::SkipEqReg { x, y } => {
                let cond = self.regs.get(x) == self.regs.get(y);
                self.regs.skip_if(cond);
            }

            Instruction::SkipNeReg { x, y } => {
                let cond = self.regs.get(x) != self.regs.get(y);
                self.regs.skip_if(cond);
            }

            // ==================== Immediate ====================

            Instruction::LoadImm { x, nn } => {
                self.regs.set(x, nn);
            }

            Instruction::AddImm { x, nn } => {
                let result = self.regs.get(x).wrapping_add(nn);
                self.regs.set(x, result);
            }

            // ==================== Arithmetic / Logic ====================
            // Flags are written after the result so they win when X is F.

            Instruction::Move { x, y } => {
                let value = self.regs.get(y);
                self.regs.set(x, value);
            }

            Instruction::Or { x, y } => {
                let value = self.regs.get(x) | self.regs.get(y);
                self.regs.set(x, value);
            }

            Instruction::And { x, y } => {
                let value = self.regs.get(x) & self.regs.get(y);
                self.regs.set(x, value);
            }

            Instruction::Xor { x, y } => {
                let value = self.regs.get(x) ^ self.regs.get(y);
                self.regs.set(x, value);
            }

            Instruction::Add { x, y } => {
                let (result, carry) = self.regs.get(x).overflowing_add(self.regs.get(y));
                self.regs.set(x, result);
                self.regs.set_flag(carry);
            }

            Instruction::Sub { x, y } => {
                let (a, b) = (self.regs.get(x), self.regs.get(y));
                self.regs.set(x, a.wrapping_sub(b));
                self.regs.set_flag(a >= b);
            }

            Instruction::SubN { x, y } => {
                let (a, b) = (self.regs.get(y), self.regs.get(x));
                self.regs.set(x, a.wrapping_sub(b));
                self.regs.set_flag(a >= b);
            }

            Instruction::Shr { x, y } => {
                let source = self.shift_source(x, y);
                self.regs.set(x, source >> 1);
                self.regs.set_flag(source & 0x01 != 0);
            }

            Instruction::Shl { x, y } => {
                let source = self.shift_source(x, y);
                self.regs.set(x, source << 1);
                self.regs.set_flag(source & 0x80 != 0);
            }

            // ==================== Index / Random / Display ====================

            Instruction::LoadIndex { addr } => {
                self.regs.i = addr;
            }

            Instruction::Random { x, nn } => {
                let value = self.rng.gen_range(0..=nn) & nn;
                self.regs.set(x, value);
            }

            Instruction::Draw { x, y, n } => {
                self.draw_sprite(x, y, n, surface);
            }

            // ==================== Keypad ====================

            Instruction::SkipKey { x } => {
                let cond = self.keys.is_down(self.regs.get(x));
                self.regs.skip_if(cond);
            }

            Instruction::SkipNotKey { x } => {
                let cond = !self.keys.is_down(self.regs.get(x));
                self.regs.skip_if(cond);
            }

            // ==================== Timers / Misc ====================

            Instruction::LoadDelay { x } => {
                self.regs.set(x, self.timers.delay);
            }

            Instruction::WaitKey { x } => {
                // Stay on this instruction until a key arrives
                self.regs.rewind_pc();
                self.state = CpuState::AwaitingKey { register: x };
                debug!("waiting for key into V{:X}", x);
            }

            Instruction::SetDelay { x } => {
                self.timers.delay = self.regs.get(x);
            }

            Instruction::SetSound { x } => {
                self.timers.sound = self.regs.get(x);
            }

            Instruction::AddIndex { x } => {
                let result = self.regs.i.wrapping_add(self.regs.get(x) as u16);
                self.regs.i = result;
                if result > ADDRESS_MASK {
                    self.regs.set_flag(true);
                }
            }

            Instruction::LoadFont { x } => {
                self.regs.i = Memory::glyph_addr(self.regs.get(x));
            }

            Instruction::StoreBcd { x } => {
                let value = self.regs.get(x);
                let i = self.regs.i;
                self.mem.write(i, value / 100);
                self.mem.write(i.wrapping_add(1), value / 10 % 10);
                self.mem.write(i.wrapping_add(2), value % 10);
            }

            Instruction::StoreRegs { x } => {
                for r in 0..=x {
                    self.mem.write(self.regs.i.wrapping_add(r as u16), self.regs.get(r));
                }
            }

            Instruction::LoadRegs { x } => {
                for r in 0..=x {
                    let value = self.mem.read(self.regs.i.wrapping_add(r as u16));
                    self.regs.set(r, value);
                }
            }

            Instruction::Unknown(word) => {
                return Err(CpuError::UnknownInstruction {
                    word,
                    pc: self.regs.pc.wrapping_sub(2),
                });
            }
        }

        Ok(())
    }

    fn shift_source(&self, x: u8, y: u8) -> u8 {
        if self.quirks.shift_uses_vy {
            self.regs.get(y)
        } else {
            self.regs.get(x)
        }
    }

    /// DXYN: XOR an 8xN sprite from memory[I] onto the display.
    fn draw_sprite(&mut self, x: u8, y: u8, n: u8, surface: &mut impl Surface) {
        // Origin wraps once; rows and columns then wrap or clip per quirk
        let origin_x = self.regs.get(x) as usize % WIDTH;
        let origin_y = self.regs.get(y) as usize % HEIGHT;
        self.regs.set_flag(false);

        let mut collision = false;
        for row in 0..n as usize {
            let py = origin_y + row;
            if self.quirks.clip_sprites && py >= HEIGHT {
                break;
            }
            let bits = self.mem.read(self.regs.i.wrapping_add(row as u16));

            for col in 0..8usize {
                if bits & (0x80 >> col) == 0 {
                    continue;
                }
                let px = origin_x + col;
                if self.quirks.clip_sprites && px >= WIDTH {
                    break;
                }

                let (px, py) = (px % WIDTH, py % HEIGHT);
                if self.display.toggle(px, py) {
                    collision = true;
                    surface.clear_pixel(px as u8, py as u8);
                } else {
                    surface.set_pixel(px as u8, py as u8);
                }
            }
        }

        self.regs.set_flag(collision);
        surface.present();
    }

    /// Second half of FX0A: check for a press and finish the instruction.
    fn poll_key(&mut self, register: u8, keypad: &mut impl Keypad) -> StepOutcome {
        match keypad.poll_next_key_down() {
            Some(key) => {
                let key = key & 0x0F;
                self.regs.set(register, key);
                self.regs.advance_pc();
                self.state = CpuState::Running;
                self.cycles += 1;

                let instr = Instruction::WaitKey { x: register };
                self.last_instr = Some(instr);
                debug!("key {:X} delivered to V{:X}", key, register);
                StepOutcome::Executed(instr)
            }
            None => StepOutcome::AwaitingInput,
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Seed of the random generator.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The program image last loaded.
    pub fn program(&self) -> &[u8] {
        &self.program
    }

    /// Serializable copy of the register-level state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            v: self.regs.v,
            i: self.regs.i,
            pc: self.regs.pc,
            stack: self.stack.frames().to_vec(),
            delay_timer: self.timers.delay,
            sound_timer: self.timers.sound,
            state: self.state,
            cycles: self.cycles,
            lit_pixels: self.display.lit_count(),
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("stack", &self.stack.frames())
            .field("timers", &self.timers)
            .finish()
    }
}

/// Register-level machine state, for dumps and front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub stack: Vec<u16>,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub state: CpuState,
    pub cycles: u64,
    pub lit_pixels: usize,
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, Error)]
pub enum CpuError {
    #[error("unknown instruction {word:04X} at {pc:03X}")]
    UnknownInstruction { word: u16, pc: u16 },

    #[error("stack fault: {0}")]
    StackFault(#[from] StackFault),

    #[error("memory error: {0}")]
    MemoryError(#[from] MemoryError),
}
