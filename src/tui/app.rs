//! Debugger application state and logic.

use super::keypad::TerminalKeypad;
use super::screen::{TerminalGuard, TerminalSurface};
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::timer::{Ticker, TIMER_HZ};
use crate::cpu::{encode, Cpu, StepOutcome};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Bytes per row in the memory view.
pub const MEM_ROW_BYTES: usize = 8;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u16>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset, in rows.
    pub mem_scroll: usize,
    /// Keyboard as keypad.
    pub keypad: TerminalKeypad,
    surface: TerminalSurface,
    clock: Ticker,
    timers: Ticker,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(cpu: Cpu, hz: u32) -> Self {
        Self {
            cpu,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 'n' to step, 'g' to run, Esc to quit.".into(),
            mem_scroll: 0x200 / MEM_ROW_BYTES,
            keypad: TerminalKeypad::new(),
            surface: TerminalSurface::new(),
            clock: Ticker::new(hz),
            timers: Ticker::new(TIMER_HZ),
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        let pc = self.cpu.regs.pc;
        self.cpu.sync_keys(&self.keypad);

        match self.cpu.step(&mut self.surface, &mut self.keypad) {
            Ok(StepOutcome::Executed(instr)) => {
                let text = disassemble_instruction(encode(&instr));
                self.status = format!("PC={:03X}: {}", pc, text);
            }
            Ok(StepOutcome::AwaitingInput) => {
                self.status = format!("PC={:03X}: waiting for a key", pc);
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until breakpoint or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();

        // Leave the breakpoint we are sitting on
        if self.breakpoints.contains(&self.cpu.regs.pc) {
            self.step();
        }
    }

    /// Stop continuous execution.
    pub fn pause(&mut self) {
        self.running = false;
        self.status = format!("Paused at PC={:03X}.", self.cpu.regs.pc);
    }

    /// Run one iteration of continuous execution covering `elapsed`.
    pub fn tick(&mut self, elapsed: Duration) {
        if !self.running {
            return;
        }

        // The timers see the whole frame even when a breakpoint cuts it short
        let timer_ticks = self.timers.advance(elapsed);

        for _ in 0..self.clock.advance(elapsed) {
            // Check for breakpoint
            let pc = self.cpu.regs.pc;
            if self.breakpoints.contains(&pc) && !self.cpu.is_awaiting_input() {
                self.running = false;
                self.status = format!("Breakpoint at PC={:03X}", pc);
                break;
            }

            self.step();
            if !self.running {
                break;
            }
        }

        for _ in 0..timer_ticks {
            self.cpu.tick_timers();
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:03X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:03X}", pc);
        }
    }

    /// Reset CPU to initial state, keeping breakpoints.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.keypad.clear();
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    pub fn scroll_memory(&mut self, up: bool) {
        let max = MEMORY_SIZE / MEM_ROW_BYTES - 1;
        self.mem_scroll = if up {
            self.mem_scroll.saturating_sub(1)
        } else {
            (self.mem_scroll + 1).min(max)
        };
    }

    /// Get disassembly around current PC: (address, text, is_current).
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u16, String, bool)> {
        let pc = self.cpu.regs.pc as usize;
        let before = (lines / 2).min(pc / 2);
        let start = pc - before * 2;

        (0..lines)
            .map(|i| start + i * 2)
            .take_while(|addr| addr + 1 < MEMORY_SIZE)
            .map(|addr| {
                let addr = addr as u16;
                let text = disassemble_instruction(self.cpu.mem.read_word(addr));
                (addr, text, addr as usize == pc)
            })
            .collect()
    }
}

/// Run the debugger on a loaded machine.
pub fn run_debugger(cpu: Cpu, hz: u32) -> std::io::Result<()> {
    use crossterm::event::{self, Event, KeyCode, KeyEventKind};
    use ratatui::prelude::*;
    use std::io::stdout;

    // Setup terminal
    let _guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create app
    let mut app = DebuggerApp::new(cpu, hz);
    let mut last = Instant::now();

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Handle input
        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = event::read()? {
                let now = Instant::now();
                if !app.keypad.handle(&key, now) && key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc => app.should_quit = true,
                        KeyCode::Char('n') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('g') => app.run(),
                        KeyCode::Char('p') => app.pause(),
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('i') => app.reset(),
                        KeyCode::Up => app.scroll_memory(true),
                        KeyCode::Down => app.scroll_memory(false),
                        _ => {}
                    }
                }
            }
        }

        let now = Instant::now();
        app.keypad.refresh(now);

        // Tick for continuous running
        app.tick(now.duration_since(last).min(Duration::from_millis(100)));
        last = now;

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with(program: &[u8]) -> DebuggerApp {
        let mut cpu = Cpu::with_seed(3);
        cpu.load_program(program).unwrap();
        DebuggerApp::new(cpu, 600)
    }

    #[test]
    fn test_step_updates_status() {
        let mut app = app_with(&[0x6A, 0x05]);
        app.step();
        assert_eq!(app.cpu.regs.get(0xA), 5);
        assert_eq!(app.status, "PC=200: LD VA, 0x05");
    }

    #[test]
    fn test_breakpoint_stops_run() {
        // 0x200: ADD V0, 1; 0x202: JP 0x200
        let mut app = app_with(&[0x70, 0x01, 0x12, 0x00]);
        app.cpu.regs.pc = 0x202;
        app.toggle_breakpoint();
        app.cpu.regs.pc = 0x200;
        app.run();
        app.tick(Duration::from_millis(100));
        assert!(!app.running);
        assert_eq!(app.cpu.regs.pc, 0x202);
        assert_eq!(app.cpu.regs.get(0), 1);
        assert!(app.status.contains("Breakpoint"));
    }

    #[test]
    fn test_timers_run_through_breakpoint_frame() {
        // 0x200: LD V0, 30; 0x202: LD DT, V0; 0x204: JP 0x204
        let mut app = app_with(&[0x60, 0x1E, 0xF0, 0x15, 0x12, 0x04]);
        app.cpu.regs.pc = 0x204;
        app.toggle_breakpoint();
        app.cpu.regs.pc = 0x200;
        app.run();
        app.tick(Duration::from_millis(100));
        assert!(!app.running);
        assert_eq!(app.cpu.regs.pc, 0x204);
        assert_eq!(app.cpu.timers.delay, 30 - 6);
    }

    #[test]
    fn test_error_stops_run() {
        let mut app = app_with(&[0x00, 0xEE]);
        app.run();
        app.tick(Duration::from_millis(50));
        assert!(!app.running);
        assert!(app.status.starts_with("Error"));
    }

    #[test]
    fn test_reset_keeps_breakpoints() {
        let mut app = app_with(&[0x6A, 0x05]);
        app.toggle_breakpoint();
        app.step();
        app.reset();
        assert_eq!(app.cpu.regs.pc, 0x200);
        assert_eq!(app.cpu.regs.get(0xA), 0);
        assert!(app.breakpoints.contains(&0x200));
    }

    #[test]
    fn test_disassembly_window() {
        let app = app_with(&[0x00, 0xE0, 0x12, 0x00]);
        let lines = app.get_disassembly(6);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0].0, 0x1FA);
        let current: Vec<_> = lines.iter().filter(|l| l.2).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].0, 0x200);
        assert_eq!(current[0].1, "CLS");
    }
}
