//! Real-time terminal run driver.
//!
//! Instructions run at the configured rate and the timers at 60 Hz, both
//! paced by wall time through [`Ticker`]s. Keyboard events feed a
//! [`TerminalKeypad`]. Esc quits.

use super::keypad::TerminalKeypad;
use super::screen::{display_widget, TerminalGuard, TerminalSurface};
use crate::cpu::display::{HEIGHT, WIDTH};
use crate::cpu::timer::{Ticker, TIMER_HZ};
use crate::cpu::{Cpu, CpuError};
use crate::driver::{step_with_policy, ErrorPolicy, DEFAULT_HZ};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::info;
use ratatui::{prelude::*, widgets::Paragraph};
use std::io::stdout;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest stretch of wall time credited in one loop iteration. Keeps a
/// stalled terminal from causing a burst of instructions afterwards.
const MAX_FRAME_TIME: Duration = Duration::from_millis(100);

/// Settings for [`run_terminal`].
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// Instructions per second.
    pub hz: u32,
    /// What to do when a step fails.
    pub on_error: ErrorPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            hz: DEFAULT_HZ,
            on_error: ErrorPolicy::Halt,
        }
    }
}

/// Run a loaded machine in the terminal until Esc or an error.
pub fn run_terminal(cpu: &mut Cpu, config: &RunConfig) -> Result<(), RunError> {
    let _guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut keypad = TerminalKeypad::new();
    let mut surface = TerminalSurface::new();
    let mut clock = Ticker::new(config.hz);
    let mut timers = Ticker::new(TIMER_HZ);
    let mut last = Instant::now();
    let title = format!(" CHIP-8 @ {} Hz ", config.hz);

    info!("running at {} Hz, on error: {:?}", config.hz, config.on_error);

    loop {
        let mut redraw = false;

        // Input
        let timeout = clock.remaining().min(timers.remaining());
        if event::poll(timeout)? {
            loop {
                match event::read()? {
                    Event::Key(key) if key.code == KeyCode::Esc && key.kind == KeyEventKind::Press => {
                        info!("quit after {} cycles", cpu.cycles);
                        return Ok(());
                    }
                    Event::Key(key) => {
                        keypad.handle(&key, Instant::now());
                    }
                    Event::Resize(..) => redraw = true,
                    _ => {}
                }
                if !event::poll(Duration::ZERO)? {
                    break;
                }
            }
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last).min(MAX_FRAME_TIME);
        last = now;

        keypad.refresh(now);
        cpu.sync_keys(&keypad);

        // Execute
        for _ in 0..clock.advance(elapsed) {
            step_with_policy(cpu, &mut surface, &mut keypad, config.on_error)?;
        }

        // Timers
        let ticks = timers.advance(elapsed);
        for _ in 0..ticks {
            cpu.tick_timers();
        }

        if surface.take_dirty() || redraw || ticks > 0 {
            terminal.draw(|frame| draw(frame, cpu, &title))?;
        }
    }
}

fn draw(frame: &mut Frame, cpu: &Cpu, title: &str) {
    let area = frame.area();
    let screen = Rect::new(
        area.x,
        area.y,
        (WIDTH as u16 + 2).min(area.width),
        (HEIGHT as u16 / 2 + 2).min(area.height),
    );
    frame.render_widget(display_widget(&cpu.display, title, Color::Cyan), screen);

    if area.height > screen.height {
        let line = Rect::new(area.x, screen.bottom(), screen.width, 1);
        let beep = if cpu.timers.is_beeping() { "  ♪" } else { "" };
        let waiting = if cpu.is_awaiting_input() { "  waiting for key" } else { "" };
        let status = format!(
            " PC {:03X}  DT {:02X}  ST {:02X}{}{}  Esc: quit",
            cpu.regs.pc, cpu.timers.delay, cpu.timers.sound, beep, waiting
        );
        frame.render_widget(Paragraph::new(status).style(Style::default().fg(Color::DarkGray)), line);
    }
}

/// Errors that end a terminal run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Cpu(#[from] CpuError),
}
