//! Terminal presentation of the CHIP-8 display.

use crate::cpu::display::{FrameBuffer, Surface, HEIGHT, WIDTH};
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use std::io::stdout;

/// Render the frame buffer as text, two pixel rows per line.
pub fn half_block_rows(fb: &FrameBuffer) -> Vec<String> {
    (0..HEIGHT)
        .step_by(2)
        .map(|y| {
            (0..WIDTH)
                .map(|x| match (fb.get(x, y), fb.get(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect()
        })
        .collect()
}

/// Bordered widget showing the display. Takes `WIDTH + 2` by
/// `HEIGHT / 2 + 2` cells.
pub fn display_widget<'a>(fb: &FrameBuffer, title: &'a str, color: Color) -> Paragraph<'a> {
    let lines: Vec<Line> = half_block_rows(fb).into_iter().map(Line::from).collect();
    Paragraph::new(lines)
        .style(Style::default().fg(Color::Green))
        .block(Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color)))
}

/// Surface for terminal drivers.
///
/// The terminal is redrawn from the frame buffer, so this only tracks
/// whether a `present` has arrived since the last redraw.
#[derive(Debug, Clone)]
pub struct TerminalSurface {
    dirty: bool,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self { dirty: true }
    }

    /// Whether a redraw is due; clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for TerminalSurface {
    fn clear(&mut self) {}
    fn set_pixel(&mut self, _x: u8, _y: u8) {}
    fn clear_pixel(&mut self, _x: u8, _y: u8) {}

    fn present(&mut self) {
        self.dirty = true;
    }
}

/// Raw mode and the alternate screen, restored on drop (including unwinds).
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> std::io::Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = stdout().execute(EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}
