//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use super::app::{DebuggerApp, MEM_ROW_BYTES};
use super::screen::display_widget;
use crate::cpu::display::{HEIGHT, WIDTH};
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::CpuState;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(WIDTH as u16 + 2),
            Constraint::Min(30),
        ])
        .split(frame.area());

    // Left side: display, code and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEIGHT as u16 / 2 + 2),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    let title = if app.cpu.timers.is_beeping() { " Display ♪ " } else { " Display " };
    frame.render_widget(display_widget(&app.cpu.display, title, Color::Blue), left_chunks[0]);
    draw_disassembly(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: registers, stack, memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Min(6),
            Constraint::Length(5),
        ])
        .split(chunks[1]);

    draw_registers(frame, right_chunks[0], app);
    draw_stack(frame, right_chunks[1], app);
    draw_memory(frame, right_chunks[2], app);
    draw_help(frame, right_chunks[3]);
}

/// Draw disassembly view around the PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:03X}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw V0-VF, I, PC, timers and state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;

    let mut content: Vec<Line> = (0..4u8)
        .map(|row| {
            let spans: Vec<Span> = (0..4u8)
                .map(|col| {
                    let r = row * 4 + col;
                    let value = regs.get(r);
                    let style = if value == 0 {
                        Style::default().fg(Color::DarkGray)
                    } else {
                        Style::default().fg(Color::White)
                    };
                    Span::styled(format!("V{:X}={:02X} ", r, value), style)
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    content.push(Line::from(vec![
        Span::raw("I="),
        Span::styled(format!("{:03X}", regs.i), Style::default().fg(Color::White)),
        Span::raw("  PC="),
        Span::styled(format!("{:03X}", regs.pc), Style::default().fg(Color::Yellow)),
    ]));
    content.push(Line::from(vec![
        Span::raw("DT="),
        Span::styled(format!("{:02X}", app.cpu.timers.delay), Style::default().fg(Color::White)),
        Span::raw("  ST="),
        Span::styled(format!("{:02X}", app.cpu.timers.sound), Style::default().fg(Color::White)),
    ]));
    content.push(Line::from(vec![
        Span::raw("Cycles: "),
        Span::styled(format!("{}", app.cpu.cycles), Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        match app.cpu.state {
            CpuState::Running => Span::styled("Running", Style::default().fg(Color::Green)),
            CpuState::AwaitingKey { register } => Span::styled(
                format!("Key -> V{:X}", register),
                Style::default().fg(Color::Magenta),
            ),
        },
    ]));

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw the call stack, innermost frame first.
fn draw_stack(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let items: Vec<ListItem> = app.cpu.stack.frames()
        .iter()
        .rev()
        .enumerate()
        .map(|(depth, addr)| ListItem::new(format!("{:2}: {:03X}", depth, addr)))
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(format!(" Stack ({}/16) ", app.cpu.stack.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)));

    frame.render_widget(list, area);
}

/// Draw memory view as a hex dump.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll;
    let end = (start + visible_rows).min(MEMORY_SIZE / MEM_ROW_BYTES);
    let pc = app.cpu.regs.pc as usize;
    let i = app.cpu.regs.i as usize;

    let items: Vec<ListItem> = (start..end)
        .map(|row| {
            let base = row * MEM_ROW_BYTES;
            let bytes = app.cpu.mem.slice(base as u16, MEM_ROW_BYTES);
            let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
            let text = format!("{:03X}: {}", base, hex.join(" "));

            let range = base..base + MEM_ROW_BYTES;
            let style = if range.contains(&pc) {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if range.contains(&i) {
                Style::default().fg(Color::Cyan)
            } else if bytes.iter().any(|b| *b != 0) {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("n: Step  g: Run  p: Pause  b: Breakpoint"),
        Line::from("i: Reset  ↑↓: Scroll memory  Esc: Quit"),
        Line::from("Keypad: 1234 QWER ASDF ZXCV"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}
