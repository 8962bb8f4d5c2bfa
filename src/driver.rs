//! Outer-loop helpers shared by the run drivers.
//!
//! The core never decides what happens after an execution error; a driver
//! picks an [`ErrorPolicy`]. The headless driver runs on logical time: one
//! timer tick per `hz / 60` instructions.

use crate::cpu::display::Surface;
use crate::cpu::keypad::Keypad;
use crate::cpu::timer::TIMER_HZ;
use crate::cpu::{Cpu, CpuError, StepOutcome};
use log::warn;
use std::str::FromStr;

/// Default instruction rate.
pub const DEFAULT_HZ: u32 = 700;

/// What a driver does when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop and report the error.
    #[default]
    Halt,
    /// Log a warning and continue past the offending word.
    Skip,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "halt" => Ok(ErrorPolicy::Halt),
            "skip" => Ok(ErrorPolicy::Skip),
            other => Err(format!("unknown error policy '{}' (expected halt or skip)", other)),
        }
    }
}

/// Step once, applying `policy` to any error.
///
/// Under [`ErrorPolicy::Skip`] a failed step reports `Ok(None)`; the PC has
/// already moved past the failing word.
pub fn step_with_policy(
    cpu: &mut Cpu,
    surface: &mut impl Surface,
    keypad: &mut impl Keypad,
    policy: ErrorPolicy,
) -> Result<Option<StepOutcome>, CpuError> {
    match cpu.step(surface, keypad) {
        Ok(outcome) => Ok(Some(outcome)),
        Err(e) if policy == ErrorPolicy::Skip => {
            warn!("skipping: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Instructions executed per 60 Hz timer tick at `hz`.
pub fn instructions_per_tick(hz: u32) -> u32 {
    (hz / TIMER_HZ).max(1)
}

/// Run without a terminal for at most `max_steps` steps.
///
/// Keys are re-read from `keypad` before every step. Returns the number of
/// instructions that completed.
pub fn run_headless(
    cpu: &mut Cpu,
    surface: &mut impl Surface,
    keypad: &mut impl Keypad,
    max_steps: u64,
    hz: u32,
    policy: ErrorPolicy,
) -> Result<u64, CpuError> {
    let per_tick = instructions_per_tick(hz) as u64;
    let start_cycles = cpu.cycles;

    for step in 1..=max_steps {
        cpu.sync_keys(keypad);
        step_with_policy(cpu, surface, keypad, policy)?;

        if step % per_tick == 0 {
            cpu.tick_timers();
        }
    }

    Ok(cpu.cycles - start_cycles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::display::NullSurface;
    use crate::cpu::keypad::NoKeys;

    #[test]
    fn test_policy_parse() {
        assert_eq!("halt".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Halt);
        assert_eq!("SKIP".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Skip);
        assert!("retry".parse::<ErrorPolicy>().is_err());
    }

    #[test]
    fn test_instructions_per_tick() {
        assert_eq!(instructions_per_tick(700), 11);
        assert_eq!(instructions_per_tick(60), 1);
        assert_eq!(instructions_per_tick(10), 1);
    }

    #[test]
    fn test_halt_policy_stops() {
        let mut cpu = Cpu::with_seed(1);
        cpu.load_program(&[0xFF, 0xFF, 0x12, 0x00]).unwrap();
        let result = run_headless(&mut cpu, &mut NullSurface, &mut NoKeys, 10, DEFAULT_HZ, ErrorPolicy::Halt);
        assert!(matches!(result, Err(CpuError::UnknownInstruction { word: 0xFFFF, pc: 0x200 })));
    }

    #[test]
    fn test_skip_policy_continues() {
        let mut cpu = Cpu::with_seed(1);
        // Bad word, then a loop on 0x202
        cpu.load_program(&[0xFF, 0xFF, 0x12, 0x02]).unwrap();
        let executed = run_headless(&mut cpu, &mut NullSurface, &mut NoKeys, 5, DEFAULT_HZ, ErrorPolicy::Skip).unwrap();
        assert_eq!(executed, 4);
        assert_eq!(cpu.regs.pc, 0x202);
    }

    #[test]
    fn test_headless_ticks_timers() {
        let mut cpu = Cpu::with_seed(1);
        // LD V0, 10; LD DT, V0; JP 0x204
        cpu.load_program(&[0x60, 0x0A, 0xF0, 0x15, 0x12, 0x04]).unwrap();
        run_headless(&mut cpu, &mut NullSurface, &mut NoKeys, 2 + 60, 60, ErrorPolicy::Halt).unwrap();
        assert_eq!(cpu.timers.delay, 0);
    }
}
