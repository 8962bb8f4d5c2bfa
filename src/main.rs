//! CHIP-8 VM - CLI Entry Point
//!
//! Commands:
//! - `chip8-vm run <program>` - Run a ROM or ASM file in the terminal
//! - `chip8-vm run --headless <program>` - Run without a terminal, print state
//! - `chip8-vm debug <program>` - Interactive debugger
//! - `chip8-vm asm <source>` - Assemble to a ROM image
//! - `chip8-vm disasm <rom>` - Disassemble a ROM image

use chip8::{Cpu, ErrorPolicy, NullSurface, Quirks, ScriptedKeypad};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;

#[derive(Parser)]
#[command(name = "chip8-vm")]
#[command(version = "0.1.0")]
#[command(about = "A CHIP-8 virtual machine with a terminal debugger, assembler and disassembler")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program
    Run {
        /// Path to the ROM or ASM file to execute
        program: String,
        /// Instructions per second
        #[arg(long, default_value_t = chip8::driver::DEFAULT_HZ)]
        hz: u32,
        /// Seed for the random number generator
        #[arg(long)]
        seed: Option<u64>,
        /// JSON file of instruction quirks
        #[arg(long)]
        quirks: Option<String>,
        /// What to do on an execution error: halt or skip
        #[arg(long, default_value = "halt")]
        on_error: ErrorPolicy,
        /// Run without a terminal and print the final state as JSON
        #[arg(long)]
        headless: bool,
        /// Maximum number of steps in headless mode
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Log every executed instruction
        #[arg(short, long)]
        trace: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the ROM or ASM file to debug
        program: String,
        /// Instructions per second while running
        #[arg(long, default_value_t = chip8::driver::DEFAULT_HZ)]
        hz: u32,
        /// Seed for the random number generator
        #[arg(long)]
        seed: Option<u64>,
        /// JSON file of instruction quirks
        #[arg(long)]
        quirks: Option<String>,
    },
    /// Assemble source to a ROM image
    Asm {
        /// Path to the source file
        source: String,
        /// Output ROM file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a ROM image to readable text
    Disasm {
        /// Path to the ROM file
        rom: String,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();

    let trace = matches!(cli.command, Some(Commands::Run { trace: true, .. }));
    let default_filter = if trace { "chip8=trace" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Some(Commands::Run { program, hz, seed, quirks, on_error, headless, max_cycles, .. }) => {
            let cpu = build_cpu(&program, seed, quirks.as_deref());
            if headless {
                run_headless(cpu, max_cycles, hz, on_error);
            } else {
                run_terminal(cpu, hz, on_error);
            }
        }
        Some(Commands::Debug { program, hz, seed, quirks }) => {
            let cpu = build_cpu(&program, seed, quirks.as_deref());
            debug_program(cpu, hz);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { rom }) => {
            disassemble_file(&rom);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("CHIP-8 VM v0.1.0");
            println!("An interpreter for the CHIP-8 instruction set");
            println!();
            println!("Use --help for available commands");
        }
    }
}

/// Read a ROM, or assemble a `.asm` file.
fn read_program(path: &str) -> Vec<u8> {
    if path.ends_with(".asm") {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to read file: {}", e);
                std::process::exit(1);
            }
        };

        match chip8::assemble(&source) {
            Ok(bytes) => {
                info!("assembled {} bytes from {}", bytes.len(), path);
                bytes
            }
            Err(e) => {
                eprintln!("❌ Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match chip8::load_rom(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("❌ Failed to load ROM: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn build_cpu(path: &str, seed: Option<u64>, quirks_path: Option<&str>) -> Cpu {
    let program = read_program(path);

    let quirks = match quirks_path {
        Some(p) => match Quirks::load(p) {
            Ok(q) => q,
            Err(e) => {
                eprintln!("❌ Failed to load quirks: {}", e);
                std::process::exit(1);
            }
        },
        None => Quirks::default(),
    };

    let cpu = match seed {
        Some(seed) => Cpu::with_seed(seed),
        None => Cpu::new(),
    };
    let mut cpu = cpu.with_quirks(quirks);

    if let Err(e) = cpu.load_program(&program) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }
    cpu
}

fn run_headless(mut cpu: Cpu, max_cycles: u64, hz: u32, on_error: ErrorPolicy) {
    let mut keypad = ScriptedKeypad::new();
    let result = chip8::run_headless(&mut cpu, &mut NullSurface, &mut keypad, max_cycles, hz, on_error);

    for row in cpu.display.rows() {
        let line: String = row.iter().map(|on| if *on { '█' } else { '·' }).collect();
        eprintln!("{}", line);
    }

    match serde_json::to_string_pretty(&cpu.snapshot()) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("❌ Failed to serialize state: {}", e),
    }

    if let Err(e) = result {
        eprintln!("❌ CPU error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "tui")]
fn run_terminal(mut cpu: Cpu, hz: u32, on_error: ErrorPolicy) {
    let config = chip8::RunConfig { hz, on_error };
    if let Err(e) = chip8::run_terminal(&mut cpu, &config) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn run_terminal(_cpu: Cpu, _hz: u32, _on_error: ErrorPolicy) {
    eprintln!("❌ Built without the tui feature; use --headless");
    std::process::exit(1);
}

#[cfg(feature = "tui")]
fn debug_program(cpu: Cpu, hz: u32) {
    if let Err(e) = chip8::run_debugger(cpu, hz) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_cpu: Cpu, _hz: u32) {
    eprintln!("❌ Built without the tui feature");
    std::process::exit(1);
}

fn assemble_file(source_path: &str, output: Option<String>) {
    let out_path = output.unwrap_or_else(|| {
        source_path.strip_suffix(".asm").unwrap_or(source_path).to_string() + ".ch8"
    });

    println!("📝 Assembling: {} → {}", source_path, out_path);

    // Read source
    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    // Assemble
    let program = match chip8::assemble(&source) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Assembled {} bytes", program.len());

    if let Err(e) = chip8::save_rom(&out_path, &program) {
        eprintln!("❌ Failed to save ROM: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(rom_path: &str) {
    let program = match chip8::load_rom(rom_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Failed to load ROM: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", chip8::disassemble(&program));
}

fn run_self_test() {
    use chip8::cpu::display::RecordingSurface;
    use chip8::cpu::timer::Ticker;
    use chip8::{CpuError, NoKeys, StepOutcome};
    use std::time::Duration;

    println!("━━━ CHIP-8 VM Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    fn machine(program: &[u8]) -> Result<Cpu, String> {
        let mut cpu = Cpu::with_seed(0);
        cpu.load_program(program).map_err(|e| e.to_string())?;
        Ok(cpu)
    }

    fn steps(cpu: &mut Cpu, n: u64) -> Result<(), String> {
        cpu.run_limited(n, &mut NullSurface, &mut NoKeys)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    let mut check = |name: &str, result: Result<bool, String>| {
        print!("{}... ", name);
        match result {
            Ok(true) => {
                println!("✓");
                passed += 1;
            }
            Ok(false) => {
                println!("✗");
                failed += 1;
            }
            Err(e) => {
                println!("✗ ({})", e);
                failed += 1;
            }
        }
    };

    check("Load and add immediate (6A05, 7A03)", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0x6A, 0x05, 0x7A, 0x03])?;
        steps(&mut cpu, 2)?;
        Ok(cpu.regs.get(0xA) == 8 && cpu.regs.flag() == 0)
    })());

    check("Store zeroed register (A205, F055)", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0xA2, 0x05, 0xF0, 0x55])?;
        steps(&mut cpu, 2)?;
        Ok(cpu.mem.read(0x205) == 0)
    })());

    check("Jump to self (1200)", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0x12, 0x00])?;
        steps(&mut cpu, 3)?;
        Ok(cpu.regs.pc == 0x200)
    })());

    check("Add with carry (8014)", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0x60, 0xFF, 0x61, 0x02, 0x80, 0x14])?;
        steps(&mut cpu, 3)?;
        Ok(cpu.regs.get(0) == 1 && cpu.regs.flag() == 1)
    })());

    check("Subtract without borrow (8015)", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0x60, 0x05, 0x61, 0x05, 0x80, 0x15])?;
        steps(&mut cpu, 3)?;
        Ok(cpu.regs.get(0) == 0 && cpu.regs.flag() == 1)
    })());

    check("Shift right (8016)", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0x60, 0x03, 0x80, 0x16])?;
        steps(&mut cpu, 2)?;
        Ok(cpu.regs.get(0) == 1 && cpu.regs.flag() == 1)
    })());

    check("Sprite drawn twice erases itself", (|| -> Result<bool, String> {
        // LD F, V0; DRW V0, V0, 5; DRW V0, V0, 5
        let mut cpu = machine(&[0xF0, 0x29, 0xD0, 0x05, 0xD0, 0x05])?;
        let mut surface = RecordingSurface::new();
        cpu.run_limited(2, &mut surface, &mut NoKeys).map_err(|e| e.to_string())?;
        let drawn = !cpu.display.is_blank() && cpu.regs.flag() == 0;
        cpu.run_limited(1, &mut surface, &mut NoKeys).map_err(|e| e.to_string())?;
        Ok(drawn && cpu.display.is_blank() && cpu.regs.flag() == 1 && surface.presents() == 2)
    })());

    check("Call then return", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0x22, 0x04, 0x00, 0x00, 0x00, 0xEE])?;
        steps(&mut cpu, 2)?;
        Ok(cpu.regs.pc == 0x202 && cpu.stack.is_empty())
    })());

    check("Return on empty stack is an error", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0x00, 0xEE])?;
        Ok(matches!(cpu.step(&mut NullSurface, &mut NoKeys), Err(CpuError::StackFault(_))))
    })());

    check("Register block store then load", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0xA4, 0x00, 0xF3, 0x55, 0x60, 0x00, 0x63, 0x00, 0xF3, 0x65])?;
        cpu.regs.v[..4].copy_from_slice(&[9, 8, 7, 6]);
        steps(&mut cpu, 5)?;
        Ok(cpu.regs.v[..4] == [9, 8, 7, 6])
    })());

    check("Clear screen", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0x00, 0xE0])?;
        cpu.display.toggle(3, 3);
        cpu.regs.set(2, 42);
        steps(&mut cpu, 1)?;
        Ok(cpu.display.is_blank() && cpu.regs.get(2) == 42)
    })());

    check("Wait for key", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0xF5, 0x0A])?;
        let mut keypad = ScriptedKeypad::new();
        let first = cpu.step(&mut NullSurface, &mut keypad).map_err(|e| e.to_string())?;
        let blocked = first == StepOutcome::AwaitingInput && cpu.regs.pc == 0x200;
        keypad.press(0x9);
        cpu.step(&mut NullSurface, &mut keypad).map_err(|e| e.to_string())?;
        Ok(blocked && cpu.regs.get(5) == 0x9 && cpu.regs.pc == 0x202)
    })());

    check("Timers stop at zero", (|| -> Result<bool, String> {
        let mut cpu = machine(&[0x12, 0x00])?;
        cpu.timers.delay = 1;
        cpu.tick_timers();
        cpu.tick_timers();
        Ok(cpu.timers.delay == 0)
    })());

    check("60 ticks per simulated second", (|| -> Result<bool, String> {
        let mut ticker = Ticker::default();
        let ticks: u32 = [7u64, 333, 120, 40, 500]
            .iter()
            .map(|ms| ticker.advance(Duration::from_millis(*ms)))
            .sum();
        Ok(ticks == 60)
    })());

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
