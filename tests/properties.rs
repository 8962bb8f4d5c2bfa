use chip8::asm::disasm::disassemble_instruction;
use chip8::cpu::decode::{decode, encode, Instruction};
use chip8::cpu::timer::Ticker;
use chip8::{assemble, Cpu, NoKeys, NullSurface};
use proptest::prelude::*;
use std::time::Duration;

fn machine(words: &[u16]) -> Cpu {
    let program: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    let mut cpu = Cpu::with_seed(0);
    cpu.load_program(&program).unwrap();
    cpu
}

fn run(cpu: &mut Cpu, steps: u64) {
    cpu.run_limited(steps, &mut NullSurface, &mut NoKeys).unwrap();
}

fn alu(op: u16, x: u8, y: u8) -> u16 {
    0x8000 | (x as u16) << 8 | (y as u16) << 4 | op
}

proptest! {
    #[test]
    fn skip_immediate_advances_by_condition(x in 0u8..16, vx in any::<u8>(), nn in any::<u8>()) {
        let word = 0x3000 | (x as u16) << 8 | nn as u16;
        let mut cpu = machine(&[word, word | 0x1000]);
        cpu.regs.set(x, vx);

        run(&mut cpu, 1);
        prop_assert_eq!(cpu.regs.pc, 0x202 + if vx == nn { 2 } else { 0 });

        // 4XNN is the complement
        let mut cpu = machine(&[word + 0x1000]);
        cpu.regs.set(x, vx);
        run(&mut cpu, 1);
        prop_assert_eq!(cpu.regs.pc, 0x202 + if vx != nn { 2 } else { 0 });
    }

    #[test]
    fn skip_register_advances_by_condition(x in 0u8..16, y in 0u8..16, vx in any::<u8>(), vy in any::<u8>()) {
        let eq = 0x5000 | (x as u16) << 8 | (y as u16) << 4;
        for (word, expect_skip) in [(eq, true), ((eq & 0x0FFF) | 0x9000, false)] {
            let mut cpu = machine(&[word]);
            cpu.regs.set(x, vx);
            cpu.regs.set(y, vy);
            let equal = cpu.regs.get(x) == cpu.regs.get(y);
            run(&mut cpu, 1);
            prop_assert_eq!(cpu.regs.pc, 0x202 + if equal == expect_skip { 2 } else { 0 });
        }
    }

    #[test]
    fn add_sets_carry(x in 0u8..15, y in 0u8..15, a in any::<u8>(), b in any::<u8>()) {
        prop_assume!(x != y);
        let mut cpu = machine(&[alu(0x4, x, y)]);
        cpu.regs.set(x, a);
        cpu.regs.set(y, b);
        run(&mut cpu, 1);
        prop_assert_eq!(cpu.regs.get(x), a.wrapping_add(b));
        prop_assert_eq!(cpu.regs.flag(), (a as u16 + b as u16 > 255) as u8);
    }

    #[test]
    fn sub_sets_not_borrow(x in 0u8..15, y in 0u8..15, a in any::<u8>(), b in any::<u8>()) {
        prop_assume!(x != y);
        let mut cpu = machine(&[alu(0x5, x, y)]);
        cpu.regs.set(x, a);
        cpu.regs.set(y, b);
        run(&mut cpu, 1);
        prop_assert_eq!(cpu.regs.get(x), a.wrapping_sub(b));
        prop_assert_eq!(cpu.regs.flag(), (a >= b) as u8);

        let mut cpu = machine(&[alu(0x7, x, y)]);
        cpu.regs.set(x, a);
        cpu.regs.set(y, b);
        run(&mut cpu, 1);
        prop_assert_eq!(cpu.regs.get(x), b.wrapping_sub(a));
        prop_assert_eq!(cpu.regs.flag(), (b >= a) as u8);
    }

    #[test]
    fn shifts_report_shifted_bit(x in 0u8..15, a in any::<u8>()) {
        let mut cpu = machine(&[alu(0x6, x, x), alu(0xE, x, x)]);
        cpu.regs.set(x, a);
        run(&mut cpu, 1);
        prop_assert_eq!(cpu.regs.get(x), a >> 1);
        prop_assert_eq!(cpu.regs.flag(), a & 1);

        cpu.regs.set(x, a);
        run(&mut cpu, 1);
        prop_assert_eq!(cpu.regs.get(x), a << 1);
        prop_assert_eq!(cpu.regs.flag(), a >> 7);
    }

    #[test]
    fn sprite_drawn_twice_restores_display(
        sprite in proptest::collection::vec(1u8..=255, 1..16),
        vx in any::<u8>(),
        vy in any::<u8>(),
    ) {
        let n = sprite.len() as u16;
        let mut cpu = machine(&[0xD010 | n, 0xD010 | n]);
        for (row, bits) in sprite.iter().enumerate() {
            cpu.mem.write(0x400 + row as u16, *bits);
        }
        cpu.regs.i = 0x400;
        cpu.regs.set(0, vx);
        cpu.regs.set(1, vy);

        run(&mut cpu, 1);
        prop_assert!(!cpu.display.is_blank());
        prop_assert_eq!(cpu.regs.flag(), 0);

        run(&mut cpu, 1);
        prop_assert!(cpu.display.is_blank());
        prop_assert_eq!(cpu.regs.flag(), 1);
    }

    #[test]
    fn call_then_return_restores_pc(target in 0x204u16..0xFFE) {
        let target = target & !1;
        let mut cpu = machine(&[0x2000 | target]);
        cpu.mem.write(target, 0x00);
        cpu.mem.write(target + 1, 0xEE);
        run(&mut cpu, 2);
        prop_assert_eq!(cpu.regs.pc, 0x202);
        prop_assert!(cpu.stack.is_empty());
    }

    #[test]
    fn register_block_roundtrip(x in 0u8..16, values in any::<[u8; 16]>(), i in 0x300u16..0xFE0) {
        let mut cpu = machine(&[0xF055 | (x as u16) << 8, 0xF065 | (x as u16) << 8]);
        cpu.regs.v = values;
        cpu.regs.i = i;
        run(&mut cpu, 1);
        cpu.regs.v = [0; 16];
        run(&mut cpu, 1);
        prop_assert_eq!(&cpu.regs.v[..=x as usize], &values[..=x as usize]);
        prop_assert!(cpu.regs.v[x as usize + 1..].iter().all(|v| *v == 0));
        prop_assert_eq!(cpu.regs.i, i);
    }

    #[test]
    fn bcd_digits(value in any::<u8>()) {
        let mut cpu = machine(&[0xA400, 0xF333]);
        cpu.regs.set(3, value);
        run(&mut cpu, 2);
        let digits = cpu.mem.slice(0x400, 3);
        prop_assert_eq!(digits[0] as u16 * 100 + digits[1] as u16 * 10 + digits[2] as u16, value as u16);
    }

    #[test]
    fn random_respects_mask(seed in any::<u64>(), nn in any::<u8>()) {
        let mut cpu = Cpu::with_seed(seed);
        cpu.load_program(&[0xC0, nn]).unwrap();
        run(&mut cpu, 1);
        prop_assert_eq!(cpu.regs.get(0) & !nn, 0);
    }

    #[test]
    fn decode_is_total_and_encodes_back(word in any::<u16>()) {
        prop_assert_eq!(encode(&decode(word)), word);
    }

    #[test]
    fn disassembly_assembles_back(word in any::<u16>()) {
        let text = disassemble_instruction(word);
        let bytes = assemble(&text).unwrap();
        prop_assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]), word);
    }

    #[test]
    fn ticker_counts_sixty_per_second(cuts in proptest::collection::vec(0u64..=1000, 0..20)) {
        let mut cuts = cuts;
        cuts.push(0);
        cuts.push(1000);
        cuts.sort_unstable();

        let mut ticker = Ticker::new(60);
        let ticks: u32 = cuts
            .windows(2)
            .map(|w| ticker.advance(Duration::from_millis(w[1] - w[0])))
            .sum();
        prop_assert_eq!(ticks, 60);
    }
}

#[test]
fn unknown_words_decode_as_unknown() {
    for word in [0x5121u16, 0x9AB1, 0x8008, 0xE000, 0xF0FF] {
        assert_eq!(decode(word), Instruction::Unknown(word));
    }
}
