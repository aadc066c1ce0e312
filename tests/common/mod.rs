//! Minimal Hack CPU used to execute generated machine code in tests.

#![allow(dead_code)]

use hack_toolchain::config::Config;
use hack_toolchain::model::SourceUnit;
use hack_toolchain::processor;
use std::path::PathBuf;

pub const RAM_SIZE: usize = 32768;

pub struct Cpu {
    pub rom: Vec<u16>,
    pub ram: Vec<i16>,
    pub a: i16,
    pub d: i16,
    pub pc: usize,
}

impl Cpu {
    pub fn new(rom: Vec<u16>) -> Self {
        Self {
            rom,
            ram: vec![0; RAM_SIZE],
            a: 0,
            d: 0,
            pc: 0,
        }
    }

    fn m(&self) -> i16 {
        self.ram[self.a as u16 as usize % RAM_SIZE]
    }

    fn alu(&self, word: u16) -> i16 {
        let bit = |n: u16| word >> n & 1 == 1;
        let mut x = self.d;
        let mut y = if bit(12) { self.m() } else { self.a };
        if bit(11) {
            x = 0;
        }
        if bit(10) {
            x = !x;
        }
        if bit(9) {
            y = 0;
        }
        if bit(8) {
            y = !y;
        }
        let mut out = if bit(7) { x.wrapping_add(y) } else { x & y };
        if bit(6) {
            out = !out;
        }
        out
    }

    fn shift(&self, word: u16) -> i16 {
        let bit = |n: u16| word >> n & 1 == 1;
        let src = if bit(10) {
            self.d
        } else if bit(12) {
            self.m()
        } else {
            self.a
        };
        if bit(11) { src.wrapping_shl(1) } else { src >> 1 }
    }

    /// Execute one instruction.
    pub fn step(&mut self) {
        let word = self.rom[self.pc];
        if word & 0x8000 == 0 {
            self.a = word as i16;
            self.pc += 1;
            return;
        }

        let out = if word >> 13 == 0b111 {
            self.alu(word)
        } else {
            self.shift(word)
        };
        let address = self.a as u16 as usize % RAM_SIZE;
        if word >> 3 & 1 == 1 {
            self.ram[address] = out;
        }
        if word >> 5 & 1 == 1 {
            self.a = out;
        }
        if word >> 4 & 1 == 1 {
            self.d = out;
        }

        let jump = (word & 0b100 != 0 && out < 0)
            || (word & 0b010 != 0 && out == 0)
            || (word & 0b001 != 0 && out > 0);
        self.pc = if jump { self.a as u16 as usize } else { self.pc + 1 };
    }

    /// Run until the program counter leaves ROM or `max_steps` is spent.
    pub fn run(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            if self.pc >= self.rom.len() {
                return;
            }
            self.step();
        }
    }
}

pub fn unit(name: &str, source: &str) -> SourceUnit {
    SourceUnit {
        name: name.to_string(),
        path: PathBuf::from(format!("{name}.vm")),
        source: source.to_string(),
    }
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).unwrap()
}

/// Lower and assemble `units`, ready to run.
pub fn load_vm(units: &[SourceUnit], config: &Config) -> Cpu {
    let asm = processor::translate(units, config).unwrap();
    let words = processor::assembler::assemble(&asm).unwrap();
    Cpu::new(words)
}
