//! Two-pass Hack assembler.
//!
//! Pass one records the ROM address of every `(LABEL)`; pass two resolves
//! `@symbol` against predefined symbols, then labels, and finally hands out
//! fresh RAM cells from 16 upward for anything still unknown.

use std::collections::HashMap;

use crate::error::{AsmError, AsmErrorKind};

const FIRST_VARIABLE: u16 = 16;
const SCREEN: u16 = 0x4000;
const MAX_CONSTANT: u32 = 0x7fff;

const C_PREFIX: u16 = 0b111;
const SHIFT_PREFIX: u16 = 0b101;

const PREDEFINED: [(&str, u16); 7] = [
    ("SP", 0),
    ("LCL", 1),
    ("ARG", 2),
    ("THIS", 3),
    ("THAT", 4),
    ("SCREEN", SCREEN),
    ("KBD", 0x6000),
];

/// `a c1..c6` bits of every standard computation.
const COMP: [(&str, u16); 37] = [
    ("0", 0b0101010),
    ("1", 0b0111111),
    ("-1", 0b0111010),
    ("D", 0b0001100),
    ("A", 0b0110000),
    ("!D", 0b0001101),
    ("!A", 0b0110001),
    ("-D", 0b0001111),
    ("-A", 0b0110011),
    ("D+1", 0b0011111),
    ("A+1", 0b0110111),
    ("D-1", 0b0001110),
    ("A-1", 0b0110010),
    ("D+A", 0b0000010),
    ("A+D", 0b0000010),
    ("D-A", 0b0010011),
    ("A-D", 0b0000111),
    ("D&A", 0b0000000),
    ("A&D", 0b0000000),
    ("D|A", 0b0010101),
    ("A|D", 0b0010101),
    ("M", 0b1110000),
    ("!M", 0b1110001),
    ("-M", 0b1110011),
    ("M+1", 0b1110111),
    ("M-1", 0b1110010),
    ("D+M", 0b1000010),
    ("M+D", 0b1000010),
    ("D-M", 0b1010011),
    ("M-D", 0b1000111),
    ("D&M", 0b1000000),
    ("M&D", 0b1000000),
    ("D|M", 0b1010101),
    ("M|D", 0b1010101),
    ("1+D", 0b0011111),
    ("1+A", 0b0110111),
    ("1+M", 0b1110111),
];

/// Extended shift computations, encoded under the `101` prefix.
const SHIFT_COMP: [(&str, u16); 6] = [
    ("A<<", 0b0100000),
    ("D<<", 0b0110000),
    ("M<<", 0b1100000),
    ("A>>", 0b0000000),
    ("D>>", 0b0010000),
    ("M>>", 0b1000000),
];

const JUMP: [(&str, u16); 7] = [
    ("JGT", 0b001),
    ("JEQ", 0b010),
    ("JGE", 0b011),
    ("JLT", 0b100),
    ("JNE", 0b101),
    ("JLE", 0b110),
    ("JMP", 0b111),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Instruction<'a> {
    Address(&'a str),
    Compute {
        dest: &'a str,
        comp: &'a str,
        jump: &'a str,
    },
    Label(&'a str),
}

/// One significant source line with comments and all whitespace removed.
struct SourceLine {
    number: usize,
    text: String,
}

fn clean_lines(src: &str) -> Vec<SourceLine> {
    src.lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let code = raw.split("//").next().unwrap_or("");
            let text: String = code.chars().filter(|c| !c.is_whitespace()).collect();
            (!text.is_empty()).then_some(SourceLine { number: i + 1, text })
        })
        .collect()
}

fn is_symbol(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if !c.is_ascii_digit() => {}
        _ => return false,
    }
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | ':'))
}

fn classify(line: &SourceLine) -> Result<Instruction<'_>, AsmError> {
    let text = line.text.as_str();
    if let Some(rest) = text.strip_prefix('(') {
        return match rest.strip_suffix(')') {
            Some(label) if is_symbol(label) => Ok(Instruction::Label(label)),
            _ => Err(AsmError::new(
                line.number,
                AsmErrorKind::MalformedLabel(text.to_string()),
            )),
        };
    }
    if let Some(value) = text.strip_prefix('@') {
        return Ok(Instruction::Address(value));
    }

    let (dest, rest) = text.split_once('=').unwrap_or(("", text));
    let (comp, jump) = rest.split_once(';').unwrap_or((rest, ""));
    Ok(Instruction::Compute { dest, comp, jump })
}

fn encode_dest(dest: &str, line: usize) -> Result<u16, AsmError> {
    let mut bits = 0u16;
    for c in dest.chars() {
        let bit = match c {
            'A' => 0b100,
            'D' => 0b010,
            'M' => 0b001,
            _ => return Err(AsmError::new(line, AsmErrorKind::UnknownDest(dest.into()))),
        };
        if bits & bit != 0 {
            return Err(AsmError::new(line, AsmErrorKind::UnknownDest(dest.into())));
        }
        bits |= bit;
    }
    Ok(bits)
}

fn encode_jump(jump: &str, line: usize) -> Result<u16, AsmError> {
    if jump.is_empty() {
        return Ok(0);
    }
    JUMP.iter()
        .find(|(m, _)| *m == jump)
        .map(|(_, bits)| *bits)
        .ok_or_else(|| AsmError::new(line, AsmErrorKind::UnknownJump(jump.into())))
}

/// Prefix and `a c1..c6` bits for a computation.
fn encode_comp(comp: &str, line: usize) -> Result<(u16, u16), AsmError> {
    let lookup = |table: &[(&str, u16)]| table.iter().find(|(m, _)| *m == comp).map(|(_, b)| *b);
    lookup(&COMP)
        .map(|bits| (C_PREFIX, bits))
        .or_else(|| lookup(&SHIFT_COMP).map(|bits| (SHIFT_PREFIX, bits)))
        .ok_or_else(|| AsmError::new(line, AsmErrorKind::UnknownComp(comp.into())))
}

#[derive(Debug)]
struct Symbols {
    table: HashMap<String, u16>,
    next_variable: u16,
}

impl Symbols {
    fn new() -> Self {
        let mut table: HashMap<String, u16> = PREDEFINED
            .iter()
            .map(|(name, addr)| (name.to_string(), *addr))
            .collect();
        for r in 0..16 {
            table.insert(format!("R{r}"), r);
        }
        Self {
            table,
            next_variable: FIRST_VARIABLE,
        }
    }

    /// Known address of `symbol`, or a fresh variable cell below `SCREEN`.
    fn resolve(&mut self, symbol: &str, line: usize) -> Result<u16, AsmError> {
        if let Some(addr) = self.table.get(symbol) {
            return Ok(*addr);
        }
        let addr = self.next_variable;
        if addr >= SCREEN {
            return Err(AsmError::new(
                line,
                AsmErrorKind::OutOfVariables(symbol.to_string()),
            ));
        }
        self.table.insert(symbol.to_string(), addr);
        self.next_variable = addr + 1;
        Ok(addr)
    }
}

/// Assemble a whole `.asm` source into machine words.
pub fn assemble(src: &str) -> Result<Vec<u16>, AsmError> {
    let lines = clean_lines(src);
    let mut symbols = Symbols::new();
    let mut program = Vec::with_capacity(lines.len());

    // first pass: label addresses
    let mut rom = 0u16;
    for line in &lines {
        let instruction = classify(line)?;
        if u32::from(rom) > MAX_CONSTANT {
            return Err(AsmError::new(line.number, AsmErrorKind::ProgramTooLarge));
        }
        match instruction {
            Instruction::Label(label) => {
                if symbols.table.insert(label.to_string(), rom).is_some() {
                    return Err(AsmError::new(
                        line.number,
                        AsmErrorKind::DuplicateLabel(label.to_string()),
                    ));
                }
            }
            instruction => {
                program.push((line.number, instruction));
                rom = rom
                    .checked_add(1)
                    .ok_or_else(|| AsmError::new(line.number, AsmErrorKind::ProgramTooLarge))?;
            }
        }
    }

    // second pass: encode
    let mut words = Vec::with_capacity(program.len());
    for (number, instruction) in program {
        let word = match instruction {
            Instruction::Address(value) => encode_address(value, number, &mut symbols)?,
            Instruction::Compute { dest, comp, jump } => {
                let (prefix, comp_bits) = encode_comp(comp, number)?;
                prefix << 13
                    | comp_bits << 6
                    | encode_dest(dest, number)? << 3
                    | encode_jump(jump, number)?
            }
            Instruction::Label(_) => continue,
        };
        words.push(word);
    }
    Ok(words)
}

fn encode_address(value: &str, line: usize, symbols: &mut Symbols) -> Result<u16, AsmError> {
    if value.starts_with(|c: char| c.is_ascii_digit()) {
        return value
            .parse::<u32>()
            .ok()
            .filter(|v| *v <= MAX_CONSTANT)
            .map(|v| v as u16)
            .ok_or_else(|| AsmError::new(line, AsmErrorKind::ConstantOutOfRange(value.into())));
    }
    if !is_symbol(value) {
        return Err(AsmError::new(
            line,
            AsmErrorKind::MalformedLabel(value.to_string()),
        ));
    }
    symbols.resolve(value, line)
}

/// `.hack` text: one 16-digit binary string per instruction.
pub fn to_hack_text(words: &[u16]) -> String {
    words.iter().map(|w| format!("{w:016b}\n")).collect()
}
