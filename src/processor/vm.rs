//! The stack-machine intermediate language.
//!
//! `Command` is the only thing that flows between the compiler front end and
//! the lowering pass. Its `Display` impl is the textual VM format, and
//! `parse_program` reads that format back.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Constant,
    Local,
    Argument,
    This,
    That,
    Temp,
    Pointer,
    Static,
}

impl Segment {
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Local => "local",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Temp => "temp",
            Segment::Pointer => "pointer",
            Segment::Static => "static",
        }
    }
}

impl FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "constant" => Segment::Constant,
            "local" => Segment::Local,
            "argument" => Segment::Argument,
            "this" => Segment::This,
            "that" => Segment::That,
            "temp" => Segment::Temp,
            "pointer" => Segment::Pointer,
            "static" => Segment::Static,
            other => return Err(format!("unknown segment `{other}`")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    ShiftLeft,
    ShiftRight,
}

impl ArithmeticOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
            ArithmeticOp::ShiftLeft => "shiftleft",
            ArithmeticOp::ShiftRight => "shiftright",
        }
    }

    fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "add" => ArithmeticOp::Add,
            "sub" => ArithmeticOp::Sub,
            "neg" => ArithmeticOp::Neg,
            "eq" => ArithmeticOp::Eq,
            "gt" => ArithmeticOp::Gt,
            "lt" => ArithmeticOp::Lt,
            "and" => ArithmeticOp::And,
            "or" => ArithmeticOp::Or,
            "not" => ArithmeticOp::Not,
            "shiftleft" => ArithmeticOp::ShiftLeft,
            "shiftright" => ArithmeticOp::ShiftRight,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Arithmetic(ArithmeticOp),
    Push(Segment, u16),
    Pop(Segment, u16),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function { name: String, locals: u16 },
    Call { name: String, args: u16 },
    Return,
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Arithmetic(op) => write!(f, "{}", op.as_str()),
            Command::Push(seg, i) => write!(f, "push {} {}", seg.as_str(), i),
            Command::Pop(seg, i) => write!(f, "pop {} {}", seg.as_str(), i),
            Command::Label(l) => write!(f, "label {l}"),
            Command::Goto(l) => write!(f, "goto {l}"),
            Command::IfGoto(l) => write!(f, "if-goto {l}"),
            Command::Function { name, locals } => write!(f, "function {name} {locals}"),
            Command::Call { name, args } => write!(f, "call {name} {args}"),
            Command::Return => write!(f, "return"),
        }
    }
}

fn number(field: Option<&str>, what: &str) -> Result<u16, String> {
    let field = field.ok_or_else(|| format!("missing {what}"))?;
    field
        .parse::<u16>()
        .map_err(|_| format!("invalid {what} `{field}`"))
}

fn name(field: Option<&str>, what: &str) -> Result<String, String> {
    field
        .map(str::to_string)
        .ok_or_else(|| format!("missing {what}"))
}

fn memory_access(fields: &[&str], push: bool) -> Result<Command, String> {
    let segment: Segment = fields
        .get(1)
        .ok_or("missing segment")?
        .parse()?;
    let index = number(fields.get(2).copied(), "index")?;

    match segment {
        Segment::Constant if !push => return Err("cannot pop into the constant segment".into()),
        Segment::Constant if index > 32767 => {
            return Err(format!("constant {index} out of range"));
        }
        Segment::Temp if index > 7 => return Err(format!("temp index {index} out of range")),
        Segment::Pointer if index > 1 => {
            return Err(format!("pointer index {index} out of range"));
        }
        Segment::Local | Segment::Argument | Segment::This | Segment::That if index > 32767 => {
            return Err(format!("{} index {index} out of range", segment.as_str()));
        }
        _ => {}
    }

    Ok(if push {
        Command::Push(segment, index)
    } else {
        Command::Pop(segment, index)
    })
}

/// Parse one line of VM text. Blank and comment-only lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let code = match line.find("//") {
        Some(i) => &line[..i],
        None => line,
    };
    let fields: Vec<&str> = code.split_whitespace().collect();
    let Some(&head) = fields.first() else {
        return Ok(None);
    };

    let expected_len = match head {
        "push" | "pop" | "function" | "call" => 3,
        "label" | "goto" | "if-goto" => 2,
        "return" => 1,
        other if ArithmeticOp::from_mnemonic(other).is_some() => 1,
        other => return Err(format!("unknown command `{other}`")),
    };
    if fields.len() > expected_len {
        return Err(format!("unexpected trailing `{}`", fields[expected_len..].join(" ")));
    }

    let cmd = match head {
        "push" => memory_access(&fields, true)?,
        "pop" => memory_access(&fields, false)?,
        "label" => Command::Label(name(fields.get(1).copied(), "label")?),
        "goto" => Command::Goto(name(fields.get(1).copied(), "label")?),
        "if-goto" => Command::IfGoto(name(fields.get(1).copied(), "label")?),
        "function" => Command::Function {
            name: name(fields.get(1).copied(), "function name")?,
            locals: number(fields.get(2).copied(), "local count")?,
        },
        "call" => Command::Call {
            name: name(fields.get(1).copied(), "function name")?,
            args: number(fields.get(2).copied(), "argument count")?,
        },
        "return" => Command::Return,
        other => ArithmeticOp::from_mnemonic(other)
            .map(Command::Arithmetic)
            .ok_or_else(|| format!("unknown command `{other}`"))?,
    };
    Ok(Some(cmd))
}

/// Parse a whole VM file. Errors carry the 1-based line number.
pub fn parse_program(src: &str) -> Result<Vec<Command>, String> {
    let mut commands = Vec::new();
    for (i, line) in src.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(cmd)) => commands.push(cmd),
            Ok(None) => {}
            Err(e) => return Err(format!("line {}: {e}", i + 1)),
        }
    }
    Ok(commands)
}
