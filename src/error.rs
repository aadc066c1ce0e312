//! Error values produced by the compiler front end and the assembler.
//!
//! VM parsing and lowering report plain `String`s with a line number; the
//! driver wraps everything into `anyhow::Error`.

use std::fmt::{Display, Formatter};

/// Fatal failure while tokenizing or translating one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Name of the unit (class file stem) being compiled.
    pub unit: String,
    /// Index of the offending token in the unit's token sequence.
    pub position: usize,
    /// 1-based source line.
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(unit: &str, position: usize, line: usize, message: impl Into<String>) -> Self {
        Self {
            unit: unit.to_string(),
            position,
            line,
            message: message.into(),
        }
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: syntax error at token {}: {}",
            self.unit, self.line, self.position, self.message
        )
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmErrorKind {
    UnknownComp(String),
    UnknownDest(String),
    UnknownJump(String),
    ConstantOutOfRange(String),
    DuplicateLabel(String),
    MalformedLabel(String),
    /// Instruction or label past the last ROM address.
    ProgramTooLarge,
    /// Variable would be allocated at or above `SCREEN`.
    OutOfVariables(String),
}

/// Assembly failure on a 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmError {
    pub line: usize,
    pub kind: AsmErrorKind,
}

impl AsmError {
    pub fn new(line: usize, kind: AsmErrorKind) -> Self {
        Self { line, kind }
    }
}

impl Display for AsmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: ", self.line)?;
        match &self.kind {
            AsmErrorKind::UnknownComp(c) => write!(f, "unknown computation `{c}`"),
            AsmErrorKind::UnknownDest(d) => write!(f, "unknown destination `{d}`"),
            AsmErrorKind::UnknownJump(j) => write!(f, "unknown jump `{j}`"),
            AsmErrorKind::ConstantOutOfRange(v) => {
                write!(f, "constant `{v}` does not fit in 15 bits")
            }
            AsmErrorKind::DuplicateLabel(l) => write!(f, "label `{l}` defined twice"),
            AsmErrorKind::MalformedLabel(l) => write!(f, "malformed label `{l}`"),
            AsmErrorKind::ProgramTooLarge => write!(f, "program does not fit in 32K of ROM"),
            AsmErrorKind::OutOfVariables(v) => {
                write!(f, "no RAM left below SCREEN for variable `{v}`")
            }
        }
    }
}

impl std::error::Error for AsmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_unit_and_position() {
        let err = SyntaxError::new("Main", 12, 3, "expected symbol `;`");
        assert_eq!(
            err.to_string(),
            "Main:3: syntax error at token 12: expected symbol `;`"
        );
    }

    #[test]
    fn test_asm_error_display() {
        let test_cases = vec![
            (
                AsmError::new(4, AsmErrorKind::UnknownComp("D+2".into())),
                "line 4: unknown computation `D+2`",
            ),
            (
                AsmError::new(9, AsmErrorKind::DuplicateLabel("LOOP".into())),
                "line 9: label `LOOP` defined twice",
            ),
        ];
        for (err, expected) in test_cases {
            assert_eq!(err.to_string(), expected);
        }
    }
}
