//! Lowers VM commands into Hack assembly.
//!
//! Every command expands into a fixed instruction template. The only state
//! is the unique-label allocator, which lives as long as one output
//! artifact. The current file name (for `static`) and the enclosing function
//! (for label scoping) are passed in per unit, not stored between calls.
//!
//! RAM layout: `SP`=0, `LCL`=1, `ARG`=2, `THIS`=3, `THAT`=4, temp 5‥12,
//! scratch `R13`/`R14`, statics from 16.

use super::labels::LabelAllocator;
use super::vm::{ArithmeticOp, Command, Segment};

const TEMP_BASE: u16 = 5;
const POINTER_BASE: u16 = 3;

/// Saved caller registers, in push order.
const FRAME_REGISTERS: [&str; 4] = ["LCL", "ARG", "THIS", "THAT"];

/// Per-file translation context.
struct UnitContext<'a> {
    file: &'a str,
    function: Option<String>,
}

impl UnitContext<'_> {
    fn scoped(&self, label: &str) -> String {
        match &self.function {
            Some(f) => format!("{f}${label}"),
            None => label.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    labels: LabelAllocator,
    annotate: bool,
}

impl CodeWriter {
    pub fn new(annotate: bool) -> Self {
        Self {
            out: String::new(),
            labels: LabelAllocator::new(),
            annotate,
        }
    }

    fn line(&mut self, instruction: &str) {
        self.out.push_str(instruction);
        self.out.push('\n');
    }

    fn lines(&mut self, instructions: &[&str]) {
        for i in instructions {
            self.line(i);
        }
    }

    /// `SP = stack_base; call Sys.init 0`
    pub fn write_bootstrap(&mut self, stack_base: u16) {
        if self.annotate {
            self.line("// bootstrap");
        }
        self.line(&format!("@{stack_base}"));
        self.lines(&["D=A", "@SP", "M=D"]);
        let ctx = UnitContext {
            file: "Sys",
            function: None,
        };
        self.write_call(&ctx, "Sys.init", 0);
    }

    /// Lower every command of one VM file.
    pub fn translate_unit(&mut self, file: &str, commands: &[Command]) -> Result<(), String> {
        let mut ctx = UnitContext {
            file,
            function: None,
        };
        for cmd in commands {
            if self.annotate {
                self.line(&format!("// {cmd}"));
            }
            self.lower(&mut ctx, cmd)?;
        }
        Ok(())
    }

    pub fn into_output(self) -> String {
        self.out
    }

    fn lower(&mut self, ctx: &mut UnitContext, cmd: &Command) -> Result<(), String> {
        match cmd {
            Command::Arithmetic(op) => self.write_arithmetic(*op),
            Command::Push(segment, index) => self.write_push(ctx, *segment, *index),
            Command::Pop(segment, index) => self.write_pop(ctx, *segment, *index)?,
            Command::Label(label) => self.line(&format!("({})", ctx.scoped(label))),
            Command::Goto(label) => {
                self.line(&format!("@{}", ctx.scoped(label)));
                self.line("0;JMP");
            }
            Command::IfGoto(label) => {
                self.pop_to_d();
                self.line(&format!("@{}", ctx.scoped(label)));
                self.line("D;JNE");
            }
            Command::Function { name, locals } => {
                ctx.function = Some(name.clone());
                self.write_function(name, *locals);
            }
            Command::Call { name, args } => self.write_call(ctx, name, *args),
            Command::Return => self.write_return(),
        }
        Ok(())
    }

    // ── Stack primitives ────────────────────────────────────────────

    /// `*SP = D; SP++`
    fn push_d(&mut self) {
        self.lines(&["@SP", "A=M", "M=D", "@SP", "M=M+1"]);
    }

    /// `SP--; D = *SP`
    fn pop_to_d(&mut self) {
        self.lines(&["@SP", "AM=M-1", "D=M"]);
    }

    // ── Memory access ───────────────────────────────────────────────

    fn base_register(segment: Segment) -> Option<&'static str> {
        match segment {
            Segment::Local => Some("LCL"),
            Segment::Argument => Some("ARG"),
            Segment::This => Some("THIS"),
            Segment::That => Some("THAT"),
            _ => None,
        }
    }

    /// Address of a fixed-location slot, if the segment has one.
    fn fixed_address(ctx: &UnitContext, segment: Segment, index: u16) -> Option<String> {
        match segment {
            Segment::Temp => Some((TEMP_BASE + index).to_string()),
            Segment::Pointer => Some((POINTER_BASE + index).to_string()),
            Segment::Static => Some(format!("{}.{index}", ctx.file)),
            _ => None,
        }
    }

    fn write_push(&mut self, ctx: &UnitContext, segment: Segment, index: u16) {
        if segment == Segment::Constant {
            self.line(&format!("@{index}"));
            self.line("D=A");
        } else if let Some(base) = Self::base_register(segment) {
            self.line(&format!("@{index}"));
            self.line("D=A");
            self.line(&format!("@{base}"));
            self.lines(&["A=M+D", "D=M"]);
        } else if let Some(address) = Self::fixed_address(ctx, segment, index) {
            self.line(&format!("@{address}"));
            self.line("D=M");
        }
        self.push_d();
    }

    fn write_pop(&mut self, ctx: &UnitContext, segment: Segment, index: u16) -> Result<(), String> {
        if let Some(base) = Self::base_register(segment) {
            // R13 = base + index
            self.line(&format!("@{index}"));
            self.line("D=A");
            self.line(&format!("@{base}"));
            self.lines(&["D=M+D", "@R13", "M=D"]);
            self.pop_to_d();
            self.lines(&["@R13", "A=M", "M=D"]);
        } else if let Some(address) = Self::fixed_address(ctx, segment, index) {
            self.pop_to_d();
            self.line(&format!("@{address}"));
            self.line("M=D");
        } else {
            return Err(format!("cannot pop into the {} segment", segment.as_str()));
        }
        Ok(())
    }

    // ── Arithmetic ──────────────────────────────────────────────────

    fn write_arithmetic(&mut self, op: ArithmeticOp) {
        match op {
            ArithmeticOp::Add => self.binary("M=M+D"),
            ArithmeticOp::Sub => self.binary("M=M-D"),
            ArithmeticOp::And => self.binary("M=M&D"),
            ArithmeticOp::Or => self.binary("M=M|D"),
            ArithmeticOp::Neg => self.unary("M=-M"),
            ArithmeticOp::Not => self.unary("M=!M"),
            ArithmeticOp::ShiftLeft => self.unary("M=M<<"),
            ArithmeticOp::ShiftRight => self.unary("M=M>>"),
            ArithmeticOp::Eq => self.comparison("JEQ", false, false),
            ArithmeticOp::Gt => self.comparison("JGT", true, false),
            ArithmeticOp::Lt => self.comparison("JLT", false, true),
        }
    }

    /// `y = pop; x = top; top = x op y`
    fn binary(&mut self, compute: &str) {
        self.pop_to_d();
        self.lines(&["A=A-1", compute]);
    }

    fn unary(&mut self, compute: &str) {
        self.lines(&["@SP", "A=M-1", compute]);
    }

    /// `x op y` for `eq`/`gt`/`lt`, true = -1, false = 0.
    ///
    /// `x - y` overflows when the operands have different signs, so the
    /// signs are compared first: with x ≥ 0 > y the answer is
    /// `pos_neg_result`, with x < 0 ≤ y it is `neg_pos_result`. Only
    /// same-sign operands reach the subtraction.
    fn comparison(&mut self, jump: &str, pos_neg_result: bool, neg_pos_result: bool) {
        let n = self.labels.next("cmp");
        let x_neg = format!("CMP_X_NEG.{n}");
        let same = format!("CMP_SAME.{n}");
        let is_true = format!("CMP_TRUE.{n}");
        let is_false = format!("CMP_FALSE.{n}");
        let end = format!("CMP_END.{n}");
        let outcome = |result: bool| if result { &is_true } else { &is_false };

        // R13 = y, D = x
        self.pop_to_d();
        self.lines(&["@R13", "M=D", "@SP", "A=M-1", "D=M"]);
        self.line(&format!("@{x_neg}"));
        self.line("D;JLT");

        // x >= 0
        self.lines(&["@R13", "D=M"]);
        self.line(&format!("@{}", outcome(pos_neg_result)));
        self.line("D;JLT");
        self.line(&format!("@{same}"));
        self.line("0;JMP");

        // x < 0
        self.line(&format!("({x_neg})"));
        self.lines(&["@R13", "D=M"]);
        self.line(&format!("@{}", outcome(neg_pos_result)));
        self.line("D;JGE");

        // same sign: x - y cannot overflow
        self.line(&format!("({same})"));
        self.lines(&["@R13", "D=M", "@SP", "A=M-1", "D=M-D"]);
        self.line(&format!("@{is_true}"));
        self.line(&format!("D;{jump}"));

        self.line(&format!("({is_false})"));
        self.lines(&["@SP", "A=M-1", "M=0"]);
        self.line(&format!("@{end}"));
        self.line("0;JMP");

        self.line(&format!("({is_true})"));
        self.lines(&["@SP", "A=M-1", "M=-1"]);
        self.line(&format!("({end})"));
    }

    // ── Function protocol ───────────────────────────────────────────

    fn write_function(&mut self, name: &str, locals: u16) {
        self.line(&format!("({name})"));
        for _ in 0..locals {
            self.line("D=0");
            self.push_d();
        }
    }

    fn write_call(&mut self, ctx: &UnitContext, name: &str, args: u16) {
        let k = self.labels.next("ret");
        let return_label = match &ctx.function {
            Some(f) => format!("{f}$ret.{k}"),
            None => format!("{}$ret.{k}", ctx.file),
        };

        self.line(&format!("@{return_label}"));
        self.line("D=A");
        self.push_d();
        for register in FRAME_REGISTERS {
            self.line(&format!("@{register}"));
            self.line("D=M");
            self.push_d();
        }

        // ARG = SP - (args + 5)
        self.lines(&["@SP", "D=M"]);
        self.line(&format!("@{}", u32::from(args) + 5));
        self.lines(&["D=D-A", "@ARG", "M=D"]);
        // LCL = SP
        self.lines(&["@SP", "D=M", "@LCL", "M=D"]);

        self.line(&format!("@{name}"));
        self.line("0;JMP");
        self.line(&format!("({return_label})"));
    }

    fn write_return(&mut self) {
        // R13 = frame = LCL
        self.lines(&["@LCL", "D=M", "@R13", "M=D"]);
        // R14 = *(frame - 5), read before the return value can overwrite it
        self.lines(&["@5", "A=D-A", "D=M", "@R14", "M=D"]);
        // *ARG = pop
        self.pop_to_d();
        self.lines(&["@ARG", "A=M", "M=D"]);
        // SP = ARG + 1
        self.lines(&["@ARG", "D=M+1", "@SP", "M=D"]);
        // THAT, THIS, ARG, LCL = *(frame - 1), *(frame - 2), …
        for (offset, register) in FRAME_REGISTERS.iter().rev().enumerate() {
            self.lines(&["@R13", "D=M"]);
            self.line(&format!("@{}", offset + 1));
            self.lines(&["A=D-A", "D=M"]);
            self.line(&format!("@{register}"));
            self.line("M=D");
        }
        self.lines(&["@R14", "A=M", "0;JMP"]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::vm::parse_program;

    fn lower(file: &str, vm: &str) -> String {
        let mut writer = CodeWriter::new(false);
        writer
            .translate_unit(file, &parse_program(vm).unwrap())
            .unwrap();
        writer.into_output()
    }

    #[test]
    fn test_push_pop_templates() {
        let test_cases = vec![
            ("push constant 7", "@7\nD=A\n@SP\nA=M\nM=D\n@SP\nM=M+1\n"),
            (
                "push local 2",
                "@2\nD=A\n@LCL\nA=M+D\nD=M\n@SP\nA=M\nM=D\n@SP\nM=M+1\n",
            ),
            ("push temp 3", "@8\nD=M\n@SP\nA=M\nM=D\n@SP\nM=M+1\n"),
            ("push pointer 1", "@4\nD=M\n@SP\nA=M\nM=D\n@SP\nM=M+1\n"),
            ("push static 4", "@Foo.4\nD=M\n@SP\nA=M\nM=D\n@SP\nM=M+1\n"),
            (
                "pop that 1",
                "@1\nD=A\n@THAT\nD=M+D\n@R13\nM=D\n@SP\nAM=M-1\nD=M\n@R13\nA=M\nM=D\n",
            ),
            ("pop pointer 0", "@SP\nAM=M-1\nD=M\n@3\nM=D\n"),
            ("pop static 0", "@SP\nAM=M-1\nD=M\n@Foo.0\nM=D\n"),
        ];

        for (vm, expected) in test_cases {
            assert_eq!(lower("Foo", vm), expected, "vm: {vm}");
        }
    }

    #[test]
    fn test_pop_constant_is_rejected() {
        let mut writer = CodeWriter::new(false);
        let err = writer
            .translate_unit("Foo", &[Command::Pop(Segment::Constant, 0)])
            .unwrap_err();
        assert!(err.contains("constant"));
    }

    #[test]
    fn test_labels_are_scoped_to_function() {
        let asm = lower(
            "Foo",
            "label TOP\nfunction Foo.bar 0\nlabel LOOP\ngoto LOOP\nif-goto LOOP\n",
        );
        assert!(asm.contains("(TOP)\n"));
        assert!(asm.contains("(Foo.bar$LOOP)\n"));
        assert!(asm.contains("@Foo.bar$LOOP\n0;JMP\n"));
        assert!(asm.contains("@SP\nAM=M-1\nD=M\n@Foo.bar$LOOP\nD;JNE\n"));
    }

    #[test]
    fn test_function_initialises_locals() {
        let asm = lower("Foo", "function Foo.f 2");
        assert_eq!(
            asm,
            "(Foo.f)\nD=0\n@SP\nA=M\nM=D\n@SP\nM=M+1\nD=0\n@SP\nA=M\nM=D\n@SP\nM=M+1\n"
        );
    }

    #[test]
    fn test_call_sets_up_frame() {
        let asm = lower("Foo", "function Foo.f 0\ncall Bar.g 3\ncall Bar.g 0");
        assert!(asm.contains("@Foo.f$ret.0\nD=A\n"));
        assert!(asm.contains("@SP\nD=M\n@8\nD=D-A\n@ARG\nM=D\n"));
        assert!(asm.contains("@Bar.g\n0;JMP\n(Foo.f$ret.0)\n"));
        assert!(asm.contains("(Foo.f$ret.1)\n"));
        assert!(asm.contains("@SP\nD=M\n@5\nD=D-A\n@ARG\nM=D\n"));
    }

    #[test]
    fn test_unique_labels_across_units() {
        let mut writer = CodeWriter::new(false);
        for file in ["A", "B"] {
            let cmds = parse_program("function X.f 0\npush constant 1\npush constant 2\neq\ncall X.f 0\n").unwrap();
            writer.translate_unit(file, &cmds).unwrap();
        }
        let asm = writer.into_output();
        let labels: Vec<&str> = asm.lines().filter(|l| l.starts_with('(')).collect();
        let mut unique = labels.clone();
        unique.sort();
        unique.dedup();
        // the two `(X.f)` entries are the only repeat
        assert_eq!(labels.len(), unique.len() + 1);
    }

    #[test]
    fn test_annotations_and_bootstrap() {
        let mut writer = CodeWriter::new(true);
        writer.write_bootstrap(256);
        writer
            .translate_unit("Foo", &parse_program("push constant 1").unwrap())
            .unwrap();
        let asm = writer.into_output();
        assert!(asm.starts_with("// bootstrap\n@256\nD=A\n@SP\nM=D\n@Sys$ret.0\n"));
        assert!(asm.contains("@Sys.init\n0;JMP\n(Sys$ret.0)\n// push constant 1\n"));
    }
}
