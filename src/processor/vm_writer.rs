//! Emits VM commands as text, one per line. Operands are not validated.

use super::vm::{ArithmeticOp, Command, Segment};

#[derive(Debug, Default)]
pub struct VmWriter {
    out: String,
}

impl VmWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, cmd: Command) {
        self.out.push_str(&cmd.to_string());
        self.out.push('\n');
    }

    pub fn write_push(&mut self, segment: Segment, index: u16) {
        self.emit(Command::Push(segment, index));
    }

    pub fn write_pop(&mut self, segment: Segment, index: u16) {
        self.emit(Command::Pop(segment, index));
    }

    pub fn write_arithmetic(&mut self, op: ArithmeticOp) {
        self.emit(Command::Arithmetic(op));
    }

    pub fn write_label(&mut self, label: &str) {
        self.emit(Command::Label(label.to_string()));
    }

    pub fn write_goto(&mut self, label: &str) {
        self.emit(Command::Goto(label.to_string()));
    }

    pub fn write_if(&mut self, label: &str) {
        self.emit(Command::IfGoto(label.to_string()));
    }

    pub fn write_call(&mut self, name: &str, args: u16) {
        self.emit(Command::Call {
            name: name.to_string(),
            args,
        });
    }

    pub fn write_function(&mut self, name: &str, locals: u16) {
        self.emit(Command::Function {
            name: name.to_string(),
            locals,
        });
    }

    pub fn write_return(&mut self) {
        self.emit(Command::Return);
    }

    pub fn into_output(self) -> String {
        self.out
    }
}
