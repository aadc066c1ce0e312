//! Recursive-descent compiler for one Jack class.
//!
//! There is one `compile_*` method per grammar rule. Each consumes exactly
//! the tokens of its construct and leaves the token that ends it for the
//! caller. VM code is emitted while parsing; no AST is built.
//
//  Grammar (informal):
//
//      class          ::= 'class' Ident '{' classVarDec* subroutineDec* '}'
//      classVarDec    ::= ('static' | 'field') type Ident (',' Ident)* ';'
//      subroutineDec  ::= ('constructor' | 'function' | 'method')
//                         ('void' | type) Ident '(' parameterList ')' subroutineBody
//      subroutineBody ::= '{' varDec* statements '}'
//      statement      ::= let | if | while | do | return
//      expression     ::= term (op term)*
//      term           ::= int | string | keywordConst | Ident | Ident '[' expression ']'
//                       | subroutineCall | '(' expression ')' | ('-' | '~') term

use super::labels::LabelAllocator;
use super::lexer::{Token, TokenKind};
use super::symbol_table::{Kind, SymbolTable};
use super::vm::{ArithmeticOp, Segment};
use super::vm_writer::VmWriter;
use super::xml::XmlTree;
use crate::error::SyntaxError;

type ParseResult<T> = Result<T, SyntaxError>;

/// Compile a tokenized class into VM text.
pub fn compile_class(unit: &str, tokens: &[Token]) -> ParseResult<String> {
    let mut engine = Engine::new(unit, tokens, false);
    engine.compile_class()?;
    Ok(engine.vm.into_output())
}

/// Compile a tokenized class and return its parse tree as XML.
pub fn parse_tree(unit: &str, tokens: &[Token]) -> ParseResult<String> {
    let mut engine = Engine::new(unit, tokens, true);
    engine.compile_class()?;
    Ok(engine.tree.map(XmlTree::into_output).unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

/// How a binary operator is lowered.
enum Operator {
    Native(ArithmeticOp),
    Helper(&'static str),
}

fn operator(token: &Token) -> Option<Operator> {
    if token.kind != TokenKind::Symbol {
        return None;
    }
    Some(match token.text.as_str() {
        "+" => Operator::Native(ArithmeticOp::Add),
        "-" => Operator::Native(ArithmeticOp::Sub),
        "&" => Operator::Native(ArithmeticOp::And),
        "|" => Operator::Native(ArithmeticOp::Or),
        "<" => Operator::Native(ArithmeticOp::Lt),
        ">" => Operator::Native(ArithmeticOp::Gt),
        "=" => Operator::Native(ArithmeticOp::Eq),
        "*" => Operator::Helper("Math.multiply"),
        "/" => Operator::Helper("Math.divide"),
        _ => return None,
    })
}

struct Engine<'a> {
    unit: &'a str,
    tokens: &'a [Token],
    pos: usize,
    symbols: SymbolTable,
    vm: VmWriter,
    labels: LabelAllocator,
    class_name: String,
    subroutine_kind: SubroutineKind,
    tree: Option<XmlTree>,
}

impl<'a> Engine<'a> {
    fn new(unit: &'a str, tokens: &'a [Token], record_tree: bool) -> Self {
        Self {
            unit,
            tokens,
            pos: 0,
            symbols: SymbolTable::new(),
            vm: VmWriter::new(),
            labels: LabelAllocator::new(),
            class_name: String::new(),
            subroutine_kind: SubroutineKind::Function,
            tree: record_tree.then(XmlTree::new),
        }
    }

    // ── Token cursor ────────────────────────────────────────────────

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_is_symbol(&self, c: char) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(c))
    }

    fn peek_is_keyword(&self, keywords: &[&str]) -> bool {
        self.peek()
            .is_some_and(|t| keywords.iter().any(|kw| t.is_keyword(kw)))
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> SyntaxError {
        let line = self
            .tokens
            .get(pos)
            .or(self.tokens.last())
            .map_or(1, |t| t.line);
        SyntaxError::new(self.unit, pos, line, message)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(t) => self.error_at(
                self.pos,
                format!("expected {expected}, found {} `{}`", t.kind.tag(), t.text),
            ),
            None => self.error_at(self.pos, format!("expected {expected}, found end of input")),
        }
    }

    fn advance(&mut self) -> ParseResult<&'a Token> {
        let token = self
            .peek()
            .ok_or_else(|| self.error_at(self.pos, "unexpected end of input"))?;
        self.pos += 1;
        if let Some(tree) = self.tree.as_mut() {
            tree.leaf(token);
        }
        Ok(token)
    }

    fn expect_symbol(&mut self, c: char) -> ParseResult<()> {
        if !self.peek_is_symbol(c) {
            return Err(self.unexpected(&format!("symbol `{c}`")));
        }
        self.advance()?;
        Ok(())
    }

    fn expect_keyword(&mut self, keywords: &[&str]) -> ParseResult<&'a str> {
        if !self.peek_is_keyword(keywords) {
            return Err(self.unexpected(&format!("keyword `{}`", keywords.join("` or `"))));
        }
        Ok(&self.advance()?.text)
    }

    fn expect_identifier(&mut self) -> ParseResult<&'a str> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Identifier => Ok(&self.advance()?.text),
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_type(&mut self, allow_void: bool) -> ParseResult<&'a str> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Identifier => Ok(&self.advance()?.text),
            Some(t)
                if ["int", "char", "boolean"].iter().any(|kw| t.is_keyword(kw))
                    || (allow_void && t.is_keyword("void")) =>
            {
                Ok(&self.advance()?.text)
            }
            _ => Err(self.unexpected("type")),
        }
    }

    fn open(&mut self, tag: &str) {
        if let Some(tree) = self.tree.as_mut() {
            tree.open(tag);
        }
    }

    fn close(&mut self, tag: &str) {
        if let Some(tree) = self.tree.as_mut() {
            tree.close(tag);
        }
    }

    // ── Symbols ─────────────────────────────────────────────────────

    /// Consume a variable name and define it.
    fn declare(&mut self, ty: &str, kind: Kind) -> ParseResult<()> {
        let pos = self.pos;
        let name = self.expect_identifier()?;
        self.symbols
            .define(name, ty, kind)
            .map_err(|e| self.error_at(pos, e))?;
        Ok(())
    }

    fn resolve(&self, name: &str, pos: usize) -> ParseResult<(Segment, u16)> {
        self.symbols
            .lookup(name)
            .map(|s| (s.kind.segment(), s.index))
            .ok_or_else(|| self.error_at(pos, format!("undefined variable `{name}`")))
    }

    // ── Program structure ───────────────────────────────────────────

    fn compile_class(&mut self) -> ParseResult<()> {
        self.open("class");
        self.expect_keyword(&["class"])?;
        self.class_name = self.expect_identifier()?.to_string();
        self.expect_symbol('{')?;

        while self.peek_is_keyword(&["static", "field"]) {
            self.compile_class_var_dec()?;
        }
        while self.peek_is_keyword(&["constructor", "function", "method"]) {
            self.compile_subroutine()?;
        }

        self.expect_symbol('}')?;
        self.close("class");

        if self.peek().is_some() {
            return Err(self.unexpected("end of input after class body"));
        }
        Ok(())
    }

    fn compile_class_var_dec(&mut self) -> ParseResult<()> {
        self.open("classVarDec");
        let kind = match self.expect_keyword(&["static", "field"])? {
            "static" => Kind::Static,
            _ => Kind::Field,
        };
        let ty = self.expect_type(false)?;
        self.declare(ty, kind)?;
        while self.peek_is_symbol(',') {
            self.advance()?;
            self.declare(ty, kind)?;
        }
        self.expect_symbol(';')?;
        self.close("classVarDec");
        Ok(())
    }

    fn compile_subroutine(&mut self) -> ParseResult<()> {
        self.open("subroutineDec");
        self.symbols.start_subroutine();
        self.subroutine_kind = match self.expect_keyword(&["constructor", "function", "method"])? {
            "constructor" => SubroutineKind::Constructor,
            "method" => SubroutineKind::Method,
            _ => SubroutineKind::Function,
        };
        self.expect_type(true)?;
        let name = self.expect_identifier()?;

        if self.subroutine_kind == SubroutineKind::Method {
            // the receiver occupies argument 0
            self.symbols
                .define("this", &self.class_name, Kind::Argument)
                .map_err(|e| self.error_at(self.pos, e))?;
        }

        self.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.expect_symbol(')')?;
        self.compile_subroutine_body(name)?;
        self.close("subroutineDec");
        Ok(())
    }

    fn compile_parameter_list(&mut self) -> ParseResult<()> {
        self.open("parameterList");
        if !self.peek_is_symbol(')') {
            loop {
                let ty = self.expect_type(false)?;
                self.declare(ty, Kind::Argument)?;
                if !self.peek_is_symbol(',') {
                    break;
                }
                self.advance()?;
            }
        }
        self.close("parameterList");
        Ok(())
    }

    fn compile_subroutine_body(&mut self, name: &str) -> ParseResult<()> {
        self.open("subroutineBody");
        self.expect_symbol('{')?;
        while self.peek_is_keyword(&["var"]) {
            self.compile_var_dec()?;
        }

        let full_name = format!("{}.{}", self.class_name, name);
        self.vm
            .write_function(&full_name, self.symbols.var_count(Kind::Local));
        match self.subroutine_kind {
            SubroutineKind::Method => {
                self.vm.write_push(Segment::Argument, 0);
                self.vm.write_pop(Segment::Pointer, 0);
            }
            SubroutineKind::Constructor => {
                self.vm
                    .write_push(Segment::Constant, self.symbols.var_count(Kind::Field));
                self.vm.write_call("Memory.alloc", 1);
                self.vm.write_pop(Segment::Pointer, 0);
            }
            SubroutineKind::Function => {}
        }

        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.close("subroutineBody");
        Ok(())
    }

    fn compile_var_dec(&mut self) -> ParseResult<()> {
        self.open("varDec");
        self.expect_keyword(&["var"])?;
        let ty = self.expect_type(false)?;
        self.declare(ty, Kind::Local)?;
        while self.peek_is_symbol(',') {
            self.advance()?;
            self.declare(ty, Kind::Local)?;
        }
        self.expect_symbol(';')?;
        self.close("varDec");
        Ok(())
    }

    // ── Statements ──────────────────────────────────────────────────

    fn compile_statements(&mut self) -> ParseResult<()> {
        self.open("statements");
        while let Some(token) = self.peek() {
            if token.kind != TokenKind::Keyword {
                break;
            }
            match token.text.as_str() {
                "let" => self.compile_let()?,
                "if" => self.compile_if()?,
                "while" => self.compile_while()?,
                "do" => self.compile_do()?,
                "return" => self.compile_return()?,
                _ => break,
            }
        }
        self.close("statements");
        Ok(())
    }

    fn compile_let(&mut self) -> ParseResult<()> {
        self.open("letStatement");
        self.expect_keyword(&["let"])?;
        let pos = self.pos;
        let name = self.expect_identifier()?;
        let (segment, index) = self.resolve(name, pos)?;

        if self.peek_is_symbol('[') {
            self.vm.write_push(segment, index);
            self.advance()?;
            self.compile_expression()?;
            self.expect_symbol(']')?;
            self.vm.write_arithmetic(ArithmeticOp::Add);

            self.expect_symbol('=')?;
            self.compile_expression()?;
            self.expect_symbol(';')?;

            // the right-hand side may itself have moved `that`
            self.vm.write_pop(Segment::Temp, 0);
            self.vm.write_pop(Segment::Pointer, 1);
            self.vm.write_push(Segment::Temp, 0);
            self.vm.write_pop(Segment::That, 0);
        } else {
            self.expect_symbol('=')?;
            self.compile_expression()?;
            self.expect_symbol(';')?;
            self.vm.write_pop(segment, index);
        }
        self.close("letStatement");
        Ok(())
    }

    fn compile_if(&mut self) -> ParseResult<()> {
        self.open("ifStatement");
        self.expect_keyword(&["if"])?;
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;

        let n = self.labels.next("if");
        let false_label = format!("IF_FALSE{n}");
        let end_label = format!("IF_END{n}");

        self.vm.write_arithmetic(ArithmeticOp::Not);
        self.vm.write_if(&false_label);
        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;

        if self.peek_is_keyword(&["else"]) {
            self.vm.write_goto(&end_label);
            self.vm.write_label(&false_label);
            self.advance()?;
            self.expect_symbol('{')?;
            self.compile_statements()?;
            self.expect_symbol('}')?;
            self.vm.write_label(&end_label);
        } else {
            self.vm.write_label(&false_label);
        }
        self.close("ifStatement");
        Ok(())
    }

    fn compile_while(&mut self) -> ParseResult<()> {
        self.open("whileStatement");
        let n = self.labels.next("while");
        let exp_label = format!("WHILE_EXP{n}");
        let end_label = format!("WHILE_END{n}");

        self.expect_keyword(&["while"])?;
        self.vm.write_label(&exp_label);
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.vm.write_arithmetic(ArithmeticOp::Not);
        self.vm.write_if(&end_label);

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.vm.write_goto(&exp_label);
        self.vm.write_label(&end_label);
        self.close("whileStatement");
        Ok(())
    }

    fn compile_do(&mut self) -> ParseResult<()> {
        self.open("doStatement");
        self.expect_keyword(&["do"])?;
        let name = self.expect_identifier()?;
        if !(self.peek_is_symbol('(') || self.peek_is_symbol('.')) {
            return Err(self.unexpected("subroutine call"));
        }
        self.compile_subroutine_call(name)?;
        self.expect_symbol(';')?;
        self.vm.write_pop(Segment::Temp, 0);
        self.close("doStatement");
        Ok(())
    }

    fn compile_return(&mut self) -> ParseResult<()> {
        self.open("returnStatement");
        self.expect_keyword(&["return"])?;
        if self.peek_is_symbol(';') {
            // every subroutine leaves exactly one value for its caller
            self.vm.write_push(Segment::Constant, 0);
        } else {
            self.compile_expression()?;
        }
        self.expect_symbol(';')?;
        self.vm.write_return();
        self.close("returnStatement");
        Ok(())
    }

    // ── Expressions ─────────────────────────────────────────────────

    fn compile_expression(&mut self) -> ParseResult<()> {
        self.open("expression");
        self.compile_term()?;
        while let Some(op) = self.peek().and_then(operator) {
            self.advance()?;
            self.compile_term()?;
            match op {
                Operator::Native(op) => self.vm.write_arithmetic(op),
                Operator::Helper(name) => self.vm.write_call(name, 2),
            }
        }
        self.close("expression");
        Ok(())
    }

    fn compile_term(&mut self) -> ParseResult<()> {
        self.open("term");
        let pos = self.pos;
        let token = self.advance()?;

        match token.kind {
            TokenKind::IntegerConstant => {
                let value: u16 = token
                    .text
                    .parse()
                    .map_err(|_| self.error_at(pos, format!("invalid integer `{}`", token.text)))?;
                self.vm.write_push(Segment::Constant, value);
            }
            TokenKind::StringConstant => self.compile_string(&token.text),
            TokenKind::Keyword => match token.text.as_str() {
                "true" => {
                    self.vm.write_push(Segment::Constant, 1);
                    self.vm.write_arithmetic(ArithmeticOp::Neg);
                }
                "false" | "null" => self.vm.write_push(Segment::Constant, 0),
                "this" => self.vm.write_push(Segment::Pointer, 0),
                other => {
                    return Err(self.error_at(pos, format!("unexpected keyword `{other}` in expression")));
                }
            },
            TokenKind::Symbol => match token.text.as_str() {
                "(" => {
                    self.compile_expression()?;
                    self.expect_symbol(')')?;
                }
                "-" => {
                    self.compile_term()?;
                    self.vm.write_arithmetic(ArithmeticOp::Neg);
                }
                "~" => {
                    self.compile_term()?;
                    self.vm.write_arithmetic(ArithmeticOp::Not);
                }
                other => {
                    return Err(self.error_at(pos, format!("unexpected symbol `{other}` in expression")));
                }
            },
            TokenKind::Identifier => {
                let name = token.text.as_str();
                if self.peek_is_symbol('[') {
                    let (segment, index) = self.resolve(name, pos)?;
                    self.vm.write_push(segment, index);
                    self.advance()?;
                    self.compile_expression()?;
                    self.expect_symbol(']')?;
                    self.vm.write_arithmetic(ArithmeticOp::Add);
                    self.vm.write_pop(Segment::Pointer, 1);
                    self.vm.write_push(Segment::That, 0);
                } else if self.peek_is_symbol('(') || self.peek_is_symbol('.') {
                    self.compile_subroutine_call(name)?;
                } else {
                    let (segment, index) = self.resolve(name, pos)?;
                    self.vm.write_push(segment, index);
                }
            }
        }

        self.close("term");
        Ok(())
    }

    fn compile_string(&mut self, text: &str) {
        self.vm
            .write_push(Segment::Constant, text.chars().count() as u16);
        self.vm.write_call("String.new", 1);
        for c in text.chars() {
            self.vm.write_push(Segment::Constant, c as u16);
            self.vm.write_call("String.appendChar", 2);
        }
    }

    /// `name` has been consumed and the lookahead is `(` or `.`.
    fn compile_subroutine_call(&mut self, name: &str) -> ParseResult<()> {
        let (target, receivers) = if self.peek_is_symbol('.') {
            self.advance()?;
            let sub = self.expect_identifier()?;
            match self.symbols.lookup(name) {
                // method call on a variable: the object is the first argument
                Some(symbol) => {
                    let target = format!("{}.{sub}", symbol.ty);
                    self.vm.write_push(symbol.kind.segment(), symbol.index);
                    (target, 1)
                }
                // anything else names a class
                None => (format!("{name}.{sub}"), 0),
            }
        } else if self.subroutine_kind == SubroutineKind::Function {
            (format!("{}.{name}", self.class_name), 0)
        } else {
            self.vm.write_push(Segment::Pointer, 0);
            (format!("{}.{name}", self.class_name), 1)
        };

        self.expect_symbol('(')?;
        let args = self.compile_expression_list()?;
        self.expect_symbol(')')?;
        self.vm.write_call(&target, args + receivers);
        Ok(())
    }

    fn compile_expression_list(&mut self) -> ParseResult<u16> {
        self.open("expressionList");
        let mut count = 0;
        if !self.peek_is_symbol(')') {
            loop {
                self.compile_expression()?;
                count += 1;
                if !self.peek_is_symbol(',') {
                    break;
                }
                self.advance()?;
            }
        }
        self.close("expressionList");
        Ok(count)
    }
}
