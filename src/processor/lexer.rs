//! Hand-written lexer for the Jack language.
//!
//! The lexer only breaks the raw source into classified `Token`s; it knows
//! nothing about the grammar. Comments are dropped while scanning.
//
//  Lexical items:
//
//      Keyword  ::= class | constructor | function | method | field | static
//                 | var | int | char | boolean | void | true | false | null
//                 | this | let | do | if | else | while | return
//      Symbol   ::= one of  { } ( ) [ ] . , ; + - * / & | < > = ~
//      Integer  ::= [0-9]+        (0‥32767)
//      String   ::= '"' [^"\n]* '"'
//      Ident    ::= any other run of non-space, non-symbol characters
//
//      Whitespace, `// …` and `/* … */` comments are discarded.

use serde::Serialize;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::SyntaxError;

pub const KEYWORDS: &[&str] = &[
    "class",
    "constructor",
    "function",
    "method",
    "field",
    "static",
    "var",
    "int",
    "char",
    "boolean",
    "void",
    "true",
    "false",
    "null",
    "this",
    "let",
    "do",
    "if",
    "else",
    "while",
    "return",
];

pub const SYMBOLS: &str = "{}()[].,;+-*/&|<>=~";

/// Largest value an integer constant may take.
pub const MAX_INT: u32 = 32767;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Keyword,
    Symbol,
    Identifier,
    IntegerConstant,
    StringConstant,
}

impl TokenKind {
    /// Tag used by the XML display format.
    pub fn tag(self) -> &'static str {
        match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Symbol => "symbol",
            TokenKind::Identifier => "identifier",
            TokenKind::IntegerConstant => "integerConstant",
            TokenKind::StringConstant => "stringConstant",
        }
    }
}

/// One lexical unit. `text` holds the raw value; string constants are
/// stored without their quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn is_symbol(&self, c: char) -> bool {
        self.kind == TokenKind::Symbol && self.text.len() == 1 && self.text.starts_with(c)
    }

    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == kw
    }

    /// `<kind> value </kind>` with markup-unsafe characters escaped.
    pub fn to_xml(&self) -> String {
        let tag = self.kind.tag();
        format!("<{tag}> {} </{tag}>", escape(&self.text))
    }
}

/// Escape the characters that may not appear verbatim in markup output.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Render a whole token sequence in the `<tokens>` display format.
pub fn tokens_xml(tokens: &[Token]) -> String {
    let mut out = String::from("<tokens>\n");
    for token in tokens {
        out.push_str(&token.to_xml());
        out.push('\n');
    }
    out.push_str("</tokens>\n");
    out
}

/// Tokenize a whole compilation unit, attaching the unit name and token
/// position to the first lexical error.
pub fn tokenize(unit: &str, src: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    while let Some(res) = lexer.next() {
        match res {
            Ok(token) => tokens.push(token),
            Err(e) => return Err(SyntaxError::new(unit, tokens.len(), lexer.line(), e)),
        }
    }
    Ok(tokens)
}

#[derive(Clone)]
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
        }
    }

    /// Line the lexer is currently positioned on.
    pub fn line(&self) -> usize {
        self.line
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// The character after the peeked one.
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                buf.push(c);
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Skip whitespace and comments. Fails on an unterminated block comment.
    fn skip_trivia(&mut self) -> Result<(), String> {
        loop {
            match (self.peek_char(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.next_char();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.next_char() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.line;
                    self.next_char();
                    self.next_char();
                    let mut prev = '\0';
                    loop {
                        match self.next_char() {
                            Some('/') if prev == '*' => break,
                            Some(c) => prev = c,
                            None => return Err(format!("unterminated comment opened on line {start}")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_string(&mut self) -> Result<String, String> {
        let mut txt = String::new();
        while let Some(c) = self.peek_char() {
            match c {
                '"' => {
                    self.next_char();
                    return Ok(txt);
                }
                '\n' => break,
                c if c as u32 > MAX_INT => {
                    return Err(format!(
                        "character `{c}` (code {}) does not fit in a string constant",
                        c as u32
                    ));
                }
                c => {
                    if txt.chars().count() as u32 >= MAX_INT {
                        return Err("string constant is too long".into());
                    }
                    txt.push(c);
                    self.next_char();
                }
            }
        }
        Err("no closing \" found for string constant".into())
    }

    fn read_word(&mut self, first: char) -> Result<Token, String> {
        let mut word = String::new();
        word.push(first);
        self.consume_while(
            |c| !c.is_whitespace() && !SYMBOLS.contains(c) && c != '"',
            &mut word,
        );

        if KEYWORDS.contains(&word.as_str()) {
            return Ok(Token::new(TokenKind::Keyword, word, self.line));
        }
        if word.chars().all(|c| c.is_ascii_digit()) {
            let value: u32 = word
                .parse()
                .map_err(|_| format!("integer constant too large: {word}"))?;
            if value > MAX_INT {
                return Err(format!("integer constant too large: {value}"));
            }
            return Ok(Token::new(TokenKind::IntegerConstant, word, self.line));
        }
        if first.is_ascii_digit() {
            return Err(format!("identifier may not start with a digit: {word}"));
        }
        Ok(Token::new(TokenKind::Identifier, word, self.line))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, String>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.skip_trivia() {
            // drain so the iterator stays finished after the error
            while self.chars.next().is_some() {}
            return Some(Err(e));
        }

        let ch = self.next_char()?;
        let tok_res = match ch {
            '"' => self
                .read_string()
                .map(|s| Token::new(TokenKind::StringConstant, s, self.line)),
            c if SYMBOLS.contains(c) => Ok(Token::new(TokenKind::Symbol, c.to_string(), self.line)),
            c => self.read_word(c),
        };

        Some(tok_res)
    }
}
