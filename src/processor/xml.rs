//! Parse-tree recorder used by `compile --emit xml`.

use super::lexer::Token;

#[derive(Debug, Default)]
pub struct XmlTree {
    out: String,
    depth: usize,
}

impl XmlTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    pub fn open(&mut self, tag: &str) {
        self.indent();
        self.out.push_str(&format!("<{tag}>\n"));
        self.depth += 1;
    }

    pub fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str(&format!("</{tag}>\n"));
    }

    pub fn leaf(&mut self, token: &Token) {
        self.indent();
        self.out.push_str(&token.to_xml());
        self.out.push('\n');
    }

    pub fn into_output(self) -> String {
        self.out
    }
}
