use clap::ValueEnum;
use std::path::PathBuf;

/// Source file extensions accepted by each stage.
pub const JACK_EXT: &str = "jack";
pub const VM_EXT: &str = "vm";
pub const ASM_EXT: &str = "asm";

/// One input file, read into memory.
///
/// `name` is the file stem: the class name for `.jack`, the static-variable
/// prefix for `.vm`.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub name: String,
    pub path: PathBuf,
    pub source: String,
}

/// What `compile` writes for each class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Emit {
    /// VM code, `X.vm`
    #[default]
    Vm,
    /// Parse tree, `X.xml`
    Xml,
    /// Token list, `XT.xml`
    Tokens,
    /// Token list as JSON, `X.tokens.json`
    TokensJson,
}

impl Emit {
    /// Output file name for a class named `stem`.
    pub fn file_name(self, stem: &str) -> String {
        match self {
            Emit::Vm => format!("{stem}.vm"),
            Emit::Xml => format!("{stem}.xml"),
            Emit::Tokens => format!("{stem}T.xml"),
            Emit::TokensJson => format!("{stem}.tokens.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_file_names() {
        let test_cases = vec![
            (Emit::Vm, "Main.vm"),
            (Emit::Xml, "Main.xml"),
            (Emit::Tokens, "MainT.xml"),
            (Emit::TokensJson, "Main.tokens.json"),
        ];
        for (emit, expected) in test_cases {
            assert_eq!(emit.file_name("Main"), expected);
        }
    }
}
