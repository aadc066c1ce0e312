//! The functional core: the three translation stages and the glue that runs
//! them over in-memory source units.
pub mod assembler;
pub mod engine;
pub mod labels;
pub mod lexer;
pub mod lowering;
pub mod symbol_table;
pub mod vm;
pub mod vm_writer;
pub mod xml;

use crate::config::Config;
use crate::model::{Emit, SourceUnit};
use anyhow::{Context, Result, anyhow};

/// Compile one `.jack` class into the requested artifact.
pub fn compile_unit(unit: &SourceUnit, emit: Emit) -> Result<String> {
    let tokens = lexer::tokenize(&unit.name, &unit.source)?;
    let out = match emit {
        Emit::Vm => engine::compile_class(&unit.name, &tokens)?,
        Emit::Xml => engine::parse_tree(&unit.name, &tokens)?,
        Emit::Tokens => lexer::tokens_xml(&tokens),
        Emit::TokensJson => {
            let mut json = serde_json::to_string_pretty(&tokens)
                .with_context(|| format!("Serializing tokens of {}", unit.name))?;
            json.push('\n');
            json
        }
    };
    Ok(out)
}

/// Lower every `.vm` unit into a single assembly program.
///
/// Units are lowered in the order given. The first error aborts the whole
/// translation.
pub fn translate(units: &[SourceUnit], config: &Config) -> Result<String> {
    let mut writer = lowering::CodeWriter::new(config.annotate);
    if config.bootstrap {
        writer.write_bootstrap(config.stack_base);
    }
    for unit in units {
        let commands = vm::parse_program(&unit.source)
            .map_err(|e| anyhow!("{}: {e}", unit.path.display()))?;
        writer
            .translate_unit(&unit.name, &commands)
            .map_err(|e| anyhow!("{}: {e}", unit.path.display()))?;
    }
    Ok(writer.into_output())
}

/// Assemble one `.asm` unit into `.hack` text.
pub fn assemble(unit: &SourceUnit) -> Result<String> {
    let words = assembler::assemble(&unit.source)
        .map_err(|e| anyhow!("{}: {e}", unit.path.display()))?;
    Ok(assembler::to_hack_text(&words))
}
