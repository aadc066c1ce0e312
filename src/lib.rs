pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod processor;
pub mod writer;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::cli::Command;
use crate::config::Config;
use crate::model::{ASM_EXT, Emit, JACK_EXT, VM_EXT};

pub fn run() -> Result<()> {
    let args = cli::Cli::parse();
    match args.command {
        Command::Compile { path, emit } => compile(&path, emit),
        Command::Translate {
            path,
            config,
            no_bootstrap,
        } => translate(&path, config.as_deref(), no_bootstrap),
        Command::Assemble { path } => assemble(&path),
    }
}

/// Compile every class independently. A class that fails is reported and
/// skipped; the run fails once all classes have been tried.
pub fn compile(path: &Path, emit: Emit) -> Result<()> {
    // 1. ── Load ───────────────────────────────────────────────────────
    let units = loader::load_units(path, JACK_EXT)?;

    // 2. ── Compile + write ────────────────────────────────────────────
    let mut failed = 0;
    for unit in &units {
        match processor::compile_unit(unit, emit) {
            Ok(out) => {
                let target = unit.path.with_file_name(emit.file_name(&unit.name));
                writer::write_atomic(&target, &out)
                    .with_context(|| format!("Writing {}", target.display()))?;
                println!("Wrote {}", target.display());
            }
            Err(e) => {
                eprintln!("error: {e:#}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} classes failed to compile", units.len());
    }
    Ok(())
}

/// `dir/dir.asm` for a directory, `X.asm` beside a single file.
pub fn translate_target(path: &Path) -> PathBuf {
    if path.is_dir() {
        let stem = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string());
        path.join(format!("{stem}.{ASM_EXT}"))
    } else {
        path.with_extension(ASM_EXT)
    }
}

pub fn translate(path: &Path, config_path: Option<&Path>, no_bootstrap: bool) -> Result<()> {
    // 1. ── Configure ──────────────────────────────────────────────────
    let mut config = match config_path {
        Some(p) => config::load(p)?,
        None => Config::default(),
    };
    if no_bootstrap {
        config.bootstrap = false;
    }

    // 2. ── Load ───────────────────────────────────────────────────────
    let units = loader::load_units(path, VM_EXT)?;

    // 3. ── Lower ──────────────────────────────────────────────────────
    let asm = processor::translate(&units, &config)
        .with_context(|| format!("Translating {}", path.display()))?;
    println!("Lowered {} VM file(s)", units.len());

    // 4. ── Write output ───────────────────────────────────────────────
    let target = translate_target(path);
    writer::write_atomic(&target, &asm)
        .with_context(|| format!("Writing {}", target.display()))?;
    println!("Wrote {}", target.display());
    Ok(())
}

pub fn assemble(path: &Path) -> Result<()> {
    // 1. ── Load ───────────────────────────────────────────────────────
    let units = loader::load_units(path, ASM_EXT)?;

    // 2. ── Assemble + write ───────────────────────────────────────────
    for unit in &units {
        let hack = processor::assemble(unit)?;
        let target = unit.path.with_extension("hack");
        writer::write_atomic(&target, &hack)
            .with_context(|| format!("Writing {}", target.display()))?;
        println!("Wrote {}", target.display());
    }
    Ok(())
}
