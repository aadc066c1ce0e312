use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::Emit;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a .jack file, or every .jack file in a directory
    Compile {
        path: PathBuf,
        /// Artifact written beside each source
        #[arg(long, value_enum, default_value_t = Emit::Vm)]
        emit: Emit,
    },
    /// Translate a .vm file, or a directory of them, into one .asm file
    Translate {
        path: PathBuf,
        /// JSON translator settings
        #[arg(long)]
        config: Option<PathBuf>,
        /// Do not emit the Sys.init bootstrap
        #[arg(long)]
        no_bootstrap: bool,
    },
    /// Assemble a .asm file, or every .asm file in a directory
    Assemble { path: PathBuf },
}
