use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::{
    compile_parsed, generators::cpp::CppGenerator, parse_source, read_idl, visitor::TreePrinter,
    write_outputs,
};

/// Compiles one IDL interface into a C++ header and metadata source.
#[derive(Debug, Parser)]
#[command(name = "idlc", version, about, disable_help_flag = true)]
pub struct Cli {
    /// Input IDL file.
    #[arg(short = 'i', long = "idl")]
    pub idl: PathBuf,

    /// Output header; must end with `<package path>/<Name>.h`.
    #[arg(short = 'h', long = "header")]
    pub header: PathBuf,

    /// Output metadata source; must end with `<package path>/<Name>_interface.cc`.
    #[arg(short = 'c', long = "source")]
    pub source: PathBuf,

    /// Log pipeline phases.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the parsed tree to stdout before generating.
    #[arg(long)]
    pub dump_ast: bool,

    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    #[allow(dead_code)]
    help: Option<bool>,
}

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let text = read_idl(&cli.idl)?;
    let filename = cli.idl.display().to_string();
    let parsed = parse_source(&text, &filename).with_context(|| format!("Compiling {filename}"))?;
    if cli.dump_ast {
        print!("{}", TreePrinter::print(&parsed.file));
    }

    let compilation = compile_parsed(parsed, &CppGenerator::default())
        .with_context(|| format!("Compiling {filename}"))?;
    write_outputs(&compilation, &cli.header, &cli.source)
        .with_context(|| format!("Writing output for {filename}"))?;
    log::debug!(
        "{} compiled with {} lexical error(s)",
        compilation.model.fullname,
        compilation.lex_errors.len()
    );
    Ok(())
}
