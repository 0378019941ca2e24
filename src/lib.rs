//! # idlc
//!
//! An Interface Definition Language (IDL) compiler. An IDL file declares one
//! interface (its package, imports, methods, properties, events, constructors
//! and nested types) and `idlc` emits the C++ glue a native runtime needs to
//! expose that interface to a scripting layer: a class header and a metadata
//! source file with member tables.
//!
//! ## Core Components
//!
//! - **Lexer** (`lexer`): Tokenizes IDL source. Malformed input is reported and skipped.
//! - **Parser** (`parser`): Builds the AST (`ast`). The first syntax error is fatal.
//! - **Visitor** (`visitor`): Generic depth-first traversal with a namespace stack.
//! - **Loader** (`loader`): Resolves names, signatures and value kinds into a `model::InterfaceModel`.
//! - **Generators** (`generators`): Renders the model as C++ and validates output paths.
//!
//! ## Example
//!
//! ```rust
//! let compilation = idlc::compile_source(
//!     "package a.b; interface Foo { int bar(int x); };",
//!     "Foo.idl",
//! )
//! .unwrap();
//!
//! assert_eq!(compilation.model.methods[0].signature, "ii");
//! assert_eq!(compilation.names.header, "a/b/Foo.h");
//! assert!(compilation.rendered.interface.contains("virtual int32_t bar(int32_t x) = 0;"));
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

pub mod ast;
pub mod cli;
pub mod error;
pub mod generators;
pub mod lexer;
pub mod loader;
pub mod model;
pub mod parser;
pub mod visitor;

mod color;

use crate::{
    error::{CompileError, LexError},
    generators::{
        CppNames, OutputPaths,
        cpp::{CppGenerator, Rendered},
    },
    model::InterfaceModel,
    parser::Parser,
};

/// A parsed file together with the lexical errors met on the way.
#[derive(Debug)]
pub struct Parsed {
    pub file: ast::File,
    pub lex_errors: Vec<LexError>,
}

/// The in-memory result of compiling one IDL source.
#[derive(Debug)]
pub struct Compilation {
    pub model: InterfaceModel,
    pub names: CppNames,
    pub rendered: Rendered,
    pub lex_errors: Vec<LexError>,
}

/// Tokenizes and parses `source`. Lexical errors are collected, not fatal.
pub fn parse_source(source: &str, filename: &str) -> Result<Parsed, CompileError> {
    log::debug!("parsing {filename}");
    let mut parser = Parser::new(source, filename);
    let file = parser.parse_file()?;
    let lex_errors = parser.into_lex_errors();
    if !lex_errors.is_empty() {
        log::debug!("{filename}: {} lexical error(s)", lex_errors.len());
    }
    Ok(Parsed { file, lex_errors })
}

/// Parses, resolves and renders `source` with the default generator config.
pub fn compile_source(source: &str, filename: &str) -> Result<Compilation, CompileError> {
    compile_source_with(source, filename, &CppGenerator::default())
}

pub fn compile_source_with(
    source: &str,
    filename: &str,
    generator: &CppGenerator,
) -> Result<Compilation, CompileError> {
    compile_parsed(parse_source(source, filename)?, generator)
}

/// Resolves and renders an already parsed file.
pub fn compile_parsed(parsed: Parsed, generator: &CppGenerator) -> Result<Compilation, CompileError> {
    let Parsed { file, lex_errors } = parsed;
    let model = loader::resolve(&file)?;
    let names = CppNames::new(&model);
    log::debug!("rendering {}", model.fullname);
    let rendered = generator.render(&model);
    Ok(Compilation {
        model,
        names,
        rendered,
        lex_errors,
    })
}

/// Compiles the IDL file at `idl` and writes the header and metadata source.
pub fn compile_file(idl: &Path, header: &Path, source: &Path) -> Result<Compilation, CompileError> {
    let text = read_idl(idl)?;
    let compilation = compile_source(&text, &idl.display().to_string())?;
    write_outputs(&compilation, header, source)?;
    Ok(compilation)
}

pub fn read_idl(idl: &Path) -> Result<String, CompileError> {
    fs::read_to_string(idl).map_err(|e| CompileError::Io {
        action: "read",
        path: idl.to_path_buf(),
        source: e,
    })
}

/// Writes both rendered files, or neither.
///
/// Both paths are validated first. Each file is written to a `.tmp` sibling
/// and renamed over its destination only once both siblings exist, source
/// first. Any failure up to and including the source rename leaves files
/// already at the destinations untouched.
pub fn write_outputs(compilation: &Compilation, header: &Path, source: &Path) -> Result<(), CompileError> {
    OutputPaths::new(header, source).validate(&compilation.names)?;

    let staged_header = stage(header, &compilation.rendered.interface)?;
    let staged_source = match stage(source, &compilation.rendered.metadata) {
        Ok(path) => path,
        Err(e) => {
            discard(&staged_header);
            return Err(e);
        }
    };
    if let Err(e) = commit(&staged_source, source) {
        discard(&staged_source);
        discard(&staged_header);
        return Err(e);
    }
    if let Err(e) = commit(&staged_header, header) {
        discard(&staged_header);
        return Err(e);
    }
    log::info!("wrote {} and {}", header.display(), source.display());
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn stage(path: &Path, content: &str) -> Result<PathBuf, CompileError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CompileError::Io {
            action: "create directory for",
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    let staged = staging_path(path);
    fs::write(&staged, content).map_err(|e| CompileError::Io {
        action: "write",
        path: staged.clone(),
        source: e,
    })?;
    Ok(staged)
}

fn commit(staged: &Path, path: &Path) -> Result<(), CompileError> {
    fs::rename(staged, path).map_err(|e| CompileError::Io {
        action: "replace",
        path: path.to_path_buf(),
        source: e,
    })
}

fn discard(staged: &Path) {
    if let Err(e) = fs::remove_file(staged) {
        log::warn!("cannot remove {}: {e}", staged.display());
    }
}
