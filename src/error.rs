use std::{fmt, io, path::PathBuf};

use thiserror::Error;

use crate::{color, lexer::Position};

/// A positioned message with the offending source line, rendered as
///
/// ```text
/// file.idl(3) : Unexpected token ';'
///   int foo(;
///           ^
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub filename: String,
    pub position: Position,
    pub message: String,
    pub source_line: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filename.is_empty() {
            write!(f, "<BuiltIn> : {}", self.message)?;
        } else {
            write!(
                f,
                "{}({}) : {}",
                self.filename,
                self.position.line_number(),
                self.message
            )?;
        }
        let width = self
            .position
            .span
            .end
            .saturating_sub(self.position.span.start)
            .max(1);
        write!(
            f,
            "\n{}\n{}{}{}{}",
            self.source_line,
            " ".repeat(self.position.span.start),
            color::RED,
            "^".repeat(width),
            color::END
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("Unrecognized input '{0}'")]
    UnrecognizedCharacter(char),
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Unterminated char literal")]
    UnterminatedChar,
    #[error("Unterminated block comment")]
    UnterminatedComment,
    #[error("Numeric literal '{0}' out of range")]
    NumberOutOfRange(String),
}

/// A recoverable lexical error. The lexer keeps going after reporting one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{}error{}: {diagnostic}", color::RED, color::END)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub diagnostic: Diagnostic,
}

/// A fatal grammar error; nothing of the file is usable after one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("{}error{}: {diagnostic}", color::RED, color::END)]
    UnexpectedToken { diagnostic: Diagnostic },
    #[error("{}error{}: {diagnostic}", color::RED, color::END)]
    UnexpectedEof { diagnostic: Diagnostic },
    /// Types or struct bodies nested past the parser's limit.
    #[error("{}error{}: {diagnostic}", color::RED, color::END)]
    TooDeep { diagnostic: Diagnostic },
}

impl SyntaxError {
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            SyntaxError::UnexpectedToken { diagnostic }
            | SyntaxError::UnexpectedEof { diagnostic }
            | SyntaxError::TooDeep { diagnostic } => diagnostic,
        }
    }
}

/// A fatal error raised while resolving the parsed file or checking output paths.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// A composite type appeared where a signature code is required.
    #[error("{}error{}: {diagnostic}", color::RED, color::END)]
    UnsupportedType {
        member: String,
        ty: String,
        diagnostic: Diagnostic,
    },
    #[error("{}error{}: {diagnostic}", color::RED, color::END)]
    UnknownType { name: String, diagnostic: Diagnostic },
    /// The name resolves to a struct, enum or delegate, which have no signature code.
    #[error("{}error{}: {diagnostic}", color::RED, color::END)]
    NotAnInterface {
        name: String,
        kind: &'static str,
        diagnostic: Diagnostic,
    },
    #[error("{}error{}: {what} file must end with: '{expected}' (got '{}')", color::RED, color::END, .path.display())]
    OutputPathMismatch {
        what: &'static str,
        path: PathBuf,
        expected: String,
    },
}

/// Any failure of a whole compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("{}error{}: cannot {action} '{}': {source}", color::RED, color::END, .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
