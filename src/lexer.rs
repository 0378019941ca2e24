use std::fmt::{self, Display};

use crate::error::{Diagnostic, LexError, LexErrorKind};

/// A minimal struct to track location in the source file for better errors.
///
/// `start` and `end` are character columns within the token's first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Tracks token location. `line` is zero based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub span: Span,
}

impl Position {
    /// The one-based line number used in diagnostics.
    pub fn line_number(&self) -> usize {
        self.line + 1
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.span.start + 1)
    }
}

/// The source text of one IDL file, split into lines for caret excerpts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceMap {
    filename: String,
    lines: Vec<String>,
}

impl SourceMap {
    pub fn new(source: &str, filename: &str) -> Self {
        SourceMap {
            filename: filename.to_string(),
            lines: source.split('\n').map(|l| l.trim_end_matches('\r').to_string()).collect(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the text of a zero-based line, or an empty string past the end.
    pub fn line(&self, line: usize) -> &str {
        self.lines.get(line).map(String::as_str).unwrap_or("")
    }

    /// Builds a positioned diagnostic pointing at `position`.
    pub fn diagnostic(&self, position: Position, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            filename: self.filename.clone(),
            position,
            message: message.into(),
            source_line: self.line(position.line).to_string(),
        }
    }
}

/// Primitive type keywords. `unsigned` is a separate keyword combined by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKeyword {
    Void,
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
}

// The core token definition for the IDL.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Package,
    Import,
    Interface,
    Struct,
    Enum,
    Delegate,
    Property,
    Event,
    Readonly,
    Static,
    Map,
    Set,
    Const,
    Unsigned,
    True,
    False,
    Null,
    // Primitive Types
    Primitive(TypeKeyword),
    // Delimiters and Operators
    Star,         // *
    Dot,          // .
    OpenParen,    // (
    CloseParen,   // )
    OpenBrace,    // {
    CloseBrace,   // }
    OpenBracket,  // [
    CloseBracket, // ]
    Comma,        // ,
    Semicolon,    // ;
    Colon,        // :
    Assign,       // =
    Plus,         // +
    Minus,        // -
    Slash,        // /
    Tilde,        // ~
    Pipe,         // |
    Ampersand,    // &
    Caret,        // ^
    Question,     // ?
    Less,         // <
    Greater,      // >
    /// Any non-keyword name. A leading `$` has already been stripped.
    Identifier(String),
    /// Integer literal in decimal, hex (`0x1F`) or octal (`017`) notation.
    Integer(i64),
    Float(f64),
    /// String literal without its quotes.
    Str(String),
    /// Char literal without its quotes.
    Char(String),
    /// End of File
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "identifier '{name}'"),
            TokenKind::Integer(v) => write!(f, "integer {v}"),
            TokenKind::Float(v) => write!(f, "float {v}"),
            TokenKind::Str(s) => write!(f, "string \"{s}\""),
            TokenKind::Char(c) => write!(f, "char '{c}'"),
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Primitive(t) => write!(f, "'{}'", type_keyword_text(*t)),
            other => match punctuation_text(other) {
                Some(c) => write!(f, "'{c}'"),
                None => write!(f, "'{}'", keyword_text(other)),
            },
        }
    }
}

fn type_keyword_text(t: TypeKeyword) -> &'static str {
    match t {
        TypeKeyword::Void => "void",
        TypeKeyword::Boolean => "boolean",
        TypeKeyword::Char => "char",
        TypeKeyword::Byte => "byte",
        TypeKeyword::Short => "short",
        TypeKeyword::Int => "int",
        TypeKeyword::Long => "long",
        TypeKeyword::Float => "float",
        TypeKeyword::Double => "double",
        TypeKeyword::String => "string",
    }
}

fn keyword_text(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Package => "package",
        TokenKind::Import => "import",
        TokenKind::Interface => "interface",
        TokenKind::Struct => "struct",
        TokenKind::Enum => "enum",
        TokenKind::Delegate => "delegate",
        TokenKind::Property => "property",
        TokenKind::Event => "event",
        TokenKind::Readonly => "readonly",
        TokenKind::Static => "static",
        TokenKind::Map => "map",
        TokenKind::Set => "set",
        TokenKind::Const => "const",
        TokenKind::Unsigned => "unsigned",
        TokenKind::True => "true",
        TokenKind::False => "false",
        TokenKind::Null => "null",
        _ => "?",
    }
}

fn punctuation_text(kind: &TokenKind) -> Option<char> {
    let c = match kind {
        TokenKind::Star => '*',
        TokenKind::Dot => '.',
        TokenKind::OpenParen => '(',
        TokenKind::CloseParen => ')',
        TokenKind::OpenBrace => '{',
        TokenKind::CloseBrace => '}',
        TokenKind::OpenBracket => '[',
        TokenKind::CloseBracket => ']',
        TokenKind::Comma => ',',
        TokenKind::Semicolon => ';',
        TokenKind::Colon => ':',
        TokenKind::Assign => '=',
        TokenKind::Plus => '+',
        TokenKind::Minus => '-',
        TokenKind::Slash => '/',
        TokenKind::Tilde => '~',
        TokenKind::Pipe => '|',
        TokenKind::Ampersand => '&',
        TokenKind::Caret => '^',
        TokenKind::Question => '?',
        TokenKind::Less => '<',
        TokenKind::Greater => '>',
        _ => return None,
    };
    Some(c)
}

fn punctuation(c: char) -> Option<TokenKind> {
    let kind = match c {
        '*' => TokenKind::Star,
        '.' => TokenKind::Dot,
        '(' => TokenKind::OpenParen,
        ')' => TokenKind::CloseParen,
        '{' => TokenKind::OpenBrace,
        '}' => TokenKind::CloseBrace,
        '[' => TokenKind::OpenBracket,
        ']' => TokenKind::CloseBracket,
        ',' => TokenKind::Comma,
        ';' => TokenKind::Semicolon,
        ':' => TokenKind::Colon,
        '=' => TokenKind::Assign,
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '/' => TokenKind::Slash,
        '~' => TokenKind::Tilde,
        '|' => TokenKind::Pipe,
        '&' => TokenKind::Ampersand,
        '^' => TokenKind::Caret,
        '?' => TokenKind::Question,
        '<' => TokenKind::Less,
        '>' => TokenKind::Greater,
        _ => return None,
    };
    Some(kind)
}

/// Looks up the reserved word table. `$`-prefixed text never matches.
fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "byte" => TokenKind::Primitive(TypeKeyword::Byte),
        "char" => TokenKind::Primitive(TypeKeyword::Char),
        "boolean" => TokenKind::Primitive(TypeKeyword::Boolean),
        "short" => TokenKind::Primitive(TypeKeyword::Short),
        "int" => TokenKind::Primitive(TypeKeyword::Int),
        "long" => TokenKind::Primitive(TypeKeyword::Long),
        "float" => TokenKind::Primitive(TypeKeyword::Float),
        "double" => TokenKind::Primitive(TypeKeyword::Double),
        "string" => TokenKind::Primitive(TypeKeyword::String),
        "void" => TokenKind::Primitive(TypeKeyword::Void),
        "unsigned" => TokenKind::Unsigned,
        "package" => TokenKind::Package,
        "interface" => TokenKind::Interface,
        "struct" => TokenKind::Struct,
        "enum" => TokenKind::Enum,
        "delegate" => TokenKind::Delegate,
        "property" => TokenKind::Property,
        "readonly" => TokenKind::Readonly,
        "static" => TokenKind::Static,
        "import" => TokenKind::Import,
        "map" => TokenKind::Map,
        "set" => TokenKind::Set,
        "const" => TokenKind::Const,
        "event" => TokenKind::Event,
        _ => return None,
    };
    Some(kind)
}

// A full token, including its kind and its location (span).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

/// Lazily tokenizes one IDL source.
///
/// Malformed input never stops the iterator: the offending character is
/// reported, counted and skipped.
pub struct Lexer {
    source_map: SourceMap,
    chars: Vec<char>,
    /// Character offset of the start of every line seen so far.
    start_line_indices: Vec<usize>,
    absolute_pos: usize,
    current_line: usize,
    errors: Vec<LexError>,
}

impl Lexer {
    /// Creates a new Lexer from the input source string.
    pub fn new(source: &str, filename: &str) -> Self {
        Lexer {
            source_map: SourceMap::new(source, filename),
            chars: source.chars().collect(),
            start_line_indices: vec![0],
            absolute_pos: 0,
            current_line: 0,
            errors: Vec::new(),
        }
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Lexical errors reported so far.
    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.absolute_pos + ahead).copied()
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn column_of(&self, absolute: usize) -> usize {
        absolute - self.start_line_indices[self.current_line]
    }

    fn current_position(&self) -> Position {
        let col = self.column_of(self.absolute_pos);
        Position {
            line: self.current_line,
            span: Span {
                start: col,
                end: col + 1,
            },
        }
    }

    /// Advances the internal position and consumes the current character,
    /// recording line starts as newlines are crossed.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.absolute_pos += 1;
        if c == '\n' {
            self.current_line += 1;
            self.start_line_indices.push(self.absolute_pos);
        }
        Some(c)
    }

    /// Skips spaces, tabs, carriage returns and newlines.
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\r' | '\n') {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn report(&mut self, kind: LexErrorKind, position: Position) {
        let diagnostic = self.source_map.diagnostic(position, kind.to_string());
        let error = LexError { kind, diagnostic };
        log::error!("{error}");
        self.errors.push(error);
    }

    /// Consumes a `/* */` or `//` comment. Returns false if the comment never terminates.
    fn skip_comment(&mut self) -> bool {
        self.advance();
        if self.advance() == Some('/') {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
            return true;
        }
        while let Some(c) = self.advance() {
            if c == '*' && self.peek() == Some('/') {
                self.advance();
                return true;
            }
        }
        false
    }

    /// Consumes a quoted literal up to the matching quote.
    ///
    /// Returns `None` (consuming only the opening quote) if the closing
    /// quote is missing, or if a char literal is empty.
    fn take_quoted(&mut self, quote: char) -> Option<String> {
        let start = self.absolute_pos + 1;
        let close = self.chars[start..].iter().position(|&c| c == quote)? + start;
        if quote == '\'' && close == start {
            return None;
        }
        let text: String = self.chars[start..close].iter().collect();
        while self.absolute_pos <= close {
            self.advance();
        }
        Some(text)
    }

    /// Parses an identifier or keyword.
    fn take_identifier(&mut self) -> TokenKind {
        let start = self.absolute_pos;
        if self.peek() == Some('$') {
            self.advance();
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let ident_str: String = self.chars[start..self.absolute_pos].iter().collect();

        // Check if it's a reserved keyword or type
        match keyword(&ident_str) {
            Some(kind) => kind,
            None => TokenKind::Identifier(ident_str.trim_start_matches('$').to_string()),
        }
    }

    fn count_digits(&self, from: usize, pred: impl Fn(char) -> bool) -> usize {
        self.chars[from.min(self.chars.len())..]
            .iter()
            .take_while(|&&c| pred(c))
            .count()
    }

    /// Length of an exponent suffix (`e+10`) starting at `from`, or zero.
    fn exponent_len(&self, from: usize) -> usize {
        match self.chars.get(from) {
            Some('e' | 'E') => {}
            _ => return 0,
        }
        let mut len = 1;
        if matches!(self.chars.get(from + len), Some('+' | '-')) {
            len += 1;
        }
        let digits = self.count_digits(from + len, |c| c.is_ascii_digit());
        if digits == 0 { 0 } else { len + digits }
    }

    /// Whether a numeric literal starts at the current position.
    fn at_number(&self) -> bool {
        let is_digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
        let base = if self.peek() == Some('-') { 1 } else { 0 };
        is_digit(self.peek_at(base)) || (self.peek_at(base) == Some('.') && is_digit(self.peek_at(base + 1)))
    }

    /// Parses an integer or floating point literal, including a leading `-`.
    fn take_number(&mut self) -> Result<TokenKind, LexErrorKind> {
        let start = self.absolute_pos;
        let negative = self.peek() == Some('-');
        let digits_start = start + usize::from(negative);

        let int_digits = self.count_digits(digits_start, |c| c.is_ascii_digit());
        let after_int = digits_start + int_digits;
        let mut float_end = None;
        if self.chars.get(after_int) == Some(&'.') {
            let frac = self.count_digits(after_int + 1, |c| c.is_ascii_digit());
            if int_digits > 0 || frac > 0 {
                let end = after_int + 1 + frac;
                float_end = Some(end + self.exponent_len(end));
            }
        } else if int_digits > 0 {
            let exp = self.exponent_len(after_int);
            if exp > 0 {
                float_end = Some(after_int + exp);
            }
        }

        if let Some(end) = float_end {
            let text: String = self.chars[start..end].iter().collect();
            self.absolute_pos = end;
            return text
                .parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| LexErrorKind::NumberOutOfRange(text));
        }

        let (radix, digits_from, digits_len) = match (self.chars.get(digits_start), self.chars.get(digits_start + 1)) {
            (Some('0'), Some('x' | 'X')) if self.count_digits(digits_start + 2, |c| c.is_ascii_hexdigit()) > 0 => {
                (16, digits_start + 2, self.count_digits(digits_start + 2, |c| c.is_ascii_hexdigit()))
            }
            (Some('0'), _) => (8, digits_start, 1 + self.count_digits(digits_start + 1, |c| ('0'..='7').contains(&c))),
            _ => (10, digits_start, int_digits),
        };
        let end = digits_from + digits_len;
        let digits: String = self.chars[digits_from..end].iter().collect();
        self.absolute_pos = end;

        let magnitude = i128::from_str_radix(&digits, radix).ok();
        let value = magnitude
            .map(|m| if negative { -m } else { m })
            .and_then(|v| i64::try_from(v).ok());
        match value {
            Some(v) => Ok(TokenKind::Integer(v)),
            None => Err(LexErrorKind::NumberOutOfRange(
                self.chars[start..end].iter().collect(),
            )),
        }
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // 1. Skip whitespace before processing the next token
            self.skip_whitespace();

            let c = self.peek()?;
            let start_line = self.current_line;
            let start_col = self.column_of(self.absolute_pos);
            let start_position = self.current_position();

            let kind = match c {
                '/' if matches!(self.peek_at(1), Some('/' | '*')) => {
                    if !self.skip_comment() {
                        self.report(LexErrorKind::UnterminatedComment, start_position);
                    }
                    continue;
                }
                '"' | '\'' => match self.take_quoted(c) {
                    Some(text) if c == '"' => TokenKind::Str(text),
                    Some(text) => TokenKind::Char(text),
                    None => {
                        let kind = if c == '"' {
                            LexErrorKind::UnterminatedString
                        } else {
                            LexErrorKind::UnterminatedChar
                        };
                        self.report(kind, start_position);
                        self.advance();
                        continue;
                    }
                },
                '$' if self.peek_at(1).is_some_and(|n| n.is_ascii_alphabetic() || n == '_') => {
                    self.take_identifier()
                }
                c if c.is_ascii_alphabetic() || c == '_' => self.take_identifier(),
                '-' | '.' | '0'..='9' if self.at_number() => match self.take_number() {
                    Ok(kind) => kind,
                    Err(err) => {
                        self.report(err, start_position);
                        continue;
                    }
                },
                c => match punctuation(c) {
                    Some(kind) => {
                        self.advance();
                        kind
                    }
                    None => {
                        self.report(LexErrorKind::UnrecognizedCharacter(c), start_position);
                        self.advance();
                        continue;
                    }
                },
            };

            // Tokens spanning lines are pointed at by their first character only.
            let end_col = if self.current_line == start_line {
                self.column_of(self.absolute_pos)
            } else {
                start_col + 1
            };

            return Some(Token {
                kind,
                position: Position {
                    line: start_line,
                    span: Span {
                        start: start_col,
                        end: end_col,
                    },
                },
            });
        }
    }
}

/// Convenience wrapper returning the lazy token stream of `source`.
pub fn tokenize(source: &str, filename: &str) -> Lexer {
    Lexer::new(source, filename)
}
