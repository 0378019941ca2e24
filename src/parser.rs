use crate::{
    ast::{
        Argument, Constructor, Delegate, Enum, EnumValue, Event, ExtendedAttribute,
        ExtendedAttributeArgument, ExtendedAttributes, File, Import, Interface, Literal,
        LiteralValue, Member, Method, Modifier, ModifierKind, Name, Package, PrimitiveType,
        Property, QualifiedName, SimpleName, Struct, Type, TypeKind,
    },
    error::{LexError, SyntaxError},
    lexer::{Lexer, Position, Span, Token, TokenKind, TypeKeyword},
};

/// Deepest allowed nesting of types and struct bodies.
pub const MAX_NESTING: usize = 64;

/// The `Parser` struct is responsible for parsing IDL source code into an AST (`File`).
///
/// Each parser owns its lexer; nothing is shared between compilations.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    peeked: Option<Token>,
    depth: usize,
}

impl Parser {
    /// Creates a new parser and grabs the first token.
    pub fn new(source: &str, filename: &str) -> Self {
        Self::from_lexer(Lexer::new(source, filename))
    }

    pub fn from_lexer(mut lexer: Lexer) -> Self {
        let current_token = next_or_eof(&mut lexer, Position::default());
        Parser {
            lexer,
            current_token,
            peeked: None,
            depth: 0,
        }
    }

    /// Lexical errors accumulated while parsing.
    pub fn lex_errors(&self) -> &[LexError] {
        self.lexer.errors()
    }

    pub fn into_lex_errors(mut self) -> Vec<LexError> {
        self.lexer.take_errors()
    }

    /// Advances the parser to the next token.
    fn advance(&mut self) {
        self.current_token = match self.peeked.take() {
            Some(token) => token,
            None => next_or_eof(&mut self.lexer, self.current_token.position),
        };
    }

    /// The token after the current one.
    fn peek(&mut self) -> &TokenKind {
        if self.peeked.is_none() {
            self.peeked = Some(next_or_eof(&mut self.lexer, self.current_token.position));
        }
        match &self.peeked {
            Some(token) => &token.kind,
            None => &TokenKind::Eof,
        }
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.current_token.kind == kind
    }

    /// Builds the error for the current token, naming what the grammar wanted instead.
    fn unexpected(&self, expected: &str) -> SyntaxError {
        let token = &self.current_token;
        let message = format!("Unexpected token {}, expected {expected}", token.kind);
        let diagnostic = self.lexer.source_map().diagnostic(token.position, message);
        log::debug!("syntax error at {}", token.position);
        if token.kind == TokenKind::Eof {
            SyntaxError::UnexpectedEof { diagnostic }
        } else {
            SyntaxError::UnexpectedToken { diagnostic }
        }
    }

    /// Enters one nesting level, failing past [`MAX_NESTING`].
    fn descend(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            let message = format!("Nesting deeper than {MAX_NESTING} levels");
            let diagnostic = self
                .lexer
                .source_map()
                .diagnostic(self.current_token.position, message);
            return Err(SyntaxError::TooDeep { diagnostic });
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    /// Checks if the current token matches an expected kind, consumes it, and advances.
    /// Returns the position of the consumed token.
    fn consume(&mut self, expected: TokenKind) -> Result<Position, SyntaxError> {
        if self.current_token.kind == expected {
            let position = self.current_token.position;
            self.advance();
            Ok(position)
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    /// Helper to consume an Identifier and return it as a name node.
    fn consume_identifier(&mut self) -> Result<SimpleName, SyntaxError> {
        let name = match &self.current_token.kind {
            TokenKind::Identifier(id) => id.clone(),
            _ => return Err(self.unexpected("an identifier")),
        };
        let position = self.current_token.position;
        self.advance();
        Ok(SimpleName { name, position })
    }

    /// Parses a comma separated list closed by `close`. A trailing comma is
    /// accepted, a leading one is not.
    fn parse_list<T>(
        &mut self,
        close: &TokenKind,
        mut item: impl FnMut(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<Vec<T>, SyntaxError> {
        let mut items = Vec::new();
        while !self.at(close) {
            items.push(item(self)?);
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(items)
    }

    // --- Core Parsing Functions ---

    /// Parses the entire IDL file: `Package ImportList Interface`.
    pub fn parse_file(&mut self) -> Result<File, SyntaxError> {
        let package = self.parse_package()?;

        let mut imports = Vec::new();
        while self.at(&TokenKind::Import) {
            imports.push(self.parse_import()?);
        }

        let interface = self.parse_interface()?;
        if !self.at(&TokenKind::Eof) {
            return Err(self.unexpected("end of input"));
        }

        log::debug!(
            "parsed interface '{}' with {} members",
            interface.name.name,
            interface.members.len()
        );

        Ok(File {
            position: package.position,
            package,
            imports,
            interface,
            source: self.lexer.source_map().clone(),
        })
    }

    fn parse_package(&mut self) -> Result<Package, SyntaxError> {
        let position = self.consume(TokenKind::Package)?;
        let name = self.parse_name()?;
        self.consume(TokenKind::Semicolon)?;
        Ok(Package { name, position })
    }

    fn parse_import(&mut self) -> Result<Import, SyntaxError> {
        let position = self.consume(TokenKind::Import)?;
        let name = self.parse_name()?;
        self.consume(TokenKind::Semicolon)?;
        Ok(Import { name, position })
    }

    /// Parses `a` or `a.b.c` into a left-nested qualified name.
    fn parse_name(&mut self) -> Result<Name, SyntaxError> {
        let first = self.consume_identifier()?;
        let position = first.position;
        let mut name = Name::Simple(first);
        while self.at(&TokenKind::Dot) {
            self.advance();
            let identifier = self.consume_identifier()?;
            name = Name::Qualified(QualifiedName {
                qualifier: Box::new(name),
                identifier,
                position,
            });
        }
        Ok(name)
    }

    // --- Attributes and modifiers ---

    /// Parses an optional `[attr, attr(args)]` block.
    fn parse_attributes(&mut self) -> Result<ExtendedAttributes, SyntaxError> {
        if !self.at(&TokenKind::OpenBracket) {
            return Ok(ExtendedAttributes::default());
        }
        self.advance();
        let attributes = self.parse_list(&TokenKind::CloseBracket, Self::parse_attribute)?;
        self.consume(TokenKind::CloseBracket)?;
        Ok(ExtendedAttributes(attributes))
    }

    fn parse_attribute(&mut self) -> Result<ExtendedAttribute, SyntaxError> {
        let name = self.consume_identifier()?;
        let mut arguments = Vec::new();
        if self.at(&TokenKind::OpenParen) {
            self.advance();
            arguments = self.parse_list(&TokenKind::CloseParen, Self::parse_attribute_argument)?;
            self.consume(TokenKind::CloseParen)?;
        }
        Ok(ExtendedAttribute {
            name: name.name,
            arguments,
            position: name.position,
        })
    }

    fn parse_attribute_argument(&mut self) -> Result<ExtendedAttributeArgument, SyntaxError> {
        let position = self.current_token.position;
        let key = self.parse_attribute_value()?;
        let value = if self.at(&TokenKind::Assign) {
            self.advance();
            Some(self.parse_attribute_value()?)
        } else {
            None
        };
        Ok(ExtendedAttributeArgument {
            key,
            value,
            position,
        })
    }

    /// An attribute value is an identifier or a string literal.
    fn parse_attribute_value(&mut self) -> Result<String, SyntaxError> {
        let value = match &self.current_token.kind {
            TokenKind::Identifier(s) | TokenKind::Str(s) => s.clone(),
            _ => return Err(self.unexpected("an identifier or string")),
        };
        self.advance();
        Ok(value)
    }

    fn parse_modifiers(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        loop {
            let kind = match self.current_token.kind {
                TokenKind::Static => ModifierKind::Static,
                TokenKind::Readonly => ModifierKind::ReadOnly,
                _ => break,
            };
            modifiers.push(Modifier {
                kind,
                position: self.current_token.position,
            });
            self.advance();
        }
        modifiers
    }

    /// The position a declaration inherits: its first attribute, else its
    /// first modifier, else the current token.
    fn declaration_position(&self, attributes: &ExtendedAttributes, modifiers: &[Modifier]) -> Position {
        attributes
            .first()
            .map(|a| a.position)
            .or_else(|| modifiers.first().map(|m| m.position))
            .unwrap_or(self.current_token.position)
    }

    // --- Declarations ---

    fn parse_interface(&mut self) -> Result<Interface, SyntaxError> {
        let attributes = self.parse_attributes()?;
        let modifiers = self.parse_modifiers();
        let position = self.declaration_position(&attributes, &modifiers);
        self.consume(TokenKind::Interface)?;
        let name = self.consume_identifier()?;
        let extends = self.parse_extends()?;
        let members = self.parse_member_block()?;
        Ok(Interface {
            attributes,
            modifiers,
            name,
            extends,
            members,
            position,
        })
    }

    fn parse_extends(&mut self) -> Result<Option<Type>, SyntaxError> {
        if !self.at(&TokenKind::Colon) {
            return Ok(None);
        }
        self.advance();
        let name = self.parse_name()?;
        Ok(Some(Type {
            position: name.position(),
            kind: TypeKind::UserDefined(name),
        }))
    }

    /// Parses `{ Member* } ;`.
    fn parse_member_block(&mut self) -> Result<Vec<Member>, SyntaxError> {
        self.consume(TokenKind::OpenBrace)?;
        self.descend()?;
        let mut members = Vec::new();
        while !self.at(&TokenKind::CloseBrace) {
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            members.push(self.parse_member()?);
        }
        self.ascend();
        self.consume(TokenKind::CloseBrace)?;
        self.consume(TokenKind::Semicolon)?;
        Ok(members)
    }

    fn parse_member(&mut self) -> Result<Member, SyntaxError> {
        let attributes = self.parse_attributes()?;
        let modifiers = self.parse_modifiers();
        let position = self.declaration_position(&attributes, &modifiers);
        let starts_constructor = matches!(self.current_token.kind, TokenKind::Identifier(_))
            && self.peek() == &TokenKind::OpenParen;

        match self.current_token.kind {
            TokenKind::Struct => {
                self.advance();
                let name = self.consume_identifier()?;
                let extends = self.parse_extends()?;
                let members = self.parse_member_block()?;
                Ok(Member::Struct(Struct {
                    attributes,
                    modifiers,
                    name,
                    extends,
                    members,
                    position,
                }))
            }
            TokenKind::Enum => {
                self.advance();
                let name = self.consume_identifier()?;
                self.consume(TokenKind::OpenBrace)?;
                let values = self.parse_list(&TokenKind::CloseBrace, Self::parse_enum_value)?;
                self.consume(TokenKind::CloseBrace)?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Member::Enum(Enum {
                    attributes,
                    modifiers,
                    name,
                    values,
                    position,
                }))
            }
            TokenKind::Delegate => {
                self.advance();
                let return_type = self.parse_type()?;
                let name = self.consume_identifier()?;
                let arguments = self.parse_arguments()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Member::Delegate(Delegate {
                    attributes,
                    modifiers,
                    return_type,
                    name,
                    arguments,
                    position,
                }))
            }
            TokenKind::Property => {
                self.advance();
                // `property readonly T x;` is accepted as well as `readonly property T x;`.
                let mut modifiers = modifiers;
                let trailing = self.parse_modifiers();
                let position = if modifiers.is_empty() && attributes.is_empty() {
                    trailing.first().map_or(position, |m| m.position)
                } else {
                    position
                };
                modifiers.extend(trailing);
                let ty = self.parse_type()?;
                let name = self.consume_identifier()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Member::Property(Property {
                    attributes,
                    modifiers,
                    ty,
                    name,
                    position,
                }))
            }
            TokenKind::Event if modifiers.is_empty() => {
                self.advance();
                let name = self.consume_identifier()?;
                let arguments = self.parse_arguments()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Member::Event(Event {
                    attributes,
                    name,
                    arguments,
                    position,
                }))
            }
            TokenKind::Event => Err(self.unexpected("a type or member name")),
            TokenKind::Identifier(_) if starts_constructor => {
                let name = self.consume_identifier()?;
                let arguments = self.parse_arguments()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Member::Constructor(Constructor {
                    attributes,
                    modifiers,
                    name,
                    arguments,
                    position,
                }))
            }
            _ => {
                let return_type = self.parse_type()?;
                let name = self.consume_identifier()?;
                let arguments = self.parse_arguments()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Member::Method(Method {
                    attributes,
                    modifiers,
                    return_type,
                    name,
                    arguments,
                    position,
                }))
            }
        }
    }

    fn parse_enum_value(&mut self) -> Result<EnumValue, SyntaxError> {
        let attributes = self.parse_attributes()?;
        let position = self.declaration_position(&attributes, &[]);
        let name = self.consume_identifier()?;
        Ok(EnumValue {
            attributes,
            name,
            position,
        })
    }

    /// Parses `( Argument,* )`.
    fn parse_arguments(&mut self) -> Result<Vec<Argument>, SyntaxError> {
        self.consume(TokenKind::OpenParen)?;
        let arguments = self.parse_list(&TokenKind::CloseParen, Self::parse_argument)?;
        self.consume(TokenKind::CloseParen)?;
        Ok(arguments)
    }

    fn parse_argument(&mut self) -> Result<Argument, SyntaxError> {
        let attributes = self.parse_attributes()?;
        let position = self.declaration_position(&attributes, &[]);
        let ty = self.parse_type()?;
        let name = self.consume_identifier()?;
        let default = if self.at(&TokenKind::Assign) {
            self.advance();
            Some(self.parse_literal()?)
        } else {
            None
        };
        Ok(Argument {
            attributes,
            ty,
            name,
            default,
            position,
        })
    }

    fn parse_literal(&mut self) -> Result<Literal, SyntaxError> {
        let value = match &self.current_token.kind {
            TokenKind::True => LiteralValue::Boolean(true),
            TokenKind::False => LiteralValue::Boolean(false),
            TokenKind::Null => LiteralValue::Null,
            TokenKind::Integer(i) => LiteralValue::Int(*i),
            TokenKind::Float(x) => LiteralValue::Float(*x),
            TokenKind::Char(c) => LiteralValue::Char(c.clone()),
            TokenKind::Str(s) => LiteralValue::String(s.clone()),
            _ => return Err(self.unexpected("a literal")),
        };
        let position = self.current_token.position;
        self.advance();
        Ok(Literal { value, position })
    }

    // --- Type Parsing ---

    /// Parses a type with its modifier chain.
    ///
    /// Postfix `[]`, `?`, `*` and `&` apply left to right. A `const` prefix
    /// takes its operand together with directly following `?` and `[]`, but
    /// `*` and `&` bind looser and close it: `const T*` is `pointer(const(T))`
    /// while `const T?` is `const(optional(T))`.
    fn parse_type(&mut self) -> Result<Type, SyntaxError> {
        self.descend()?;
        let mut ty = if self.at(&TokenKind::Const) {
            self.parse_const_type()?
        } else {
            self.parse_primary_type()?
        };
        loop {
            ty = match self.current_token.kind {
                TokenKind::Star => self.wrap_postfix(ty, TypeKind::Pointer),
                TokenKind::Ampersand => self.wrap_postfix(ty, TypeKind::Reference),
                TokenKind::Question => self.wrap_postfix(ty, TypeKind::Optional),
                TokenKind::OpenBracket => self.parse_array_suffix(ty)?,
                _ => break,
            };
        }
        self.ascend();
        Ok(ty)
    }

    /// Parses `const` Type, where the operand absorbs only `?` and `[]`.
    fn parse_const_type(&mut self) -> Result<Type, SyntaxError> {
        let position = self.consume(TokenKind::Const)?;
        self.descend()?;
        let mut operand = if self.at(&TokenKind::Const) {
            self.parse_const_type()?
        } else {
            self.parse_primary_type()?
        };
        loop {
            operand = match self.current_token.kind {
                TokenKind::Question => self.wrap_postfix(operand, TypeKind::Optional),
                TokenKind::OpenBracket => self.parse_array_suffix(operand)?,
                _ => break,
            };
        }
        self.ascend();
        Ok(Type {
            kind: TypeKind::Const(Box::new(operand)),
            position,
        })
    }

    fn wrap_postfix(&mut self, inner: Type, wrap: fn(Box<Type>) -> TypeKind) -> Type {
        self.advance();
        Type {
            position: inner.position,
            kind: wrap(Box::new(inner)),
        }
    }

    fn parse_array_suffix(&mut self, element: Type) -> Result<Type, SyntaxError> {
        self.consume(TokenKind::OpenBracket)?;
        self.consume(TokenKind::CloseBracket)?;
        Ok(Type {
            position: element.position,
            kind: TypeKind::Array(Box::new(element)),
        })
    }

    /// Parses a primitive, `map<K, V>`, `set<K>` or a named type.
    fn parse_primary_type(&mut self) -> Result<Type, SyntaxError> {
        let position = self.current_token.position;
        let kind = match &self.current_token.kind {
            TokenKind::Primitive(keyword) => {
                let primitive = primitive_of(*keyword);
                self.advance();
                TypeKind::Primitive(primitive)
            }
            TokenKind::Unsigned => {
                self.advance();
                let primitive = match self.current_token.kind {
                    TokenKind::Primitive(TypeKeyword::Byte) => PrimitiveType::UnsignedByte,
                    TokenKind::Primitive(TypeKeyword::Short) => PrimitiveType::UnsignedShort,
                    TokenKind::Primitive(TypeKeyword::Int) => PrimitiveType::UnsignedInt,
                    TokenKind::Primitive(TypeKeyword::Long) => PrimitiveType::UnsignedLong,
                    _ => return Err(self.unexpected("'byte', 'short', 'int' or 'long'")),
                };
                self.advance();
                TypeKind::Primitive(primitive)
            }
            TokenKind::Map => {
                self.advance();
                self.consume(TokenKind::Less)?;
                let key = self.parse_type()?;
                self.consume(TokenKind::Comma)?;
                let value = self.parse_type()?;
                self.consume(TokenKind::Greater)?;
                TypeKind::Map(Box::new(key), Box::new(value))
            }
            TokenKind::Set => {
                self.advance();
                self.consume(TokenKind::Less)?;
                let key = self.parse_type()?;
                self.consume(TokenKind::Greater)?;
                TypeKind::Set(Box::new(key))
            }
            TokenKind::Identifier(_) => TypeKind::UserDefined(self.parse_name()?),
            _ => return Err(self.unexpected("a type")),
        };
        Ok(Type { kind, position })
    }
}

fn next_or_eof(lexer: &mut Lexer, last: Position) -> Token {
    lexer.next().unwrap_or(Token {
        kind: TokenKind::Eof,
        // Use the last known position
        position: Position {
            line: last.line,
            span: Span {
                start: last.span.end,
                end: last.span.end + 1,
            },
        },
    })
}

fn primitive_of(keyword: TypeKeyword) -> PrimitiveType {
    match keyword {
        TypeKeyword::Void => PrimitiveType::Void,
        TypeKeyword::Boolean => PrimitiveType::Boolean,
        TypeKeyword::Char => PrimitiveType::Char,
        TypeKeyword::Byte => PrimitiveType::Byte,
        TypeKeyword::Short => PrimitiveType::Short,
        TypeKeyword::Int => PrimitiveType::Int,
        TypeKeyword::Long => PrimitiveType::Long,
        TypeKeyword::Float => PrimitiveType::Float,
        TypeKeyword::Double => PrimitiveType::Double,
        TypeKeyword::String => PrimitiveType::String,
    }
}

/// Parses one IDL source into its `File`, failing on the first syntax error.
pub fn parse(source: &str, filename: &str) -> Result<File, SyntaxError> {
    Parser::new(source, filename).parse_file()
}
