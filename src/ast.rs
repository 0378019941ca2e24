use std::fmt;

use crate::lexer::{Position, SourceMap};

/// Represents the primitive types supported by the IDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Void,
    Boolean,
    Char,
    /// Signed 8-bit integer.
    Byte,
    /// Unsigned 8-bit integer.
    UnsignedByte,
    /// Signed 16-bit integer.
    Short,
    /// Unsigned 16-bit integer.
    UnsignedShort,
    /// Signed 32-bit integer.
    Int,
    /// Unsigned 32-bit integer.
    UnsignedInt,
    /// Signed 64-bit integer.
    Long,
    /// Unsigned 64-bit integer.
    UnsignedLong,
    /// 32-bit floating point number.
    Float,
    /// 64-bit floating point number.
    Double,
    String,
}

impl PrimitiveType {
    /// The IDL spelling of the type.
    pub fn keyword(&self) -> &'static str {
        match self {
            PrimitiveType::Void => "void",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
            PrimitiveType::Byte => "byte",
            PrimitiveType::UnsignedByte => "unsigned byte",
            PrimitiveType::Short => "short",
            PrimitiveType::UnsignedShort => "unsigned short",
            PrimitiveType::Int => "int",
            PrimitiveType::UnsignedInt => "unsigned int",
            PrimitiveType::Long => "long",
            PrimitiveType::UnsignedLong => "unsigned long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::String => "string",
        }
    }
}

// --- Literals ---

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Boolean(bool),
    Int(i64),
    Float(f64),
    Char(String),
    String(String),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
    pub position: Position,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            LiteralValue::Boolean(b) => write!(f, "{b}"),
            LiteralValue::Int(i) => write!(f, "{i}"),
            LiteralValue::Float(x) => write!(f, "{x:?}"),
            LiteralValue::Char(c) => write!(f, "'{c}'"),
            LiteralValue::String(s) => write!(f, "\"{s}\""),
            LiteralValue::Null => write!(f, "null"),
        }
    }
}

// --- Names ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleName {
    pub name: String,
    pub position: Position,
}

/// `qualifier.identifier`, where the qualifier may itself be qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub qualifier: Box<Name>,
    pub identifier: SimpleName,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Name {
    Simple(SimpleName),
    Qualified(QualifiedName),
}

impl Name {
    /// The dotted name, e.g. `a.b.Foo`.
    pub fn fullname(&self) -> String {
        match self {
            Name::Simple(s) => s.name.clone(),
            Name::Qualified(q) => format!("{}.{}", q.qualifier.fullname(), q.identifier.name),
        }
    }

    /// The last dotted segment.
    pub fn last(&self) -> &str {
        match self {
            Name::Simple(s) => &s.name,
            Name::Qualified(q) => &q.identifier.name,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Name::Simple(s) => s.position,
            Name::Qualified(q) => q.position,
        }
    }
}

// --- Types ---

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Primitive(PrimitiveType),
    Array(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Set(Box<Type>),
    Optional(Box<Type>),
    Const(Box<Type>),
    Pointer(Box<Type>),
    Reference(Box<Type>),
    /// A reference to a named type (interface, struct, enum or delegate).
    UserDefined(Name),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub kind: TypeKind,
    pub position: Position,
}

impl Type {
    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self.kind {
            TypeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Primitive(p) => f.write_str(p.keyword()),
            TypeKind::Array(t) => write!(f, "{t}[]"),
            TypeKind::Map(k, v) => write!(f, "map<{k}, {v}>"),
            TypeKind::Set(k) => write!(f, "set<{k}>"),
            TypeKind::Optional(t) => write!(f, "{t}?"),
            TypeKind::Const(t) => write!(f, "const {t}"),
            TypeKind::Pointer(t) => write!(f, "{t}*"),
            TypeKind::Reference(t) => write!(f, "{t}&"),
            TypeKind::UserDefined(name) => f.write_str(&name.fullname()),
        }
    }
}

// --- Modifiers and extended attributes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind {
    Static,
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifier {
    pub kind: ModifierKind,
    pub position: Position,
}

/// One `key` or `key=value` entry inside `[name(...)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedAttributeArgument {
    pub key: String,
    pub value: Option<String>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedAttribute {
    pub name: String,
    pub arguments: Vec<ExtendedAttributeArgument>,
    pub position: Position,
}

impl ExtendedAttribute {
    /// The key of the argument at `index`, if there is one.
    pub fn value(&self, index: usize) -> Option<&str> {
        self.arguments.get(index).map(|a| a.key.as_str())
    }

    /// The value of the first argument whose key is `key`.
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|a| a.key == key)
            .and_then(|a| a.value.as_deref())
    }
}

/// An ordered attribute block. Lookups return the first match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedAttributes(pub Vec<ExtendedAttribute>);

impl ExtendedAttributes {
    pub fn get(&self, name: &str) -> Option<&ExtendedAttribute> {
        self.0.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Shorthand for `get(name)?.value(index)`.
    pub fn value(&self, name: &str, index: usize) -> Option<&str> {
        self.get(name).and_then(|a| a.value(index))
    }

    /// Shorthand for `get(name)?.value_of(key)`.
    pub fn value_of(&self, name: &str, key: &str) -> Option<&str> {
        self.get(name).and_then(|a| a.value_of(key))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&ExtendedAttribute> {
        self.0.first()
    }
}

// --- Members ---

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub attributes: ExtendedAttributes,
    pub ty: Type,
    pub name: SimpleName,
    /// Untyped default; no check against `ty` is made.
    pub default: Option<Literal>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub attributes: ExtendedAttributes,
    pub modifiers: Vec<Modifier>,
    pub name: SimpleName,
    /// Always a [`TypeKind::UserDefined`] reference.
    pub extends: Option<Type>,
    pub members: Vec<Member>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
    pub attributes: ExtendedAttributes,
    pub modifiers: Vec<Modifier>,
    pub name: SimpleName,
    pub extends: Option<Type>,
    pub members: Vec<Member>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub attributes: ExtendedAttributes,
    pub name: SimpleName,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
    pub attributes: ExtendedAttributes,
    pub modifiers: Vec<Modifier>,
    pub name: SimpleName,
    pub values: Vec<EnumValue>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delegate {
    pub attributes: ExtendedAttributes,
    pub modifiers: Vec<Modifier>,
    pub return_type: Type,
    pub name: SimpleName,
    pub arguments: Vec<Argument>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub attributes: ExtendedAttributes,
    pub name: SimpleName,
    pub arguments: Vec<Argument>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constructor {
    pub attributes: ExtendedAttributes,
    pub modifiers: Vec<Modifier>,
    pub name: SimpleName,
    pub arguments: Vec<Argument>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub attributes: ExtendedAttributes,
    pub modifiers: Vec<Modifier>,
    pub return_type: Type,
    pub name: SimpleName,
    pub arguments: Vec<Argument>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub attributes: ExtendedAttributes,
    pub modifiers: Vec<Modifier>,
    pub ty: Type,
    pub name: SimpleName,
    pub position: Position,
}

/// Anything that can appear between an interface's (or struct's) braces.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Struct(Struct),
    Enum(Enum),
    Delegate(Delegate),
    Constructor(Constructor),
    Method(Method),
    Event(Event),
    Property(Property),
}

pub fn has_modifier(modifiers: &[Modifier], kind: ModifierKind) -> bool {
    modifiers.iter().any(|m| m.kind == kind)
}

// --- File ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: Name,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub name: Name,
    pub position: Position,
}

/// The parse root: one package, its imports and exactly one interface.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub package: Package,
    pub imports: Vec<Import>,
    pub interface: Interface,
    pub position: Position,
    /// Kept so later phases can point diagnostics into the source.
    pub source: SourceMap,
}
