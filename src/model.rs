//! The resolved form of one interface, ready for code generation.
//!
//! Built once by [`crate::loader::resolve`] and read by the generators. Nothing
//! here points back into the AST except the cloned types, attributes and
//! default literals that the generators print.

use std::{collections::BTreeMap, fmt};

use crate::ast::{ExtendedAttributes, Literal, Type};

/// Coarse marshalling category of a value crossing the native/script bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Int64,
    Float32,
    Float64,
    String,
    Void,
    /// Composite and user-defined types. Glue for these is not generated yet.
    Unsupported,
}

impl ValueKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ValueKind::Int => "kInt",
            ValueKind::Int64 => "kInt64",
            ValueKind::Float32 => "kFloat32",
            ValueKind::Float64 => "kFloat64",
            ValueKind::String => "kString",
            ValueKind::Void => "kVoid",
            ValueKind::Unsupported => "kUnsupportType",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Maps short names to fully-qualified names. Later inserts win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: BTreeMap<String, String>,
}

impl SymbolTable {
    pub fn insert(&mut self, short: impl Into<String>, fullname: impl Into<String>) {
        self.symbols.insert(short.into(), fullname.into());
    }

    pub fn get(&self, short: &str) -> Option<&str> {
        self.symbols.get(short).map(String::as_str)
    }

    /// True when `fullname` is the target of some entry.
    pub fn contains_fullname(&self, fullname: &str) -> bool {
        self.symbols.values().any(|v| v == fullname)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Struct,
    Enum,
    Delegate,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Struct => "struct",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Delegate => "delegate",
        }
    }
}

/// A type declared inside the interface body, at any nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    /// Dotted path from the interface, e.g. `Foo.Point.Axis`.
    pub qualified_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentModel {
    pub name: String,
    pub ty: Type,
    pub kind: ValueKind,
    pub default: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodModel {
    pub name: String,
    pub index_name: String,
    pub is_static: bool,
    pub return_type: Type,
    pub arguments: Vec<ArgumentModel>,
    /// Return code followed by one code per argument.
    pub signature: String,
    /// Return kind followed by one kind per argument.
    pub call_types: Vec<ValueKind>,
    pub attributes: ExtendedAttributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyModel {
    pub name: String,
    pub index_name: String,
    pub ty: Type,
    pub signature: String,
    pub value_kind: ValueKind,
    pub readonly: bool,
    pub is_static: bool,
    pub attributes: ExtendedAttributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventModel {
    pub name: String,
    pub index_name: String,
    pub is_final: bool,
    pub arguments: Vec<ArgumentModel>,
    pub argument_kinds: Vec<ValueKind>,
    pub attributes: ExtendedAttributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorModel {
    pub name: String,
    pub arguments: Vec<ArgumentModel>,
    pub argument_kinds: Vec<ValueKind>,
    pub attributes: ExtendedAttributes,
}

/// Everything the generators need to know about one compiled interface.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceModel {
    pub package: String,
    pub name: String,
    pub fullname: String,
    /// Fully-qualified name of the base interface.
    pub extends: Option<String>,
    pub is_static: bool,
    pub attributes: ExtendedAttributes,
    /// Dotted import names in source order.
    pub imports: Vec<String>,
    pub symbols: SymbolTable,
    pub declarations: Vec<Declaration>,
    pub methods: Vec<MethodModel>,
    pub properties: Vec<PropertyModel>,
    pub events: Vec<EventModel>,
    pub constructors: Vec<ConstructorModel>,
}

impl InterfaceModel {
    pub fn package_segments(&self) -> impl Iterator<Item = &str> {
        self.package.split('.').filter(|s| !s.is_empty())
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind_tags() {
        assert_eq!(ValueKind::Int64.to_string(), "kInt64");
        assert_eq!(ValueKind::Unsupported.to_string(), "kUnsupportType");
    }

    #[test]
    fn test_symbol_table_later_insert_wins() {
        let mut table = SymbolTable::default();
        table.insert("Foo", "a.b.Foo");
        table.insert("Foo", "c.Foo");
        assert_eq!(table.get("Foo"), Some("c.Foo"));
        assert_eq!(table.get("Bar"), None);
        assert!(table.contains_fullname("c.Foo"));
        assert!(!table.contains_fullname("a.b.Foo"));
    }
}
