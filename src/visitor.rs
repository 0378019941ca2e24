//! Generic depth-first traversal over the AST.
//!
//! Every node kind lists its child fields once, in [`Node::children`]. The
//! [`Walker`] drives a [`Visitor`] through that list: it calls `enter`, walks
//! each field in declaration order, then calls `exit`. Interface, struct and
//! enum declarations wrap their members in namespace markers so visitors can
//! ask for the dotted scope they are in.

use std::fmt::Write;

use crate::{
    ast::{
        Argument, Constructor, Delegate, Enum, EnumValue, Event, ExtendedAttribute,
        ExtendedAttributeArgument, File, Import, Interface, Literal, Member, Method, Modifier,
        ModifierKind, Name, Package, Property, QualifiedName, SimpleName, Struct, Type, TypeKind,
    },
    lexer::Position,
};

/// A borrowed reference to any AST node.
#[derive(Debug, Clone, Copy)]
pub enum Node<'ast> {
    File(&'ast File),
    Package(&'ast Package),
    Import(&'ast Import),
    SimpleName(&'ast SimpleName),
    QualifiedName(&'ast QualifiedName),
    Literal(&'ast Literal),
    Type(&'ast Type),
    Modifier(&'ast Modifier),
    ExtendedAttribute(&'ast ExtendedAttribute),
    ExtendedAttributeArgument(&'ast ExtendedAttributeArgument),
    Interface(&'ast Interface),
    Struct(&'ast Struct),
    Enum(&'ast Enum),
    EnumValue(&'ast EnumValue),
    Delegate(&'ast Delegate),
    Event(&'ast Event),
    Constructor(&'ast Constructor),
    Method(&'ast Method),
    Property(&'ast Property),
    Argument(&'ast Argument),
}

/// The value held by one child field.
#[derive(Debug, Clone)]
pub enum Field<'ast> {
    Absent,
    One(Node<'ast>),
    Many(Vec<Node<'ast>>),
}

/// One entry of a node's ordered child list.
#[derive(Debug, Clone)]
pub enum Child<'ast> {
    Field(&'static str, Field<'ast>),
    /// Pushes the given name on the namespace stack.
    EnterNamespace(&'ast str),
    ExitNamespace,
}

impl<'ast> From<&'ast Name> for Node<'ast> {
    fn from(name: &'ast Name) -> Self {
        match name {
            Name::Simple(s) => Node::SimpleName(s),
            Name::Qualified(q) => Node::QualifiedName(q),
        }
    }
}

impl<'ast> From<&'ast Member> for Node<'ast> {
    fn from(member: &'ast Member) -> Self {
        match member {
            Member::Struct(s) => Node::Struct(s),
            Member::Enum(e) => Node::Enum(e),
            Member::Delegate(d) => Node::Delegate(d),
            Member::Constructor(c) => Node::Constructor(c),
            Member::Method(m) => Node::Method(m),
            Member::Event(e) => Node::Event(e),
            Member::Property(p) => Node::Property(p),
        }
    }
}

fn one<'ast>(name: &'static str, node: impl Into<Node<'ast>>) -> Child<'ast> {
    Child::Field(name, Field::One(node.into()))
}

fn optional<'ast, T: 'ast>(name: &'static str, value: Option<&'ast T>, f: fn(&'ast T) -> Node<'ast>) -> Child<'ast> {
    Child::Field(name, value.map_or(Field::Absent, |v| Field::One(f(v))))
}

fn many<'ast, T: 'ast>(name: &'static str, items: &'ast [T], f: fn(&'ast T) -> Node<'ast>) -> Child<'ast> {
    if items.is_empty() {
        Child::Field(name, Field::Absent)
    } else {
        Child::Field(name, Field::Many(items.iter().map(f).collect()))
    }
}

fn attributes<'ast>(attrs: &'ast crate::ast::ExtendedAttributes) -> Child<'ast> {
    many("extended_attributes", &attrs.0, Node::ExtendedAttribute)
}

fn modifiers<'ast>(modifiers: &'ast [Modifier]) -> Child<'ast> {
    many("modifiers", modifiers, Node::Modifier)
}

fn arguments<'ast>(args: &'ast [Argument]) -> Child<'ast> {
    many("arguments", args, Node::Argument)
}

fn members<'ast>(members: &'ast [Member]) -> Child<'ast> {
    many("members", members, Node::from)
}

impl<'ast> Node<'ast> {
    /// The node kind's name, e.g. `"Method"`.
    pub fn class(&self) -> &'static str {
        match self {
            Node::File(_) => "File",
            Node::Package(_) => "Package",
            Node::Import(_) => "Import",
            Node::SimpleName(_) => "SimpleName",
            Node::QualifiedName(_) => "QualifiedName",
            Node::Literal(_) => "Literal",
            Node::Type(t) => match t.kind {
                TypeKind::Primitive(_) => "PrimitiveType",
                TypeKind::Array(_) => "ArrayType",
                TypeKind::Map(..) => "MapType",
                TypeKind::Set(_) => "SetType",
                TypeKind::Optional(_) => "OptionalType",
                TypeKind::Const(_) => "ConstType",
                TypeKind::Pointer(_) => "PointerType",
                TypeKind::Reference(_) => "ReferenceType",
                TypeKind::UserDefined(_) => "UserDefinedType",
            },
            Node::Modifier(m) => match m.kind {
                ModifierKind::Static => "StaticModifier",
                ModifierKind::ReadOnly => "ReadOnlyModifier",
            },
            Node::ExtendedAttribute(_) => "ExtendedAttribute",
            Node::ExtendedAttributeArgument(_) => "ExtendedAttributeArgument",
            Node::Interface(_) => "Interface",
            Node::Struct(_) => "Struct",
            Node::Enum(_) => "Enum",
            Node::EnumValue(_) => "EnumValue",
            Node::Delegate(_) => "Delegate",
            Node::Event(_) => "Event",
            Node::Constructor(_) => "Constructor",
            Node::Method(_) => "Method",
            Node::Property(_) => "Property",
            Node::Argument(_) => "Argument",
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Node::File(n) => n.position,
            Node::Package(n) => n.position,
            Node::Import(n) => n.position,
            Node::SimpleName(n) => n.position,
            Node::QualifiedName(n) => n.position,
            Node::Literal(n) => n.position,
            Node::Type(n) => n.position,
            Node::Modifier(n) => n.position,
            Node::ExtendedAttribute(n) => n.position,
            Node::ExtendedAttributeArgument(n) => n.position,
            Node::Interface(n) => n.position,
            Node::Struct(n) => n.position,
            Node::Enum(n) => n.position,
            Node::EnumValue(n) => n.position,
            Node::Delegate(n) => n.position,
            Node::Event(n) => n.position,
            Node::Constructor(n) => n.position,
            Node::Method(n) => n.position,
            Node::Property(n) => n.position,
            Node::Argument(n) => n.position,
        }
    }

    /// A short human readable label: the node's name or value, if it has one.
    pub fn label(&self) -> Option<String> {
        let label = match self {
            Node::File(_) | Node::Modifier(_) => return None,
            Node::Package(n) => n.name.fullname(),
            Node::Import(n) => n.name.fullname(),
            Node::SimpleName(n) => n.name.clone(),
            Node::QualifiedName(n) => format!("{}.{}", n.qualifier.fullname(), n.identifier.name),
            Node::Literal(n) => n.to_string(),
            Node::Type(n) => n.to_string(),
            Node::ExtendedAttribute(n) => n.name.clone(),
            Node::ExtendedAttributeArgument(n) => match &n.value {
                Some(v) => format!("{}={}", n.key, v),
                None => n.key.clone(),
            },
            Node::Interface(n) => n.name.name.clone(),
            Node::Struct(n) => n.name.name.clone(),
            Node::Enum(n) => n.name.name.clone(),
            Node::EnumValue(n) => n.name.name.clone(),
            Node::Delegate(n) => n.name.name.clone(),
            Node::Event(n) => n.name.name.clone(),
            Node::Constructor(n) => n.name.name.clone(),
            Node::Method(n) => n.name.name.clone(),
            Node::Property(n) => n.name.name.clone(),
            Node::Argument(n) => n.name.name.clone(),
        };
        Some(label)
    }

    /// The ordered child fields of this node, with namespace markers around
    /// the members of interfaces, structs and enums.
    pub fn children(&self) -> Vec<Child<'ast>> {
        match *self {
            Node::File(f) => vec![
                one("package", Node::Package(&f.package)),
                many("imports", &f.imports, Node::Import),
                one("interface", Node::Interface(&f.interface)),
            ],
            Node::Package(p) => vec![one("name", &p.name)],
            Node::Import(i) => vec![one("name", &i.name)],
            Node::QualifiedName(q) => vec![
                one("qualifier", q.qualifier.as_ref()),
                one("identifier", Node::SimpleName(&q.identifier)),
            ],
            Node::SimpleName(_)
            | Node::Literal(_)
            | Node::Modifier(_)
            | Node::ExtendedAttributeArgument(_) => Vec::new(),
            Node::Type(t) => match &t.kind {
                TypeKind::Primitive(_) => Vec::new(),
                TypeKind::Array(element) => vec![one("element_type", Node::Type(element))],
                TypeKind::Map(key, value) => vec![
                    one("key_type", Node::Type(key)),
                    one("value_type", Node::Type(value)),
                ],
                TypeKind::Set(key) => vec![one("key_type", Node::Type(key))],
                TypeKind::Optional(value)
                | TypeKind::Const(value)
                | TypeKind::Pointer(value)
                | TypeKind::Reference(value) => vec![one("value_type", Node::Type(value))],
                TypeKind::UserDefined(name) => vec![one("name", name)],
            },
            Node::ExtendedAttribute(a) => {
                vec![many("arguments", &a.arguments, Node::ExtendedAttributeArgument)]
            }
            Node::Interface(i) => vec![
                attributes(&i.attributes),
                modifiers(&i.modifiers),
                one("name", Node::SimpleName(&i.name)),
                optional("extends", i.extends.as_ref(), Node::Type),
                Child::EnterNamespace(&i.name.name),
                members(&i.members),
                Child::ExitNamespace,
            ],
            Node::Struct(s) => vec![
                attributes(&s.attributes),
                modifiers(&s.modifiers),
                one("name", Node::SimpleName(&s.name)),
                optional("extends", s.extends.as_ref(), Node::Type),
                Child::EnterNamespace(&s.name.name),
                members(&s.members),
                Child::ExitNamespace,
            ],
            Node::Enum(e) => vec![
                attributes(&e.attributes),
                modifiers(&e.modifiers),
                one("name", Node::SimpleName(&e.name)),
                Child::EnterNamespace(&e.name.name),
                many("values", &e.values, Node::EnumValue),
                Child::ExitNamespace,
            ],
            Node::EnumValue(v) => vec![
                attributes(&v.attributes),
                one("name", Node::SimpleName(&v.name)),
            ],
            Node::Delegate(d) => vec![
                attributes(&d.attributes),
                modifiers(&d.modifiers),
                one("type", Node::Type(&d.return_type)),
                one("name", Node::SimpleName(&d.name)),
                arguments(&d.arguments),
            ],
            Node::Event(e) => vec![
                attributes(&e.attributes),
                one("name", Node::SimpleName(&e.name)),
                arguments(&e.arguments),
            ],
            Node::Constructor(c) => vec![
                attributes(&c.attributes),
                modifiers(&c.modifiers),
                one("name", Node::SimpleName(&c.name)),
                arguments(&c.arguments),
            ],
            Node::Method(m) => vec![
                attributes(&m.attributes),
                modifiers(&m.modifiers),
                one("type", Node::Type(&m.return_type)),
                one("name", Node::SimpleName(&m.name)),
                arguments(&m.arguments),
            ],
            Node::Property(p) => vec![
                attributes(&p.attributes),
                modifiers(&p.modifiers),
                one("type", Node::Type(&p.ty)),
                one("name", Node::SimpleName(&p.name)),
            ],
            Node::Argument(a) => vec![
                attributes(&a.attributes),
                one("type", Node::Type(&a.ty)),
                one("name", Node::SimpleName(&a.name)),
                optional("default_value", a.default.as_ref(), Node::Literal),
            ],
        }
    }
}

/// The stack of declaration names enclosing the node being visited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    segments: Vec<String>,
}

impl Scope {
    /// The dotted namespace, e.g. `Foo.Point`. Empty at top level.
    pub fn namespace(&self) -> String {
        self.segments.join(".")
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Hooks called by the [`Walker`]. All default to doing nothing.
pub trait Visitor<'ast> {
    fn enter(&mut self, _node: Node<'ast>, _scope: &Scope) {}

    fn exit(&mut self, _node: Node<'ast>, _scope: &Scope) {}

    fn enter_namespace(&mut self, _name: &str, _scope: &Scope) {}

    fn exit_namespace(&mut self, _name: &str, _scope: &Scope) {}
}

/// Drives a visitor depth first over a tree, maintaining the namespace stack.
pub struct Walker<'v, V> {
    visitor: &'v mut V,
    scope: Scope,
}

impl<'v, V> Walker<'v, V> {
    pub fn new(visitor: &'v mut V) -> Self {
        Walker {
            visitor,
            scope: Scope::default(),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl<'v, 'ast, V: Visitor<'ast>> Walker<'v, V> {
    pub fn walk(&mut self, node: Node<'ast>) {
        self.visitor.enter(node, &self.scope);
        for child in node.children() {
            match child {
                Child::Field(_, field) => self.walk_field(field),
                Child::EnterNamespace(name) => {
                    self.scope.segments.push(name.to_string());
                    self.visitor.enter_namespace(name, &self.scope);
                }
                Child::ExitNamespace => {
                    if let Some(name) = self.scope.segments.pop() {
                        self.visitor.exit_namespace(&name, &self.scope);
                    }
                }
            }
        }
        self.visitor.exit(node, &self.scope);
    }

    fn walk_field(&mut self, field: Field<'ast>) {
        match field {
            Field::Absent => {}
            Field::One(node) => self.walk(node),
            Field::Many(nodes) => {
                for node in nodes {
                    self.walk(node);
                }
            }
        }
    }
}

/// Walks `node` with `visitor` from an empty namespace.
pub fn walk<'ast, V: Visitor<'ast>>(visitor: &mut V, node: Node<'ast>) {
    Walker::new(visitor).walk(node);
}

/// Renders a tree as indented lines of `Class label @line:col`.
#[derive(Debug, Default)]
pub struct TreePrinter {
    output: String,
    depth: usize,
}

impl TreePrinter {
    pub fn print(file: &File) -> String {
        let mut printer = TreePrinter::default();
        walk(&mut printer, Node::File(file));
        printer.output
    }
}

impl<'ast> Visitor<'ast> for TreePrinter {
    fn enter(&mut self, node: Node<'ast>, scope: &Scope) {
        let indent = "  ".repeat(self.depth);
        let _ = write!(self.output, "{indent}{}", node.class());
        if let Some(label) = node.label() {
            let _ = write!(self.output, " {label}");
        }
        let _ = write!(self.output, " @{}", node.position());
        if !scope.is_empty() {
            let _ = write!(self.output, " [{}]", scope.namespace());
        }
        self.output.push('\n');
        self.depth += 1;
    }

    fn exit(&mut self, _node: Node<'ast>, _scope: &Scope) {
        self.depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const SOURCE: &str = "package a.b;
import c.Bar;
interface Foo : Bar {
  struct Point { property int x; enum Axis { X, Y }; };
  enum Color { Red };
  int bar(int x, string[] y = null);
  [final] event changed();
};";

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        enters: usize,
        exits: usize,
        namespace_enters: usize,
        namespace_exits: usize,
    }

    impl<'ast> Visitor<'ast> for Recorder {
        fn enter(&mut self, node: Node<'ast>, scope: &Scope) {
            self.enters += 1;
            if matches!(node, Node::Property(_) | Node::EnumValue(_) | Node::Method(_)) {
                self.events
                    .push(format!("{}:{}", scope.namespace(), node.label().unwrap_or_default()));
            }
        }

        fn exit(&mut self, _node: Node<'ast>, _scope: &Scope) {
            self.exits += 1;
        }

        fn enter_namespace(&mut self, _name: &str, _scope: &Scope) {
            self.namespace_enters += 1;
        }

        fn exit_namespace(&mut self, _name: &str, _scope: &Scope) {
            self.namespace_exits += 1;
        }
    }

    #[test]
    fn test_namespace_stack_is_balanced() {
        let file = parse(SOURCE, "foo.idl").unwrap();
        let mut recorder = Recorder::default();
        let mut walker = Walker::new(&mut recorder);
        walker.walk(Node::File(&file));
        assert!(walker.scope().is_empty());
        assert_eq!(recorder.namespace_enters, recorder.namespace_exits);
        // Foo, Point, Axis, Color
        assert_eq!(recorder.namespace_enters, 4);
        assert_eq!(recorder.enters, recorder.exits);
    }

    #[test]
    fn test_scope_tracks_nested_declarations() {
        let file = parse(SOURCE, "foo.idl").unwrap();
        let mut recorder = Recorder::default();
        walk(&mut recorder, Node::File(&file));
        assert_eq!(
            recorder.events,
            vec![
                "Foo.Point:x",
                "Foo.Point.Axis:X",
                "Foo.Point.Axis:Y",
                "Foo.Color:Red",
                "Foo:bar",
            ]
        );
    }

    #[test]
    fn test_children_in_declaration_order() {
        let file = parse(SOURCE, "foo.idl").unwrap();
        let fields: Vec<&str> = Node::Interface(&file.interface)
            .children()
            .iter()
            .map(|c| match c {
                Child::Field(name, _) => *name,
                Child::EnterNamespace(_) => "+",
                Child::ExitNamespace => "-",
            })
            .collect();
        assert_eq!(
            fields,
            vec!["extended_attributes", "modifiers", "name", "extends", "+", "members", "-"]
        );
    }

    #[test]
    fn test_absent_fields_are_skipped() {
        let file = parse("package p; interface I { void f(int x); };", "p.idl").unwrap();
        let Member::Method(method) = &file.interface.members[0] else {
            panic!("Expected Method member");
        };
        let children = Node::Argument(&method.arguments[0]).children();
        assert!(matches!(children[0], Child::Field("extended_attributes", Field::Absent)));
        assert!(matches!(children[3], Child::Field("default_value", Field::Absent)));
    }

    #[test]
    fn test_tree_printer() {
        let file = parse("package a.b; interface Foo { int bar(); };", "foo.idl").unwrap();
        let tree = TreePrinter::print(&file);
        let lines: Vec<&str> = tree.lines().collect();
        assert_eq!(lines[0], "File @1:1");
        assert!(lines.contains(&"    Method bar @1:30 [Foo]"));
        assert!(tree.contains("QualifiedName a.b"));
    }
}
