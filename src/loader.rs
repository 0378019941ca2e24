//! Resolves a parsed [`File`] into an [`InterfaceModel`].
//!
//! Resolution builds the symbol table, collects nested declarations with a
//! visitor pass, then derives signatures, value kinds and index names for every
//! method, property, event and constructor of the interface.

use crate::{
    ast::{
        Argument, Constructor, Event, File, Member, Method, ModifierKind, Name, PrimitiveType,
        Property, Type, TypeKind, has_modifier,
    },
    error::ResolutionError,
    model::{
        ArgumentModel, ConstructorModel, Declaration, DeclarationKind, EventModel, InterfaceModel,
        MethodModel, PropertyModel, SymbolTable, ValueKind,
    },
    visitor::{Node, Scope, Visitor, walk},
};

/// Single-character signature code of a primitive type.
pub fn signature_code(primitive: PrimitiveType) -> char {
    match primitive {
        PrimitiveType::Boolean => 'z',
        PrimitiveType::Char => 'c',
        PrimitiveType::String => 'S',
        PrimitiveType::Void => 'v',
        PrimitiveType::Byte => 'b',
        PrimitiveType::UnsignedByte => 'B',
        PrimitiveType::Short => 'h',
        PrimitiveType::UnsignedShort => 'H',
        PrimitiveType::Int => 'i',
        PrimitiveType::UnsignedInt => 'I',
        PrimitiveType::Long => 'l',
        PrimitiveType::UnsignedLong => 'L',
        PrimitiveType::Float => 'f',
        PrimitiveType::Double => 'd',
    }
}

/// Marshalling category of a type. Never fails.
pub fn value_kind(ty: &Type) -> ValueKind {
    let Some(primitive) = ty.primitive() else {
        return ValueKind::Unsupported;
    };
    match primitive {
        PrimitiveType::Boolean
        | PrimitiveType::Char
        | PrimitiveType::Byte
        | PrimitiveType::UnsignedByte
        | PrimitiveType::Short
        | PrimitiveType::UnsignedShort
        | PrimitiveType::Int
        | PrimitiveType::UnsignedInt => ValueKind::Int,
        PrimitiveType::Long | PrimitiveType::UnsignedLong => ValueKind::Int64,
        PrimitiveType::Float => ValueKind::Float32,
        PrimitiveType::Double => ValueKind::Float64,
        PrimitiveType::String => ValueKind::String,
        PrimitiveType::Void => ValueKind::Void,
    }
}

/// Upper-cases the first character, e.g. `bar` -> `Bar`.
pub fn first_upper(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Collects struct, enum and delegate declarations with their dotted scope.
#[derive(Debug, Default)]
pub struct DeclarationCollector {
    pub declarations: Vec<Declaration>,
}

impl DeclarationCollector {
    fn push(&mut self, kind: DeclarationKind, name: &str, scope: &Scope) {
        let qualified_name = if scope.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", scope.namespace())
        };
        self.declarations.push(Declaration {
            kind,
            name: name.to_string(),
            qualified_name,
        });
    }
}

impl<'ast> Visitor<'ast> for DeclarationCollector {
    fn enter(&mut self, node: Node<'ast>, scope: &Scope) {
        match node {
            Node::Struct(s) => self.push(DeclarationKind::Struct, &s.name.name, scope),
            Node::Enum(e) => self.push(DeclarationKind::Enum, &e.name.name, scope),
            Node::Delegate(d) => self.push(DeclarationKind::Delegate, &d.name.name, scope),
            _ => {}
        }
    }
}

/// Resolves `file` into a ready-to-render model.
pub fn resolve(file: &File) -> Result<InterfaceModel, ResolutionError> {
    Resolver::new(file).resolve()
}

struct Resolver<'a> {
    file: &'a File,
    fullname: String,
    symbols: SymbolTable,
    declarations: Vec<Declaration>,
}

impl<'a> Resolver<'a> {
    fn new(file: &'a File) -> Self {
        let package = file.package.name.fullname();
        let name = &file.interface.name.name;
        let fullname = format!("{package}.{name}");

        let mut symbols = SymbolTable::default();
        symbols.insert(name.clone(), fullname.clone());
        for import in &file.imports {
            symbols.insert(import.name.last(), import.name.fullname());
        }

        let mut collector = DeclarationCollector::default();
        walk(&mut collector, Node::Interface(&file.interface));

        Resolver {
            file,
            fullname,
            symbols,
            declarations: collector.declarations,
        }
    }

    fn resolve(self) -> Result<InterfaceModel, ResolutionError> {
        let interface = &self.file.interface;
        let extends = interface.extends.as_ref().map(|ty| self.resolve_extends(ty));

        let mut methods = Vec::new();
        let mut properties = Vec::new();
        let mut events = Vec::new();
        let mut constructors = Vec::new();
        for member in &interface.members {
            match member {
                Member::Method(m) => methods.push(self.method(m)?),
                Member::Property(p) => properties.push(self.property(p)?),
                Member::Event(e) => events.push(self.event(e)),
                Member::Constructor(c) => constructors.push(self.constructor(c)),
                Member::Struct(_) | Member::Enum(_) | Member::Delegate(_) => {}
            }
        }

        log::debug!(
            "resolved {}: {} methods, {} properties, {} events, {} constructors",
            self.fullname,
            methods.len(),
            properties.len(),
            events.len(),
            constructors.len()
        );

        Ok(InterfaceModel {
            package: self.file.package.name.fullname(),
            name: interface.name.name.clone(),
            fullname: self.fullname,
            extends,
            is_static: has_modifier(&interface.modifiers, ModifierKind::Static),
            attributes: interface.attributes.clone(),
            imports: self.file.imports.iter().map(|i| i.name.fullname()).collect(),
            symbols: self.symbols,
            declarations: self.declarations,
            methods,
            properties,
            events,
            constructors,
        })
    }

    fn method(&self, method: &Method) -> Result<MethodModel, ResolutionError> {
        let name = &method.name.name;
        let mut signature = self.type_signature(name, &method.return_type)?;
        for arg in &method.arguments {
            signature.push_str(&self.type_signature(name, &arg.ty)?);
        }
        let arguments = arguments(&method.arguments);
        let call_types = std::iter::once(value_kind(&method.return_type))
            .chain(arguments.iter().map(|a| a.kind))
            .collect();
        Ok(MethodModel {
            name: name.clone(),
            index_name: format!("kMethod{}", first_upper(name)),
            is_static: has_modifier(&method.modifiers, ModifierKind::Static),
            return_type: method.return_type.clone(),
            arguments,
            signature,
            call_types,
            attributes: method.attributes.clone(),
        })
    }

    fn property(&self, property: &Property) -> Result<PropertyModel, ResolutionError> {
        let name = &property.name.name;
        Ok(PropertyModel {
            name: name.clone(),
            index_name: format!("kProperty{}", first_upper(name)),
            ty: property.ty.clone(),
            signature: self.type_signature(name, &property.ty)?,
            value_kind: value_kind(&property.ty),
            readonly: has_modifier(&property.modifiers, ModifierKind::ReadOnly),
            is_static: has_modifier(&property.modifiers, ModifierKind::Static),
            attributes: property.attributes.clone(),
        })
    }

    fn event(&self, event: &Event) -> EventModel {
        let name = &event.name.name;
        let arguments = arguments(&event.arguments);
        EventModel {
            name: name.clone(),
            index_name: format!("kEvent{}", first_upper(name)),
            is_final: event.attributes.contains("final"),
            argument_kinds: arguments.iter().map(|a| a.kind).collect(),
            arguments,
            attributes: event.attributes.clone(),
        }
    }

    fn constructor(&self, constructor: &Constructor) -> ConstructorModel {
        let arguments = arguments(&constructor.arguments);
        ConstructorModel {
            name: constructor.name.name.clone(),
            argument_kinds: arguments.iter().map(|a| a.kind).collect(),
            arguments,
            attributes: constructor.attributes.clone(),
        }
    }

    fn type_signature(&self, member: &str, ty: &Type) -> Result<String, ResolutionError> {
        match &ty.kind {
            TypeKind::Primitive(p) => Ok(signature_code(*p).to_string()),
            TypeKind::UserDefined(name) => {
                let fullname = self.resolve_name(name)?;
                Ok(format!("{{{fullname}}}"))
            }
            _ => Err(ResolutionError::UnsupportedType {
                member: member.to_string(),
                ty: ty.to_string(),
                diagnostic: self.file.source.diagnostic(
                    ty.position,
                    format!("Type '{ty}' of '{member}' has no signature code"),
                ),
            }),
        }
    }

    /// Qualifies the base interface name. A base that is neither imported nor
    /// fully qualified is taken to live in the same package.
    fn resolve_extends(&self, ty: &Type) -> String {
        match &ty.kind {
            TypeKind::UserDefined(name) => match (self.lookup(name), name) {
                (Some(fullname), _) => fullname,
                (None, Name::Simple(s)) => format!("{}.{}", self.file.package.name.fullname(), s.name),
                (None, Name::Qualified(_)) => name.fullname(),
            },
            _ => ty.to_string(),
        }
    }

    /// The fully-qualified name the symbol table gives `name`, if any.
    fn lookup(&self, name: &Name) -> Option<String> {
        match name {
            Name::Simple(s) => self.symbols.get(&s.name).map(str::to_string),
            Name::Qualified(_) => {
                let written = name.fullname();
                self.symbols.contains_fullname(&written).then_some(written)
            }
        }
    }

    /// Resolves a user-defined type reference to an interface's fully-qualified name.
    ///
    /// The symbol table is consulted first, so an import shadows a nested
    /// declaration of the same name.
    fn resolve_name(&self, name: &Name) -> Result<String, ResolutionError> {
        if let Some(fullname) = self.lookup(name) {
            return Ok(fullname);
        }
        let written = name.fullname();
        if let Some(decl) = self.declaration(&written) {
            return Err(ResolutionError::NotAnInterface {
                name: written.clone(),
                kind: decl.kind.as_str(),
                diagnostic: self.file.source.diagnostic(
                    name.position(),
                    format!("'{written}' is a {}, not an interface", decl.kind.as_str()),
                ),
            });
        }
        Err(ResolutionError::UnknownType {
            diagnostic: self
                .file
                .source
                .diagnostic(name.position(), format!("Unknown type '{written}'")),
            name: written,
        })
    }

    /// Finds a nested declaration by short name, interface-relative path, or
    /// fully-qualified path.
    fn declaration(&self, written: &str) -> Option<&Declaration> {
        let package_relative = written
            .strip_prefix(self.file.package.name.fullname().as_str())
            .and_then(|rest| rest.strip_prefix('.'));
        self.declarations.iter().find(|d| {
            d.name == written
                || d.qualified_name == written
                || package_relative.is_some_and(|rest| d.qualified_name == rest)
        })
    }
}

fn arguments(args: &[Argument]) -> Vec<ArgumentModel> {
    args.iter()
        .map(|arg| ArgumentModel {
            name: arg.name.name.clone(),
            ty: arg.ty.clone(),
            kind: value_kind(&arg.ty),
            default: arg.default.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn load(source: &str) -> Result<InterfaceModel, ResolutionError> {
        resolve(&parse(source, "test.idl").unwrap())
    }

    #[test]
    fn test_method_signature() {
        let model = load("package a.b; interface Foo { int bar(int x); };").unwrap();
        assert_eq!(model.fullname, "a.b.Foo");
        let bar = &model.methods[0];
        assert_eq!(bar.signature, "ii");
        assert_eq!(bar.call_types, vec![ValueKind::Int, ValueKind::Int]);
        assert_eq!(bar.index_name, "kMethodBar");
        assert!(!bar.is_static);
    }

    #[test]
    fn test_readonly_property() {
        let model = load("package a.b; interface Foo { property readonly string name; };").unwrap();
        let name = &model.properties[0];
        assert_eq!(name.signature, "S");
        assert_eq!(name.value_kind, ValueKind::String);
        assert!(name.readonly);
        assert_eq!(name.index_name, "kPropertyName");
    }

    #[test]
    fn test_array_argument_is_unsupported() {
        let err = load("package a.b; interface Foo { void onEvent(int[] items); };").unwrap_err();
        let ResolutionError::UnsupportedType { member, ty, diagnostic } = err else {
            panic!("Expected UnsupportedType, got {err:?}");
        };
        assert_eq!(member, "onEvent");
        assert_eq!(ty, "int[]");
        assert_eq!(diagnostic.filename, "test.idl");
    }

    #[test]
    fn test_every_primitive_code() {
        let model = load(
            "package p; interface I {
               void f(boolean a, char b, string c, byte d, unsigned byte e, short f,
                      unsigned short g, int h, unsigned int i, long j, unsigned long k,
                      float l, double m);
             };",
        )
        .unwrap();
        assert_eq!(model.methods[0].signature, "vzcSbBhHiIlLfd");
        assert_eq!(
            model.methods[0].call_types,
            vec![
                ValueKind::Void,
                ValueKind::Int,
                ValueKind::Int,
                ValueKind::String,
                ValueKind::Int,
                ValueKind::Int,
                ValueKind::Int,
                ValueKind::Int,
                ValueKind::Int,
                ValueKind::Int,
                ValueKind::Int64,
                ValueKind::Int64,
                ValueKind::Float32,
                ValueKind::Float64,
            ]
        );
    }

    #[test]
    fn test_interface_references() {
        let model = load(
            "package a.b;
             import c.d.Bar;
             interface Foo : Bar {
               Foo self();
               void take(Bar bar, c.d.Bar other);
             };",
        )
        .unwrap();
        assert_eq!(model.extends.as_deref(), Some("c.d.Bar"));
        assert_eq!(model.methods[0].signature, "{a.b.Foo}");
        assert_eq!(model.methods[1].signature, "v{c.d.Bar}{c.d.Bar}");
        assert_eq!(
            model.methods[1].call_types,
            vec![ValueKind::Void, ValueKind::Unsupported, ValueKind::Unsupported]
        );
        assert_eq!(model.symbols.get("Bar"), Some("c.d.Bar"));
        assert_eq!(model.symbols.get("Foo"), Some("a.b.Foo"));
    }

    #[test]
    fn test_import_overrides_own_name() {
        let model = load("package a; import x.Foo; interface Foo { Foo get(); };").unwrap();
        assert_eq!(model.methods[0].signature, "{x.Foo}");
    }

    #[test]
    fn test_unimported_base_is_same_package() {
        let model = load("package a; interface Foo : Base { int bar(int x); };").unwrap();
        assert_eq!(model.extends.as_deref(), Some("a.Base"));
        assert_eq!(model.methods[0].signature, "ii");

        let model = load("package a; interface Foo : x.y.Base { };").unwrap();
        assert_eq!(model.extends.as_deref(), Some("x.y.Base"));
    }

    #[test]
    fn test_import_shadows_nested_declaration() {
        let model = load(
            "package a; import x.Color; interface Foo { enum Color { Red }; Color get(); };",
        )
        .unwrap();
        assert_eq!(model.methods[0].signature, "{x.Color}");
    }

    #[test]
    fn test_unknown_type() {
        let err = load("package a; interface Foo { Missing get(); };").unwrap_err();
        assert!(matches!(err, ResolutionError::UnknownType { ref name, .. } if name == "Missing"));
    }

    #[test]
    fn test_nested_declaration_is_not_an_interface() {
        let err = load(
            "package a; interface Foo { struct Point { property int x; }; Point get(); };",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::NotAnInterface { ref name, kind: "struct", .. } if name == "Point"
        ));
    }

    #[test]
    fn test_declarations_collected_with_scope() {
        let model = load(
            "package a; interface Foo {
               struct Point { enum Axis { X, Y }; };
               delegate void Callback(int code);
               enum Color { Red };
             };",
        )
        .unwrap();
        let names: Vec<&str> = model
            .declarations
            .iter()
            .map(|d| d.qualified_name.as_str())
            .collect();
        assert_eq!(names, vec!["Foo.Point", "Foo.Point.Axis", "Foo.Callback", "Foo.Color"]);
        assert_eq!(model.declarations[2].kind, DeclarationKind::Delegate);
    }

    #[test]
    fn test_events_and_constructors() {
        let model = load(
            "package a; interface Foo {
               Foo(int size, string label = \"x\");
               [final] event closed(int code);
               event changed(string[] values);
             };",
        )
        .unwrap();
        let ctor = &model.constructors[0];
        assert_eq!(ctor.argument_kinds, vec![ValueKind::Int, ValueKind::String]);
        assert!(ctor.arguments[1].default.is_some());

        assert!(model.events[0].is_final);
        assert_eq!(model.events[0].index_name, "kEventClosed");
        assert!(!model.events[1].is_final);
        assert_eq!(model.events[1].argument_kinds, vec![ValueKind::Unsupported]);
    }

    #[test]
    fn test_composite_property_fails_signature() {
        let err = load("package a; interface Foo { property map<string, int> table; };").unwrap_err();
        assert!(matches!(err, ResolutionError::UnsupportedType { .. }));
    }

    #[test]
    fn test_composite_types_classify_as_unsupported() {
        let file = parse(
            "package a; interface Foo { event e(int? a, const int b, int* c, int& d, set<int> f); };",
            "t.idl",
        )
        .unwrap();
        let Member::Event(event) = &file.interface.members[0] else {
            panic!("Expected Event member");
        };
        for arg in &event.arguments {
            assert_eq!(value_kind(&arg.ty), ValueKind::Unsupported);
        }
    }

    #[test]
    fn test_static_members() {
        let model = load(
            "package a; static interface Foo { static int count(); property static readonly int total; };",
        )
        .unwrap();
        assert!(model.is_static);
        assert!(model.methods[0].is_static);
        assert!(model.properties[0].is_static);
        assert!(model.properties[0].readonly);
    }

    #[test]
    fn test_first_upper() {
        assert_eq!(first_upper("bar"), "Bar");
        assert_eq!(first_upper("Bar"), "Bar");
        assert_eq!(first_upper(""), "");
    }
}
