use idlc::{
    compile_source,
    error::{CompileError, ResolutionError},
    model::ValueKind,
    parser::parse,
    visitor::{Node, Scope, Visitor, Walker},
};
use proptest::prelude::*;

const PRIMITIVES: &[&str] = &[
    "boolean",
    "char",
    "string",
    "byte",
    "unsigned byte",
    "short",
    "unsigned short",
    "int",
    "unsigned int",
    "long",
    "unsigned long",
    "float",
    "double",
];

const CODES: &str = "zcSvbBhHiIlLfd";

fn primitive() -> impl Strategy<Value = &'static str> {
    prop::sample::select(PRIMITIVES)
}

fn return_type() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("void"), primitive()]
}

/// A primitive wrapped in one to three composite modifiers.
fn composite() -> impl Strategy<Value = String> {
    let wrappers = prop::sample::select(vec![
        "{}[]",
        "{}?",
        "const {}",
        "{}*",
        "{}&",
        "set<{}>",
        "map<string, {}>",
    ]);
    (primitive(), prop::collection::vec(wrappers, 1..=3)).prop_map(|(base, wrappers)| {
        wrappers
            .into_iter()
            .fold(base.to_string(), |inner, w| w.replace("{}", &inner))
    })
}

/// (return type, argument types) per method.
fn methods() -> impl Strategy<Value = Vec<(&'static str, Vec<&'static str>)>> {
    prop::collection::vec(
        (return_type(), prop::collection::vec(primitive(), 0..6)),
        0..8,
    )
}

fn interface_source(methods: &[(&str, Vec<&str>)]) -> String {
    let mut source = String::from("package gen.test;\ninterface Subject {\n");
    for (i, (ret, args)) in methods.iter().enumerate() {
        let args: Vec<String> = args
            .iter()
            .enumerate()
            .map(|(j, ty)| format!("{ty} a{j}"))
            .collect();
        source.push_str(&format!("  {ret} m{i}({});\n", args.join(", ")));
    }
    source.push_str("};\n");
    source
}

#[derive(Default)]
struct NamespaceCounter {
    enters: usize,
    exits: usize,
    max_depth: usize,
}

impl<'ast> Visitor<'ast> for NamespaceCounter {
    fn enter_namespace(&mut self, _name: &str, scope: &Scope) {
        self.enters += 1;
        self.max_depth = self.max_depth.max(scope.depth());
    }

    fn exit_namespace(&mut self, _name: &str, _scope: &Scope) {
        self.exits += 1;
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn rendering_is_deterministic(methods in methods()) {
        let source = interface_source(&methods);
        let first = compile_source(&source, "Subject.idl").unwrap();
        let second = compile_source(&source, "Subject.idl").unwrap();
        prop_assert_eq!(first.rendered, second.rendered);
    }

    #[test]
    fn primitive_signatures_have_one_code_per_type(methods in methods()) {
        let source = interface_source(&methods);
        let compilation = compile_source(&source, "Subject.idl").unwrap();
        prop_assert_eq!(compilation.model.methods.len(), methods.len());
        for (model, (_, args)) in compilation.model.methods.iter().zip(&methods) {
            prop_assert_eq!(model.signature.chars().count(), 1 + args.len());
            prop_assert!(model.signature.chars().all(|c| CODES.contains(c)), "{}", model.signature);
            prop_assert_eq!(model.call_types.len(), 1 + args.len());
            prop_assert!(!model.call_types.contains(&ValueKind::Unsupported));
        }
    }

    #[test]
    fn composite_types_have_no_signature(ty in composite()) {
        let source = format!("package p; interface I {{ void f(int x, {ty} y); }};");
        let err = compile_source(&source, "I.idl").unwrap_err();
        let is_unsupported = matches!(
            err,
            CompileError::Resolution(ResolutionError::UnsupportedType { .. })
        );
        prop_assert!(is_unsupported, "{}: {}", ty, err);
    }

    #[test]
    fn composite_types_classify_as_unsupported(ty in composite()) {
        let source = format!("package p; interface I {{ event e({ty} value); I({ty} value); }};");
        let compilation = compile_source(&source, "I.idl").unwrap();
        prop_assert_eq!(&compilation.model.events[0].argument_kinds, &vec![ValueKind::Unsupported]);
        prop_assert_eq!(&compilation.model.constructors[0].argument_kinds, &vec![ValueKind::Unsupported]);
        prop_assert!(compilation.rendered.metadata.contains("kUnsupportType"));
    }

    #[test]
    fn namespace_stack_is_balanced(depths in prop::collection::vec(0usize..5, 0..6)) {
        let mut source = String::from("package p; interface Root {\n");
        for (i, depth) in depths.iter().enumerate() {
            for level in 0..*depth {
                source.push_str(&format!("struct S{i}x{level} {{\n"));
            }
            source.push_str(&format!("enum E{i} {{ A, B }};\n"));
            for _ in 0..*depth {
                source.push_str("};\n");
            }
        }
        source.push_str("};\n");

        let file = parse(&source, "Root.idl").unwrap();
        let mut counter = NamespaceCounter::default();
        let mut walker = Walker::new(&mut counter);
        walker.walk(Node::File(&file));
        prop_assert!(walker.scope().is_empty());

        let expected = 1 + depths.iter().map(|d| d + 1).sum::<usize>();
        prop_assert_eq!(counter.enters, expected);
        prop_assert_eq!(counter.exits, expected);
        let deepest = depths.iter().max().map_or(1, |d| d + 2);
        prop_assert_eq!(counter.max_depth, deepest);
    }
}
