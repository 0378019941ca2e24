use std::{
    fs,
    path::{Path, PathBuf},
};

use idlc::{
    compile_file, compile_source,
    error::{CompileError, LexErrorKind, ResolutionError, SyntaxError},
    model::ValueKind,
};

/// A scratch directory removed on drop.
struct Scratch(PathBuf);

impl Scratch {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("idlc-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        Scratch(dir)
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.0.join(relative)
    }

    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        fs::write(&path, content).unwrap();
        path
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn sample() -> String {
    fs::read_to_string(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/sample.idl")).unwrap()
}

#[test]
fn compile_sample() {
    let compilation = match compile_source(&sample(), "sample.idl") {
        Ok(c) => c,
        Err(e) => panic!("{e}"),
    };
    let model = &compilation.model;

    assert!(compilation.lex_errors.is_empty());
    assert_eq!(model.fullname, "hap.media.Player");
    assert_eq!(model.extends.as_deref(), Some("hap.base.EventTarget"));
    assert!(model.attributes.contains("final"));
    assert_eq!(model.attributes.value_of("bind", "js"), Some("MediaPlayer"));

    let signatures: Vec<(&str, &str)> = model
        .methods
        .iter()
        .map(|m| (m.name.as_str(), m.signature.as_str()))
        .collect();
    assert_eq!(
        signatures,
        vec![
            ("play", "v"),
            ("seek", "vlf"),
            ("load", "z{hap.io.Stream}"),
            ("instances", "i"),
            ("clone", "{hap.media.Player}"),
        ]
    );
    assert!(model.methods[3].is_static);
    assert_eq!(
        model.methods[1].call_types,
        vec![ValueKind::Void, ValueKind::Int64, ValueKind::Float32]
    );

    let max_volume = &model.properties[2];
    assert_eq!(max_volume.signature, "I");
    assert_eq!(max_volume.value_kind, ValueKind::Int);
    assert!(max_volume.readonly && max_volume.is_static);

    assert_eq!(model.events.len(), 2);
    assert!(model.events[0].is_final);
    assert_eq!(
        model.events[1].argument_kinds,
        vec![ValueKind::Int64, ValueKind::Unsupported]
    );
    assert_eq!(model.constructors[0].argument_kinds, vec![ValueKind::String, ValueKind::Int]);

    let declarations: Vec<&str> = model
        .declarations
        .iter()
        .map(|d| d.qualified_name.as_str())
        .collect();
    assert_eq!(declarations, vec!["Player.State", "Player.Track", "Player.Completion"]);

    let header = &compilation.rendered.interface;
    assert!(header.contains("class Player : public hap::base::EventTarget {"));
    assert!(header.contains("#include \"hap/io/Stream.h\""));
    assert!(header.contains("using hap::base::EventTarget;"));
    assert!(header.contains("static Player* Create(base::string url, bool autoplay = false);"));
    assert!(header.contains("virtual void seek(int64_t position, float rate = 1.0) = 0;"));
    assert!(header.contains("static uint32_t GetMaxVolume();"));
    assert!(!header.contains("SetMaxVolume"));
}

#[test]
fn compile_is_deterministic() {
    let source = sample();
    let first = compile_source(&source, "sample.idl").unwrap();
    let second = compile_source(&source, "sample.idl").unwrap();
    assert_eq!(first.rendered, second.rendered);
}

#[test]
fn writes_both_files() {
    let scratch = Scratch::new("writes-both");
    let idl = scratch.write("Player.idl", &sample());
    let header = scratch.path("gen/hap/media/Player.h");
    let source = scratch.path("gen/hap/media/Player_interface.cc");

    let compilation = compile_file(&idl, &header, &source).unwrap();

    assert_eq!(fs::read_to_string(&header).unwrap(), compilation.rendered.interface);
    assert_eq!(fs::read_to_string(&source).unwrap(), compilation.rendered.metadata);
}

#[test]
fn stray_character_is_not_fatal() {
    let compilation = compile_source(
        "package a.b;\n# interface Foo { int bar(int x); };",
        "foo.idl",
    )
    .unwrap();
    assert_eq!(compilation.lex_errors.len(), 1);
    assert_eq!(
        compilation.lex_errors[0].kind,
        LexErrorKind::UnrecognizedCharacter('#')
    );
    assert_eq!(compilation.model.methods[0].signature, "ii");
}

#[test]
fn wrong_header_path_writes_nothing() {
    let scratch = Scratch::new("wrong-header");
    let idl = scratch.write("Foo.idl", "package a.b; interface Foo { int bar(int x); };");
    let header = scratch.path("wrong/Name.h");
    let source = scratch.path("a/b/Foo_interface.cc");

    let err = compile_file(&idl, &header, &source).unwrap_err();

    match err {
        CompileError::Resolution(ResolutionError::OutputPathMismatch { what, expected, .. }) => {
            assert_eq!(what, "header");
            assert_eq!(expected, "a/b/Foo.h");
        }
        other => panic!("Expected OutputPathMismatch, got {other}"),
    }
    assert!(!header.exists());
    assert!(!source.exists());
}

#[test]
fn wrong_source_path_writes_nothing() {
    let scratch = Scratch::new("wrong-source");
    let idl = scratch.write("Foo.idl", "package a.b; interface Foo { };");
    let header = scratch.path("a/b/Foo.h");
    let source = scratch.path("a/b/Foo.cc");

    assert!(compile_file(&idl, &header, &source).is_err());
    assert!(!header.exists());
    assert!(!source.exists());
}

#[test]
fn syntax_error_writes_nothing() {
    let scratch = Scratch::new("syntax-error");
    let idl = scratch.write("Foo.idl", "package a.b;\ninterface Foo { int bar(int x) };");
    let header = scratch.path("a/b/Foo.h");
    let source = scratch.path("a/b/Foo_interface.cc");

    let err = compile_file(&idl, &header, &source).unwrap_err();

    let CompileError::Syntax(SyntaxError::UnexpectedToken { diagnostic }) = err else {
        panic!("Expected UnexpectedToken, got {err}");
    };
    assert_eq!(diagnostic.position.line_number(), 2);
    assert!(diagnostic.filename.ends_with("Foo.idl"));
    assert!(!header.exists());
}

#[test]
fn unsupported_signature_writes_nothing() {
    let scratch = Scratch::new("unsupported");
    let idl = scratch.write("Foo.idl", "package a.b; interface Foo { void onEvent(int[] items); };");
    let header = scratch.path("a/b/Foo.h");
    let source = scratch.path("a/b/Foo_interface.cc");

    let err = compile_file(&idl, &header, &source).unwrap_err();

    assert!(matches!(
        err,
        CompileError::Resolution(ResolutionError::UnsupportedType { .. })
    ));
    assert!(!header.exists());
}

#[test]
fn missing_input_is_io_error() {
    let scratch = Scratch::new("missing-input");
    let err = compile_file(
        &scratch.path("Nope.idl"),
        &scratch.path("a/Nope.h"),
        &scratch.path("a/Nope_interface.cc"),
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::Io { action: "read", .. }));
}

#[test]
fn failed_source_write_keeps_existing_header() {
    let scratch = Scratch::new("keep-header");
    let idl = scratch.write("Foo.idl", "package a.b; interface Foo { int bar(int x); };");
    let header = scratch.path("a/b/Foo.h");
    let source = scratch.path("a/b/Foo_interface.cc");
    fs::create_dir_all(&source).unwrap();
    fs::write(&header, "PREVIOUS CONTENT").unwrap();

    let err = compile_file(&idl, &header, &source).unwrap_err();

    assert!(matches!(err, CompileError::Io { .. }), "{err}");
    assert_eq!(fs::read_to_string(&header).unwrap(), "PREVIOUS CONTENT");
    assert!(source.is_dir());
    let leftovers: Vec<_> = fs::read_dir(scratch.path("a/b"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .filter(|name| name.to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn existing_outputs_are_replaced() {
    let scratch = Scratch::new("replace");
    let idl = scratch.write("Foo.idl", "package a.b; interface Foo { int bar(int x); };");
    let header = scratch.path("a/b/Foo.h");
    let source = scratch.path("a/b/Foo_interface.cc");
    fs::create_dir_all(scratch.path("a/b")).unwrap();
    fs::write(&header, "old").unwrap();
    fs::write(&source, "old").unwrap();

    let compilation = compile_file(&idl, &header, &source).unwrap();

    assert_eq!(fs::read_to_string(&header).unwrap(), compilation.rendered.interface);
    assert_eq!(fs::read_to_string(&source).unwrap(), compilation.rendered.metadata);
    assert!(!scratch.path("a/b/Foo.h.tmp").exists());
}
