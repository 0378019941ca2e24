use std::path::{Path, PathBuf};

use crate::{error::ResolutionError, model::InterfaceModel};

pub mod cpp;

/// File and symbol names derived from an interface's fully-qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppNames {
    /// `a/b/Foo.h`
    pub header: String,
    /// `a/b/Foo_interface.cc`
    pub source: String,
    /// `A_B_FOO_H_`
    pub header_guard: String,
    /// `IMPLEMENT_A_B_FOO`
    pub implement_guard: String,
    pub namespaces: Vec<String>,
    /// Imports spelled `c::d::Bar`.
    pub usings: Vec<String>,
    /// Imports spelled `c/d/Bar.h`.
    pub import_headers: Vec<String>,
}

impl CppNames {
    pub fn new(model: &InterfaceModel) -> Self {
        let path = model.fullname.replace('.', "/");
        let upper = model.fullname.replace('.', "_").to_uppercase();
        CppNames {
            header: format!("{path}.h"),
            source: format!("{path}_interface.cc"),
            header_guard: format!("{upper}_H_"),
            implement_guard: format!("IMPLEMENT_{upper}"),
            namespaces: model.package_segments().map(str::to_string).collect(),
            usings: model.imports.iter().map(|i| i.replace('.', "::")).collect(),
            import_headers: model
                .imports
                .iter()
                .map(|i| format!("{}.h", i.replace('.', "/")))
                .collect(),
        }
    }
}

/// Caller-supplied destinations for the two generated files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub header: PathBuf,
    pub source: PathBuf,
}

impl OutputPaths {
    pub fn new(header: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        OutputPaths {
            header: header.into(),
            source: source.into(),
        }
    }

    /// Checks both paths end with the expected relative names, component by
    /// component. Fails on the first mismatch.
    pub fn validate(&self, names: &CppNames) -> Result<(), ResolutionError> {
        check_suffix("header", &self.header, &names.header)?;
        check_suffix("source", &self.source, &names.source)
    }
}

fn check_suffix(what: &'static str, path: &Path, expected: &str) -> Result<(), ResolutionError> {
    if path.ends_with(expected) {
        Ok(())
    } else {
        Err(ResolutionError::OutputPathMismatch {
            what,
            path: path.to_path_buf(),
            expected: expected.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{loader::resolve, parser::parse};

    fn names(source: &str) -> CppNames {
        CppNames::new(&resolve(&parse(source, "t.idl").unwrap()).unwrap())
    }

    #[test]
    fn test_derived_names() {
        let names = names("package a.b; import c.d.Bar; import e.Baz; interface Foo { };");
        assert_eq!(names.header, "a/b/Foo.h");
        assert_eq!(names.source, "a/b/Foo_interface.cc");
        assert_eq!(names.header_guard, "A_B_FOO_H_");
        assert_eq!(names.implement_guard, "IMPLEMENT_A_B_FOO");
        assert_eq!(names.namespaces, vec!["a", "b"]);
        assert_eq!(names.usings, vec!["c::d::Bar", "e::Baz"]);
        assert_eq!(names.import_headers, vec!["c/d/Bar.h", "e/Baz.h"]);
    }

    #[test]
    fn test_output_paths_accept_matching_suffix() {
        let names = names("package a.b; interface Foo { };");
        let paths = OutputPaths::new("out/gen/a/b/Foo.h", "out/gen/a/b/Foo_interface.cc");
        assert!(paths.validate(&names).is_ok());
        assert!(OutputPaths::new("a/b/Foo.h", "a/b/Foo_interface.cc")
            .validate(&names)
            .is_ok());
    }

    #[test]
    fn test_output_paths_reject_wrong_header() {
        let names = names("package a.b; interface Foo { };");
        let err = OutputPaths::new("wrong/Name.h", "a/b/Foo_interface.cc")
            .validate(&names)
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::OutputPathMismatch { what: "header", ref expected, .. } if expected == "a/b/Foo.h"
        ));
    }

    #[test]
    fn test_output_paths_compare_whole_components() {
        let names = names("package a.b; interface Foo { };");
        let err = OutputPaths::new("xa/b/Foo.h", "a/b/Foo_interface.cc")
            .validate(&names)
            .unwrap_err();
        assert!(matches!(err, ResolutionError::OutputPathMismatch { what: "header", .. }));
        let err = OutputPaths::new("a/b/Foo.h", "a/b/MyFoo_interface.cc")
            .validate(&names)
            .unwrap_err();
        assert!(matches!(err, ResolutionError::OutputPathMismatch { what: "source", .. }));
    }
}
