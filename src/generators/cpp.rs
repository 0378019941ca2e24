use crate::{
    ast::{LiteralValue, PrimitiveType, Type},
    generators::CppNames,
    model::{ArgumentModel, InterfaceModel, ValueKind},
};

/// Configuration settings specific to C++ code generation
#[derive(Debug, Clone)]
pub struct CppConfig {
    /// Number of spaces to use for each indentation level.
    pub indent: usize,
    /// The runtime's string type.
    pub string_type: String,
    /// Type used for every value that has no primitive mapping.
    pub value_type: String,
}

impl Default for CppConfig {
    fn default() -> Self {
        CppConfig {
            indent: 2,
            string_type: "base::string".to_string(),
            value_type: "JSValue".to_string(),
        }
    }
}

/// The two rendered artifacts of one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// `Name_interface.cc`: member tables and class metadata.
    pub metadata: String,
    /// `Name.h`: the class declaration.
    pub interface: String,
}

/// Line-oriented text sink with indentation.
struct Emitter {
    out: String,
    indent_width: usize,
    current_indent_level: usize,
}

impl Emitter {
    fn new(indent_width: usize) -> Self {
        Emitter {
            out: String::new(),
            indent_width,
            current_indent_level: 0,
        }
    }

    fn write_line(&mut self, content: impl AsRef<str>) {
        let content = content.as_ref();
        if !content.is_empty() {
            let indent = " ".repeat(self.current_indent_level * self.indent_width);
            self.out.push_str(&indent);
            self.out.push_str(content);
        }
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn increase_indent(&mut self) {
        self.current_indent_level += 1;
    }

    fn decrease_indent(&mut self) {
        self.current_indent_level = self.current_indent_level.saturating_sub(1);
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Renders an [`InterfaceModel`] as a C++ header and a metadata source file.
#[derive(Debug, Clone, Default)]
pub struct CppGenerator {
    config: CppConfig,
}

impl CppGenerator {
    /// Creates a new `CppGenerator`, using the default configuration if none is given.
    pub fn new(config: Option<CppConfig>) -> Self {
        CppGenerator {
            config: config.unwrap_or_default(),
        }
    }

    /// Renders both artifacts. Output depends only on `model` and the config.
    pub fn render(&self, model: &InterfaceModel) -> Rendered {
        let names = CppNames::new(model);
        Rendered {
            metadata: self.render_metadata(model, &names),
            interface: self.render_interface(model, &names),
        }
    }

    /// The C++ spelling of an IDL type.
    pub fn cpp_type(&self, ty: &Type) -> String {
        let Some(primitive) = ty.primitive() else {
            return self.config.value_type.clone();
        };
        let s = match primitive {
            PrimitiveType::Void => "void",
            PrimitiveType::Boolean => "bool",
            PrimitiveType::Char => "char",
            PrimitiveType::Byte => "int8_t",
            PrimitiveType::UnsignedByte => "uint8_t",
            PrimitiveType::Short => "int16_t",
            PrimitiveType::UnsignedShort => "uint16_t",
            PrimitiveType::Int => "int32_t",
            PrimitiveType::UnsignedInt => "uint32_t",
            PrimitiveType::Long => "int64_t",
            PrimitiveType::UnsignedLong => "uint64_t",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::String => return self.config.string_type.clone(),
        };
        s.to_string()
    }

    fn parameters(&self, arguments: &[ArgumentModel], with_defaults: bool) -> String {
        arguments
            .iter()
            .map(|arg| {
                let mut param = format!("{} {}", self.cpp_type(&arg.ty), arg.name);
                match &arg.default {
                    Some(default) if with_defaults => {
                        param.push_str(" = ");
                        param.push_str(&match default.value {
                            LiteralValue::Null => "nullptr".to_string(),
                            _ => default.to_string(),
                        });
                    }
                    _ => {}
                }
                param
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn banner(out: &mut Emitter, model: &InterfaceModel) {
        out.write_line(format!(
            "// Generated by idlc from {}. Do not edit.",
            model.fullname
        ));
        out.blank();
    }

    fn open_namespaces(out: &mut Emitter, names: &CppNames) {
        for ns in &names.namespaces {
            out.write_line(format!("namespace {ns} {{"));
        }
        if !names.namespaces.is_empty() {
            out.blank();
        }
    }

    fn close_namespaces(out: &mut Emitter, names: &CppNames) {
        if !names.namespaces.is_empty() {
            out.blank();
        }
        for ns in names.namespaces.iter().rev() {
            out.write_line(format!("}}  // namespace {ns}"));
        }
    }

    fn index_enum(out: &mut Emitter, name: &str, entries: &[&str]) {
        if entries.is_empty() {
            return;
        }
        out.write_line(format!("enum {name} {{"));
        out.increase_indent();
        for entry in entries {
            out.write_line(format!("{entry},"));
        }
        out.decrease_indent();
        out.write_line("};");
        out.blank();
    }

    fn render_interface(&self, model: &InterfaceModel, names: &CppNames) -> String {
        let mut out = Emitter::new(self.config.indent);
        let name = &model.name;

        Self::banner(&mut out, model);
        out.write_line(format!("#ifndef {}", names.header_guard));
        out.write_line(format!("#define {}", names.header_guard));
        out.blank();
        out.write_line("#include \"jsclass.h\"");
        for header in &names.import_headers {
            out.write_line(format!("#include \"{header}\""));
        }
        out.blank();

        Self::open_namespaces(&mut out, names);
        for using in &names.usings {
            out.write_line(format!("using {using};"));
        }
        if !names.usings.is_empty() {
            out.blank();
        }

        match &model.extends {
            Some(base) => {
                let base = base.replace('.', "::");
                out.write_line(format!("class {name} : public {base} {{"));
            }
            None => out.write_line(format!("class {name} {{")),
        }
        out.write_line(" public:");
        out.increase_indent();

        let methods: Vec<&str> = model.methods.iter().map(|m| m.index_name.as_str()).collect();
        let properties: Vec<&str> = model.properties.iter().map(|p| p.index_name.as_str()).collect();
        let events: Vec<&str> = model.events.iter().map(|e| e.index_name.as_str()).collect();
        Self::index_enum(&mut out, "MethodIndex", &methods);
        Self::index_enum(&mut out, "PropertyIndex", &properties);
        Self::index_enum(&mut out, "EventIndex", &events);

        for ctor in &model.constructors {
            out.write_line(format!(
                "static {name}* Create({});",
                self.parameters(&ctor.arguments, true)
            ));
        }
        out.write_line(format!("virtual ~{name}() {{}}"));

        if !model.methods.is_empty() {
            out.blank();
        }
        for method in &model.methods {
            let ret = self.cpp_type(&method.return_type);
            let params = self.parameters(&method.arguments, true);
            if method.is_static {
                out.write_line(format!("static {ret} {}({params});", method.name));
            } else {
                out.write_line(format!("virtual {ret} {}({params}) = 0;", method.name));
            }
        }

        if !model.properties.is_empty() {
            out.blank();
        }
        for prop in &model.properties {
            let ty = self.cpp_type(&prop.ty);
            let accessor = crate::loader::first_upper(&prop.name);
            if prop.is_static {
                out.write_line(format!("static {ty} Get{accessor}();"));
                if !prop.readonly {
                    out.write_line(format!("static void Set{accessor}({ty} value);"));
                }
            } else {
                out.write_line(format!("virtual {ty} Get{accessor}() = 0;"));
                if !prop.readonly {
                    out.write_line(format!("virtual void Set{accessor}({ty} value) = 0;"));
                }
            }
        }

        if model.has_events() {
            out.blank();
        }
        for event in &model.events {
            let params = self.parameters(&event.arguments, false);
            let args: Vec<&str> = event.arguments.iter().map(|a| a.name.as_str()).collect();
            let mut call = vec![event.index_name.as_str()];
            call.extend(args);
            out.write_line(format!(
                "void Fire{}({params}) {{ FireEvent({}); }}",
                crate::loader::first_upper(&event.name),
                call.join(", ")
            ));
        }

        out.blank();
        out.write_line("static const ClassMeta* GetClassMeta();");
        out.decrease_indent();
        out.write_line("};");

        Self::close_namespaces(&mut out, names);
        out.blank();
        out.write_line(format!("#endif  // {}", names.header_guard));
        out.finish()
    }

    fn kinds(kinds: &[ValueKind]) -> String {
        let tags: Vec<&str> = kinds.iter().map(ValueKind::tag).collect();
        format!("{{{}}}", tags.join(", "))
    }

    fn table(out: &mut Emitter, ty: &str, name: &str, rows: Vec<String>) {
        out.write_line(format!("static const {ty} {name}[] = {{"));
        out.increase_indent();
        for row in rows {
            out.write_line(format!("{row},"));
        }
        out.write_line("{nullptr},");
        out.decrease_indent();
        out.write_line("};");
        out.blank();
    }

    fn render_metadata(&self, model: &InterfaceModel, names: &CppNames) -> String {
        let mut out = Emitter::new(self.config.indent);
        let name = &model.name;

        Self::banner(&mut out, model);
        out.write_line(format!("#define {}", names.implement_guard));
        out.write_line(format!("#include \"{}\"", names.header));
        out.blank();
        Self::open_namespaces(&mut out, names);

        let methods = model
            .methods
            .iter()
            .map(|m| {
                format!(
                    "{{\"{}\", {name}::{}, \"{}\", {}, {}}}",
                    m.name,
                    m.index_name,
                    m.signature,
                    Self::kinds(&m.call_types),
                    m.is_static
                )
            })
            .collect();
        Self::table(&mut out, "MethodMeta", &format!("k{name}Methods"), methods);

        let properties = model
            .properties
            .iter()
            .map(|p| {
                format!(
                    "{{\"{}\", {name}::{}, \"{}\", {}, {}, {}}}",
                    p.name, p.index_name, p.signature, p.value_kind, p.readonly, p.is_static
                )
            })
            .collect();
        Self::table(&mut out, "PropertyMeta", &format!("k{name}Properties"), properties);

        let events = model
            .events
            .iter()
            .map(|e| {
                format!(
                    "{{\"{}\", {name}::{}, {}, {}}}",
                    e.name,
                    e.index_name,
                    e.is_final,
                    Self::kinds(&e.argument_kinds)
                )
            })
            .collect();
        Self::table(&mut out, "EventMeta", &format!("k{name}Events"), events);

        let constructors = model
            .constructors
            .iter()
            .map(|c| format!("{{\"{}\", {}}}", c.name, Self::kinds(&c.argument_kinds)))
            .collect();
        Self::table(&mut out, "ConstructorMeta", &format!("k{name}Constructors"), constructors);

        out.write_line(format!("static const ClassMeta k{name}ClassMeta = {{"));
        out.increase_indent();
        out.write_line(format!("\"{}\",", model.fullname));
        match &model.extends {
            Some(base) => out.write_line(format!("\"{base}\",")),
            None => out.write_line("nullptr,"),
        }
        out.write_line(format!("k{name}Methods,"));
        out.write_line(format!("k{name}Properties,"));
        out.write_line(format!("k{name}Events,"));
        out.write_line(format!("k{name}Constructors,"));
        out.decrease_indent();
        out.write_line("};");
        out.blank();
        out.write_line(format!("const ClassMeta* {name}::GetClassMeta() {{"));
        out.increase_indent();
        out.write_line(format!("return &k{name}ClassMeta;"));
        out.decrease_indent();
        out.write_line("}");

        Self::close_namespaces(&mut out, names);
        out.finish()
    }
}
