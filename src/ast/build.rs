use super::*;

/// Assembles a [`File`].
///
/// Parsers can drive the low-level [`push`](FileBuilder::push) method directly, attaching spans
/// as they go. The closure-based helpers are convenient for constructing files by hand:
///
/// ```
/// use protoscope::ast::{FileBuilder, Label, Syntax};
///
/// let file = FileBuilder::new("foo.proto")
///     .syntax(Syntax::Proto3)
///     .package("foo")
///     .message("Foo", |m| {
///         m.field(None, "int32", "bar", 1)
///             .field(Some(Label::Repeated), "string", "baz", 2);
///     })
///     .build();
///
/// let baz = file.find("Foo.baz").map(|id| file.full_name(id).to_string());
/// assert_eq!(baz.as_deref(), Some("foo.Foo.baz"));
/// ```
#[derive(Debug, Default)]
pub struct FileBuilder {
    file: File,
}

/// Adds declarations to a container while building a [`File`].
#[derive(Debug)]
pub struct ContainerBuilder<'a> {
    file: &'a mut File,
    parent: Option<DeclId>,
    last: Option<DeclId>,
}

impl FileBuilder {
    /// Starts building a file with the given import name.
    pub fn new(name: impl Into<String>) -> Self {
        FileBuilder {
            file: File {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    /// Sets the language version.
    pub fn syntax(mut self, syntax: Syntax) -> Self {
        self.file.syntax = syntax;
        self
    }

    /// Sets the package name.
    pub fn package(mut self, package: &str) -> Self {
        self.file.package = QualifiedName::parse(package);
        self
    }

    /// Adds an `import` statement.
    pub fn import(self, path: impl Into<String>, kind: ImportKind) -> Self {
        self.push_import(Import {
            path: path.into(),
            kind,
            span: None,
        })
    }

    /// Adds an `import` statement with its location.
    pub fn push_import(mut self, import: Import) -> Self {
        self.file.imports.push(import);
        self
    }

    /// Adds a file-level option.
    pub fn option(mut self, option: OptionAssign) -> Self {
        self.file.options.push(option);
        self
    }

    /// Adds a top-level `message` block.
    pub fn message(mut self, name: &str, f: impl FnOnce(&mut ContainerBuilder<'_>)) -> Self {
        self.root().message(name, f);
        self
    }

    /// Adds a top-level `enum` block.
    pub fn enumeration(mut self, name: &str, f: impl FnOnce(&mut ContainerBuilder<'_>)) -> Self {
        self.root().enumeration(name, f);
        self
    }

    /// Adds a `service` block.
    pub fn service(mut self, name: &str, f: impl FnOnce(&mut ContainerBuilder<'_>)) -> Self {
        self.root().service(name, f);
        self
    }

    /// Adds a top-level `extend` block.
    pub fn extend(mut self, extendee: &str, f: impl FnOnce(&mut ContainerBuilder<'_>)) -> Self {
        self.root().extend(extendee, f);
        self
    }

    /// Adds top-level declarations with direct access to the container builder.
    pub fn items(mut self, f: impl FnOnce(&mut ContainerBuilder<'_>)) -> Self {
        f(&mut self.root());
        self
    }

    /// Appends a declaration to `parent`, or to the top level if `parent` is `None`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not returned by an earlier call on this builder.
    pub fn push(&mut self, parent: Option<DeclId>, decl: Decl) -> DeclId {
        self.file.push(parent, decl)
    }

    /// Attaches an option to a declaration added earlier.
    ///
    /// # Panics
    ///
    /// Panics if `decl` was not returned by an earlier call on this builder.
    pub fn push_option(&mut self, decl: DeclId, option: OptionAssign) {
        self.file.decls[decl.index()].options.push(option);
    }

    /// Finishes the file.
    pub fn build(self) -> File {
        self.file
    }

    fn root(&mut self) -> ContainerBuilder<'_> {
        ContainerBuilder {
            file: &mut self.file,
            parent: None,
            last: None,
        }
    }
}

impl File {
    pub(super) fn push(&mut self, parent: Option<DeclId>, decl: Decl) -> DeclId {
        let id = DeclId::new(self.decls.len());
        self.decls.push(decl);
        self.parents.push(parent);
        match parent {
            Some(parent) => self.decls[parent.index()].children.push(id),
            None => self.items.push(id),
        }
        id
    }
}

impl<'a> ContainerBuilder<'a> {
    /// The container being built, or `None` at the top level.
    pub fn id(&self) -> Option<DeclId> {
        self.parent
    }

    /// The most recently added child.
    pub fn last(&self) -> Option<DeclId> {
        self.last
    }

    /// Appends a declaration to this container.
    pub fn push(&mut self, decl: Decl) -> DeclId {
        let id = self.file.push(self.parent, decl);
        self.last = Some(id);
        id
    }

    /// Adds an option to the container itself. At the top level this sets a file option.
    pub fn option(&mut self, option: OptionAssign) -> &mut Self {
        match self.parent {
            Some(parent) => self.file.decls[parent.index()].options.push(option),
            None => self.file.options.push(option),
        }
        self
    }

    /// Adds an option to the most recently added child, such as `[deprecated = true]` on a
    /// field.
    ///
    /// # Panics
    ///
    /// Panics if nothing has been added to this container yet.
    pub fn with_option(&mut self, option: OptionAssign) -> &mut Self {
        let last = self.last.expect("no declaration to attach the option to");
        self.file.decls[last.index()].options.push(option);
        self
    }

    /// Sets the location of the most recently added child.
    ///
    /// # Panics
    ///
    /// Panics if nothing has been added to this container yet.
    pub fn with_span(&mut self, span: Span) -> &mut Self {
        let last = self.last.expect("no declaration to attach the span to");
        self.file.decls[last.index()].span = Some(span);
        self
    }

    /// Adds a nested `message` block.
    pub fn message(&mut self, name: &str, f: impl FnOnce(&mut ContainerBuilder<'_>)) -> &mut Self {
        self.nested(Some(name), DeclKind::Message, f)
    }

    /// Adds a nested `enum` block.
    pub fn enumeration(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut ContainerBuilder<'_>),
    ) -> &mut Self {
        self.nested(Some(name), DeclKind::Enum, f)
    }

    /// Adds a `service` block.
    pub fn service(&mut self, name: &str, f: impl FnOnce(&mut ContainerBuilder<'_>)) -> &mut Self {
        self.nested(Some(name), DeclKind::Service, f)
    }

    /// Adds a `oneof` block.
    pub fn oneof(&mut self, name: &str, f: impl FnOnce(&mut ContainerBuilder<'_>)) -> &mut Self {
        self.nested(Some(name), DeclKind::Oneof, f)
    }

    /// Adds an `extend` block.
    pub fn extend(
        &mut self,
        extendee: &str,
        f: impl FnOnce(&mut ContainerBuilder<'_>),
    ) -> &mut Self {
        self.nested(
            None,
            DeclKind::Extend(Extend {
                extendee: TypeRef::parse(extendee),
            }),
            f,
        )
    }

    /// Adds a `group` field. The closure builds the body of the group's message type.
    pub fn group(
        &mut self,
        label: Option<Label>,
        name: &str,
        number: i64,
        f: impl FnOnce(&mut ContainerBuilder<'_>),
    ) -> &mut Self {
        self.nested(
            Some(name),
            DeclKind::Group(Group {
                label,
                number: Int::new(number),
            }),
            f,
        )
    }

    /// Adds a field whose type is parsed with [`FieldType::parse`].
    pub fn field(&mut self, label: Option<Label>, ty: &str, name: &str, number: i64) -> &mut Self {
        self.leaf(
            name,
            DeclKind::Field(Field {
                label,
                ty: FieldType::parse(ty),
                number: Int::new(number),
            }),
        )
    }

    /// Adds a `map<key, value>` field.
    pub fn map_field(&mut self, key: &str, value: &str, name: &str, number: i64) -> &mut Self {
        self.leaf(
            name,
            DeclKind::Field(Field {
                label: None,
                ty: FieldType::Map {
                    key: Box::new(FieldType::parse(key)),
                    value: Box::new(FieldType::parse(value)),
                },
                number: Int::new(number),
            }),
        )
    }

    /// Adds an enum value.
    pub fn value(&mut self, name: &str, number: i64) -> &mut Self {
        self.leaf(
            name,
            DeclKind::EnumValue(EnumValue {
                number: Int::new(number),
            }),
        )
    }

    /// Adds a unary `rpc` declaration.
    pub fn method(&mut self, name: &str, input: &str, output: &str) -> &mut Self {
        self.leaf(
            name,
            DeclKind::Method(Method {
                input: TypeRef::parse(input),
                output: TypeRef::parse(output),
                client_streaming: false,
                server_streaming: false,
            }),
        )
    }

    /// Adds one range of a `reserved` statement.
    pub fn reserved(&mut self, range: NumberRange) -> &mut Self {
        self.push(Decl::new(None, DeclKind::ReservedRange(range)));
        self
    }

    /// Adds the names of a `reserved` statement.
    pub fn reserved_names(&mut self, names: &[&str]) -> &mut Self {
        for name in names {
            self.leaf(name, DeclKind::ReservedName);
        }
        self
    }

    /// Adds one range of an `extensions` statement.
    pub fn extensions(&mut self, range: NumberRange) -> &mut Self {
        self.push(Decl::new(None, DeclKind::ExtensionRange(range)));
        self
    }

    fn leaf(&mut self, name: &str, kind: DeclKind) -> &mut Self {
        self.push(Decl::new(Some(name), kind));
        self
    }

    fn nested(
        &mut self,
        name: Option<&str>,
        kind: DeclKind,
        f: impl FnOnce(&mut ContainerBuilder<'_>),
    ) -> &mut Self {
        let id = self.push(Decl::new(name, kind));
        f(&mut ContainerBuilder {
            file: &mut *self.file,
            parent: Some(id),
            last: None,
        });
        self.last = Some(id);
        self
    }
}

impl Decl {
    /// Creates a declaration with no children, options or location.
    pub fn new(name: Option<&str>, kind: DeclKind) -> Self {
        Decl {
            name: name.map(Ident::new),
            kind,
            children: Vec::new(),
            options: Vec::new(),
            span: None,
        }
    }
}
