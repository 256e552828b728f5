//! The declaration tree the analyzer runs over.
//!
//! A [`File`] is produced once, either by a parser driving a [`FileBuilder`] or from a compiled
//! descriptor with [`File::from_file_descriptor_proto`], and is immutable afterwards. Declarations
//! are stored in a per-file arena and addressed by [`DeclId`]. Parent links are kept in a side
//! index, so the tree itself holds no back-references.

use std::{fmt, ops::Range};

mod build;
mod descriptor;
mod visit;

pub use self::{
    build::{ContainerBuilder, FileBuilder},
    visit::Walk,
};

/// A byte range in the source text of a file.
pub type Span = Range<usize>;

/// The language version of a file.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Syntax {
    /// `syntax = "proto2";`, or no syntax statement.
    #[default]
    Proto2,
    /// `syntax = "proto3";`
    Proto3,
}

/// A dotted name such as `foo.bar.Baz`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    parts: Vec<String>,
}

/// The index of a declaration within its [`File`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

/// A parsed schema file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct File {
    pub(crate) name: String,
    pub(crate) syntax: Syntax,
    pub(crate) package: QualifiedName,
    pub(crate) imports: Vec<Import>,
    pub(crate) options: Vec<OptionAssign>,
    pub(crate) decls: Vec<Decl>,
    pub(crate) parents: Vec<Option<DeclId>>,
    pub(crate) items: Vec<DeclId>,
}

/// An `import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// The imported path, as written.
    pub path: String,
    /// Whether the import is `public`, `weak` or neither.
    pub kind: ImportKind,
    /// The location of the statement.
    pub span: Option<Span>,
}

/// The modifier on an `import` statement.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// A plain import.
    #[default]
    Normal,
    /// `import public`: re-exported to every file importing this one.
    Public,
    /// `import weak`: the target is allowed to be missing.
    Weak,
}

/// An identifier together with its location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    /// The identifier text.
    pub value: String,
    /// The location of the identifier.
    pub span: Option<Span>,
}

/// A single declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    /// The declared name, if the declaration kind has one.
    pub name: Option<Ident>,
    /// What kind of declaration this is, with any kind-specific payload.
    pub kind: DeclKind,
    /// Nested declarations, in source order.
    pub children: Vec<DeclId>,
    /// Options attached directly to this declaration.
    pub options: Vec<OptionAssign>,
    /// The location of the whole declaration.
    pub span: Option<Span>,
}

/// The kind of a [`Decl`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// A `message` block.
    Message,
    /// An `enum` block.
    Enum,
    /// A `service` block.
    Service,
    /// An `rpc` declaration inside a service.
    Method(Method),
    /// A `oneof` block inside a message.
    Oneof,
    /// A field of a message, oneof or extend block.
    Field(Field),
    /// A value of an enum.
    EnumValue(EnumValue),
    /// A `group` field. The children form the body of the group's message type.
    Group(Group),
    /// An `extend` block.
    Extend(Extend),
    /// One range of a `reserved` statement.
    ReservedRange(NumberRange),
    /// One name of a `reserved` statement. The reserved name is stored as [`Decl::name`].
    ReservedName,
    /// One range of an `extensions` statement.
    ExtensionRange(NumberRange),
}

/// The payload of an `rpc` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// The request type.
    pub input: TypeRef,
    /// The response type.
    pub output: TypeRef,
    /// Whether the request is a stream.
    pub client_streaming: bool,
    /// Whether the response is a stream.
    pub server_streaming: bool,
}

/// The payload of a field declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The label, if one was written.
    pub label: Option<Label>,
    /// The field type.
    pub ty: FieldType,
    /// The field number.
    pub number: Int,
}

/// The payload of an enum value declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    /// The value number.
    pub number: Int,
}

/// The payload of a group declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// The label, if one was written.
    pub label: Option<Label>,
    /// The field number.
    pub number: Int,
}

/// The payload of an `extend` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extend {
    /// The message being extended.
    pub extendee: TypeRef,
}

/// A range in a `reserved` or `extensions` statement, as written.
///
/// The bounds are kept raw so that malformed ranges survive until analysis: a well formed range
/// has one bound (optionally followed by `to max`) or two bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumberRange {
    /// The numeric bounds.
    pub bounds: Vec<Int>,
    /// Whether the range ends with `to max`.
    pub max: bool,
}

/// A field label.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// `optional`
    Optional,
    /// `required`
    Required,
    /// `repeated`
    Repeated,
}

/// The type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// A built-in scalar type.
    Scalar(ScalarType),
    /// A reference to a message or enum.
    Named(TypeRef),
    /// A `map<K, V>` type.
    Map {
        /// The key type.
        key: Box<FieldType>,
        /// The value type.
        value: Box<FieldType>,
    },
}

/// The built-in scalar types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

/// A reference to a named declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// The referenced name.
    pub name: QualifiedName,
    /// Whether the name was written with a leading `.`.
    pub absolute: bool,
    /// The location of the reference.
    pub span: Option<Span>,
}

/// An integer literal, kept as sign and magnitude so that the full `uint64` range survives.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Int {
    /// Whether the literal was preceded by `-`.
    pub negative: bool,
    /// The magnitude.
    pub value: u64,
    /// The location of the literal.
    pub span: Option<Span>,
}

/// An `option` statement or bracketed field option.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionAssign {
    /// The option name, such as `deprecated` or `(my.ext).field`.
    pub name: Vec<OptionNamePart>,
    /// The assigned value.
    pub value: Constant,
    /// The location of the assignment.
    pub span: Option<Span>,
}

/// One component of an option name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionNamePart {
    /// A plain field name.
    Ident(Ident),
    /// A parenthesized extension name.
    Extension(TypeRef),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    /// The value.
    pub kind: ConstantKind,
    /// The location of the literal.
    pub span: Option<Span>,
}

/// The kinds of literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantKind {
    /// `true` or `false`.
    Bool(bool),
    /// A quoted string.
    String(String),
    /// An integer literal.
    Int {
        /// Whether the literal was negated.
        negative: bool,
        /// The magnitude.
        value: u64,
    },
    /// A floating point literal, including `inf` and `nan`.
    Float(f64),
    /// A bare identifier, such as an enum value name.
    Ident(String),
    /// A `{ ... }` message literal with its fields broken out.
    Message(Vec<FieldAssign>),
    /// A `{ ... }` message literal kept as unparsed text.
    Aggregate(String),
}

/// A `name: value` entry inside a message literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssign {
    /// The field name.
    pub name: Ident,
    /// The field value.
    pub value: Constant,
}

impl Syntax {
    /// Parses the value of a `syntax` statement.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" | "proto2" => Some(Syntax::Proto2),
            "proto3" => Some(Syntax::Proto3),
            _ => None,
        }
    }

    /// The string used for this syntax in a `syntax` statement.
    pub fn as_str(self) -> &'static str {
        match self {
            Syntax::Proto2 => "proto2",
            Syntax::Proto3 => "proto3",
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl QualifiedName {
    /// Creates a name from its components.
    pub fn new<I>(parts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        QualifiedName {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits a dotted name into its components. Leading and repeated dots are ignored.
    pub fn parse(name: &str) -> Self {
        QualifiedName::new(name.split('.').filter(|part| !part.is_empty()))
    }

    /// The components of this name.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Returns `true` if this name has no components.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns a new name with `name` appended.
    pub fn join(&self, name: &str) -> Self {
        let mut parts = self.parts.clone();
        parts.push(name.to_owned());
        QualifiedName { parts }
    }

    /// Iterates over this name and each of its prefixes, longest first, ending with the empty
    /// name.
    pub fn prefixes(&self) -> impl Iterator<Item = &[String]> {
        (0..=self.parts.len()).rev().map(|len| &self.parts[..len])
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.parts.iter().enumerate() {
            if index != 0 {
                f.write_str(".")?;
            }
            f.write_str(part)?;
        }
        Ok(())
    }
}

impl DeclId {
    pub(crate) fn new(index: usize) -> Self {
        DeclId(index as u32)
    }

    /// The position of this declaration in its file's arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl File {
    /// The name the file is imported by, such as `foo/bar.proto`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The language version of the file.
    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// The declared package. Empty if the file has no `package` statement.
    pub fn package(&self) -> &QualifiedName {
        &self.package
    }

    /// The `import` statements, in source order.
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// File-level options.
    pub fn options(&self) -> &[OptionAssign] {
        &self.options
    }

    /// The top-level declarations, in source order.
    pub fn items(&self) -> &[DeclId] {
        &self.items
    }

    /// The number of declarations in the arena.
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Returns `true` if the file declares nothing.
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Gets a declaration by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this file.
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    /// Gets a declaration by id, returning `None` if `id` is out of range.
    pub fn get(&self, id: DeclId) -> Option<&Decl> {
        self.decls.get(id.index())
    }

    /// The direct parent of a declaration. `None` for top-level declarations.
    pub fn parent(&self, id: DeclId) -> Option<DeclId> {
        self.parents.get(id.index()).copied().flatten()
    }

    /// The children of `container`, or the top-level declarations if `container` is `None`.
    pub fn children(&self, container: Option<DeclId>) -> &[DeclId] {
        match container {
            Some(id) => &self.decl(id).children,
            None => &self.items,
        }
    }

    /// The declaration whose name scope this declaration's name is registered in, for the
    /// purpose of computing full names.
    ///
    /// Oneof members and extension fields belong to the enclosing message, and enum values
    /// belong to the container of their enum.
    pub fn name_scope(&self, id: DeclId) -> Option<DeclId> {
        let mut scope = self.parent(id);
        if matches!(self.decl(id).kind, DeclKind::EnumValue(_)) {
            scope = scope.and_then(|enumeration| self.parent(enumeration));
        }
        while let Some(parent) = scope {
            match self.decl(parent).kind {
                DeclKind::Oneof | DeclKind::Extend(_) => scope = self.parent(parent),
                _ => break,
            }
        }
        scope
    }

    /// The fully qualified name of a declaration, without a leading dot.
    pub fn full_name(&self, id: DeclId) -> QualifiedName {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(decl) = current {
            if let Some(name) = &self.decl(decl).name {
                names.push(name.value.clone());
            }
            current = self.name_scope(decl);
        }
        let mut full_name = self.package.clone();
        full_name.parts.extend(names.into_iter().rev());
        full_name
    }

    /// Finds a declaration by its name relative to the file's package, such as `Outer.Inner`.
    ///
    /// Only containers and their direct members are searched, following the same hoisting
    /// rules as [`full_name`](File::full_name).
    pub fn find(&self, path: &str) -> Option<DeclId> {
        let path = QualifiedName::parse(path);
        let mut container = None;
        for part in path.parts() {
            container = Some(self.find_member(container, part)?);
        }
        container
    }

    fn find_member(&self, container: Option<DeclId>, name: &str) -> Option<DeclId> {
        let mut stack: Vec<DeclId> = self.children(container).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let decl = self.decl(id);
            if decl.name() == Some(name) && !matches!(decl.kind, DeclKind::ReservedName) {
                return Some(id);
            }
            if matches!(
                decl.kind,
                DeclKind::Oneof | DeclKind::Extend(_) | DeclKind::Enum
            ) {
                stack.extend(decl.children.iter().rev());
            }
        }
        None
    }

    /// Iterates over every declaration in the file in preorder.
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(self)
    }
}

impl Decl {
    /// The declared name as a string.
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|name| name.value.as_str())
    }

    /// The location of the declared name, falling back to the whole declaration.
    pub fn name_span(&self) -> Option<Span> {
        self.name
            .as_ref()
            .and_then(|name| name.span.clone())
            .or_else(|| self.span.clone())
    }

    /// The number assigned to a field, group or enum value.
    pub fn number(&self) -> Option<&Int> {
        match &self.kind {
            DeclKind::Field(field) => Some(&field.number),
            DeclKind::Group(group) => Some(&group.number),
            DeclKind::EnumValue(value) => Some(&value.number),
            _ => None,
        }
    }

    /// The label of a field or group.
    pub fn label(&self) -> Option<Label> {
        match &self.kind {
            DeclKind::Field(field) => field.label,
            DeclKind::Group(group) => group.label,
            _ => None,
        }
    }

    /// Finds an option set with a plain single-part name, such as `allow_alias`.
    pub fn option(&self, name: &str) -> Option<&OptionAssign> {
        self.options.iter().find(|option| option.is_named(name))
    }
}

impl DeclKind {
    /// A lowercase description of this kind, used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Message => "message",
            DeclKind::Enum => "enum",
            DeclKind::Service => "service",
            DeclKind::Method(_) => "method",
            DeclKind::Oneof => "oneof",
            DeclKind::Field(_) => "field",
            DeclKind::EnumValue(_) => "enum value",
            DeclKind::Group(_) => "group",
            DeclKind::Extend(_) => "extend",
            DeclKind::ReservedRange(_) => "reserved range",
            DeclKind::ReservedName => "reserved name",
            DeclKind::ExtensionRange(_) => "extension range",
        }
    }

    /// Returns `true` for declarations that can be used as the type of a field.
    pub fn is_type(&self) -> bool {
        matches!(self, DeclKind::Message | DeclKind::Enum | DeclKind::Group(_))
    }

    /// Returns `true` for declarations that can be used as the type of a message field or as
    /// a method input or output.
    pub fn is_message(&self) -> bool {
        matches!(self, DeclKind::Message | DeclKind::Group(_))
    }

    /// Returns `true` for declarations whose names can qualify other names.
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            DeclKind::Message | DeclKind::Enum | DeclKind::Service | DeclKind::Group(_)
        )
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Optional => f.write_str("optional"),
            Label::Required => f.write_str("required"),
            Label::Repeated => f.write_str("repeated"),
        }
    }
}

impl FieldType {
    /// Parses a type as written in a field declaration. Built-in type names become
    /// [`FieldType::Scalar`] and everything else a [`FieldType::Named`] reference.
    pub fn parse(ty: &str) -> Self {
        match ScalarType::parse(ty) {
            Some(scalar) => FieldType::Scalar(scalar),
            None => FieldType::Named(TypeRef::parse(ty)),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(scalar) => f.write_str(scalar.as_str()),
            FieldType::Named(ty) => ty.fmt(f),
            FieldType::Map { key, value } => write!(f, "map<{}, {}>", key, value),
        }
    }
}

impl ScalarType {
    /// Parses the name of a built-in type.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "double" => Some(ScalarType::Double),
            "float" => Some(ScalarType::Float),
            "int32" => Some(ScalarType::Int32),
            "int64" => Some(ScalarType::Int64),
            "uint32" => Some(ScalarType::Uint32),
            "uint64" => Some(ScalarType::Uint64),
            "sint32" => Some(ScalarType::Sint32),
            "sint64" => Some(ScalarType::Sint64),
            "fixed32" => Some(ScalarType::Fixed32),
            "fixed64" => Some(ScalarType::Fixed64),
            "sfixed32" => Some(ScalarType::Sfixed32),
            "sfixed64" => Some(ScalarType::Sfixed64),
            "bool" => Some(ScalarType::Bool),
            "string" => Some(ScalarType::String),
            "bytes" => Some(ScalarType::Bytes),
            _ => None,
        }
    }

    /// The name of this type as written in a schema.
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarType::Double => "double",
            ScalarType::Float => "float",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Sint32 => "sint32",
            ScalarType::Sint64 => "sint64",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Bool => "bool",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
        }
    }

    /// Returns `true` if this type may be used as the key of a map.
    pub fn is_valid_map_key(self) -> bool {
        !matches!(
            self,
            ScalarType::Double | ScalarType::Float | ScalarType::Bytes
        )
    }
}

impl TypeRef {
    /// Parses a type name, which may start with `.` to make it absolute.
    pub fn parse(name: &str) -> Self {
        TypeRef {
            name: QualifiedName::parse(name),
            absolute: name.starts_with('.'),
            span: None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            f.write_str(".")?;
        }
        self.name.fmt(f)
    }
}

impl Int {
    /// Creates a literal from a signed value.
    pub fn new(value: i64) -> Self {
        Int {
            negative: value < 0,
            value: value.unsigned_abs(),
            span: None,
        }
    }

    /// The value as an `i64`, or `None` if it does not fit.
    pub fn to_i64(&self) -> Option<i64> {
        to_i64(self.negative, self.value)
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        self.value.fmt(f)
    }
}

pub(crate) fn to_i64(negative: bool, value: u64) -> Option<i64> {
    if negative {
        if value == i64::MIN.unsigned_abs() {
            Some(i64::MIN)
        } else {
            i64::try_from(value).ok().map(|value| -value)
        }
    } else {
        i64::try_from(value).ok()
    }
}

impl NumberRange {
    /// Creates an inclusive range.
    pub fn new(start: i64, end: i64) -> Self {
        NumberRange {
            bounds: vec![Int::new(start), Int::new(end)],
            max: false,
        }
    }

    /// Creates a range containing a single number.
    pub fn single(number: i64) -> Self {
        NumberRange {
            bounds: vec![Int::new(number)],
            max: false,
        }
    }

    /// Creates a range from `start` to `max`.
    pub fn to_max(start: i64) -> Self {
        NumberRange {
            bounds: vec![Int::new(start)],
            max: true,
        }
    }

    /// The inclusive bounds of this range, using `max` as the value of the `max` keyword.
    ///
    /// Returns `None` if the range does not have one of the accepted shapes. Bounds that do not
    /// fit in an `i64` saturate.
    pub fn interval(&self, max: i64) -> Option<(i64, i64)> {
        let value = |int: &Int| {
            int.to_i64()
                .unwrap_or(if int.negative { i64::MIN } else { i64::MAX })
        };
        match (self.bounds.as_slice(), self.max) {
            ([single], false) => Some((value(single), value(single))),
            ([start], true) => Some((value(start), max)),
            ([start, end], false) => Some((value(start), value(end))),
            _ => None,
        }
    }
}

impl fmt::Display for NumberRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, bound) in self.bounds.iter().enumerate() {
            if index != 0 {
                f.write_str(" to ")?;
            }
            bound.fmt(f)?;
        }
        if self.max {
            f.write_str(" to max")?;
        }
        Ok(())
    }
}

impl OptionAssign {
    /// Creates an option from a name such as `deprecated` or `(foo.bar).baz`.
    pub fn new(name: &str, value: ConstantKind) -> Self {
        OptionAssign {
            name: parse_option_name(name),
            value: Constant { kind: value, span: None },
            span: None,
        }
    }

    /// Returns `true` if this option has a single plain name equal to `name`.
    pub fn is_named(&self, name: &str) -> bool {
        matches!(self.name.as_slice(), [OptionNamePart::Ident(ident)] if ident.value == name)
    }

    /// The location of the option, falling back to the location of its value.
    pub fn span(&self) -> Option<Span> {
        self.span.clone().or_else(|| self.value.span.clone())
    }
}

impl fmt::Display for OptionNamePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionNamePart::Ident(ident) => f.write_str(&ident.value),
            OptionNamePart::Extension(ty) => write!(f, "({})", ty),
        }
    }
}

fn parse_option_name(name: &str) -> Vec<OptionNamePart> {
    let mut parts = Vec::new();
    let mut rest = name;
    while !rest.is_empty() {
        if let Some(inner) = rest.strip_prefix('(') {
            let end = inner.find(')').unwrap_or(inner.len());
            parts.push(OptionNamePart::Extension(TypeRef::parse(&inner[..end])));
            rest = inner.get(end + 1..).unwrap_or("");
        } else {
            let end = rest.find('.').unwrap_or(rest.len());
            parts.push(OptionNamePart::Ident(Ident::new(&rest[..end])));
            rest = &rest[end..];
        }
        rest = rest.strip_prefix('.').unwrap_or(rest);
    }
    parts
}

impl Ident {
    /// Creates an identifier with no location.
    pub fn new(value: impl Into<String>) -> Self {
        Ident {
            value: value.into(),
            span: None,
        }
    }
}

impl Constant {
    /// Creates a literal with no location.
    pub fn new(kind: ConstantKind) -> Self {
        Constant { kind, span: None }
    }
}

impl ConstantKind {
    /// Creates an integer literal from a signed value.
    pub fn int(value: i64) -> Self {
        ConstantKind::Int {
            negative: value < 0,
            value: value.unsigned_abs(),
        }
    }

    /// Creates a string literal.
    pub fn string(value: impl Into<String>) -> Self {
        ConstantKind::String(value.into())
    }

    /// Creates an identifier literal.
    pub fn ident(value: impl Into<String>) -> Self {
        ConstantKind::Ident(value.into())
    }

    /// Creates a message literal from `(field, value)` pairs.
    pub fn message<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, ConstantKind)>,
        S: Into<String>,
    {
        ConstantKind::Message(
            fields
                .into_iter()
                .map(|(name, value)| FieldAssign {
                    name: Ident::new(name),
                    value: Constant::new(value),
                })
                .collect(),
        )
    }

    /// Returns the value of a boolean literal, also accepting the identifiers `true` and
    /// `false`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstantKind::Bool(value) => Some(*value),
            ConstantKind::Ident(ident) if ident == "true" => Some(true),
            ConstantKind::Ident(ident) if ident == "false" => Some(false),
            _ => None,
        }
    }
}

impl fmt::Display for ConstantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantKind::Bool(value) => value.fmt(f),
            ConstantKind::String(value) => write!(f, "{:?}", value),
            ConstantKind::Int { negative, value } => {
                if *negative {
                    f.write_str("-")?;
                }
                value.fmt(f)
            }
            ConstantKind::Float(value) => value.fmt(f),
            ConstantKind::Ident(value) => f.write_str(value),
            ConstantKind::Message(_) | ConstantKind::Aggregate(_) => f.write_str("{ ... }"),
        }
    }
}
