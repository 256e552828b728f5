use super::{source_span, CheckError, Context, Want};
use crate::{
    ast::{
        Constant, ConstantKind, DeclId, DeclKind, FieldType, OptionAssign, OptionNamePart,
        QualifiedName, ScalarType, Span, TypeRef,
    },
    convention::{Resolution, ValueRef},
    files::DeclRef,
};

const FILE_OPTIONS: &str = "google.protobuf.FileOptions";

/// What a field accepts as a value.
#[derive(Debug, Copy, Clone)]
enum Target {
    Scalar(ScalarType),
    Enum(DeclRef),
    Message(DeclRef),
    Map,
}

fn options_message(kind: &DeclKind) -> Option<&'static str> {
    match kind {
        DeclKind::Message => Some("google.protobuf.MessageOptions"),
        DeclKind::Field(_) | DeclKind::Group(_) => Some("google.protobuf.FieldOptions"),
        DeclKind::Oneof => Some("google.protobuf.OneofOptions"),
        DeclKind::Enum => Some("google.protobuf.EnumOptions"),
        DeclKind::EnumValue(_) => Some("google.protobuf.EnumValueOptions"),
        DeclKind::Service => Some("google.protobuf.ServiceOptions"),
        DeclKind::Method(_) => Some("google.protobuf.MethodOptions"),
        DeclKind::ExtensionRange(_) => Some("google.protobuf.ExtensionRangeOptions"),
        DeclKind::Extend(_) | DeclKind::ReservedRange(_) | DeclKind::ReservedName => None,
    }
}

fn integer_range(ty: ScalarType) -> Option<(i128, i128)> {
    match ty {
        ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
            Some((i32::MIN.into(), i32::MAX.into()))
        }
        ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
            Some((i64::MIN.into(), i64::MAX.into()))
        }
        ScalarType::Uint32 | ScalarType::Fixed32 => Some((0, u32::MAX.into())),
        ScalarType::Uint64 | ScalarType::Fixed64 => Some((0, u64::MAX.into())),
        _ => None,
    }
}

impl<'a> Context<'a> {
    /// Checks option names against the options messages and option values against the types
    /// of the fields they set.
    pub(super) fn check_options(&mut self) {
        let file = self.ast();
        for option in file.options() {
            self.check_option(None, FILE_OPTIONS, option);
        }

        for id in file.walk() {
            let decl = file.decl(id);
            let Some(namespace) = options_message(&decl.kind) else {
                continue;
            };
            let is_field = matches!(decl.kind, DeclKind::Field(_) | DeclKind::Group(_));
            for option in &decl.options {
                if is_field && self.check_field_pseudo_option(id, option) {
                    continue;
                }
                self.check_option(Some(id), namespace, option);
            }
        }
    }

    /// Handles `default` and `json_name`, which are set like options but are not fields of
    /// `FieldOptions`. Returns `false` for any other option.
    fn check_field_pseudo_option(&mut self, id: DeclId, option: &OptionAssign) -> bool {
        if option.is_named("default") {
            let field = DeclRef {
                file: self.id,
                decl: id,
            };
            self.check_value(field, &option.value, option.span());
            true
        } else if option.is_named("json_name") {
            if !matches!(option.value.kind, ConstantKind::String(_)) {
                let field = DeclRef {
                    file: self.id,
                    decl: id,
                };
                self.value_mismatch(field, "a string", &option.value, option.span());
            }
            true
        } else {
            false
        }
    }

    fn check_option(&mut self, scope: Option<DeclId>, namespace: &str, option: &OptionAssign) {
        let Some((first, rest)) = option.name.split_first() else {
            return;
        };

        let root = self.resolve_option_root(scope, namespace, first, option);
        let root_name = match (first, root) {
            (OptionNamePart::Extension(_), Some(field)) => {
                QualifiedName::parse(&self.analyzer.full_name(field))
            }
            (OptionNamePart::Extension(ty), None) => ty.name.clone(),
            (OptionNamePart::Ident(ident), _) => QualifiedName::new([ident.value.as_str()]),
        };

        let mut target = root;
        let mut path = Vec::new();
        for part in rest {
            target = target.and_then(|field| self.resolve_option_part(scope, field, part, option));
            path.push(match part {
                OptionNamePart::Ident(ident) => ident.value.clone(),
                OptionNamePart::Extension(ty) => format!("({})", ty),
            });
        }

        if let Some(field) = target {
            self.check_value(field, &option.value, option.span());
        }
        self.check_conventions(scope, &root_name, &mut path, &option.value, option.span());
    }

    fn resolve_option_root(
        &mut self,
        scope: Option<DeclId>,
        namespace: &str,
        part: &OptionNamePart,
        option: &OptionAssign,
    ) -> Option<DeclRef> {
        match part {
            OptionNamePart::Ident(ident) => {
                // Without descriptor.proto there is nothing to check plain names against.
                let options = TypeRef::parse(&format!(".{}", namespace));
                let message = self.analyzer.lookup(self.id, None, &options, Want::Type)?;
                let field = self.member_field(message, &ident.value);
                if field.is_none() {
                    self.add_error(CheckError::UnknownOption {
                        name: ident.value.clone(),
                        namespace: namespace.to_owned(),
                        span: source_span(ident.span.clone().or_else(|| option.span())),
                    });
                }
                field
            }
            OptionNamePart::Extension(ty) => self.resolve_extension(scope, ty, option),
        }
    }

    fn resolve_option_part(
        &mut self,
        scope: Option<DeclId>,
        field: DeclRef,
        part: &OptionNamePart,
        option: &OptionAssign,
    ) -> Option<DeclRef> {
        let message = match self.field_target(field)? {
            Target::Message(message) => message,
            Target::Map => return None,
            Target::Scalar(_) | Target::Enum(_) => {
                self.add_error(CheckError::OptionScalarFieldAccess {
                    span: source_span(option.span()),
                });
                return None;
            }
        };

        match part {
            OptionNamePart::Ident(ident) => {
                let member = self.member_field(message, &ident.value);
                if member.is_none() {
                    self.add_error(CheckError::UnknownOption {
                        name: ident.value.clone(),
                        namespace: self.analyzer.full_name(message),
                        span: source_span(ident.span.clone().or_else(|| option.span())),
                    });
                }
                member
            }
            OptionNamePart::Extension(ty) => self.resolve_extension(scope, ty, option),
        }
    }

    fn resolve_extension(
        &mut self,
        scope: Option<DeclId>,
        ty: &TypeRef,
        option: &OptionAssign,
    ) -> Option<DeclRef> {
        let field = self.analyzer.lookup(self.id, scope, ty, Want::Extension);
        if field.is_none() {
            self.add_error(CheckError::UnresolvedOption {
                name: ty.to_string(),
                span: source_span(ty.span.clone().or_else(|| option.span())),
            });
        }
        field
    }

    /// Finds a field or group named `name` directly inside `message`.
    fn member_field(&self, message: DeclRef, name: &str) -> Option<DeclRef> {
        let file = self.analyzer.files.get(message.file)?;
        let id = file.scope.table(Some(message.decl)).get(name)?;
        matches!(file.ast.decl(id).kind, DeclKind::Field(_) | DeclKind::Group(_)).then_some(
            DeclRef {
                file: message.file,
                decl: id,
            },
        )
    }

    /// Works out what values `field` accepts. Returns `None` if its type does not resolve,
    /// which is reported where the field is declared.
    fn field_target(&self, field: DeclRef) -> Option<Target> {
        let file = self.analyzer.files.get(field.file)?;
        match &file.ast.get(field.decl)?.kind {
            DeclKind::Group(_) => Some(Target::Message(field)),
            DeclKind::Field(decl) => match &decl.ty {
                FieldType::Scalar(scalar) => Some(Target::Scalar(*scalar)),
                FieldType::Map { .. } => Some(Target::Map),
                FieldType::Named(ty) => {
                    let scope = file.ast.parent(field.decl);
                    let target = self.analyzer.lookup(field.file, scope, ty, Want::Type)?;
                    match self.analyzer.decl(target)?.kind {
                        DeclKind::Enum => Some(Target::Enum(target)),
                        DeclKind::Message | DeclKind::Group(_) => Some(Target::Message(target)),
                        _ => None,
                    }
                }
            },
            _ => None,
        }
    }

    fn check_value(&mut self, field: DeclRef, value: &Constant, fallback: Option<Span>) {
        let Some(target) = self.field_target(field) else {
            return;
        };
        let span = value.span.clone().or(fallback);

        match target {
            Target::Scalar(ScalarType::Bool) => {
                if value.kind.as_bool().is_none() {
                    self.value_mismatch(field, "a bool", value, span);
                }
            }
            Target::Scalar(ScalarType::String | ScalarType::Bytes) => {
                if !matches!(value.kind, ConstantKind::String(_)) {
                    self.value_mismatch(field, "a string", value, span);
                }
            }
            Target::Scalar(ScalarType::Double | ScalarType::Float) => match &value.kind {
                ConstantKind::Int { .. } | ConstantKind::Float(_) => {}
                ConstantKind::Ident(ident) if ident == "inf" || ident == "nan" => {}
                _ => self.value_mismatch(field, "a number", value, span),
            },
            Target::Scalar(scalar) => match value.kind {
                ConstantKind::Int {
                    negative,
                    value: magnitude,
                } => {
                    let Some((min, max)) = integer_range(scalar) else {
                        return;
                    };
                    let number = if negative {
                        -i128::from(magnitude)
                    } else {
                        i128::from(magnitude)
                    };
                    if number < min || number > max {
                        self.add_error(CheckError::ValueOutOfRange {
                            field: self.analyzer.full_name(field),
                            ty: scalar.as_str(),
                            min: min.to_string(),
                            max: max.to_string(),
                            span: source_span(span),
                        });
                    }
                }
                _ => self.value_mismatch(field, "an integer", value, span),
            },
            Target::Enum(enumeration) => match &value.kind {
                ConstantKind::Ident(name) => {
                    if !self.is_enum_value(enumeration, name) {
                        self.add_error(CheckError::UnknownEnumValue {
                            value_name: name.clone(),
                            enum_name: self.analyzer.full_name(enumeration),
                            span: source_span(span),
                        });
                    }
                }
                _ => {
                    let expected =
                        format!("a value of enum '{}'", self.analyzer.full_name(enumeration));
                    self.value_mismatch(field, &expected, value, span);
                }
            },
            Target::Message(message) => match &value.kind {
                ConstantKind::Message(fields) => {
                    for assign in fields {
                        // extension fields, written as `[foo.bar]: ...`
                        if assign.name.value.starts_with('[') {
                            continue;
                        }
                        match self.member_field(message, &assign.name.value) {
                            Some(member) => {
                                let fallback = assign.name.span.clone().or_else(|| span.clone());
                                self.check_value(member, &assign.value, fallback);
                            }
                            None => self.add_error(CheckError::UnknownFieldName {
                                name: assign.name.value.clone(),
                                message: self.analyzer.full_name(message),
                                span: source_span(
                                    assign.name.span.clone().or_else(|| span.clone()),
                                ),
                            }),
                        }
                    }
                }
                ConstantKind::Aggregate(_) => {}
                _ => self.value_mismatch(field, "a message literal", value, span),
            },
            Target::Map => {}
        }
    }

    fn is_enum_value(&self, enumeration: DeclRef, name: &str) -> bool {
        let Some(file) = self.analyzer.files.get(enumeration.file) else {
            return false;
        };
        file.scope
            .table(Some(enumeration.decl))
            .get(name)
            .map_or(false, |id| matches!(file.ast.decl(id).kind, DeclKind::EnumValue(_)))
    }

    fn value_mismatch(
        &mut self,
        field: DeclRef,
        expected: &str,
        value: &Constant,
        span: Option<Span>,
    ) {
        self.add_error(CheckError::ValueTypeMismatch {
            field: self.analyzer.full_name(field),
            expected: expected.to_owned(),
            actual: value.kind.to_string(),
            span: source_span(span),
        });
    }

    /// Offers every string inside an option value to the registered convention resolvers.
    fn check_conventions(
        &mut self,
        scope: Option<DeclId>,
        option: &QualifiedName,
        path: &mut Vec<String>,
        value: &Constant,
        fallback: Option<Span>,
    ) {
        let span = value.span.clone().or(fallback);
        match &value.kind {
            ConstantKind::String(text) => {
                let value_ref = ValueRef {
                    file: self.id,
                    scope,
                    option,
                    path,
                    value: text,
                };
                if let Some(Resolution::Missing) = self.analyzer.resolve_convention(&value_ref) {
                    self.add_error(CheckError::UnresolvedResourceName {
                        value: text.clone(),
                        span: source_span(span),
                    });
                }
            }
            ConstantKind::Message(fields) => {
                for assign in fields {
                    path.push(assign.name.value.clone());
                    let fallback = assign.name.span.clone().or_else(|| span.clone());
                    self.check_conventions(scope, option, path, &assign.value, fallback);
                    path.pop();
                }
            }
            _ => {}
        }
    }
}
