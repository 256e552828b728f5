use super::{source_span, CheckError, Context};
use crate::{
    ast::{self, DeclId, DeclKind, FieldType, TypeRef},
    files::{DeclRef, FileId},
    Analyzer,
};

/// What kind of declaration a name lookup is looking for.
///
/// This only affects which matches of the first segment of a single-segment name are
/// accepted; a name that does not match anything acceptable keeps searching in the enclosing
/// scopes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Want {
    /// A message, enum or group.
    Type,
    /// A field declared in an `extend` block.
    Extension,
    /// Any declaration.
    Any,
}

impl Want {
    fn accepts(self, file: &ast::File, id: DeclId) -> bool {
        match self {
            Want::Type => file.decl(id).kind.is_type(),
            Want::Extension => {
                matches!(file.decl(id).kind, DeclKind::Field(_) | DeclKind::Group(_))
                    && file
                        .parent(id)
                        .map_or(false, |parent| {
                            matches!(file.decl(parent).kind, DeclKind::Extend(_))
                        })
            }
            Want::Any => true,
        }
    }
}

impl Analyzer {
    /// Resolves `name` as written in `scope` of `file`.
    ///
    /// Relative names are first looked up in the enclosing scopes of the file, innermost first.
    /// At each level, if the first segment names an acceptable declaration, the remaining
    /// segments are resolved inside it and the lookup commits to the result. Failing that, the
    /// name is tried relative to each prefix of the file's package, longest first, against the
    /// full names of every visible file. Absolute names only take the last step, with the empty
    /// prefix.
    pub(crate) fn lookup(
        &self,
        file: FileId,
        scope: Option<DeclId>,
        name: &TypeRef,
        want: Want,
    ) -> Option<DeclRef> {
        let entry = self.files.get(file)?;
        let parts = name.name.parts();
        let (first, rest) = parts.split_first()?;
        tracing::trace!(file = entry.ast.name(), name = %name, ?want, "resolving name");

        if !name.absolute {
            let mut current = scope;
            loop {
                if let Some(candidate) = entry.scope.table(current).get(first) {
                    let acceptable = if rest.is_empty() {
                        want.accepts(&entry.ast, candidate)
                    } else {
                        entry.ast.decl(candidate).kind.is_scope()
                    };
                    if acceptable {
                        let mut found = candidate;
                        for part in rest {
                            found = entry.scope.table(Some(found)).get(part)?;
                        }
                        return Some(DeclRef { file, decl: found });
                    }
                }
                match current {
                    Some(id) => current = entry.ast.parent(id),
                    None => break,
                }
            }
        }

        let visible = self.visible_files(file)?;
        let package = entry.ast.package();
        let prefixes: Vec<&[String]> = if name.absolute {
            vec![&parts[..0]]
        } else {
            package.prefixes().collect()
        };

        for prefix in prefixes {
            let head = join(prefix, &parts[..1]);
            if rest.is_empty() {
                let found =
                    self.find_symbol(visible.iter(), &head, |file, id| want.accepts(file, id));
                if found.is_some() {
                    return found;
                }
            } else {
                let is_scope = visible.iter().filter_map(|&id| self.files.get(id)).any(|other| {
                    other.scope.is_package(&head)
                        || other
                            .scope
                            .symbol(&head)
                            .map_or(false, |id| other.ast.decl(id).kind.is_scope())
                });
                if is_scope {
                    return self.find_symbol(visible.iter(), &join(prefix, parts), |_, _| true);
                }
            }
        }

        None
    }

    /// Resolves a type reference, falling back to a declaration of any kind so that callers
    /// can tell a missing type from a name that refers to something else.
    pub(crate) fn resolve_type(
        &self,
        file: FileId,
        scope: Option<DeclId>,
        name: &TypeRef,
    ) -> Option<DeclRef> {
        self.lookup(file, scope, name, Want::Type)
            .or_else(|| self.lookup(file, scope, name, Want::Any))
    }

    fn find_symbol<'a>(
        &self,
        visible: impl IntoIterator<Item = &'a FileId>,
        full_name: &str,
        accept: impl Fn(&ast::File, DeclId) -> bool,
    ) -> Option<DeclRef> {
        visible.into_iter().find_map(|&file| {
            let entry = self.files.get(file)?;
            let decl = entry.scope.symbol(full_name)?;
            accept(&entry.ast, decl).then_some(DeclRef { file, decl })
        })
    }

    pub(crate) fn decl(&self, decl: DeclRef) -> Option<&ast::Decl> {
        self.files.get(decl.file)?.ast.get(decl.decl)
    }

    pub(crate) fn full_name(&self, decl: DeclRef) -> String {
        self.files
            .get(decl.file)
            .map(|file| file.ast.full_name(decl.decl).to_string())
            .unwrap_or_default()
    }
}

fn join(prefix: &[String], parts: &[String]) -> String {
    prefix
        .iter()
        .chain(parts)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(".")
}

impl<'a> Context<'a> {
    /// Checks that field types, method types and extendees resolve to the right kind of
    /// declaration, and that every enum has at least one value.
    pub(super) fn check_types(&mut self) {
        let file = self.ast();
        for id in file.walk() {
            let decl = file.decl(id);
            match &decl.kind {
                DeclKind::Field(field) => self.check_field_type(id, &field.ty, false),
                DeclKind::Method(method) => {
                    let scope = file.parent(id);
                    self.check_message_type(scope, &method.input, "method input");
                    self.check_message_type(scope, &method.output, "method output");
                }
                DeclKind::Extend(extend) => {
                    self.check_message_type(file.parent(id), &extend.extendee, "extendee");
                }
                DeclKind::Enum => {
                    let has_values = decl
                        .children
                        .iter()
                        .any(|&child| matches!(file.decl(child).kind, DeclKind::EnumValue(_)));
                    if !has_values {
                        self.add_error(CheckError::EmptyEnum {
                            name: decl.name().unwrap_or_default().to_owned(),
                            span: source_span(decl.name_span()),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn check_field_type(&mut self, id: DeclId, ty: &FieldType, map_key: bool) {
        let file = self.ast();
        match ty {
            FieldType::Scalar(scalar) => {
                if map_key && !scalar.is_valid_map_key() {
                    self.add_error(CheckError::InvalidMapKey {
                        name: scalar.as_str().to_owned(),
                        span: source_span(file.decl(id).span.clone()),
                    });
                }
            }
            FieldType::Named(name) => {
                let span = source_span(name.span.clone().or_else(|| file.decl(id).span.clone()));
                match self.analyzer.resolve_type(self.id, file.parent(id), name) {
                    None => self.add_error(CheckError::UnresolvedType {
                        name: name.to_string(),
                        span,
                    }),
                    Some(_) if map_key => self.add_error(CheckError::InvalidMapKey {
                        name: name.to_string(),
                        span,
                    }),
                    Some(target) => {
                        let is_type = self
                            .analyzer
                            .decl(target)
                            .map_or(false, |decl| decl.kind.is_type());
                        if !is_type {
                            self.add_error(CheckError::InvalidTypeKind {
                                kind: "field",
                                name: name.to_string(),
                                expected: "a message or enum",
                                span,
                            });
                        }
                    }
                }
            }
            FieldType::Map { key, value } => {
                self.check_field_type(id, key, true);
                self.check_field_type(id, value, false);
            }
        }
    }

    fn check_message_type(&mut self, scope: Option<DeclId>, name: &TypeRef, kind: &'static str) {
        let span = source_span(name.span.clone());
        match self.analyzer.resolve_type(self.id, scope, name) {
            None => self.add_error(CheckError::UnresolvedType {
                name: name.to_string(),
                span,
            }),
            Some(target) => {
                let is_message = self
                    .analyzer
                    .decl(target)
                    .map_or(false, |decl| decl.kind.is_message());
                if !is_message {
                    self.add_error(CheckError::InvalidTypeKind {
                        kind,
                        name: name.to_string(),
                        expected: "a message",
                        span,
                    });
                }
            }
        }
    }
}
