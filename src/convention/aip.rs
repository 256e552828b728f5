use crate::{
    ast::{ConstantKind, DeclId, DeclKind, OptionAssign, OptionNamePart},
    check::Want,
    files::{DeclRef, FileId},
    Analyzer,
};

use super::{ConventionResolver, Resolution, ValueRef};

const RESOURCE_REFERENCE: &str = "google.api.resource_reference";
const RESOURCE: &str = "google.api.resource";
const RESOURCE_DEFINITION: &str = "google.api.resource_definition";

/// Resolves the resource type names used by `google.api.resource_reference` options.
///
/// A type name such as `library.googleapis.com/Book` resolves to the message in a visible file
/// whose `google.api.resource` option declares that type, or is accepted if a visible file
/// declares it with a file-level `google.api.resource_definition` option. The wildcard `*` is
/// always accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceNameResolver;

impl ResourceNameResolver {
    /// Creates a new [`ResourceNameResolver`].
    pub fn new() -> Self {
        ResourceNameResolver
    }
}

impl ConventionResolver for ResourceNameResolver {
    fn name(&self) -> &'static str {
        "aip-resource-name"
    }

    fn resolve(&self, analyzer: &Analyzer, value: &ValueRef<'_>) -> Option<Resolution> {
        if !value.is(RESOURCE_REFERENCE, &["type"])
            && !value.is(RESOURCE_REFERENCE, &["child_type"])
        {
            return None;
        }
        if value.value == "*" {
            return Some(Resolution::Defined);
        }

        let visible = analyzer.visible_files(value.file)?;
        for &id in visible.iter() {
            let Some(file) = analyzer.file(id) else {
                continue;
            };
            let declares = |scope: Option<DeclId>, option: &OptionAssign, name: &str| {
                resource_type(analyzer, id, scope, option, name) == Some(value.value)
            };

            if file
                .options()
                .iter()
                .any(|option| declares(None, option, RESOURCE_DEFINITION))
            {
                return Some(Resolution::Defined);
            }

            let message = file.walk().find(|&decl| {
                let message = file.decl(decl);
                matches!(message.kind, DeclKind::Message)
                    && message
                        .options
                        .iter()
                        .any(|option| declares(Some(decl), option, RESOURCE))
            });
            if let Some(decl) = message {
                return Some(Resolution::Decl(DeclRef { file: id, decl }));
            }
        }

        Some(Resolution::Missing)
    }
}

/// Gets the `type` field set by an option whose extension resolves to `name`, whether it is
/// written as `(name).type = "..."` or `(name) = { type: "..." }`.
///
/// The extension is looked up from `scope` in `file`. An unresolved extension is compared as
/// written.
fn resource_type<'a>(
    analyzer: &Analyzer,
    file: FileId,
    scope: Option<DeclId>,
    option: &'a OptionAssign,
    name: &str,
) -> Option<&'a str> {
    let (OptionNamePart::Extension(extension), rest) = option.name.split_first()? else {
        return None;
    };
    let full_name = match analyzer.lookup(file, scope, extension, Want::Extension) {
        Some(field) => analyzer.full_name(field),
        None => extension.name.to_string(),
    };
    if full_name != name {
        return None;
    }

    match (rest, &option.value.kind) {
        ([OptionNamePart::Ident(field)], ConstantKind::String(ty)) if field.value == "type" => {
            Some(ty)
        }
        ([], ConstantKind::Message(fields)) => fields.iter().find_map(|assign| {
            match &assign.value.kind {
                ConstantKind::String(ty) if assign.name.value == "type" => Some(ty.as_str()),
                _ => None,
            }
        }),
        _ => None,
    }
}
