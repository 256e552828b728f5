use std::{collections::BTreeSet, fmt, sync::Arc};

use bytes::Buf;
use parking_lot::RwLock;
use prost::Message;
use prost_types::FileDescriptorSet;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio_util::sync::CancellationToken;

use crate::{
    ast::{self, DeclId, DeclKind, QualifiedName, TypeRef},
    check::{self, NumberCheck, NumberKey, NumberSpace, Want},
    convention::{ConventionResolver, Resolution, ValueRef},
    diagnostic::{Diagnostic, Severity},
    error::Error,
    files::{DeclRef, FileId, FileMap},
    imports::ImportGraph,
};

#[cfg(test)]
mod tests;

/// Holds a set of parsed files and answers semantic queries about them.
///
/// Files are added with [`add_file`](Analyzer::add_file) and checked with
/// [`validate`](Analyzer::validate). Derived data such as name tables, visible file sets and
/// number spaces is computed lazily and cached until the files it depends on change.
///
/// # Examples
///
/// ```
/// # use protoscope::{Analyzer, ast::{FileBuilder, Syntax}};
/// let mut analyzer = Analyzer::new();
/// let id = analyzer.add_file(
///     FileBuilder::new("foo.proto")
///         .syntax(Syntax::Proto3)
///         .enumeration("Color", |e| {
///             e.value("RED", 1);
///         })
///         .build(),
/// );
///
/// let diagnostics = analyzer.validate(id).unwrap();
/// assert_eq!(diagnostics.len(), 1);
/// assert_eq!(diagnostics[0].rule(), "enum-zero-required");
/// ```
pub struct Analyzer {
    pub(crate) files: FileMap,
    imports: ImportGraph,
    numbers: RwLock<FxHashMap<(FileId, DeclId), CachedNumbers>>,
    pub(crate) resolvers: Vec<Box<dyn ConventionResolver>>,
    pub(crate) json_names: bool,
    disabled_rules: FxHashSet<String>,
    warnings_as_errors: bool,
}

#[derive(Debug)]
struct CachedNumbers {
    key: NumberKey,
    check: Arc<NumberCheck>,
}

/// A name to resolve with [`Analyzer::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// A message or enum type name, as written in `scope`.
    Type {
        /// The file containing the reference.
        file: FileId,
        /// The innermost declaration enclosing the reference, or `None` at the top level.
        scope: Option<DeclId>,
        /// The name.
        name: TypeRef,
    },
    /// An extension field name, as written inside the parentheses of an option name.
    Extension {
        /// The file containing the reference.
        file: FileId,
        /// The innermost declaration enclosing the reference, or `None` at the top level.
        scope: Option<DeclId>,
        /// The name.
        name: TypeRef,
    },
    /// A field of a message, by its simple name.
    Field {
        /// The message.
        message: DeclRef,
        /// The field name.
        name: String,
    },
    /// A value of an enum, by its simple name.
    EnumValue {
        /// The enum.
        enumeration: DeclRef,
        /// The value name.
        name: String,
    },
    /// A string option value, resolved through the registered [`ConventionResolver`]s.
    Value {
        /// The file containing the option.
        file: FileId,
        /// The declaration the option is attached to, or `None` for file options.
        scope: Option<DeclId>,
        /// The full name of the option.
        option: QualifiedName,
        /// The field names leading from the option to the value.
        path: Vec<String>,
        /// The string value.
        value: String,
    },
}

/// The result of [`Analyzer::validate_all`].
#[derive(Debug, Default)]
pub struct Validation {
    /// The diagnostics of each validated file, in file order.
    pub files: Vec<(FileId, Vec<Diagnostic>)>,
    /// Whether validation stopped early because the cancellation token was triggered. If
    /// set, `files` only contains the files that completed.
    pub cancelled: bool,
}

impl Analyzer {
    /// Creates a new [`Analyzer`] with no files and default options.
    pub fn new() -> Self {
        Analyzer {
            files: FileMap::default(),
            imports: ImportGraph::default(),
            numbers: RwLock::default(),
            resolvers: Vec::new(),
            json_names: true,
            disabled_rules: FxHashSet::default(),
            warnings_as_errors: false,
        }
    }

    /// Set whether fields of proto3 messages are checked for conflicting JSON names.
    ///
    /// Enabled by default.
    pub fn check_json_names(&mut self, yes: bool) -> &mut Self {
        self.json_names = yes;
        self
    }

    /// Suppress all diagnostics with the given rule identifier, such as `enum-zero-not-first`.
    pub fn disable_rule(&mut self, rule: impl Into<String>) -> &mut Self {
        self.disabled_rules.insert(rule.into());
        self
    }

    /// Set whether warnings are reported with [`Severity::Error`].
    pub fn warnings_as_errors(&mut self, yes: bool) -> &mut Self {
        self.warnings_as_errors = yes;
        self
    }

    /// Register a resolver for string values in options.
    ///
    /// Resolvers are tried in registration order, and the first one to claim a value decides
    /// its resolution.
    pub fn register_resolver<R>(&mut self, resolver: R) -> &mut Self
    where
        R: ConventionResolver + 'static,
    {
        tracing::debug!(resolver = resolver.name(), "registered convention resolver");
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Adds a file, replacing any file previously added with the same name.
    ///
    /// Cached data derived from the previous version of the file, or from any file that can
    /// see it through imports, is discarded.
    pub fn add_file(&mut self, file: ast::File) -> FileId {
        let name = file.name().to_owned();
        let (id, previous) = self.files.insert(Arc::new(file));

        let len = self.files[id].ast.len();
        self.numbers
            .get_mut()
            .retain(|&(file, decl), _| file != id || decl.index() < len);
        self.imports.invalidate(&self.files, &name);

        tracing::debug!(file = %name, %id, replaced = previous.is_some(), "added file");
        id
    }

    /// Decodes an encoded [`FileDescriptorSet`] and adds each of its files.
    ///
    /// # Errors
    ///
    /// Returns an error if `buf` is not a valid encoded [`FileDescriptorSet`].
    pub fn add_file_descriptor_set<B>(&mut self, buf: B) -> Result<Vec<FileId>, Error>
    where
        B: Buf,
    {
        let set = FileDescriptorSet::decode(buf).map_err(Error::decode)?;
        Ok(set
            .file
            .iter()
            .map(|file| self.add_file(ast::File::from_file_descriptor_proto(file)))
            .collect())
    }

    /// Removes the file with the given name.
    ///
    /// The id of the file stays reserved, and is reused if a file with the same name is added
    /// later.
    ///
    /// # Errors
    ///
    /// If no such file is loaded, [`Error::file_not_found`] is returned.
    pub fn remove_file(&mut self, name: &str) -> Result<FileId, Error> {
        let (id, _) = self
            .files
            .remove(name)
            .ok_or_else(|| Error::file_not_found(name))?;

        self.numbers.get_mut().retain(|&(file, _), _| file != id);
        self.imports.forget(id);
        self.imports.invalidate(&self.files, name);

        tracing::debug!(file = name, %id, "removed file");
        Ok(id)
    }

    /// Gets a loaded file.
    pub fn file(&self, id: FileId) -> Option<&ast::File> {
        self.files.get(id).map(|file| &*file.ast)
    }

    /// Gets the id of a loaded file by name.
    pub fn file_id(&self, name: &str) -> Option<FileId> {
        self.files.id(name)
    }

    /// Iterates over the loaded files, in the order they were first added.
    pub fn files(&self) -> impl Iterator<Item = (FileId, &ast::File)> {
        self.files.iter().map(|(id, file)| (id, &*file.ast))
    }

    /// The files whose declarations can be referenced from `file`: the file itself, its direct
    /// imports, and anything those re-export with `import public`.
    ///
    /// Returns `None` if `file` is not loaded.
    pub fn visible_files(&self, file: FileId) -> Option<Arc<BTreeSet<FileId>>> {
        self.imports.visible(&self.files, file)
    }

    /// Resolves a reference to the declaration it names.
    pub fn resolve(&self, reference: &Reference) -> Option<DeclRef> {
        match reference {
            Reference::Type { file, scope, name } => {
                self.check_scope(*file, *scope)?;
                self.lookup(*file, *scope, name, Want::Type)
            }
            Reference::Extension { file, scope, name } => {
                self.check_scope(*file, *scope)?;
                self.lookup(*file, *scope, name, Want::Extension)
            }
            Reference::Field { message, name } => self.member(*message, name, |kind| {
                matches!(kind, DeclKind::Field(_) | DeclKind::Group(_))
            }),
            Reference::EnumValue { enumeration, name } => {
                self.member(*enumeration, name, |kind| matches!(kind, DeclKind::EnumValue(_)))
            }
            Reference::Value {
                file,
                scope,
                option,
                path,
                value,
            } => {
                let value = ValueRef {
                    file: *file,
                    scope: *scope,
                    option,
                    path,
                    value,
                };
                match self.resolve_convention(&value)? {
                    Resolution::Decl(decl) => Some(decl),
                    Resolution::Defined | Resolution::Missing => None,
                }
            }
        }
    }

    fn check_scope(&self, file: FileId, scope: Option<DeclId>) -> Option<()> {
        let file = self.file(file)?;
        match scope {
            Some(scope) => file.get(scope).map(drop),
            None => Some(()),
        }
    }

    fn member(
        &self,
        container: DeclRef,
        name: &str,
        accept: impl Fn(&DeclKind) -> bool,
    ) -> Option<DeclRef> {
        let file = self.files.get(container.file)?;
        file.ast.get(container.decl)?;
        let decl = file.scope.table(Some(container.decl)).get(name)?;
        accept(&file.ast.decl(decl).kind).then_some(DeclRef {
            file: container.file,
            decl,
        })
    }

    /// The numbers used, reserved and set aside for extensions by a message, enum or extend
    /// block. Returns `None` for any other declaration.
    pub fn number_space(&self, container: DeclRef) -> Option<NumberSpace> {
        let check = self.number_check(container.file, container.decl)?;
        Some(NumberSpace::clone(&check.space))
    }

    pub(crate) fn number_check(&self, file: FileId, container: DeclId) -> Option<Arc<NumberCheck>> {
        let entry = self.files.get(file)?;
        entry.ast.get(container)?;

        let key = check::number_key(&entry.ast, container);
        if let Some(cached) = self.numbers.read().get(&(file, container)) {
            if cached.key == key {
                tracing::trace!(
                    file = entry.ast.name(),
                    container = container.index(),
                    "number space cache hit"
                );
                return Some(cached.check.clone());
            }
        }

        let check = Arc::new(check::collect_numbers(&entry.ast, container)?);
        self.numbers.write().insert(
            (file, container),
            CachedNumbers {
                key,
                check: check.clone(),
            },
        );
        Some(check)
    }

    /// Checks a file, returning every diagnostic found in it.
    ///
    /// Problems with the schema never cause an error: validation always completes and reports
    /// them as diagnostics. Calling this again without changing any files gives the same
    /// result.
    ///
    /// # Errors
    ///
    /// Returns an error if `file` is not loaded.
    pub fn validate(&self, file: FileId) -> Result<Vec<Diagnostic>, Error> {
        let diagnostics = check::check_file(self, file).ok_or_else(|| Error::unknown_file(file))?;
        Ok(self.configure(diagnostics))
    }

    /// Checks every loaded file in parallel.
    ///
    /// The token is checked before each file is started. Once it is cancelled, no further files
    /// are checked and the result is marked as cancelled.
    pub fn validate_all(&self, cancel: &CancellationToken) -> Validation {
        let ids: Vec<FileId> = self.files.iter().map(|(id, _)| id).collect();
        let files: Vec<(FileId, Vec<Diagnostic>)> = ids
            .par_iter()
            .filter_map(|&id| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some((id, self.validate(id).ok()?))
            })
            .collect();

        let cancelled = files.len() < ids.len();
        if cancelled {
            tracing::debug!(completed = files.len(), total = ids.len(), "validation cancelled");
        }
        Validation { files, cancelled }
    }

    fn configure(&self, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        diagnostics
            .into_iter()
            .filter(|diagnostic| !self.disabled_rules.contains(diagnostic.rule()))
            .map(|mut diagnostic| {
                if self.warnings_as_errors {
                    diagnostic.set_severity(Severity::Error);
                }
                diagnostic
            })
            .collect()
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::new()
    }
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("files", &self.files)
            .field("json_names", &self.json_names)
            .field("disabled_rules", &self.disabled_rules)
            .field("warnings_as_errors", &self.warnings_as_errors)
            .finish_non_exhaustive()
    }
}

impl Validation {
    /// Returns `true` if any file has an error-severity diagnostic.
    pub fn has_errors(&self) -> bool {
        self.files.iter().any(|(_, diagnostics)| {
            diagnostics
                .iter()
                .any(|diagnostic| diagnostic.severity() == Severity::Error)
        })
    }
}
