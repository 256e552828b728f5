//! Pluggable resolution of string values that name declarations by convention.
//!
//! Some option values refer to declarations without using protobuf's own name syntax, such as
//! the resource type names of [AIP-123](https://google.aip.dev/123). A [`ConventionResolver`]
//! registered with [`Analyzer::register_resolver`] is offered every string literal in every
//! option value, and can claim it.

mod aip;

pub use aip::ResourceNameResolver;

use crate::{
    ast::{DeclId, QualifiedName},
    files::{DeclRef, FileId},
    Analyzer,
};

/// A strategy for resolving string values in options.
pub trait ConventionResolver: Send + Sync {
    /// A short name for this resolver, used in logs.
    fn name(&self) -> &'static str;

    /// Resolves a string value.
    ///
    /// Returns `None` if this resolver does not apply to the value, in which case the next
    /// registered resolver is tried.
    fn resolve(&self, analyzer: &Analyzer, value: &ValueRef<'_>) -> Option<Resolution>;
}

impl<T> ConventionResolver for Box<T>
where
    T: ConventionResolver + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resolve(&self, analyzer: &Analyzer, value: &ValueRef<'_>) -> Option<Resolution> {
        (**self).resolve(analyzer, value)
    }
}

/// A string literal inside an option value.
#[derive(Debug, Clone, Copy)]
pub struct ValueRef<'a> {
    /// The file containing the option.
    pub file: FileId,
    /// The declaration the option is attached to, or `None` for file options.
    pub scope: Option<DeclId>,
    /// The full name of the option, such as `google.api.resource_reference`.
    pub option: &'a QualifiedName,
    /// The field names leading from the option to the string, such as `["type"]` for both
    /// `(google.api.resource_reference).type = "..."` and
    /// `(google.api.resource_reference) = { type: "..." }`.
    pub path: &'a [String],
    /// The string value.
    pub value: &'a str,
}

/// The outcome of resolving a [`ValueRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The value names this declaration.
    Decl(DeclRef),
    /// The value is valid but does not correspond to a single declaration.
    Defined,
    /// The value should name something, but nothing matches.
    Missing,
}

impl<'a> ValueRef<'a> {
    /// Returns `true` if the value is the field `path` of the option `option`.
    pub fn is(&self, option: &str, path: &[&str]) -> bool {
        self.option.to_string() == option
            && self.path.len() == path.len()
            && self.path.iter().zip(path).all(|(a, b)| a == b)
    }
}

impl Analyzer {
    pub(crate) fn resolve_convention(&self, value: &ValueRef<'_>) -> Option<Resolution> {
        self.resolvers.iter().find_map(|resolver| {
            let resolution = resolver.resolve(self, value)?;
            tracing::trace!(
                resolver = resolver.name(),
                value = value.value,
                ?resolution,
                "resolved convention value"
            );
            Some(resolution)
        })
    }
}
