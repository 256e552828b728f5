//! Semantic checks over a loaded file.

use std::{collections::BTreeSet, sync::Arc};

use miette::{Diagnostic as MietteDiagnostic, SourceSpan};
use thiserror::Error;

use crate::{
    ast::{self, Span},
    diagnostic::{Diagnostic, Diagnostics},
    files::{self, FileId},
    imports, Analyzer,
};

mod names;
mod numbers;
mod resolve;
mod rules;
#[cfg(test)]
mod tests;
mod value;

pub use self::numbers::{Interval, NumberSpace, SpaceKind};

pub(crate) use self::{
    names::FileScope,
    numbers::{collect as collect_numbers, key as number_key, NumberCheck, NumberKey},
    resolve::Want,
};

/// The largest valid message field number.
pub const MAX_MESSAGE_FIELD_NUMBER: i64 = 536_870_911;

/// The largest valid enum value number.
pub const MAX_ENUM_NUMBER: i64 = i32::MAX as i64;

#[derive(Error, Clone, Debug, MietteDiagnostic, PartialEq, Eq)]
pub(crate) enum CheckError {
    #[error("name '{name}' is defined twice")]
    DuplicateName {
        name: String,
        #[label("first defined here…")]
        first: Option<SourceSpan>,
        #[label("…and again here")]
        second: Option<SourceSpan>,
    },
    #[error("enum value '{name}' conflicts with '{first_name}' in the enclosing scope")]
    #[diagnostic(help(
        "enum values are siblings of their enum type, so they must be unique within the enclosing scope"
    ))]
    EnumValueConflict {
        name: String,
        first_name: String,
        #[label("first defined here…")]
        first: Option<SourceSpan>,
        #[label("…and again here")]
        second: Option<SourceSpan>,
    },
    #[error("'{name}' is already defined in file '{file}'")]
    DuplicateSymbol {
        name: String,
        file: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("name '{name}' is reserved")]
    ReservedName {
        name: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("camel-case name of field '{first_name}' conflicts with field '{second_name}'")]
    #[diagnostic(help("the JSON names '{first_json}' and '{second_json}' are not distinct"))]
    JsonNameConflict {
        first_name: String,
        first_json: String,
        #[label("field defined here…")]
        first: Option<SourceSpan>,
        second_name: String,
        second_json: String,
        #[label("…conflicts with field here")]
        second: Option<SourceSpan>,
    },
    #[error("import '{name}' not found")]
    UnresolvedImport {
        name: String,
        #[label("imported here")]
        span: Option<SourceSpan>,
    },
    #[error("import '{name}' is listed twice")]
    DuplicateImport {
        name: String,
        #[label("first imported here…")]
        first: Option<SourceSpan>,
        #[label("…and again here")]
        second: Option<SourceSpan>,
    },
    #[error("import cycle detected: {cycle}")]
    ImportCycle {
        cycle: String,
        #[label("imported here")]
        span: Option<SourceSpan>,
    },
    #[error("the type name '{name}' was not found")]
    UnresolvedType {
        name: String,
        #[label("used here")]
        span: Option<SourceSpan>,
    },
    #[error("{kind} type '{name}' is not {expected}")]
    InvalidTypeKind {
        kind: &'static str,
        name: String,
        expected: &'static str,
        #[label("used here")]
        span: Option<SourceSpan>,
    },
    #[error("'{name}' is not a valid map key type")]
    #[diagnostic(help("map keys must be integral, bool or string types"))]
    InvalidMapKey {
        name: String,
        #[label("used here")]
        span: Option<SourceSpan>,
    },
    #[error("enum '{name}' must contain at least one value")]
    EmptyEnum {
        name: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("{kind} number {number} is already used by '{first_name}'")]
    DuplicateNumber {
        kind: &'static str,
        number: i64,
        first_name: String,
        #[label("first used here…")]
        first: Option<SourceSpan>,
        #[label("…and used again here")]
        second: Option<SourceSpan>,
    },
    #[error("{kind} '{name}' uses reserved number {number}")]
    ReservedNumber {
        kind: &'static str,
        name: String,
        number: i64,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("reserved range {second_range} overlaps with reserved range {first_range}")]
    OverlappingReservedRange {
        first_range: String,
        #[label("first reserved here…")]
        first: Option<SourceSpan>,
        second_range: String,
        #[label("…overlaps with range here")]
        second: Option<SourceSpan>,
    },
    #[error("field '{name}' uses number {number}, which is in an extension range")]
    NumberInExtensionRange {
        name: String,
        number: i64,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("{second_kind} range {second_range} overlaps with {first_kind} range {first_range}")]
    OverlappingExtensionRange {
        first_kind: &'static str,
        first_range: String,
        #[label("first declared here…")]
        first: Option<SourceSpan>,
        second_kind: &'static str,
        second_range: String,
        #[label("…overlaps with range here")]
        second: Option<SourceSpan>,
    },
    #[error("{kind} number {number} is out of range")]
    #[diagnostic(help("{kind} numbers must be between {min} and {max}"))]
    InvalidNumber {
        kind: &'static str,
        number: String,
        min: i64,
        max: i64,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("field numbers between 19000 and 19999 are reserved for the protobuf implementation")]
    ImplementationReservedNumber {
        number: i64,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("range end number must be greater than or equal to the start number")]
    InvalidRange {
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("message type '{message_name}' does not declare '{number}' as an extension number")]
    ExtensionNumberNotDeclared {
        number: i64,
        message_name: String,
        #[label("used here")]
        span: Option<SourceSpan>,
    },
    #[error("unexpected {what} with {bounds} bounds")]
    UnexpectedShape {
        what: &'static str,
        bounds: usize,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("unknown option '{name}' for '{namespace}'")]
    UnknownOption {
        name: String,
        namespace: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("extension option '{name}' was not found")]
    UnresolvedOption {
        name: String,
        #[label("used here")]
        span: Option<SourceSpan>,
    },
    #[error("cannot set field for scalar type")]
    OptionScalarFieldAccess {
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("field '{field}' requires {expected}, but found '{actual}'")]
    ValueTypeMismatch {
        field: String,
        expected: String,
        actual: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("value for field '{field}' is out of range for type '{ty}'")]
    #[diagnostic(help("the value must be between {min} and {max} inclusive"))]
    ValueOutOfRange {
        field: String,
        ty: &'static str,
        min: String,
        max: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("'{value_name}' is not a valid value for enum '{enum_name}'")]
    UnknownEnumValue {
        value_name: String,
        enum_name: String,
        #[label("defined here")]
        span: Option<SourceSpan>,
    },
    #[error("field '{name}' not found in message '{message}'")]
    UnknownFieldName {
        name: String,
        message: String,
        #[label("used here")]
        span: Option<SourceSpan>,
    },
    #[error("resource name '{value}' not found")]
    UnresolvedResourceName {
        value: String,
        #[label("used here")]
        span: Option<SourceSpan>,
    },
}

impl CheckError {
    /// The stable rule identifier of this finding.
    pub fn rule(&self) -> &'static str {
        match self {
            CheckError::DuplicateName { .. } => "duplicate-name",
            CheckError::EnumValueConflict { .. } => "enum-value-conflict",
            CheckError::DuplicateSymbol { .. } => "duplicate-symbol",
            CheckError::ReservedName { .. } => "reserved-name",
            CheckError::JsonNameConflict { .. } => "json-name-conflict",
            CheckError::UnresolvedImport { .. } => "unresolved-import",
            CheckError::DuplicateImport { .. } => "duplicate-import",
            CheckError::ImportCycle { .. } => "import-cycle",
            CheckError::UnresolvedType { .. } => "unresolved-type",
            CheckError::InvalidTypeKind { .. } => "invalid-type-kind",
            CheckError::InvalidMapKey { .. } => "invalid-map-key",
            CheckError::EmptyEnum { .. } => "empty-enum",
            CheckError::DuplicateNumber { .. } => "duplicate-number",
            CheckError::ReservedNumber { .. } => "reserved-number",
            CheckError::OverlappingReservedRange { .. } => "overlapping-reserved-range",
            CheckError::NumberInExtensionRange { .. } => "number-in-extension-range",
            CheckError::OverlappingExtensionRange { .. } => "overlapping-extension-range",
            CheckError::InvalidNumber { .. } => "invalid-number",
            CheckError::ImplementationReservedNumber { .. } => "implementation-reserved-number",
            CheckError::InvalidRange { .. } => "invalid-range",
            CheckError::ExtensionNumberNotDeclared { .. } => "extension-number-not-declared",
            CheckError::UnexpectedShape { .. } => "unexpected-shape",
            CheckError::UnknownOption { .. } => "unknown-option",
            CheckError::UnresolvedOption { .. } => "unresolved-option",
            CheckError::OptionScalarFieldAccess { .. } => "unknown-option",
            CheckError::ValueTypeMismatch { .. } => "value-type-mismatch",
            CheckError::ValueOutOfRange { .. } => "value-out-of-range",
            CheckError::UnknownEnumValue { .. } => "unknown-enum-value",
            CheckError::UnknownFieldName { .. } => "unknown-field-name",
            CheckError::UnresolvedResourceName { .. } => "unresolved-resource-name",
        }
    }
}

/// State shared by the checks of a single file.
pub(crate) struct Context<'a> {
    analyzer: &'a Analyzer,
    id: FileId,
    file: &'a files::File,
    visible: Arc<BTreeSet<FileId>>,
    errors: Vec<CheckError>,
}

/// Runs every check over a file. Returns `None` if the file is not loaded.
pub(crate) fn check_file(analyzer: &Analyzer, id: FileId) -> Option<Vec<Diagnostic>> {
    let file = analyzer.files.get(id)?.clone();
    let visible = analyzer.visible_files(id)?;
    tracing::debug!(file = file.ast.name(), "checking file");

    let mut cx = Context {
        analyzer,
        id,
        file: &file,
        visible,
        errors: file.scope.errors().to_vec(),
    };

    cx.errors
        .extend(imports::check_imports(&analyzer.files, id, &file.ast));
    cx.check_duplicate_symbols();
    if analyzer.json_names && file.ast.syntax() == ast::Syntax::Proto3 {
        cx.check_json_names();
    }
    cx.check_types();
    cx.check_numbers();
    cx.check_options();

    let mut diagnostics = Diagnostics::new(id);
    rules::evaluate(&cx, &mut diagnostics);
    diagnostics.extend(cx.errors);

    let mut diagnostics = diagnostics.into_vec();
    diagnostics.sort_by_key(|diagnostic| diagnostic.span().map(|span| span.start));
    Some(diagnostics)
}

impl<'a> Context<'a> {
    fn ast(&self) -> &'a ast::File {
        &self.file.ast
    }

    fn add_error(&mut self, err: CheckError) {
        self.errors.push(err);
    }
}

fn source_span(span: Option<Span>) -> Option<SourceSpan> {
    span.map(SourceSpan::from)
}
