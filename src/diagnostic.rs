use std::fmt;

use miette::{LabeledSpan, SourceSpan};
use thiserror::Error;

use crate::{ast::Span, check::CheckError, files::FileId};

/// How serious a [`Diagnostic`] is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// A likely mistake that does not make the schema invalid.
    Warning,
    /// The schema is invalid.
    Error,
}

/// A single finding produced by validation.
///
/// Diagnostics implement [`miette::Diagnostic`], with the rule id as the diagnostic code, so
/// they can be rendered by any miette report handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Diagnostic {
    file: FileId,
    rule: &'static str,
    severity: Severity,
    message: String,
    span: Option<Span>,
    labels: Vec<LabeledSpan>,
    help: Option<String>,
}

/// Collects the diagnostics of one file.
#[derive(Debug)]
pub(crate) struct Diagnostics {
    file: FileId,
    items: Vec<Diagnostic>,
}

impl Diagnostic {
    pub(crate) fn new(
        file: FileId,
        rule: &'static str,
        severity: Severity,
        message: String,
        span: Option<Span>,
    ) -> Self {
        let labels = span
            .iter()
            .map(|span| LabeledSpan::new_with_span(None, SourceSpan::from(span.clone())))
            .collect();
        Diagnostic {
            file,
            rule,
            severity,
            message,
            span,
            labels,
            help: None,
        }
    }

    /// Flattens a check finding. The last label of a finding marks the offending occurrence
    /// and becomes the primary span.
    pub(crate) fn from_check(file: FileId, err: CheckError) -> Self {
        use miette::Diagnostic as _;

        let labels: Vec<LabeledSpan> = err
            .labels()
            .map(Iterator::collect)
            .unwrap_or_default();
        let span = labels
            .last()
            .map(|label| label.offset()..label.offset() + label.len());
        let help = err.help().map(|help| help.to_string());
        Diagnostic {
            file,
            rule: err.rule(),
            severity: Severity::Error,
            message: err.to_string(),
            span,
            labels,
            help,
        }
    }

    /// The file the diagnostic was reported in.
    pub fn file(&self) -> FileId {
        self.file
    }

    /// The stable identifier of the rule that produced this diagnostic, such as
    /// `duplicate-number`.
    pub fn rule(&self) -> &'static str {
        self.rule
    }

    /// The severity, after any configured promotion of warnings.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The primary source range, if the file has locations.
    pub fn span(&self) -> Option<Span> {
        self.span.clone()
    }

    pub(crate) fn set_severity(&mut self, severity: Severity) {
        self.severity = severity;
    }
}

impl miette::Diagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.rule))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Warning => miette::Severity::Warning,
            Severity::Error => miette::Severity::Error,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|help| Box::new(help) as Box<dyn fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        if self.labels.is_empty() {
            None
        } else {
            Some(Box::new(self.labels.iter().cloned()))
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

impl Diagnostics {
    pub fn new(file: FileId) -> Self {
        Diagnostics {
            file,
            items: Vec::new(),
        }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, err: CheckError) {
        let diagnostic = Diagnostic::from_check(self.file, err);
        self.push(diagnostic);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = CheckError>) {
        for err in errors {
            self.error(err);
        }
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
