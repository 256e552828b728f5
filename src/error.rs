use std::{fmt, io, path::PathBuf};

use miette::Diagnostic;
use prost::DecodeError;
use thiserror::Error;

use crate::files::FileId;

/// An error that can occur when loading files into, or querying, an
/// [`Analyzer`](crate::Analyzer).
///
/// Problems with the schema itself are never reported through this type; they are returned as
/// [`Diagnostic`](crate::Diagnostic)s by validation.
#[derive(Diagnostic, Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct Error {
    kind: Box<ErrorKind>,
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum ErrorKind {
    #[error("file '{name}' not found")]
    FileNotFound { name: String },
    #[error("file {id} is not loaded")]
    UnknownFile { id: FileId },
    #[error("failed to decode file descriptor set")]
    Decode {
        #[source]
        err: DecodeError,
    },
    #[error("error opening file '{path}'")]
    OpenFile {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Creates an instance of [`struct@Error`] with an arbitrary payload.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::from_kind(ErrorKind::Custom(error.into()))
    }

    /// Creates an instance of [`struct@Error`] indicating that a file could not be found.
    pub fn file_not_found(name: &str) -> Self {
        Error::from_kind(ErrorKind::FileNotFound {
            name: name.to_owned(),
        })
    }

    /// Creates an instance of [`struct@Error`] for an I/O failure while reading `path`.
    pub fn open_file(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Error::from_kind(ErrorKind::OpenFile {
            path: path.into(),
            err,
        })
    }

    pub(crate) fn unknown_file(id: FileId) -> Self {
        Error::from_kind(ErrorKind::UnknownFile { id })
    }

    pub(crate) fn decode(err: DecodeError) -> Self {
        Error::from_kind(ErrorKind::Decode { err })
    }

    pub(crate) fn from_kind(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    /// Returns true if this error refers to a file that is not loaded.
    pub fn is_file_not_found(&self) -> bool {
        matches!(
            &*self.kind,
            ErrorKind::FileNotFound { .. } | ErrorKind::UnknownFile { .. }
        )
    }

    /// Returns true if this error was caused by an undecodable descriptor set.
    pub fn is_decode(&self) -> bool {
        matches!(&*self.kind, ErrorKind::Decode { .. })
    }

    /// Returns true if this error was caused by an I/O failure.
    pub fn is_io(&self) -> bool {
        matches!(&*self.kind, ErrorKind::OpenFile { .. })
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            ErrorKind::FileNotFound { .. } | ErrorKind::UnknownFile { .. } => {
                write!(f, "{}", self)
            }
            ErrorKind::Decode { err } => write!(f, "{}: {}", self, err),
            ErrorKind::OpenFile { err, .. } => write!(f, "{}: {}", self, err),
            ErrorKind::Custom(err) => err.fmt(f),
        }
    }
}
