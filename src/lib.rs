//! Semantic analysis of protobuf schema files.
//!
//! Given a set of already-parsed files, an [`Analyzer`] resolves names across files and
//! imports, detects conflicting declarations, validates field and enum numbering, enforces the
//! rules specific to each language version, and type-checks option values. Every problem
//! found is reported as a [`Diagnostic`] with a stable rule identifier.
//!
//! Files are supplied as declaration trees, either built by a parser through
//! [`ast::FileBuilder`] or converted from compiled descriptors with
//! [`ast::File::from_file_descriptor_proto`].
//!
//! # Examples
//!
//! ```
//! use protoscope::{Analyzer, ast::{FileBuilder, NumberRange, Syntax}};
//!
//! let mut analyzer = Analyzer::new();
//! let id = analyzer.add_file(
//!     FileBuilder::new("foo.proto")
//!         .syntax(Syntax::Proto3)
//!         .message("Foo", |m| {
//!             m.field(None, "int32", "a", 1)
//!                 .field(None, "int32", "b", 2)
//!                 .field(None, "int32", "c", 2)
//!                 .field(None, "int32", "d", 5)
//!                 .reserved(NumberRange::single(5));
//!         })
//!         .build(),
//! );
//!
//! let rules: Vec<&str> = analyzer
//!     .validate(id)
//!     .unwrap()
//!     .iter()
//!     .map(|diagnostic| diagnostic.rule())
//!     .collect();
//! assert_eq!(rules, ["duplicate-number", "reserved-number"]);
//! ```
//!
//! ### Error messages
//!
//! [`Diagnostic`] implements [`miette::Diagnostic`], so findings can be rendered with any
//! `miette` report handler, with the rule identifier as the diagnostic code.
#![warn(missing_debug_implementations, missing_docs)]
#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/protoscope/0.1.0/")]

pub mod ast;
pub mod convention;

mod analyzer;
mod case;
mod check;
mod diagnostic;
mod error;
mod files;
mod imports;
mod inversion_list;

pub use prost_types;

pub use self::analyzer::{Analyzer, Reference, Validation};
pub use self::check::{
    Interval, NumberSpace, SpaceKind, MAX_ENUM_NUMBER, MAX_MESSAGE_FIELD_NUMBER,
};
pub use self::diagnostic::{Diagnostic, Severity};
pub use self::error::Error;
pub use self::files::{DeclRef, FileId};
