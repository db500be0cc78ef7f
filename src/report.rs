//! The outcome of one validation call.
//!
//! `well_formed == false` means the schema itself (tags, types) could not be
//! trusted; a host should treat that as its own fault. A well-formed report
//! with errors means the data violated the schema.
use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::descriptor::conform::MismatchKind;
use crate::descriptor::{Descriptor, ResolveError};
use crate::record::IntrospectError;
use crate::tag::DirectiveError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Input was not a record at all.
    Structural,
    /// A tag or declared type was invalid.
    Schema,
    /// A value did not have the resolved type.
    TypeMatch,
    /// A well-typed value broke a rule.
    Rule,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum Problem {
    #[error(transparent)]
    Structural(#[from] IntrospectError),
    #[error(transparent)]
    Directive(#[from] DirectiveError),
    #[error("{0}")]
    Resolve(#[from] ResolveError),
    #[error("cannot resolve declared type '{0}'")]
    UnknownDeclared(String),
    #[error("type '{0}' is recognized but not supported")]
    Unsupported(String),
    #[error("type mismatch: type in record is '{declared}' and in tag is '{tagged}'")]
    TagMismatch { declared: Descriptor, tagged: Descriptor },
    #[error("{rule}: {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("should be of type {expected} but got {actual}")]
    WrongType { expected: Descriptor, actual: Descriptor },
    #[error("expected an array of length {expected} but got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("map key should be of type {expected} but got {actual}")]
    WrongKeyType { expected: Descriptor, actual: Descriptor },

    #[error("is required")]
    Required,
    #[error("minLength: should have a minimum length of {min} but has {actual}")]
    TooShort { min: usize, actual: usize },
    #[error("minLength: rule can only be applied to type string but was applied to type {actual}")]
    MinLengthNotText { actual: String },
    #[error("{rule}: {message}")]
    Custom { rule: String, message: String },
}

/// Dotted path to a field, e.g. `address.city` or `tags[2]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationError {
    pub field: FieldPath,
    pub problem: Problem,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    well_formed: bool,
    #[serde(serialize_with = "as_messages")]
    errors: Vec<ValidationError>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Problem {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Structural(_) => Phase::Structural,
            Self::Directive(_)
            | Self::Resolve(_)
            | Self::UnknownDeclared(_)
            | Self::Unsupported(_)
            | Self::TagMismatch { .. }
            | Self::InvalidRule { .. } => Phase::Schema,
            Self::WrongType { .. } | Self::WrongLength { .. } | Self::WrongKeyType { .. } => {
                Phase::TypeMatch
            }
            Self::Required
            | Self::TooShort { .. }
            | Self::MinLengthNotText { .. }
            | Self::Custom { .. } => Phase::Rule,
        }
    }

    pub fn custom(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Custom { rule: rule.into(), message: message.into() }
    }
}

impl From<MismatchKind> for Problem {
    fn from(kind: MismatchKind) -> Self {
        match kind {
            MismatchKind::Type { expected, actual } => Self::WrongType { expected, actual },
            MismatchKind::Length { expected, actual } => Self::WrongLength { expected, actual },
            MismatchKind::KeyType { expected, actual } => Self::WrongKeyType { expected, actual },
        }
    }
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn join<I>(&self, tail: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut out = self.clone();
        out.0.extend(tail.into_iter().map(Into::into));
        out
    }

    /// Qualify with an enclosing field's name.
    pub fn prefix(&mut self, outer: &str) {
        self.0.insert(0, outer.to_string());
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 && !seg.starts_with('[') {
                f.write_str(".")?;
            }
            f.write_str(seg)?;
        }
        Ok(())
    }
}

impl ValidationError {
    pub fn new(field: FieldPath, problem: impl Into<Problem>) -> Self {
        Self { field, problem: problem.into() }
    }

    pub fn phase(&self) -> Phase {
        self.problem.phase()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_root() {
            write!(f, "{}", self.problem)
        } else {
            write!(f, "{}: {}", self.field, self.problem)
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.problem)
    }
}

impl Report {
    pub(crate) fn new(well_formed: bool, errors: Vec<ValidationError>) -> Self {
        Self { well_formed, errors }
    }

    pub fn well_formed(&self) -> bool {
        self.well_formed
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Well formed and no errors.
    pub fn is_valid(&self) -> bool {
        self.well_formed && self.errors.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

fn as_messages<S: Serializer>(errors: &[ValidationError], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(errors.iter().map(ToString::to_string))
}
