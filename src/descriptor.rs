//! Type descriptors: the closed, recursive vocabulary shared by declared
//! field types, tag `type=` expressions and runtime values.
//!
//! - `parse` turns a type expression (`map[string][]int`) into a descriptor.
//! - `conform` checks a runtime value against a descriptor.
//!
//! Declared types and runtime types live in the same variant set, so
//! matching is structural comparison, never string comparison.
pub mod conform;
pub mod parse;

use std::fmt;

pub use conform::{conform, Mismatch};
pub use parse::{resolve, resolve_with, NamedTypes, ResolveError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Int,
    Float,
    String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Descriptor {
    Primitive(PrimitiveKind),
    /// Wildcard; unifies with everything.
    Any,
    Sequence(Box<Descriptor>),
    FixedArray(Box<Descriptor>, usize),
    Mapping(Box<Descriptor>, Box<Descriptor>),
    /// A nested record, by name.
    Record(String),
    /// Recognized but not validatable (e.g. `complex128`).
    Unsupported(String),
    /// Text that could not be resolved at all.
    Unknown(String),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl PrimitiveKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float64",
            Self::String => "string",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl Descriptor {
    pub const BOOL: Self = Self::Primitive(PrimitiveKind::Bool);
    pub const INT: Self = Self::Primitive(PrimitiveKind::Int);
    pub const FLOAT: Self = Self::Primitive(PrimitiveKind::Float);
    pub const STRING: Self = Self::Primitive(PrimitiveKind::String);

    pub fn sequence(elem: Descriptor) -> Self {
        Self::Sequence(Box::new(elem))
    }
    pub fn fixed_array(elem: Descriptor, len: usize) -> Self {
        Self::FixedArray(Box::new(elem), len)
    }
    pub fn mapping(key: Descriptor, value: Descriptor) -> Self {
        Self::Mapping(Box::new(key), Box::new(value))
    }

    /// Parse a type expression. Shorthand for [`parse::resolve`].
    pub fn parse(text: &str) -> Result<Self, ResolveError> {
        resolve(text)
    }

    /// Like [`Descriptor::parse`], but keeps unparseable text as `Unknown`.
    pub fn parse_lenient(text: &str) -> Self {
        resolve(text).unwrap_or_else(|_| Self::Unknown(text.trim().to_string()))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Primitive(PrimitiveKind::String))
    }

    /// Whether a wildcard occurs anywhere in the tree.
    pub fn contains_any(&self) -> bool {
        match self {
            Self::Any => true,
            Self::Sequence(elem) | Self::FixedArray(elem, _) => elem.contains_any(),
            Self::Mapping(key, value) => key.contains_any() || value.contains_any(),
            _ => false,
        }
    }

    /// First `Unsupported` node, searching depth first.
    pub fn find_unsupported(&self) -> Option<&str> {
        self.find(&|d| matches!(d, Self::Unsupported(_)))
    }

    /// First `Unknown` node, searching depth first.
    pub fn find_unknown(&self) -> Option<&str> {
        self.find(&|d| matches!(d, Self::Unknown(_)))
    }

    fn find(&self, pred: &dyn Fn(&Self) -> bool) -> Option<&str> {
        match self {
            Self::Unsupported(raw) | Self::Unknown(raw) if pred(self) => Some(raw.as_str()),
            Self::Sequence(elem) | Self::FixedArray(elem, _) => elem.find(pred),
            Self::Mapping(key, value) => key.find(pred).or_else(|| value.find(pred)),
            _ => None,
        }
    }
}

/// Canonical text; parsing it back yields an equal descriptor for every
/// variant the grammar can express.
impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Any => f.write_str("any"),
            Self::Sequence(elem) => write!(f, "[]{elem}"),
            Self::FixedArray(elem, len) => write!(f, "[{len}]{elem}"),
            Self::Mapping(key, value) => write!(f, "map[{key}]{value}"),
            Self::Record(name) => f.write_str(name),
            Self::Unsupported(raw) | Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
