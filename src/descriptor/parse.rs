//! Type expression resolver.
//!
//! ```text
//! TYPEEXPR  := PRIMITIVE | "any" | "[]" TYPEEXPR | "[" INT "]" TYPEEXPR
//!            | "map[" TYPEEXPR "]" TYPEEXPR | NAME
//! PRIMITIVE := "bool" | "int" | "float64" | "string"
//! ```
//!
//! `NAME` only resolves through a [`NamedTypes`] lookup (record names in a
//! definition file). Tags resolve with `()`, which knows no names.
use thiserror::Error;

use super::{Descriptor, PrimitiveKind};

/// Keywords we understand but cannot validate yet.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "byte", "rune", "uint", "uint8", "uint16", "uint32", "uint64", "uintptr",
    "int8", "int16", "int32", "int64", "float32", "complex64", "complex128",
];

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("empty type expression")]
    Empty,
    #[error("missing closing bracket in '{expr}'")]
    UnclosedBracket { expr: String },
    #[error("got invalid length '{len}' for the array '{expr}'")]
    InvalidLength { expr: String, len: String },
    #[error("missing element type in '{expr}'")]
    MissingElement { expr: String },
    #[error("cannot make a type for '{expr}', it's either invalid or unsupported")]
    UnknownType { expr: String },
    #[error("type expression '{expr}' nests deeper than {} levels", MAX_DEPTH)]
    TooDeep { expr: String },
    #[error("couldn't resolve the {part} of '{expr}': {source}")]
    Nested {
        part: &'static str,
        expr: String,
        source: Box<ResolveError>,
    },
}

/// Container nesting accepted by the resolver.
pub const MAX_DEPTH: usize = 64;

/// Resolves bare names that are not part of the builtin grammar.
pub trait NamedTypes {
    fn lookup(&self, name: &str) -> Option<Descriptor>;
}

impl NamedTypes for () {
    fn lookup(&self, _: &str) -> Option<Descriptor> {
        None
    }
}

pub fn resolve(text: &str) -> Result<Descriptor, ResolveError> {
    resolve_with(text, &())
}

pub fn resolve_with(text: &str, names: &dyn NamedTypes) -> Result<Descriptor, ResolveError> {
    resolve_at(text, names, 0)
}

fn resolve_at(text: &str, names: &dyn NamedTypes, depth: usize) -> Result<Descriptor, ResolveError> {
    let expr = text.trim();
    if depth > MAX_DEPTH {
        let expr = match expr.char_indices().nth(32) {
            Some((cut, _)) => format!("{}…", &expr[..cut]),
            None => expr.to_string(),
        };
        return Err(ResolveError::TooDeep { expr });
    }
    match expr {
        "" => return Err(ResolveError::Empty),
        "any" | "interface{}" | "interface {}" => return Ok(Descriptor::Any),
        "bool" => return Ok(Descriptor::Primitive(PrimitiveKind::Bool)),
        "int" => return Ok(Descriptor::Primitive(PrimitiveKind::Int)),
        "float64" => return Ok(Descriptor::Primitive(PrimitiveKind::Float)),
        "string" => return Ok(Descriptor::Primitive(PrimitiveKind::String)),
        _ if UNSUPPORTED_KEYWORDS.contains(&expr) => {
            return Ok(Descriptor::Unsupported(expr.to_string()));
        }
        _ => {}
    }

    if let Some(rest) = expr.strip_prefix("map") {
        let rest = rest.trim_start();
        if rest.starts_with('[') {
            return resolve_map(expr, rest, names, depth);
        }
    }

    if expr.starts_with('[') {
        return resolve_array(expr, names, depth);
    }

    names
        .lookup(expr)
        .ok_or_else(|| ResolveError::UnknownType { expr: expr.to_string() })
}

// Something like map[K]V, where `rest` starts at the opening bracket.
fn resolve_map(
    expr: &str,
    rest: &str,
    names: &dyn NamedTypes,
    depth: usize,
) -> Result<Descriptor, ResolveError> {
    let (key_str, elem_str) = split_bracket(expr, rest)?;
    if elem_str.trim().is_empty() {
        return Err(ResolveError::MissingElement { expr: expr.to_string() });
    }
    let key = resolve_at(key_str, names, depth + 1).map_err(|e| nested("key", expr, e))?;
    let value = resolve_at(elem_str, names, depth + 1).map_err(|e| nested("value", expr, e))?;
    Ok(Descriptor::mapping(key, value))
}

// Something like []T or [10]T.
fn resolve_array(expr: &str, names: &dyn NamedTypes, depth: usize) -> Result<Descriptor, ResolveError> {
    let (len_str, elem_str) = split_bracket(expr, expr)?;
    if elem_str.trim().is_empty() {
        return Err(ResolveError::MissingElement { expr: expr.to_string() });
    }
    let elem = resolve_at(elem_str, names, depth + 1).map_err(|e| nested("element", expr, e))?;

    let len_str = len_str.trim();
    if len_str.is_empty() {
        return Ok(Descriptor::sequence(elem));
    }
    let len = Some(len_str)
        .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| ResolveError::InvalidLength {
            expr: expr.to_string(),
            len: len_str.to_string(),
        })?;
    Ok(Descriptor::fixed_array(elem, len))
}

/// Split `[inner]tail` at the bracket matching the leading `[`.
fn split_bracket<'a>(expr: &str, s: &'a str) -> Result<(&'a str, &'a str), ResolveError> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&s[1..i], &s[i + 1..]));
                }
            }
            _ => {}
        }
    }
    Err(ResolveError::UnclosedBracket { expr: expr.to_string() })
}

fn nested(part: &'static str, expr: &str, source: ResolveError) -> ResolveError {
    if let ResolveError::TooDeep { .. } = source {
        return source;
    }
    ResolveError::Nested { part, expr: expr.to_string(), source: Box::new(source) }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
