//! Tag directive parser.
//!
//! ```text
//! directive := segment ("," segment)*
//! segment   := "name=" IDENT | "type=" TYPEEXPR | "required" | "minLength=" INT
//! ```
//!
//! Parsing is total and best-effort: a bad segment is recorded and the
//! remaining segments are still parsed. Keys are case-sensitive; whitespace
//! around segments and around `=` is ignored; empty segments are skipped.
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$").expect("IDENT pattern is valid")
});

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directives {
    pub display_name: Option<String>,
    /// Raw `type=` text; resolved later by the descriptor resolver.
    pub declared_type: Option<String>,
    pub required: bool,
    /// Rules in tag order, `Required` included.
    pub rules: Vec<RuleSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleSpec {
    Required,
    MinLength(usize),
    /// A host-registered rule, with its literal argument.
    Custom { key: String, arg: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("invalid directive '{0}'")]
    Invalid(String),
    #[error("invalid display name '{0}'")]
    InvalidName(String),
    #[error("duplicate '{0}' directive")]
    Duplicate(&'static str),
    #[error("minLength should be an integer, got '{0}'")]
    MinLengthNotInteger(String),
    #[error("minLength should be greater than 0, got {0}")]
    MinLengthNotPositive(i64),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parsed {
    pub directives: Directives,
    pub errors: Vec<DirectiveError>,
}

struct Segment<'a> {
    raw: &'a str,
    key: &'a str,
    value: Option<&'a str>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

fn segments(text: &str) -> impl Iterator<Item = Segment<'_>> {
    text.split(',')
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| match raw.split_once('=') {
            Some((key, value)) => Segment { raw, key: key.trim(), value: Some(value.trim()) },
            None => Segment { raw, key: raw, value: None },
        })
}

pub fn parse(text: &str) -> Parsed {
    parse_with(text, &|_| false)
}

/// Parse with an extra set of keys (host rules) accepted as custom rules.
pub fn parse_with(text: &str, is_custom: &dyn Fn(&str) -> bool) -> Parsed {
    let mut out = Parsed::default();
    let d = &mut out.directives;

    for seg in segments(text) {
        match (seg.key, seg.value) {
            ("name", Some(name)) => {
                if d.display_name.is_some() {
                    out.errors.push(DirectiveError::Duplicate("name"));
                } else if IDENT.is_match(name) {
                    d.display_name = Some(name.to_string());
                } else {
                    out.errors.push(DirectiveError::InvalidName(name.to_string()));
                }
            }
            ("type", Some(ty)) => {
                if d.declared_type.is_some() {
                    out.errors.push(DirectiveError::Duplicate("type"));
                } else {
                    d.declared_type = Some(ty.to_string());
                }
            }
            ("required", None) => {
                if !d.required {
                    d.required = true;
                    d.rules.push(RuleSpec::Required);
                }
            }
            ("minLength", Some(arg)) => match parse_int(arg) {
                Some(n) if n > 0 => d.rules.push(RuleSpec::MinLength(n as usize)),
                Some(n) => out.errors.push(DirectiveError::MinLengthNotPositive(n)),
                None => out.errors.push(DirectiveError::MinLengthNotInteger(arg.to_string())),
            },
            (key, arg) if is_custom(key) => d.rules.push(RuleSpec::Custom {
                key: key.to_string(),
                arg: arg.map(str::to_string),
            }),
            _ => out.errors.push(DirectiveError::Invalid(seg.raw.to_string())),
        }
    }

    out
}

/// Optional `-`, then ASCII digits only.
fn parse_int(text: &str) -> Option<i64> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// The `name=` override, if the tag carries a valid one.
pub fn name_override(text: &str) -> Option<&str> {
    segments(text)
        .find(|seg| seg.key == "name")
        .and_then(|seg| seg.value)
        .filter(|name| IDENT.is_match(name))
}

impl Directives {
    pub fn min_length(&self) -> Option<usize> {
        self.rules.iter().find_map(|r| match r {
            RuleSpec::MinLength(n) => Some(*n),
            _ => None,
        })
    }
}

/// Prints the segment the rule was parsed from.
impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("required"),
            Self::MinLength(n) => write!(f, "minLength={n}"),
            Self::Custom { key, arg: None } => f.write_str(key),
            Self::Custom { key, arg: Some(arg) } => write!(f, "{key}={arg}"),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
