//! Structural matching of a runtime value against a resolved descriptor.
//!
//! Containers are checked through their static element descriptors first.
//! Only when the static side is polymorphic (contains `any`) do we walk the
//! actual items, and then we stop at the first item that does not fit.
//! Empty containers have nothing to contradict the descriptor and match.
use super::Descriptor;
use crate::value::{Mapping, Sequence, Value};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    /// Location below the field, e.g. `["[3]", "[\"k\"]"]`. Empty for the
    /// field itself.
    pub at: Vec<String>,
    pub kind: MismatchKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MismatchKind {
    Type { expected: Descriptor, actual: Descriptor },
    Length { expected: usize, actual: usize },
    KeyType { expected: Descriptor, actual: Descriptor },
}

pub fn conform(expected: &Descriptor, value: &Value) -> Vec<Mismatch> {
    let mut out = Vec::new();
    check(expected, value, &mut Vec::new(), &mut out);
    out
}

fn check(expected: &Descriptor, value: &Value, at: &mut Vec<String>, out: &mut Vec<Mismatch>) {
    // Absence is the `required` rule's business.
    let Some(actual) = value.runtime_type() else { return };

    let wrong_type = |at: &Vec<String>, out: &mut Vec<Mismatch>| {
        out.push(Mismatch {
            at: at.clone(),
            kind: MismatchKind::Type { expected: expected.clone(), actual: actual.clone() },
        });
    };

    match expected {
        Descriptor::Any | Descriptor::Unsupported(_) | Descriptor::Unknown(_) => {}
        Descriptor::Primitive(kind) => {
            if value.primitive_kind() != Some(*kind) {
                wrong_type(at, out);
            }
        }
        Descriptor::Record(name) => match value {
            Value::Record(record) if record.name() == name => {}
            _ => wrong_type(at, out),
        },
        Descriptor::Sequence(elem) => match value {
            Value::Sequence(seq) => check_items(elem, seq, expected, &actual, at, out),
            _ => wrong_type(at, out),
        },
        Descriptor::FixedArray(elem, len) => match value {
            Value::Array(seq) => {
                if seq.items.len() != *len {
                    out.push(Mismatch {
                        at: at.clone(),
                        kind: MismatchKind::Length { expected: *len, actual: seq.items.len() },
                    });
                }
                check_items(elem, seq, expected, &actual, at, out);
            }
            _ => wrong_type(at, out),
        },
        Descriptor::Mapping(key, val) => match value {
            Value::Map(map) => {
                check_keys(key, map, at, out);
                check_values(val, map, expected, &actual, at, out);
            }
            _ => wrong_type(at, out),
        },
    }
}

/// Whether a container's static descriptor can hold values of `expected`.
/// `any` on either side unifies at every depth.
pub fn compatible(expected: &Descriptor, actual: &Descriptor) -> bool {
    match (expected, actual) {
        (Descriptor::Any, _) | (_, Descriptor::Any) => true,
        (Descriptor::Sequence(x), Descriptor::Sequence(y)) => compatible(x, y),
        (Descriptor::FixedArray(x, n), Descriptor::FixedArray(y, m)) => n == m && compatible(x, y),
        (Descriptor::Mapping(k1, v1), Descriptor::Mapping(k2, v2)) => {
            compatible(k1, k2) && compatible(v1, v2)
        }
        _ => expected == actual,
    }
}

fn check_items(
    elem: &Descriptor,
    seq: &Sequence,
    expected: &Descriptor,
    actual: &Descriptor,
    at: &mut Vec<String>,
    out: &mut Vec<Mismatch>,
) {
    if elem.is_any() {
        return;
    }
    if !compatible(elem, &seq.elem) {
        out.push(Mismatch {
            at: at.clone(),
            kind: MismatchKind::Type { expected: expected.clone(), actual: actual.clone() },
        });
        return;
    }
    // a concrete static side already guarantees every item
    if !seq.elem.contains_any() {
        return;
    }
    for (i, item) in seq.items.iter().enumerate() {
        at.push(format!("[{i}]"));
        let before = out.len();
        check(elem, item, at, out);
        at.pop();
        if out.len() > before {
            break;
        }
    }
}

fn check_keys(key: &Descriptor, map: &Mapping, at: &[String], out: &mut Vec<Mismatch>) {
    if key.is_any() {
        return;
    }
    if !compatible(key, &map.key) {
        out.push(Mismatch {
            at: at.to_vec(),
            kind: MismatchKind::KeyType { expected: key.clone(), actual: map.key.clone() },
        });
        return;
    }
    if !map.key.contains_any() {
        return;
    }
    let offending = map
        .entries
        .iter()
        .map(|(k, _)| k)
        .find(|k| !conform(key, k).is_empty());
    if let Some(actual) = offending.and_then(Value::runtime_type) {
        out.push(Mismatch {
            at: at.to_vec(),
            kind: MismatchKind::KeyType { expected: key.clone(), actual },
        });
    }
}

fn check_values(
    val: &Descriptor,
    map: &Mapping,
    expected: &Descriptor,
    actual: &Descriptor,
    at: &mut Vec<String>,
    out: &mut Vec<Mismatch>,
) {
    if val.is_any() {
        return;
    }
    if !compatible(val, &map.value) {
        out.push(Mismatch {
            at: at.clone(),
            kind: MismatchKind::Type { expected: expected.clone(), actual: actual.clone() },
        });
        return;
    }
    if !map.value.contains_any() {
        return;
    }
    for (k, v) in &map.entries {
        at.push(key_label(k));
        let before = out.len();
        check(val, v, at, out);
        at.pop();
        if out.len() > before {
            break;
        }
    }
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => format!("[{s:?}]"),
        Value::Int(i) => format!("[{i}]"),
        Value::Bool(b) => format!("[{b}]"),
        Value::Float(f) => format!("[{f}]"),
        other => format!("[<{}>]", other.kind()),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
