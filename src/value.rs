//! Dynamic runtime values, i.e. whatever a record field actually holds.
//!
//! Containers remember their static element (and key) descriptors, the
//! way a typed slice differs from a slice of `any`. A container whose
//! static element descriptor is `Any` is polymorphic: the matcher has to
//! look at its items to learn anything.
use crate::descriptor::{Descriptor, PrimitiveKind};
use crate::record::Record;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// No value: a missing key, `None`, JSON `null`.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Sequence),
    /// Fixed-length array; its length is the item count.
    Array(Sequence),
    Map(Mapping),
    Record(Record),
    /// A value of a type we recognize but do not model.
    Opaque(Opaque),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    pub elem: Descriptor,
    pub items: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mapping {
    pub key: Descriptor,
    pub value: Descriptor,
    /// Entries in iteration order.
    pub entries: Vec<(Value, Value)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Opaque {
    pub type_name: String,
    pub repr: String,
}

impl Value {
    pub fn any_sequence(items: Vec<Value>) -> Self {
        Self::Sequence(Sequence { elem: Descriptor::Any, items })
    }

    pub fn any_array(items: Vec<Value>) -> Self {
        Self::Array(Sequence { elem: Descriptor::Any, items })
    }

    pub fn any_map(entries: Vec<(Value, Value)>) -> Self {
        Self::Map(Mapping { key: Descriptor::Any, value: Descriptor::Any, entries })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short kind name, used in "expected a record" style messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float64",
            Self::String(_) => "string",
            Self::Sequence(_) => "slice",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::Opaque(_) => "opaque",
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Bool(_) => Some(PrimitiveKind::Bool),
            Self::Int(_) => Some(PrimitiveKind::Int),
            Self::Float(_) => Some(PrimitiveKind::Float),
            Self::String(_) => Some(PrimitiveKind::String),
            _ => None,
        }
    }

    /// The value's own type, in descriptor space. `None` for `Null`, which
    /// has no type to look up.
    pub fn runtime_type(&self) -> Option<Descriptor> {
        let ty = match self {
            Self::Null => return None,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_) => {
                Descriptor::Primitive(self.primitive_kind()?)
            }
            Self::Sequence(seq) => Descriptor::sequence(seq.elem.clone()),
            Self::Array(seq) => Descriptor::fixed_array(seq.elem.clone(), seq.items.len()),
            Self::Map(map) => Descriptor::mapping(map.key.clone(), map.value.clone()),
            Self::Record(record) => Descriptor::Record(record.name().to_string()),
            Self::Opaque(opaque) => Descriptor::Unsupported(opaque.type_name.clone()),
        };
        Some(ty)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Self::Bool(b) }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self { Self::Int(i) }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self { Self::Float(f) }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self { Self::String(s.to_string()) }
}
impl From<String> for Value {
    fn from(s: String) -> Self { Self::String(s) }
}
impl From<Record> for Value {
    fn from(r: Record) -> Self { Self::Record(r) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_type_of_containers_uses_static_element_types() {
        let typed = Value::Sequence(Sequence {
            elem: Descriptor::STRING,
            items: vec!["a".into()],
        });
        assert_eq!(typed.runtime_type(), Some(Descriptor::sequence(Descriptor::STRING)));

        let arr = Value::any_array(vec![1i64.into(), 2i64.into()]);
        assert_eq!(arr.runtime_type(), Some(Descriptor::fixed_array(Descriptor::Any, 2)));

        assert_eq!(Value::Null.runtime_type(), None);
        assert_eq!(Value::from(1.5).runtime_type(), Some(Descriptor::FLOAT));
    }
}
