//! Records, the `Reflect` trait that turns Rust values into them, and the
//! introspector that flattens a record into field descriptors.
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use indexmap::IndexMap;
use thiserror::Error;

use crate::descriptor::Descriptor;
use crate::tag;
use crate::value::{Mapping, Opaque, Sequence, Value};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A structured value with named, typed, tagged fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    name: String,
    fields: Vec<Field>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Identifier from the record definition.
    pub ident: String,
    /// Statically declared type.
    pub declared: Descriptor,
    /// Raw directive string.
    pub tag: String,
    pub value: Value,
}

/// Anything that can present itself as a [`Value`] with a static type.
///
/// Implemented for the primitive, container and pointer-like types of the
/// standard library; structs get it from [`record!`](crate::record!).
pub trait Reflect {
    fn declared_type() -> Descriptor;
    fn reflect(&self) -> Value;
}

/// One flattened field, as the engine sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor<'a> {
    /// Display name: the tag's `name=` override, else the identifier.
    pub name: String,
    pub declared: &'a Descriptor,
    pub tag: &'a str,
    /// `None` when the field holds no value.
    pub value: Option<&'a Value>,
    /// Only meaningful when `value` is present.
    pub runtime: Option<Descriptor>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Introspection<'a> {
    pub record: &'a str,
    pub fields: Vec<FieldDescriptor<'a>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IntrospectError {
    #[error("expected a structured record, received {kind}")]
    NotARecord { kind: &'static str },
}

// ————————————————————————————————————————————————————————————————————————————
// RECORD
// ————————————————————————————————————————————————————————————————————————————

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

impl Field {
    pub fn new(
        ident: impl Into<String>,
        declared: Descriptor,
        tag: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self { ident: ident.into(), declared, tag: tag.into(), value: value.into() }
    }

    /// Field whose declared type comes from the Rust type of `value`.
    pub fn of<T: Reflect + ?Sized>(ident: impl Into<String>, tag: impl Into<String>, value: &T) -> Self {
        Self::new(ident, T::declared_type(), tag, value.reflect())
    }

    /// Field whose declared type is given as text. Unparseable text is kept
    /// as [`Descriptor::Unknown`] for the engine to report.
    pub fn dynamic(
        ident: impl Into<String>,
        declared: &str,
        tag: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(ident, Descriptor::parse_lenient(declared), tag, value)
    }
}

impl Reflect for Record {
    fn declared_type() -> Descriptor {
        Descriptor::Any
    }
    fn reflect(&self) -> Value {
        Value::Record(self.clone())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTROSPECTION
// ————————————————————————————————————————————————————————————————————————————

/// Flatten a record into field descriptors, in declaration order.
///
/// Does not recurse: a nested record is just a field whose runtime type is
/// a record.
pub fn introspect(value: &Value) -> Result<Introspection<'_>, IntrospectError> {
    let Value::Record(record) = value else {
        return Err(IntrospectError::NotARecord { kind: value.kind() });
    };

    let fields = record
        .fields
        .iter()
        .map(|field| {
            let present = (!field.value.is_null()).then_some(&field.value);
            FieldDescriptor {
                name: tag::name_override(&field.tag)
                    .unwrap_or(&field.ident)
                    .to_string(),
                declared: &field.declared,
                tag: &field.tag,
                value: present,
                runtime: present.and_then(Value::runtime_type),
            }
        })
        .collect();

    Ok(Introspection { record: &record.name, fields })
}

// ————————————————————————————————————————————————————————————————————————————
// REFLECT IMPLS
// ————————————————————————————————————————————————————————————————————————————

impl Reflect for bool {
    fn declared_type() -> Descriptor { Descriptor::BOOL }
    fn reflect(&self) -> Value { Value::Bool(*self) }
}

macro_rules! reflect_int {
    ($($ty:ty),*) => {$(
        impl Reflect for $ty {
            fn declared_type() -> Descriptor { Descriptor::INT }
            fn reflect(&self) -> Value { Value::Int(i64::from(*self)) }
        }
    )*};
}
reflect_int!(i8, i16, i32, i64, u8, u16, u32);

impl Reflect for isize {
    fn declared_type() -> Descriptor { Descriptor::INT }
    fn reflect(&self) -> Value {
        match i64::try_from(*self) {
            Ok(i) => Value::Int(i),
            Err(_) => opaque("isize", self),
        }
    }
}

// No lossless i64 view, so these stay opaque.
macro_rules! reflect_unsupported {
    ($($ty:ty => $name:literal),*) => {$(
        impl Reflect for $ty {
            fn declared_type() -> Descriptor { Descriptor::Unsupported($name.to_string()) }
            fn reflect(&self) -> Value { opaque($name, self) }
        }
    )*};
}
reflect_unsupported!(u64 => "u64", usize => "usize", i128 => "i128", u128 => "u128", char => "char");

fn opaque(type_name: &str, v: &impl ToString) -> Value {
    Value::Opaque(Opaque { type_name: type_name.to_string(), repr: v.to_string() })
}

impl Reflect for f32 {
    fn declared_type() -> Descriptor { Descriptor::FLOAT }
    fn reflect(&self) -> Value { Value::Float(f64::from(*self)) }
}

impl Reflect for f64 {
    fn declared_type() -> Descriptor { Descriptor::FLOAT }
    fn reflect(&self) -> Value { Value::Float(*self) }
}

impl Reflect for str {
    fn declared_type() -> Descriptor { Descriptor::STRING }
    fn reflect(&self) -> Value { Value::String(self.to_string()) }
}

impl Reflect for String {
    fn declared_type() -> Descriptor { Descriptor::STRING }
    fn reflect(&self) -> Value { Value::String(self.clone()) }
}

/// The wildcard: a `Value` field is declared `any`.
impl Reflect for Value {
    fn declared_type() -> Descriptor { Descriptor::Any }
    fn reflect(&self) -> Value { self.clone() }
}

impl<T: Reflect> Reflect for Option<T> {
    fn declared_type() -> Descriptor { T::declared_type() }
    fn reflect(&self) -> Value {
        self.as_ref().map_or(Value::Null, Reflect::reflect)
    }
}

impl<T: Reflect + ?Sized> Reflect for &T {
    fn declared_type() -> Descriptor { T::declared_type() }
    fn reflect(&self) -> Value { (**self).reflect() }
}

impl<T: Reflect + ?Sized> Reflect for Box<T> {
    fn declared_type() -> Descriptor { T::declared_type() }
    fn reflect(&self) -> Value { (**self).reflect() }
}

impl<T: Reflect> Reflect for [T] {
    fn declared_type() -> Descriptor { Descriptor::sequence(T::declared_type()) }
    fn reflect(&self) -> Value {
        Value::Sequence(Sequence {
            elem: T::declared_type(),
            items: self.iter().map(Reflect::reflect).collect(),
        })
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn declared_type() -> Descriptor { <[T]>::declared_type() }
    fn reflect(&self) -> Value { self.as_slice().reflect() }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn declared_type() -> Descriptor { Descriptor::fixed_array(T::declared_type(), N) }
    fn reflect(&self) -> Value {
        Value::Array(Sequence {
            elem: T::declared_type(),
            items: self.iter().map(Reflect::reflect).collect(),
        })
    }
}

fn reflect_map<'a, K, V>(entries: impl Iterator<Item = (&'a K, &'a V)>) -> Value
where
    K: Reflect + 'a,
    V: Reflect + 'a,
{
    Value::Map(Mapping {
        key: K::declared_type(),
        value: V::declared_type(),
        entries: entries.map(|(k, v)| (k.reflect(), v.reflect())).collect(),
    })
}

impl<K: Reflect, V: Reflect, S: BuildHasher> Reflect for HashMap<K, V, S> {
    fn declared_type() -> Descriptor { Descriptor::mapping(K::declared_type(), V::declared_type()) }
    fn reflect(&self) -> Value { reflect_map(self.iter()) }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn declared_type() -> Descriptor { Descriptor::mapping(K::declared_type(), V::declared_type()) }
    fn reflect(&self) -> Value { reflect_map(self.iter()) }
}

impl<K: Reflect, V: Reflect, S: BuildHasher> Reflect for IndexMap<K, V, S> {
    fn declared_type() -> Descriptor { Descriptor::mapping(K::declared_type(), V::declared_type()) }
    fn reflect(&self) -> Value { reflect_map(self.iter()) }
}

// ————————————————————————————————————————————————————————————————————————————
// MACRO
// ————————————————————————————————————————————————————————————————————————————

/// Declare a struct and derive [`Reflect`] for it.
///
/// Each field may carry doc comments and then one `#[vx = "…"]` directive
/// attribute, in that order. Other field attributes are not accepted.
///
/// ```
/// vx::record! {
///     #[derive(Debug)]
///     pub struct User {
///         /// Shown to users.
///         #[vx = "name=name, required, minLength=3"]
///         pub name: String,
///         pub age: Option<i64>,
///     }
/// }
///
/// let report = vx::validate(&User { name: "Al".into(), age: None });
/// assert_eq!(report.errors().len(), 1);
/// ```
#[macro_export]
macro_rules! record {
    (@tag $tag:literal) => { $tag };
    (@tag) => { "" };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $(#[vx = $tag:literal])?
                $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[doc = $doc])* $fvis $field : $fty ),*
        }

        impl $crate::Reflect for $name {
            fn declared_type() -> $crate::Descriptor {
                $crate::Descriptor::Record(stringify!($name).to_string())
            }
            fn reflect(&self) -> $crate::Value {
                let record = $crate::Record::new(stringify!($name))
                    $( .with_field($crate::Field::of::<$fty>(
                        stringify!($field),
                        $crate::record!(@tag $($tag)?),
                        &self.$field,
                    )) )*;
                $crate::Value::Record(record)
            }
        }
    };
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    crate::record! {
        struct Sample {
            /// Heading text.
            ///
            /// Shown as `label` in reports.
            #[vx = "name=label, required"]
            title: String,
            /// Undirected fields may be documented too.
            count: Option<i64>,
            tags: Vec<String>,
            extra: Value,
        }
    }

    #[test]
    fn introspects_in_declaration_order_with_name_override() {
        let sample = Sample {
            title: "x".into(),
            count: None,
            tags: vec!["a".into()],
            extra: Value::Int(1),
        };
        let value = sample.reflect();
        let got = introspect(&value).unwrap();
        assert_eq!(got.record, "Sample");

        let names: Vec<_> = got.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["label", "count", "tags", "extra"]);

        let count = &got.fields[1];
        assert_eq!(count.declared, &Descriptor::INT);
        assert_eq!(count.value, None);
        assert_eq!(count.runtime, None);

        assert_eq!(got.fields[2].runtime, Some(Descriptor::sequence(Descriptor::STRING)));
        assert_eq!(got.fields[3].declared, &Descriptor::Any);
        assert_eq!(got.fields[3].runtime, Some(Descriptor::INT));
    }

    #[test]
    fn rejects_non_records() {
        assert_eq!(
            introspect(&Value::Int(3)),
            Err(IntrospectError::NotARecord { kind: "int" })
        );
        assert_eq!(
            introspect(&Value::any_map(vec![])).unwrap_err().to_string(),
            "expected a structured record, received map"
        );
    }

    #[test]
    fn declared_types_of_std_types() {
        assert_eq!(<[u8; 4]>::declared_type(), Descriptor::fixed_array(Descriptor::INT, 4));
        assert_eq!(
            HashMap::<String, Vec<f32>>::declared_type(),
            Descriptor::mapping(Descriptor::STRING, Descriptor::sequence(Descriptor::FLOAT))
        );
        assert_eq!(u64::declared_type(), Descriptor::Unsupported("u64".into()));
        assert_eq!(<&str>::declared_type(), Descriptor::STRING);
        assert_eq!(Sample::declared_type(), Descriptor::Record("Sample".into()));
    }

    #[test]
    fn dynamic_fields_resolve_leniently() {
        let f = Field::dynamic("x", "map[string", "", Value::Null);
        assert_eq!(f.declared, Descriptor::Unknown("map[string".into()));
    }
}
