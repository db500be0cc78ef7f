//! Record definitions loaded from JSON, and decoding of JSON documents into
//! records that follow them.
//!
//! This is how a host without Rust types for its records (the CLI, a
//! request handler) gets something to hand to the engine:
//!
//! ```json
//! { "root": "user",
//!   "records": {
//!     "user":    { "fields": [ { "name": "Name", "type": "any", "vx": "name=name, required" },
//!                              { "name": "Address", "type": "address" } ] },
//!     "address": { "fields": [ { "name": "City", "type": "string", "vx": "minLength=2" } ] } } }
//! ```
//!
//! Decoding mirrors a typical JSON-to-struct decoder: keys match exactly,
//! then case-insensitively; `null` and missing keys are absent values;
//! `any` fields take whatever the JSON holds (numbers become `float64`,
//! objects `map[string]any`); typed fields must decode strictly.
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use thiserror::Error;
use tracing::debug;

use crate::descriptor::{resolve_with, Descriptor, NamedTypes, PrimitiveKind, ResolveError};
use crate::path_de::{self, PathError};
use crate::record::{Field, Record};
use crate::value::{Mapping, Sequence, Value};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefinitionFile {
    #[serde(default)]
    root: Option<String>,
    records: IndexMap<String, RecordFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordFile {
    fields: Vec<FieldFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldFile {
    name: String,
    #[serde(rename = "type", default = "any_type")]
    ty: String,
    #[serde(default)]
    vx: String,
    /// JSON key; defaults to `name`.
    #[serde(default)]
    key: Option<String>,
}

fn any_type() -> String {
    "any".to_string()
}

#[derive(Clone, Debug, PartialEq)]
pub struct Definitions {
    root: String,
    records: IndexMap<String, RecordSchema>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordSchema {
    pub fields: Vec<FieldSchema>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    pub ident: String,
    pub declared: Descriptor,
    pub tag: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("invalid definition {0}")]
    Parse(#[from] PathError),
    #[error("definition declares no records")]
    Empty,
    #[error("unknown record '{0}'")]
    UnknownRecord(String),
    #[error("record '{record}' declares field '{field}' twice")]
    DuplicateField { record: String, field: String },
    #[error("record '{record}', field '{field}': {source}")]
    FieldType {
        record: String,
        field: String,
        source: ResolveError,
    },
    #[error("decode error at {path}: {reason}")]
    Decode { path: String, reason: String },
}

struct RecordNames<'a>(&'a IndexMap<String, RecordFile>);

impl NamedTypes for RecordNames<'_> {
    fn lookup(&self, name: &str) -> Option<Descriptor> {
        self.0.contains_key(name).then(|| Descriptor::Record(name.to_string()))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

impl Definitions {
    pub fn from_json_str(src: &str) -> Result<Self, DefinitionError> {
        let file = path_de::from_str_with_path::<DefinitionFile>(src)?;
        let root = match file.root {
            Some(root) if file.records.contains_key(&root) => root,
            Some(root) => return Err(DefinitionError::UnknownRecord(root)),
            None => file.records.keys().next().cloned().ok_or(DefinitionError::Empty)?,
        };

        let names = RecordNames(&file.records);
        let mut records = IndexMap::with_capacity(file.records.len());
        for (record_name, record) in &file.records {
            let mut fields: Vec<FieldSchema> = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                if fields.iter().any(|f| f.ident == field.name) {
                    return Err(DefinitionError::DuplicateField {
                        record: record_name.clone(),
                        field: field.name.clone(),
                    });
                }
                let declared = resolve_with(&field.ty, &names).map_err(|source| {
                    DefinitionError::FieldType {
                        record: record_name.clone(),
                        field: field.name.clone(),
                        source,
                    }
                })?;
                fields.push(FieldSchema {
                    ident: field.name.clone(),
                    declared,
                    tag: field.vx.clone(),
                    key: field.key.clone().unwrap_or_else(|| field.name.clone()),
                });
            }
            records.insert(record_name.clone(), RecordSchema { fields });
        }

        debug!(root = %root, records = records.len(), "loaded definitions");
        Ok(Self { root, records })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn record(&self, name: &str) -> Option<&RecordSchema> {
        self.records.get(name)
    }

    /// Use another record as the root.
    pub fn with_root(mut self, name: &str) -> Result<Self, DefinitionError> {
        if !self.records.contains_key(name) {
            return Err(DefinitionError::UnknownRecord(name.to_string()));
        }
        self.root = name.to_string();
        Ok(self)
    }

    /// Decode a JSON document as the root record.
    pub fn decode(&self, doc: &Json) -> Result<Record, DefinitionError> {
        self.decode_record(&self.root, doc, "$")
    }

    // ————————————————————————————————————————————————————————————————————————
    // DECODING
    // ————————————————————————————————————————————————————————————————————————

    fn decode_record(&self, name: &str, json: &Json, path: &str) -> Result<Record, DefinitionError> {
        let schema = self
            .records
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownRecord(name.to_string()))?;
        let Json::Object(obj) = json else {
            return Err(decode_error(path, format!(
                "cannot decode {} into record '{name}'",
                json_kind(json)
            )));
        };

        let mut record = Record::new(name);
        for field in &schema.fields {
            let field_path = format!("{path}.{}", field.key);
            let value = match lookup_key(obj, &field.key) {
                None => Value::Null,
                Some(json) => self.decode_value(&field.declared, json, &field_path)?,
            };
            record.push(Field::new(&field.ident, field.declared.clone(), &field.tag, value));
        }
        Ok(record)
    }

    fn decode_value(&self, ty: &Descriptor, json: &Json, path: &str) -> Result<Value, DefinitionError> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = || decode_error(path, format!("cannot decode {} into {ty}", json_kind(json)));

        let value = match ty {
            Descriptor::Any | Descriptor::Unsupported(_) | Descriptor::Unknown(_) => dynamic(json),
            Descriptor::Primitive(PrimitiveKind::Bool) => Value::Bool(json.as_bool().ok_or_else(mismatch)?),
            Descriptor::Primitive(PrimitiveKind::Int) => Value::Int(json.as_i64().ok_or_else(mismatch)?),
            Descriptor::Primitive(PrimitiveKind::Float) => {
                Value::Float(json.as_f64().ok_or_else(mismatch)?)
            }
            Descriptor::Primitive(PrimitiveKind::String) => {
                Value::String(json.as_str().ok_or_else(mismatch)?.to_string())
            }
            Descriptor::Sequence(elem) => {
                let items = json.as_array().ok_or_else(mismatch)?;
                Value::Sequence(Sequence {
                    elem: (**elem).clone(),
                    items: self.decode_items(elem, items, path)?,
                })
            }
            Descriptor::FixedArray(elem, len) => {
                let items = json.as_array().ok_or_else(mismatch)?;
                if items.len() != *len {
                    return Err(decode_error(path, format!(
                        "cannot decode an array of length {} into {ty}",
                        items.len()
                    )));
                }
                Value::Array(Sequence {
                    elem: (**elem).clone(),
                    items: self.decode_items(elem, items, path)?,
                })
            }
            Descriptor::Mapping(key, val) => {
                let obj = json.as_object().ok_or_else(mismatch)?;
                let mut entries = Vec::with_capacity(obj.len());
                for (k, v) in obj {
                    let entry_path = format!("{path}[{k:?}]");
                    entries.push((
                        decode_key(key, k, &entry_path)?,
                        self.decode_value(val, v, &entry_path)?,
                    ));
                }
                Value::Map(Mapping { key: (**key).clone(), value: (**val).clone(), entries })
            }
            Descriptor::Record(name) => Value::Record(self.decode_record(name, json, path)?),
        };
        Ok(value)
    }

    fn decode_items(&self, elem: &Descriptor, items: &[Json], path: &str) -> Result<Vec<Value>, DefinitionError> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.decode_value(elem, item, &format!("{path}[{i}]")))
            .collect()
    }
}

fn lookup_key<'a>(obj: &'a Map<String, Json>, key: &str) -> Option<&'a Json> {
    obj.get(key).or_else(|| {
        let folded = key.to_lowercase();
        obj.iter()
            .find(|(k, _)| k.to_lowercase() == folded)
            .map(|(_, v)| v)
    })
}

fn decode_key(ty: &Descriptor, key: &str, path: &str) -> Result<Value, DefinitionError> {
    match ty {
        Descriptor::Any | Descriptor::Primitive(PrimitiveKind::String) => Ok(Value::String(key.to_string())),
        Descriptor::Primitive(PrimitiveKind::Int) => key
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| decode_error(path, format!("cannot decode key {key:?} into int"))),
        other => Err(decode_error(path, format!("map keys of type {other} cannot be decoded from JSON"))),
    }
}

/// JSON as seen by an `any` field.
fn dynamic(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n.as_f64().map_or(Value::Null, Value::Float),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(xs) => Value::any_sequence(xs.iter().map(dynamic).collect()),
        Json::Object(obj) => Value::Map(Mapping {
            key: Descriptor::STRING,
            value: Descriptor::Any,
            entries: obj
                .iter()
                .map(|(k, v)| (Value::String(k.clone()), dynamic(v)))
                .collect(),
        }),
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn decode_error(path: &str, reason: String) -> DefinitionError {
    DefinitionError::Decode { path: path.to_string(), reason }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
