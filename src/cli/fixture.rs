//! cli::fixture
//!
//! JSON record fixtures for the `stage` command.
//!
//! # Format
//!
//! ```json
//! {
//!   "root": "1",
//!   "records": [
//!     {
//!       "id": "1",
//!       "attributes": { "firstName": "Joe", "lastName": "Palmer", "children": 2 },
//!       "types": { "children": "number" },
//!       "computed": { "fullName": ["firstName", "lastName"] },
//!       "belongs_to": { "follows": "2" },
//!       "has_many": { "followers": ["2"] }
//!     },
//!     { "id": "2", "attributes": { "firstName": "Trevor" } }
//!   ]
//! }
//! ```
//!
//! Every record gets an `id` attribute. A `computed` entry declares a
//! property that joins the listed attributes with spaces, and splits on
//! spaces when written.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::transform;
use crate::core::value::{EntityRef, Value};
use crate::model::record::Record;
use crate::model::{Accessor, Properties};

/// Errors from loading or writing a fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write fixture '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse fixture: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("unknown record id '{0}'")]
    UnknownRecord(String),

    #[error("duplicate record id '{0}'")]
    DuplicateRecord(String),

    #[error("unsupported value for '{key}': arrays and objects are not attribute values")]
    UnsupportedValue { key: String },
}

/// A set of records and the one to edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    /// Id of the record the proxy wraps
    pub root: String,
    pub records: Vec<RecordFixture>,
}

/// One record of a fixture.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RecordFixture {
    pub id: String,
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Declared value type per attribute
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, String>,
    /// Space-joined computed properties over the listed attributes
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub computed: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub belongs_to: BTreeMap<String, Option<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub has_many: BTreeMap<String, Vec<String>>,
}

/// Records built from a fixture, indexed by id.
pub struct Workspace {
    fixture: Fixture,
    records: BTreeMap<String, EntityRef>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let contents = fs::read_to_string(path).map_err(|e| FixtureError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), FixtureError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents + "\n").map_err(|e| FixtureError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Build live records and wire their relationships.
    pub fn build(self) -> Result<Workspace, FixtureError> {
        let mut records = BTreeMap::new();
        for spec in &self.records {
            let record = build_record(spec)?;
            if records.insert(spec.id.clone(), EntityRef::new(record)).is_some() {
                return Err(FixtureError::DuplicateRecord(spec.id.clone()));
            }
        }

        let workspace = Workspace {
            fixture: self,
            records,
        };
        if !workspace.records.contains_key(&workspace.fixture.root) {
            return Err(FixtureError::UnknownRecord(workspace.fixture.root.clone()));
        }

        for spec in &workspace.fixture.records {
            let entity = workspace.resolve(&spec.id)?;
            for (name, target) in &spec.belongs_to {
                let value = match target {
                    Some(id) => Value::Entity(workspace.resolve(id)?),
                    None => Value::Null,
                };
                entity.set(name, value);
            }
            for (name, ids) in &spec.has_many {
                let members = ids
                    .iter()
                    .map(|id| workspace.resolve(id))
                    .collect::<Result<Vec<_>, _>>()?;
                entity.set(name, Value::Entities(members));
            }
        }
        Ok(workspace)
    }
}

impl Workspace {
    /// The record being edited.
    pub fn root(&self) -> EntityRef {
        self.records[&self.fixture.root].clone()
    }

    pub fn resolve(&self, id: &str) -> Result<EntityRef, FixtureError> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| FixtureError::UnknownRecord(id.to_string()))
    }

    /// Current state of every record, in the fixture's shape.
    pub fn capture(&self) -> Fixture {
        let records = self
            .fixture
            .records
            .iter()
            .map(|spec| {
                let entity = &self.records[&spec.id];
                RecordFixture {
                    id: spec.id.clone(),
                    attributes: spec
                        .attributes
                        .keys()
                        .map(|key| (key.clone(), to_json(&entity.get(key))))
                        .collect(),
                    types: spec.types.clone(),
                    computed: spec.computed.clone(),
                    belongs_to: spec
                        .belongs_to
                        .keys()
                        .map(|key| (key.clone(), entity_id(&entity.get(key))))
                        .collect(),
                    has_many: spec
                        .has_many
                        .keys()
                        .map(|key| {
                            let ids = match entity.get(key) {
                                Value::Entities(members) => members
                                    .into_iter()
                                    .filter_map(|m| entity_id(&Value::Entity(m)))
                                    .collect(),
                                _ => Vec::new(),
                            };
                            (key.clone(), ids)
                        })
                        .collect(),
                }
            })
            .collect();

        Fixture {
            root: self.fixture.root.clone(),
            records,
        }
    }
}

fn build_record(spec: &RecordFixture) -> Result<Record, FixtureError> {
    let mut record = Record::new().with_attribute("id", Some("string"));
    record.set("id", Value::from(spec.id.as_str()));

    for name in spec.types.keys().chain(spec.attributes.keys()) {
        if name != "id" {
            record = record.with_attribute(name, spec.types.get(name).map(String::as_str));
        }
    }
    for (name, json) in &spec.attributes {
        let mut value = from_json(name, json)?;
        if let Some(t) = spec.types.get(name).and_then(|ty| transform::builtin(ty)) {
            value = t.apply(value);
        }
        record.set(name, value);
    }
    for name in spec.belongs_to.keys() {
        record = record.with_belongs_to(name, None);
    }
    for name in spec.has_many.keys() {
        record = record.with_has_many(name, None);
    }
    for (name, parts) in &spec.computed {
        record = record.with_computed(name, joined(parts.clone()));
    }
    Ok(record)
}

/// Computed property joining `parts` with spaces.
fn joined(parts: Vec<String>) -> Accessor {
    let setter_parts = parts.clone();
    Accessor::new(
        move |p| {
            let words: Vec<String> = parts.iter().map(|k| p.get(k).to_string()).collect();
            Value::from(words.join(" ").trim())
        },
        move |p, value| {
            let text = value.to_string();
            let mut words = text.split(' ');
            for key in &setter_parts {
                p.set(key, words.next().map(str::to_string).into());
            }
        },
    )
}

fn from_json(key: &str, json: &serde_json::Value) -> Result<Value, FixtureError> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            return Err(FixtureError::UnsupportedValue {
                key: key.to_string(),
            })
        }
    })
}

/// JSON rendering of a value. Entities render as their record id.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
            serde_json::Value::from(*n as i64)
        }
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        Value::Entity(_) => {
            entity_id(value).map_or(serde_json::Value::Null, serde_json::Value::String)
        }
        Value::Entities(members) => serde_json::Value::Array(
            members
                .iter()
                .map(|m| to_json(&Value::Entity(m.clone())))
                .collect(),
        ),
    }
}

fn entity_id(value: &Value) -> Option<String> {
    match value.underlying()?.get("id") {
        Value::Null => None,
        id => Some(id.to_string()),
    }
}
