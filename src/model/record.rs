//! model::record
//!
//! In-memory model implementation.
//!
//! # Design
//!
//! `Record` is a deterministic [`Model`] that keeps its state in memory.
//! It behaves the way a typical ORM record does:
//!
//! - To-one relationships are handed out as relationship proxies
//!   ([`EntityRef::proxy`]) whose content is swapped on reassignment.
//! - To-many relationships are handed out as [`LiveMembers`] that track the
//!   relationship as it changes.
//! - Writes to undeclared keys are ignored.
//! - Computed properties are registered with [`Record::with_computed`].
//!
//! Commits are counted, and can be configured to fail, for testing the
//! commit path.
//!
//! # Example
//!
//! ```
//! use simple_changeset::model::record::Record;
//! use simple_changeset::model::Properties;
//! use simple_changeset::core::value::Value;
//!
//! let mut record = Record::new()
//!     .with_attribute("firstName", None)
//!     .with_attribute("children", Some("number"))
//!     .with_value("firstName", "Jonathan");
//!
//! assert_eq!(record.get("firstName"), Value::from("Jonathan"));
//!
//! record.set("notAProperty", Value::from("ignored"));
//! assert_eq!(record.get("notAProperty"), Value::Null);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use uuid::Uuid;

use super::{Accessor, LiveMembers, Model, ModelError, Properties};
use crate::core::schema::{AttributeMeta, RelationshipKind, RelationshipMeta, Schema};
use crate::core::transform::{self, Transform};
use crate::core::value::{split_root, EntityRef, Value};

/// An in-memory record.
pub struct Record {
    /// Identifies the record in logs; not a persisted id.
    client_id: Uuid,
    schema: Schema,
    attributes: BTreeMap<String, Value>,
    /// To-one relationships, each held as a relationship proxy.
    belongs_to: BTreeMap<String, EntityRef>,
    has_many: BTreeMap<String, LiveMembers>,
    accessors: HashMap<String, Accessor>,
    transforms: HashMap<String, Rc<dyn Transform>>,
    save_count: usize,
    /// Error returned by `save` (for testing error paths).
    fail_on_save: Option<ModelError>,
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl Record {
    /// Create a record with no declared properties.
    pub fn new() -> Self {
        Self {
            client_id: Uuid::new_v4(),
            schema: Schema::default(),
            attributes: BTreeMap::new(),
            belongs_to: BTreeMap::new(),
            has_many: BTreeMap::new(),
            accessors: HashMap::new(),
            transforms: HashMap::new(),
            save_count: 0,
            fail_on_save: None,
        }
    }

    /// Declare an attribute, initially `Null`.
    pub fn with_attribute(mut self, name: &str, value_type: Option<&str>) -> Self {
        self.schema.push_attribute(AttributeMeta::new(name, value_type));
        self.attributes.insert(name.to_string(), Value::Null);
        self
    }

    /// Declare a to-one relationship, initially empty.
    pub fn with_belongs_to(mut self, name: &str, value_type: Option<&str>) -> Self {
        self.schema.push_relationship(RelationshipMeta::new(
            name,
            RelationshipKind::ToOne,
            value_type,
        ));
        self.belongs_to
            .insert(name.to_string(), EntityRef::proxy(None));
        self
    }

    /// Declare a to-many relationship, initially empty.
    pub fn with_has_many(mut self, name: &str, value_type: Option<&str>) -> Self {
        self.schema.push_relationship(RelationshipMeta::new(
            name,
            RelationshipKind::ToMany,
            value_type,
        ));
        self.has_many.insert(name.to_string(), LiveMembers::default());
        self
    }

    /// Register a computed property.
    pub fn with_computed(mut self, name: &str, accessor: Accessor) -> Self {
        self.accessors.insert(name.to_string(), accessor);
        self
    }

    /// Register a transform, shadowing a built-in of the same name.
    pub fn with_transform(mut self, transform: Rc<dyn Transform>) -> Self {
        self.transforms
            .insert(transform.name().to_string(), transform);
        self
    }

    /// Set an initial value.
    pub fn with_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value.into());
        self
    }

    /// Configure `save` to fail with `error`.
    pub fn fail_on_save(mut self, error: ModelError) -> Self {
        self.fail_on_save = Some(error);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on_save(&mut self) {
        self.fail_on_save = None;
    }

    /// Number of times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.save_count
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn set_belongs_to(proxy: &EntityRef, key: &str, value: &Value) {
        match value {
            Value::Entity(target) => proxy.set_content(target.content()),
            Value::Null => proxy.set_content(None),
            other => {
                tracing::warn!(key, kind = other.kind(), "non-entity write to to-one relationship ignored");
            }
        }
    }

    fn set_has_many(members: &LiveMembers, key: &str, value: &Value) {
        match value {
            Value::Entities(list) => members.replace(list.clone()),
            Value::Entity(single) => members.replace(vec![single.clone()]),
            Value::Null => members.replace(Vec::new()),
            other => {
                tracing::warn!(key, kind = other.kind(), "non-entity write to to-many relationship ignored");
            }
        }
    }
}

impl Properties for Record {
    fn get(&self, key: &str) -> Value {
        if let Some(getter) = self.accessors.get(key).and_then(|a| a.get.clone()) {
            return getter(self);
        }

        let (root, rest) = split_root(key);
        if let Some(proxy) = self.belongs_to.get(root) {
            return match rest {
                Some(rest) => proxy.get(rest),
                None => Value::Entity(proxy.clone()),
            };
        }
        if let Some(members) = self.has_many.get(root) {
            let value = Value::Entities(members.to_vec());
            return match rest {
                Some(rest) => value.lookup(rest),
                None => value,
            };
        }
        match (self.attributes.get(root), rest) {
            (Some(value), None) => value.clone(),
            (Some(value), Some(rest)) => value.lookup(rest),
            (None, _) => Value::Null,
        }
    }

    fn set(&mut self, key: &str, value: Value) -> Value {
        if let Some(setter) = self.accessors.get(key).and_then(|a| a.set.clone()) {
            setter(self, value.clone());
            return value;
        }

        let (root, rest) = split_root(key);
        if let Some(rest) = rest {
            // Nested writes reach through to-one relationships only.
            match self.belongs_to.get(root) {
                Some(proxy) => {
                    proxy.set(rest, value.clone());
                }
                None => tracing::debug!(key, "nested write outside a to-one relationship ignored"),
            }
            return value;
        }

        if let Some(proxy) = self.belongs_to.get(root) {
            Self::set_belongs_to(proxy, key, &value);
        } else if let Some(members) = self.has_many.get(root) {
            Self::set_has_many(members, key, &value);
        } else if let Some(slot) = self.attributes.get_mut(root) {
            *slot = value.clone();
        } else {
            tracing::debug!(key, "write to undeclared property ignored");
        }
        value
    }
}

#[async_trait(?Send)]
impl Model for Record {
    fn attributes(&self) -> Vec<AttributeMeta> {
        self.schema.attributes().to_vec()
    }

    fn relationships(&self) -> Vec<RelationshipMeta> {
        self.schema.relationships().to_vec()
    }

    fn members(&self, key: &str) -> Option<LiveMembers> {
        self.has_many.get(key).cloned()
    }

    fn accessor(&self, key: &str) -> Option<Accessor> {
        self.accessors.get(key).cloned()
    }

    fn transform(&self, name: &str) -> Option<Rc<dyn Transform>> {
        self.transforms
            .get(name)
            .cloned()
            .or_else(|| transform::builtin(name))
    }

    async fn save(&mut self) -> Result<(), ModelError> {
        self.save_count += 1;
        if let Some(err) = &self.fail_on_save {
            tracing::debug!(client_id = %self.client_id, error = %err, "record save failed");
            return Err(err.clone());
        }
        tracing::debug!(client_id = %self.client_id, saves = self.save_count, "record saved");
        Ok(())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("client_id", &self.client_id)
            .field("attributes", &self.attributes)
            .field("belongs_to", &self.belongs_to)
            .field("has_many", &self.has_many)
            .field("computed", &self.accessors.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Record {
        Record::new()
            .with_attribute("firstName", None)
            .with_attribute("lastName", None)
            .with_belongs_to("follows", Some("person"))
            .with_has_many("followers", Some("person"))
            .with_computed(
                "fullName",
                Accessor::new(
                    |p| {
                        let full = format!("{} {}", p.get("firstName"), p.get("lastName"));
                        Value::from(full.trim())
                    },
                    |p, value| {
                        let text = value.to_string();
                        let mut parts = text.split(' ');
                        p.set("firstName", parts.next().map(str::to_string).into());
                        p.set("lastName", parts.next().map(str::to_string).into());
                    },
                ),
            )
    }

    #[test]
    fn declared_attributes_start_null() {
        let record = person();
        assert_eq!(record.get("firstName"), Value::Null);
        assert_eq!(record.attributes().len(), 2);
        assert_eq!(record.relationships().len(), 2);
    }

    #[test]
    fn computed_property_reads_and_writes() {
        let mut record = person().with_value("firstName", "Jonathan");
        record.set("lastName", "Palmer".into());
        assert_eq!(record.get("fullName"), Value::from("Jonathan Palmer"));

        record.set("fullName", "Lilian Baxter".into());
        assert_eq!(record.get("firstName"), Value::from("Lilian"));
        assert_eq!(record.get("lastName"), Value::from("Baxter"));
    }

    #[test]
    fn belongs_to_is_a_stable_proxy() {
        let mut record = person();
        let trevor = EntityRef::new(person().with_value("firstName", "Trevor"));

        let before = record.get("follows");
        record.set("follows", Value::Entity(trevor.clone()));
        let after = record.get("follows");

        assert!(before.as_entity().unwrap().same_handle(after.as_entity().unwrap()));
        assert!(after.as_entity().unwrap().same_entity(&trevor));
        assert_eq!(record.get("follows.firstName"), Value::from("Trevor"));
    }

    #[test]
    fn nested_write_reaches_related_record() {
        let trevor = EntityRef::new(person().with_value("firstName", "Trevor"));
        let mut record = person().with_value("follows", trevor.clone());

        record.set("follows.firstName", "Paul".into());

        assert_eq!(trevor.get("firstName"), Value::from("Paul"));
    }

    #[test]
    fn has_many_members_are_live() {
        let a = EntityRef::new(person());
        let b = EntityRef::new(person());
        let mut record = person().with_value("followers", vec![a.clone()]);
        let live = record.members("followers").unwrap();

        record.set("followers", Value::Entities(vec![a, b.clone()]));

        assert_eq!(live.len(), 2);
        assert!(live.last().unwrap().same_entity(&b));
        assert_eq!(record.get("followers.1"), Value::Entity(b));
    }

    #[test]
    fn custom_transform_shadows_builtin() {
        struct Upper;
        impl Transform for Upper {
            fn name(&self) -> &str {
                "string"
            }
            fn apply(&self, value: Value) -> Value {
                Value::from(value.to_string().to_uppercase())
            }
        }

        let record = person().with_transform(Rc::new(Upper));
        let t = record.transform("string").unwrap();
        assert_eq!(t.apply("abc".into()), Value::from("ABC"));
        assert!(record.transform("number").is_some());
    }

    #[tokio::test]
    async fn save_counts_and_fails_on_demand() {
        let mut record = person();
        record.save().await.unwrap();
        assert_eq!(record.save_count(), 1);

        let mut failing = person().fail_on_save(ModelError::Invalid("lastName blank".into()));
        let err = failing.save().await.unwrap_err();
        assert_eq!(err, ModelError::Invalid("lastName blank".into()));
        assert_eq!(failing.save_count(), 1);

        failing.clear_fail_on_save();
        assert!(failing.save().await.is_ok());
    }
}
