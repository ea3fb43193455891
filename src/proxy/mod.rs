//! proxy
//!
//! Change-tracking proxy over a live model.
//!
//! # Overview
//!
//! A [`ChangeProxy`] wraps a borrowed [`Model`] and keeps a map of staged
//! edits. Reads see staged values first and fall back to the model; writes
//! only ever touch the staged map. Nothing reaches the model until
//! [`ChangeProxy::apply_changes`] (or [`ChangeProxy::save`]) pushes every
//! staged entry through the model's own setter.
//!
//! # Staging rules
//!
//! - Attribute and to-one keys are staged on write. Staging a root key
//!   discards any staged dotted edits beneath it.
//! - Dotted keys are staged only beneath a to-one relationship; nested
//!   writes under an attribute or a to-many relationship are dropped.
//! - To-many keys are always staged, as a [`CollectionChange`] seeded from
//!   the model's live members at construction and after every rollback.
//! - Keys that are neither declared nor computed are silently dropped.
//! - Computed properties run against the proxy, so their getters read
//!   staged values and their setters stage the keys they derive from.
//!
//! # Example
//!
//! ```
//! use simple_changeset::core::value::Value;
//! use simple_changeset::model::record::Record;
//! use simple_changeset::model::Properties;
//! use simple_changeset::proxy::ChangeProxy;
//!
//! let mut model = Record::new()
//!     .with_attribute("firstName", None)
//!     .with_value("firstName", "Jonathan");
//!
//! let mut proxy = ChangeProxy::new(&mut model);
//! proxy.set("firstName", "Lilian");
//! assert_eq!(proxy.get("firstName"), Value::from("Lilian"));
//! assert_eq!(proxy.model().get("firstName"), Value::from("Jonathan"));
//! assert!(proxy.is_dirty());
//!
//! proxy.apply_changes();
//! assert!(!proxy.is_dirty());
//! drop(proxy);
//! assert_eq!(model.get("firstName"), Value::from("Lilian"));
//! ```

pub mod collection;
mod dirty;

pub use collection::CollectionChange;

use std::collections::BTreeMap;
use std::fmt;

use crate::core::config::StagingOptions;
use crate::core::schema::{KeyKind, Schema};
use crate::core::value::{split_root, EntityRef, Value};
use crate::model::{Model, ModelError, Properties};

/// One entry of the staged-edit map.
#[derive(Debug, Clone)]
pub enum Staged {
    /// A staged attribute, to-one, or dotted-path value.
    Value(Value),
    /// Staged members of a to-many relationship.
    Collection(CollectionChange),
}

impl Staged {
    /// The staged value as it reads through the proxy.
    pub fn value(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Collection(collection) => collection.value(),
        }
    }
}

/// Result of [`ChangeProxy::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing differed from the model; the model's commit was not called.
    Clean,
    /// Staged edits were applied and the model committed them.
    Saved,
}

/// Owned classification of a key's root segment.
enum Slot {
    Attribute(Option<String>),
    ToOne(Option<String>),
    ToMany(Option<String>),
    Unknown,
}

/// Stages edits against a borrowed model.
pub struct ChangeProxy<'m, M: Model + ?Sized> {
    model: &'m mut M,
    /// Metadata snapshot taken at construction.
    schema: Schema,
    staged: BTreeMap<String, Staged>,
    options: StagingOptions,
}

impl<'m, M: Model + ?Sized> ChangeProxy<'m, M> {
    /// Wrap `model` with default options.
    pub fn new(model: &'m mut M) -> Self {
        Self::with_options(model, StagingOptions::default())
    }

    /// Wrap `model`.
    ///
    /// Snapshots the model's attribute and relationship metadata and seeds
    /// a staging collection for every to-many relationship.
    pub fn with_options(model: &'m mut M, options: StagingOptions) -> Self {
        let schema = Schema::new(model.attributes(), model.relationships());
        let mut proxy = Self {
            model,
            schema,
            staged: BTreeMap::new(),
            options,
        };
        proxy.seed_to_many();
        tracing::debug!(
            attributes = proxy.schema.attributes().len(),
            relationships = proxy.schema.relationships().len(),
            "change proxy created"
        );
        proxy
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &*self.model
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> StagingOptions {
        self.options
    }

    /// Read `key`, preferring staged values over the model.
    ///
    /// Only the root segment of a dotted key is classified. A staged to-one
    /// relationship answers nested reads from the staged entity.
    pub fn get(&self, key: &str) -> Value {
        let (root, rest) = split_root(key);

        if !self.schema.classify(root).is_known() {
            if let Some(getter) = self.model.accessor(key).and_then(|a| a.get) {
                return getter(self);
            }
        }

        if let Some(staged) = self.staged.get(key) {
            return staged.value();
        }
        if let Some(rest) = rest {
            if let Some(staged) = self.staged.get(root) {
                return staged.value().lookup(rest);
            }
        }
        self.model.get(key)
    }

    /// Stage `value` under `key` and return it.
    ///
    /// Writes to undeclared keys go to the model's computed setter when it
    /// has one and are dropped otherwise. A dotted key is staged only when
    /// its root is a to-one relationship.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Value {
        let value = value.into();
        let (root, rest) = split_root(key);

        match (self.slot(root), rest) {
            (Slot::Unknown, _) => self.set_computed(key, value.clone()),
            (Slot::ToOne(_), Some(_)) => {
                self.stage(key, Staged::Value(value.clone()));
            }
            (Slot::Attribute(_) | Slot::ToMany(_), Some(_)) => {
                tracing::debug!(key, "nested write outside a to-one relationship dropped");
            }
            (Slot::ToMany(value_type), None) => {
                self.drop_nested(root);
                self.stage_members(key, value_type.as_deref(), value.clone());
            }
            (Slot::Attribute(value_type) | Slot::ToOne(value_type), None) => {
                self.drop_nested(root);
                let staged = self.transform(value_type.as_deref(), value.clone());
                self.stage(key, Staged::Value(staged));
            }
        }
        value
    }

    /// Call [`set`](Self::set) for every pair, in iteration order.
    pub fn set_properties<K, V>(&mut self, properties: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in properties {
            self.set(key.as_ref(), value);
        }
        self
    }

    /// True when any staged entry differs from the model's current state.
    ///
    /// Recomputed on every call.
    pub fn is_dirty(&self) -> bool {
        self.staged
            .iter()
            .any(|(key, staged)| self.entry_dirty(key, staged))
    }

    /// Staged keys whose value differs from the model, in key order.
    pub fn changed_keys(&self) -> Vec<&str> {
        self.staged
            .iter()
            .filter(|(key, staged)| self.entry_dirty(key, staged))
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Staged entry for exactly `key`.
    pub fn staged(&self, key: &str) -> Option<&Staged> {
        self.staged.get(key)
    }

    pub fn staged_keys(&self) -> impl Iterator<Item = &str> {
        self.staged.keys().map(String::as_str)
    }

    /// Staging collection of a to-many relationship.
    pub fn collection(&self, key: &str) -> Option<&CollectionChange> {
        match self.staged.get(key)? {
            Staged::Collection(collection) => Some(collection),
            Staged::Value(_) => None,
        }
    }

    /// Mutable staging collection of a to-many relationship.
    pub fn collection_mut(&mut self, key: &str) -> Option<&mut CollectionChange> {
        match self.staged.get_mut(key)? {
            Staged::Collection(collection) => Some(collection),
            Staged::Value(_) => None,
        }
    }

    /// Push every staged entry into the model through its setter.
    ///
    /// Entries stay staged, so the proxy is clean afterwards.
    pub fn apply_changes(&mut self) {
        let entries: Vec<(String, Value)> = self
            .staged
            .iter()
            .map(|(key, staged)| (key.clone(), staged.value()))
            .collect();

        tracing::debug!(entries = entries.len(), "applying staged edits");
        for (key, value) in entries {
            self.model.set(&key, value);
        }
    }

    /// Discard every staged edit and reseed to-many staging from the model.
    pub fn rollback_attributes(&mut self) {
        tracing::debug!(discarded = self.staged.len(), "rolling back staged edits");
        self.staged.clear();
        self.seed_to_many();
    }

    /// Apply staged edits and commit the model, if anything is dirty.
    ///
    /// A dirty save mutates the model: it runs
    /// [`apply_changes`](Self::apply_changes) first and then the model's own
    /// commit, and the model keeps the applied edits even if that commit
    /// fails. A clean proxy returns [`SaveOutcome::Clean`] without touching
    /// the model. Errors from the model's commit are returned unchanged.
    pub async fn save(&mut self) -> Result<SaveOutcome, ModelError> {
        if !self.is_dirty() {
            tracing::debug!("no staged edit differs from the model, save skipped");
            return Ok(SaveOutcome::Clean);
        }

        self.apply_changes();
        self.model.save().await?;
        tracing::debug!("model committed");
        Ok(SaveOutcome::Saved)
    }

    fn slot(&self, root: &str) -> Slot {
        match self.schema.classify(root) {
            KeyKind::Attribute(attr) => Slot::Attribute(attr.value_type.clone()),
            KeyKind::Relationship(rel) if rel.is_to_many() => Slot::ToMany(rel.value_type.clone()),
            KeyKind::Relationship(rel) => Slot::ToOne(rel.value_type.clone()),
            KeyKind::Unknown => Slot::Unknown,
        }
    }

    fn stage(&mut self, key: &str, staged: Staged) {
        tracing::debug!(key, "staged edit");
        self.staged.insert(key.to_string(), staged);
    }

    /// Forget staged `root.*` entries; a new root value supersedes them.
    fn drop_nested(&mut self, root: &str) {
        let prefix = format!("{root}.");
        let before = self.staged.len();
        self.staged.retain(|key, _| !key.starts_with(&prefix));
        if self.staged.len() < before {
            tracing::debug!(root, dropped = before - self.staged.len(), "nested edits superseded");
        }
    }

    fn set_computed(&mut self, key: &str, value: Value) {
        match self.model.accessor(key).and_then(|a| a.set) {
            Some(setter) => {
                tracing::debug!(key, "staging through computed setter");
                setter(self, value);
            }
            None => tracing::debug!(key, "write to unknown key dropped"),
        }
    }

    /// Stage a write to a to-many relationship as a detached collection.
    ///
    /// A single entity becomes a one-member list; `Null` empties the list.
    fn stage_members(&mut self, key: &str, value_type: Option<&str>, value: Value) {
        let value = match value {
            Value::Entity(single) => Value::Entities(vec![single]),
            other => other,
        };
        let members = match self.transform(value_type, value) {
            Value::Entities(members) => members,
            Value::Null => Vec::new(),
            other => {
                tracing::warn!(key, kind = other.kind(), "non-entity write to to-many relationship dropped");
                return;
            }
        };
        self.stage(key, Staged::Collection(CollectionChange::detached(members)));
    }

    fn transform(&self, value_type: Option<&str>, value: Value) -> Value {
        if !self.options.apply_transforms {
            return value;
        }
        match value_type.and_then(|name| self.model.transform(name)) {
            Some(transform) => transform.apply(value),
            None => value,
        }
    }

    fn seed_to_many(&mut self) {
        let names: Vec<String> = self.schema.to_many().map(|r| r.name.clone()).collect();
        for name in names {
            let collection = match self.model.members(&name) {
                Some(live) => CollectionChange::live(live),
                None => CollectionChange::detached(self.current_members(&name)),
            };
            self.staged.insert(name, Staged::Collection(collection));
        }
    }

    fn current_members(&self, key: &str) -> Vec<EntityRef> {
        if let Some(live) = self.model.members(key) {
            return live.to_vec();
        }
        match self.model.get(key) {
            Value::Entities(members) => members,
            Value::Entity(single) => vec![single],
            _ => Vec::new(),
        }
    }

    fn entry_dirty(&self, key: &str, staged: &Staged) -> bool {
        let policy = self.options.relationship_identity;
        let (root, rest) = split_root(key);

        match (staged, self.schema.classify(root), rest) {
            (Staged::Collection(collection), _, _) => {
                !dirty::same_members(&collection.to_vec(), &self.current_members(key), policy)
            }
            (Staged::Value(value), KeyKind::Relationship(rel), None) if !rel.is_to_many() => {
                !dirty::same_reference(value, &self.model.get(key), policy)
            }
            (Staged::Value(value), _, _) => *value != self.model.get(key),
        }
    }
}

impl<M: Model + ?Sized> Properties for ChangeProxy<'_, M> {
    fn get(&self, key: &str) -> Value {
        ChangeProxy::get(self, key)
    }

    fn set(&mut self, key: &str, value: Value) -> Value {
        ChangeProxy::set(self, key, value)
    }
}

impl<M: Model + ?Sized> fmt::Debug for ChangeProxy<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeProxy")
            .field("schema", &self.schema)
            .field("staged", &self.staged)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::IdentityPolicy;
    use crate::model::record::Record;
    use crate::model::Accessor;

    fn person() -> Record {
        Record::new()
            .with_attribute("firstName", None)
            .with_attribute("lastName", None)
            .with_attribute("children", Some("number"))
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
    fn to_many_is_seeded_at_construction() {
        let mut model = person();
        let proxy = ChangeProxy::new(&mut model);

        assert!(proxy.collection("followers").is_some());
        assert!(!proxy.collection("followers").unwrap().is_materialized());
        assert_eq!(proxy.staged_keys().collect::<Vec<_>>(), ["followers"]);
        assert!(!proxy.is_dirty());
    }

    #[test]
    fn set_returns_value_passed_in() {
        let mut model = person();
        let mut proxy = ChangeProxy::new(&mut model);

        let returned = proxy.set("children", "2");

        assert_eq!(returned, Value::from("2"));
        assert_eq!(proxy.get("children"), Value::Number(2.0));
    }

    #[test]
    fn transforms_can_be_disabled() {
        let mut model = person();
        let options = StagingOptions {
            apply_transforms: false,
            ..StagingOptions::default()
        };
        let mut proxy = ChangeProxy::with_options(&mut model, options);

        proxy.set("children", "2");

        assert_eq!(proxy.get("children"), Value::from("2"));
    }

    #[test]
    fn unknown_write_is_dropped() {
        let mut model = person();
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("notAProperty", "someValue");

        assert!(proxy.staged("notAProperty").is_none());
        assert_eq!(proxy.get("notAProperty"), Value::Null);
        assert!(!proxy.is_dirty());
    }

    #[test]
    fn mistyped_to_many_write_is_dropped() {
        let mut model = person();
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("followers", "everyone");

        assert!(!proxy.collection("followers").unwrap().is_materialized());
        assert!(!proxy.is_dirty());
    }

    #[test]
    fn null_to_many_write_stages_empty_list() {
        let follower = EntityRef::new(person());
        let mut model = person().with_value("followers", vec![follower]);
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("followers", Value::Null);

        assert!(proxy.collection("followers").unwrap().is_empty());
        assert!(proxy.is_dirty());
    }

    #[test]
    fn computed_getter_sees_staged_values() {
        let mut model = person()
            .with_value("firstName", "Jonathan")
            .with_value("lastName", "Palmer");
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("firstName", "Flora");

        assert_eq!(proxy.get("fullName"), Value::from("Flora Palmer"));
        assert_eq!(proxy.model().get("fullName"), Value::from("Jonathan Palmer"));
    }

    #[test]
    fn dotted_write_stages_under_full_path() {
        let trevor = EntityRef::new(person().with_value("firstName", "Trevor"));
        let mut model = person().with_value("follows", trevor.clone());
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("follows.firstName", "Paul");

        assert_eq!(proxy.get("follows.firstName"), Value::from("Paul"));
        assert_eq!(trevor.get("firstName"), Value::from("Trevor"));
        assert_eq!(proxy.changed_keys(), ["follows.firstName"]);

        proxy.apply_changes();
        assert_eq!(trevor.get("firstName"), Value::from("Paul"));
        assert!(!proxy.is_dirty());
    }

    #[test]
    fn reassigning_root_discards_nested_edits() {
        let trevor = EntityRef::new(person().with_value("firstName", "Trevor"));
        let bob = EntityRef::new(person().with_value("firstName", "Bob"));
        let mut model = person().with_value("follows", trevor.clone());
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("follows.firstName", "Paul");
        proxy.set("follows", bob.clone());

        assert!(proxy.staged("follows.firstName").is_none());
        assert_eq!(proxy.get("follows.firstName"), Value::from("Bob"));

        proxy.apply_changes();
        assert_eq!(bob.get("firstName"), Value::from("Bob"));
        assert_eq!(trevor.get("firstName"), Value::from("Trevor"));
        assert!(!proxy.is_dirty());
    }

    #[test]
    fn nested_edit_after_root_lands_on_new_target() {
        let trevor = EntityRef::new(person().with_value("firstName", "Trevor"));
        let bob = EntityRef::new(person().with_value("firstName", "Bob"));
        let mut model = person().with_value("follows", trevor.clone());
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("follows", bob.clone());
        proxy.set("follows.firstName", "Paul");

        assert_eq!(proxy.get("follows.firstName"), Value::from("Paul"));
        assert_eq!(bob.get("firstName"), Value::from("Bob"));

        proxy.apply_changes();
        assert_eq!(bob.get("firstName"), Value::from("Paul"));
        assert_eq!(trevor.get("firstName"), Value::from("Trevor"));
    }

    #[tokio::test]
    async fn nested_write_under_to_many_is_dropped() {
        let a = EntityRef::new(person());
        let b = EntityRef::new(person());
        let mut model = person().with_value("followers", vec![a.clone()]);
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("followers.0", b);

        assert!(proxy.staged("followers.0").is_none());
        assert_eq!(proxy.get("followers.0"), Value::Entity(a));
        assert!(!proxy.is_dirty());

        proxy.apply_changes();
        assert!(proxy.changed_keys().is_empty());
        assert_eq!(proxy.save().await.unwrap(), SaveOutcome::Clean);
        assert_eq!(proxy.model().save_count(), 0);
    }

    #[test]
    fn nested_write_under_attribute_is_dropped() {
        let mut model = person().with_value("firstName", "Jonathan");
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("firstName.length", 3);

        assert!(proxy.staged("firstName.length").is_none());
        assert!(!proxy.is_dirty());
    }

    #[test]
    fn set_properties_runs_in_order() {
        let mut model = person();
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set_properties([
            ("firstName", "Lilian"),
            ("firstName", "Flora"),
            ("fullName", "Ada Baxter"),
            ("lastName", "Portero"),
        ]);

        assert_eq!(proxy.get("firstName"), Value::from("Ada"));
        assert_eq!(proxy.get("fullName"), Value::from("Ada Portero"));
    }

    #[test]
    fn reference_policy_treats_proxy_and_record_as_different() {
        let follows = EntityRef::new(person());
        let mut model = person().with_value("follows", follows.clone());
        let options = StagingOptions {
            relationship_identity: IdentityPolicy::Reference,
            ..StagingOptions::default()
        };
        let mut proxy = ChangeProxy::with_options(&mut model, options);

        proxy.set("follows", follows);

        assert!(proxy.is_dirty());
    }

    #[test]
    fn underlying_policy_unwraps_model_proxy() {
        let follows = EntityRef::new(person());
        let mut model = person().with_value("follows", follows.clone());
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("follows", follows);

        assert!(!proxy.is_dirty());
    }

    #[test]
    fn changed_keys_lists_only_differences() {
        let mut model = person().with_value("firstName", "Jonathan");
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("firstName", "Jonathan");
        proxy.set("lastName", "Baxter");

        assert_eq!(proxy.changed_keys(), ["lastName"]);
    }

    #[test]
    fn set_properties_chains() {
        let mut model = person();
        let mut proxy = ChangeProxy::new(&mut model);

        proxy
            .set_properties([("firstName", "Lilian"), ("lastName", "Baxter")])
            .set("children", 2);

        assert_eq!(proxy.get("fullName"), Value::from("Lilian Baxter"));
        assert_eq!(proxy.get("children"), Value::Number(2.0));
    }

    #[tokio::test]
    async fn save_propagates_model_error() {
        let mut model = person().fail_on_save(ModelError::Persistence("offline".into()));
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("firstName", "Po");
        let err = proxy.save().await.unwrap_err();

        assert_eq!(err, ModelError::Persistence("offline".into()));
        assert_eq!(proxy.model().save_count(), 1);
    }
}
