//! proxy::collection
//!
//! Staging wrapper for to-many relationships.
//!
//! # Design
//!
//! A [`CollectionChange`] starts out reading through to the live member list
//! it was seeded from, so changes made to the model's relationship stay
//! visible. The first insert or remove copies the live members into an
//! owned snapshot and applies the edit there. From then on the wrapper is
//! detached: local edits never reach the model, and model changes no longer
//! show through.
//!
//! # Example
//!
//! ```
//! use simple_changeset::core::value::EntityRef;
//! use simple_changeset::model::record::Record;
//! use simple_changeset::model::LiveMembers;
//! use simple_changeset::proxy::collection::CollectionChange;
//!
//! let a = EntityRef::new(Record::new());
//! let b = EntityRef::new(Record::new());
//! let live = LiveMembers::new(vec![a.clone()]);
//! let mut staged = CollectionChange::live(live.clone());
//!
//! live.push(b.clone());
//! assert_eq!(staged.len(), 2);
//!
//! staged.remove_object(&a);
//! assert!(staged.is_materialized());
//! assert_eq!(staged.len(), 1);
//! assert_eq!(live.len(), 2);
//! ```

use crate::core::value::{EntityRef, Value};
use crate::model::LiveMembers;

#[derive(Debug, Clone)]
enum Members {
    /// Reads go to the live list.
    Live(LiveMembers),
    /// Owned copy taken on first mutation.
    Snapshot(Vec<EntityRef>),
}

/// Ordered staging collection for one to-many relationship.
#[derive(Debug, Clone)]
pub struct CollectionChange {
    members: Members,
}

impl CollectionChange {
    /// Read through to `source` until the first mutation.
    pub fn live(source: LiveMembers) -> Self {
        Self {
            members: Members::Live(source),
        }
    }

    /// Start already detached, holding `members`.
    pub fn detached(members: Vec<EntityRef>) -> Self {
        Self {
            members: Members::Snapshot(members),
        }
    }

    /// True once a mutation has detached the collection from its source.
    pub fn is_materialized(&self) -> bool {
        matches!(self.members, Members::Snapshot(_))
    }

    pub fn len(&self) -> usize {
        match &self.members {
            Members::Live(live) => live.len(),
            Members::Snapshot(members) => members.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<EntityRef> {
        match &self.members {
            Members::Live(live) => live.get(index),
            Members::Snapshot(members) => members.get(index).cloned(),
        }
    }

    pub fn first(&self) -> Option<EntityRef> {
        self.get(0)
    }

    pub fn last(&self) -> Option<EntityRef> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        match &self.members {
            Members::Live(live) => live.contains(entity),
            Members::Snapshot(members) => members.iter().any(|m| m.same_entity(entity)),
        }
    }

    /// Current members as a plain ordered list.
    pub fn to_vec(&self) -> Vec<EntityRef> {
        match &self.members {
            Members::Live(live) => live.to_vec(),
            Members::Snapshot(members) => members.clone(),
        }
    }

    /// Current members as a staged value.
    pub fn value(&self) -> Value {
        Value::Entities(self.to_vec())
    }

    pub fn push_object(&mut self, entity: EntityRef) {
        self.materialize().push(entity);
    }

    pub fn push_objects(&mut self, entities: impl IntoIterator<Item = EntityRef>) {
        self.materialize().extend(entities);
    }

    /// Remove every occurrence of `entity`.
    pub fn remove_object(&mut self, entity: &EntityRef) {
        self.materialize().retain(|m| !m.same_entity(entity));
    }

    pub fn remove_objects<'a>(&mut self, entities: impl IntoIterator<Item = &'a EntityRef>) {
        let doomed: Vec<&EntityRef> = entities.into_iter().collect();
        self.materialize()
            .retain(|m| !doomed.iter().any(|d| m.same_entity(d)));
    }

    /// Detach from the live source, once.
    fn materialize(&mut self) -> &mut Vec<EntityRef> {
        if let Members::Live(live) = &self.members {
            tracing::debug!(members = live.len(), "materializing staged collection");
            self.members = Members::Snapshot(live.to_vec());
        }
        match &mut self.members {
            Members::Snapshot(members) => members,
            Members::Live(_) => unreachable!("collection was just materialized"),
        }
    }
}
